//! # RFB (Repeat File Broadcast)
//!
//! UDP 멀티캐스트 기반 무응답 파일 브로드캐스트
//!
//! ## 핵심 특징
//! - **Blind Repeat**: 파일 전체를 끝없이 반복 전송, 손실은 다음 라운드가 메움
//! - **무피드백**: 수신자는 그룹에 조용히 가입만 함 (ACK/NACK 없음)
//! - **순서 무관**: 블록 인덱스로 재조립하므로 UDP 도착 순서에 의존하지 않음
//! - **선택적 체크섬**: 블록별 CRC32, 손상 블록은 폐기

pub mod block;
pub mod config;
pub mod error;
pub mod net;
pub mod receiver;
pub mod sender;
pub mod stats;

pub use block::{Block, BlockCodec, BlockIndex, BlockSet, PrimaryInfo};
pub use config::{ReceiverConfig, SenderConfig, WireConfig};
pub use error::{Error, ErrorClass, Result};
pub use receiver::{Collector, CollectorState, Reassembled, ReceivedBlocks};
pub use sender::Broadcaster;
pub use stats::{ReceiverStats, SenderStats};

/// 프라이머리 블록 인덱스
pub const PRIMARY_INDEX: u32 = 0;

/// 기본 블록 크기 (바이트)
///
/// 576 바이트 최소 MTU에서 IP/UDP 헤더를 뺀 값이라 단편화되지 않는다.
pub const DEFAULT_BLOCK_SIZE: usize = 508;

/// 기본 멀티캐스트 그룹
pub const DEFAULT_GROUP: &str = "224.3.29.71:10000";

/// 기본 라운드 간 대기 (밀리초)
pub const DEFAULT_ROUND_DELAY_MS: u64 = 100;

/// 기본 저장 경로
pub const DEFAULT_OUTPUT_PATH: &str = "received_file";

/// IPv4 UDP 최대 페이로드
pub const MAX_UDP_PAYLOAD: usize = 65507;
