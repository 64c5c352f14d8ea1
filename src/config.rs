//! 프로토콜 설정
//!
//! 송신자와 수신자는 `WireConfig`를 사전에 합의해야 한다.
//! 블록 크기나 체크섬 여부는 런타임에 협상되지 않는다.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    Error, Result, DEFAULT_BLOCK_SIZE, DEFAULT_GROUP, DEFAULT_OUTPUT_PATH,
    DEFAULT_ROUND_DELAY_MS, MAX_UDP_PAYLOAD,
};

/// 블록 인덱스 필드 크기
pub const INDEX_LEN: usize = 4;

/// 블록 체크섬 필드 크기
pub const CHECKSUM_LEN: usize = 4;

/// 프라이머리 블록의 총 블록 수 필드 크기
pub const TOTAL_BLOCKS_LEN: usize = 4;

/// 와이어 포맷 설정 (송수신 공통)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireConfig {
    /// 블록당 페이로드 크기 (바이트)
    pub block_size: usize,

    /// 블록별 CRC32 체크섬 사용 여부
    pub checksum_enabled: bool,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            checksum_enabled: true,
        }
    }
}

impl WireConfig {
    pub fn new(block_size: usize, checksum_enabled: bool) -> Self {
        Self {
            block_size,
            checksum_enabled,
        }
    }

    /// 헤더 길이: 인덱스(4) + 체크섬(4, 선택)
    pub fn header_len(&self) -> usize {
        if self.checksum_enabled {
            INDEX_LEN + CHECKSUM_LEN
        } else {
            INDEX_LEN
        }
    }

    /// 프라이머리 블록의 파일 체크섬 필드 길이 (4 또는 8)
    pub fn file_checksum_len(&self) -> usize {
        if self.checksum_enabled {
            8
        } else {
            4
        }
    }

    /// 프라이머리 블록 페이로드 길이
    pub fn primary_payload_len(&self) -> usize {
        TOTAL_BLOCKS_LEN + self.file_checksum_len()
    }

    /// 수신 버퍼에 필요한 최대 데이터그램 길이
    pub fn max_datagram_len(&self) -> usize {
        self.header_len() + self.block_size
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidConfig("블록 크기는 0보다 커야 함".into()));
        }
        if self.block_size < self.primary_payload_len() {
            return Err(Error::InvalidConfig(format!(
                "블록 크기 {} < 프라이머리 페이로드 {}",
                self.block_size,
                self.primary_payload_len()
            )));
        }
        if self.max_datagram_len() > MAX_UDP_PAYLOAD {
            return Err(Error::InvalidConfig(format!(
                "데이터그램 {} bytes가 UDP 최대 {} bytes 초과",
                self.max_datagram_len(),
                MAX_UDP_PAYLOAD
            )));
        }
        Ok(())
    }
}

/// 송신자 설정
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// 전송할 파일 경로 (기본값 없음)
    pub file_path: Option<PathBuf>,

    /// 멀티캐스트 그룹 주소:포트
    pub group: String,

    /// 와이어 포맷
    pub wire: WireConfig,

    /// 라운드 간 대기 (밀리초)
    pub round_delay_ms: u64,

    /// 멀티캐스트 TTL (1 = 로컬 링크)
    pub multicast_ttl: u32,

    /// 같은 호스트의 수신자에게도 루프백할지
    pub multicast_loop: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            file_path: None,
            group: DEFAULT_GROUP.to_string(),
            wire: WireConfig::default(),
            round_delay_ms: DEFAULT_ROUND_DELAY_MS,
            multicast_ttl: 1,
            multicast_loop: true,
        }
    }
}

impl SenderConfig {
    pub fn round_delay(&self) -> Duration {
        Duration::from_millis(self.round_delay_ms)
    }

    /// 파일 경로 확인 및 와이어 설정 검증
    pub fn validate(&self) -> Result<&PathBuf> {
        self.wire.validate()?;
        self.file_path
            .as_ref()
            .ok_or_else(|| Error::InvalidConfig("전송할 파일 경로가 필요함".into()))
    }
}

/// 수신자 설정
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// 멀티캐스트 그룹 주소:포트
    pub group: String,

    /// 재구성된 파일 저장 경로
    pub output_path: PathBuf,

    /// 와이어 포맷
    pub wire: WireConfig,

    /// 그룹 가입에 사용할 로컬 인터페이스 (UNSPECIFIED = OS 선택)
    pub interface: Ipv4Addr,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            wire: WireConfig::default(),
            interface: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl ReceiverConfig {
    pub fn validate(&self) -> Result<()> {
        self.wire.validate()
    }
}
