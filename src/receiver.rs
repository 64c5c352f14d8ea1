//! 수신자 (컬렉터)
//!
//! - 그룹에 조용히 가입해 블록 수신
//! - 검증된 블록을 인덱스별로 누적 (라운드를 넘어 계속 증가)
//! - 1..total-1 인덱스가 모두 모이면 순서대로 재구성 후 종료
//!
//! 송신자로 보내는 신호는 없다. 손실은 다음 라운드가 메운다.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

use crate::block::{Block, BlockCodec, BlockIndex, PrimaryInfo};
use crate::config::{ReceiverConfig, WireConfig};
use crate::net;
use crate::stats::ReceiverStats;
use crate::{Error, Result};

/// 진행률 로그 최소 간격
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(1);

/// 수신한 블록 (인덱스 → 페이로드)
///
/// 키는 유일하고, 실행 중에는 제거되지 않는다.
#[derive(Debug, Default)]
pub struct ReceivedBlocks {
    blocks: HashMap<BlockIndex, Bytes>,
}

impl ReceivedBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 블록 저장, 새 인덱스면 true
    ///
    /// 같은 인덱스를 다시 받으면 덮어쓴다.
    pub fn insert(&mut self, index: BlockIndex, payload: Bytes) -> bool {
        self.blocks.insert(index, payload).is_none()
    }

    pub fn contains(&self, index: BlockIndex) -> bool {
        self.blocks.contains_key(&index)
    }

    pub fn get(&self, index: BlockIndex) -> Option<&Bytes> {
        self.blocks.get(&index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// 1..total_blocks 범위에 있는 인덱스 수
    pub fn count_in_range(&self, total_blocks: u32) -> u32 {
        self.blocks
            .keys()
            .filter(|&&index| index >= 1 && index < total_blocks)
            .count() as u32
    }

    /// 1..total_blocks 인덱스가 모두 있는지 (집합 포함 검사)
    pub fn is_complete(&self, total_blocks: u32) -> bool {
        (1..total_blocks).all(|index| self.contains(index))
    }

    /// 누락된 인덱스 목록
    pub fn missing(&self, total_blocks: u32) -> Vec<BlockIndex> {
        (1..total_blocks)
            .filter(|&index| !self.contains(index))
            .collect()
    }

    /// 인덱스 오름차순으로 페이로드 연결
    ///
    /// 하나라도 빠져 있으면 None. 범위 밖 인덱스는 무시한다.
    pub fn assemble(&self, total_blocks: u32) -> Option<Vec<u8>> {
        let size = (1..total_blocks)
            .map(|index| self.get(index).map(|b| b.len()))
            .sum::<Option<usize>>()?;

        let mut data = Vec::with_capacity(size);
        for index in 1..total_blocks {
            data.extend_from_slice(self.get(index)?);
        }
        Some(data)
    }
}

/// 수신 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// 프라이머리 블록 대기 (총 블록 수 모름)
    AwaitingPrimary,

    /// 총 블록 수를 알고 누적 중
    Accumulating(PrimaryInfo),

    /// 모든 블록 수신 완료 (종료 상태)
    Complete(PrimaryInfo),
}

/// 재구성된 파일
#[derive(Debug, Clone)]
pub struct Reassembled {
    /// 파일 데이터
    pub data: Vec<u8>,

    /// 프라이머리 메타데이터
    pub info: PrimaryInfo,

    /// 전체 파일 CRC32 일치 여부
    pub checksum_ok: bool,
}

/// 블록 수집기 (단일 태스크에서만 접근)
pub struct Collector {
    codec: BlockCodec,
    state: CollectorState,
    blocks: ReceivedBlocks,

    /// 현재 total 기준 범위 내 저장된 인덱스 수
    in_range: u32,

    stats: ReceiverStats,
    last_progress_log: Instant,
}

impl Collector {
    pub fn new(wire: WireConfig) -> Self {
        Self {
            codec: BlockCodec::new(wire),
            state: CollectorState::AwaitingPrimary,
            blocks: ReceivedBlocks::new(),
            in_range: 0,
            stats: ReceiverStats::new(),
            last_progress_log: Instant::now(),
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, CollectorState::Complete(_))
    }

    pub fn received(&self) -> &ReceivedBlocks {
        &self.blocks
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// 데이터그램 하나 처리, 완료되면 true
    ///
    /// 반환되는 에러는 모두 일시적 무결성 에러이며 호출자는 폐기 후 계속한다.
    pub fn handle_datagram(&mut self, datagram: &[u8]) -> Result<bool> {
        self.stats.record_datagram(datagram.len());

        match self.codec.decode(datagram) {
            Ok(block) => self.accept(block),
            Err(e) => {
                match e {
                    Error::ChecksumMismatch { .. } => self.stats.checksum_failures += 1,
                    _ => self.stats.malformed += 1,
                }
                Err(e)
            }
        }
    }

    /// 검증된 블록 반영, 완료되면 true
    pub fn accept(&mut self, block: Block) -> Result<bool> {
        if self.is_complete() {
            return Ok(true);
        }

        if block.is_primary() {
            let info = match self.codec.decode_primary(&block) {
                Ok(info) => info,
                Err(e) => {
                    self.stats.malformed += 1;
                    return Err(e);
                }
            };
            self.record_primary(info);
        } else {
            self.store(block);
        }

        Ok(self.check_complete())
    }

    fn record_primary(&mut self, info: PrimaryInfo) {
        self.stats.primary_blocks += 1;

        match self.state {
            CollectorState::Accumulating(current) if current == info => {
                trace!("프라이머리 블록 재수신");
                return;
            }
            CollectorState::Accumulating(current) => {
                warn!(
                    "프라이머리 메타데이터 변경: total {} → {}, checksum {:08X} → {:08X}",
                    current.total_blocks,
                    info.total_blocks,
                    current.file_checksum,
                    info.file_checksum
                );
            }
            _ => {
                info!(
                    "Primary block received. Total blocks: {}, file checksum: {:08X}",
                    info.total_blocks, info.file_checksum
                );
            }
        }

        self.in_range = self.blocks.count_in_range(info.total_blocks);
        self.state = CollectorState::Accumulating(info);
    }

    fn store(&mut self, block: Block) {
        let index = block.index;
        if !self.blocks.insert(index, block.payload) {
            self.stats.duplicate_blocks += 1;
            return;
        }

        self.stats.stored_blocks += 1;
        if let CollectorState::Accumulating(info) = self.state {
            if index < info.total_blocks {
                self.in_range += 1;
            }
            self.log_progress(info);
        }
    }

    fn log_progress(&mut self, info: PrimaryInfo) {
        if self.last_progress_log.elapsed() < PROGRESS_LOG_INTERVAL {
            return;
        }
        self.last_progress_log = Instant::now();
        info!(
            "Received {}/{} blocks ({:.1}%)",
            self.in_range,
            info.data_blocks(),
            if info.data_blocks() == 0 {
                100.0
            } else {
                self.in_range as f64 / info.data_blocks() as f64 * 100.0
            }
        );
    }

    /// 완료 판정
    ///
    /// 범위 내 개수로 먼저 거르고, 실제 판정은 전체 인덱스 집합 포함 검사로 한다.
    fn check_complete(&mut self) -> bool {
        let info = match self.state {
            CollectorState::Accumulating(info) => info,
            CollectorState::Complete(_) => return true,
            CollectorState::AwaitingPrimary => return false,
        };

        if self.in_range < info.data_blocks() || !self.blocks.is_complete(info.total_blocks) {
            return false;
        }

        self.state = CollectorState::Complete(info);
        true
    }

    /// 완료된 블록들을 파일로 재구성
    pub fn reassemble(&self) -> Option<Reassembled> {
        let info = match self.state {
            CollectorState::Complete(info) => info,
            _ => return None,
        };

        let data = self.blocks.assemble(info.total_blocks)?;
        let checksum_ok = crc32fast::hash(&data) == info.file_checksum;

        Some(Reassembled {
            data,
            info,
            checksum_ok,
        })
    }

    /// 완료될 때까지 수신
    ///
    /// 개별 수신에 타임아웃은 없다. 그룹이 조용하면 계속 기다린다.
    pub async fn run(&mut self, socket: &UdpSocket) -> Result<Reassembled> {
        let mut buf = vec![0u8; self.codec.wire().max_datagram_len()];

        loop {
            let (len, addr) = socket.recv_from(&mut buf).await?;

            match self.handle_datagram(&buf[..len]) {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) if e.is_transient() => {
                    debug!("데이터그램 폐기 ({}): {}", addr, e);
                }
                Err(e) => return Err(e),
            }
        }

        self.reassemble().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "완료 상태에서 블록 재구성 실패",
            ))
        })
    }
}

/// 재구성된 파일 저장
pub async fn write_output(path: &Path, file: &Reassembled) -> Result<()> {
    tokio::fs::write(path, &file.data).await?;
    Ok(())
}

/// 설정대로 그룹에 가입해 파일 하나를 받아 저장
pub async fn run_receiver(config: &ReceiverConfig) -> Result<Reassembled> {
    config.validate()?;
    let group = net::resolve_group(&config.group).await?;
    let socket = net::receiver_socket(group, config.interface)?;

    info!("Listening for multicast messages on {}...", SocketAddr::V4(group));

    let mut collector = Collector::new(config.wire);
    let file = collector.run(&socket).await?;

    if file.checksum_ok {
        info!("File checksum verified: {:08X}", file.info.file_checksum);
    } else {
        warn!(
            "파일 체크섬 불일치: expected {:08X}, got {:08X}",
            file.info.file_checksum,
            crc32fast::hash(&file.data)
        );
    }

    write_output(&config.output_path, &file).await?;
    info!(
        "File successfully reconstructed and saved: {:?} ({} bytes)",
        config.output_path,
        file.data.len()
    );
    info!("{}", collector.stats().summary());

    Ok(file)
}
