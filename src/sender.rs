//! 송신자 (브로드캐스터)
//!
//! - 파일을 한 번 읽어 블록으로 분할
//! - 프라이머리 → 데이터 블록 순으로 한 라운드 전송
//! - 라운드 간 대기 후 무한 반복 (응답 없음, 재시도 없음)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::block::{BlockCodec, BlockIndex, BlockSet};
use crate::config::{SenderConfig, WireConfig};
use crate::stats::SenderStats;
use crate::Result;

/// 진행률 보고 주기
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// 블록 인코딩 결과 (라운드마다 재사용)
struct Datagram {
    index: BlockIndex,
    bytes: Bytes,
}

/// 송신자
pub struct Broadcaster {
    /// 분할된 파일
    block_set: BlockSet,

    /// 프라이머리 + 데이터 블록의 인코딩 결과 (전송 순서)
    datagrams: Vec<Datagram>,

    /// 라운드 간 대기
    round_delay: Duration,

    /// 전송 통계 (진행률 보고 태스크와 공유)
    stats: Arc<RwLock<SenderStats>>,
}

impl Broadcaster {
    /// 파일 데이터로 송신자 생성
    pub fn new(data: Bytes, wire: WireConfig, round_delay: Duration) -> Result<Self> {
        let block_set = BlockSet::partition(data, &wire)?;
        let codec = BlockCodec::new(wire);

        let datagrams = block_set
            .round()
            .map(|block| Datagram {
                index: block.index,
                bytes: codec.encode(block),
            })
            .collect();

        let stats = Arc::new(RwLock::new(SenderStats::new(block_set.total_blocks())));

        debug!(
            "파일 분할 완료: {} bytes → {} 블록 (프라이머리 포함)",
            block_set.file_len(),
            block_set.total_blocks()
        );

        Ok(Self {
            block_set,
            datagrams,
            round_delay,
            stats,
        })
    }

    /// 설정의 파일을 읽어 송신자 생성
    pub async fn from_config(config: &SenderConfig) -> Result<Self> {
        let path = config.validate()?;
        let data = tokio::fs::read(path).await?;

        info!("Loaded file: {:?} ({} bytes)", path, data.len());

        Self::new(Bytes::from(data), config.wire, config.round_delay())
    }

    pub fn block_set(&self) -> &BlockSet {
        &self.block_set
    }

    /// 통계 스냅샷
    pub fn stats(&self) -> SenderStats {
        self.stats.read().clone()
    }

    /// 한 라운드 전송: 프라이머리 후 데이터 블록 오름차순
    pub async fn send_round(&self, socket: &UdpSocket, dest: SocketAddr) -> Result<()> {
        for datagram in &self.datagrams {
            socket.send_to(&datagram.bytes, dest).await?;
            self.stats
                .write()
                .record_sent(datagram.index, datagram.bytes.len());
        }

        let mut stats = self.stats.write();
        stats.rounds += 1;
        debug!("라운드 {} 전송 완료", stats.rounds);
        Ok(())
    }

    /// 무한 반복 전송
    ///
    /// 소켓 에러에서만 반환한다. 진행률 보고 태스크는 반환 시 함께 중단된다.
    pub async fn run(&self, socket: &UdpSocket, dest: SocketAddr) -> Result<()> {
        let reporter = spawn_progress_reporter(self.stats.clone(), PROGRESS_INTERVAL);
        let result = self.repeat(socket, dest).await;
        reporter.abort();
        result
    }

    async fn repeat(&self, socket: &UdpSocket, dest: SocketAddr) -> Result<()> {
        loop {
            self.send_round(socket, dest).await?;
            tokio::time::sleep(self.round_delay).await;
        }
    }
}

/// 진행률 보고 태스크 시작
///
/// 스냅샷만 읽으므로 값이 조금 늦어도 상관없다.
pub fn spawn_progress_reporter(
    stats: Arc<RwLock<SenderStats>>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let snapshot = stats.read().clone();
            info!(
                round = snapshot.rounds,
                "Transmitting block {} of {}",
                snapshot.current_block,
                snapshot.total_blocks
            );
        }
    })
}
