//! RFB 송신자 - Repeat File Broadcast
//!
//! 파일을 블록으로 나눠 멀티캐스트 그룹에 끝없이 반복 전송
//! - 프라이머리 블록 (총 블록 수 + 파일 체크섬) → 데이터 블록 순
//! - 라운드 사이에 짧게 대기, 수신자 응답은 받지 않음
//!
//! 사용법:
//!   cargo run --release --bin rfb-sender -- --file <PATH> [OPTIONS]
//!
//! 예시:
//!   # 기본 그룹으로 전송
//!   cargo run --release --bin rfb-sender -- -f data.bin
//!
//!   # 1KB 블록, 라운드 간 250ms
//!   cargo run --release --bin rfb-sender -- -f data.bin -s 1024 -d 250

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rfb::config::{SenderConfig, WireConfig};
use rfb::{net, Broadcaster, DEFAULT_BLOCK_SIZE, DEFAULT_GROUP, DEFAULT_ROUND_DELAY_MS};

#[derive(Parser)]
#[command(name = "rfb-sender")]
#[command(about = "Broadcast a file to a UDP multicast group in an endless repeat cycle")]
struct Cli {
    /// Path to the file to be sent
    #[arg(short, long)]
    file: PathBuf,

    /// Multicast address and port
    #[arg(short, long, default_value = DEFAULT_GROUP)]
    address: String,

    /// Block size in bytes
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
    size: usize,

    /// Delay between rounds in ms
    #[arg(short, long, default_value_t = DEFAULT_ROUND_DELAY_MS)]
    delay: u64,

    /// Disable per-block CRC32 checksums (receivers must match)
    #[arg(long)]
    no_checksum: bool,

    /// Multicast TTL
    #[arg(long, default_value_t = 1)]
    ttl: u32,

    /// Do not loop multicast datagrams back to this host
    #[arg(long)]
    no_loop: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> SenderConfig {
        SenderConfig {
            file_path: Some(self.file),
            group: self.address,
            wire: WireConfig::new(self.size, !self.no_checksum),
            round_delay_ms: self.delay,
            multicast_ttl: self.ttl,
            multicast_loop: !self.no_loop,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 설정
    let default_level = if cli.verbose { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.into_config();

    let broadcaster = Broadcaster::from_config(&config).await?;
    let group = net::resolve_group(&config.group).await?;
    let socket = net::sender_socket(config.multicast_ttl, config.multicast_loop)?;

    info!("RFB Sender starting...");
    info!("Multicast address: {}", group);
    info!("Block size: {} bytes", config.wire.block_size);
    info!("Checksums: {}", config.wire.checksum_enabled);
    info!("Round delay: {} ms", config.round_delay_ms);
    info!("Total blocks: {}", broadcaster.block_set().total_blocks());

    tokio::select! {
        result = broadcaster.run(&socket, SocketAddr::V4(group)) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    info!("{}", broadcaster.stats().summary());
    Ok(())
}
