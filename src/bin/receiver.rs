//! RFB 수신자 - Repeat File Broadcast
//!
//! 멀티캐스트 그룹에 가입해 모든 블록이 모이면 파일을 재구성하고 종료
//! - 손상 블록은 폐기하고 다음 라운드를 기다림
//! - 송신자에게 아무것도 보내지 않음
//!
//! 사용법:
//!   cargo run --release --bin rfb-receiver -- [OPTIONS]
//!
//! 예시:
//!   # 기본 그룹에서 수신
//!   cargo run --release --bin rfb-receiver -- -o data.bin
//!
//!   # 송신자와 같은 블록 크기로 수신
//!   cargo run --release --bin rfb-receiver -- -o data.bin -s 1024

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rfb::config::{ReceiverConfig, WireConfig};
use rfb::receiver::run_receiver;
use rfb::{DEFAULT_BLOCK_SIZE, DEFAULT_GROUP, DEFAULT_OUTPUT_PATH};

#[derive(Parser)]
#[command(name = "rfb-receiver")]
#[command(about = "Collect a repeatedly broadcast file from a UDP multicast group")]
struct Cli {
    /// Multicast address and port
    #[arg(short, long, default_value = DEFAULT_GROUP)]
    address: String,

    /// Path to save the received file
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_PATH)]
    save: PathBuf,

    /// Block size in bytes (must match the sender)
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
    size: usize,

    /// Disable per-block CRC32 checksums (must match the sender)
    #[arg(long)]
    no_checksum: bool,

    /// Local interface address used to join the group
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    interface: Ipv4Addr,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> ReceiverConfig {
        ReceiverConfig {
            group: self.address,
            output_path: self.save,
            wire: WireConfig::new(self.size, !self.no_checksum),
            interface: self.interface,
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
    run_receiver(&config).await?;

    Ok(())
}
