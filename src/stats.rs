//! 전송 통계

use std::time::{Duration, Instant};

/// 송신 통계
///
/// 송신 루프만 갱신하고, 진행률 보고 태스크는 스냅샷만 읽는다.
#[derive(Debug, Clone)]
pub struct SenderStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 완료된 라운드 수
    pub rounds: u64,

    /// 현재 라운드에서 마지막으로 보낸 블록 인덱스
    pub current_block: u32,

    /// 총 블록 수 (프라이머리 포함)
    pub total_blocks: u32,

    /// 총 전송 데이터그램 수
    pub datagrams_sent: u64,

    /// 총 전송 바이트 (헤더 포함)
    pub bytes_sent: u64,
}

impl SenderStats {
    pub fn new(total_blocks: u32) -> Self {
        Self {
            start_time: Instant::now(),
            rounds: 0,
            current_block: 0,
            total_blocks,
            datagrams_sent: 0,
            bytes_sent: 0,
        }
    }

    /// 데이터그램 전송 기록
    pub fn record_sent(&mut self, index: u32, len: usize) {
        self.current_block = index;
        self.datagrams_sent += 1;
        self.bytes_sent += len as u64;
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 전송률 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.bytes_sent as f64 / elapsed
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Round: {} | Block: {}/{} | Datagrams: {} | Bytes: {} | Throughput: {:.2} MB/s",
            self.rounds,
            self.current_block,
            self.total_blocks,
            self.datagrams_sent,
            self.bytes_sent,
            self.throughput() / 1_000_000.0,
        )
    }
}

/// 수신 통계
#[derive(Debug, Clone)]
pub struct ReceiverStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 수신한 데이터그램 수
    pub datagrams: u64,

    /// 수신한 바이트 (헤더 포함)
    pub bytes: u64,

    /// 처음 저장된 데이터 블록 수
    pub stored_blocks: u64,

    /// 이미 가진 인덱스를 다시 받은 횟수
    pub duplicate_blocks: u64,

    /// 프라이머리 블록 수신 횟수
    pub primary_blocks: u64,

    /// 체크섬 불일치로 폐기한 데이터그램 수
    pub checksum_failures: u64,

    /// 헤더/프라이머리 손상으로 폐기한 데이터그램 수
    pub malformed: u64,
}

impl ReceiverStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            datagrams: 0,
            bytes: 0,
            stored_blocks: 0,
            duplicate_blocks: 0,
            primary_blocks: 0,
            checksum_failures: 0,
            malformed: 0,
        }
    }

    /// 데이터그램 도착 기록
    pub fn record_datagram(&mut self, len: usize) {
        self.datagrams += 1;
        self.bytes += len as u64;
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 폐기율 (0.0 ~ 1.0)
    pub fn discard_rate(&self) -> f64 {
        if self.datagrams == 0 {
            return 0.0;
        }
        (self.checksum_failures + self.malformed) as f64 / self.datagrams as f64
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Datagrams: {} | Stored: {} | Duplicates: {} | Primaries: {} | Discarded: {:.2}%",
            self.elapsed().as_secs_f64(),
            self.datagrams,
            self.stored_blocks,
            self.duplicate_blocks,
            self.primary_blocks,
            self.discard_rate() * 100.0,
        )
    }
}

impl Default for ReceiverStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_stats_records() {
        let mut stats = SenderStats::new(3);
        stats.record_sent(0, 20);
        stats.record_sent(1, 516);
        assert_eq!(stats.current_block, 1);
        assert_eq!(stats.datagrams_sent, 2);
        assert_eq!(stats.bytes_sent, 536);
        assert!(stats.summary().contains("Block: 1/3"));
    }

    #[test]
    fn test_discard_rate() {
        let mut stats = ReceiverStats::new();
        assert_eq!(stats.discard_rate(), 0.0);
        for _ in 0..4 {
            stats.record_datagram(100);
        }
        stats.checksum_failures = 1;
        assert!((stats.discard_rate() - 0.25).abs() < f64::EPSILON);
    }
}
