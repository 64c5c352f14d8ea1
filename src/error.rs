//! 에러 타입 정의

use thiserror::Error;

/// 에러 분류
///
/// 무결성 에러는 해당 데이터그램 하나로 끝나고, 나머지는 프로세스를 종료시킨다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 잘못된 설정 (시작 시점에 즉시 종료)
    Configuration,

    /// 단일 블록 손상 (폐기 후 다음 라운드를 기다림)
    TransientIntegrity,

    /// 소켓/파일 자원 에러 (재시도 없이 종료)
    Resource,
}

/// RFB 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    #[error("주소 해석 실패: {addr}")]
    AddressResolution { addr: String },

    #[error("멀티캐스트 주소가 아님: {addr}")]
    NotMulticast { addr: String },

    #[error("파일이 너무 큼: {blocks} 블록 필요")]
    FileTooLarge { blocks: u64 },

    #[error("헤더 손상: 데이터그램 {len} bytes < 헤더 {header_len} bytes")]
    MalformedHeader { len: usize, header_len: usize },

    #[error("체크섬 불일치: block={index}, expected {expected:08X}, got {actual:08X}")]
    ChecksumMismatch {
        index: u32,
        expected: u32,
        actual: u32,
    },

    #[error("프라이머리 블록 손상: payload {len} bytes, expected {expected} bytes")]
    MalformedPrimary { len: usize, expected: usize },
}

impl Error {
    /// 에러 분류 반환
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Io(_) => ErrorClass::Resource,
            Error::InvalidConfig(_)
            | Error::AddressResolution { .. }
            | Error::NotMulticast { .. }
            | Error::FileTooLarge { .. } => ErrorClass::Configuration,
            Error::MalformedHeader { .. }
            | Error::ChecksumMismatch { .. }
            | Error::MalformedPrimary { .. } => ErrorClass::TransientIntegrity,
        }
    }

    /// 폐기하고 계속 수신해도 되는 에러인지
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::TransientIntegrity
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(io.class(), ErrorClass::Resource);
        assert!(!io.is_transient());

        let cfg = Error::InvalidConfig("missing file".into());
        assert_eq!(cfg.class(), ErrorClass::Configuration);

        let crc = Error::ChecksumMismatch {
            index: 3,
            expected: 1,
            actual: 2,
        };
        assert!(crc.is_transient());
        assert!(Error::MalformedHeader { len: 2, header_len: 8 }.is_transient());
    }
}
