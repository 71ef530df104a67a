//! 에러 타입 정의

use std::net::SocketAddr;

use thiserror::Error;

use crate::message::ErrorCode;

/// Hedwig 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    /// 소켓 송수신 실패
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 수신 타임아웃
    #[error("수신 타임아웃: peer={peer}")]
    Timeout { peer: SocketAddr },

    /// 상대가 ERROR 메시지로 응답
    #[error("TFTP 에러 {code}: {}", .message.as_deref().unwrap_or("<no message>"))]
    Protocol {
        code: ErrorCode,
        message: Option<String>,
    },

    #[error("알 수 없는 opcode: {0}")]
    UnknownOperation(u16),

    #[error("알 수 없는 에러 코드: {0}")]
    UnknownErrorCode(u16),

    #[error("잘못된 메시지: {0}")]
    Malformed(&'static str),

    #[error("잘못된 옵션 값: {0:?}")]
    MalformedOptionValue(String),

    /// 유효 범위를 벗어난 옵션
    #[error("유효하지 않은 옵션: {label}={value}")]
    InvalidOption { label: String, value: u64 },
}

impl Error {
    /// 전송 계층 에러 여부 (소켓 실패, 타임아웃)
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Timeout { .. })
    }

    /// 수신 바이트 해석 실패 여부
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::UnknownOperation(_)
                | Error::UnknownErrorCode(_)
                | Error::Malformed(_)
                | Error::MalformedOptionValue(_)
        )
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
