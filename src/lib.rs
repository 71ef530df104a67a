//! # Hedwig
//!
//! UDP 기반 TFTP 클라이언트 엔진 (RFC 1350, 옵션 협상 RFC 2347~2349)
//!
//! ## 구성
//! - **option**: `blksize` / `timeout` / `tsize` 옵션 코덱
//! - **message**: RRQ/WRQ 요청과 DATA/ACK/ERROR/OACK 응답 모델
//! - **codec**: 메시지 ↔ 데이터그램 바이트 변환
//! - **transfer**: 업로드/다운로드 상태 기계 (stop-and-wait, 재전송 없음)
//!
//! 소켓은 호출자가 만들고 소유한다. 엔진은 빌려서 세션 하나를 끝까지 진행한다.

pub mod codec;
pub mod config;
pub mod error;
pub mod message;
pub mod option;
pub mod stats;
pub mod transfer;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use message::{ErrorCode, Message, Operation, Request, Response};
pub use option::TransferOption;
pub use stats::TransferStats;
pub use transfer::Client;
pub use transport::Transport;

/// TFTP 표준 포트
pub const DEFAULT_PORT: u16 = 69;

/// 기본 블록 크기 (바이트, RFC 1350)
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// 최소 블록 크기 (RFC 2348)
pub const MIN_BLOCK_SIZE: usize = 8;

/// 최대 블록 크기 (RFC 2348)
pub const MAX_BLOCK_SIZE: usize = 65464;

/// timeout 옵션 범위 (초, RFC 2349)
pub const MIN_TIMEOUT_SECS: u64 = 1;
pub const MAX_TIMEOUT_SECS: u64 = 255;

/// UDP 데이터그램 최대 크기
pub const MAX_DATAGRAM_SIZE: usize = 65536;

/// 기본 전송 모드
pub const DEFAULT_MODE: &str = "octet";
