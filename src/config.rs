//! 전송 엔진 설정

use std::time::Duration;

use crate::{MAX_BLOCK_SIZE, MAX_DATAGRAM_SIZE};

/// Hedwig 전송 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 수신 단계마다 적용할 타임아웃
    /// None이면 데이터그램이 올 때까지 무한 대기
    pub recv_timeout: Option<Duration>,

    /// 요청 전송 전에 옵션 범위 검사
    pub validate_options: bool,

    /// 수신 버퍼 크기 (바이트)
    /// 협상된 블록 크기 + 4보다 작으면 자동으로 늘어남
    pub recv_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recv_timeout: Some(Duration::from_secs(5)),
            validate_options: true,
            recv_buffer_size: MAX_DATAGRAM_SIZE,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 수신 타임아웃 지정
    pub fn with_recv_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// 블록 크기에 맞춘 실제 수신 버퍼 크기
    pub fn buffer_size_for(&self, block_size: usize) -> usize {
        self.recv_buffer_size.max(block_size.min(MAX_BLOCK_SIZE) + 4)
    }

    /// 로컬 네트워크용 설정
    pub fn lan() -> Self {
        Self {
            recv_timeout: Some(Duration::from_millis(500)),
            ..Self::default()
        }
    }

    /// 불안정한 네트워크용 설정
    pub fn unreliable() -> Self {
        Self {
            recv_timeout: Some(Duration::from_secs(30)),
            ..Self::default()
        }
    }
}
