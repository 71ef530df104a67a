//! 전송 통계

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::option::{TransferOption, TSIZE};

/// 전송 한 번의 요약
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 실제 응답한 상대 주소 (요청 주소와 포트가 다를 수 있음)
    pub peer: Option<SocketAddr>,

    /// 협상된 블록 크기
    pub block_size: usize,

    /// OACK로 확정된 옵션
    pub negotiated: BTreeMap<String, TransferOption>,

    /// 송신 또는 수신한 DATA 블록 수 (마지막 짧은 블록 포함)
    pub total_blocks: u64,

    /// 파일 데이터 바이트 수
    pub total_bytes: u64,

    /// 블록 번호가 맞지 않아 건너뛴 응답 수
    pub skipped_responses: u64,

    /// 다른 주소에서 온 데이터그램 수
    pub foreign_datagrams: u64,

    started_at: Instant,

    /// 전송 소요 시간 (완료 시 확정)
    pub elapsed: Duration,
}

impl TransferStats {
    pub fn new(block_size: usize) -> Self {
        Self {
            peer: None,
            block_size,
            negotiated: BTreeMap::new(),
            total_blocks: 0,
            total_bytes: 0,
            skipped_responses: 0,
            foreign_datagrams: 0,
            started_at: Instant::now(),
            elapsed: Duration::ZERO,
        }
    }

    /// 블록 하나 기록
    pub fn record_block(&mut self, size: usize) {
        self.total_blocks += 1;
        self.total_bytes += size as u64;
    }

    /// 전송 완료 시점 기록
    pub fn finish(&mut self) {
        self.elapsed = self.started_at.elapsed();
    }

    /// 상대가 OACK로 알려준 tsize
    pub fn transfer_size(&self) -> Option<u64> {
        self.negotiated.get(TSIZE).map(TransferOption::value)
    }

    /// 처리율 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        if self.elapsed.is_zero() {
            return 0.0;
        }
        self.total_bytes as f64 / self.elapsed.as_secs_f64()
    }

    /// 요약 출력
    pub fn summary(&self) -> String {
        format!(
            "{} bytes in {} blocks (blksize={}) in {:.2}ms, {:.2} KB/s",
            self.total_bytes,
            self.total_blocks,
            self.block_size,
            self.elapsed.as_secs_f64() * 1000.0,
            self.throughput() / 1024.0
        )
    }
}
