//! 동기화 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 실패한 티커와 원인
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerFailure {
    pub ticker: String,
    pub error: String,
}

/// 동기화 작업 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// 처리 대상 티커 수
    pub total: usize,
    /// 새 행이 저장된 티커 수
    pub updated: usize,
    /// 건너뛴 티커 수 (이미 최신 데이터)
    pub skipped: usize,
    /// 빈 데이터 (조회 성공, 데이터 없음)
    pub empty: usize,
    /// 실패한 티커 수
    pub failed: usize,
    /// 취소로 처리하지 않은 티커 수
    pub cancelled: usize,
    /// 저장된 총 일봉 수
    pub rows_inserted: usize,
    /// 실패 상세
    pub failures: Vec<TickerFailure>,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SyncStats {
    /// 새 통계 객체 생성
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// 실패 기록
    pub fn record_failure(&mut self, ticker: &str, error: impl ToString) {
        self.failed += 1;
        self.failures.push(TickerFailure {
            ticker: ticker.to_string(),
            error: error.to_string(),
        });
    }

    /// 처리를 마친 티커 수
    pub fn processed(&self) -> usize {
        self.updated + self.skipped + self.empty + self.failed
    }

    /// 실패가 있었는지 여부
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        let processed = self.processed();
        if processed == 0 {
            0.0
        } else {
            ((processed - self.failed) as f64 / processed as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            updated = self.updated,
            skipped = self.skipped,
            empty = self.empty,
            failed = self.failed,
            cancelled = self.cancelled,
            rows_inserted = self.rows_inserted,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "동기화 완료"
        );

        if self.has_failures() {
            tracing::warn!(operation = operation, failed = self.failed, "일부 티커 처리 실패");
            for failure in &self.failures {
                tracing::warn!(ticker = %failure.ticker, error = %failure.error, "실패한 티커");
            }
        }
    }
}
