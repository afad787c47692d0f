//! Scheduled incremental collector for daily stock bars.
//!
//! 이 crate는 설정된 티커의 일봉을 PostgreSQL에 최신 상태로 유지하는 바이너리를 제공합니다:
//! - 증분 동기화 (마지막 저장일 다음 날부터 오늘 전까지)
//! - 일일 스케줄러 데몬
//! - 전체 기간 백필
//! - 조회/요약 리포트
//! - 레거시 SQLite → PostgreSQL 마이그레이션

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::SyncStats;
