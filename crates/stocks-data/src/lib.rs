//! 일봉 데이터 수집 및 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - 외부 시세 제공자 추상화와 Yahoo Finance 구현
//! - 제공자 응답을 고정 스키마로 바꾸는 정규화기
//! - PostgreSQL 일봉 저장소 (`stocks_data` 테이블)
//! - 레거시 SQLite 저장소 읽기 (마이그레이션용)

pub mod error;
pub mod normalize;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};
pub use normalize::normalize;

// 제공자 타입 재내보내기
pub use provider::{ColumnLabel, MarketDataFetcher, RawColumn, RawTable, RawValue, YahooFetcher};

// 저장소 타입 재내보내기
pub use storage::postgres::{DatabaseConfig, PgBarStore};
pub use storage::sqlite::SqliteBarReader;
pub use storage::{BarRecord, BarStore};
