//! 데이터 모듈 오류 타입.

use stocks_core::CoreError;
use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 중복 레코드 (`(ticker, date)` 고유 제약 위반)
    #[error("Duplicate record: {0}")]
    DuplicateError(String),

    /// 스키마 적용 오류
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// 데이터 삽입 오류
    #[error("Insert error: {0}")]
    InsertError(String),

    /// 데이터 가져오기 오류 (외부 제공자)
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// 제공자 응답 스키마 위반 (날짜/가격 컬럼 없음)
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// 산술적으로 정의되지 않는 일봉
    #[error("Invalid bar: {0}")]
    InvalidBar(String),

    /// 파싱 오류
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl DataError {
    /// 티커 단위로 복구 가능한 오류인지 확인합니다.
    ///
    /// `false`이면 저장소 자체가 쓸 수 없는 상태이므로 같은 실행의
    /// 나머지 티커도 실패하게 됩니다.
    pub fn is_per_ticker(&self) -> bool {
        matches!(
            self,
            DataError::FetchError(_)
                | DataError::SchemaError(_)
                | DataError::InvalidBar(_)
                | DataError::ParseError(_)
                | DataError::InsertError(_)
                | DataError::DuplicateError(_)
        )
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DataError::ConnectionError(err.to_string())
            }
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                if code == "23505" || code == "2067" || code == "1555" {
                    // PostgreSQL / SQLite 고유 제약 조건 위반
                    DataError::DuplicateError(db_err.message().to_string())
                } else {
                    DataError::QueryError(db_err.message().to_string())
                }
            }
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

impl From<CoreError> for DataError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidBar(msg) => DataError::InvalidBar(msg),
            other @ CoreError::InvalidTicker(_) => DataError::ParseError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
