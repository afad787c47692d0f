//! 도메인 에러 타입.
//!
//! 이 모듈은 티커 검증과 파생 지표 계산 과정에서 발생하는 에러를 정의합니다.

use thiserror::Error;

/// 핵심 도메인 에러.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// 잘못된 티커 심볼
    #[error("잘못된 티커: {0}")]
    InvalidTicker(String),

    /// 산술적으로 정의되지 않는 일봉 (예: 시가 0)
    #[error("잘못된 일봉: {0}")]
    InvalidBar(String),
}

/// 도메인 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
