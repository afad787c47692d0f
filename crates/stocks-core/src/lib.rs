//! # Stocks Core
//!
//! 일봉 주가 파이프라인의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 수집기와 저장소 전반에서 사용되는 기본 타입을 제공합니다:
//! - 티커 심볼 정의
//! - 일봉(Bar) 및 정규화된 시세 레코드
//! - 파생 지표 계산 (수익률, 7일 이동평균, 변동성)
//! - 기간 요약 통계
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
