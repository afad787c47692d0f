//! 일봉 데이터 도메인 모델.

mod bar;
pub mod metrics;
mod summary;

pub use bar::*;
pub use metrics::enrich;
pub use summary::*;
