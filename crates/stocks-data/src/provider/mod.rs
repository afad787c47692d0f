//! 외부 시세 제공자.
//!
//! 제공자는 종목과 날짜 범위를 받아 원시 테이블을 반환합니다.
//! 원시 테이블의 컬럼 레이블은 제공자마다 다를 수 있으며
//! (`("Close", "AAPL")` 같은 복합 레이블, 수정 종가 컬럼 등),
//! 고정 스키마로의 변환은 [`crate::normalize`]가 담당합니다.

pub mod yahoo;

pub use yahoo::YahooFetcher;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use stocks_core::Ticker;

/// 컬럼 레이블.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnLabel {
    /// 단일 레이블 (예: "Close")
    Flat(String),
    /// 계층형 레이블 (예: `["Close", "AAPL"]`)
    Compound(Vec<String>),
}

impl ColumnLabel {
    /// 단일 레이블을 생성합니다.
    pub fn flat(name: impl Into<String>) -> Self {
        Self::Flat(name.into())
    }

    /// 필드명 + 심볼 복합 레이블을 생성합니다.
    pub fn compound(field: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::Compound(vec![field.into(), symbol.into()])
    }

    /// 레이블을 구성하는 이름 조각들.
    pub fn parts(&self) -> Vec<&str> {
        match self {
            Self::Flat(name) => vec![name.as_str()],
            Self::Compound(parts) => parts.iter().map(String::as_str).collect(),
        }
    }
}

/// 원시 셀 값.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// 값 없음
    Null,
    /// 부동소수점
    Float(f64),
    /// 정수
    Int(i64),
    /// 문자열 (날짜 문자열 포함)
    Text(String),
    /// Unix epoch 초
    Timestamp(i64),
}

impl RawValue {
    /// 유한한 실수로 해석합니다.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) if v.is_finite() => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// 음이 아닌 정수로 해석합니다.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) if *v >= 0 => Some(*v),
            Self::Float(v) if v.is_finite() && *v >= 0.0 => Some(v.round() as i64),
            Self::Text(s) => s.trim().parse::<i64>().ok().filter(|v| *v >= 0),
            _ => None,
        }
    }
}

/// 원시 컬럼.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub label: ColumnLabel,
    pub values: Vec<RawValue>,
}

impl RawColumn {
    pub fn new(label: ColumnLabel, values: Vec<RawValue>) -> Self {
        Self { label, values }
    }
}

/// 제공자가 반환한 원시 일봉 테이블 (컬럼 지향).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<RawColumn>,
}

impl RawTable {
    pub fn new(columns: Vec<RawColumn>) -> Self {
        Self { columns }
    }

    /// 컬럼을 추가합니다.
    pub fn with_column(mut self, label: ColumnLabel, values: Vec<RawValue>) -> Self {
        self.columns.push(RawColumn::new(label, values));
        self
    }

    /// 행 수 (가장 긴 컬럼 기준).
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(|c| c.values.len()).max().unwrap_or(0)
    }

    /// 데이터가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}

/// 시세 제공자 trait.
///
/// `start`는 포함, `end`는 제외입니다. 호출자는 `start >= end`인 경우
/// 호출하지 않아야 합니다.
#[async_trait]
pub trait MarketDataFetcher: Send + Sync {
    /// 제공자 이름.
    fn name(&self) -> &str;

    /// 일봉 조회.
    ///
    /// 데이터가 없으면 `Ok(None)` 또는 빈 테이블을 반환합니다.
    ///
    /// # Errors
    ///
    /// - `DataError::FetchError`: 네트워크 실패 또는 제공자 오류
    /// - `DataError::ParseError`: 응답 파싱 실패
    async fn fetch(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<RawTable>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_conversions() {
        assert_eq!(RawValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(RawValue::Float(f64::NAN).as_f64(), None);
        assert_eq!(RawValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(RawValue::Text(" 2.25 ".into()).as_f64(), Some(2.25));
        assert_eq!(RawValue::Null.as_f64(), None);

        assert_eq!(RawValue::Float(1500.0).as_i64(), Some(1500));
        assert_eq!(RawValue::Int(-1).as_i64(), None);
        assert_eq!(RawValue::Null.as_i64(), None);
    }

    #[test]
    fn test_row_count() {
        let table = RawTable::default()
            .with_column(ColumnLabel::flat("Open"), vec![RawValue::Float(1.0)])
            .with_column(
                ColumnLabel::compound("Close", "AAPL"),
                vec![RawValue::Float(1.0), RawValue::Float(2.0)],
            );
        assert_eq!(table.row_count(), 2);
        assert!(!table.is_empty());
        assert!(RawTable::default().is_empty());
    }

    #[test]
    fn test_label_parts() {
        assert_eq!(ColumnLabel::flat("Date").parts(), vec!["Date"]);
        assert_eq!(
            ColumnLabel::compound("Close", "AAPL").parts(),
            vec!["Close", "AAPL"]
        );
    }
}
