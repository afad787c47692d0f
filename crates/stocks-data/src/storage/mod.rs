//! 일봉 저장소.
//!
//! `stocks_data` 테이블은 `(ticker, date)`마다 한 행을 가집니다.
//! 증분 수집기는 [`BarStore::append_rows`]만 사용하며, 전체 교체
//! ([`BarStore::replace_all`])는 백필과 마이그레이션 전용입니다.

pub mod postgres;
pub mod sqlite;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::FromRow;
use std::collections::HashSet;
use stocks_core::{Bar, Ticker};

/// 일봉 테이블 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct BarRecord {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<i64>,
    pub return_pct: Option<f64>,
    pub ma7: Option<f64>,
    pub volatility: Option<f64>,
}

impl BarRecord {
    /// Bar 도메인 객체로 변환.
    pub fn to_bar(&self) -> Result<Bar> {
        Ok(Bar {
            ticker: Ticker::new(&self.ticker)?,
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            return_pct: self.return_pct,
            ma7: self.ma7,
            volatility: self.volatility,
        })
    }
}

/// 일봉 저장소 trait.
#[async_trait]
pub trait BarStore: Send + Sync {
    /// 테이블이 없으면 생성합니다. 매 시작 시 호출해도 안전합니다.
    async fn ensure_schema(&self) -> Result<()>;

    /// 티커의 마지막 저장 날짜.
    async fn max_date(&self, ticker: &Ticker) -> Result<Option<NaiveDate>>;

    /// 티커의 저장된 모든 날짜 (중복 제거용).
    async fn existing_dates(&self, ticker: &Ticker) -> Result<HashSet<NaiveDate>>;

    /// 가장 최근 `limit`개 종가 (날짜 오름차순).
    ///
    /// 증분 이동 윈도우 계산에 사용합니다.
    async fn trailing_closes(&self, ticker: &Ticker, limit: usize) -> Result<Vec<f64>>;

    /// 새 일봉을 한 트랜잭션으로 추가합니다.
    ///
    /// 중복 제거는 호출자 책임입니다. 이미 있는 `(ticker, date)`가 포함되면
    /// `DataError::DuplicateError`로 실패하고 아무 행도 저장되지 않습니다.
    async fn append_rows(&self, rows: &[Bar]) -> Result<usize>;

    /// 테이블 전체를 주어진 행으로 교체합니다 (백필/마이그레이션 전용).
    async fn replace_all(&self, rows: &[Bar]) -> Result<usize>;

    /// 날짜 구간 `[start, end]`의 일봉 (날짜 오름차순).
    async fn load_range(&self, ticker: &Ticker, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<Bar>>;

    /// 저장된 티커 목록.
    async fn tickers(&self) -> Result<Vec<Ticker>>;

    /// 행 수 (`ticker`가 없으면 전체).
    async fn count_rows(&self, ticker: Option<&Ticker>) -> Result<i64>;
}
