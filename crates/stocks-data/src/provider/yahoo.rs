//! Yahoo Finance 시세 제공자.
//!
//! `yahoo_finance_api`로 일봉을 조회하여 원시 테이블로 변환합니다.
//! 컬럼은 `("Open", "AAPL")`처럼 필드명과 심볼이 결합된 복합 레이블로 내보냅니다.

use super::{ColumnLabel, MarketDataFetcher, RawTable, RawValue};
use crate::error::{DataError, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use stocks_core::Ticker;
use time::OffsetDateTime;
use tracing::debug;

/// Yahoo Finance 일봉 제공자.
pub struct YahooFetcher {
    connector: yahoo_finance_api::YahooConnector,
    auto_adjust: bool,
}

impl YahooFetcher {
    /// 새 제공자를 생성합니다.
    ///
    /// `auto_adjust`가 켜져 있으면 시가/고가/저가/종가를 수정 종가 비율로
    /// 보정하고 `Adj Close` 컬럼은 내보내지 않습니다.
    pub fn new(auto_adjust: bool) -> Result<Self> {
        let connector = yahoo_finance_api::YahooConnector::new()
            .map_err(|e| DataError::ConnectionError(format!("Yahoo Finance 연결 실패: {}", e)))?;
        Ok(Self {
            connector,
            auto_adjust,
        })
    }
}

#[async_trait]
impl MarketDataFetcher for YahooFetcher {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<RawTable>> {
        let symbol = ticker.as_str();
        let start_dt = naive_date_to_offset_datetime(start)?;
        let end_dt = naive_date_to_offset_datetime(end)?;

        debug!(ticker = symbol, start = %start, end = %end, "Yahoo Finance API 날짜 범위 호출");

        let response = self
            .connector
            .get_quote_history_interval(symbol, start_dt, end_dt, "1d")
            .await
            .map_err(|e| DataError::FetchError(format!("Yahoo Finance API 오류 ({}): {}", symbol, e)))?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::ParseError(format!("Quote 파싱 오류 ({}): {}", symbol, e)))?;

        if quotes.is_empty() {
            return Ok(None);
        }

        // 거래소 현지 날짜 기준으로 맞추기 위한 GMT 오프셋 (초)
        let gmt_offset = response
            .metadata()
            .map(|meta| meta.gmtoffset as i64)
            .unwrap_or(0);

        let rows: Vec<QuoteRow> = quotes
            .iter()
            .map(|q| QuoteRow {
                timestamp: q.timestamp as i64 + gmt_offset,
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                adjclose: q.adjclose,
                volume: q.volume as i64,
            })
            .collect();

        Ok(Some(build_table(symbol, &rows, self.auto_adjust)))
    }
}

/// 제공자 응답의 한 행.
#[derive(Debug, Clone, Copy)]
struct QuoteRow {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    adjclose: f64,
    volume: i64,
}

impl QuoteRow {
    /// 수정 종가 / 종가 비율. 계산할 수 없으면 1.
    fn adjust_ratio(&self) -> f64 {
        if self.close > 0.0 && self.adjclose.is_finite() && self.adjclose > 0.0 {
            self.adjclose / self.close
        } else {
            1.0
        }
    }
}

fn build_table(symbol: &str, rows: &[QuoteRow], auto_adjust: bool) -> RawTable {
    let price = |f: fn(&QuoteRow) -> f64| -> Vec<RawValue> {
        rows.iter()
            .map(|r| {
                let ratio = if auto_adjust { r.adjust_ratio() } else { 1.0 };
                RawValue::Float(f(r) * ratio)
            })
            .collect()
    };

    // 지수처럼 거래량이 전부 0인 종목은 거래량 없음으로 처리
    let has_volume = rows.iter().any(|r| r.volume > 0);
    let volume: Vec<RawValue> = rows
        .iter()
        .map(|r| {
            if has_volume {
                RawValue::Int(r.volume)
            } else {
                RawValue::Null
            }
        })
        .collect();

    let mut table = RawTable::default()
        .with_column(
            ColumnLabel::compound("Date", ""),
            rows.iter().map(|r| RawValue::Timestamp(r.timestamp)).collect(),
        )
        .with_column(ColumnLabel::compound("Open", symbol), price(|r: &QuoteRow| r.open))
        .with_column(ColumnLabel::compound("High", symbol), price(|r: &QuoteRow| r.high))
        .with_column(ColumnLabel::compound("Low", symbol), price(|r: &QuoteRow| r.low))
        .with_column(ColumnLabel::compound("Close", symbol), price(|r: &QuoteRow| r.close));

    if !auto_adjust {
        table = table.with_column(
            ColumnLabel::compound("Adj Close", symbol),
            rows.iter().map(|r| RawValue::Float(r.adjclose)).collect(),
        );
    }

    table.with_column(ColumnLabel::compound("Volume", symbol), volume)
}

/// NaiveDate를 UTC 자정의 OffsetDateTime으로 변환.
fn naive_date_to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime> {
    let month = time::Month::try_from(date.month() as u8)
        .map_err(|e| DataError::ParseError(format!("잘못된 월 ({}): {}", date, e)))?;
    let converted = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
        .map_err(|e| DataError::ParseError(format!("잘못된 날짜 ({}): {}", date, e)))?;
    Ok(converted.midnight().assume_utc())
}
