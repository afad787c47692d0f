//! 일봉 데이터 타입 및 구조체.
//!
//! 이 모듈은 일봉 관련 타입을 정의합니다:
//! - `DailyQuote` - 정규화기가 생성하는 고정 형태의 원시 일봉
//! - `Bar` - 파생 지표가 포함된 저장용 일봉

use crate::types::Ticker;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 정규화된 일봉 시세.
///
/// 데이터 제공자의 응답 형태와 무관하게 이 형태로 고정됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyQuote {
    /// 거래일 (시간 정보 없음)
    pub date: NaiveDate,
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 종가
    pub close: f64,
    /// 거래량 (지수 등 제공되지 않는 종목은 None)
    pub volume: Option<i64>,
}

impl DailyQuote {
    /// 새 일봉 시세를 생성합니다.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    /// 거래량을 설정합니다.
    pub fn with_volume(mut self, volume: i64) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// 저장소의 한 행에 해당하는 일봉.
///
/// `(ticker, date)`는 저장소 내에서 유일합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// 티커 심볼
    pub ticker: Ticker,
    /// 거래일
    pub date: NaiveDate,
    /// 시가 (수정주가)
    pub open: f64,
    /// 고가 (수정주가)
    pub high: f64,
    /// 저가 (수정주가)
    pub low: f64,
    /// 종가 (수정주가)
    pub close: f64,
    /// 거래량
    pub volume: Option<i64>,
    /// 당일 수익률 (%) = (종가 - 시가) / 시가 × 100
    pub return_pct: Option<f64>,
    /// 최근 7거래일 종가 이동평균
    pub ma7: Option<f64>,
    /// 최근 7거래일 종가 표본 표준편차 (2개 미만이면 None)
    pub volatility: Option<f64>,
}

impl Bar {
    /// 파생 지표 없이 시세에서 일봉을 생성합니다.
    pub fn from_quote(ticker: Ticker, quote: &DailyQuote) -> Self {
        Self {
            ticker,
            date: quote.date,
            open: quote.open,
            high: quote.high,
            low: quote.low,
            close: quote.close,
            volume: quote.volume,
            return_pct: None,
            ma7: None,
            volatility: None,
        }
    }
}
