//! 통합 테스트 공용 도구: 메모리 저장소와 응답이 정해진 제공자.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use stocks_core::{Bar, DailyQuote, Ticker};
use stocks_data::{
    BarStore, ColumnLabel, DataError, MarketDataFetcher, RawTable, RawValue, Result,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ticker(symbol: &str) -> Ticker {
    Ticker::new(symbol).unwrap()
}

/// 평일마다 종가가 1씩 오르는 시세
pub fn trading_days(start: NaiveDate, count: usize, first_close: f64) -> Vec<DailyQuote> {
    let mut quotes = Vec::new();
    let mut day = start;
    let mut close = first_close;
    while quotes.len() < count {
        use chrono::Datelike;
        if day.weekday().number_from_monday() <= 5 {
            quotes.push(
                DailyQuote::new(day, close - 0.5, close + 1.0, close - 1.0, close)
                    .with_volume(1_000 + quotes.len() as i64),
            );
            close += 1.0;
        }
        day = day.succ_opt().unwrap();
    }
    quotes
}

/// 제공자 형태의 원시 테이블 (필드+심볼 복합 레이블, `Adj Close` 포함)
pub fn raw_table(symbol: &str, quotes: &[DailyQuote]) -> RawTable {
    let column = |f: fn(&DailyQuote) -> RawValue| quotes.iter().map(f).collect::<Vec<_>>();

    RawTable::default()
        .with_column(
            ColumnLabel::compound("Date", ""),
            column(|q| RawValue::Text(format!("{} 00:00:00", q.date))),
        )
        .with_column(ColumnLabel::compound("Open", symbol), column(|q| RawValue::Float(q.open)))
        .with_column(ColumnLabel::compound("High", symbol), column(|q| RawValue::Float(q.high)))
        .with_column(ColumnLabel::compound("Low", symbol), column(|q| RawValue::Float(q.low)))
        .with_column(ColumnLabel::compound("Close", symbol), column(|q| RawValue::Float(q.close)))
        .with_column(
            ColumnLabel::compound("Adj Close", symbol),
            column(|q| RawValue::Float(q.close * 0.5)),
        )
        .with_column(
            ColumnLabel::compound("Volume", symbol),
            column(|q| q.volume.map(RawValue::Int).unwrap_or(RawValue::Null)),
        )
}

/// 메모리 일봉 저장소.
///
/// `(ticker, date)` 유일성을 지키며, 위반 시 아무 것도 쓰지 않고
/// `DuplicateError`를 돌려줍니다.
#[derive(Default)]
pub struct MemoryBarStore {
    rows: Mutex<BTreeMap<(Ticker, NaiveDate), Bar>>,
    broken: AtomicBool,
    append_calls: AtomicUsize,
}

impl MemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, bars: impl IntoIterator<Item = Bar>) {
        let mut rows = self.rows.lock().unwrap();
        for bar in bars {
            rows.insert((bar.ticker.clone(), bar.date), bar);
        }
    }

    /// 이후 모든 호출을 연결 실패로 만듭니다.
    pub fn break_connection(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn bars(&self, ticker: &Ticker) -> Vec<Bar> {
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|b| &b.ticker == ticker)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(DataError::ConnectionError("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BarStore for MemoryBarStore {
    async fn ensure_schema(&self) -> Result<()> {
        self.check()
    }

    async fn max_date(&self, ticker: &Ticker) -> Result<Option<NaiveDate>> {
        self.check()?;
        Ok(self.bars(ticker).iter().map(|b| b.date).max())
    }

    async fn existing_dates(&self, ticker: &Ticker) -> Result<HashSet<NaiveDate>> {
        self.check()?;
        Ok(self.bars(ticker).iter().map(|b| b.date).collect())
    }

    async fn trailing_closes(&self, ticker: &Ticker, limit: usize) -> Result<Vec<f64>> {
        self.check()?;
        let bars = self.bars(ticker);
        let skip = bars.len().saturating_sub(limit);
        Ok(bars.iter().skip(skip).map(|b| b.close).collect())
    }

    async fn append_rows(&self, rows: &[Bar]) -> Result<usize> {
        self.check()?;
        self.append_calls.fetch_add(1, Ordering::SeqCst);

        let mut stored = self.rows.lock().unwrap();
        let mut keys = HashSet::new();
        for bar in rows {
            let key = (bar.ticker.clone(), bar.date);
            if stored.contains_key(&key) || !keys.insert(key) {
                return Err(DataError::DuplicateError(format!(
                    "{} {}",
                    bar.ticker, bar.date
                )));
            }
        }
        for bar in rows {
            stored.insert((bar.ticker.clone(), bar.date), bar.clone());
        }
        Ok(rows.len())
    }

    async fn replace_all(&self, rows: &[Bar]) -> Result<usize> {
        self.check()?;
        let mut stored = self.rows.lock().unwrap();
        stored.clear();
        for bar in rows {
            stored.insert((bar.ticker.clone(), bar.date), bar.clone());
        }
        Ok(stored.len())
    }

    async fn load_range(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>> {
        self.check()?;
        Ok(self
            .bars(ticker)
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect())
    }

    async fn tickers(&self) -> Result<Vec<Ticker>> {
        self.check()?;
        let mut tickers: Vec<Ticker> = self
            .rows
            .lock()
            .unwrap()
            .keys()
            .map(|(t, _)| t.clone())
            .collect();
        tickers.dedup();
        Ok(tickers)
    }

    async fn count_rows(&self, ticker: Option<&Ticker>) -> Result<i64> {
        self.check()?;
        let count = match ticker {
            Some(t) => self.bars(t).len(),
            None => self.len(),
        };
        Ok(count as i64)
    }
}

/// 티커별 제공자 응답
#[derive(Clone)]
pub enum Response {
    /// 전체 이력 중 요청 구간 `[start, end)`만 반환
    History(Vec<DailyQuote>),
    /// 요청 구간 하루 전 경계 날짜까지 포함해 반환
    Overlapping(Vec<DailyQuote>),
    /// 요청과 무관하게 고정 테이블 반환
    Fixed(RawTable),
    /// 데이터 없음
    Empty,
    /// 조회 실패
    Fail(String),
}

/// 제공자 호출 기록
#[derive(Debug, Clone, PartialEq)]
pub struct FetchCall {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// 응답이 정해진 제공자
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, symbol: &str, response: Response) -> Self {
        self.set(symbol, response);
        self
    }

    pub fn set(&self, symbol: &str, response: Response) {
        self.responses
            .lock()
            .unwrap()
            .insert(symbol.to_string(), response);
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, symbol: &str) -> Vec<FetchCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.ticker == symbol)
            .collect()
    }
}

#[async_trait]
impl MarketDataFetcher for ScriptedFetcher {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<RawTable>> {
        self.calls.lock().unwrap().push(FetchCall {
            ticker: ticker.to_string(),
            start,
            end,
        });

        let response = self
            .responses
            .lock()
            .unwrap()
            .get(ticker.as_str())
            .cloned()
            .unwrap_or(Response::Empty);

        let window = |quotes: &[DailyQuote], from: NaiveDate| -> Option<RawTable> {
            let selected: Vec<DailyQuote> = quotes
                .iter()
                .filter(|q| q.date >= from && q.date < end)
                .cloned()
                .collect();
            (!selected.is_empty()).then(|| raw_table(ticker.as_str(), &selected))
        };

        match response {
            Response::History(quotes) => Ok(window(&quotes, start)),
            Response::Overlapping(quotes) => {
                Ok(window(&quotes, start.pred_opt().unwrap_or(start)))
            }
            Response::Fixed(table) => Ok(Some(table)),
            Response::Empty => Ok(None),
            Response::Fail(msg) => Err(DataError::FetchError(msg)),
        }
    }
}
