//! 조회 및 요약 리포트 모듈.

use crate::error::CollectorError;
use crate::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use stocks_core::{Bar, BarSummary, Ticker};
use stocks_data::BarStore;

/// 저장된 티커와 행 수
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerCount {
    pub ticker: Ticker,
    pub rows: i64,
}

/// 티커 하나의 구간 리포트
#[derive(Debug, Clone, Serialize)]
pub struct TickerReport {
    pub ticker: Ticker,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub summary: BarSummary,
    #[serde(skip)]
    pub bars: Vec<Bar>,
}

/// CSV 내보내기 행 (가격과 이동평균 시계열)
#[derive(Debug, Serialize)]
struct SeriesRow {
    date: NaiveDate,
    close: f64,
    ma7: Option<f64>,
    volatility: Option<f64>,
    return_pct: Option<f64>,
}

/// 저장된 티커 목록
pub async fn list_tickers(store: &dyn BarStore) -> Result<Vec<TickerCount>> {
    let mut counts = Vec::new();
    for ticker in store.tickers().await? {
        let rows = store.count_rows(Some(&ticker)).await?;
        counts.push(TickerCount { ticker, rows });
    }
    Ok(counts)
}

/// 구간 `[from, to]` 리포트 생성
pub async fn build_report(
    store: &dyn BarStore,
    ticker: &Ticker,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<TickerReport> {
    if from > to {
        return Err(CollectorError::Config(format!(
            "조회 구간이 잘못되었습니다: {} > {}",
            from, to
        )));
    }

    if !store.tickers().await?.contains(ticker) {
        return Err(CollectorError::Run(format!("Unknown ticker: {}", ticker)));
    }

    let bars = store.load_range(ticker, from, to).await?;
    Ok(TickerReport {
        ticker: ticker.clone(),
        from,
        to,
        summary: BarSummary::from_bars(&bars),
        bars,
    })
}

fn fmt_opt(value: Option<f64>, suffix: &str) -> String {
    value
        .map(|v| format!("{:.2}{}", v, suffix))
        .unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for TickerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f)
    }
}

impl TickerReport {
    /// 사람이 읽는 텍스트 표
    pub fn render_text(&self) -> String {
        self.to_string()
    }

    fn write_text(&self, out: &mut impl fmt::Write) -> fmt::Result {
        let s = &self.summary;

        writeln!(out, "{} ({} ~ {})", self.ticker, self.from, self.to)?;
        if s.is_empty() {
            return writeln!(out, "  데이터 없음");
        }

        writeln!(out, "  rows              {}", s.rows)?;
        if let (Some(first), Some(last)) = (s.first_date, s.last_date) {
            writeln!(out, "  period            {} ~ {}", first, last)?;
        }
        writeln!(out, "  avg return        {}", fmt_opt(s.avg_return_pct, "%"))?;
        writeln!(out, "  avg volatility    {}", fmt_opt(s.avg_volatility, ""))?;
        writeln!(out, "  total change      {}", fmt_opt(s.total_change_pct, "%"))?;

        writeln!(out)?;
        writeln!(
            out,
            "  {:<10}  {:>10}  {:>10}  {:>10}  {:>8}",
            "date", "close", "ma7", "volatility", "return"
        )?;
        for bar in &self.bars {
            writeln!(
                out,
                "  {:<10}  {:>10.2}  {:>10}  {:>10}  {:>8}",
                bar.date.to_string(),
                bar.close,
                fmt_opt(bar.ma7, ""),
                fmt_opt(bar.volatility, ""),
                fmt_opt(bar.return_pct, "%"),
            )?;
        }

        Ok(())
    }

    /// JSON 요약
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 종가/이동평균 시계열 CSV 내보내기
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for bar in &self.bars {
            csv.serialize(SeriesRow {
                date: bar.date,
                close: bar.close,
                ma7: bar.ma7,
                volatility: bar.volatility,
                return_pct: bar.return_pct,
            })?;
        }
        csv.flush()?;
        Ok(())
    }
}
