//! 전체 기간 백필 모듈.
//!
//! 모든 티커의 전체 구간을 다시 받아 지표를 계산한 뒤 테이블을 한
//! 트랜잭션으로 교체합니다. 받은 데이터가 하나도 없으면 테이블을 건드리지
//! 않습니다.

use crate::error::CollectorError;
use crate::{Result, SyncStats};
use chrono::NaiveDate;
use std::time::{Duration, Instant};
use stocks_core::{enrich, Bar, Ticker};
use stocks_data::{normalize, BarStore, MarketDataFetcher};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 백필 옵션
#[derive(Debug, Clone)]
pub struct BackfillOptions {
    /// 시작일 (포함)
    pub start: NaiveDate,
    /// 종료일 (미포함)
    pub end: NaiveDate,
    /// 티커 간 딜레이
    pub request_delay: Duration,
}

/// 티커 하나를 처음부터 받아 지표까지 계산합니다.
async fn download_ticker(
    fetcher: &dyn MarketDataFetcher,
    ticker: &Ticker,
    options: &BackfillOptions,
) -> stocks_data::Result<Vec<Bar>> {
    let Some(raw) = fetcher.fetch(ticker, options.start, options.end).await? else {
        return Ok(Vec::new());
    };
    let quotes = normalize(&raw)?;
    Ok(enrich(ticker, &quotes, &[]))
}

/// 테이블 전체를 다시 채웁니다.
pub async fn backfill(
    store: &dyn BarStore,
    fetcher: &dyn MarketDataFetcher,
    tickers: &[Ticker],
    options: &BackfillOptions,
    cancel: &CancellationToken,
) -> Result<SyncStats> {
    if options.start >= options.end {
        return Err(CollectorError::Config(format!(
            "백필 구간이 비어 있습니다: {} ~ {}",
            options.start, options.end
        )));
    }

    let started = Instant::now();
    let mut stats = SyncStats::new(tickers.len());
    let mut rows: Vec<Bar> = Vec::new();

    info!(
        tickers = tickers.len(),
        start = %options.start,
        end = %options.end,
        "백필 시작"
    );

    for (idx, ticker) in tickers.iter().enumerate() {
        if cancel.is_cancelled() {
            stats.cancelled = tickers.len() - idx;
            stats.elapsed = started.elapsed();
            stats.log_summary("백필");
            return Err(CollectorError::Run(
                "백필이 취소되어 테이블을 변경하지 않았습니다".to_string(),
            ));
        }

        debug!(
            ticker = %ticker,
            progress = format!("{}/{}", idx + 1, tickers.len()),
            "다운로드 시작"
        );

        match download_ticker(fetcher, ticker, options).await {
            Ok(bars) if !bars.is_empty() => {
                info!(ticker = %ticker, rows = bars.len(), "다운로드 완료");
                stats.updated += 1;
                rows.extend(bars);
            }
            Ok(_) => {
                warn!(ticker = %ticker, "데이터 없음");
                stats.empty += 1;
            }
            Err(e) => {
                error!(ticker = %ticker, error = %e, "다운로드 실패");
                stats.record_failure(ticker.as_str(), &e);
            }
        }

        if !options.request_delay.is_zero() {
            tokio::time::sleep(options.request_delay).await;
        }
    }

    if rows.is_empty() {
        stats.elapsed = started.elapsed();
        stats.log_summary("백필");
        return Err(CollectorError::Run(
            "다운로드된 데이터가 없어 테이블을 유지합니다".to_string(),
        ));
    }

    stats.rows_inserted = store.replace_all(&rows).await?;
    stats.elapsed = started.elapsed();
    stats.log_summary("백필");

    Ok(stats)
}
