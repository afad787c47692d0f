//! 증분 일봉 동기화 모듈.
//!
//! 티커마다 다음 순서로 처리합니다:
//! 1. 구간 결정: 마지막 저장일 + 1일 (없으면 기본 시작일) ~ 오늘 (미포함)
//! 2. 시작일이 종료일 이상이면 조회하지 않고 종료 (이미 최신)
//! 3. 제공자 조회, 빈 응답이면 종료
//! 4. 정규화, 0행이면 종료
//! 5. 이미 저장된 날짜 제거, 남은 행이 없으면 종료
//! 6. 저장된 최근 종가와 함께 파생 지표 계산
//! 7. 한 트랜잭션으로 추가
//!
//! 티커 단위 실패는 기록 후 다음 티커로 진행하고, 스키마 수준 저장소
//! 오류는 이번 실행의 나머지를 중단합니다.

use crate::config::SyncConfig;
use crate::error::CollectorError;
use crate::{Result, SyncStats};
use chrono::NaiveDate;
use futures::{future, stream, StreamExt};
use std::time::{Duration, Instant};
use stocks_core::metrics::HISTORY_LEN;
use stocks_core::{enrich, Ticker};
use stocks_data::{normalize, BarStore, DataError, MarketDataFetcher};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// 한 번의 동기화 실행 옵션
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// 저장 이력이 없는 티커의 시작일
    pub default_start: NaiveDate,
    /// 조회 종료일 (미포함)
    pub today: NaiveDate,
    /// 티커 간 딜레이
    pub request_delay: Duration,
    /// 동시에 처리할 티커 수
    pub concurrency: usize,
}

impl SyncOptions {
    /// 기본값: 딜레이 없음, 순차 처리
    pub fn new(default_start: NaiveDate, today: NaiveDate) -> Self {
        Self {
            default_start,
            today,
            request_delay: Duration::ZERO,
            concurrency: 1,
        }
    }

    /// 설정과 오늘 날짜로 옵션 생성
    pub fn from_config(config: &SyncConfig, today: NaiveDate) -> Self {
        Self {
            default_start: config.default_start,
            today,
            request_delay: config.request_delay(),
            concurrency: config.concurrency.max(1),
        }
    }
}

/// 티커 하나의 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerOutcome {
    /// 이미 최신 (조회하지 않음)
    UpToDate,
    /// 제공자 응답 또는 정규화 결과가 비어 있음
    NoData,
    /// 조회한 날짜가 모두 저장되어 있음
    AlreadyStored,
    /// 새 행 저장
    Inserted(usize),
}

/// 조회 구간 `[start, end)` 계산. 조회할 것이 없으면 `None`.
pub fn sync_window(
    last_stored: Option<NaiveDate>,
    default_start: NaiveDate,
    today: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    let start = match last_stored {
        Some(date) => date.succ_opt()?,
        None => default_start,
    };
    (start < today).then_some((start, today))
}

/// 티커 하나를 동기화합니다.
#[instrument(skip(store, fetcher, options), fields(ticker = %ticker))]
pub async fn sync_ticker(
    store: &dyn BarStore,
    fetcher: &dyn MarketDataFetcher,
    ticker: &Ticker,
    options: &SyncOptions,
) -> stocks_data::Result<TickerOutcome> {
    let last_stored = store.max_date(ticker).await?;

    let Some((start, end)) = sync_window(last_stored, options.default_start, options.today) else {
        debug!(last_stored = ?last_stored, "이미 최신 데이터");
        return Ok(TickerOutcome::UpToDate);
    };

    let raw = match fetcher.fetch(ticker, start, end).await? {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            debug!(start = %start, end = %end, "새 데이터 없음");
            return Ok(TickerOutcome::NoData);
        }
    };

    let mut quotes = normalize(&raw)?;
    if quotes.is_empty() {
        debug!(start = %start, end = %end, "정규화 결과 없음");
        return Ok(TickerOutcome::NoData);
    }

    // 제공자가 경계 날짜를 포함해 돌려주는 경우 대비
    let existing = store.existing_dates(ticker).await?;
    let fetched = quotes.len();
    quotes.retain(|q| !existing.contains(&q.date));
    if quotes.is_empty() {
        debug!(fetched = fetched, "조회한 날짜가 모두 저장되어 있음");
        return Ok(TickerOutcome::AlreadyStored);
    }
    if quotes.len() < fetched {
        warn!(
            fetched = fetched,
            duplicates = fetched - quotes.len(),
            "이미 저장된 날짜 제외"
        );
    }

    let history = store.trailing_closes(ticker, HISTORY_LEN).await?;
    let bars = enrich(ticker, &quotes, &history);

    let inserted = store.append_rows(&bars).await?;
    info!(
        rows = inserted,
        first = %bars[0].date,
        last = %bars[bars.len() - 1].date,
        "새 일봉 저장"
    );

    Ok(TickerOutcome::Inserted(inserted))
}

/// 티커 목록을 동기화합니다.
///
/// `cancel`이 취소되면 새 티커를 시작하지 않고, 처리 중인 티커는 끝까지
/// 진행합니다.
pub async fn sync_tickers(
    store: &dyn BarStore,
    fetcher: &dyn MarketDataFetcher,
    tickers: &[Ticker],
    options: &SyncOptions,
    cancel: &CancellationToken,
) -> Result<SyncStats> {
    let started = Instant::now();
    let mut stats = SyncStats::new(tickers.len());

    info!(
        tickers = tickers.len(),
        provider = fetcher.name(),
        today = %options.today,
        concurrency = options.concurrency,
        "증분 동기화 시작"
    );

    let mut results = std::pin::pin!(stream::iter(tickers)
        .take_while(|_| future::ready(!cancel.is_cancelled()))
        .map(|ticker| async move {
            let outcome = sync_ticker(store, fetcher, ticker, options).await;
            // Rate limiting
            if !options.request_delay.is_zero() && !cancel.is_cancelled() {
                tokio::time::sleep(options.request_delay).await;
            }
            (ticker, outcome)
        })
        .buffer_unordered(options.concurrency.max(1)));

    let mut fatal: Option<DataError> = None;

    while let Some((ticker, outcome)) = results.next().await {
        match outcome {
            Ok(TickerOutcome::UpToDate) | Ok(TickerOutcome::AlreadyStored) => stats.skipped += 1,
            Ok(TickerOutcome::NoData) => stats.empty += 1,
            Ok(TickerOutcome::Inserted(rows)) => {
                stats.updated += 1;
                stats.rows_inserted += rows;
            }
            Err(e) if e.is_per_ticker() => {
                error!(ticker = %ticker, error = %e, "티커 동기화 실패");
                stats.record_failure(ticker.as_str(), &e);
            }
            Err(e) => {
                error!(ticker = %ticker, error = %e, "저장소 오류로 동기화 중단");
                stats.record_failure(ticker.as_str(), &e);
                fatal = Some(e);
                break;
            }
        }
    }

    stats.cancelled = stats.total.saturating_sub(stats.processed());
    if stats.cancelled > 0 && fatal.is_none() {
        warn!(remaining = stats.cancelled, "취소 신호로 남은 티커 건너뜀");
    }

    stats.elapsed = started.elapsed();
    stats.log_summary("증분 동기화");

    match fatal {
        Some(e) => Err(CollectorError::Run(format!(
            "저장소 오류로 동기화가 중단되었습니다: {}",
            e
        ))),
        None => Ok(stats),
    }
}
