//! 백필 통합 테스트.

mod common;

use common::{date, ticker, trading_days, MemoryBarStore, Response, ScriptedFetcher};
use std::time::Duration;
use stocks_collector::modules::{backfill, BackfillOptions};
use stocks_collector::CollectorError;
use stocks_core::{enrich, DailyQuote};
use tokio_util::sync::CancellationToken;

fn options() -> BackfillOptions {
    BackfillOptions {
        start: date(2024, 1, 1),
        end: date(2024, 2, 1),
        request_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_backfill_replaces_whole_table() {
    let store = MemoryBarStore::new();
    let stale = ticker("OLD");
    store.seed(enrich(
        &stale,
        &[DailyQuote::new(date(2023, 6, 1), 1.0, 1.0, 1.0, 1.0)],
        &[],
    ));

    let fetcher = ScriptedFetcher::new()
        .respond("AAPL", Response::History(trading_days(date(2024, 1, 2), 8, 100.0)))
        .respond("MSFT", Response::History(trading_days(date(2024, 1, 2), 3, 300.0)));

    let stats = backfill(
        &store,
        &fetcher,
        &[ticker("AAPL"), ticker("MSFT")],
        &options(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.updated, 2);
    assert_eq!(stats.rows_inserted, 11);
    assert!(store.bars(&stale).is_empty());

    // 티커별로 이력 없이 계산: MSFT 첫 행은 AAPL 종가와 섞이지 않음
    let msft = store.bars(&ticker("MSFT"));
    assert_eq!(msft[0].ma7, Some(300.0));
    assert_eq!(msft[0].volatility, None);

    let calls = fetcher.calls_for("AAPL");
    assert_eq!(calls[0].start, date(2024, 1, 1));
    assert_eq!(calls[0].end, date(2024, 2, 1));
}

#[tokio::test]
async fn test_backfill_skips_failed_tickers() {
    let store = MemoryBarStore::new();
    let fetcher = ScriptedFetcher::new()
        .respond("AAPL", Response::History(trading_days(date(2024, 1, 2), 4, 100.0)))
        .respond("BAD", Response::Fail("timeout".to_string()))
        .respond("NONE", Response::Empty);

    let stats = backfill(
        &store,
        &fetcher,
        &[ticker("AAPL"), ticker("BAD"), ticker("NONE")],
        &options(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.updated, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.empty, 1);
    assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn test_backfill_refuses_to_wipe_with_nothing_downloaded() {
    let store = MemoryBarStore::new();
    let aapl = ticker("AAPL");
    store.seed(enrich(
        &aapl,
        &[DailyQuote::new(date(2023, 6, 1), 1.0, 1.0, 1.0, 1.0)],
        &[],
    ));
    let fetcher = ScriptedFetcher::new().respond("AAPL", Response::Fail("HTTP 429".to_string()));

    let result = backfill(&store, &fetcher, &[aapl.clone()], &options(), &CancellationToken::new()).await;

    assert!(matches!(result, Err(CollectorError::Run(_))));
    assert_eq!(store.bars(&aapl).len(), 1);
}

#[tokio::test]
async fn test_backfill_rejects_empty_window() {
    let store = MemoryBarStore::new();
    let fetcher = ScriptedFetcher::new();
    let mut opts = options();
    opts.end = opts.start;

    let result = backfill(&store, &fetcher, &[ticker("AAPL")], &opts, &CancellationToken::new()).await;

    assert!(matches!(result, Err(CollectorError::Config(_))));
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_cancelled_backfill_keeps_table() {
    let store = MemoryBarStore::new();
    let aapl = ticker("AAPL");
    store.seed(enrich(
        &aapl,
        &[DailyQuote::new(date(2023, 6, 1), 1.0, 1.0, 1.0, 1.0)],
        &[],
    ));
    let fetcher = ScriptedFetcher::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = backfill(&store, &fetcher, &[aapl.clone()], &options(), &cancel).await;

    assert!(matches!(result, Err(CollectorError::Run(_))));
    assert_eq!(store.len(), 1);
}
