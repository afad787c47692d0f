//! 수집/유지보수 작업 모듈.

pub mod backfill;
pub mod chart;
pub mod daily_sync;
pub mod migrate;
pub mod report;
pub mod scheduler;

pub use backfill::{backfill, BackfillOptions};
pub use chart::{DEFAULT_CHART_HEIGHT, DEFAULT_CHART_WIDTH};
pub use daily_sync::{sync_ticker, sync_tickers, sync_window, SyncOptions, TickerOutcome};
pub use migrate::{migrate_bars, migrate_sqlite, IfExists, MigrateOptions, MigrationStats};
pub use report::{build_report, list_tickers, TickerCount, TickerReport};
pub use scheduler::{next_run_after, run_daemon, today_in, Clock, SystemClock};
