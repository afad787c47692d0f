//! Daily stock bar collector CLI.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stocks_collector::modules::{self, IfExists, MigrateOptions, SyncOptions, SystemClock};
use stocks_collector::{CollectorConfig, CollectorError, SyncStats};
use stocks_core::{init_logging, LogConfig, Ticker};
use stocks_data::{BarStore, MarketDataFetcher, PgBarStore, YahooFetcher};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "stocks-collector")]
#[command(about = "Daily stock bar incremental collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// TOML 설정 파일 (환경변수가 파일 값을 덮어씀)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 이번 실행의 티커 목록 (쉼표로 구분, 예: "AAPL,MSFT")
    #[arg(long, global = true)]
    tickers: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 증분 동기화 한 번 실행 후 종료
    Sync,

    /// 데몬 모드: 시작 시 한 번, 이후 매일 정해진 시각에 동기화
    Daemon,

    /// 전체 기간을 다시 받아 테이블 교체
    Backfill {
        /// 시작일 (기본: BACKFILL_START)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// 종료일, 미포함 (기본: 오늘)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// 저장된 티커 목록
    Tickers {
        /// JSON 출력
        #[arg(long)]
        json: bool,
    },

    /// 티커의 구간 요약
    Report {
        #[arg(long)]
        ticker: String,
        /// 시작일 (포함)
        #[arg(long)]
        from: NaiveDate,
        /// 종료일 (포함)
        #[arg(long)]
        to: NaiveDate,
        /// JSON 출력
        #[arg(long)]
        json: bool,
        /// 종가/이동평균 시계열을 CSV로 저장
        #[arg(long)]
        csv: Option<PathBuf>,
        /// 종가/MA7 터미널 차트 출력
        #[arg(long)]
        chart: bool,
        /// 차트 너비 (열)
        #[arg(long, default_value_t = modules::DEFAULT_CHART_WIDTH)]
        chart_width: u16,
        /// 차트 높이 (행)
        #[arg(long, default_value_t = modules::DEFAULT_CHART_HEIGHT)]
        chart_height: u16,
    },

    /// 레거시 SQLite 파일을 PostgreSQL로 이전
    MigrateSqlite {
        #[arg(long)]
        sqlite_path: PathBuf,
        /// 원본 테이블 이름
        #[arg(long, default_value = "stocks_data")]
        table: String,
        /// 대상 테이블에 데이터가 있을 때의 동작
        #[arg(long, value_enum, default_value_t = IfExists::Fail)]
        if_exists: IfExists,
        /// append 시 트랜잭션당 행 수
        #[arg(long, default_value_t = 1000)]
        chunk_size: usize,
    },
}

impl Commands {
    fn needs_tickers(&self) -> bool {
        matches!(self, Self::Sync | Self::Daemon | Self::Backfill { .. })
    }
}

/// 현재 날짜 기준으로 증분 동기화 한 번 실행
async fn run_sync_once(
    store: &dyn BarStore,
    fetcher: &dyn MarketDataFetcher,
    config: &CollectorConfig,
    cancel: &CancellationToken,
) -> stocks_collector::Result<SyncStats> {
    let today = modules::today_in(config.schedule.timezone, Utc::now());
    let options = SyncOptions::from_config(&config.sync, today);
    modules::sync_tickers(store, fetcher, &config.tickers, &options, cancel).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 설정 로드 (로깅 설정을 포함하므로 로깅보다 먼저)
    let loaded = match &cli.config {
        Some(path) => CollectorConfig::load(path),
        None => CollectorConfig::from_env(),
    };

    // 로깅 초기화
    let mut log_config = match &loaded {
        Ok(config) => config.logging.clone(),
        Err(_) => LogConfig::from_env(),
    };
    if let Some(level) = &cli.log_level {
        log_config.level = level.clone();
    }
    init_logging(log_config)?;

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "설정 로드 실패");
            return Err(e.into());
        }
    };

    if let Some(list) = &cli.tickers {
        config = config.with_tickers(Ticker::parse_list(list).map_err(CollectorError::from)?);
    }
    if cli.command.needs_tickers() {
        config.require_tickers()?;
    }

    tracing::info!(
        tickers = config.tickers.len(),
        timezone = %config.schedule.timezone,
        "Stocks Collector 시작"
    );

    // DB 연결 및 스키마 확인
    let store = PgBarStore::connect(&config.database()).await?;
    store.health_check().await?;
    store.ensure_schema().await?;

    // Ctrl-C → 취소 토큰
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("종료 신호 수신, 진행 중인 작업을 마치고 종료합니다");
                cancel.cancel();
            }
        });
    }

    let result = run_command(cli.command, &store, &config, &cancel).await;

    store.close().await;
    match result {
        Ok(()) => {
            tracing::info!("Stocks Collector 종료");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "실행 실패");
            Err(e.into())
        }
    }
}

async fn run_command(
    command: Commands,
    store: &PgBarStore,
    config: &CollectorConfig,
    cancel: &CancellationToken,
) -> stocks_collector::Result<()> {
    match command {
        Commands::Sync => {
            let fetcher = YahooFetcher::new(config.sync.auto_adjust)?;
            run_sync_once(store, &fetcher, config, cancel).await?;
        }
        Commands::Daemon => {
            let fetcher = YahooFetcher::new(config.sync.auto_adjust)?;
            let fetcher = &fetcher;

            tracing::info!(
                run_time = %config.schedule.run_time,
                timezone = %config.schedule.timezone,
                "=== 데몬 모드 시작 ==="
            );

            modules::run_daemon(&config.schedule, &SystemClock, cancel, move || async move {
                if let Err(e) = run_sync_once(store, fetcher, config, cancel).await {
                    tracing::error!(error = %e, "증분 동기화 실패");
                }
            })
            .await;
        }
        Commands::Backfill { from, to } => {
            let fetcher = YahooFetcher::new(config.sync.auto_adjust)?;
            let options = modules::BackfillOptions {
                start: from.unwrap_or(config.sync.default_start),
                end: to.unwrap_or_else(|| modules::today_in(config.schedule.timezone, Utc::now())),
                request_delay: config.sync.request_delay(),
            };
            modules::backfill(store, &fetcher, &config.tickers, &options, cancel).await?;
        }
        Commands::Tickers { json } => {
            let tickers = modules::list_tickers(store).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tickers)?);
            } else if tickers.is_empty() {
                println!("저장된 티커가 없습니다");
            } else {
                for entry in tickers {
                    println!("{:<10} {:>8}", entry.ticker, entry.rows);
                }
            }
        }
        Commands::Report {
            ticker,
            from,
            to,
            json,
            csv,
            chart,
            chart_width,
            chart_height,
        } => {
            let ticker = Ticker::new(&ticker)?;
            let report = modules::build_report(store, &ticker, from, to).await?;

            if let Some(path) = csv {
                report.write_csv(std::fs::File::create(&path)?)?;
                tracing::info!(path = %path.display(), rows = report.bars.len(), "CSV 저장 완료");
            }

            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.render_text());
            }
            if chart {
                print!("{}", report.render_chart(chart_width, chart_height));
            }
        }
        Commands::MigrateSqlite {
            sqlite_path,
            table,
            if_exists,
            chunk_size,
        } => {
            let options = MigrateOptions {
                sqlite_path,
                table,
                if_exists,
                chunk_size,
            };
            modules::migrate_sqlite(store, &options).await?;
        }
    }

    Ok(())
}
