//! 레거시 SQLite → PostgreSQL 마이그레이션 모듈.

use crate::error::CollectorError;
use crate::Result;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use stocks_core::{Bar, Ticker};
use stocks_data::{BarStore, SqliteBarReader};
use tracing::{info, warn};

/// 대상 테이블에 데이터가 있을 때의 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum IfExists {
    /// 비어 있지 않으면 실패
    #[default]
    Fail,
    /// 전체 교체
    Replace,
    /// 없는 `(ticker, date)`만 추가
    Append,
}

/// 마이그레이션 옵션
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// SQLite 파일 경로
    pub sqlite_path: PathBuf,
    /// 원본 테이블 이름
    pub table: String,
    pub if_exists: IfExists,
    /// append 시 트랜잭션당 행 수
    pub chunk_size: usize,
}

/// 마이그레이션 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStats {
    /// 원본에서 읽은 행 수
    pub read: usize,
    /// 대상에 쓴 행 수
    pub written: usize,
    /// 이미 있어 건너뛴 행 수
    pub skipped_existing: usize,
}

/// SQLite 파일을 읽어 저장소로 옮깁니다.
pub async fn migrate_sqlite(store: &dyn BarStore, options: &MigrateOptions) -> Result<MigrationStats> {
    let reader = SqliteBarReader::open(&options.sqlite_path).await?;
    let bars = reader.read_all(&options.table).await;
    reader.close().await;

    let stats = migrate_bars(store, bars?, options.if_exists, options.chunk_size).await?;
    info!(
        read = stats.read,
        written = stats.written,
        skipped_existing = stats.skipped_existing,
        "마이그레이션 완료"
    );
    Ok(stats)
}

/// 읽어 온 일봉을 저장소에 씁니다.
pub async fn migrate_bars(
    store: &dyn BarStore,
    bars: Vec<Bar>,
    if_exists: IfExists,
    chunk_size: usize,
) -> Result<MigrationStats> {
    if bars.is_empty() {
        return Err(CollectorError::Run(
            "원본 테이블에 옮길 데이터가 없습니다".to_string(),
        ));
    }

    let mut stats = MigrationStats {
        read: bars.len(),
        ..Default::default()
    };

    match if_exists {
        IfExists::Fail => {
            let existing = store.count_rows(None).await?;
            if existing > 0 {
                return Err(CollectorError::Run(format!(
                    "대상 테이블에 이미 {}행이 있습니다 (--if-exists replace|append 사용)",
                    existing
                )));
            }
            stats.written = append_chunked(store, &bars, chunk_size).await?;
        }
        IfExists::Replace => {
            stats.written = store.replace_all(&bars).await?;
        }
        IfExists::Append => {
            let mut by_ticker: BTreeMap<Ticker, Vec<Bar>> = BTreeMap::new();
            for bar in bars {
                by_ticker.entry(bar.ticker.clone()).or_default().push(bar);
            }

            let mut fresh: Vec<Bar> = Vec::new();
            for (ticker, rows) in by_ticker {
                let existing: HashSet<_> = store.existing_dates(&ticker).await?;
                let (total, before) = (rows.len(), fresh.len());
                fresh.extend(rows.into_iter().filter(|b| !existing.contains(&b.date)));
                stats.skipped_existing += total - (fresh.len() - before);
            }

            if stats.skipped_existing > 0 {
                warn!(skipped = stats.skipped_existing, "이미 있는 행 제외");
            }
            stats.written = append_chunked(store, &fresh, chunk_size).await?;
        }
    }

    Ok(stats)
}

async fn append_chunked(store: &dyn BarStore, bars: &[Bar], chunk_size: usize) -> Result<usize> {
    let mut written = 0;
    for chunk in bars.chunks(chunk_size.max(1)) {
        written += store.append_rows(chunk).await?;
    }
    Ok(written)
}
