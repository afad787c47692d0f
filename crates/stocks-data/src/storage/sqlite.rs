//! 레거시 SQLite 저장소 읽기.
//!
//! PostgreSQL 이전에 사용하던 SQLite 파일의 `stocks_data` 테이블을 읽습니다.
//! 레거시 테이블은 `Date`, `Open`처럼 대문자 컬럼명과 문자열 날짜
//! (`2024-01-01 00:00:00`)를 가질 수 있으므로, SQLite의 대소문자 무시
//! 컬럼 해석과 명시적 CAST로 읽은 뒤 날짜를 직접 파싱합니다.

use crate::error::{DataError, Result};
use crate::normalize::parse_date_str;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::{Path, PathBuf};
use stocks_core::{Bar, Ticker};
use tracing::{info, warn};

/// CAST 결과를 그대로 받는 레거시 행.
#[derive(Debug, FromRow)]
struct LegacyRow {
    ticker: Option<String>,
    date: Option<String>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<i64>,
    return_pct: Option<f64>,
    ma7: Option<f64>,
    volatility: Option<f64>,
}

impl LegacyRow {
    fn into_bar(self) -> Option<Bar> {
        let ticker = Ticker::new(self.ticker?).ok()?;
        let date = parse_date_str(self.date?.trim())?;
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());

        Some(Bar {
            ticker,
            date,
            open: finite(self.open)?,
            high: finite(self.high)?,
            low: finite(self.low)?,
            close: finite(self.close)?,
            volume: self.volume.filter(|v| *v >= 0),
            return_pct: finite(self.return_pct),
            ma7: finite(self.ma7),
            volatility: finite(self.volatility),
        })
    }
}

/// 레거시 SQLite 파일 리더.
pub struct SqliteBarReader {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteBarReader {
    /// SQLite 파일을 읽기 전용으로 엽니다.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(DataError::ConnectionError(format!(
                "SQLite 데이터베이스를 찾을 수 없습니다: {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new().filename(&path).read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        Ok(Self { pool, path })
    }

    /// 테이블의 모든 일봉을 읽습니다.
    ///
    /// 티커/날짜/가격을 해석할 수 없는 행은 경고 후 제외합니다.
    pub async fn read_all(&self, table: &str) -> Result<Vec<Bar>> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(DataError::ParseError(format!("잘못된 테이블 이름: {}", table)));
        }

        let sql = format!(
            r#"
            SELECT
                CAST(ticker AS TEXT)     AS ticker,
                CAST(date AS TEXT)       AS date,
                CAST(open AS REAL)       AS open,
                CAST(high AS REAL)       AS high,
                CAST(low AS REAL)        AS low,
                CAST(close AS REAL)      AS close,
                CAST(volume AS INTEGER)  AS volume,
                CAST(return_pct AS REAL) AS return_pct,
                CAST(ma7 AS REAL)        AS ma7,
                CAST(volatility AS REAL) AS volatility
            FROM {}
            "#,
            table
        );

        let rows: Vec<LegacyRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        let total = rows.len();

        let mut bars: Vec<Bar> = rows.into_iter().filter_map(LegacyRow::into_bar).collect();
        bars.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.date.cmp(&b.date)));
        bars.dedup_by(|a, b| a.ticker == b.ticker && a.date == b.date);

        if bars.len() < total {
            warn!(
                skipped = total - bars.len(),
                "해석할 수 없거나 중복된 레거시 행 제외"
            );
        }

        info!(
            path = %self.path.display(),
            table = table,
            rows = bars.len(),
            "SQLite 테이블 읽기 완료"
        );

        Ok(bars)
    }

    /// 연결을 닫습니다.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    async fn create_legacy_db(path: &Path) {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE stocks_data (
                "Date" TIMESTAMP, "Open" REAL, "High" REAL, "Low" REAL, "Close" REAL,
                "Volume" INTEGER, ticker TEXT, return_pct REAL, ma7 REAL, volatility REAL
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            r#"
            INSERT INTO stocks_data VALUES
                ('2024-01-02 00:00:00', 11.0, 12.0, 10.5, 12.0, 1500, 'aapl', 9.09, 11.25, 1.06),
                ('2024-01-01 00:00:00', 10.0, 11.0, 9.0, 10.5, 1000, 'AAPL', 5.0, 10.5, NULL),
                ('2024-01-01 00:00:00', 10.0, 11.0, 9.0, 10.5, 1000, 'AAPL', 5.0, 10.5, NULL),
                ('garbage', 1.0, 1.0, 1.0, 1.0, 1, 'AAPL', NULL, NULL, NULL),
                ('2024-01-01', NULL, 1.0, 1.0, 1.0, 1, 'MSFT', NULL, NULL, NULL)
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        pool.close().await;
    }

    #[tokio::test]
    async fn test_read_legacy_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stocks.db");
        create_legacy_db(&path).await;

        let reader = SqliteBarReader::open(&path).await.unwrap();
        let bars = reader.read_all("stocks_data").await.unwrap();
        reader.close().await;

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ticker.as_str(), "AAPL");
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(bars[0].volatility, None);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].volume, Some(1500));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteBarReader::open(dir.path().join("missing.db")).await;
        assert!(matches!(result, Err(DataError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn test_rejects_bad_table_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stocks.db");
        create_legacy_db(&path).await;

        let reader = SqliteBarReader::open(&path).await.unwrap();
        let result = reader.read_all("stocks_data; DROP TABLE x").await;
        assert!(matches!(result, Err(DataError::ParseError(_))));
    }
}
