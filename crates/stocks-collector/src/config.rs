//! 환경변수 및 설정 파일 기반 설정 모듈.
//!
//! [`CollectorConfig::from_env`]는 `.env`와 환경변수만 읽고,
//! [`CollectorConfig::load`]는 TOML 파일 위에 환경변수를 덮어씁니다.
//! 두 경로 모두 같은 검증을 거칩니다.

use crate::error::CollectorError;
use crate::Result;
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use stocks_core::{LogConfig, Ticker};
use stocks_data::DatabaseConfig;

/// 저장 이력이 없는 티커의 기본 수집 시작일
pub const DEFAULT_BACKFILL_START: &str = "2020-01-01";
/// 기본 일일 실행 시각
pub const DEFAULT_RUN_TIME: &str = "18:00";
/// 기본 스케줄 시간대
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: String,
    /// 풀의 최대 연결 수
    pub db_max_connections: u32,
    /// 수집 대상 티커 (순서 유지, 중복 제거)
    pub tickers: Vec<Ticker>,
    /// 로깅 설정
    pub logging: LogConfig,
    /// 증분 동기화 설정
    pub sync: SyncConfig,
    /// 일일 스케줄 설정
    pub schedule: ScheduleConfig,
}

/// 증분 동기화 설정
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 저장 이력이 없는 티커의 수집 시작일
    pub default_start: NaiveDate,
    /// 티커 간 요청 딜레이 (밀리초)
    pub request_delay_ms: u64,
    /// 동시에 처리할 티커 수
    pub concurrency: usize,
    /// 제공자 수정주가 보정 사용 여부
    pub auto_adjust: bool,
}

/// 일일 스케줄 설정
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// 실행 시각 (벽시계 기준)
    pub run_time: NaiveTime,
    /// 실행 시각을 해석할 시간대
    pub timezone: Tz,
    /// 트리거 확인 주기 (초)
    pub poll_seconds: u64,
}

/// 설정 파일의 티커 목록 (쉼표 구분 문자열 또는 배열)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TickerList {
    Csv(String),
    List(Vec<String>),
}

/// 검증 전 설정 값.
///
/// 필드 이름은 환경변수 이름의 소문자형과 같습니다.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawSettings {
    database_url: Option<String>,
    db_max_connections: Option<String>,
    tickers: Option<TickerList>,
    backfill_start: Option<String>,
    log_level: Option<String>,
    log_format: Option<String>,
    sync_request_delay_ms: Option<String>,
    sync_concurrency: Option<String>,
    sync_auto_adjust: Option<String>,
    daily_run_time: Option<String>,
    schedule_timezone: Option<String>,
    scheduler_poll_seconds: Option<String>,
}

impl RawSettings {
    fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok();
        Self {
            database_url: var("DATABASE_URL"),
            db_max_connections: var("DB_MAX_CONNECTIONS"),
            tickers: var("TICKERS").map(TickerList::Csv),
            backfill_start: var("BACKFILL_START"),
            log_level: var("LOG_LEVEL"),
            log_format: var("LOG_FORMAT"),
            sync_request_delay_ms: var("SYNC_REQUEST_DELAY_MS"),
            sync_concurrency: var("SYNC_CONCURRENCY"),
            sync_auto_adjust: var("SYNC_AUTO_ADJUST"),
            daily_run_time: var("DAILY_RUN_TIME"),
            schedule_timezone: var("SCHEDULE_TIMEZONE"),
            scheduler_poll_seconds: var("SCHEDULER_POLL_SECONDS"),
        }
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_raw(RawSettings::from_env())
    }

    /// TOML 설정 파일에서 로드 (환경변수가 파일 값을 덮어씀)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::default())
            .build()?;

        Self::from_raw(settings.try_deserialize()?)
    }

    fn from_raw(raw: RawSettings) -> Result<Self> {
        let database_url = raw
            .database_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
            })?;

        let tickers = match raw.tickers {
            Some(TickerList::Csv(list)) => Ticker::parse_list(&list)?,
            Some(TickerList::List(items)) => Ticker::parse_list(&items.join(","))?,
            None => Vec::new(),
        };

        let backfill_start = raw
            .backfill_start
            .unwrap_or_else(|| DEFAULT_BACKFILL_START.to_string());
        let default_start = NaiveDate::parse_from_str(backfill_start.trim(), "%Y-%m-%d")
            .map_err(|e| {
                CollectorError::Config(format!(
                    "BACKFILL_START 형식이 잘못되었습니다 ({}): {}",
                    backfill_start, e
                ))
            })?;

        let run_time = parse_run_time(raw.daily_run_time.as_deref().unwrap_or(DEFAULT_RUN_TIME))?;

        let timezone_name = raw
            .schedule_timezone
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_name.trim().parse().map_err(|e| {
            CollectorError::Config(format!(
                "SCHEDULE_TIMEZONE을 해석할 수 없습니다 ({}): {}",
                timezone_name, e
            ))
        })?;

        let logging = LogConfig::new(
            raw.log_level
                .map(|l| l.trim().to_lowercase())
                .unwrap_or_else(|| "info".to_string()),
        )
        .with_format(parse_or(raw.log_format.as_deref(), Default::default()));

        Ok(Self {
            database_url,
            db_max_connections: parse_or(raw.db_max_connections.as_deref(), 5u32).max(1),
            tickers,
            logging,
            sync: SyncConfig {
                default_start,
                request_delay_ms: parse_or(raw.sync_request_delay_ms.as_deref(), 0),
                concurrency: parse_or(raw.sync_concurrency.as_deref(), 1usize).max(1),
                auto_adjust: parse_bool(raw.sync_auto_adjust.as_deref(), true),
            },
            schedule: ScheduleConfig {
                run_time,
                timezone,
                poll_seconds: parse_or(raw.scheduler_poll_seconds.as_deref(), 60u64).max(1),
            },
        })
    }

    /// 이번 실행에 한해 티커 목록을 바꿉니다 (`--tickers`).
    pub fn with_tickers(mut self, tickers: Vec<Ticker>) -> Self {
        self.tickers = tickers;
        self
    }

    /// 수집 명령에 필요한 티커 목록. 비어 있으면 설정 에러입니다.
    pub fn require_tickers(&self) -> Result<&[Ticker]> {
        if self.tickers.is_empty() {
            return Err(CollectorError::Config(
                "TICKERS가 비어 있습니다 (예: TICKERS=AAPL,MSFT)".to_string(),
            ));
        }
        Ok(&self.tickers)
    }

    /// 저장소 연결 설정
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            max_connections: self.db_max_connections,
            ..DatabaseConfig::new(&self.database_url)
        }
    }
}

impl SyncConfig {
    /// 티커 간 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl ScheduleConfig {
    /// 트리거 확인 주기를 Duration으로 반환
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_seconds)
    }
}

/// `HH:MM` 또는 `HH:MM:SS` 형식의 실행 시각 파싱
fn parse_run_time(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| {
            CollectorError::Config(format!(
                "DAILY_RUN_TIME 형식이 잘못되었습니다 ({}): {}",
                value, e
            ))
        })
}

/// 값을 파싱 (없거나 실패 시 기본값 사용)
fn parse_or<T: std::str::FromStr>(value: Option<&str>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// bool 값 파싱
fn parse_bool(value: Option<&str>, default: bool) -> bool {
    value
        .map(|v| {
            let v = v.trim().to_lowercase();
            v == "true" || v == "1"
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};
    use stocks_core::LogFormat;

    /// 프로세스 환경변수를 읽거나 쓰는 테스트를 직렬화합니다.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 범위를 벗어나면 (패닉 포함) 환경변수를 제거합니다.
    struct EnvVarGuard(&'static str);

    impl EnvVarGuard {
        fn set(key: &'static str, value: &str) -> Self {
            std::env::set_var(key, value);
            Self(key)
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            std::env::remove_var(self.0);
        }
    }

    fn raw(database_url: &str) -> RawSettings {
        RawSettings {
            database_url: Some(database_url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = CollectorConfig::from_raw(raw("postgresql://localhost/stocks")).unwrap();

        assert_eq!(
            config.sync.default_start,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
        assert_eq!(config.sync.concurrency, 1);
        assert_eq!(config.sync.request_delay(), Duration::ZERO);
        assert!(config.sync.auto_adjust);
        assert_eq!(
            config.schedule.run_time,
            NaiveTime::from_hms_opt(18, 0, 0).unwrap()
        );
        assert_eq!(config.schedule.timezone, chrono_tz::America::New_York);
        assert_eq!(config.schedule.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.database().max_connections, 5);
        assert!(config.tickers.is_empty());
    }

    #[test]
    fn test_missing_database_url() {
        let result = CollectorConfig::from_raw(RawSettings::default());
        assert!(matches!(result, Err(CollectorError::Config(_))));

        let result = CollectorConfig::from_raw(raw("   "));
        assert!(matches!(result, Err(CollectorError::Config(_))));
    }

    #[test]
    fn test_ticker_list_normalized() {
        let mut settings = raw("postgresql://localhost/stocks");
        settings.tickers = Some(TickerList::Csv(" aapl, MSFT ,,AAPL, googl ".to_string()));

        let config = CollectorConfig::from_raw(settings).unwrap();
        let symbols: Vec<&str> = config.tickers.iter().map(|t| t.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "GOOGL"]);
        assert!(config.require_tickers().is_ok());
    }

    #[test]
    fn test_invalid_ticker_is_config_error() {
        let mut settings = raw("postgresql://localhost/stocks");
        settings.tickers = Some(TickerList::Csv("AAPL,BAD TICKER".to_string()));
        let result = CollectorConfig::from_raw(settings);
        assert!(matches!(result, Err(CollectorError::Config(_))));
    }

    #[test]
    fn test_require_tickers_when_empty() {
        let config = CollectorConfig::from_raw(raw("postgresql://localhost/stocks")).unwrap();
        assert!(config.require_tickers().unwrap_err().is_config());

        let config = config.with_tickers(vec![Ticker::new("SPY").unwrap()]);
        assert_eq!(config.require_tickers().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_values() {
        let mut settings = raw("postgresql://localhost/stocks");
        settings.backfill_start = Some("2020/01/01".to_string());
        assert!(CollectorConfig::from_raw(settings).is_err());

        let mut settings = raw("postgresql://localhost/stocks");
        settings.daily_run_time = Some("25:00".to_string());
        assert!(CollectorConfig::from_raw(settings).is_err());

        let mut settings = raw("postgresql://localhost/stocks");
        settings.schedule_timezone = Some("Mars/Olympus".to_string());
        assert!(CollectorConfig::from_raw(settings).is_err());
    }

    #[test]
    fn test_lenient_numeric_parsing() {
        let mut settings = raw("postgresql://localhost/stocks");
        settings.sync_concurrency = Some("zero".to_string());
        settings.sync_request_delay_ms = Some(" 250 ".to_string());
        settings.scheduler_poll_seconds = Some("0".to_string());
        settings.sync_auto_adjust = Some("FALSE".to_string());

        let config = CollectorConfig::from_raw(settings).unwrap();
        assert_eq!(config.sync.concurrency, 1);
        assert_eq!(config.sync.request_delay(), Duration::from_millis(250));
        assert_eq!(config.schedule.poll_seconds, 1);
        assert!(!config.sync.auto_adjust);
    }

    #[test]
    fn test_run_time_with_seconds() {
        assert_eq!(
            parse_run_time("09:30:15").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 15).unwrap()
        );
        assert!(parse_run_time("noon").is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let _env = env_lock();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.toml");
        std::fs::write(
            &path,
            r#"
database_url = "postgresql://localhost/stocks"
tickers = ["msft", "^gspc"]
daily_run_time = "17:45"
schedule_timezone = "Asia/Seoul"
sync_concurrency = 3
"#,
        )
        .unwrap();

        let config = CollectorConfig::load(&path).unwrap();
        let symbols: Vec<&str> = config.tickers.iter().map(|t| t.as_str()).collect();
        assert_eq!(symbols, vec!["MSFT", "^GSPC"]);
        assert_eq!(
            config.schedule.run_time,
            NaiveTime::from_hms_opt(17, 45, 0).unwrap()
        );
        assert_eq!(config.schedule.timezone, chrono_tz::Asia::Seoul);
        assert_eq!(config.sync.concurrency, 3);
    }

    #[test]
    fn test_environment_overrides_file() {
        let _env = env_lock();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.toml");
        std::fs::write(
            &path,
            "database_url = \"postgresql://localhost/stocks\"\nscheduler_poll_seconds = 30\n",
        )
        .unwrap();

        {
            let _poll = EnvVarGuard::set("SCHEDULER_POLL_SECONDS", "5");
            let config = CollectorConfig::load(&path).unwrap();
            assert_eq!(config.schedule.poll_seconds, 5);
        }

        // 변수가 제거되면 파일 값으로 돌아감
        let config = CollectorConfig::load(&path).unwrap();
        assert_eq!(config.schedule.poll_seconds, 30);
    }
}
