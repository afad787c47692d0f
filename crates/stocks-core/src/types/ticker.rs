//! 티커 심볼 정의.
//!
//! 설정, 수집기, 저장소가 공유하는 검증된 티커 타입을 정의합니다.
//! 티커는 항상 대문자로 정규화됩니다 (예: `aapl` → `AAPL`, `^gspc` → `^GSPC`).

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 대문자로 정규화된 티커 심볼.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// 문자열에서 티커를 생성합니다.
    ///
    /// 앞뒤 공백을 제거하고 대문자로 변환합니다.
    /// 영숫자와 `.`, `^`, `=`, `-` 이외의 문자가 있으면 에러를 반환합니다.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let normalized = raw.as_ref().trim().to_uppercase();

        if normalized.is_empty() {
            return Err(CoreError::InvalidTicker("빈 티커".to_string()));
        }

        if let Some(c) = normalized
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-')))
        {
            return Err(CoreError::InvalidTicker(format!(
                "{} (허용되지 않는 문자 '{}')",
                raw.as_ref(),
                c
            )));
        }

        Ok(Self(normalized))
    }

    /// 티커 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 쉼표로 구분된 티커 목록을 파싱합니다.
    ///
    /// 빈 항목은 무시하고, 중복은 처음 등장한 순서만 유지합니다.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, CoreError> {
        let mut tickers: Vec<Self> = Vec::new();
        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let ticker = Self::new(item)?;
            if !tickers.contains(&ticker) {
                tickers.push(ticker);
            }
        }
        Ok(tickers)
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Ticker {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Ticker {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
