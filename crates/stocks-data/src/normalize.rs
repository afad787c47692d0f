//! 원시 테이블 정규화.
//!
//! 제공자 응답을 고정 형태의 [`DailyQuote`] 목록으로 변환합니다.
//!
//! # 처리 순서
//!
//! 1. 복합 레이블(`("Close", "AAPL")`)을 필드명 하나로 축약
//! 2. 필드명 정규화 (공백 제거, 소문자, 공백 → `_`) 후
//!    `{date, open, high, low, close, volume}` 이외 컬럼은 버림 (`adj_close` 등)
//! 3. 날짜 컬럼을 시간 정보 없는 날짜로 파싱, 실패한 행은 버림
//! 4. 날짜 오름차순 정렬 (같은 날짜는 첫 행만 유지)
//!
//! 날짜 컬럼이 없으면 제공자 계약 위반이므로 `SchemaError`를 반환합니다.

use crate::error::{DataError, Result};
use crate::provider::{ColumnLabel, RawColumn, RawTable, RawValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use stocks_core::DailyQuote;
use tracing::debug;

/// 정규화된 필드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Field {
    fn from_canonical(name: &str) -> Option<Self> {
        match name {
            "date" | "datetime" | "timestamp" => Some(Self::Date),
            "open" => Some(Self::Open),
            "high" => Some(Self::High),
            "low" => Some(Self::Low),
            "close" => Some(Self::Close),
            "volume" => Some(Self::Volume),
            _ => None,
        }
    }
}

/// 컬럼 이름 정규화: 공백 제거, 소문자, 내부 공백 → `_`.
fn canonical_name(raw: &str) -> String {
    raw.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// 레이블을 필드로 축약합니다.
///
/// 복합 레이블은 첫 조각(필드명)만 사용합니다. 심볼 조각은 보지 않으므로
/// `("Adj Close", "LOW")`는 `low`가 아니라 `adj_close`로 축약되어 버려집니다.
fn resolve_field(label: &ColumnLabel) -> Option<Field> {
    label
        .parts()
        .first()
        .and_then(|p| Field::from_canonical(&canonical_name(p)))
}

fn require<'a>(col: Option<&'a RawColumn>, name: &str) -> Result<&'a RawColumn> {
    col.ok_or_else(|| DataError::SchemaError(format!("정규화 후 '{}' 컬럼이 없습니다", name)))
}

/// 원시 테이블을 날짜 오름차순 시세 목록으로 변환합니다.
///
/// # Errors
///
/// - `DataError::SchemaError`: 날짜 컬럼 또는 시가/고가/저가/종가 컬럼이 없음
pub fn normalize(raw: &RawTable) -> Result<Vec<DailyQuote>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let mut seen: HashSet<Field> = HashSet::new();
    let mut date_col: Option<&RawColumn> = None;
    let mut open_col: Option<&RawColumn> = None;
    let mut high_col: Option<&RawColumn> = None;
    let mut low_col: Option<&RawColumn> = None;
    let mut close_col: Option<&RawColumn> = None;
    let mut volume_col: Option<&RawColumn> = None;

    for column in &raw.columns {
        let Some(field) = resolve_field(&column.label) else {
            debug!(label = ?column.label, "인식하지 못한 컬럼 제외");
            continue;
        };
        // 같은 필드가 여러 번 나오면 첫 컬럼 사용
        if !seen.insert(field) {
            continue;
        }
        let slot = match field {
            Field::Date => &mut date_col,
            Field::Open => &mut open_col,
            Field::High => &mut high_col,
            Field::Low => &mut low_col,
            Field::Close => &mut close_col,
            Field::Volume => &mut volume_col,
        };
        *slot = Some(column);
    }

    let date_col = date_col
        .ok_or_else(|| DataError::SchemaError("정규화 후 날짜 컬럼이 없습니다".to_string()))?;
    let open_col = require(open_col, "open")?;
    let high_col = require(high_col, "high")?;
    let low_col = require(low_col, "low")?;
    let close_col = require(close_col, "close")?;

    let cell = |col: &RawColumn, i: usize| col.values.get(i).cloned().unwrap_or(RawValue::Null);

    let mut quotes = Vec::with_capacity(raw.row_count());
    let mut dropped = 0usize;

    for i in 0..raw.row_count() {
        let Some(date) = parse_date(&cell(date_col, i)) else {
            dropped += 1;
            continue;
        };

        let prices = (
            cell(open_col, i).as_f64(),
            cell(high_col, i).as_f64(),
            cell(low_col, i).as_f64(),
            cell(close_col, i).as_f64(),
        );
        let (Some(open), Some(high), Some(low), Some(close)) = prices else {
            dropped += 1;
            continue;
        };

        quotes.push(DailyQuote {
            date,
            open,
            high,
            low,
            close,
            volume: volume_col.and_then(|c| cell(c, i).as_i64()),
        });
    }

    if dropped > 0 {
        debug!(dropped = dropped, "날짜/가격을 해석할 수 없는 행 제외");
    }

    // 안정 정렬 후 같은 날짜의 첫 행만 유지
    quotes.sort_by_key(|q| q.date);
    quotes.dedup_by_key(|q| q.date);

    Ok(quotes)
}

/// 셀 값을 날짜로 파싱합니다 (시간 정보 제거).
fn parse_date(value: &RawValue) -> Option<NaiveDate> {
    match value {
        RawValue::Timestamp(secs) => DateTime::from_timestamp(*secs, 0).map(|dt| dt.date_naive()),
        RawValue::Text(s) => parse_date_str(s.trim()),
        _ => None,
    }
}

pub(crate) fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}
