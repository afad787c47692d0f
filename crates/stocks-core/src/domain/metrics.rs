//! 파생 지표 계산.
//!
//! 저장 직전 일봉에 붙는 세 가지 지표를 계산합니다:
//! - `return_pct`: 당일 수익률 (%)
//! - `ma7`: 최근 7거래일 종가 이동평균 (최소 1개)
//! - `volatility`: 최근 7거래일 종가 표본 표준편차 (최소 2개)
//!
//! 이동 윈도우는 티커별 시간순 종가 시퀀스 위에서 계산됩니다.
//! 증분 수집에서는 이미 저장된 최근 종가(`history`)를 윈도우 앞에 이어 붙여
//! 새 배치의 첫 6행도 전체 이력 기준과 같은 값을 갖습니다.

use crate::domain::{Bar, DailyQuote};
use crate::error::{CoreError, CoreResult};
use crate::types::Ticker;
use tracing::warn;

/// 이동 윈도우 크기 (거래일 수).
pub const ROLLING_WINDOW: usize = 7;

/// 이동평균 최소 표본 수.
pub const MA_MIN_PERIODS: usize = 1;

/// 변동성 최소 표본 수.
pub const VOL_MIN_PERIODS: usize = 2;

/// 증분 계산에 필요한 과거 종가 수.
pub const HISTORY_LEN: usize = ROLLING_WINDOW - 1;

/// 당일 수익률 계산 (%).
///
/// 시가가 0이거나 유한하지 않은 값이 들어오면 `InvalidBar`를 반환합니다.
pub fn return_pct(open: f64, close: f64) -> CoreResult<f64> {
    if !open.is_finite() || !close.is_finite() {
        return Err(CoreError::InvalidBar(format!(
            "유한하지 않은 가격 (open={}, close={})",
            open, close
        )));
    }
    if open == 0.0 {
        return Err(CoreError::InvalidBar("시가가 0입니다".to_string()));
    }

    let pct = (close - open) / open * 100.0;
    if pct.is_finite() {
        Ok(pct)
    } else {
        Err(CoreError::InvalidBar(format!(
            "수익률 계산 결과가 유한하지 않음 (open={}, close={})",
            open, close
        )))
    }
}

/// 후행 윈도우 이동평균.
///
/// 위치 `i`의 값은 `[max(0, i - window + 1), i]` 구간의 평균입니다.
/// 표본 수가 `min_periods` 미만이면 `None`입니다.
pub fn rolling_mean(values: &[f64], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling(values, window, min_periods, mean)
}

/// 후행 윈도우 표본 표준편차 (분모 n−1).
///
/// `min_periods`는 최소 2로 취급합니다. 표본이 1개이면 정의되지 않으므로
/// 0이 아니라 `None`을 반환합니다.
pub fn rolling_std(values: &[f64], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling(values, window, min_periods.max(2), sample_std)
}

fn rolling(
    values: &[f64],
    window: usize,
    min_periods: usize,
    stat: fn(&[f64]) -> f64,
) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            if slice.len() >= min_periods {
                Some(stat(slice))
            } else {
                None
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> f64 {
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// 시세 목록에 파생 지표를 붙여 저장용 일봉으로 변환합니다.
///
/// # Arguments
///
/// * `ticker` - 티커 심볼
/// * `quotes` - 날짜 오름차순으로 정렬된 새 시세
/// * `history` - 이미 저장된 최근 종가 (오름차순). `HISTORY_LEN`개를 넘으면 마지막 값만 사용
///
/// # Returns
///
/// `quotes`와 같은 순서·길이의 일봉. `history`에 해당하는 행은 반환하지 않습니다.
pub fn enrich(ticker: &Ticker, quotes: &[DailyQuote], history: &[f64]) -> Vec<Bar> {
    let history = &history[history.len().saturating_sub(HISTORY_LEN)..];

    let closes: Vec<f64> = history
        .iter()
        .copied()
        .chain(quotes.iter().map(|q| q.close))
        .collect();

    let ma = rolling_mean(&closes, ROLLING_WINDOW, MA_MIN_PERIODS);
    let vol = rolling_std(&closes, ROLLING_WINDOW, VOL_MIN_PERIODS);
    let offset = history.len();

    quotes
        .iter()
        .enumerate()
        .map(|(i, quote)| {
            let return_pct = match return_pct(quote.open, quote.close) {
                Ok(pct) => Some(pct),
                Err(e) => {
                    warn!(
                        ticker = %ticker,
                        date = %quote.date,
                        error = %e,
                        "수익률 계산 불가, NULL로 저장"
                    );
                    None
                }
            };

            Bar {
                return_pct,
                ma7: ma[offset + i],
                volatility: vol[offset + i],
                ..Bar::from_quote(ticker.clone(), quote)
            }
        })
        .collect()
}
