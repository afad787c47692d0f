//! 기간 요약 통계.
//!
//! 조회 구간의 일봉으로 평균 수익률, 평균 변동성, 기간 전체 변화율을 계산합니다.

use crate::domain::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 조회 구간 요약.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSummary {
    /// 일봉 수
    pub rows: usize,
    /// 첫 거래일
    pub first_date: Option<NaiveDate>,
    /// 마지막 거래일
    pub last_date: Option<NaiveDate>,
    /// 평균 일간 수익률 (%)
    pub avg_return_pct: Option<f64>,
    /// 평균 변동성
    pub avg_volatility: Option<f64>,
    /// 기간 전체 변화율 (%) = (마지막 종가 - 첫 종가) / 첫 종가 × 100
    pub total_change_pct: Option<f64>,
}

impl BarSummary {
    /// 날짜 오름차순 일봉 목록에서 요약을 계산합니다.
    ///
    /// NULL 지표는 평균에서 제외합니다.
    pub fn from_bars(bars: &[Bar]) -> Self {
        let total_change_pct = match (bars.first(), bars.last()) {
            (Some(first), Some(last)) if first.close != 0.0 => {
                Some((last.close - first.close) / first.close * 100.0)
            }
            _ => None,
        };

        Self {
            rows: bars.len(),
            first_date: bars.first().map(|b| b.date),
            last_date: bars.last().map(|b| b.date),
            avg_return_pct: mean_of(bars.iter().filter_map(|b| b.return_pct)),
            avg_volatility: mean_of(bars.iter().filter_map(|b| b.volatility)),
            total_change_pct,
        }
    }

    /// 데이터가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
