//! 일일 스케줄러 루프.
//!
//! 시작 시 한 번 실행한 뒤, 설정된 시간대의 벽시계 시각마다 하루 한 번
//! 실행합니다. 트리거는 짧은 고정 주기로 확인하며, 취소 토큰이 취소되면
//! 실행과 실행 사이에서 종료합니다.

use crate::config::ScheduleConfig;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 현재 시각 제공자
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 시계
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 시간대 기준 오늘 날짜
pub fn today_in(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// `now` 이후 (미포함) 처음 돌아오는 `at` 시각.
///
/// 일광절약 전환으로 해당 시각이 두 번 있으면 앞의 것을, 존재하지 않으면
/// 전환 직후의 가장 이른 유효 시각을 사용합니다.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let mut date = now.with_timezone(&tz).date_naive();

    loop {
        let candidate = resolve_local(tz, date, at);
        if candidate > now {
            return candidate;
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => return candidate,
        };
    }
}

fn resolve_local(tz: Tz, date: NaiveDate, at: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(at);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // 건너뛴 구간: 분 단위로 앞으로 이동하며 첫 유효 시각 탐색
            let mut candidate = naive;
            for _ in 0..(24 * 60) {
                candidate += Duration::minutes(1);
                if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
                    return dt.with_timezone(&Utc);
                }
            }
            naive.and_utc()
        }
    }
}

/// 데몬 루프를 실행합니다.
///
/// `job`은 시작 시 한 번, 이후 매일 실행 시각이 지나면 한 번 호출됩니다.
/// 실행 중에는 취소를 확인하지 않으므로 `job` 스스로 같은 토큰을 보고
/// 정리해야 합니다.
pub async fn run_daemon<C, F, Fut>(
    schedule: &ScheduleConfig,
    clock: &C,
    cancel: &CancellationToken,
    mut job: F,
) -> usize
where
    C: Clock + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let tz = schedule.timezone;
    let mut runs = 0;

    info!("시작 시 동기화 실행");
    job().await;
    runs += 1;

    let mut next = next_run_after(clock.now(), schedule.run_time, tz);
    info!(next_run = %next.with_timezone(&tz), "다음 실행 예약");

    let mut interval = tokio::time::interval(schedule.poll_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = interval.tick() => {
                let now = clock.now();
                if now < next {
                    debug!(next_run = %next.with_timezone(&tz), "대기 중");
                    continue;
                }

                info!(scheduled = %next.with_timezone(&tz), "=== 예약 실행 시작 ===");
                job().await;
                runs += 1;

                next = next_run_after(clock.now(), schedule.run_time, tz);
                info!(next_run = %next.with_timezone(&tz), "=== 예약 실행 완료 ===");
            }
        }
    }

    runs
}
