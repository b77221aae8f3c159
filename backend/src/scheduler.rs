//! Background job scheduling.
//!
//! Two long-lived tokio tasks: the daily balance snapshot at 23:55 local
//! time, and the weekly interest run at 23:59 local time on the configured
//! day of week. The tasks are pure trigger glue: they compute the next
//! wall-clock occurrence, sleep, and invoke the same domain operations the
//! manual admin triggers call.

use chrono::{Duration, Local, NaiveDateTime, Weekday};
use tracing::{error, info, warn};

use crate::domain::config::ConfigService;
use crate::domain::interest::InterestService;
use crate::domain::snapshot::SnapshotService;

const SNAPSHOT_HOUR: u32 = 23;
const SNAPSHOT_MINUTE: u32 = 55;
const INTEREST_HOUR: u32 = 23;
const INTEREST_MINUTE: u32 = 59;

/// Spawn the daily snapshot and weekly interest tasks.
pub fn start(snapshots: SnapshotService, interest: InterestService, config: ConfigService) {
    tokio::spawn(run_daily_snapshot_loop(snapshots));
    tokio::spawn(run_weekly_interest_loop(interest, config));
    info!("Background scheduler started");
}

async fn run_daily_snapshot_loop(snapshots: SnapshotService) {
    loop {
        let now = Local::now().naive_local();
        let next = next_daily_occurrence(now, SNAPSHOT_HOUR, SNAPSHOT_MINUTE);
        sleep_until(now, next).await;

        let today = Local::now().date_naive();
        match snapshots.take_daily_snapshot(today).await {
            Ok(count) => info!("Scheduled daily snapshot complete: {} snapshots created", count),
            Err(e) => error!("Scheduled daily snapshot failed: {}", e),
        }
    }
}

async fn run_weekly_interest_loop(interest: InterestService, config: ConfigService) {
    loop {
        // Re-resolve the configured day each cycle so changes take effect
        // without a restart
        let day = match config.interest_day().await {
            Ok(day) => day,
            Err(e) => {
                warn!("Could not resolve interest day, defaulting to Sunday: {}", e);
                Weekday::Sun
            }
        };

        let now = Local::now().naive_local();
        let next = next_weekly_occurrence(now, day, INTEREST_HOUR, INTEREST_MINUTE);
        sleep_until(now, next).await;

        let today = Local::now().date_naive();
        match interest.calculate_weekly_interest(today).await {
            Ok(run) => info!("Scheduled weekly interest complete: {:?}", run),
            Err(e) => error!("Scheduled weekly interest failed: {}", e),
        }
    }
}

async fn sleep_until(now: NaiveDateTime, next: NaiveDateTime) {
    let wait = (next - now).to_std().unwrap_or_default();
    info!("Next scheduled run at {}", next);
    tokio::time::sleep(wait).await;
}

/// Next occurrence of `hour:minute` strictly after `now`.
fn next_daily_occurrence(now: NaiveDateTime, hour: u32, minute: u32) -> NaiveDateTime {
    let today_run = now
        .date()
        .and_hms_opt(hour, minute, 0)
        .expect("valid wall-clock time");
    if today_run > now {
        today_run
    } else {
        today_run + Duration::days(1)
    }
}

/// Next occurrence of `weekday` at `hour:minute` strictly after `now`.
fn next_weekly_occurrence(
    now: NaiveDateTime,
    weekday: Weekday,
    hour: u32,
    minute: u32,
) -> NaiveDateTime {
    use chrono::Datelike;

    let days_ahead = (weekday.num_days_from_monday() + 7
        - now.weekday().num_days_from_monday())
        % 7;
    let candidate = (now.date() + Duration::days(i64::from(days_ahead)))
        .and_hms_opt(hour, minute, 0)
        .expect("valid wall-clock time");
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}
