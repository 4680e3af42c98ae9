use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::Schedule;

/// Decide whether a target with `schedule` is due at `now`.
///
/// The monitor is expected to be invoked far more often than any schedule
/// fires (typically once a minute), so the cadence is enforced here rather
/// than by the caller. Daily times are interpreted in `timezone`.
pub fn is_due(
    schedule: &Schedule,
    last_checked_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    timezone: Tz,
) -> bool {
    let Some(last_checked_at) = last_checked_at else {
        return true;
    };

    match *schedule {
        Schedule::Hourly { interval_seconds } => {
            let elapsed = now.signed_duration_since(last_checked_at).num_seconds();
            elapsed >= 0 && elapsed as u64 >= interval_seconds
        }
        Schedule::Daily { time } => {
            most_recent_occurrence(time, now, timezone) > last_checked_at
        }
    }
}

/// Latest instant at or before `now` whose wall-clock time in `timezone` is `time`.
fn most_recent_occurrence(time: NaiveTime, now: DateTime<Utc>, timezone: Tz) -> DateTime<Utc> {
    let local_now = now.with_timezone(&timezone);
    let today = local_now.date_naive();

    let today_occurrence = occurrence_on(today, time, timezone);
    if today_occurrence <= now {
        return today_occurrence;
    }

    let yesterday = today.pred_opt().unwrap_or(today);
    occurrence_on(yesterday, time, timezone)
}

fn occurrence_on(date: NaiveDate, time: NaiveTime, timezone: Tz) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(at) => at.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // The wall-clock time was skipped by a DST jump; fire at the first
        // valid instant after it instead.
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            timezone
                .from_local_datetime(&shifted)
                .earliest()
                .map(|at| at.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
        }
    }
}
