use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::platform::{Platform, PlatformError};

/// Source tag written with every heartbeat row.
const PING_SOURCE: &str = "pinged";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingOutcome {
    Pinged,
    AlreadyPingedToday,
}

/// Record the daily heartbeat: at most one row per UTC calendar day.
/// Intended for external cron triggering, so a repeat call is a client
/// error, not a no-op.
pub async fn record_ping(
    platform: &dyn Platform,
    now: DateTime<Utc>,
) -> Result<PingOutcome, PlatformError> {
    let (start, end) = day_window(now);

    if platform.pinged_between(start, end).await? {
        return Ok(PingOutcome::AlreadyPingedToday);
    }

    platform.insert_ping(PING_SOURCE).await?;
    Ok(PingOutcome::Pinged)
}

/// [today 00:00, tomorrow 00:00) in UTC.
fn day_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_window_spans_one_utc_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 17, 45, 12).unwrap();
        let (start, end) = day_window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn day_window_start_of_day_is_inclusive_bound() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let (start, _) = day_window(now);
        assert_eq!(start, now);
    }
}
