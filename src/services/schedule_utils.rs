use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde_json::json;

use crate::error::{AppError, AppResult};

/// One grid slot, in minutes.
pub const SLOT_MINUTES: i64 = 15;

pub fn parse_datetime(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| {
            AppError::validation_with_details(
                "invalid datetime format",
                json!({"value": value, "error": err.to_string()}),
            )
        })
}

/// Parse a "HH:MM" wall-clock time into minutes from midnight.
pub fn parse_clock_minutes(value: &str) -> AppResult<i64> {
    let time = NaiveTime::parse_from_str(value, "%H:%M").map_err(|err| {
        AppError::validation_with_details(
            "invalid HH:MM time",
            json!({"value": value, "error": err.to_string()}),
        )
    })?;
    Ok((time.hour() as i64) * 60 + (time.minute() as i64))
}

/// Minutes from the midnight of the instant's own day.
pub fn minutes_from_midnight(dt: DateTime<Utc>) -> i64 {
    (dt.hour() as i64) * 60 + (dt.minute() as i64)
}

/// Whole days between the midnights of `week_start` and `target`. Values
/// outside [0, 7) are out of the current week.
pub fn day_index(target: DateTime<Utc>, week_start: DateTime<Utc>) -> i64 {
    (target.date_naive() - week_start.date_naive()).num_days()
}

/// Half-open interval intersection.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_clock_minutes_accepts_hh_mm() {
        assert_eq!(parse_clock_minutes("09:30").unwrap(), 570);
        assert_eq!(parse_clock_minutes("00:00").unwrap(), 0);
        assert!(parse_clock_minutes("25:00").is_err());
        assert!(parse_clock_minutes("9am").is_err());
    }

    #[test]
    fn day_index_counts_whole_days_between_midnights() {
        let week_start = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        let late_same_day = Utc.with_ymd_and_hms(2025, 3, 2, 23, 59, 0).unwrap();
        let next_morning = Utc.with_ymd_and_hms(2025, 3, 3, 0, 1, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        assert_eq!(day_index(late_same_day, week_start), 0);
        assert_eq!(day_index(next_morning, week_start), 1);
        assert_eq!(day_index(before, week_start), -1);
    }
}
