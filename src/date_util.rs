use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};

/// Timestamp layout used for every stored event time. Fixed width and
/// lexically ordered, and understood by SQLite's `strftime`.
pub const SQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get the last day of a given month.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = next_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next_month, 1).map(|d| d - Duration::days(1))
}

/// Number of calendar days in a month, leap years included.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    last_day_of_month(year, month).map(|d| d.day())
}

/// The (year, month) following the given one.
pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Midnight UTC on the first day of the month.
pub fn month_start(year: i32, month: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn to_sql_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(SQL_TIMESTAMP_FORMAT).to_string()
}

pub fn naive_to_sql_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(SQL_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2025, 1),
            NaiveDate::from_ymd_opt(2025, 1, 31)
        );
        assert_eq!(
            last_day_of_month(2025, 2),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        ); // Leap year
        assert_eq!(
            last_day_of_month(2025, 12),
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
        assert_eq!(last_day_of_month(2025, 13), None);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2025, 4), Some(30));
        assert_eq!(days_in_month(2025, 7), Some(31));
        assert_eq!(days_in_month(1900, 2), Some(28)); // century, not leap
        assert_eq!(days_in_month(2000, 2), Some(29)); // 400-year rule
    }

    #[test]
    fn test_month_start_and_next_month() {
        assert_eq!(next_month(2024, 12), (2025, 1));
        assert_eq!(next_month(2025, 3), (2025, 4));
        assert_eq!(
            month_start(2025, 3).map(|d| naive_to_sql_timestamp(&d)),
            Some("2025-03-01 00:00:00".to_string())
        );
        assert_eq!(month_start(2025, 0), None);
    }

    #[test]
    fn test_sql_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 9, 7, 5, 3).unwrap();
        assert_eq!(to_sql_timestamp(&ts), "2025-01-09 07:05:03");
    }
}
