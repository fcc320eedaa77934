use chrono::{DateTime, Utc};

/// Check if a score meets the minimum threshold, tolerating accumulated
/// floating-point error from summed weights.
pub fn meets_threshold(value: f64, minimum: f64) -> bool {
    value >= minimum - 1e-6
}

/// Calendar days between two UTC timestamps, never negative.
pub fn calendar_days_between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> i64 {
    let start_date = start.date_naive();
    let end_date = end.date_naive();

    if end_date < start_date {
        return 0;
    }

    (end_date - start_date).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn calendar_days_ignore_time_of_day() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap();
        assert_eq!(calendar_days_between(&start, &end), 3);
        assert_eq!(calendar_days_between(&end, &start), 0);
    }
}
