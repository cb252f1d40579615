use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

/// This is the standard way of converting a calendar day to a mapping key in
/// dwelt. Records whose key differs from today's are considered stale.
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Key for the calendar day `moment` falls on in the local timezone. Day
/// rollover is defined by this key changing, not by any UTC boundary.
pub fn local_day_key(moment: DateTime<Utc>) -> String {
    day_key(moment.with_timezone(&Local).date_naive())
}

/// Formats elapsed time for the overlay and the report output.
/// Stays compact below an hour (`M:SS`) and grows to `H:MM:SS` after that.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_seconds = elapsed.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::{day_key, format_elapsed, local_day_key};

    #[test]
    fn test_format_elapsed_below_an_hour() {
        assert_eq!(format_elapsed(Duration::zero()), "0:00");
        assert_eq!(format_elapsed(Duration::seconds(7)), "0:07");
        assert_eq!(format_elapsed(Duration::seconds(59)), "0:59");
        assert_eq!(format_elapsed(Duration::seconds(60)), "1:00");
        assert_eq!(format_elapsed(Duration::seconds(3599)), "59:59");
    }

    #[test]
    fn test_format_elapsed_with_hours() {
        assert_eq!(format_elapsed(Duration::seconds(3600)), "1:00:00");
        assert_eq!(format_elapsed(Duration::seconds(3661)), "1:01:01");
        assert_eq!(format_elapsed(Duration::seconds(10 * 3600 + 5)), "10:00:05");
    }

    #[test]
    fn test_format_elapsed_ignores_sub_second_noise() {
        assert_eq!(format_elapsed(Duration::milliseconds(61_999)), "1:01");
    }

    #[test]
    fn test_format_elapsed_clamps_negative() {
        // Negative durations can appear after another process rewrote the
        // session anchor. The display treats them as zero.
        assert_eq!(format_elapsed(Duration::seconds(-5)), "0:00");
    }

    #[test]
    fn test_day_key_format() {
        let day = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        assert_eq!(day_key(day), "2018-07-04");
    }

    #[test]
    fn test_local_day_key_matches_local_date() {
        let moment = Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap();
        let expected = day_key(moment.with_timezone(&chrono::Local).date_naive());
        assert_eq!(local_day_key(moment), expected);
    }
}
