use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Converts an instant into the integer representation used by the event table.
pub fn to_micros(moment: DateTime<Utc>) -> i64 {
    moment.timestamp_micros()
}

pub fn from_micros(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}

/// Returns the first instant of `date` in `tz`. When midnight doesn't exist (a DST gap),
/// the first hour that does is used instead.
pub fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    (0..3)
        .map(|hour| date.and_time(NaiveTime::MIN) + Duration::hours(hour))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
}

/// Same as [start_of_day], in UTC.
pub fn utc_start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    start_of_day(tz, date).map(|v| v.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    use super::{from_micros, to_micros, utc_start_of_day};

    #[test]
    fn test_start_of_day_uses_zone_offset() {
        let zone = FixedOffset::east_opt(2 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

        let start = utc_start_of_day(&zone, date).unwrap();

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 9, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_micros_keep_sub_second_precision() {
        let moment = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
            + chrono::Duration::microseconds(42);

        assert_eq!(from_micros(to_micros(moment)), Some(moment));
    }
}
