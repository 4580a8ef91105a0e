use time::{macros::time, Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// The machine's current UTC offset, falling back to UTC when it cannot be
/// determined (e.g. once other threads are running on unix).
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// `date` at wall-clock `time` in the given offset.
pub fn at(date: Date, time: Time, offset: UtcOffset) -> OffsetDateTime {
    PrimitiveDateTime::new(date, time).assume_offset(offset)
}

pub fn start_of_day(date: Date, offset: UtcOffset) -> OffsetDateTime {
    at(date, Time::MIDNIGHT, offset)
}

/// Last representable millisecond of `date`, for closing date-only ranges.
pub fn end_of_day(date: Date, offset: UtcOffset) -> OffsetDateTime {
    at(date, time!(23:59:59.999), offset)
}

/// The instant `days` whole days before `instant`, if representable.
pub fn days_before(instant: OffsetDateTime, days: i64) -> Option<OffsetDateTime> {
    let seconds = days.checked_mul(Duration::DAY.whole_seconds())?;
    instant.checked_sub(Duration::seconds(seconds))
}

/// Converts fractional hours to a duration, rounded to the millisecond.
pub fn hours(value: f64) -> Duration {
    Duration::milliseconds((value * 3_600_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset};

    #[test]
    fn at_uses_given_offset() {
        assert_eq!(
            at(date!(2024 - 03 - 04), time!(09:00), offset!(-3)),
            datetime!(2024-03-04 12:00 UTC)
        );
    }

    #[test]
    fn end_of_day_is_last_millisecond() {
        assert_eq!(
            end_of_day(date!(2024 - 03 - 04), UtcOffset::UTC),
            datetime!(2024-03-04 23:59:59.999 UTC)
        );
    }

    #[test]
    fn end_of_last_supported_day() {
        assert_eq!(
            end_of_day(date!(9999 - 12 - 31), offset!(+2)),
            datetime!(9999-12-31 23:59:59.999 +2)
        );
    }

    #[test]
    fn days_before_stays_in_range() {
        let now = datetime!(2024-03-04 12:00 UTC);
        assert_eq!(days_before(now, 30), Some(datetime!(2024-02-03 12:00 UTC)));
        assert_eq!(days_before(now, 10_000_000), None);
        assert_eq!(days_before(now, i64::MAX), None);
    }

    #[test]
    fn fractional_hours() {
        assert_eq!(hours(1.5), Duration::minutes(90));
        assert_eq!(hours(0.25), Duration::minutes(15));
    }
}
