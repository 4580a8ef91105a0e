//! Conversions between Clockify's ISO-8601 duration text (`PT1H30M`) and hours.
//!
//! Everything here is total: text that does not look like a duration is read
//! as zero hours instead of failing.

use regex::Regex;
use std::sync::LazyLock;

static HOURS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)H").unwrap());
static MINUTES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)M").unwrap());
static SECONDS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)S").unwrap());

/// Parses duration text into hours: `h + m/60 + s/3600`.
///
/// Any of the hour, minute and second components may be missing. When the text
/// has a `T` designator only the time part after it is read, so the month in
/// `P1M` is not taken for minutes.
///
/// # Examples
///
/// ```
/// use timesheet::duration::parse_hours;
///
/// assert_eq!(parse_hours("PT1H30M"), 1.5);
/// assert_eq!(parse_hours("PT45M"), 0.75);
/// assert_eq!(parse_hours("garbage"), 0.0);
/// ```
pub fn parse_hours(text: &str) -> f64 {
    let time_part = match text.find('T') {
        Some(idx) => &text[idx + 1..],
        None => text,
    };

    let component = |pattern: &Regex| -> f64 {
        pattern
            .captures(time_part)
            .and_then(|cap| cap[1].parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    component(&HOURS_PATTERN)
        + component(&MINUTES_PATTERN) / 60.0
        + component(&SECONDS_PATTERN) / 3600.0
}

/// Renders duration text as `"{hours}h {minutes}m"`.
///
/// The total is rounded to whole minutes first, so `PT1H59M59S` reads `2h 0m`.
pub fn format_hours_minutes(text: &str) -> String {
    let total_minutes = (parse_hours(text) * 60.0).round() as i64;
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

/// Renders duration text as hours with one decimal, e.g. `"1.5h"`.
pub fn format_one_decimal(text: &str) -> String {
    format!("{:.1}h", parse_hours(text))
}

/// Renders a summed hour count for reports, e.g. `"12.25h"`.
pub fn format_total(hours: f64) -> String {
    format!("{:.2}h", hours)
}

/// Renders elapsed wall time as `HH:MM:SS` for a live timer.
pub fn format_clock(elapsed: time::Duration) -> String {
    let total_seconds = elapsed.whole_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
