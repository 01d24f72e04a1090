//! Date helper functions

use chrono::{DateTime, Utc};

/// Format a date for display in the given locale, year/long month/day
///
/// # Examples
/// ```ignore
/// format_date(&date, "en-US") // -> "January 1, 2023"
/// format_date(&date, "en-GB") // -> "1 January 2023"
/// ```
pub fn format_date(date: &DateTime<Utc>, locale: &str) -> String {
    let format = match locale_style(locale) {
        DateStyle::MonthFirst => "%B %-d, %Y",
        DateStyle::DayFirst => "%-d %B %Y",
        DateStyle::Iso => "%Y-%m-%d",
    };
    date.format(format).to_string()
}

/// RFC 822 date as used by RSS `pubDate`
pub fn rfc822(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}

enum DateStyle {
    MonthFirst,
    DayFirst,
    Iso,
}

/// Only English month names are available, other languages fall back to ISO
fn locale_style(locale: &str) -> DateStyle {
    let locale = locale.replace('_', "-").to_ascii_lowercase();
    match locale.as_str() {
        "en" | "en-us" | "en-ph" => DateStyle::MonthFirst,
        l if l.starts_with("en-") => DateStyle::DayFirst,
        _ => DateStyle::Iso,
    }
}
