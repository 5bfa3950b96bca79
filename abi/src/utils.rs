//! Display formatters for prices, durations and dates. Missing or malformed
//! input renders as [`PLACEHOLDER`] instead of failing.

use chrono::{DateTime, TimeZone};

pub const PLACEHOLDER: &str = "--";

/// `1234.5` -> `$1,234.50`.
pub fn format_currency(amount: Option<f64>) -> String {
    let amount = match amount {
        Some(a) if a.is_finite() => a,
        _ => return PLACEHOLDER.to_string(),
    };

    let cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, group_thousands(cents / 100), cents % 100)
}

/// Minutes as `45m`, `2h` or `1h 30m`.
pub fn format_duration(minutes: Option<i64>) -> String {
    match minutes {
        Some(m) if m >= 0 => match (m / 60, m % 60) {
            (0, m) => format!("{}m", m),
            (h, 0) => format!("{}h", h),
            (h, m) => format!("{}h {}m", h, m),
        },
        _ => PLACEHOLDER.to_string(),
    }
}

/// e.g. `Mon, Oct 19 2026, 09:30`.
pub fn format_date<Tz: TimeZone>(date: Option<&DateTime<Tz>>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match date {
        Some(d) => d.format("%a, %b %d %Y, %H:%M").to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

/// Relative wording such as `in 3 days` or `2 hours ago`.
pub fn format_distance_from_now<Tz: TimeZone>(
    date: Option<&DateTime<Tz>>,
    now: &DateTime<Tz>,
) -> String {
    let date = match date {
        Some(d) => d,
        None => return PLACEHOLDER.to_string(),
    };

    let delta = date.clone().signed_duration_since(now.clone());
    let secs = delta.num_seconds().abs();
    let (value, unit) = if secs < 60 {
        return "just now".to_string();
    } else if secs < 3600 {
        (secs / 60, "minute")
    } else if secs < 86_400 {
        (secs / 3600, "hour")
    } else if secs < 30 * 86_400 {
        (secs / 86_400, "day")
    } else if secs < 365 * 86_400 {
        (secs / (30 * 86_400), "month")
    } else {
        (secs / (365 * 86_400), "year")
    };
    let plural = if value == 1 { "" } else { "s" };

    if delta.num_seconds() > 0 {
        format!("in {} {}{}", value, unit, plural)
    } else {
        format!("{} {}{} ago", value, unit, plural)
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
