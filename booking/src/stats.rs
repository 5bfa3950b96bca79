//! Dashboard aggregates over an already fetched booking collection. Every
//! "day" here is a calendar day in the viewer's time zone.

use abi::{Booking, BookingField, BookingStatus, Direction, SortBy};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::engine;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub today_count: usize,
    pub today_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesDay {
    pub date: NaiveDate,
    pub bookings: usize,
    pub revenue: f64,
}

/// Count and revenue of the bookings starting on `today`. A missing price counts as zero.
pub fn compute_dashboard_stats<Tz: TimeZone>(
    bookings: &[Booking],
    today: NaiveDate,
    tz: &Tz,
) -> DashboardStats {
    let todays = bookings
        .iter()
        .filter(|b| is_on_local_day(&b.start, today, tz));

    let (today_count, today_revenue) = todays.fold((0, 0.0), |(count, revenue), b| {
        (count + 1, revenue + b.total_price.unwrap_or(0.0))
    });

    DashboardStats {
        today_count,
        today_revenue,
    }
}

pub fn is_on_local_day<Tz: TimeZone>(ts: &DateTime<Utc>, day: NaiveDate, tz: &Tz) -> bool {
    ts.with_timezone(tz).date_naive() == day
}

/// UTC instant of local midnight starting `day`. When midnight falls in a
/// DST gap the first valid local instant after it is used.
pub fn local_day_start<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let mut local = day.and_time(NaiveTime::MIN);
    for _ in 0..4 {
        if let Some(start) = tz.from_local_datetime(&local).earliest() {
            return start.with_timezone(&Utc);
        }
        local += Duration::minutes(30);
    }
    // no valid local time within two hours of midnight; fall back to UTC midnight
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// One entry per day from `today - days + 1` to `today`, oldest first, days
/// without bookings included as zero.
pub fn sales_by_day<Tz: TimeZone>(
    bookings: &[Booking],
    today: NaiveDate,
    days: u32,
    tz: &Tz,
) -> Vec<SalesDay> {
    let first = today - Duration::days(days.saturating_sub(1) as i64);
    let mut series: Vec<SalesDay> = first
        .iter_days()
        .take(days as usize)
        .map(|date| SalesDay {
            date,
            bookings: 0,
            revenue: 0.0,
        })
        .collect();

    for booking in bookings {
        let date = booking.start.with_timezone(tz).date_naive();
        if date < first || date > today {
            continue;
        }
        let idx = (date - first).num_days() as usize;
        if let Some(day) = series.get_mut(idx) {
            day.bookings += 1;
            day.revenue += booking.total_price.unwrap_or(0.0);
        }
    }

    series
}

/// Number of bookings per status, in declaration order, statuses with no bookings left out.
pub fn count_by_status(bookings: &[Booking]) -> Vec<(BookingStatus, usize)> {
    BookingStatus::ALL
        .into_iter()
        .map(|status| {
            let n = bookings.iter().filter(|b| b.status == status).count();
            (status, n)
        })
        .filter(|(_, n)| *n > 0)
        .collect()
}

/// Bookings starting on `today`, earliest first.
pub fn todays_activity<Tz: TimeZone>(
    bookings: &[Booking],
    today: NaiveDate,
    tz: &Tz,
) -> Vec<Booking> {
    let mut todays: Vec<Booking> = bookings
        .iter()
        .filter(|b| is_on_local_day(&b.start, today, tz))
        .cloned()
        .collect();
    engine::sort_by(
        &mut todays,
        &SortBy {
            field: BookingField::StartDate,
            direction: Direction::Asc,
        },
    );
    todays
}
