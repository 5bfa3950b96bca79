mod detail;
#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use abi::{
    Booking, BookingId, BookingQuery, BookingStatus, DashboardConfig, Error, Pager, QueryDirective,
    QueryField, Service, ServiceQuery,
};
use booking::{
    engine,
    stats::{self, DashboardStats, SalesDay},
    Bookings, Services,
};
use chrono::{Duration, NaiveDate, TimeZone};
use serde::Serialize;
use tracing::{info, warn};

pub use detail::{fetch_details, BookingDetail, DetailState, MutationOutcome, ViewHandle};

/// Read side of the admin dashboard, shared by every view.
pub struct Dashboard<S> {
    store: Arc<S>,
    config: DashboardConfig,
}

/// One page of a listing and where it sits in the whole set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub pager: Pager,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub stats: DashboardStats,
    pub sales: Vec<SalesDay>,
    pub by_status: Vec<(BookingStatus, usize)>,
    pub today: Vec<Booking>,
}

/// Fragments that do not parse are logged and skipped; the rest still apply.
pub fn parse_directive<F: QueryField>(search: &str) -> QueryDirective<F> {
    let (directive, rejected) = QueryDirective::parse_lenient(search);
    for e in rejected {
        warn!(search, error = %e, "ignoring query parameter");
    }
    directive
}

impl<S: Bookings + Services> Dashboard<S> {
    pub fn new(store: Arc<S>, config: DashboardConfig) -> Self {
        Self { store, config }
    }

    /// Bookings for the list view, one page at a time. No page param means page 1.
    pub async fn bookings(&self, search: &str) -> Result<Listing<Booking>, Error> {
        let mut query: BookingQuery = parse_directive(search);
        let page = *query.page.get_or_insert(1);
        let found = self.store.fetch_bookings(&query).await?;
        Ok(Listing {
            pager: found.pager(page),
            items: found.items,
        })
    }

    /// The whole service catalog, filtered and sorted in memory.
    pub async fn services(&self, search: &str) -> Result<Vec<Service>, Error> {
        let query: ServiceQuery = parse_directive(search);
        let all = self.store.fetch_services(&ServiceQuery::default()).await?;
        Ok(engine::apply(all.items, &query))
    }

    /// Today's figures plus the recent sales series, in the viewer's zone.
    pub async fn summary<Tz: TimeZone>(&self, today: NaiveDate, tz: &Tz) -> Result<Summary, Error> {
        let days = self.config.recent_days.max(1);
        let first = today - Duration::days(days as i64 - 1);
        let since = stats::local_day_start(first, tz);
        let recent = self.store.fetch_bookings_since(since).await?;
        info!(%today, days, fetched = recent.len(), "computing dashboard summary");

        Ok(Summary {
            stats: stats::compute_dashboard_stats(&recent, today, tz),
            sales: stats::sales_by_day(&recent, today, days, tz),
            by_status: stats::count_by_status(&recent),
            today: stats::todays_activity(&recent, today, tz),
        })
    }

    pub fn booking_detail(&self, id: BookingId) -> BookingDetail<S> {
        BookingDetail::new(self.store.clone(), id)
    }
}
