use std::ops::Bound;

use chrono::{DateTime, Utc};
use sqlx::postgres::types::PgRange;

use crate::Error;

mod booking;
mod booking_status;
mod client;
mod draft;
mod query;
mod service;
mod service_ref;

pub use booking::{
    Booking, BookingDetails, BookingField, BookingPatch, BookingQuery, BookingQueryBuilder,
    BookingWithRelations, NewBooking, NewBookingBuilder,
};
pub use booking_status::BookingStatus;
pub use client::{Client, Staff};
pub use draft::BookingDraft;
pub use query::*;
pub use service::{
    NewService, NewServiceBuilder, Service, ServiceField, ServicePatch, ServiceQuery,
    ServiceQueryBuilder,
};
pub use service_ref::ServiceRef;

pub fn validate_range(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<(), Error> {
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(()),
        _ => Err(Error::InvalidTime),
    }
}

pub fn get_timespan(start: DateTime<Utc>, end: DateTime<Utc>) -> PgRange<DateTime<Utc>> {
    PgRange {
        start: Bound::Included(start),
        end: Bound::Excluded(end),
    }
}

/// Bounds of a range with the inclusive/exclusive distinction dropped.
pub struct NaiveRange<T> {
    pub start: Option<T>,
    pub end: Option<T>,
}

impl<T> From<PgRange<T>> for NaiveRange<T> {
    fn from(range: PgRange<T>) -> Self {
        let f = |b: Bound<T>| match b {
            Bound::Included(v) => Some(v),
            Bound::Excluded(v) => Some(v),
            Bound::Unbounded => None,
        };

        let start = f(range.start);
        let end = f(range.end);

        Self { start, end }
    }
}
