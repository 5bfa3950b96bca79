pub mod engine;
mod manager;
pub mod stats;

use abi::{
    Booking, BookingId, BookingPatch, BookingQuery, BookingStatus, BookingWithRelations, Error,
    NewBooking, NewService, Page, Service, ServiceId, ServicePatch, ServiceQuery,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Reads always go to the store, so every read sees every committed write.
#[derive(Debug)]
pub struct BookingManager {
    pool: PgPool,
}

#[async_trait]
pub trait Bookings: Send + Sync {
    /// fetch one page (or everything, without a page) of bookings shaped by the directive
    async fn fetch_bookings(&self, query: &BookingQuery) -> Result<Page<Booking>, Error>;
    /// get a booking by id
    async fn fetch_booking(&self, id: BookingId) -> Result<Booking, Error>;
    /// get a booking joined with its client and staff member in one round trip
    async fn fetch_booking_with_relations(
        &self,
        id: BookingId,
    ) -> Result<BookingWithRelations, Error>;
    /// bookings starting at or after `since`
    async fn fetch_bookings_since(&self, since: DateTime<Utc>) -> Result<Vec<Booking>, Error>;
    /// make a booking
    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, Error>;
    /// update the fields present in the patch
    async fn update_booking(&self, id: BookingId, patch: BookingPatch) -> Result<Booking, Error>;
    /// delete a booking
    async fn delete_booking(&self, id: BookingId) -> Result<(), Error>;

    /// change a booking status (confirm, cancel, complete, check in or out)
    async fn update_status(&self, id: BookingId, status: BookingStatus) -> Result<Booking, Error> {
        let patch = BookingPatch {
            status: Some(status),
            ..Default::default()
        };
        self.update_booking(id, patch).await
    }
}

#[async_trait]
pub trait Services: Send + Sync {
    async fn fetch_services(&self, query: &ServiceQuery) -> Result<Page<Service>, Error>;
    async fn fetch_service(&self, id: ServiceId) -> Result<Service, Error>;
    /// services for the given ids, in the order given; unknown ids are skipped
    async fn fetch_services_by_ids(&self, ids: &[ServiceId]) -> Result<Vec<Service>, Error>;
    async fn create_service(&self, service: NewService) -> Result<Service, Error>;
    async fn update_service(&self, id: ServiceId, patch: ServicePatch) -> Result<Service, Error>;
    async fn delete_service(&self, id: ServiceId) -> Result<(), Error>;

    /// insert a copy of an existing service
    async fn duplicate_service(&self, id: ServiceId) -> Result<Service, Error> {
        let service = self.fetch_service(id).await?;
        self.create_service(service.duplicate()).await
    }
}
