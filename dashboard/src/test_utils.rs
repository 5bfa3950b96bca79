use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use abi::{
    Booking, BookingId, BookingPatch, BookingQuery, BookingStatus, BookingWithRelations, Client,
    DataOp, Error, NewBooking, NewService, Normalizer, Page, Service, ServiceId, ServicePatch,
    ServiceQuery, ServiceRef, Staff, Validator,
};
use async_trait::async_trait;
use booking::{engine, Bookings, Services};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Notify;

/// In-memory store that counts calls per operation and fails on demand.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<Data>,
    calls: Mutex<HashMap<DataOp, usize>>,
    failing: Mutex<HashSet<DataOp>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

#[derive(Default)]
struct Data {
    bookings: Vec<Booking>,
    services: Vec<Service>,
    clients: Vec<Client>,
    staff: Vec<Staff>,
    next_id: i64,
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
}

pub fn client() -> Client {
    Client {
        id: 1,
        full_name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
        phone: "555-0100".into(),
    }
}

pub fn service(id: ServiceId, name: &str, price: f64) -> Service {
    Service {
        id,
        name: name.into(),
        duration_minutes: 45,
        regular_price: price,
        category: "hair".into(),
        discount: None,
        image: None,
        description: None,
    }
}

pub fn sample_booking(id: BookingId, services: ServiceRef) -> Booking {
    let start = at(19, 9);
    Booking {
        id,
        created_at: start - Duration::days(2),
        start,
        end: start + Duration::hours(1),
        client_id: 1,
        services,
        staff_id: Some(1),
        num_clients: 1,
        total_price: Some(60.0),
        status: BookingStatus::Confirmed,
        notes: String::new(),
        is_paid: false,
    }
}

fn apply_booking_patch(booking: &mut Booking, patch: &BookingPatch) {
    if let Some(start) = patch.start {
        booking.start = start;
    }
    if let Some(end) = patch.end {
        booking.end = end;
    }
    if let Some(n) = patch.num_clients {
        booking.num_clients = n;
    }
    if let Some(price) = patch.total_price {
        booking.total_price = price;
    }
    if let Some(status) = patch.status {
        booking.status = status;
    }
    if let Some(notes) = &patch.notes {
        booking.notes = notes.clone();
    }
    if let Some(paid) = patch.is_paid {
        booking.is_paid = paid;
    }
}

fn apply_service_patch(service: &mut Service, patch: &ServicePatch) {
    if let Some(name) = &patch.name {
        service.name = name.clone();
    }
    if let Some(d) = patch.duration_minutes {
        service.duration_minutes = d;
    }
    if let Some(price) = patch.regular_price {
        service.regular_price = price;
    }
    if let Some(category) = &patch.category {
        service.category = category.clone();
    }
    if let Some(discount) = patch.discount {
        service.discount = discount;
    }
    if let Some(image) = &patch.image {
        service.image = image.clone();
    }
    if let Some(description) = &patch.description {
        service.description = description.clone();
    }
}

impl MemoryStore {
    /// A store with one client, one staff member and three services.
    pub fn seeded() -> Self {
        let store = Self::default();
        {
            let mut data = store.data.lock().unwrap();
            data.clients.push(client());
            data.staff.push(Staff {
                id: 1,
                full_name: "Grace Hopper".into(),
            });
            data.services = vec![
                service(1, "Cut", 30.0),
                service(2, "Color", 80.0),
                service(3, "Blow dry", 25.0),
            ];
            data.next_id = 100;
        }
        store
    }

    pub fn with_booking(self, booking: Booking) -> Self {
        self.data.lock().unwrap().bookings.push(booking);
        self
    }

    pub fn fail_on(&self, op: DataOp) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn calls(&self, op: DataOp) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    pub fn booking(&self, id: BookingId) -> Option<Booking> {
        let data = self.data.lock().unwrap();
        data.bookings.iter().find(|b| b.id == id).cloned()
    }

    /// Hold every following fetch until the returned notifier fires.
    pub fn pause_fetches(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    fn enter(&self, op: DataOp) -> Result<(), Error> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        if self.failing.lock().unwrap().contains(&op) {
            return Err(Error::DataAccess(op));
        }
        Ok(())
    }

    async fn wait_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn next_id(&self) -> i64 {
        let mut data = self.data.lock().unwrap();
        data.next_id += 1;
        data.next_id
    }
}

#[async_trait]
impl Bookings for MemoryStore {
    async fn fetch_bookings(&self, query: &BookingQuery) -> Result<Page<Booking>, Error> {
        self.enter(DataOp::FetchBookings)?;
        let all = self.data.lock().unwrap().bookings.clone();
        let items = engine::apply(all, query);
        let total = items.len() as i64;
        Ok(Page::new(engine::paginate(items, query.page), total))
    }

    async fn fetch_booking(&self, id: BookingId) -> Result<Booking, Error> {
        self.enter(DataOp::FetchBooking)?;
        self.booking(id).ok_or_else(|| Error::booking_not_found(id))
    }

    async fn fetch_booking_with_relations(
        &self,
        id: BookingId,
    ) -> Result<BookingWithRelations, Error> {
        self.enter(DataOp::FetchBooking)?;
        self.wait_gate().await;
        let data = self.data.lock().unwrap();
        let booking = data
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| Error::booking_not_found(id))?;
        let client = data
            .clients
            .iter()
            .find(|c| c.id == booking.client_id)
            .cloned()
            .ok_or(Error::DataAccess(DataOp::FetchBooking))?;
        let staff = data
            .staff
            .iter()
            .find(|s| Some(s.id) == booking.staff_id)
            .cloned();
        Ok(BookingWithRelations {
            booking,
            client,
            staff,
        })
    }

    async fn fetch_bookings_since(&self, since: DateTime<Utc>) -> Result<Vec<Booking>, Error> {
        self.enter(DataOp::FetchBookings)?;
        let data = self.data.lock().unwrap();
        Ok(data
            .bookings
            .iter()
            .filter(|b| b.start >= since)
            .cloned()
            .collect())
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, Error> {
        self.enter(DataOp::CreateBooking)?;
        booking.validate()?;
        let id = self.next_id();
        let created = Booking {
            id,
            created_at: Utc::now(),
            start: booking.start,
            end: booking.end,
            client_id: booking.client_id,
            services: booking.services,
            staff_id: booking.staff_id,
            num_clients: booking.num_clients,
            total_price: booking.total_price,
            status: booking.status,
            notes: booking.notes,
            is_paid: booking.is_paid,
        };
        self.data.lock().unwrap().bookings.push(created.clone());
        Ok(created)
    }

    async fn update_booking(&self, id: BookingId, patch: BookingPatch) -> Result<Booking, Error> {
        self.enter(DataOp::UpdateBooking)?;
        patch.validate()?;
        let mut data = self.data.lock().unwrap();
        let booking = data
            .bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| Error::booking_not_found(id))?;
        apply_booking_patch(booking, &patch);
        Ok(booking.clone())
    }

    async fn delete_booking(&self, id: BookingId) -> Result<(), Error> {
        self.enter(DataOp::DeleteBooking)?;
        let mut data = self.data.lock().unwrap();
        let before = data.bookings.len();
        data.bookings.retain(|b| b.id != id);
        if data.bookings.len() == before {
            return Err(Error::booking_not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl Services for MemoryStore {
    async fn fetch_services(&self, query: &ServiceQuery) -> Result<Page<Service>, Error> {
        self.enter(DataOp::FetchServices)?;
        let all = self.data.lock().unwrap().services.clone();
        let items = engine::apply(all, query);
        let total = items.len() as i64;
        Ok(Page::new(engine::paginate(items, query.page), total))
    }

    async fn fetch_service(&self, id: ServiceId) -> Result<Service, Error> {
        self.enter(DataOp::FetchService)?;
        let data = self.data.lock().unwrap();
        data.services
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| Error::service_not_found(id))
    }

    async fn fetch_services_by_ids(&self, ids: &[ServiceId]) -> Result<Vec<Service>, Error> {
        self.enter(DataOp::FetchServices)?;
        let data = self.data.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| data.services.iter().find(|s| s.id == *id).cloned())
            .collect())
    }

    async fn create_service(&self, mut service: NewService) -> Result<Service, Error> {
        self.enter(DataOp::CreateService)?;
        service.normalize()?;
        let id = self.next_id();
        let created = Service {
            id,
            name: service.name,
            duration_minutes: service.duration_minutes,
            regular_price: service.regular_price,
            category: service.category,
            discount: service.discount,
            image: service.image,
            description: service.description,
        };
        self.data.lock().unwrap().services.push(created.clone());
        Ok(created)
    }

    async fn update_service(&self, id: ServiceId, patch: ServicePatch) -> Result<Service, Error> {
        self.enter(DataOp::UpdateService)?;
        patch.validate()?;
        let mut data = self.data.lock().unwrap();
        let service = data
            .services
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::service_not_found(id))?;
        let mut updated = service.clone();
        apply_service_patch(&mut updated, &patch);
        // stands in for the table checks
        updated
            .validate()
            .map_err(|_| Error::DataAccess(DataOp::UpdateService))?;
        *service = updated.clone();
        Ok(updated)
    }

    async fn delete_service(&self, id: ServiceId) -> Result<(), Error> {
        self.enter(DataOp::DeleteService)?;
        let mut data = self.data.lock().unwrap();
        let before = data.services.len();
        data.services.retain(|s| s.id != id);
        if data.services.len() == before {
            return Err(Error::service_not_found(id));
        }
        Ok(())
    }
}
