use crate::{BookingManager, Bookings, Services};
use abi::{
    Booking, BookingField, BookingId, BookingPatch, BookingQuery, BookingQueryBuilder,
    BookingWithRelations, Comparison, DataOp, DbConfig, Error, Filter, FilterValue, NewBooking,
    NewService, Normalizer, Page, QueryField, Service, ServiceField, ServiceId, ServicePatch,
    ServiceQuery, ToSql, Validator,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use tracing::{error, info, warn};

/// Binds the directive's filter value, if any, to `$1`.
macro_rules! bind_filter {
    ($query:ident, $value:expr) => {
        match $value {
            None => $query,
            Some(FilterValue::Text(v)) => $query.bind(v.clone()),
            Some(FilterValue::Number(v)) => $query.bind(*v),
            Some(FilterValue::Time(v)) => $query.bind(*v),
            Some(FilterValue::List(v)) => $query.bind(v.clone()),
        }
    };
}

const RELATIONS_SQL: &str = r#"
    SELECT b.id, b.created_at, b.timespan, b.client_id, b.service_id, b.service_ids, b.staff_id,
           b.num_clients, b.total_price, b.status, b.notes, b.is_paid,
           c.full_name AS client_full_name, c.email AS client_email, c.phone AS client_phone,
           s.full_name AS staff_full_name
    FROM bookings b
    JOIN clients c ON c.id = b.client_id
    LEFT JOIN staff s ON s.id = b.staff_id
    WHERE b.id = $1
    "#;

/// Log the raw store error and replace it with the operation's fixed message.
fn store_error(op: DataOp) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| {
        error!(?op, error = %e, "store request failed");
        Error::DataAccess(op)
    }
}

#[async_trait]
impl Bookings for BookingManager {
    async fn fetch_bookings(&self, query: &BookingQuery) -> Result<Page<Booking>, Error> {
        query.validate()?;

        let sql = query.to_sql();

        let items = sqlx::query_as::<_, Booking>(&sql);
        let items = bind_filter!(items, query.bind_value()).fetch_all(&self.pool);
        let count_sql = query.to_count_sql();
        let total = sqlx::query_scalar::<_, i64>(&count_sql);
        let total = bind_filter!(total, query.bind_value()).fetch_one(&self.pool);

        let (items, total) =
            futures::try_join!(items, total).map_err(store_error(DataOp::FetchBookings))?;
        Ok(Page::new(items, total))
    }

    async fn fetch_booking(&self, id: BookingId) -> Result<Booking, Error> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BookingField::COLUMNS);
        sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error(DataOp::FetchBooking))?
            .ok_or_else(|| Error::booking_not_found(id))
    }

    async fn fetch_booking_with_relations(
        &self,
        id: BookingId,
    ) -> Result<BookingWithRelations, Error> {
        sqlx::query_as::<_, BookingWithRelations>(RELATIONS_SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error(DataOp::FetchBooking))?
            .ok_or_else(|| Error::booking_not_found(id))
    }

    async fn fetch_bookings_since(&self, since: DateTime<Utc>) -> Result<Vec<Booking>, Error> {
        let query = BookingQueryBuilder::default()
            .filter(Filter {
                field: BookingField::StartDate,
                op: Comparison::Gte,
                value: FilterValue::Time(since),
            })
            .build()?;
        Ok(self.fetch_bookings(&query).await?.items)
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, Error> {
        booking.validate()?;

        let (service_id, service_ids) = booking.services.to_columns();
        let sql = format!(
            r#"
            INSERT INTO bookings (timespan, client_id, service_id, service_ids, staff_id,
                                  num_clients, total_price, status, notes, is_paid)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            BookingField::COLUMNS
        );
        let created = sqlx::query_as::<_, Booking>(&sql)
            .bind(booking.get_time_span())
            .bind(booking.client_id)
            .bind(service_id)
            .bind(service_ids)
            .bind(booking.staff_id)
            .bind(booking.num_clients)
            .bind(booking.total_price)
            .bind(booking.status.to_string())
            .bind(booking.notes)
            .bind(booking.is_paid)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error(DataOp::CreateBooking))?;

        info!(id = created.id, "booking created");
        Ok(created)
    }

    async fn update_booking(&self, id: BookingId, patch: BookingPatch) -> Result<Booking, Error> {
        patch.validate()?;
        if patch.is_empty() {
            return self.fetch_booking(id).await;
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE bookings SET ");
        {
            let mut fields = builder.separated(", ");
            if patch.start.is_some() || patch.end.is_some() {
                fields.push("timespan = tstzrange(COALESCE(");
                fields.push_bind_unseparated(patch.start);
                fields.push_unseparated(", lower(timespan)), COALESCE(");
                fields.push_bind_unseparated(patch.end);
                fields.push_unseparated(", upper(timespan)))");
            }
            if let Some(num_clients) = patch.num_clients {
                fields.push("num_clients = ");
                fields.push_bind_unseparated(num_clients);
            }
            if let Some(total_price) = patch.total_price {
                fields.push("total_price = ");
                fields.push_bind_unseparated(total_price);
            }
            if let Some(status) = patch.status {
                fields.push("status = ");
                fields.push_bind_unseparated(status.to_string());
            }
            if let Some(notes) = patch.notes {
                fields.push("notes = ");
                fields.push_bind_unseparated(notes);
            }
            if let Some(is_paid) = patch.is_paid {
                fields.push("is_paid = ");
                fields.push_bind_unseparated(is_paid);
            }
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {}", BookingField::COLUMNS));

        let updated = builder
            .build_query_as::<Booking>()
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error(DataOp::UpdateBooking))?
            .ok_or_else(|| Error::booking_not_found(id))?;

        info!(id, "booking updated");
        Ok(updated)
    }

    async fn delete_booking(&self, id: BookingId) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error(DataOp::DeleteBooking))?;
        if result.rows_affected() == 0 {
            return Err(Error::booking_not_found(id));
        }

        info!(id, "booking deleted");
        Ok(())
    }
}

#[async_trait]
impl Services for BookingManager {
    async fn fetch_services(&self, query: &ServiceQuery) -> Result<Page<Service>, Error> {
        query.validate()?;

        let sql = query.to_sql();

        let items = sqlx::query_as::<_, Service>(&sql);
        let items = bind_filter!(items, query.bind_value()).fetch_all(&self.pool);
        let count_sql = query.to_count_sql();
        let total = sqlx::query_scalar::<_, i64>(&count_sql);
        let total = bind_filter!(total, query.bind_value()).fetch_one(&self.pool);

        let (items, total) =
            futures::try_join!(items, total).map_err(store_error(DataOp::FetchServices))?;
        Ok(Page::new(items, total))
    }

    async fn fetch_service(&self, id: ServiceId) -> Result<Service, Error> {
        let sql = format!("SELECT {} FROM services WHERE id = $1", ServiceField::COLUMNS);
        sqlx::query_as::<_, Service>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error(DataOp::FetchService))?
            .ok_or_else(|| Error::service_not_found(id))
    }

    async fn fetch_services_by_ids(&self, ids: &[ServiceId]) -> Result<Vec<Service>, Error> {
        let sql = format!(
            "SELECT {} FROM services WHERE id = ANY($1)",
            ServiceField::COLUMNS
        );
        let mut found = sqlx::query_as::<_, Service>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(store_error(DataOp::FetchServices))?;

        if found.len() < ids.len() {
            warn!(?ids, found = found.len(), "booking references missing services");
        }
        found.sort_by_key(|s| ids.iter().position(|id| *id == s.id));
        Ok(found)
    }

    async fn create_service(&self, mut service: NewService) -> Result<Service, Error> {
        service.normalize()?;

        let sql = format!(
            r#"
            INSERT INTO services (name, duration_minutes, regular_price, category, discount,
                                  image, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            ServiceField::COLUMNS
        );
        let created = sqlx::query_as::<_, Service>(&sql)
            .bind(service.name)
            .bind(service.duration_minutes)
            .bind(service.regular_price)
            .bind(service.category)
            .bind(service.discount)
            .bind(service.image)
            .bind(service.description)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error(DataOp::CreateService))?;

        info!(id = created.id, "service created");
        Ok(created)
    }

    async fn update_service(&self, id: ServiceId, patch: ServicePatch) -> Result<Service, Error> {
        patch.validate()?;
        if patch.is_empty() {
            return self.fetch_service(id).await;
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE services SET ");
        {
            let mut fields = builder.separated(", ");
            if let Some(name) = patch.name {
                fields.push("name = ");
                fields.push_bind_unseparated(name);
            }
            if let Some(duration) = patch.duration_minutes {
                fields.push("duration_minutes = ");
                fields.push_bind_unseparated(duration);
            }
            if let Some(price) = patch.regular_price {
                fields.push("regular_price = ");
                fields.push_bind_unseparated(price);
            }
            if let Some(category) = patch.category {
                fields.push("category = ");
                fields.push_bind_unseparated(category);
            }
            if let Some(discount) = patch.discount {
                fields.push("discount = ");
                fields.push_bind_unseparated(discount);
            }
            if let Some(image) = patch.image {
                fields.push("image = ");
                fields.push_bind_unseparated(image);
            }
            if let Some(description) = patch.description {
                fields.push("description = ");
                fields.push_bind_unseparated(description);
            }
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {}", ServiceField::COLUMNS));

        // a discount above the stored price fails the table check and lands here too
        let updated = builder
            .build_query_as::<Service>()
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error(DataOp::UpdateService))?
            .ok_or_else(|| Error::service_not_found(id))?;

        info!(id, "service updated");
        Ok(updated)
    }

    async fn delete_service(&self, id: ServiceId) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error(DataOp::DeleteService))?;
        if result.rows_affected() == 0 {
            return Err(Error::service_not_found(id));
        }

        info!(id, "service deleted");
        Ok(())
    }
}

impl BookingManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn from_config(config: &DbConfig) -> Result<Self, Error> {
        Self::connect(&config.url(), config.max_connections).await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(store_error(DataOp::Connect))?;
        Ok(Self::new(pool))
    }
}
