use std::str::FromStr;

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use sqlx::{
    postgres::{types::PgRange, PgRow},
    FromRow, Row,
};

use crate::{
    get_timespan, validate_range, BookingId, BookingStatus, Client, ClientId, Comparison,
    DraftField, Error, FieldError, FieldValue, Filter, FilterValue, NaiveRange, QueryDirective,
    QueryDirectiveBuilder, QueryField, Record, Service, ServiceRef, Staff, StaffId, Validator,
    FILTER_ALL,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub created_at: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub client_id: ClientId,
    pub services: ServiceRef,
    pub staff_id: Option<StaffId>,
    pub num_clients: i32,
    pub total_price: Option<f64>,
    pub status: BookingStatus,
    pub notes: String,
    pub is_paid: bool,
}

/// A booking joined with its client and staff member, as fetched in one round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingWithRelations {
    pub booking: Booking,
    pub client: Client,
    pub staff: Option<Staff>,
}

/// Everything the detail view shows: the booking, its relations and resolved services.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub booking: Booking,
    pub client: Client,
    pub staff: Option<Staff>,
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(build_fn(name = "private_build"), setter(into))]
pub struct NewBooking {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub client_id: ClientId,
    pub services: ServiceRef,
    #[builder(default, setter(strip_option))]
    pub staff_id: Option<StaffId>,
    #[builder(default = "1")]
    pub num_clients: i32,
    #[builder(default, setter(strip_option))]
    pub total_price: Option<f64>,
    #[builder(default)]
    pub status: BookingStatus,
    #[builder(default)]
    pub notes: String,
    #[builder(default)]
    pub is_paid: bool,
}

/// Partial update; `None` fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_clients: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_paid: Option<bool>,
}

pub type BookingQuery = QueryDirective<BookingField>;
pub type BookingQueryBuilder = QueryDirectiveBuilder<BookingField>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingField {
    Status,
    StartDate,
    EndDate,
    CreatedAt,
    TotalPrice,
    NumClients,
}

impl Booking {
    pub fn get_time_span(&self) -> PgRange<DateTime<Utc>> {
        get_timespan(self.start, self.end)
    }

    /// Booked length in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl NewBooking {
    pub fn get_time_span(&self) -> PgRange<DateTime<Utc>> {
        get_timespan(self.start, self.end)
    }
}

/// Prices must be finite and non-negative; NaN would break ordering.
fn check_price(price: Option<f64>) -> Result<(), Error> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => Err(Error::Validation(vec![FieldError::new(
            DraftField::TotalPrice,
            "Total price must be a non-negative amount",
        )])),
        _ => Ok(()),
    }
}

impl Validator for NewBooking {
    fn validate(&self) -> Result<(), Error> {
        validate_range(Some(self.start), Some(self.end))?;
        if self.services.is_empty() {
            return Err(Error::InvalidServiceRef);
        }
        check_price(self.total_price)
    }
}

impl BookingPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Validator for BookingPatch {
    fn validate(&self) -> Result<(), Error> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            validate_range(Some(start), Some(end))?;
        }
        check_price(self.total_price.flatten())
    }
}

impl FromRow<'_, PgRow> for Booking {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let range: PgRange<DateTime<Utc>> = row.try_get("timespan")?;
        let range: NaiveRange<DateTime<Utc>> = range.into();
        let (start, end) = match (range.start, range.end) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(sqlx::Error::Decode("booking timespan is unbounded".into())),
        };

        let services =
            ServiceRef::from_columns(row.try_get("service_id")?, row.try_get("service_ids")?)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<BookingStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Self {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            start,
            end,
            client_id: row.try_get("client_id")?,
            services,
            staff_id: row.try_get("staff_id")?,
            num_clients: row.try_get("num_clients")?,
            total_price: row.try_get("total_price")?,
            status,
            notes: row.try_get("notes")?,
            is_paid: row.try_get("is_paid")?,
        })
    }
}

impl FromRow<'_, PgRow> for BookingWithRelations {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let booking = Booking::from_row(row)?;
        let client = Client {
            id: booking.client_id,
            full_name: row.try_get("client_full_name")?,
            email: row.try_get("client_email")?,
            phone: row.try_get("client_phone")?,
        };
        let staff_name: Option<String> = row.try_get("staff_full_name")?;
        let staff = booking
            .staff_id
            .zip(staff_name)
            .map(|(id, full_name)| Staff { id, full_name });

        Ok(Self {
            booking,
            client,
            staff,
        })
    }
}

impl BookingWithRelations {
    pub fn with_services(self, services: Vec<Service>) -> BookingDetails {
        BookingDetails {
            booking: self.booking,
            client: self.client,
            staff: self.staff,
            services,
        }
    }
}

impl FromStr for BookingField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(BookingField::Status),
            "startDate" => Ok(BookingField::StartDate),
            "endDate" => Ok(BookingField::EndDate),
            "createdAt" => Ok(BookingField::CreatedAt),
            "totalPrice" => Ok(BookingField::TotalPrice),
            "numClients" => Ok(BookingField::NumClients),
            _ => Err(Error::InvalidSortField(s.to_string())),
        }
    }
}

impl QueryField for BookingField {
    const FILTER_PARAM: &'static str = "status";
    const TABLE: &'static str = "bookings";
    const COLUMNS: &'static str = "id, created_at, timespan, client_id, service_id, service_ids, staff_id, num_clients, total_price, status, notes, is_paid";
    const DEFAULT_ORDER: &'static str = "lower(timespan) DESC, id ASC";

    fn column(self) -> &'static str {
        match self {
            BookingField::Status => "status",
            BookingField::StartDate => "lower(timespan)",
            BookingField::EndDate => "upper(timespan)",
            BookingField::CreatedAt => "created_at",
            BookingField::TotalPrice => "total_price",
            BookingField::NumClients => "num_clients",
        }
    }

    fn parse_filter(value: &str) -> Result<Option<Filter<Self>>, Error> {
        if value == FILTER_ALL {
            return Ok(None);
        }
        let status = value.parse::<BookingStatus>().map_err(|_| Error::InvalidFilter {
            param: Self::FILTER_PARAM.into(),
            value: value.into(),
        })?;
        Ok(Some(Filter {
            field: BookingField::Status,
            op: Comparison::Eq,
            value: FilterValue::Text(status.to_string()),
        }))
    }
}

impl Record for Booking {
    type Field = BookingField;

    fn value(&self, field: BookingField) -> FieldValue<'_> {
        match field {
            BookingField::Status => FieldValue::Text(self.status.as_str()),
            BookingField::StartDate => FieldValue::Time(self.start),
            BookingField::EndDate => FieldValue::Time(self.end),
            BookingField::CreatedAt => FieldValue::Time(self.created_at),
            BookingField::TotalPrice => self
                .total_price
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Missing),
            BookingField::NumClients => FieldValue::Number(self.num_clients as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, SortBy, ToSql};
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn new_booking_builder_should_validate_time_range() {
        let ok = NewBookingBuilder::default()
            .start(at(19, 9))
            .end(at(19, 10))
            .client_id(1)
            .services(ServiceRef::Many(vec![1, 2]))
            .build()
            .unwrap();
        assert_eq!(ok.num_clients, 1);
        assert_eq!(ok.status, BookingStatus::Pending);

        let err = NewBookingBuilder::default()
            .start(at(19, 10))
            .end(at(19, 9))
            .client_id(1)
            .services(ServiceRef::Single(1))
            .build()
            .unwrap_err();
        assert_eq!(err, Error::InvalidTime);
    }

    #[test]
    fn new_booking_without_services_should_be_rejected() {
        let err = NewBookingBuilder::default()
            .start(at(19, 9))
            .end(at(19, 10))
            .client_id(1)
            .services(ServiceRef::Many(vec![]))
            .build()
            .unwrap_err();
        assert_eq!(err, Error::InvalidServiceRef);
    }

    #[test]
    fn patch_should_only_check_range_when_both_ends_change() {
        let patch = BookingPatch {
            start: Some(at(19, 12)),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());

        let patch = BookingPatch {
            start: Some(at(19, 12)),
            end: Some(at(19, 11)),
            ..Default::default()
        };
        assert_eq!(patch.validate(), Err(Error::InvalidTime));
        assert!(BookingPatch::default().is_empty());
    }

    #[test]
    fn non_finite_price_should_be_rejected() {
        let err = NewBookingBuilder::default()
            .start(at(19, 9))
            .end(at(19, 10))
            .client_id(1)
            .services(ServiceRef::Single(1))
            .total_price(f64::NAN)
            .build()
            .unwrap_err();
        assert_eq!(err.field_errors()[0].field, DraftField::TotalPrice);

        let patch = BookingPatch {
            total_price: Some(Some(f64::INFINITY)),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(Error::Validation(_))));

        let cleared = BookingPatch {
            total_price: Some(None),
            ..Default::default()
        };
        assert!(cleared.validate().is_ok());
    }

    #[test]
    fn booking_query_should_parse_search_params() {
        let query = BookingQuery::from_search_params("?status=checked-in&sortBy=totalPrice-asc&page=3")
            .unwrap();
        assert_eq!(
            query.filter,
            Some(Filter {
                field: BookingField::Status,
                op: Comparison::Eq,
                value: FilterValue::Text("checked-in".into()),
            })
        );
        assert_eq!(
            query.sort,
            Some(SortBy {
                field: BookingField::TotalPrice,
                direction: Direction::Asc,
            })
        );
        assert_eq!(query.page, Some(3));
        assert_eq!(query.offset(), Some(20));
    }

    #[test]
    fn all_selector_should_not_filter() {
        let query = BookingQuery::from_search_params("status=all").unwrap();
        assert_eq!(query.filter, None);
    }

    #[test]
    fn non_asc_direction_should_sort_descending() {
        let query = BookingQuery::from_search_params("sortBy=startDate-sideways").unwrap();
        assert_eq!(query.sort.unwrap().direction, Direction::Desc);
    }

    #[test]
    fn lenient_parse_should_keep_valid_fragments() {
        let (query, rejected) =
            BookingQuery::parse_lenient("status=pending&sortBy=guestName-asc&page=0&tab=all");
        assert!(query.filter.is_some());
        assert_eq!(query.sort, None);
        assert_eq!(query.page, None);
        assert_eq!(
            rejected,
            vec![
                Error::InvalidSortField("guestName".into()),
                Error::InvalidPage("0".into())
            ]
        );
        assert_eq!(
            BookingQuery::from_search_params("sortBy=guestName-asc").unwrap_err(),
            Error::InvalidSortField("guestName".into())
        );
    }

    #[test]
    fn unknown_status_filter_should_be_rejected() {
        assert_eq!(
            BookingQuery::from_search_params("status=lost").unwrap_err(),
            Error::InvalidFilter {
                param: "status".into(),
                value: "lost".into()
            }
        );
    }

    #[test]
    fn booking_query_should_generate_correct_sql() {
        let query = BookingQuery::from_search_params("status=confirmed&sortBy=startDate-asc&page=2")
            .unwrap();
        assert_eq!(
            query.to_sql(),
            "SELECT id, created_at, timespan, client_id, service_id, service_ids, staff_id, num_clients, total_price, status, notes, is_paid FROM bookings WHERE status = $1 ORDER BY lower(timespan) ASC NULLS FIRST, id ASC LIMIT 10 OFFSET 10"
        );
        assert_eq!(
            query.to_count_sql(),
            "SELECT COUNT(*) FROM bookings WHERE status = $1"
        );
        assert_eq!(
            query.bind_value(),
            Some(&FilterValue::Text("confirmed".into()))
        );
    }

    #[test]
    fn price_sort_should_order_missing_like_the_engine() {
        let asc = BookingQuery::from_search_params("sortBy=totalPrice-asc").unwrap();
        assert!(asc
            .to_sql()
            .ends_with("ORDER BY total_price ASC NULLS FIRST, id ASC"));
        let desc = BookingQuery::from_search_params("sortBy=totalPrice-desc").unwrap();
        assert!(desc
            .to_sql()
            .ends_with("ORDER BY total_price DESC NULLS LAST, id ASC"));
    }

    #[test]
    fn range_filter_should_generate_correct_sql() {
        let query = BookingQueryBuilder::default()
            .filter(Filter {
                field: BookingField::StartDate,
                op: Comparison::Gte,
                value: FilterValue::Time(at(12, 0)),
            })
            .build()
            .unwrap();
        assert_eq!(
            query.to_sql(),
            "SELECT id, created_at, timespan, client_id, service_id, service_ids, staff_id, num_clients, total_price, status, notes, is_paid FROM bookings WHERE lower(timespan) >= $1 ORDER BY lower(timespan) DESC, id ASC"
        );
    }

    #[test]
    fn empty_builder_should_build_unrestricted_query() {
        let query = BookingQueryBuilder::default().build().unwrap();
        assert_eq!(query, BookingQuery::default());
    }

    #[test]
    fn zero_page_should_fail_to_build() {
        let err = BookingQueryBuilder::default()
            .page(0u32)
            .build()
            .unwrap_err();
        assert_eq!(err, Error::InvalidPage("0".into()));
    }
}
