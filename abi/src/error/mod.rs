use thiserror::Error;
mod field;
pub use field::{DraftField, FieldError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{}", .0.message())]
    DataAccess(DataOp),

    #[error("Failed to read configuration file")]
    ConfigReadError,

    #[error("Failed to parse configuration file")]
    ConfigParseError,

    #[error("No {entity} found with id {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("Missing field {0}")]
    MissingField(String),

    #[error("Start time must be before end time")]
    InvalidTime,

    #[error("Invalid page {0}")]
    InvalidPage(String),

    #[error("Invalid sort field {0}")]
    InvalidSortField(String),

    #[error("Invalid filter {param}={value}")]
    InvalidFilter { param: String, value: String },

    #[error("Invalid booking status {0}")]
    InvalidStatus(String),

    #[error("Invalid service: {0}")]
    InvalidService(&'static str),

    #[error("Booking must reference at least one service")]
    InvalidServiceRef,

    #[error("Another request is still in flight")]
    Busy,

    #[error("Action not available while {0}")]
    InvalidState(&'static str),
}

/// Store operations. Each one has a fixed message shown to users in place of the raw store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataOp {
    Connect,
    FetchBookings,
    FetchBooking,
    CreateBooking,
    UpdateBooking,
    DeleteBooking,
    FetchServices,
    FetchService,
    CreateService,
    UpdateService,
    DeleteService,
}

impl DataOp {
    pub fn message(&self) -> &'static str {
        match self {
            DataOp::Connect => "Could not connect to the booking store",
            DataOp::FetchBookings => "Bookings could not be loaded",
            DataOp::FetchBooking => "Booking could not be loaded",
            DataOp::CreateBooking => "Booking could not be created",
            DataOp::UpdateBooking => "Booking could not be updated",
            DataOp::DeleteBooking => "Booking could not be deleted",
            DataOp::FetchServices => "Services could not be loaded",
            DataOp::FetchService => "Service could not be loaded",
            DataOp::CreateService => "Service could not be created",
            DataOp::UpdateService => "Service could not be updated",
            DataOp::DeleteService => "Service could not be deleted",
        }
    }
}

impl Error {
    pub fn booking_not_found(id: i64) -> Self {
        Error::NotFound {
            entity: "booking",
            id,
        }
    }

    pub fn service_not_found(id: i64) -> Self {
        Error::NotFound {
            entity: "service",
            id,
        }
    }

    /// Field-level errors carried by a validation failure, empty for every other variant.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Error::Validation(errors) => errors,
            _ => &[],
        }
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
