use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Booking, BookingPatch, BookingStatus, DraftField, FieldError};

/// Edit form state for a single booking, discarded on cancel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub num_clients: i32,
    pub total_price: Option<f64>,
    pub status: BookingStatus,
    pub notes: String,
    pub is_paid: bool,
}

impl BookingDraft {
    pub fn from_booking(booking: &Booking) -> Self {
        Self {
            start: Some(booking.start),
            end: Some(booking.end),
            num_clients: booking.num_clients,
            total_price: booking.total_price,
            status: booking.status,
            notes: booking.notes.clone(),
            is_paid: booking.is_paid,
        }
    }

    /// Every field error in the draft; empty means it may be submitted.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.start.is_none() {
            errors.push(FieldError::new(DraftField::Start, "Start time is required"));
        }
        match self.end {
            None => errors.push(FieldError::new(DraftField::End, "End time is required")),
            Some(end) => {
                if matches!(self.start, Some(start) if start >= end) {
                    errors.push(FieldError::new(
                        DraftField::End,
                        "End time must be after start time",
                    ));
                }
            }
        }
        if self.num_clients < 1 {
            errors.push(FieldError::new(
                DraftField::NumClients,
                "At least one client is required",
            ));
        }
        if let Some(price) = self.total_price {
            if !price.is_finite() || price < 0.0 {
                errors.push(FieldError::new(
                    DraftField::TotalPrice,
                    "Total price cannot be negative",
                ));
            }
        }

        errors
    }

    /// Patch holding only the fields that differ from `original`.
    pub fn to_patch(&self, original: &Booking) -> BookingPatch {
        BookingPatch {
            start: self.start.filter(|start| *start != original.start),
            end: self.end.filter(|end| *end != original.end),
            num_clients: (self.num_clients != original.num_clients).then_some(self.num_clients),
            total_price: (self.total_price != original.total_price).then_some(self.total_price),
            status: (self.status != original.status).then_some(self.status),
            notes: (self.notes != original.notes).then(|| self.notes.clone()),
            is_paid: (self.is_paid != original.is_paid).then_some(self.is_paid),
        }
    }
}
