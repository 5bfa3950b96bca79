use std::fmt;

use serde::Serialize;

/// Editable fields of a booking draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftField {
    Start,
    End,
    NumClients,
    TotalPrice,
    Status,
    Notes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: DraftField,
    pub message: String,
}

impl FieldError {
    pub fn new(field: DraftField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DraftField::Start => "start",
            DraftField::End => "end",
            DraftField::NumClients => "numClients",
            DraftField::TotalPrice => "totalPrice",
            DraftField::Status => "status",
            DraftField::Notes => "notes",
        };
        f.write_str(name)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
