use serde::{Deserialize, Serialize};

use crate::{Error, ServiceId};

/// Services booked. Older rows carry a single `service_id`, newer ones a `service_ids` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceRef {
    Single(ServiceId),
    Many(Vec<ServiceId>),
}

impl ServiceRef {
    /// Build from the two store columns; the array wins when both are set.
    pub fn from_columns(single: Option<ServiceId>, many: Option<Vec<ServiceId>>) -> Result<Self, Error> {
        match (single, many) {
            (_, Some(ids)) if !ids.is_empty() => Ok(ServiceRef::Many(ids)),
            (Some(id), _) => Ok(ServiceRef::Single(id)),
            _ => Err(Error::InvalidServiceRef),
        }
    }

    pub fn to_columns(&self) -> (Option<ServiceId>, Option<Vec<ServiceId>>) {
        match self {
            ServiceRef::Single(id) => (Some(*id), None),
            ServiceRef::Many(ids) => (None, Some(ids.clone())),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ServiceRef::Many(ids) if ids.is_empty())
    }
}
