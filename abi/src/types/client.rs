use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{ClientId, StaffId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: ClientId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Staff {
    pub id: StaffId,
    pub full_name: String,
}
