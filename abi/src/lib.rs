mod config;
mod error;
mod pager;
mod types;
pub mod utils;

pub use config::*;
pub use error::*;
pub use pager::*;
pub use types::*;

pub type BookingId = i64;
pub type ServiceId = i64;
pub type ClientId = i64;
pub type StaffId = i64;

/// Number of rows per page, shared by paginated store requests and their consumers.
pub const PAGE_SIZE: u32 = 10;

pub trait Validator {
    fn validate(&self) -> Result<(), Error>;
}

/// Validate first, then fill in defaults.
pub trait Normalizer: Validator {
    fn normalize(&mut self) -> Result<(), Error> {
        self.validate()?;
        self.do_normalize();
        Ok(())
    }

    fn do_normalize(&mut self);
}

pub trait ToSql {
    fn to_sql(&self) -> String;
}
