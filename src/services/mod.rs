//! Record services. Each owns one slice of the data model and reaches storage
//! only through the injected [`Datastore`](crate::store::Datastore).

pub mod admin;
pub mod locations;
pub mod messages;
pub mod targets;
pub mod test_results;

use std::path::PathBuf;

use time::OffsetDateTime;

use crate::store::StoreError;

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("seed file {path}: {reason}")]
    Seed { path: PathBuf, reason: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

fn is_false(v: &bool) -> bool {
    !*v
}
