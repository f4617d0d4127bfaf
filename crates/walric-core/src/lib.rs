//! Domain model, storage contract and the validated services on top of it.
//!
//! Storage implementations only ever see records that already passed through
//! [`Validator`]; services are constructed around the validator and never hold
//! the raw storage handle.

mod error;
pub mod mem;
mod model;
mod repository;
pub mod service;
mod validator;

pub use self::error::*;
pub use self::model::*;
pub use self::repository::Repository;
pub use self::service::Services;
pub use self::validator::Validator;

pub(crate) const LOG_TARGET: &str = "walric::core";
