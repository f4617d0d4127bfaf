//! Gathering of new wallpapers: which posts look like images, fetching them,
//! and registering them as submissions.

pub mod classify;
pub mod fetch;
mod gatherer;
pub mod source;
pub mod transport;

pub use self::gatherer::*;

pub(crate) const LOG_TARGET: &str = "walric::gather";
