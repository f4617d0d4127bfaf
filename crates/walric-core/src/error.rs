use std::fmt;

use snafu::Snafu;
use walric_util_error::BoxedError;

/// Kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Subreddit,
    Submission,
    HistoryEntry,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Subreddit => "subreddit",
            Entity::Submission => "submission",
            Entity::HistoryEntry => "history entry",
        })
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CoreError {
    #[snafu(display("{entity}: invalid ID {id}"))]
    InvalidId { entity: Entity, id: u64 },
    #[snafu(display("{entity}: empty {field}"))]
    EmptyField {
        entity: Entity,
        field: &'static str,
    },
    #[snafu(display("{entity}: {field} already registered: {value}"))]
    AlreadyRegistered {
        entity: Entity,
        field: &'static str,
        value: String,
    },
    #[snafu(display("{entity}: not found"))]
    NotFound { entity: Entity },
    #[snafu(display("invalid resolution: {width} x {height}"))]
    InvalidResolution { width: u32, height: u32 },
    #[snafu(display("empty search text"))]
    EmptySearchText,
    #[snafu(display("storage error"))]
    Storage { source: BoxedError },
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }

    pub fn is_already_registered(&self) -> bool {
        matches!(self, CoreError::AlreadyRegistered { .. })
    }

    /// Caller-side mistakes, never worth retrying
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidId { .. }
                | CoreError::EmptyField { .. }
                | CoreError::InvalidResolution { .. }
                | CoreError::EmptySearchText
        )
    }
}
