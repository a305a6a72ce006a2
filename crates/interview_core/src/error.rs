//! crates/interview_core/src/error.rs
//!
//! Outcomes of the core services, one level above `PortError`.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The caller sent something malformed or out of range. Nothing was persisted.
    #[error("{0}")]
    Validation(String),

    /// The record does not exist or belongs to someone else. The two cases are
    /// deliberately indistinguishable.
    #[error("Interview not found")]
    NotFound,

    /// Another writer holds the interview, or it already reached a terminal status.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl ServiceError {
    /// For record lookups: a missing row is `NotFound`, anything else stays a port failure.
    pub fn from_lookup(err: PortError) -> Self {
        match err {
            PortError::NotFound(_) => ServiceError::NotFound,
            other => ServiceError::Port(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
