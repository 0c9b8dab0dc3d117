//! Error types for bigcorp.
//!
//! All errors are strongly typed using thiserror so callers can pattern
//! match on the exact failure and translate it into a response.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::captor::CaptorId;
use crate::measure::MeasureId;
use crate::site::SiteId;
use crate::storage::StorageError;

/// Validation errors raised before anything is written.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Site name cannot be empty")]
    EmptySiteName,

    #[error("Captor name cannot be empty")]
    EmptyCaptorName,

    #[error("Captor must be bound to a site")]
    UnboundSite,

    #[error("Measure must be bound to a captor")]
    UnboundCaptor,

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        field: String,
        max_length: usize,
    },

    #[error("Invalid captor: {reason}")]
    InvalidCaptor {
        reason: String,
    },

    #[error("Captor {id} is not a simulated captor")]
    NotSimulated {
        id: CaptorId,
    },

    #[error("Invalid time range: from ({from}) must be before to ({to})")]
    InvalidTimeRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("Series of {len} readings exceeds maximum of {max}")]
    SeriesTooLong {
        len: usize,
        max: usize,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Execution errors raised while an operation runs against the stores.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Site not found: {id}")]
    SiteNotFound {
        id: SiteId,
    },

    #[error("Captor not found: {id}")]
    CaptorNotFound {
        id: CaptorId,
    },

    #[error("Measure not found: {id}")]
    MeasureNotFound {
        id: MeasureId,
    },

    #[error("Integrity violation: {message}")]
    IntegrityViolation {
        message: String,
    },

    #[error("Storage conflict: {message}")]
    Conflict {
        message: String,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
    },
}

impl From<StorageError> for ExecutionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SiteNotFound(id) => Self::SiteNotFound { id },
            StorageError::CaptorNotFound(id) => Self::CaptorNotFound { id },
            StorageError::MeasureNotFound(id) => Self::MeasureNotFound { id },
            StorageError::IntegrityViolation(message) => Self::IntegrityViolation { message },
            StorageError::Conflict(message) => Self::Conflict { message },
            StorageError::BackendError(message) => Self::Storage { message },
        }
    }
}

/// Top-level error type for bigcorp.
#[derive(Debug, Error)]
pub enum BigCorpError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl From<StorageError> for BigCorpError {
    fn from(err: StorageError) -> Self {
        Self::Execution(err.into())
    }
}

impl BigCorpError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if the requested site, captor or measure does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Execution(
                ExecutionError::SiteNotFound { .. }
                    | ExecutionError::CaptorNotFound { .. }
                    | ExecutionError::MeasureNotFound { .. }
            )
        )
    }

    /// Returns true if the store rejected the operation for referential integrity.
    #[must_use]
    pub const fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::IntegrityViolation { .. }))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for bigcorp operations.
pub type BigCorpResult<T> = Result<T, BigCorpError>;
