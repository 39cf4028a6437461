//! # Errors
//!
//! Rollbook splits failures into two layers:
//! - [`StoreError`]: what a record store backend reports
//! - [`RollError`]: what the allocation engine surfaces to the
//!   record-creation flow
//!
//! Every `RollError` maps to a coarse [`ErrorKind`] with an HTTP-ish
//! status code so transport layers can render it without matching on
//! every variant.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for allocation engine APIs.
pub type RollResult<T> = Result<T, RollError>;

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Coarse error classes + status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,   // 400
    NotFound,     // 404
    Conflict,     // 409
    GeneralError, // 500
    Unavailable,  // 503
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::GeneralError => 500,
            ErrorKind::Unavailable => 503,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::Unavailable => "Unavailable",
        }
    }
}

/// Errors reported by a record store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Tenant not found: {tenant_id}")]
    TenantNotFound { tenant_id: String },

    /// Write-time uniqueness constraint rejected an insert.
    #[error("Unique constraint violated on {key}")]
    UniqueViolation { key: String },

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn tenant_not_found<S: Into<String>>(tenant_id: S) -> Self {
        Self::TenantNotFound {
            tenant_id: tenant_id.into(),
        }
    }

    pub fn unique_violation<S: Into<String>>(key: S) -> Self {
        Self::UniqueViolation { key: key.into() }
    }
}

/// Errors surfaced by the allocation engine.
#[derive(Error, Debug)]
pub enum RollError {
    #[error("Tenant not found: {tenant_id}")]
    TenantNotFound { tenant_id: String },

    #[error("Malformed identifier '{input}': {reason}")]
    MalformedIdentifier { input: String, reason: String },

    /// Caller handed the formatter something it cannot print.
    #[error("Invalid identifier parts: {reason}")]
    InvalidParts { reason: String },

    #[error("Invalid allocation request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Scope resolution failed: {source}")]
    ScopeResolution {
        #[source]
        source: StoreError,
    },

    #[error("Allocation exhausted after {attempts} attempts at {at}: {last_cause}")]
    AllocationExhausted {
        attempts: u32,
        last_cause: String,
        at: DateTime<Utc>,
    },

    #[error("No free username for '{base}' within {cap} suffixes")]
    UsernameExhausted { base: String, cap: u32 },

    #[error("Password hashing failed: {source}")]
    Hashing {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration for '{key}': {reason}")]
    InvalidConfig { key: String, reason: String },
}

impl RollError {
    pub fn malformed<I: Into<String>, R: Into<String>>(input: I, reason: R) -> Self {
        Self::MalformedIdentifier {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_parts<S: Into<String>>(reason: S) -> Self {
        Self::InvalidParts {
            reason: reason.into(),
        }
    }

    pub fn invalid_request<S: Into<String>>(reason: S) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub fn invalid_config<K: Into<String>, R: Into<String>>(key: K, reason: R) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn hashing<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Hashing {
            source: Box::new(error),
        }
    }

    /// Only store failures are worth another attempt; everything else
    /// would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ScopeResolution { .. })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TenantNotFound { .. } => ErrorKind::NotFound,
            Self::MalformedIdentifier { .. }
            | Self::InvalidParts { .. }
            | Self::InvalidRequest { .. } => ErrorKind::BadRequest,
            Self::AllocationExhausted { .. } | Self::UsernameExhausted { .. } => {
                ErrorKind::Conflict
            }
            Self::ScopeResolution { .. } => ErrorKind::Unavailable,
            Self::Hashing { .. } | Self::InvalidConfig { .. } => ErrorKind::GeneralError,
        }
    }

    pub fn code(&self) -> u16 {
        self.kind().status_code()
    }
}

impl From<StoreError> for RollError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TenantNotFound { tenant_id } => Self::TenantNotFound { tenant_id },
            other => Self::ScopeResolution { source: other },
        }
    }
}
