//! Core error types for petcare-core.
//!
//! Every operation returns [`CoreError`]. The domain variants are the error
//! taxonomy the caller boundary translates into user-facing status codes; the
//! remaining variants cover storage, configuration and I/O failures.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::booking::BookingStatus;

/// Why a sitter cannot take a requested window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Some part of the window falls outside the sitter's availability.
    OutsideAvailability,
    /// A pending or accepted booking already covers part of the window.
    OverlappingBooking,
}

impl ConflictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictReason::OutsideAvailability => "outside_availability",
            ConflictReason::OverlappingBooking => "overlapping_booking",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core error type for petcare-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed input, rejected before any state is consulted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The sitter is not bookable for the requested window.
    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    /// The status edge is not in the transition table, or the booking moved
    /// on before the update could be applied.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    /// The actor lacks authority for the attempted operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced booking or review does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A precondition on the current status is not met.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A unique record already exists.
    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        CoreError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation_error",
            CoreError::Conflict(_) => "conflict_error",
            CoreError::InvalidTransition { .. } => "invalid_transition_error",
            CoreError::Forbidden(_) => "forbidden_error",
            CoreError::NotFound(_) => "not_found_error",
            CoreError::InvalidState(_) => "invalid_state_error",
            CoreError::Duplicate(_) => "duplicate_error",
            CoreError::Database(_) => "database_error",
            CoreError::Config(_) => "config_error",
            CoreError::Io(_) => "io_error",
            CoreError::Json(_) => "json_error",
        }
    }

    /// HTTP-style status code reported by the caller boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::Validation(_) => 400,
            CoreError::Conflict(_)
            | CoreError::InvalidTransition { .. }
            | CoreError::Duplicate(_) => 409,
            CoreError::Forbidden(_) => 403,
            CoreError::NotFound(_) => 404,
            CoreError::InvalidState(_) => 422,
            CoreError::Database(_)
            | CoreError::Config(_)
            | CoreError::Io(_)
            | CoreError::Json(_) => 500,
        }
    }

    /// Whether the failure is a domain rejection rather than an infrastructure fault.
    pub fn is_domain(&self) -> bool {
        self.status_code() < 500
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    #[error("Database is locked")]
    Locked,

    /// Another thread panicked while holding the store.
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Could not determine a data directory")]
    NoDataDir,
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DatabaseError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        DatabaseError::Poisoned
    }
}

impl<T> From<std::sync::PoisonError<T>> for CoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        CoreError::Database(DatabaseError::Poisoned)
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
