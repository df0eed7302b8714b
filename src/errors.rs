//! Error types for the street craps engine
//!
//! `WagerError` is what every engine operation returns. Configuration and
//! snapshot failures have their own types, and `CrapsError` unifies all three
//! for hosts that drive the whole stack.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Root error type for everything the crate can fail with
#[derive(Debug, Error)]
pub enum CrapsError {
    #[error("Wager error: {0}")]
    Wager(#[from] WagerError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Coarse classification callers surface to end users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Conflict,
    InvalidState,
    Unauthorized,
    InsufficientFunds,
}

impl ErrorKind {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Failure of a ledger or game operation.
///
/// Every variant is raised before any state is touched, so a caller that gets
/// one back can assume balances and games are exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WagerError {
    #[error("game {0} not found")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("{account} has insufficient balance: required {required}, available {available}")]
    InsufficientFunds {
        account: String,
        required: u64,
        available: u64,
    },
}

impl WagerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WagerError::NotFound(_) => ErrorKind::NotFound,
            WagerError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            WagerError::Conflict(_) => ErrorKind::Conflict,
            WagerError::InvalidState(_) => ErrorKind::InvalidState,
            WagerError::Unauthorized(_) => ErrorKind::Unauthorized,
            WagerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
        }
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        WagerError::InvalidArgument(msg.into())
    }

    pub(crate) fn conflict(msg: impl Into<String>) -> Self {
        WagerError::Conflict(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        WagerError::InvalidState(msg.into())
    }

    pub(crate) fn unauthorized(msg: impl Into<String>) -> Self {
        WagerError::Unauthorized(msg.into())
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Snapshot persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::ReadFailed(e.to_string()),
            _ => StorageError::WriteFailed(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::CorruptedData(e.to_string())
    }
}

pub type WagerResult<T> = Result<T, WagerError>;
pub type CrapsResult<T> = Result<T, CrapsError>;
