//! # Error Types
//!
//! Structured error types for elec_core. Every calculation failure is a
//! data-entry problem local to one invocation: the caller surfaces it to the
//! user for correction and never retries it.
//!
//! ## Example
//!
//! ```rust
//! use elec_core::errors::{CalcError, CalcResult};
//!
//! fn validate_square_footage(square_footage: f64) -> CalcResult<()> {
//!     if square_footage <= 0.0 {
//!         return Err(CalcError::invalid_input(
//!             "square_footage",
//!             square_footage.to_string(),
//!             "Square footage must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_square_footage(-10.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for elec_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for calculation and job operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// Non-positive dimension/area/voltage, negative quantity, malformed code
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Wire gauge absent from a code table
    #[error("Unknown gauge '{gauge}' in {table}")]
    UnknownGauge { gauge: String, table: String },

    /// Category or key absent from a code table (box size, conduit size, ...)
    #[error("No entry for '{key}' in {table}")]
    UnknownCodeLookup { table: String, key: String },

    /// Code table document is malformed or inconsistent
    #[error("Code table error: {reason}")]
    TableError { reason: String },

    /// A job record referenced by id does not exist
    #[error("{kind} record not found: {id}")]
    RecordNotFound { kind: String, id: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// Job file is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Job file schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnknownGauge error
    pub fn unknown_gauge(gauge: impl Into<String>, table: impl Into<String>) -> Self {
        CalcError::UnknownGauge {
            gauge: gauge.into(),
            table: table.into(),
        }
    }

    /// Create an UnknownCodeLookup error
    pub fn unknown_lookup(table: impl Into<String>, key: impl Into<String>) -> Self {
        CalcError::UnknownCodeLookup {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Create a TableError
    pub fn table_error(reason: impl Into<String>) -> Self {
        CalcError::TableError {
            reason: reason.into(),
        }
    }

    /// Create a RecordNotFound error
    pub fn record_not_found(kind: impl Into<String>, id: impl ToString) -> Self {
        CalcError::RecordNotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(
        path: impl Into<String>,
        locked_by: impl Into<String>,
        locked_at: impl Into<String>,
    ) -> Self {
        CalcError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError from any displayable cause
    pub fn serialization(reason: impl std::fmt::Display) -> Self {
        CalcError::SerializationError {
            reason: reason.to_string(),
        }
    }

    /// Only a held lock can clear up on its own; input errors need a human.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::FileLocked { .. })
    }

    /// True for errors raised by the calculators themselves
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CalcError::InvalidInput { .. }
                | CalcError::UnknownGauge { .. }
                | CalcError::UnknownCodeLookup { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::UnknownGauge { .. } => "UNKNOWN_GAUGE",
            CalcError::UnknownCodeLookup { .. } => "UNKNOWN_CODE_LOOKUP",
            CalcError::TableError { .. } => "TABLE_ERROR",
            CalcError::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::FileLocked { .. } => "FILE_LOCKED",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}
