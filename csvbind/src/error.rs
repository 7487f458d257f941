//! Error types for the csvbind mapping engine.
//!
//! This module defines one error type per concern:
//!
//! - [`ConfigError`] - Invalid reader/writer configuration
//! - [`BindingError`] - Unusable column declarations on a record type
//! - [`CodecError`] - Text could not be converted to/from a typed value
//! - [`InstantiationError`] - A record could not be constructed
//! - [`MappingError`] - Top-level error returned by sessions
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;

use thiserror::Error;

use crate::models::{AddressMode, ColumnAddress, ValueType};

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid builder state, detected before any I/O happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Both a file and a stream were supplied.
    #[error("Decide to use a stream or a file, both at the same time are not supported")]
    ConflictingSources,

    /// Neither a file nor a stream was supplied.
    #[error("No file or stream supplied")]
    NoSource,

    /// The file to read does not exist.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The delimiter cannot be used as a split pattern.
    #[error("Invalid delimiter '{delimiter}': {reason}")]
    InvalidDelimiter { delimiter: String, reason: String },

    /// No encoding is known under this label.
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// An option value from the environment cannot be parsed.
    #[error("Invalid value '{value}' for option {key}")]
    InvalidOption { key: String, value: String },

    /// An options file is not valid JSON for [`crate::config::MapperOptions`].
    #[error("Invalid options file: {0}")]
    OptionsFile(#[from] serde_json::Error),

    /// A field is bound with the other addressing kind than the session uses.
    #[error("Field '{field}' of {record} is not addressable in {mode} mode")]
    MixedAddressing {
        record: &'static str,
        field: String,
        mode: AddressMode,
    },
}

// =============================================================================
// Binding Errors
// =============================================================================

/// A column declaration on a record type is unusable.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The declaration of a single field is invalid.
    #[error("Column binding for field '{field}' of {record} is not valid: {reason}")]
    InvalidBinding {
        record: &'static str,
        field: String,
        reason: String,
    },

    /// Two fields resolve to the same column.
    #[error("Fields '{first}' and '{second}' of {record} are both bound to column {address}")]
    DuplicateAddress {
        record: &'static str,
        address: ColumnAddress,
        first: String,
        second: String,
    },
}

// =============================================================================
// Codec Errors
// =============================================================================

/// Underlying cause of a failed text <-> value conversion.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid integer: {0}")]
    Integer(#[from] ParseIntError),

    #[error("invalid floating-point number: {0}")]
    Float(#[from] ParseFloatError),

    #[error("invalid boolean '{0}', expected 'true' or 'false'")]
    Boolean(String),

    /// Date and date-time values cannot be converted without a pattern.
    #[error("a format pattern is required for {0} values")]
    PatternRequired(ValueType),

    #[error("invalid format pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid date/time: {0}")]
    DateTime(#[from] chrono::ParseError),

    /// The pattern asks for fields a value of this type does not carry.
    #[error("format pattern '{pattern}' cannot format {target} values")]
    Unformattable { pattern: String, target: ValueType },

    #[error("value {value} does not fit into {target}")]
    OutOfRange { value: i128, target: &'static str },

    /// The opaque catch-all could not turn the text into the declared type.
    #[error("cannot convert text to {target}: {message}")]
    Cast {
        target: &'static str,
        message: String,
    },

    #[error("expected a {expected} value, got {found}")]
    TypeMismatch {
        expected: ValueType,
        found: &'static str,
    },
}

// =============================================================================
// Instantiation Errors
// =============================================================================

/// A record type could not be constructed for a row.
#[derive(Debug, Error)]
#[error("Cannot instantiate {record}: {message}")]
pub struct InstantiationError {
    pub record: &'static str,
    pub message: String,
}

impl InstantiationError {
    pub fn new(record: &'static str, message: impl Into<String>) -> Self {
        Self {
            record,
            message: message.into(),
        }
    }
}

// =============================================================================
// Mapping Errors (top-level)
// =============================================================================

/// Top-level error returned by reader and writer sessions.
///
/// Single-row operations propagate every variant unmodified. The lazy
/// [`crate::io::Records`] sequence drops rows failing with
/// [`MappingError::Conversion`] or [`MappingError::Instantiation`] instead.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invalid binding: {0}")]
    Binding(#[from] BindingError),

    /// A cell could not be converted to or from its field's type.
    #[error("Error converting value '{raw}' for field '{field}': {cause}")]
    Conversion {
        field: String,
        raw: String,
        #[source]
        cause: CodecError,
    },

    #[error("Instantiation error: {0}")]
    Instantiation(#[from] InstantiationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MappingError {
    /// Whether the lazy read downgrades this error to a dropped row.
    pub fn is_row_local(&self) -> bool {
        matches!(self, Self::Conversion { .. } | Self::Instantiation(_))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for session operations.
pub type MappingResult<T> = Result<T, MappingError>;

/// Result type for value conversions.
pub type CodecResult<T> = Result<T, CodecError>;

/// Result type for metadata extraction.
pub type BindingResult<T> = Result<T, BindingError>;
