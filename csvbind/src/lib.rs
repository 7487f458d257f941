//! # csvbind - Declarative mapping between delimited text rows and Rust records
//!
//! Column bindings are declared once on the record type; readers and writers
//! use them to turn each line into a record and back.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV lines  │────▶│   Parser    │────▶│  RowMapper  │────▶│   Record    │
//! │ (any enc.)  │◀────│ (split/join)│◀────│ (+ codec)   │◀────│  (derive)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                ▲
//!                                   RecordMetadata (registry)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chrono::NaiveDate;
//! use csvbind::{CsvReader, CsvRecord};
//!
//! #[derive(Debug, Default, CsvRecord)]
//! struct Release {
//!     #[csv(header = "title")]
//!     title: Option<String>,
//!     #[csv(header = "released", format = "yyyy-MM-dd")]
//!     released: Option<NaiveDate>,
//! }
//!
//! let reader = CsvReader::<Release>::builder()
//!     .file("releases.csv")
//!     .has_heading(true)
//!     .build()?;
//!
//! let mut records = reader.records();
//! for release in records.by_ref() {
//!     println!("{:?}", release);
//! }
//! println!("{} row(s) dropped", records.dropped());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Value model and column addressing
//! - [`meta`] - Record declarations and validated bindings
//! - [`cache`] - Metadata registry
//! - [`codec`] - Text <-> value conversion and format patterns
//! - [`parser`] - Delimiter split/join and line plumbing
//! - [`mapper`] - Row <-> record mapping and header rows
//! - [`io`] - Reader and writer sessions
//! - [`config`] - Session options
//! - [`logs`] - Session log broadcasting

// Generated code refers to `::csvbind`, also inside this crate
extern crate self as csvbind;

// Core modules
pub mod error;
pub mod models;

// Metadata
pub mod cache;
pub mod meta;

// Conversion
pub mod codec;

// Line plumbing
pub mod parser;

// Mapping and sessions
pub mod io;
pub mod mapper;

// Options and logs
pub mod config;
pub mod logs;

// =============================================================================
// Re-exports - Derive
// =============================================================================

pub use csvbind_derive::CsvRecord;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    BindingError, BindingResult, CodecError, CodecResult, ConfigError, InstantiationError,
    MappingError, MappingResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{AddressMode, ColumnAddress, FieldValue, Value, ValueType};

// =============================================================================
// Re-exports - Metadata
// =============================================================================

pub use cache::MetadataRegistry;
pub use meta::{ColumnDecl, FieldBinding, FieldDescriptor, Record, RecordMetadata, UNSET_INDEX};

// =============================================================================
// Re-exports - Codec
// =============================================================================

pub use codec::{DatePattern, FormatCache, ValueCodec};

// =============================================================================
// Re-exports - Sessions
// =============================================================================

pub use io::{CsvReader, CsvWriter, ReaderBuilder, Records, SessionState, WriterBuilder};
pub use mapper::{HeaderRow, HeaderTracker, RowMapper};
pub use parser::{separator, Delimiter};

// =============================================================================
// Re-exports - Options and logs
// =============================================================================

pub use config::MapperOptions;
pub use logs::{
    log_error, log_info, log_info_indent, log_success, log_warning, set_echo, subscribe, LogEntry,
    LogLevel,
};
