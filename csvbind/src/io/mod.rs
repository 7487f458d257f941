//! Read and write sessions over files or streams.
//!
//! ```text
//! ReaderBuilder ─build()─▶ CsvReader ─read_record()─▶ Option<R>
//!                              └─records()─▶ Records (lazy, drops bad rows)
//!
//! WriterBuilder ─build()─▶ CsvWriter ─write_record(&R)─▶ line
//! ```
//!
//! Builders validate everything they can before touching the file system:
//! source conflicts, delimiter, encoding, record metadata and addressing mode.

pub mod reader;
pub mod writer;

use std::fmt;
use std::io;

pub use reader::{CsvReader, ReaderBuilder, Records};
pub use writer::{CsvWriter, WriterBuilder};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Open, nothing exchanged yet.
    Uninitialized,
    /// Named mode: header line read (reader) or emitted/skipped (writer).
    HeaderResolved,
    /// At least one data row exchanged.
    Streaming,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::HeaderResolved => "header resolved",
            SessionState::Streaming => "streaming",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

fn closed_error(session: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::BrokenPipe,
        format!("{} session is closed", session),
    )
}
