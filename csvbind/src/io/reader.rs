//! Read sessions.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::cache::MetadataRegistry;
use crate::codec::ValueCodec;
use crate::config::MapperOptions;
use crate::error::{ConfigError, MappingResult};
use crate::io::{closed_error, SessionState};
use crate::logs::{log_error, log_info, log_warning_indent};
use crate::mapper::{HeaderTracker, RowMapper};
use crate::meta::Record;
use crate::models::AddressMode;
use crate::parser::{resolve_encoding, Delimiter, LineSource};

type Lines<'a> = LineSource<Box<dyn BufRead + 'a>>;

/// Input chosen on the builder, opened once every other check passed.
enum Source<'a> {
    File(PathBuf),
    Stream(Box<dyn Read + 'a>),
}

// =============================================================================
// Builder
// =============================================================================

/// Configures and opens a [`CsvReader`].
///
/// ```rust,ignore
/// let reader = CsvReader::<Person>::builder()
///     .file("people.csv")
///     .has_heading(true)
///     .delimiter(separator::COMMA)
///     .build()?;
/// ```
pub struct ReaderBuilder<'a, R> {
    file: Option<PathBuf>,
    stream: Option<Box<dyn Read + 'a>>,
    options: MapperOptions,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: Record> ReaderBuilder<'a, R> {
    pub fn new() -> Self {
        Self {
            file: None,
            stream: None,
            options: MapperOptions::default(),
            _record: PhantomData,
        }
    }

    /// Read from a file. Mutually exclusive with [`ReaderBuilder::stream`].
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Read from an open byte stream.
    pub fn stream(mut self, stream: impl Read + 'a) -> Self {
        self.stream = Some(Box::new(stream));
        self
    }

    /// First line holds the column names.
    pub fn has_heading(mut self, has_heading: bool) -> Self {
        self.options.has_heading = has_heading;
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.options.delimiter = delimiter.into();
        self
    }

    /// Input encoding label, UTF-8 by default.
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.options.encoding = label.into();
        self
    }

    /// Take delimiter, heading and encoding from `options`.
    pub fn options(mut self, options: &MapperOptions) -> Self {
        self.options.delimiter = options.delimiter.clone();
        self.options.has_heading = options.has_heading;
        self.options.encoding = options.encoding.clone();
        self
    }

    /// Open the session using the process-wide metadata registry.
    pub fn build(self) -> MappingResult<CsvReader<'a, R>> {
        self.build_with(MetadataRegistry::global())
    }

    /// Open the session using `registry` for record metadata.
    ///
    /// In named mode the header line is consumed here.
    pub fn build_with(self, registry: &MetadataRegistry) -> MappingResult<CsvReader<'a, R>> {
        let source = match (self.file, self.stream) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingSources.into()),
            (Some(path), None) if !path.exists() => {
                return Err(ConfigError::FileNotFound(path).into())
            }
            (Some(path), None) => Source::File(path),
            (None, Some(stream)) => Source::Stream(stream),
            (None, None) => return Err(ConfigError::NoSource.into()),
        };

        let delimiter = Delimiter::new(self.options.delimiter)?;
        let encoding = resolve_encoding(&self.options.encoding)?;
        let mode = AddressMode::from_heading(self.options.has_heading);
        let mapper = RowMapper::new(registry.metadata::<R>()?, ValueCodec::default(), mode)?;

        let input: Box<dyn Read + 'a> = match source {
            Source::File(path) => Box::new(File::open(&path)?),
            Source::Stream(stream) => stream,
        };

        let lines: Box<dyn BufRead + 'a> = Box::new(BufReader::new(input));
        let mut reader = CsvReader {
            source: Some(LineSource::new(lines, encoding)),
            mapper,
            delimiter,
            header: HeaderTracker::new(),
            state: SessionState::Uninitialized,
            rows_read: 0,
        };
        reader.open()?;
        Ok(reader)
    }
}

impl<'a, R: Record> Default for ReaderBuilder<'a, R> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Reader
// =============================================================================

/// An open read session yielding records of type `R`.
pub struct CsvReader<'a, R> {
    source: Option<Lines<'a>>,
    mapper: RowMapper<R>,
    delimiter: Delimiter,
    header: HeaderTracker,
    state: SessionState,
    rows_read: usize,
}

impl<'a, R: Record> CsvReader<'a, R> {
    pub fn builder() -> ReaderBuilder<'a, R> {
        ReaderBuilder::new()
    }

    fn open(&mut self) -> MappingResult<()> {
        if self.mapper.mode() != AddressMode::Named {
            return Ok(());
        }

        let source = self.source.as_mut().ok_or_else(|| closed_error("read"))?;
        let line = source.read_line()?.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input does not contain a header line",
            )
        })?;

        let row = self.header.observe(&self.delimiter.split(&line));
        log_info(format!(
            "Header resolved for {}: {} column(s)",
            self.mapper.metadata().record_name(),
            row.len()
        ));
        self.state = SessionState::HeaderResolved;
        Ok(())
    }

    /// Read and map the next data row. `Ok(None)` at end of input.
    ///
    /// Blank lines are skipped. Conversion and instantiation failures are
    /// returned to the caller.
    pub fn read_record(&mut self) -> MappingResult<Option<R>> {
        let source = self.source.as_mut().ok_or_else(|| closed_error("read"))?;

        loop {
            let Some(line) = source.read_line()? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }

            self.state = SessionState::Streaming;
            let cells = self.delimiter.split(&line);
            let record = self.mapper.read_row(&cells, self.header.row())?;
            self.rows_read += 1;
            return Ok(Some(record));
        }
    }

    /// Lazily map the remaining rows. See [`Records`].
    pub fn records(self) -> Records<'a, R> {
        Records {
            reader: self,
            dropped: 0,
            done: false,
        }
    }

    /// Column names of a named-mode session.
    pub fn headers(&self) -> Option<&[String]> {
        self.header.row().map(|row| row.names())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> AddressMode {
        self.mapper.mode()
    }

    /// Rows successfully mapped so far.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Physical lines consumed so far, header included.
    pub fn line_number(&self) -> usize {
        self.source.as_ref().map_or(0, LineSource::lines_read)
    }

    /// Release the input. Closing twice is a no-op.
    pub fn close(&mut self) -> MappingResult<()> {
        if self.source.take().is_some() {
            log_info(format!(
                "Closed reader for {} after {} row(s)",
                self.mapper.metadata().record_name(),
                self.rows_read
            ));
        }
        self.state = SessionState::Closed;
        Ok(())
    }
}

// =============================================================================
// Lazy Sequence
// =============================================================================

/// Forward-only lazy sequence over the remaining rows of a reader.
///
/// Rows failing conversion or instantiation produce no element: they are
/// logged as warnings and counted in [`Records::dropped`]. Any other error
/// is logged and ends the sequence.
pub struct Records<'a, R> {
    reader: CsvReader<'a, R>,
    dropped: usize,
    done: bool,
}

impl<'a, R: Record> Records<'a, R> {
    /// Rows discarded so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn reader(&self) -> &CsvReader<'a, R> {
        &self.reader
    }

    /// Stop the sequence and hand back the reader.
    pub fn into_reader(self) -> CsvReader<'a, R> {
        self.reader
    }
}

impl<'a, R: Record> Iterator for Records<'a, R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        if self.done {
            return None;
        }

        loop {
            match self.reader.read_record() {
                Ok(Some(record)) => return Some(record),
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) if e.is_row_local() => {
                    self.dropped += 1;
                    log_warning_indent(
                        format!("Line {}: row dropped: {}", self.reader.line_number(), e),
                        1,
                    );
                }
                Err(e) => {
                    log_error(format!(
                        "Reading stopped at line {}: {}",
                        self.reader.line_number(),
                        e
                    ));
                    self.done = true;
                    return None;
                }
            }
        }
    }
}
