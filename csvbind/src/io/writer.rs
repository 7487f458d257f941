//! Write sessions.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::cache::MetadataRegistry;
use crate::codec::ValueCodec;
use crate::config::MapperOptions;
use crate::error::{ConfigError, MappingResult};
use crate::io::{closed_error, SessionState};
use crate::logs::log_info;
use crate::mapper::{HeaderTracker, RowMapper};
use crate::meta::Record;
use crate::models::AddressMode;
use crate::parser::{Delimiter, LineSink};

type Sink<'a> = LineSink<Box<dyn Write + 'a>>;

/// Where a writer sends its lines. Files are checked for emptiness before
/// the header is emitted; streams count the lines already written.
enum Target {
    File(PathBuf),
    Stream,
}

/// Output chosen on the builder, opened once every other check passed.
enum Pending<'a> {
    File(PathBuf),
    Stream(Box<dyn Write + 'a>),
}

// =============================================================================
// Builder
// =============================================================================

/// Configures and opens a [`CsvWriter`].
pub struct WriterBuilder<'a, R> {
    file: Option<PathBuf>,
    stream: Option<Box<dyn Write + 'a>>,
    options: MapperOptions,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: Record> WriterBuilder<'a, R> {
    pub fn new() -> Self {
        Self {
            file: None,
            stream: None,
            options: MapperOptions::default(),
            _record: PhantomData,
        }
    }

    /// Write to a file, created if missing.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Write to an open byte stream.
    pub fn stream(mut self, stream: impl Write + 'a) -> Self {
        self.stream = Some(Box::new(stream));
        self
    }

    /// Emit a header line and address columns by name.
    pub fn has_heading(mut self, has_heading: bool) -> Self {
        self.options.has_heading = has_heading;
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.options.delimiter = delimiter.into();
        self
    }

    /// Append to an existing file (the default) or truncate it.
    pub fn append(mut self, append: bool) -> Self {
        self.options.append = append;
        self
    }

    pub fn no_append(self) -> Self {
        self.append(false)
    }

    /// Take delimiter, heading and append mode from `options`.
    pub fn options(mut self, options: &MapperOptions) -> Self {
        self.options.delimiter = options.delimiter.clone();
        self.options.has_heading = options.has_heading;
        self.options.append = options.append;
        self
    }

    pub fn build(self) -> MappingResult<CsvWriter<'a, R>> {
        self.build_with(MetadataRegistry::global())
    }

    pub fn build_with(self, registry: &MetadataRegistry) -> MappingResult<CsvWriter<'a, R>> {
        let target = match (self.file, self.stream) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingSources.into()),
            (Some(path), None) => Pending::File(path),
            (None, Some(stream)) => Pending::Stream(stream),
            (None, None) => return Err(ConfigError::NoSource.into()),
        };

        let delimiter = Delimiter::new(self.options.delimiter)?;
        let mode = AddressMode::from_heading(self.options.has_heading);
        let mapper = RowMapper::new(registry.metadata::<R>()?, ValueCodec::default(), mode)?;

        let (target, output): (Target, Box<dyn Write + 'a>) = match target {
            Pending::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(self.options.append)
                    .truncate(!self.options.append)
                    .open(&path)?;
                (Target::File(path), Box::new(file))
            }
            Pending::Stream(stream) => (Target::Stream, stream),
        };

        Ok(CsvWriter {
            sink: Some(LineSink::new(output)),
            target,
            mapper,
            delimiter,
            header: HeaderTracker::new(),
            state: SessionState::Uninitialized,
            rows_written: 0,
        })
    }
}

impl<'a, R: Record> Default for WriterBuilder<'a, R> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Writer
// =============================================================================

/// An open write session for records of type `R`.
///
/// Output is buffered; call [`CsvWriter::flush`] or [`CsvWriter::close`] to
/// make sure everything reached the target. Dropping the writer flushes on a
/// best-effort basis.
pub struct CsvWriter<'a, R> {
    sink: Option<Sink<'a>>,
    target: Target,
    mapper: RowMapper<R>,
    delimiter: Delimiter,
    header: HeaderTracker,
    state: SessionState,
    rows_written: usize,
}

impl<'a, R: Record> CsvWriter<'a, R> {
    pub fn builder() -> WriterBuilder<'a, R> {
        WriterBuilder::new()
    }

    /// Map and write one record. In named mode the first call decides
    /// whether a header line is emitted.
    pub fn write_record(&mut self, record: &R) -> MappingResult<()> {
        self.sink()?;
        if self.mapper.mode() == AddressMode::Named {
            self.resolve_header()?;
        }

        let cells = self.mapper.write_row(record, self.header.row())?;
        let line = self.delimiter.join(&cells);
        self.sink()?.write_line(&line)?;

        self.state = SessionState::Streaming;
        self.rows_written += 1;
        Ok(())
    }

    /// Write records in order. Stops at the first failing record.
    pub fn write_records<'r, I>(&mut self, records: I) -> MappingResult<usize>
    where
        I: IntoIterator<Item = &'r R>,
        R: 'r,
    {
        let mut count = 0;
        for record in records {
            self.write_record(record)?;
            count += 1;
        }
        Ok(count)
    }

    /// Emit the header without data, following the same rule as the first
    /// [`CsvWriter::write_record`]. No-op in positional mode.
    pub fn write_header(&mut self) -> MappingResult<()> {
        self.sink()?;
        if self.mapper.mode() == AddressMode::Named {
            self.resolve_header()?;
        }
        Ok(())
    }

    /// Fix the header order and emit it if the target is still empty.
    fn resolve_header(&mut self) -> MappingResult<()> {
        if self.header.is_resolved() {
            return Ok(());
        }

        let emit = match &self.target {
            Target::File(path) => fs::metadata(path)?.len() == 0,
            Target::Stream => self.sink.as_ref().map_or(0, LineSink::lines_written) == 0,
        };

        let line = self.delimiter.join(self.header.synthesize(self.mapper.metadata()).names());
        let record = self.mapper.metadata().record_name();

        if emit {
            let sink = self.sink()?;
            sink.write_bom()?;
            sink.write_line(&line)?;
            sink.flush()?;
            log_info(format!("Header emitted for {}", record));
        } else {
            log_info(format!("Header for {} skipped, target is not empty", record));
        }

        self.state = SessionState::HeaderResolved;
        Ok(())
    }

    pub fn flush(&mut self) -> MappingResult<()> {
        self.sink()?.flush()?;
        Ok(())
    }

    /// Flush and release the target. Closing twice is a no-op.
    pub fn close(&mut self) -> MappingResult<()> {
        if let Some(mut sink) = self.sink.take() {
            self.state = SessionState::Closed;
            sink.flush()?;
            log_info(format!(
                "Closed writer for {} after {} row(s)",
                self.mapper.metadata().record_name(),
                self.rows_written
            ));
        }
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> AddressMode {
        self.mapper.mode()
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    fn sink(&mut self) -> MappingResult<&mut Sink<'a>> {
        self.sink
            .as_mut()
            .ok_or_else(|| closed_error("write").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MappingError;
    use crate::io::CsvReader;
    use crate::parser::{separator, LINE_SEPARATOR};
    use crate::CsvRecord;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[derive(Debug, Default, Clone, PartialEq, CsvRecord)]
    struct WithHeadings {
        #[csv(header = "someNumberCol")]
        some_number: Option<i32>,
        #[csv(header = "someTextCol")]
        some_text: Option<String>,
        #[csv(header = "localDateCol", format = "yyyy-MM-dd")]
        local_date: Option<NaiveDate>,
    }

    #[derive(Debug, Default, Clone, PartialEq, CsvRecord)]
    struct WithNumericIndex {
        #[csv(index = 0)]
        some_string_col: Option<String>,
        #[csv(index = 2)]
        some_int_col: Option<i32>,
    }

    fn headed(n: i32) -> WithHeadings {
        WithHeadings {
            some_number: Some(n),
            some_text: Some(format!("line{}", n)),
            local_date: NaiveDate::from_ymd_opt(2017, 6, n as u32),
        }
    }

    fn lines(text: &[&str]) -> String {
        text.iter().map(|l| format!("{}{}", l, LINE_SEPARATOR)).collect()
    }

    #[test]
    fn test_write_positional_to_stream() {
        let mut out = Vec::new();
        {
            let mut writer = CsvWriter::<WithNumericIndex>::builder()
                .stream(&mut out)
                .build()
                .unwrap();
            let records = vec![
                WithNumericIndex {
                    some_string_col: Some("This is line 1".into()),
                    some_int_col: Some(1),
                },
                WithNumericIndex {
                    some_string_col: None,
                    some_int_col: Some(2),
                },
            ];
            assert_eq!(writer.write_records(&records).unwrap(), 2);
            writer.close().unwrap();
        }

        assert_eq!(
            String::from_utf8(out).unwrap(),
            lines(&["This is line 1;;1", ";;2"])
        );
    }

    #[test]
    fn test_named_stream_emits_header_once() {
        let mut out = Vec::new();
        {
            let mut writer = CsvWriter::<WithHeadings>::builder()
                .stream(&mut out)
                .has_heading(true)
                .delimiter(separator::COMMA)
                .build()
                .unwrap();
            writer.write_record(&headed(1)).unwrap();
            writer.write_record(&headed(2)).unwrap();
            writer.close().unwrap();
        }

        let expected = format!(
            "\u{feff}{}",
            lines(&[
                "someNumberCol,someTextCol,localDateCol",
                "1,line1,2017-06-01",
                "2,line2,2017-06-02",
            ])
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_append_to_non_empty_file_skips_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut writer = CsvWriter::<WithHeadings>::builder()
            .file(&path)
            .has_heading(true)
            .build()
            .unwrap();
        writer.write_record(&headed(1)).unwrap();
        writer.close().unwrap();

        let mut writer = CsvWriter::<WithHeadings>::builder()
            .file(&path)
            .has_heading(true)
            .build()
            .unwrap();
        writer.write_record(&headed(2)).unwrap();
        writer.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("someNumberCol").count(), 1);
        assert_eq!(content.matches('\u{feff}').count(), 1);

        let records: Vec<_> = CsvReader::<WithHeadings>::builder()
            .file(&path)
            .has_heading(true)
            .build()
            .unwrap()
            .records()
            .collect();
        assert_eq!(records, vec![headed(1), headed(2)]);
    }

    #[test]
    fn test_no_append_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale;data\n").unwrap();

        let mut writer = CsvWriter::<WithHeadings>::builder()
            .file(&path)
            .has_heading(true)
            .no_append()
            .build()
            .unwrap();
        writer.write_record(&headed(3)).unwrap();
        writer.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("\u{feff}someNumberCol;someTextCol;localDateCol"));
        assert!(!content.contains("stale"));
    }

    #[test]
    fn test_write_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("header.csv");

        let mut writer = CsvWriter::<WithHeadings>::builder()
            .file(&path)
            .has_heading(true)
            .build()
            .unwrap();
        writer.write_header().unwrap();
        writer.write_header().unwrap();
        assert_eq!(writer.state(), SessionState::HeaderResolved);
        writer.close().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("\u{feff}{}", lines(&["someNumberCol;someTextCol;localDateCol"]))
        );
    }

    #[test]
    fn test_positional_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let records: Vec<_> = (1..=5)
            .map(|i| WithNumericIndex {
                some_string_col: Some(format!("row {}", i)),
                some_int_col: Some(i * 10),
            })
            .collect();

        let mut writer = CsvWriter::<WithNumericIndex>::builder()
            .file(&path)
            .build()
            .unwrap();
        writer.write_records(&records).unwrap();
        writer.close().unwrap();

        let read: Vec<_> = CsvReader::<WithNumericIndex>::builder()
            .file(&path)
            .build()
            .unwrap()
            .records()
            .collect();
        assert_eq!(read, records);
    }

    #[test]
    fn test_invalid_setup_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never.csv");

        let mixed = CsvWriter::<WithHeadings>::builder().file(&path).build();
        assert!(matches!(
            mixed,
            Err(MappingError::Configuration(ConfigError::MixedAddressing { .. }))
        ));

        let bad_delimiter = CsvWriter::<WithNumericIndex>::builder()
            .file(&path)
            .delimiter("(")
            .build();
        assert!(matches!(
            bad_delimiter,
            Err(MappingError::Configuration(ConfigError::InvalidDelimiter { .. }))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_builder_errors_and_closed_writer() {
        let dir = tempdir().unwrap();
        let mut out = Vec::new();
        let both = CsvWriter::<WithHeadings>::builder()
            .file(dir.path().join("x.csv"))
            .stream(&mut out)
            .build();
        assert!(matches!(
            both,
            Err(MappingError::Configuration(ConfigError::ConflictingSources))
        ));
        assert!(!dir.path().join("x.csv").exists());

        let none = CsvWriter::<WithHeadings>::builder().build();
        assert!(matches!(
            none,
            Err(MappingError::Configuration(ConfigError::NoSource))
        ));

        let mut sink = Vec::new();
        let mut writer = CsvWriter::<WithNumericIndex>::builder()
            .stream(&mut sink)
            .build()
            .unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert_eq!(writer.state(), SessionState::Closed);
        assert!(matches!(
            writer.write_record(&WithNumericIndex::default()),
            Err(MappingError::Io(_))
        ));
    }
}
