//! Line plumbing: delimiter split/join, input decoding and BOM handling.
//!
//! No mapping logic here. [`LineSource`] yields decoded physical lines,
//! [`Delimiter`] turns them into cells, [`LineSink`] writes joined lines back.

use std::io::{self, BufRead, BufWriter, Write};

use encoding_rs::Encoding;
use regex::Regex;

use crate::error::ConfigError;

/// Byte-order marker written before a header line and stripped on read.
pub const BOM: char = '\u{feff}';

/// Line terminator used on write. Reading accepts `\n` and `\r\n`.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Common delimiters.
pub mod separator {
    pub const SEMICOLON: &str = ";";
    pub const COMMA: &str = ",";
    pub const TAB: &str = "\t";
    pub const SPACE: &str = " ";
}

// =============================================================================
// Delimiter
// =============================================================================

/// Cell delimiter: a pattern for splitting, the literal text for joining.
///
/// The delimiter string is used as a regular expression when splitting, so
/// values like `"|"` or `"."` need escaping by the caller.
#[derive(Debug, Clone)]
pub struct Delimiter {
    text: String,
    pattern: Regex,
}

impl Delimiter {
    pub fn new(text: impl Into<String>) -> Result<Self, ConfigError> {
        let text = text.into();
        let invalid = |reason: String| ConfigError::InvalidDelimiter {
            delimiter: text.clone(),
            reason,
        };

        if text.is_empty() {
            return Err(invalid("delimiter is empty".into()));
        }

        let pattern = Regex::new(&text).map_err(|e| invalid(e.to_string()))?;
        if pattern.is_match("") {
            return Err(invalid("pattern matches empty text".into()));
        }

        Ok(Self { text, pattern })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Split a line into cells. Trailing empty cells are dropped, so
    /// `"a;b;;"` yields `["a", "b"]`.
    pub fn split<'l>(&self, line: &'l str) -> Vec<&'l str> {
        let mut cells: Vec<&str> = self.pattern.split(line).collect();
        while cells.last().is_some_and(|cell| cell.is_empty()) {
            cells.pop();
        }
        cells
    }

    /// Join cells with the literal delimiter text.
    pub fn join<S: AsRef<str>>(&self, cells: &[S]) -> String {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                line.push_str(&self.text);
            }
            line.push_str(cell.as_ref());
        }
        line
    }
}

/// Resolve an encoding label (`utf-8`, `iso-8859-1`, `windows-1252`, ...).
///
/// Only ASCII-compatible encodings are accepted: lines are split on the
/// `\n` byte before decoding.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, ConfigError> {
    match Encoding::for_label(label.trim().as_bytes()) {
        Some(encoding) if encoding.is_ascii_compatible() => Ok(encoding),
        Some(encoding) => Err(ConfigError::UnknownEncoding(format!(
            "{} (not ASCII-compatible)",
            encoding.name()
        ))),
        None => Err(ConfigError::UnknownEncoding(label.to_string())),
    }
}

// =============================================================================
// Line Source
// =============================================================================

/// Reads physical lines, decoding them to UTF-8.
pub struct LineSource<B> {
    reader: B,
    encoding: &'static Encoding,
    buf: Vec<u8>,
    lines_read: usize,
}

impl<B: BufRead> LineSource<B> {
    pub fn new(reader: B, encoding: &'static Encoding) -> Self {
        Self {
            reader,
            encoding,
            buf: Vec::new(),
            lines_read: 0,
        }
    }

    /// Next line without its terminator, `None` at end of input.
    ///
    /// A leading BOM is stripped from the very first line only. Invalid byte
    /// sequences are replaced rather than reported.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        let (text, _) = self.encoding.decode_without_bom_handling(&self.buf);
        let mut line = text.into_owned();
        if self.lines_read == 0 && line.starts_with(BOM) {
            line.remove(0);
        }

        self.lines_read += 1;
        Ok(Some(line))
    }

    /// Number of physical lines read so far.
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }
}

// =============================================================================
// Line Sink
// =============================================================================

/// Buffered line writer. Output is always UTF-8.
pub struct LineSink<W: Write> {
    writer: BufWriter<W>,
    lines_written: usize,
}

impl<W: Write> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            lines_written: 0,
        }
    }

    pub fn write_bom(&mut self) -> io::Result<()> {
        let mut encoded = [0u8; 4];
        self.writer.write_all(BOM.encode_utf8(&mut encoded).as_bytes())
    }

    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(LINE_SEPARATOR.as_bytes())?;
        self.lines_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn semicolon() -> Delimiter {
        Delimiter::new(separator::SEMICOLON).unwrap()
    }

    fn source(bytes: &[u8]) -> LineSource<Cursor<Vec<u8>>> {
        LineSource::new(Cursor::new(bytes.to_vec()), encoding_rs::UTF_8)
    }

    #[test]
    fn test_split_semicolon() {
        let delimiter = semicolon();
        assert_eq!(delimiter.split("1;Alice;true"), vec!["1", "Alice", "true"]);
        assert_eq!(delimiter.split("1;;3"), vec!["1", "", "3"]);
    }

    #[test]
    fn test_trailing_empty_cells_dropped() {
        let delimiter = semicolon();
        assert_eq!(delimiter.split("a;b;;"), vec!["a", "b"]);
        assert!(delimiter.split("").is_empty());
        assert_eq!(delimiter.split(";a"), vec!["", "a"]);
    }

    #[test]
    fn test_pattern_delimiter() {
        let delimiter = Delimiter::new(r"\s*,\s*").unwrap();
        assert_eq!(delimiter.split("a , b,c"), vec!["a", "b", "c"]);
        assert_eq!(delimiter.join(&["a", "b"]), r"a\s*,\s*b");

        let tab = Delimiter::new(separator::TAB).unwrap();
        assert_eq!(tab.split("a\tb"), vec!["a", "b"]);
        assert_eq!(tab.join(&["a", "b"]), "a\tb");
    }

    #[test]
    fn test_invalid_delimiters() {
        assert!(matches!(
            Delimiter::new(""),
            Err(ConfigError::InvalidDelimiter { .. })
        ));
        assert!(Delimiter::new("(").is_err());
        assert!(Delimiter::new("|").is_err());
        assert!(Delimiter::new(r"\|").is_ok());
    }

    #[test]
    fn test_read_lines_crlf_and_bom() {
        let mut lines = source("\u{feff}a;b\r\n1;2\n\u{feff}3;4".as_bytes());
        assert_eq!(lines.read_line().unwrap().as_deref(), Some("a;b"));
        assert_eq!(lines.read_line().unwrap().as_deref(), Some("1;2"));
        assert_eq!(lines.read_line().unwrap().as_deref(), Some("\u{feff}3;4"));
        assert_eq!(lines.read_line().unwrap(), None);
        assert_eq!(lines.lines_read(), 3);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société;1" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9, 0x3B, 0x31, 0x0A];
        let encoding = resolve_encoding("iso-8859-1").unwrap();
        let mut lines = LineSource::new(Cursor::new(bytes.to_vec()), encoding);
        assert_eq!(lines.read_line().unwrap().as_deref(), Some("Société;1"));
    }

    #[test]
    fn test_resolve_encoding() {
        assert_eq!(resolve_encoding("UTF-8").unwrap(), encoding_rs::UTF_8);
        assert_eq!(resolve_encoding("cp1252").unwrap(), encoding_rs::WINDOWS_1252);
        assert!(matches!(
            resolve_encoding("klingon"),
            Err(ConfigError::UnknownEncoding(_))
        ));
        assert!(resolve_encoding("utf-16le").is_err());
    }

    #[test]
    fn test_sink_writes_lines() {
        let mut out = Vec::new();
        {
            let mut sink = LineSink::new(&mut out);
            sink.write_bom().unwrap();
            sink.write_line("a;b").unwrap();
            sink.write_line("1;2").unwrap();
            assert_eq!(sink.lines_written(), 2);
            sink.flush().unwrap();
        }
        let expected = format!("\u{feff}a;b{sep}1;2{sep}", sep = LINE_SEPARATOR);
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }
}
