//! Header rows for named-mode sessions.

use std::collections::HashMap;

use crate::meta::RecordMetadata;

/// Ordered column names of a session, observed on read or synthesized on
/// write. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRow {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl HeaderRow {
    /// Build from the cells of a header line.
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Self {
        let names: Vec<String> = cells.iter().map(|c| c.as_ref().to_string()).collect();
        let mut positions = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            positions.entry(name.clone()).or_insert(i);
        }
        Self { names, positions }
    }

    /// Header names of a record type, in declaration order.
    pub fn synthesize<R>(metadata: &RecordMetadata<R>) -> Self {
        Self::from_cells(&metadata.headers())
    }

    /// Position of the first column with this name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// `(position, name)` pairs in file order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(String::as_str).enumerate()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Holds a session's header row once it is known.
#[derive(Debug, Clone, Default)]
pub struct HeaderTracker {
    row: Option<HeaderRow>,
}

impl HeaderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the header line read from input. Later calls keep the first row.
    pub fn observe<S: AsRef<str>>(&mut self, cells: &[S]) -> &HeaderRow {
        self.row.get_or_insert_with(|| HeaderRow::from_cells(cells))
    }

    /// Build the output header from metadata. Later calls keep the first row.
    pub fn synthesize<R>(&mut self, metadata: &RecordMetadata<R>) -> &HeaderRow {
        self.row.get_or_insert_with(|| HeaderRow::synthesize(metadata))
    }

    pub fn row(&self) -> Option<&HeaderRow> {
        self.row.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.row.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CsvRecord;

    #[derive(Debug, Default, CsvRecord)]
    struct Song {
        #[csv(header = "title")]
        title: Option<String>,
        #[csv(header = "isrc")]
        isrc: Option<String>,
    }

    #[test]
    fn test_positions() {
        let row = HeaderRow::from_cells(&["a", "b", "a"]);
        assert_eq!(row.len(), 3);
        assert_eq!(row.position("a"), Some(0));
        assert_eq!(row.position("b"), Some(1));
        assert_eq!(row.position("c"), None);
        assert_eq!(row.entries().last(), Some((2, "a")));
    }

    #[test]
    fn test_synthesize_in_declaration_order() {
        let meta = RecordMetadata::<Song>::extract().unwrap();
        let row = HeaderRow::synthesize(&meta);
        assert_eq!(row.names(), &["title".to_string(), "isrc".to_string()]);
    }

    #[test]
    fn test_tracker_keeps_first_row() {
        let mut tracker = HeaderTracker::new();
        assert!(!tracker.is_resolved());

        tracker.observe(&["x", "y"]);
        tracker.observe(&["z"]);
        assert!(tracker.is_resolved());
        assert_eq!(tracker.row().unwrap().len(), 2);
    }
}
