//! Row <-> record mapping.
//!
//! [`RowMapper`] places split cells into a fresh record (read) and turns a
//! record into cells (write). The addressing mode is fixed at construction;
//! named mode additionally needs the session's [`HeaderRow`].

pub mod header;

use std::io;
use std::sync::Arc;

use crate::codec::ValueCodec;
use crate::error::{CodecError, ConfigError, MappingError, MappingResult};
use crate::meta::{FieldBinding, Record, RecordMetadata};
use crate::models::{AddressMode, Value};

pub use header::{HeaderRow, HeaderTracker};

/// Maps split rows to records of type `R` and back.
pub struct RowMapper<R> {
    metadata: Arc<RecordMetadata<R>>,
    codec: ValueCodec,
    mode: AddressMode,
}

impl<R: Record> RowMapper<R> {
    /// Fails when a binding of `R` uses the other addressing kind.
    pub fn new(
        metadata: Arc<RecordMetadata<R>>,
        codec: ValueCodec,
        mode: AddressMode,
    ) -> Result<Self, ConfigError> {
        metadata.check_mode(mode)?;
        Ok(Self {
            metadata,
            codec,
            mode,
        })
    }

    pub fn mode(&self) -> AddressMode {
        self.mode
    }

    pub fn metadata(&self) -> &RecordMetadata<R> {
        &self.metadata
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Build a record from one row's cells.
    ///
    /// Cells without a binding are ignored. In named mode a row shorter than
    /// the header leaves the missing columns absent, and a header name given
    /// twice reads from its first column.
    pub fn read_row(&self, cells: &[&str], header: Option<&HeaderRow>) -> MappingResult<R> {
        let mut record = R::instantiate()?;

        match self.mode {
            AddressMode::Positional => {
                for (index, cell) in cells.iter().copied().enumerate() {
                    if let Some(binding) = self.metadata.binding_at(index) {
                        self.assign(binding, &mut record, Some(cell))?;
                    }
                }
            }
            AddressMode::Named => {
                let header = require_header(header)?;
                for (position, name) in header.entries() {
                    // a repeated header name maps to its first column only
                    if header.position(name) != Some(position) {
                        continue;
                    }
                    if let Some(binding) = self.metadata.binding_named(name) {
                        self.assign(binding, &mut record, cells.get(position).copied())?;
                    }
                }
            }
        }

        Ok(record)
    }

    fn assign(
        &self,
        binding: &FieldBinding<R>,
        record: &mut R,
        raw: Option<&str>,
    ) -> MappingResult<()> {
        let conversion = |cause: CodecError| MappingError::Conversion {
            field: binding.name().to_string(),
            raw: raw.unwrap_or_default().to_string(),
            cause,
        };

        let pattern = self.pattern_for(binding)?;
        let value = self
            .codec
            .decode(raw, binding.value_type(), pattern)
            .map_err(conversion)?;
        binding.set(record, value).map_err(conversion)
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Turn a record into cells.
    ///
    /// Positional rows span up to the largest bound index; unbound positions
    /// stay empty. Named rows follow the header's column order.
    pub fn write_row(&self, record: &R, header: Option<&HeaderRow>) -> MappingResult<Vec<String>> {
        let bindings = self.metadata.bindings();

        let mut cells = match self.mode {
            AddressMode::Positional => {
                vec![String::new(); self.metadata.max_index().map_or(0, |max| max + 1)]
            }
            AddressMode::Named => vec![String::new(); require_header(header)?.len()],
        };

        for binding in bindings {
            let slot = match self.mode {
                AddressMode::Positional => binding.address().index(),
                AddressMode::Named => binding
                    .address()
                    .header()
                    .and_then(|name| header.and_then(|row| row.position(name))),
            };

            if let Some(slot) = slot {
                cells[slot] = self.encode(binding, record)?;
            }
        }

        Ok(cells)
    }

    fn encode(&self, binding: &FieldBinding<R>, record: &R) -> MappingResult<String> {
        let value: Value = binding.get(record);
        let pattern = self.pattern_for(binding)?;

        self.codec
            .encode(&value, binding.value_type(), pattern)
            .map_err(|cause| MappingError::Conversion {
                field: binding.name().to_string(),
                raw: value.to_string(),
                cause,
            })
    }

    /// Declared pattern of date-typed bindings, `None` for the others.
    fn pattern_for(&self, binding: &FieldBinding<R>) -> MappingResult<Option<&str>> {
        if binding.value_type().requires_format() {
            Ok(Some(self.metadata.format_for_field(binding.name())?))
        } else {
            Ok(None)
        }
    }
}

fn require_header(header: Option<&HeaderRow>) -> MappingResult<&HeaderRow> {
    header.ok_or_else(|| {
        MappingError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "no header row resolved for named mode",
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BindingError, InstantiationError};
    use crate::meta::{ColumnDecl, FieldDescriptor};
    use crate::CsvRecord;
    use chrono::{NaiveDate, NaiveDateTime};

    #[derive(Debug, Default, PartialEq, CsvRecord)]
    struct WithNumericIndex {
        #[csv(index = 0)]
        some_string_col: Option<String>,
        #[csv(index = 1)]
        some_int_col: Option<i32>,
        #[csv(index = 3, format = "yyyy-MM-dd")]
        some_date_col: Option<NaiveDate>,
    }

    #[derive(Debug, Default, PartialEq, CsvRecord)]
    struct WithHeadings {
        #[csv(header = "someNumberCol")]
        some_number: Option<i32>,
        #[csv(header = "someTextCol")]
        some_text: Option<String>,
        #[csv(header = "someBooleanCol")]
        some_boolean: Option<bool>,
        #[csv(header = "someDoubleCol")]
        some_double: Option<f64>,
        #[csv(header = "someFloatCol")]
        some_float: Option<f32>,
        #[csv(header = "localDateCol", format = "yyyy-MM-dd")]
        local_date: Option<NaiveDate>,
        #[csv(header = "localDateTimeCol", format = "yyyy-MM-dd HH:mm:ss")]
        local_date_time: Option<NaiveDateTime>,
    }

    #[derive(Debug)]
    struct NoDefault {
        id: i32,
    }

    #[derive(Debug, Default, CsvRecord)]
    struct DayWithClock {
        #[csv(index = 0, format = "yyyy-MM-dd HH:mm")]
        day: Option<NaiveDate>,
    }

    #[derive(Debug, Default, CsvRecord)]
    struct StampWithOffset {
        #[csv(index = 0, format = "%Y-%m-%d %H:%M %z")]
        stamp: Option<NaiveDateTime>,
    }

    impl Record for NoDefault {
        fn declared_fields() -> Vec<FieldDescriptor<Self>> {
            vec![FieldDescriptor::<Self>::new(
                "id",
                ColumnDecl::at(0),
                |r| &r.id,
                |r| &mut r.id,
            )]
        }

        fn instantiate() -> Result<Self, InstantiationError> {
            Err(InstantiationError::new("NoDefault", "no default constructor"))
        }
    }

    fn mapper<R: Record>(mode: AddressMode) -> RowMapper<R> {
        let metadata = Arc::new(RecordMetadata::<R>::extract().unwrap());
        RowMapper::new(metadata, ValueCodec::default(), mode).unwrap()
    }

    fn headings() -> HeaderRow {
        HeaderRow::from_cells(&[
            "someNumberCol",
            "someTextCol",
            "someBooleanCol",
            "someDoubleCol",
            "someFloatCol",
            "localDateCol",
            "localDateTimeCol",
        ])
    }

    #[test]
    fn test_read_positional() {
        let mapper = mapper::<WithNumericIndex>(AddressMode::Positional);
        let record = mapper
            .read_row(&["Line1", "1", "ignored", "2017-06-07", "extra"], None)
            .unwrap();

        assert_eq!(record.some_string_col.as_deref(), Some("Line1"));
        assert_eq!(record.some_int_col, Some(1));
        assert_eq!(record.some_date_col, NaiveDate::from_ymd_opt(2017, 6, 7));
    }

    #[test]
    fn test_read_positional_short_row() {
        let mapper = mapper::<WithNumericIndex>(AddressMode::Positional);
        let record = mapper.read_row(&["only"], None).unwrap();
        assert_eq!(record.some_string_col.as_deref(), Some("only"));
        assert_eq!(record.some_int_col, None);
    }

    #[test]
    fn test_read_named() {
        let mapper = mapper::<WithHeadings>(AddressMode::Named);
        let header = headings();
        let cells = [
            "1",
            "Thöis is line1",
            "false",
            "45.0",
            "120.122",
            "2017-06-07",
            "2018-10-02 15:30:12",
        ];
        let record = mapper.read_row(&cells, Some(&header)).unwrap();

        assert_eq!(record.some_number, Some(1));
        assert_eq!(record.some_text.as_deref(), Some("Thöis is line1"));
        assert_eq!(record.some_boolean, Some(false));
        assert_eq!(record.some_double, Some(45.0));
        assert_eq!(record.some_float, Some(120.122));
        assert_eq!(record.local_date, NaiveDate::from_ymd_opt(2017, 6, 7));
        assert_eq!(
            record.local_date_time,
            NaiveDate::from_ymd_opt(2018, 10, 2).and_then(|d| d.and_hms_opt(15, 30, 12))
        );
    }

    #[test]
    fn test_read_named_short_row_and_unknown_columns() {
        let mapper = mapper::<WithHeadings>(AddressMode::Named);
        let header = HeaderRow::from_cells(&["unknownCol", "someNumberCol", "someTextCol"]);
        let record = mapper.read_row(&["x", "7"], Some(&header)).unwrap();

        assert_eq!(record.some_number, Some(7));
        assert_eq!(record.some_text, None);
        assert_eq!(record.some_boolean, None);
    }

    #[test]
    fn test_read_named_duplicate_header_uses_first_column() {
        let mapper = mapper::<WithHeadings>(AddressMode::Named);
        let header = HeaderRow::from_cells(&["someNumberCol", "someTextCol", "someNumberCol"]);
        let record = mapper.read_row(&["1", "first", "2"], Some(&header)).unwrap();

        assert_eq!(record.some_number, Some(1));
        assert_eq!(record.some_text.as_deref(), Some("first"));
    }

    #[test]
    fn test_pattern_unable_to_format_field_is_rejected() {
        let err = RecordMetadata::<DayWithClock>::extract().unwrap_err();
        assert!(matches!(err, BindingError::InvalidBinding { ref field, .. } if field == "day"));
        assert!(err.to_string().contains("cannot format date values"));

        let err = RecordMetadata::<StampWithOffset>::extract().unwrap_err();
        assert!(err.to_string().contains("cannot format date-time values"));
    }

    #[test]
    fn test_named_mode_needs_header() {
        let mapper = mapper::<WithHeadings>(AddressMode::Named);
        assert!(matches!(mapper.read_row(&["1"], None), Err(MappingError::Io(_))));
    }

    #[test]
    fn test_conversion_error_names_field_and_raw() {
        let mapper = mapper::<WithNumericIndex>(AddressMode::Positional);
        let err = mapper.read_row(&["Line1", "one"], None).unwrap_err();

        match &err {
            MappingError::Conversion { field, raw, cause } => {
                assert_eq!(field, "some_int_col");
                assert_eq!(raw, "one");
                assert!(matches!(cause, CodecError::Integer(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("'one'"));
    }

    #[test]
    fn test_instantiation_error_is_surfaced() {
        let mapper = mapper::<NoDefault>(AddressMode::Positional);
        let err = mapper.read_row(&["1"], None).unwrap_err();
        assert!(matches!(err, MappingError::Instantiation(_)));
    }

    #[test]
    fn test_mixed_addressing_rejected() {
        let metadata = Arc::new(RecordMetadata::<WithHeadings>::extract().unwrap());
        let result = RowMapper::new(metadata, ValueCodec::default(), AddressMode::Positional);
        assert!(matches!(result, Err(ConfigError::MixedAddressing { .. })));
    }

    #[test]
    fn test_write_positional_fills_gaps() {
        let mapper = mapper::<WithNumericIndex>(AddressMode::Positional);
        let record = WithNumericIndex {
            some_string_col: Some("Line1".into()),
            some_int_col: None,
            some_date_col: NaiveDate::from_ymd_opt(2017, 6, 7),
        };

        let cells = mapper.write_row(&record, None).unwrap();
        assert_eq!(cells, vec!["Line1", "", "", "2017-06-07"]);
    }

    #[test]
    fn test_write_named_follows_header() {
        let mapper = mapper::<WithHeadings>(AddressMode::Named);
        let header = HeaderRow::synthesize(mapper.metadata());
        let record = WithHeadings {
            some_number: Some(2),
            some_text: Some("line2".into()),
            some_boolean: Some(true),
            some_double: Some(45.0),
            some_float: Some(1.5),
            local_date: NaiveDate::from_ymd_opt(2017, 6, 7),
            local_date_time: None,
        };

        let cells = mapper.write_row(&record, Some(&header)).unwrap();
        assert_eq!(
            cells,
            vec!["2", "line2", "true", "45.0", "1.5", "2017-06-07", ""]
        );
    }

    #[test]
    fn test_write_then_read_positional() {
        let mapper = mapper::<WithNumericIndex>(AddressMode::Positional);
        let record = WithNumericIndex {
            some_string_col: Some("abc".into()),
            some_int_col: Some(-12),
            some_date_col: NaiveDate::from_ymd_opt(1999, 12, 31),
        };

        let cells = mapper.write_row(&record, None).unwrap();
        let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
        assert_eq!(mapper.read_row(&cells, None).unwrap(), record);
    }
}
