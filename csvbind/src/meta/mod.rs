//! Column metadata of record types.
//!
//! A record type lists its fields as [`FieldDescriptor`]s, usually generated
//! by `#[derive(CsvRecord)]`. [`RecordMetadata::extract`] validates the
//! declarations and turns them into [`FieldBinding`]s:
//!
//! ```text
//! Record::declared_fields() ─┐
//!                            ├─▶ validate ─▶ FieldBinding (address, type, format, accessor)
//! Record::parent_fields()  ──┘
//! ```
//!
//! Extraction is pure. Results are shared through
//! [`crate::cache::MetadataRegistry`] so it runs once per record type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::codec::FormatCache;
use crate::error::{BindingError, BindingResult, CodecResult, ConfigError, InstantiationError};
use crate::models::{AddressMode, ColumnAddress, FieldValue, Value, ValueType};

/// Index value meaning "no index declared".
pub const UNSET_INDEX: i32 = -1;

// =============================================================================
// Record Declaration
// =============================================================================

/// A type whose instances map one-to-one to rows.
///
/// ```rust,ignore
/// #[derive(Debug, Default, CsvRecord)]
/// struct Track {
///     #[csv(index = 0)]
///     id: Option<u32>,
///     #[csv(index = 1)]
///     title: Option<String>,
///     #[csv(index = 2, format = "yyyy-MM-dd")]
///     released: Option<NaiveDate>,
/// }
/// ```
pub trait Record: Sized + 'static {
    /// Name used in error messages.
    fn record_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Fields declared directly on this type, in declaration order.
    fn declared_fields() -> Vec<FieldDescriptor<Self>>;

    /// Fields declared on the immediate parent, lifted onto this type.
    fn parent_fields() -> Vec<FieldDescriptor<Self>> {
        Vec::new()
    }

    /// Build a fresh instance for a row.
    fn instantiate() -> Result<Self, InstantiationError>;
}

/// Column declaration of a field, as written on the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDecl {
    /// Zero-based index, or [`UNSET_INDEX`].
    pub index: i32,
    /// Header name, empty when unset.
    pub header: String,
    /// Date/time pattern.
    pub format: Option<String>,
}

impl ColumnDecl {
    pub fn at(index: i32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn named(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

impl Default for ColumnDecl {
    fn default() -> Self {
        Self {
            index: UNSET_INDEX,
            header: String::new(),
            format: None,
        }
    }
}

type ReadFn<R> = Arc<dyn Fn(&R) -> Value + Send + Sync>;
type WriteFn<R> = Arc<dyn Fn(&mut R, Value) -> CodecResult<()> + Send + Sync>;

/// Typed get/set capability for one field.
pub struct Accessor<R> {
    read: ReadFn<R>,
    write: WriteFn<R>,
}

impl<R> Clone for Accessor<R> {
    fn clone(&self) -> Self {
        Self {
            read: Arc::clone(&self.read),
            write: Arc::clone(&self.write),
        }
    }
}

/// One declared field of a record type.
pub struct FieldDescriptor<R> {
    name: &'static str,
    value_type: ValueType,
    column: ColumnDecl,
    accessor: Accessor<R>,
}

impl<R: 'static> FieldDescriptor<R> {
    /// Describe a field through projection functions.
    pub fn new<T>(
        name: &'static str,
        column: ColumnDecl,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> Self
    where
        T: FieldValue + 'static,
    {
        let read: ReadFn<R> = Arc::new(move |record: &R| get(record).to_value());
        let write: WriteFn<R> = Arc::new(move |record: &mut R, value: Value| {
            if value.is_null() && !T::NULLABLE {
                return Ok(());
            }
            *get_mut(record) = T::from_value(value)?;
            Ok(())
        });

        Self {
            name,
            value_type: T::VALUE_TYPE,
            column,
            accessor: Accessor { read, write },
        }
    }

    /// Re-target a parent's field onto the child type embedding the parent.
    pub fn lift<C: 'static>(
        self,
        parent: fn(&C) -> &R,
        parent_mut: fn(&mut C) -> &mut R,
    ) -> FieldDescriptor<C> {
        let Accessor { read, write } = self.accessor;

        FieldDescriptor {
            name: self.name,
            value_type: self.value_type,
            column: self.column,
            accessor: Accessor {
                read: Arc::new(move |record: &C| read(parent(record))),
                write: Arc::new(move |record: &mut C, value: Value| write(parent_mut(record), value)),
            },
        }
    }
}

impl<R> FieldDescriptor<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn column(&self) -> &ColumnDecl {
        &self.column
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("column", &self.column)
            .finish()
    }
}

// =============================================================================
// Bindings
// =============================================================================

/// A validated field -> column binding.
pub struct FieldBinding<R> {
    name: &'static str,
    value_type: ValueType,
    address: ColumnAddress,
    format: Option<String>,
    accessor: Accessor<R>,
}

impl<R> FieldBinding<R> {
    fn from_descriptor(
        record: &'static str,
        descriptor: FieldDescriptor<R>,
        formats: &FormatCache,
    ) -> BindingResult<Self> {
        let FieldDescriptor {
            name,
            value_type,
            column,
            accessor,
        } = descriptor;
        let invalid = |reason: String| BindingError::InvalidBinding {
            record,
            field: name.to_string(),
            reason,
        };

        let address = if column.index != UNSET_INDEX {
            let index = usize::try_from(column.index)
                .map_err(|_| invalid("Index for column to map can't be negative".into()))?;
            ColumnAddress::Positional(index)
        } else if column.header.is_empty() {
            return Err(invalid(
                "Please specify a column index or a header name to map the field on".into(),
            ));
        } else {
            ColumnAddress::Named(column.header)
        };

        let format = column.format.filter(|f| !f.is_empty());
        if value_type.requires_format() {
            match &format {
                None => {
                    return Err(invalid(format!(
                        "Format for column must be set for {} fields",
                        value_type
                    )))
                }
                Some(pattern) => {
                    formats
                        .get(pattern)
                        .and_then(|compiled| compiled.check(value_type))
                        .map_err(|e| invalid(e.to_string()))?;
                }
            }
        }

        Ok(Self {
            name,
            value_type,
            address,
            format,
            accessor,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn address(&self) -> &ColumnAddress {
        &self.address
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Current value of the field.
    pub fn get(&self, record: &R) -> Value {
        (self.accessor.read)(record)
    }

    /// Assign a value to the field.
    pub fn set(&self, record: &mut R, value: Value) -> CodecResult<()> {
        (self.accessor.write)(record, value)
    }
}

impl<R> fmt::Debug for FieldBinding<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("address", &self.address)
            .field("format", &self.format)
            .finish()
    }
}

// =============================================================================
// Record Metadata
// =============================================================================

/// All column bindings of a record type, in declaration order.
pub struct RecordMetadata<R> {
    record: &'static str,
    bindings: Vec<FieldBinding<R>>,
    by_address: HashMap<ColumnAddress, usize>,
}

impl<R: Record> RecordMetadata<R> {
    /// Walk the record's declarations and its immediate parent's.
    pub fn extract() -> BindingResult<Self> {
        Self::extract_with(&FormatCache::global())
    }

    /// Like [`RecordMetadata::extract`], compiling patterns into `formats`.
    pub fn extract_with(formats: &FormatCache) -> BindingResult<Self> {
        let record = R::record_name();
        let mut bindings: Vec<FieldBinding<R>> = Vec::new();
        let mut by_address = HashMap::new();

        for descriptor in R::declared_fields().into_iter().chain(R::parent_fields()) {
            let binding = FieldBinding::from_descriptor(record, descriptor, formats)?;

            if let Some(&existing) = by_address.get(binding.address()) {
                let first: &FieldBinding<R> = &bindings[existing];
                return Err(BindingError::DuplicateAddress {
                    record,
                    address: binding.address.clone(),
                    first: first.name.to_string(),
                    second: binding.name.to_string(),
                });
            }

            by_address.insert(binding.address.clone(), bindings.len());
            bindings.push(binding);
        }

        Ok(Self {
            record,
            bindings,
            by_address,
        })
    }
}

impl<R> RecordMetadata<R> {
    pub fn record_name(&self) -> &'static str {
        self.record
    }

    pub fn bindings(&self) -> &[FieldBinding<R>] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The binding for a column, if any field is bound to it.
    pub fn binding_for(&self, address: &ColumnAddress) -> Option<&FieldBinding<R>> {
        self.by_address.get(address).map(|&i| &self.bindings[i])
    }

    pub fn binding_at(&self, index: usize) -> Option<&FieldBinding<R>> {
        self.binding_for(&ColumnAddress::Positional(index))
    }

    pub fn binding_named(&self, header: &str) -> Option<&FieldBinding<R>> {
        self.binding_for(&ColumnAddress::Named(header.to_string()))
    }

    pub fn field(&self, name: &str) -> Option<&FieldBinding<R>> {
        self.bindings.iter().find(|b| b.name == name)
    }

    /// Format pattern declared for a field.
    pub fn format_for_field(&self, name: &str) -> BindingResult<&str> {
        self.field(name)
            .and_then(FieldBinding::format)
            .ok_or_else(|| BindingError::InvalidBinding {
                record: self.record,
                field: name.to_string(),
                reason: "Format for column must be set if the datatype requires a format".into(),
            })
    }

    /// Largest bound index, positional bindings only.
    pub fn max_index(&self) -> Option<usize> {
        self.bindings.iter().filter_map(|b| b.address.index()).max()
    }

    /// Header names in declaration order, named bindings only.
    pub fn headers(&self) -> Vec<&str> {
        self.bindings.iter().filter_map(|b| b.address.header()).collect()
    }

    /// Check that every binding can be resolved in the given mode.
    pub fn check_mode(&self, mode: AddressMode) -> Result<(), ConfigError> {
        match self.bindings.iter().find(|b| b.address.mode() != mode) {
            Some(binding) => Err(ConfigError::MixedAddressing {
                record: self.record,
                field: binding.name.to_string(),
                mode,
            }),
            None => Ok(()),
        }
    }
}

impl<R> fmt::Debug for RecordMetadata<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordMetadata")
            .field("record", &self.record)
            .field("bindings", &self.bindings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CsvRecord;
    use chrono::NaiveDate;

    #[derive(Debug, Default, CsvRecord)]
    struct WithHeadings {
        #[csv(header = "someNumberCol")]
        some_number: Option<i32>,
        #[csv(header = "someTextCol")]
        some_text: Option<String>,
        #[csv(header = "localDateCol", format = "yyyy-MM-dd")]
        local_date: Option<NaiveDate>,
        unbound: Vec<u8>,
    }

    #[derive(Debug, Default, CsvRecord)]
    struct WithNumericIndex {
        #[csv(index = 0)]
        some_string_col: Option<String>,
        #[csv(index = 1)]
        some_int_col: Option<i32>,
    }

    #[derive(Debug, Default, CsvRecord)]
    struct Base {
        #[csv(index = 0)]
        id: u32,
    }

    #[derive(Debug, Default, CsvRecord)]
    struct Child {
        #[csv(parent)]
        base: Base,
        #[csv(index = 1)]
        name: String,
    }

    #[derive(Debug, Default, CsvRecord)]
    struct GrandChild {
        #[csv(parent)]
        child: Child,
        #[csv(index = 2)]
        level: u8,
    }

    #[derive(Debug, Default, CsvRecord)]
    struct NoAddress {
        #[csv(format = "yyyy")]
        value: Option<String>,
    }

    #[derive(Debug, Default, CsvRecord)]
    struct NegativeIndex {
        #[csv(index = -3)]
        value: Option<String>,
    }

    #[derive(Debug, Default, CsvRecord)]
    struct MissingFormat {
        #[csv(index = 0)]
        day: Option<NaiveDate>,
    }

    #[derive(Debug, Default, CsvRecord)]
    struct DuplicateIndex {
        #[csv(index = 0)]
        first: Option<String>,
        #[csv(index = 0)]
        second: Option<String>,
    }

    #[derive(Debug, Default, CsvRecord)]
    struct DuplicateHeader {
        #[csv(header = "name")]
        first: Option<String>,
        #[csv(header = "name")]
        second: Option<String>,
    }

    #[test]
    fn test_headings_mapping() {
        let meta = RecordMetadata::<WithHeadings>::extract().unwrap();
        assert_eq!(meta.len(), 3);
        assert_eq!(meta.headers(), vec!["someNumberCol", "someTextCol", "localDateCol"]);

        let number = meta.binding_named("someNumberCol").unwrap();
        assert_eq!(number.name(), "some_number");
        assert_eq!(number.value_type(), ValueType::Integer);

        let text = meta.binding_named("someTextCol").unwrap();
        assert_eq!(text.value_type(), ValueType::Text);
        assert!(meta.binding_named("unbound").is_none());
        assert_eq!(meta.format_for_field("local_date").unwrap(), "yyyy-MM-dd");
        assert!(meta.format_for_field("some_text").is_err());
    }

    #[test]
    fn test_integer_mapping() {
        let meta = RecordMetadata::<WithNumericIndex>::extract().unwrap();
        assert_eq!(meta.binding_at(0).unwrap().value_type(), ValueType::Text);
        assert_eq!(meta.binding_at(1).unwrap().value_type(), ValueType::Integer);
        assert_eq!(meta.max_index(), Some(1));
        assert!(meta.headers().is_empty());
    }

    #[test]
    fn test_accessor_reads_and_writes() {
        let meta = RecordMetadata::<WithNumericIndex>::extract().unwrap();
        let mut record = WithNumericIndex::default();
        let binding = meta.binding_at(1).unwrap();

        binding.set(&mut record, Value::Integer(5)).unwrap();
        assert_eq!(record.some_int_col, Some(5));
        assert_eq!(binding.get(&record), Value::Integer(5));
    }

    #[test]
    fn test_parent_fields_are_included_once() {
        let meta = RecordMetadata::<Child>::extract().unwrap();
        assert_eq!(meta.len(), 2);
        assert_eq!(meta.bindings()[0].name(), "name");
        assert_eq!(meta.bindings()[1].name(), "id");

        let mut child = Child::default();
        meta.binding_at(0).unwrap().set(&mut child, Value::Integer(9)).unwrap();
        assert_eq!(child.base.id, 9);
    }

    #[test]
    fn test_no_deeper_ancestor_walk() {
        let meta = RecordMetadata::<GrandChild>::extract().unwrap();
        let names: Vec<_> = meta.bindings().iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["level", "name"]);
        assert!(meta.binding_at(0).is_none());
    }

    #[test]
    fn test_invalid_bindings() {
        let err = RecordMetadata::<NoAddress>::extract().unwrap_err();
        assert!(err.to_string().contains("column index or a header name"));

        let err = RecordMetadata::<NegativeIndex>::extract().unwrap_err();
        assert!(err.to_string().contains("can't be negative"));

        let err = RecordMetadata::<MissingFormat>::extract().unwrap_err();
        assert!(err.to_string().contains("Format for column must be set"));
    }

    #[test]
    fn test_duplicate_addresses_are_rejected() {
        let err = RecordMetadata::<DuplicateIndex>::extract().unwrap_err();
        assert!(matches!(
            err,
            BindingError::DuplicateAddress { address: ColumnAddress::Positional(0), .. }
        ));

        let err = RecordMetadata::<DuplicateHeader>::extract().unwrap_err();
        assert!(err.to_string().contains("'first' and 'second'"));
    }

    #[test]
    fn test_check_mode() {
        let meta = RecordMetadata::<WithHeadings>::extract().unwrap();
        assert!(meta.check_mode(AddressMode::Named).is_ok());
        let err = meta.check_mode(AddressMode::Positional).unwrap_err();
        assert!(err.to_string().contains("some_number"));
    }

    #[test]
    fn test_manual_descriptor() {
        let descriptor = FieldDescriptor::<WithNumericIndex>::new(
            "some_int_col",
            ColumnDecl::at(4),
            |r| &r.some_int_col,
            |r| &mut r.some_int_col,
        );
        assert_eq!(descriptor.value_type(), ValueType::Integer);
        assert_eq!(descriptor.column().index, 4);
        assert_eq!(ColumnDecl::named("x").with_format("yyyy").format.as_deref(), Some("yyyy"));
    }
}
