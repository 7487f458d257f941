//! Value model shared by the metadata, codec and mapper layers.
//!
//! - [`ValueType`] - Closed set of declared field types
//! - [`Value`] - A typed cell value
//! - [`FieldValue`] - Typed access between a Rust field and a [`Value`]
//! - [`ColumnAddress`] - Positional or named identification of a cell
//! - [`AddressMode`] - Addressing kind used by a whole session

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};

// =============================================================================
// Value Types
// =============================================================================

/// Declared type of a bound field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    Text,
    Integer,
    /// Single precision.
    Float,
    /// Double precision.
    Double,
    Boolean,
    /// Calendar date, needs a format pattern.
    Date,
    /// Calendar date-time, needs a format pattern.
    DateTime,
    /// Any other type; the raw text is handed to the field as-is.
    Opaque,
}

impl ValueType {
    /// Whether a binding of this type must declare a format pattern.
    pub fn requires_format(self) -> bool {
        matches!(self, ValueType::Date | ValueType::DateTime)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Boolean => "boolean",
            ValueType::Date => "date",
            ValueType::DateTime => "date-time",
            ValueType::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Values
// =============================================================================

/// A typed cell value.
///
/// `Null` stands for an absent cell, or an empty cell of a non-text type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i128),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Opaque(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::DateTime(_) => "date-time",
            Value::Opaque(_) => "opaque",
        }
    }

    /// Error for a value that does not match the field it is assigned to.
    pub fn mismatch(&self, expected: ValueType) -> CodecError {
        CodecError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }
}

/// Canonical text of a value. Dates use ISO-8601 here; the codec formats
/// them with the binding's pattern instead.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) | Value::Opaque(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            // Debug keeps the shortest round-trip form and a trailing ".0"
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Double(v) => write!(f, "{:?}", v),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d),
            Value::DateTime(dt) => write!(f, "{}", dt),
        }
    }
}

// =============================================================================
// Typed Field Access
// =============================================================================

/// Conversion between a record field and a [`Value`].
///
/// Implemented for the std scalar types, `String`, chrono's naive date types,
/// and `Option<T>` of any of them. Other `FromStr + Display` types can be
/// bound through [`crate::opaque_field_value!`].
pub trait FieldValue: Sized {
    /// Declared type of fields holding `Self`.
    const VALUE_TYPE: ValueType;

    /// Whether an absent value can be stored (`None`). Non-nullable fields
    /// keep their current value when the cell is absent.
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> CodecResult<Self>;
}

impl<T: FieldValue> FieldValue for Option<T> {
    const VALUE_TYPE: ValueType = T::VALUE_TYPE;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> CodecResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FieldValue for String {
    const VALUE_TYPE: ValueType = ValueType::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> CodecResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(other.mismatch(ValueType::Text)),
        }
    }
}

macro_rules! integer_field_value {
    ($($ty:ty),+) => {$(
        impl FieldValue for $ty {
            const VALUE_TYPE: ValueType = ValueType::Integer;

            fn to_value(&self) -> Value {
                Value::Integer(*self as i128)
            }

            fn from_value(value: Value) -> CodecResult<Self> {
                match value {
                    Value::Integer(i) => <$ty>::try_from(i).map_err(|_| CodecError::OutOfRange {
                        value: i,
                        target: stringify!($ty),
                    }),
                    other => Err(other.mismatch(ValueType::Integer)),
                }
            }
        }
    )+};
}

integer_field_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! scalar_field_value {
    ($ty:ty, $variant:ident) => {
        impl FieldValue for $ty {
            const VALUE_TYPE: ValueType = ValueType::$variant;

            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }

            fn from_value(value: Value) -> CodecResult<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(other.mismatch(ValueType::$variant)),
                }
            }
        }
    };
}

scalar_field_value!(f32, Float);
scalar_field_value!(f64, Double);
scalar_field_value!(bool, Boolean);
scalar_field_value!(NaiveDate, Date);
scalar_field_value!(NaiveDateTime, DateTime);

/// Bind `FromStr + Display` types through the opaque catch-all.
///
/// The raw cell text is parsed with `FromStr`; a failure becomes a
/// conversion error for the field.
///
/// ```rust,ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Isrc(String);
/// // impl FromStr + Display for Isrc ...
/// csvbind::opaque_field_value!(Isrc);
/// ```
#[macro_export]
macro_rules! opaque_field_value {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::FieldValue for $ty {
            const VALUE_TYPE: $crate::ValueType = $crate::ValueType::Opaque;

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Opaque(::std::string::ToString::to_string(self))
            }

            fn from_value(
                value: $crate::Value,
            ) -> ::std::result::Result<Self, $crate::CodecError> {
                match value {
                    $crate::Value::Opaque(text) | $crate::Value::Text(text) => {
                        <$ty as ::std::str::FromStr>::from_str(&text).map_err(|e| {
                            $crate::CodecError::Cast {
                                target: stringify!($ty),
                                message: e.to_string(),
                            }
                        })
                    }
                    other => Err(other.mismatch($crate::ValueType::Opaque)),
                }
            }
        }
    )+};
}

opaque_field_value!(char, IpAddr, Ipv4Addr, Ipv6Addr);

// =============================================================================
// Column Addressing
// =============================================================================

/// Identification of a row's cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ColumnAddress {
    /// Zero-based cell index.
    Positional(usize),
    /// Header name of the column.
    Named(String),
}

impl ColumnAddress {
    pub fn mode(&self) -> AddressMode {
        match self {
            ColumnAddress::Positional(_) => AddressMode::Positional,
            ColumnAddress::Named(_) => AddressMode::Named,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            ColumnAddress::Positional(i) => Some(*i),
            ColumnAddress::Named(_) => None,
        }
    }

    pub fn header(&self) -> Option<&str> {
        match self {
            ColumnAddress::Positional(_) => None,
            ColumnAddress::Named(h) => Some(h),
        }
    }
}

impl fmt::Display for ColumnAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnAddress::Positional(i) => write!(f, "index {}", i),
            ColumnAddress::Named(h) => write!(f, "header '{}'", h),
        }
    }
}

/// Addressing kind of a reader or writer session, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressMode {
    Positional,
    Named,
}

impl AddressMode {
    pub fn from_heading(has_heading: bool) -> Self {
        if has_heading {
            AddressMode::Named
        } else {
            AddressMode::Positional
        }
    }
}

impl fmt::Display for AddressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressMode::Positional => f.write_str("positional"),
            AddressMode::Named => f.write_str("named"),
        }
    }
}
