//! Text <-> typed value conversion.
//!
//! [`ValueCodec`] dispatches on the closed [`ValueType`] set. It knows nothing
//! about record metadata: callers hand it the resolved format pattern.

pub mod format;

use std::sync::Arc;

use crate::error::{CodecError, CodecResult};
use crate::models::{Value, ValueType};

pub use format::{DatePattern, FormatCache};

/// Stateless value converter backed by a [`FormatCache`].
#[derive(Debug, Clone)]
pub struct ValueCodec {
    formats: Arc<FormatCache>,
}

impl ValueCodec {
    pub fn new(formats: Arc<FormatCache>) -> Self {
        Self { formats }
    }

    pub fn formats(&self) -> &FormatCache {
        &self.formats
    }

    /// Convert cell text into a value of the given type.
    ///
    /// An absent cell decodes to [`Value::Null`], as does an empty cell of
    /// any type but text.
    pub fn decode(
        &self,
        text: Option<&str>,
        value_type: ValueType,
        pattern: Option<&str>,
    ) -> CodecResult<Value> {
        let Some(text) = text else {
            return Ok(Value::Null);
        };

        if text.is_empty() && value_type != ValueType::Text {
            return Ok(Value::Null);
        }

        let value = match value_type {
            ValueType::Text => Value::Text(text.to_string()),
            ValueType::Integer => Value::Integer(text.parse()?),
            ValueType::Float => Value::Float(text.parse()?),
            ValueType::Double => Value::Double(text.parse()?),
            ValueType::Boolean => Value::Boolean(parse_bool(text)?),
            ValueType::Date => Value::Date(self.pattern(value_type, pattern)?.parse_date(text)?),
            ValueType::DateTime => {
                Value::DateTime(self.pattern(value_type, pattern)?.parse_date_time(text)?)
            }
            ValueType::Opaque => Value::Opaque(text.to_string()),
        };
        Ok(value)
    }

    /// Convert a value into cell text. Absent values encode to empty text.
    pub fn encode(
        &self,
        value: &Value,
        value_type: ValueType,
        pattern: Option<&str>,
    ) -> CodecResult<String> {
        let text = match value {
            Value::Null => String::new(),
            Value::Date(date) => self.pattern(value_type, pattern)?.format_date(date)?,
            Value::DateTime(date_time) => {
                self.pattern(value_type, pattern)?.format_date_time(date_time)?
            }
            other => other.to_string(),
        };
        Ok(text)
    }

    fn pattern(&self, value_type: ValueType, pattern: Option<&str>) -> CodecResult<Arc<DatePattern>> {
        match pattern {
            Some(p) if !p.is_empty() => self.formats.get(p),
            _ => Err(CodecError::PatternRequired(value_type)),
        }
    }
}

impl Default for ValueCodec {
    /// Codec sharing the process-wide pattern cache.
    fn default() -> Self {
        Self::new(FormatCache::global())
    }
}

fn parse_bool(text: &str) -> CodecResult<bool> {
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(CodecError::Boolean(text.to_string()))
    }
}
