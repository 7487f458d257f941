//! Date/time format patterns and their cache.
//!
//! Patterns are written with the usual date/time letters (`yyyy-MM-dd`,
//! `dd.MM.yyyy HH:mm:ss`, `'T'` for quoted literals, ...) and compiled once
//! into a chrono layout. A pattern containing `%` is already a chrono
//! layout and is used verbatim.

use std::collections::HashMap;
use std::fmt::{self, Write};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;

use crate::error::{CodecError, CodecResult};
use crate::models::ValueType;

/// Process-wide pattern cache used by [`crate::codec::ValueCodec::default`].
static GLOBAL_FORMATS: Lazy<Arc<FormatCache>> = Lazy::new(|| Arc::new(FormatCache::new()));

/// A compiled format pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    source: String,
    layout: String,
}

impl DatePattern {
    /// Compile a pattern into a chrono layout.
    pub fn compile(pattern: &str) -> CodecResult<Self> {
        if pattern.is_empty() {
            return Err(invalid(pattern, "pattern is empty"));
        }

        let layout = if pattern.contains('%') {
            pattern.to_string()
        } else {
            translate(pattern)?
        };

        if StrftimeItems::new(&layout).any(|item| matches!(item, Item::Error)) {
            return Err(invalid(pattern, "not a valid date/time layout"));
        }

        Ok(Self {
            source: pattern.to_string(),
            layout,
        })
    }

    /// The pattern as declared.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The chrono layout the pattern compiled to.
    pub fn layout(&self) -> &str {
        &self.layout
    }

    pub fn parse_date(&self, text: &str) -> CodecResult<NaiveDate> {
        Ok(NaiveDate::parse_from_str(text, &self.layout)?)
    }

    pub fn parse_date_time(&self, text: &str) -> CodecResult<NaiveDateTime> {
        Ok(NaiveDateTime::parse_from_str(text, &self.layout)?)
    }

    pub fn format_date(&self, value: &NaiveDate) -> CodecResult<String> {
        self.render(value.format(&self.layout), ValueType::Date)
    }

    pub fn format_date_time(&self, value: &NaiveDateTime) -> CodecResult<String> {
        self.render(value.format(&self.layout), ValueType::DateTime)
    }

    /// Fail unless values of `target` can be formatted with this pattern.
    pub fn check(&self, target: ValueType) -> CodecResult<()> {
        match target {
            ValueType::Date => self.format_date(&NaiveDate::default()).map(drop),
            ValueType::DateTime => self.format_date_time(&NaiveDateTime::default()).map(drop),
            _ => Ok(()),
        }
    }

    // chrono reports fields missing from the value as fmt::Error
    fn render(&self, formatted: impl fmt::Display, target: ValueType) -> CodecResult<String> {
        let mut text = String::new();
        write!(text, "{}", formatted).map_err(|_| CodecError::Unformattable {
            pattern: self.source.clone(),
            target,
        })?;
        Ok(text)
    }
}

/// Read-through cache of compiled patterns, keyed by pattern string.
///
/// Entries are never evicted: the set of patterns is bounded by the formats
/// declared on record types.
#[derive(Debug, Default)]
pub struct FormatCache {
    patterns: RwLock<HashMap<String, Arc<DatePattern>>>,
}

impl FormatCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> Arc<FormatCache> {
        Arc::clone(&GLOBAL_FORMATS)
    }

    /// Get the compiled pattern, compiling and storing it on a miss.
    pub fn get(&self, pattern: &str) -> CodecResult<Arc<DatePattern>> {
        if let Some(found) = self
            .patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pattern)
        {
            return Ok(Arc::clone(found));
        }

        let compiled = Arc::new(DatePattern::compile(pattern)?);
        let mut patterns = self.patterns.write().unwrap_or_else(PoisonError::into_inner);
        let stored = patterns
            .entry(pattern.to_string())
            .or_insert(compiled);
        Ok(Arc::clone(stored))
    }

    pub fn len(&self) -> usize {
        self.patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn invalid(pattern: &str, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

/// Translate pattern letters into a chrono layout.
fn translate(pattern: &str) -> CodecResult<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut layout = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' is an escaped quote, otherwise a quoted literal runs to the next lone quote
            if chars.get(i + 1) == Some(&'\'') {
                layout.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            let mut closed = false;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        layout.push('\'');
                        i += 2;
                        continue;
                    }
                    closed = true;
                    i += 1;
                    break;
                }
                push_literal(&mut layout, chars[i]);
                i += 1;
            }
            if !closed {
                return Err(invalid(pattern, "unterminated quoted literal"));
            }
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut layout, c);
            i += 1;
            continue;
        }

        let mut run = 1;
        while chars.get(i + run) == Some(&c) {
            run += 1;
        }
        layout.push_str(letter(pattern, c, run)?);
        i += run;
    }

    Ok(layout)
}

fn letter(pattern: &str, c: char, run: usize) -> CodecResult<&'static str> {
    let spec = match (c, run) {
        ('y' | 'u', 2) => "%y",
        ('y' | 'u', _) => "%Y",
        ('M' | 'L', 1) => "%-m",
        ('M' | 'L', 2) => "%m",
        ('M' | 'L', 3) => "%b",
        ('M' | 'L', _) => "%B",
        ('d', 1) => "%-d",
        ('d', 2) => "%d",
        ('D', 1..=3) => "%j",
        ('H', 1) => "%-H",
        ('H', 2) => "%H",
        ('h', 1) => "%-I",
        ('h', 2) => "%I",
        ('m', 1) => "%-M",
        ('m', 2) => "%M",
        ('s', 1) => "%-S",
        ('s', 2) => "%S",
        ('S', 3) => "%3f",
        ('S', 6) => "%6f",
        ('S', 9) => "%9f",
        ('a', 1) => "%p",
        ('E', 1..=3) => "%a",
        ('E', 4) => "%A",
        ('S', _) => {
            return Err(invalid(
                pattern,
                "fraction of second must be SSS, SSSSSS or SSSSSSSSS",
            ))
        }
        _ => {
            return Err(invalid(
                pattern,
                format!("unsupported pattern letter '{}' (x{})", c, run),
            ))
        }
    };
    Ok(spec)
}

fn push_literal(layout: &mut String, c: char) {
    if c == '%' {
        layout.push_str("%%");
    } else {
        layout.push(c);
    }
}
