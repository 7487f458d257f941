//! Session options shared by readers and writers.
//!
//! Options come from code, from `CSVBIND_*` environment variables (the CLI
//! loads a `.env` file first) or from a JSON options file.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parser::{resolve_encoding, separator, Delimiter};

pub const ENV_DELIMITER: &str = "CSVBIND_DELIMITER";
pub const ENV_HEADING: &str = "CSVBIND_HEADING";
pub const ENV_APPEND: &str = "CSVBIND_APPEND";
pub const ENV_ENCODING: &str = "CSVBIND_ENCODING";

/// Options applied to a reader or writer builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapperOptions {
    /// Cell delimiter, used as a split pattern on read
    pub delimiter: String,

    /// First line holds column names (named mode)
    pub has_heading: bool,

    /// Writers append to an existing file instead of truncating it
    pub append: bool,

    /// Input encoding label; output is always UTF-8
    pub encoding: String,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            delimiter: separator::SEMICOLON.to_string(),
            has_heading: false,
            append: true,
            encoding: "utf-8".to_string(),
        }
    }
}

impl MapperOptions {
    /// Defaults overridden by `CSVBIND_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns per variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(delimiter) = lookup(ENV_DELIMITER) {
            options.delimiter = delimiter;
        }
        if let Some(value) = lookup(ENV_HEADING) {
            options.has_heading = parse_flag(ENV_HEADING, &value)?;
        }
        if let Some(value) = lookup(ENV_APPEND) {
            options.append = parse_flag(ENV_APPEND, &value)?;
        }
        if let Some(encoding) = lookup(ENV_ENCODING) {
            options.encoding = encoding;
        }

        Ok(options)
    }

    /// Parse an options file. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check delimiter and encoding without building a session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Delimiter::new(self.delimiter.as_str())?;
        resolve_encoding(&self.encoding)?;
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
