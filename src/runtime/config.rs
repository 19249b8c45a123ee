//! Runtime configuration
//!
//! A small, typed subset of `php.ini`. Loaded from JSON by hosts and read or
//! changed at runtime through `ini_get()` / `ini_set()`.

use crate::core::convert::DEFAULT_PRECISION;
use crate::runtime::diagnostics::E_ALL;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown configuration directive '{0}'")]
    UnknownDirective(String),
    #[error("invalid value '{value}' for '{name}'")]
    InvalidValue { name: String, value: String },
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Significant digits for float to string conversion (`echo`, casts).
    pub precision: i32,
    /// Digits used by `var_export`, `var_dump` and JSON; -1 picks the
    /// shortest representation that round-trips.
    pub serialize_precision: i32,
    pub error_reporting: i64,
    /// Seed for the request RNG (`shuffle`); `None` seeds from the OS.
    pub random_seed: Option<u64>,
    /// Capacity reserved by builtins that build arrays of unknown size.
    pub array_initial_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            serialize_precision: -1,
            error_reporting: E_ALL,
            random_seed: None,
            array_initial_capacity: 8,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// `ini_get($name)`
    pub fn get(&self, name: &str) -> Option<String> {
        Some(match name {
            "precision" => self.precision.to_string(),
            "serialize_precision" => self.serialize_precision.to_string(),
            "error_reporting" => self.error_reporting.to_string(),
            "random_seed" => self.random_seed.map(|s| s.to_string()).unwrap_or_default(),
            "array_initial_capacity" => self.array_initial_capacity.to_string(),
            _ => return None,
        })
    }

    /// `ini_set($name, $value)`; returns the previous value.
    pub fn set(&mut self, name: &str, value: &str) -> Result<String, ConfigError> {
        let old = self
            .get(name)
            .ok_or_else(|| ConfigError::UnknownDirective(name.to_string()))?;
        let invalid = || ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        let trimmed = value.trim();
        match name {
            "precision" => self.precision = trimmed.parse().map_err(|_| invalid())?,
            "serialize_precision" => {
                self.serialize_precision = trimmed.parse().map_err(|_| invalid())?
            }
            "error_reporting" => self.error_reporting = trimmed.parse().map_err(|_| invalid())?,
            "random_seed" => {
                self.random_seed = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.parse().map_err(|_| invalid())?)
                }
            }
            "array_initial_capacity" => {
                self.array_initial_capacity = trimmed.parse().map_err(|_| invalid())?
            }
            _ => unreachable!("get() accepted an unknown directive"),
        }
        Ok(old)
    }
}
