//! Environment configuration shared by the ingestor and the query server.
//!
//! Both binaries are configured exclusively through environment variables.
//! Values are trimmed and blank values count as unset. Every failure names
//! the offending variable so misconfiguration is caught at startup.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::snapshot::validate_prefix;

/// Blob-store location variable.
pub const STORAGE_LOCATION: &str = "STORAGE_LOCATION";
/// Dataset source URL variable.
pub const SOURCE_URL: &str = "SOURCE_URL";
/// Snapshot key namespace variable.
pub const KEY_PREFIX: &str = "KEY_PREFIX";
/// Debug mode variable.
pub const DEBUG: &str = "DEBUG";

/// Reads configuration variables through a lookup function.
///
/// Production code uses [`EnvVars::process`]; tests pass a map lookup so
/// they never mutate the process environment.
#[derive(Debug, Clone, Copy)]
pub struct EnvVars<F> {
    lookup: F,
}

fn process_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl EnvVars<fn(&str) -> Option<String>> {
    /// Reads from the process environment.
    #[must_use]
    pub fn process() -> Self {
        Self {
            lookup: process_var,
        }
    }
}

impl<F> EnvVars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Reads through an arbitrary lookup.
    pub const fn from_fn(lookup: F) -> Self {
        Self { lookup }
    }

    /// Returns the trimmed value, treating blank as unset.
    pub fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// Returns the value or a configuration error naming the variable.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the variable is unset or blank.
    pub fn required(&self, name: &str) -> Result<String> {
        self.string(name)
            .ok_or_else(|| Error::InvalidInput(format!("{name} is required")))
    }

    /// Parses a boolean (`true/false/1/0/yes/no`).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the value is not a boolean.
    pub fn bool(&self, name: &str) -> Result<Option<bool>> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        parse_bool(name, &v).map(Some)
    }

    /// Parses a value with `FromStr`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the value does not parse.
    pub fn parsed<T>(&self, name: &str, what: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        v.parse::<T>()
            .map(Some)
            .map_err(|e| Error::InvalidInput(format!("{name} must be {what}: {e}")))
    }
}

/// Parses a boolean flag value.
///
/// # Errors
///
/// Returns `Error::InvalidInput` for anything other than the accepted spellings.
pub fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

/// The three settings every component requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSettings {
    /// Blob-store container URL (`s3://`, `gs://`, `file://`, `memory://`).
    pub storage_location: String,
    /// Dataset source URL.
    pub source_url: String,
    /// Snapshot key namespace.
    pub key_prefix: String,
}

impl SnapshotSettings {
    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the prefix is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&EnvVars::process())
    }

    /// Loads settings through a lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the prefix is invalid.
    pub fn from_vars<F>(vars: &EnvVars<F>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_location = vars.required(STORAGE_LOCATION)?;
        let source_url = vars.required(SOURCE_URL)?;
        let key_prefix = vars.required(KEY_PREFIX)?;
        validate_prefix(&key_prefix)
            .map_err(|e| Error::InvalidInput(format!("{KEY_PREFIX}: {e}")))?;

        Ok(Self {
            storage_location,
            source_url,
            key_prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> EnvVars<impl Fn(&str) -> Option<String>> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        EnvVars::from_fn(move |name: &str| map.get(name).cloned())
    }

    #[test]
    fn settings_load_all_three() {
        let settings = SnapshotSettings::from_vars(&vars(&[
            (STORAGE_LOCATION, " s3://bucket "),
            (SOURCE_URL, "https://example.com/data.csv"),
            (KEY_PREFIX, "data"),
        ]))
        .unwrap();

        assert_eq!(settings.storage_location, "s3://bucket");
        assert_eq!(settings.source_url, "https://example.com/data.csv");
        assert_eq!(settings.key_prefix, "data");
    }

    #[test]
    fn settings_require_each_variable() {
        let all = [
            (STORAGE_LOCATION, "s3://bucket"),
            (SOURCE_URL, "https://example.com/data.csv"),
            (KEY_PREFIX, "data"),
        ];
        for missing in [STORAGE_LOCATION, SOURCE_URL, KEY_PREFIX] {
            let present: Vec<_> = all.iter().copied().filter(|(k, _)| *k != missing).collect();
            let err = SnapshotSettings::from_vars(&vars(&present)).unwrap_err();
            let Error::InvalidInput(message) = err else {
                panic!("unexpected error: {err:?}");
            };
            assert!(message.contains(missing), "{message}");
        }
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let err = SnapshotSettings::from_vars(&vars(&[
            (STORAGE_LOCATION, "s3://bucket"),
            (SOURCE_URL, "https://example.com/data.csv"),
            (KEY_PREFIX, "   "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(KEY_PREFIX));
    }

    #[test]
    fn prefix_with_slash_rejected() {
        let err = SnapshotSettings::from_vars(&vars(&[
            (STORAGE_LOCATION, "s3://bucket"),
            (SOURCE_URL, "https://example.com/data.csv"),
            (KEY_PREFIX, "a/b"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(KEY_PREFIX));
    }

    #[test]
    fn parse_bool_accepts_known_values() {
        assert!(parse_bool("TEST", "true").unwrap());
        assert!(parse_bool("TEST", "YES").unwrap());
        assert!(!parse_bool("TEST", "0").unwrap());
        assert!(!parse_bool("TEST", "no").unwrap());
        assert!(parse_bool("TEST", "maybe").is_err());
    }

    #[test]
    fn parsed_reports_variable_name() {
        let v = vars(&[("HTTP_PORT", "eighty")]);
        let err = v.parsed::<u16>("HTTP_PORT", "a u16").unwrap_err();
        assert!(err.to_string().contains("HTTP_PORT"));
        assert_eq!(v.parsed::<u16>("MISSING", "a u16").unwrap(), None);
    }
}
