//! Key → value/array parameter store.
//!
//! Calibration constants arrive as a flat JSON object whose values are
//! numbers, arrays of numbers, or strings:
//!
//! ```json
//! { "hhodo_plane_names": "1x 1y 2x 2y", "hscin_1x_zpos": 97.5, "hhodo_vel_light": [15.0, 15.0] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result};

/// A single parameter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Array(Vec<f64>),
    Text(String),
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(value: Vec<f64>) -> Self {
        Self::Array(value)
    }
}

impl From<&[f64]> for ParamValue {
    fn from(value: &[f64]) -> Self {
        Self::Array(value.to_vec())
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Flat parameter database.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamStore {
    values: HashMap<String, ParamValue>,
}

impl ParamStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a store from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a store from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Required scalar.
    pub fn number(&self, key: &str) -> Result<f64> {
        match self.values.get(key) {
            Some(value) => scalar(key, value),
            None => Err(Error::MissingParameter(key.to_string())),
        }
    }

    /// Optional scalar with a default.
    pub fn number_or(&self, key: &str, default: f64) -> Result<f64> {
        self.values
            .get(key)
            .map_or(Ok(default), |value| scalar(key, value))
    }

    /// Required integer.
    pub fn integer(&self, key: &str) -> Result<i64> {
        to_integer(key, self.number(key)?)
    }

    /// Optional integer with a default.
    pub fn integer_or(&self, key: &str, default: i64) -> Result<i64> {
        match self.values.get(key) {
            Some(value) => to_integer(key, scalar(key, value)?),
            None => Ok(default),
        }
    }

    /// Required string.
    pub fn text(&self, key: &str) -> Result<&str> {
        match self.values.get(key) {
            Some(ParamValue::Text(text)) => Ok(text),
            Some(_) => Err(Error::invalid(key, "expected a string")),
            None => Err(Error::MissingParameter(key.to_string())),
        }
    }

    /// Required array with at least `len` entries. A scalar counts as a
    /// one-element array.
    pub fn array(&self, key: &str, len: usize) -> Result<Vec<f64>> {
        let values = match self.values.get(key) {
            Some(ParamValue::Array(values)) => values.clone(),
            Some(ParamValue::Number(value)) => vec![*value],
            Some(ParamValue::Text(_)) => {
                return Err(Error::invalid(key, "expected an array of numbers"))
            }
            None => return Err(Error::MissingParameter(key.to_string())),
        };
        if values.len() < len {
            return Err(Error::invalid(
                key,
                format!("expected at least {len} entries, found {}", values.len()),
            ));
        }
        Ok(values)
    }

    /// Optional array; absent keys yield `len` copies of `default`.
    pub fn array_or(&self, key: &str, len: usize, default: f64) -> Result<Vec<f64>> {
        if self.contains(key) {
            self.array(key, len)
        } else {
            Ok(vec![default; len])
        }
    }
}

fn scalar(key: &str, value: &ParamValue) -> Result<f64> {
    match value {
        ParamValue::Number(v) => Ok(*v),
        ParamValue::Array(values) if values.len() == 1 => Ok(values[0]),
        _ => Err(Error::invalid(key, "expected a number")),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_integer(key: &str, value: f64) -> Result<i64> {
    if value.fract() == 0.0 && value.is_finite() {
        Ok(value as i64)
    } else {
        Err(Error::invalid(key, format!("expected an integer, found {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_json_mixed_values() {
        let json = r#"{
            "hhodo_plane_names": "1x 1y",
            "hscin_1x_zpos": 97.5,
            "hhodo_vel_light": [15.0, 14.5, 15.5]
        }"#;
        let store = ParamStore::from_json(json).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.text("hhodo_plane_names").unwrap(), "1x 1y");
        assert_eq!(store.number("hscin_1x_zpos").unwrap(), 97.5);
        assert_eq!(store.array("hhodo_vel_light", 3).unwrap(), vec![15.0, 14.5, 15.5]);
    }

    #[test]
    fn test_missing_and_defaults() {
        let store = ParamStore::new().with("a", 2.0);

        assert!(matches!(store.number("b"), Err(Error::MissingParameter(_))));
        assert_eq!(store.number_or("b", 7.0).unwrap(), 7.0);
        assert_eq!(store.integer_or("a", 0).unwrap(), 2);
        assert_eq!(store.array_or("c", 3, 0.2).unwrap(), vec![0.2; 3]);
    }

    #[test]
    fn test_shape_errors() {
        let store = ParamStore::new()
            .with("short", vec![1.0, 2.0])
            .with("name", "x")
            .with("frac", 1.5);

        assert!(matches!(
            store.array("short", 4),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(store.number("name").is_err());
        assert!(store.integer("frac").is_err());
        assert_eq!(store.array("frac", 1).unwrap(), vec![1.5]);
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"hstart_time_center": 32.0}}"#).unwrap();

        let store = ParamStore::from_file(file.path()).unwrap();
        assert_eq!(store.number("hstart_time_center").unwrap(), 32.0);
    }
}
