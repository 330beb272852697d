//! Typed access to request parameters.
//!
//! Getters fail explicitly when a key is absent or its value is malformed.
//! Only the `*_or` variants fall back to a default.

use axum::extract::Query;
use axum::http::Uri;

/// Errors from parameter lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamsError {
    #[error("missing parameter `{0}`")]
    Missing(String),

    #[error("parameter `{key}` has invalid value {value:?}: expected {expected}")]
    Malformed {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// Request parameters in the order they first appeared.
///
/// Repeated keys accumulate values (`id=1&id=2`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, Vec<String>)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from key/value pairs, grouping repeated keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.push(key, value);
        }
        params
    }

    /// Parse the query string of a request URI. An unparseable query yields no params.
    pub fn from_uri(uri: &Uri) -> Self {
        match Query::<Vec<(String, String)>>::try_from_uri(uri) {
            Ok(Query(pairs)) => Self::from_pairs(pairs),
            Err(e) => {
                tracing::debug!("Ignoring malformed query string {:?}: {}", uri.query(), e);
                Self::new()
            }
        }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into()),
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    fn values(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// First non-empty value for `key`.
    pub fn get(&self, key: &str) -> Result<&str, ParamsError> {
        self.values(key)
            .and_then(|v| v.iter().find(|v| !v.is_empty()))
            .map(String::as_str)
            .ok_or_else(|| ParamsError::Missing(key.to_string()))
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn get_int(&self, key: &str) -> Result<i64, ParamsError> {
        let raw = self.get(key)?;
        parse_int(key, raw)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ParamsError> {
        let raw = self.get(key)?;
        match raw {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ParamsError::Malformed {
                key: key.to_string(),
                value: raw.to_string(),
                expected: "a boolean",
            }),
        }
    }

    pub fn get_or_bool(&self, key: &str, default: bool) -> Result<bool, ParamsError> {
        match self.get_bool(key) {
            Err(ParamsError::Missing(_)) => Ok(default),
            other => other,
        }
    }

    /// All values for `key`; at least one must be present.
    pub fn get_list(&self, key: &str) -> Result<&[String], ParamsError> {
        self.values(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ParamsError::Missing(key.to_string()))
    }

    /// All values for `key` parsed as integers. Absent key yields an empty list.
    pub fn get_list_int(&self, key: &str) -> Result<Vec<i64>, ParamsError> {
        self.values(key)
            .unwrap_or_default()
            .iter()
            .map(|raw| parse_int(key, raw))
            .collect()
    }
}

fn parse_int(key: &str, raw: &str) -> Result<i64, ParamsError> {
    raw.parse().map_err(|_| ParamsError::Malformed {
        key: key.to_string(),
        value: raw.to_string(),
        expected: "an integer",
    })
}
