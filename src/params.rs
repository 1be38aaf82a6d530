use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::codec::EncodingConfig;
use crate::error::Error;

/// Ordered map of query parameter names to scalar values.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Closed set of scalar values a query parameter can hold.
///
/// Replaces untyped "anything" maps: every value a request or an API default
/// can contribute is one of these, and each renders to a query string in
/// exactly one way under a given [`EncodingConfig`].
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Date(DateTime<Utc>),
    Null,
}

impl ParamValue {
    /// Renders the value for query-string interpolation.
    pub fn render(&self, config: &EncodingConfig) -> String {
        match self {
            Self::String(text) => text.clone(),
            Self::Number(number) => number.to_string(),
            Self::Bool(flag) => flag.to_string(),
            Self::Date(date) => config.dates.render(date),
            Self::Null => String::new(),
        }
    }

    fn from_scalar(key: &str, value: Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(flag) => Ok(Self::Bool(flag)),
            Value::Number(number) => Ok(Self::Number(number)),
            Value::String(text) => Ok(Self::String(text)),
            Value::Array(_) | Value::Object(_) => Err(Error::EncodeParams {
                message: format!("field {key} is not a scalar"),
            }),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        match serde_json::Number::from_f64(value) {
            Some(number) => Self::Number(number),
            None => Self::Null,
        }
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

/// Flattens a request value into a parameter map.
///
/// The value is serialized to JSON and must produce an object at the top
/// level; each top-level field becomes one entry, keyed per the configured
/// key strategy. Nested objects and arrays are rejected because they have no
/// scalar query-string form.
pub fn encode_params<T>(value: &T, config: &EncodingConfig) -> Result<ParamMap, Error>
where
    T: Serialize + ?Sized,
{
    let tree = serde_json::to_value(value).map_err(|source| Error::Serialize { source })?;
    let Value::Object(fields) = tree else {
        return Err(Error::EncodeParams {
            message: "value does not serialize to an object at the top level".to_owned(),
        });
    };

    let mut params = ParamMap::new();
    for (key, field) in fields {
        let value = ParamValue::from_scalar(&key, field)?;
        params.insert(config.keys.apply(&key), value);
    }
    Ok(params)
}
