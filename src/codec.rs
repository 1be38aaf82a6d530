use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;
use crate::params::ParamValue;
use crate::util::truncate_body;

/// Casing applied to JSON object keys.
///
/// On the encoding side the strategy names the casing of outgoing keys; on
/// the decoding side it names the casing incoming keys are normalized to
/// before they are matched against the declared field names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Keys pass through exactly as the serde derive produced them.
    #[default]
    Preserve,
    SnakeCase,
    CamelCase,
}

impl KeyStrategy {
    pub(crate) fn apply(self, key: &str) -> String {
        match self {
            Self::Preserve => key.to_owned(),
            Self::SnakeCase => to_snake_case(key),
            Self::CamelCase => to_camel_case(key),
        }
    }
}

fn to_snake_case(key: &str) -> String {
    let mut converted = String::with_capacity(key.len() + 4);
    for (index, character) in key.chars().enumerate() {
        if character.is_ascii_uppercase() {
            if index > 0 && !converted.ends_with('_') {
                converted.push('_');
            }
            converted.push(character.to_ascii_lowercase());
        } else {
            converted.push(character);
        }
    }
    converted
}

fn to_camel_case(key: &str) -> String {
    let mut converted = String::with_capacity(key.len());
    let mut capitalize_next = false;
    for character in key.chars() {
        if character == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            converted.push(character.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            converted.push(character);
        }
    }
    converted
}

/// Rendering applied to [`ParamValue::Date`] values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DateEncoding {
    #[default]
    Rfc3339,
    UnixSeconds,
    UnixMillis,
}

impl DateEncoding {
    pub(crate) fn render(self, date: &DateTime<Utc>) -> String {
        match self {
            Self::Rfc3339 => date.to_rfc3339_opts(SecondsFormat::Secs, true),
            Self::UnixSeconds => date.timestamp().to_string(),
            Self::UnixMillis => date.timestamp_millis().to_string(),
        }
    }
}

/// Rendering applied to raw binary data turned into a parameter value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BinaryEncoding {
    #[default]
    Base64,
    Hex,
}

/// How non-finite floats (NaN, infinities) become parameter values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NonFiniteFloats {
    /// Encode as JSON null, matching what serde_json does for bodies.
    #[default]
    Null,
    /// Encode as the literal strings `"NaN"`, `"inf"`, and `"-inf"`.
    Text,
}

/// Encoder configuration carried by an API descriptor.
///
/// Plain value, cloned into each call; there is no process-wide encoder
/// state to mutate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodingConfig {
    pub keys: KeyStrategy,
    pub dates: DateEncoding,
    pub binary: BinaryEncoding,
    pub non_finite_floats: NonFiniteFloats,
}

impl EncodingConfig {
    /// Builds a parameter value from a float, honoring the configured
    /// non-finite strategy.
    pub fn float_value(&self, value: f64) -> ParamValue {
        if value.is_finite() {
            return ParamValue::from(value);
        }
        match self.non_finite_floats {
            NonFiniteFloats::Null => ParamValue::Null,
            NonFiniteFloats::Text => {
                let text = if value.is_nan() {
                    "NaN"
                } else if value.is_sign_positive() {
                    "inf"
                } else {
                    "-inf"
                };
                ParamValue::String(text.to_owned())
            }
        }
    }

    /// Builds a parameter value from raw bytes, honoring the configured
    /// binary strategy.
    pub fn bytes_value(&self, data: &[u8]) -> ParamValue {
        let text = match self.binary {
            BinaryEncoding::Base64 => BASE64_STANDARD.encode(data),
            BinaryEncoding::Hex => {
                let mut hex = String::with_capacity(data.len() * 2);
                for byte in data {
                    hex.push_str(&format!("{byte:02x}"));
                }
                hex
            }
        };
        ParamValue::String(text)
    }
}

/// Decoder configuration carried by an API descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodingConfig {
    pub keys: KeyStrategy,
}

/// Serializes a request value into a JSON body, applying the configured key
/// strategy to every object key.
pub fn encode_body<T>(value: &T, config: &EncodingConfig) -> Result<Bytes, Error>
where
    T: Serialize + ?Sized,
{
    if config.keys == KeyStrategy::Preserve {
        let body = serde_json::to_vec(value).map_err(|source| Error::Serialize { source })?;
        return Ok(Bytes::from(body));
    }

    let mut tree = serde_json::to_value(value).map_err(|source| Error::Serialize { source })?;
    transform_keys(&mut tree, config.keys);
    let body = serde_json::to_vec(&tree).map_err(|source| Error::Serialize { source })?;
    Ok(Bytes::from(body))
}

/// Deserializes a JSON body into the declared response type, normalizing
/// incoming keys per the configured strategy first.
pub fn decode_body<T>(body: &[u8], config: &DecodingConfig) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    if config.keys == KeyStrategy::Preserve {
        return serde_json::from_slice(body).map_err(|source| Error::Deserialize {
            source,
            body: truncate_body(body),
        });
    }

    let mut tree: Value = serde_json::from_slice(body).map_err(|source| Error::Deserialize {
        source,
        body: truncate_body(body),
    })?;
    transform_keys(&mut tree, config.keys);
    serde_json::from_value(tree).map_err(|source| Error::Deserialize {
        source,
        body: truncate_body(body),
    })
}

fn transform_keys(value: &mut Value, strategy: KeyStrategy) {
    match value {
        Value::Object(object) => {
            let entries = std::mem::take(object);
            for (key, mut entry) in entries {
                transform_keys(&mut entry, strategy);
                object.insert(strategy.apply(&key), entry);
            }
        }
        Value::Array(items) => {
            for item in items {
                transform_keys(item, strategy);
            }
        }
        _ => {}
    }
}
