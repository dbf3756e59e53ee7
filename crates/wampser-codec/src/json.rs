//! JSON adapter.
//!
//! JSON has no binary type. Blobs travel as strings made of a leading NUL
//! character followed by the standard base64 encoding of the bytes, and any
//! decoded string with a leading NUL is turned back into a blob.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Number};

use crate::codec::ValueCodec;
use crate::error::{CodecError, Result};
use crate::format::Format;
use crate::value::{Dict, Value};

/// Marker prefix for base64-wrapped binary strings.
const BINARY_PREFIX: char = '\0';

/// JSON value adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Convert to a `serde_json` tree, wrapping binary blobs.
    pub fn to_json_value(value: &Value) -> Result<serde_json::Value> {
        to_json(value)
    }

    /// Convert from a `serde_json` tree, unwrapping binary blobs.
    pub fn from_json_value(json: serde_json::Value) -> Result<Value> {
        from_json(json)
    }
}

impl ValueCodec for JsonCodec {
    fn format(&self) -> Format {
        Format::Json
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let json = to_json(value)?;
        serde_json::to_vec(&json).map_err(|err| CodecError::encode(Format::Json, err))
    }

    fn decode(&self, payload: &[u8]) -> Result<Value> {
        let json: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|err| CodecError::decode(Format::Json, err))?;
        from_json(json)
    }
}

fn to_json(value: &Value) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(n) => serde_json::Value::Number(Number::from(*n)),
        Value::Float(f) => match Number::from_f64(*f) {
            Some(n) => serde_json::Value::Number(n),
            None => {
                return Err(CodecError::encode(
                    Format::Json,
                    format!("non-finite float {f} has no JSON representation"),
                ))
            }
        },
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect::<Result<Vec<_>>>()?)
        }
        Value::Map(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), to_json(value)?);
            }
            serde_json::Value::Object(out)
        }
        Value::Binary(bytes) => {
            let mut wrapped = String::with_capacity(1 + bytes.len().div_ceil(3) * 4);
            wrapped.push(BINARY_PREFIX);
            STANDARD.encode_string(bytes, &mut wrapped);
            serde_json::Value::String(wrapped)
        }
    })
}

fn from_json(json: serde_json::Value) -> Result<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => match s.strip_prefix(BINARY_PREFIX) {
            Some(encoded) => Value::Binary(STANDARD.decode(encoded).map_err(|err| {
                CodecError::decode(Format::Json, format!("invalid base64 binary string: {err}"))
            })?),
            None => Value::String(s),
        },
        serde_json::Value::Array(items) => Value::List(
            items
                .into_iter()
                .map(from_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_json::Value::Object(map) => {
            let mut out = Dict::new();
            for (key, value) in map {
                out.insert(key, from_json(value)?);
            }
            Value::Map(out)
        }
    })
}
