//! JSON rendering for [`Bundle`], for callers that exchange bundles
//! with JSON-speaking peers.
//!
//! Only text survives the trip: string cells become JSON strings and
//! string arrays become JSON arrays with `null` in the unset slots.
//! Byte cells have no JSON form and are reported as an error rather
//! than dropped. JSON objects are unordered, so a bundle that crosses
//! JSON keeps its contents but not its insertion order.

use bundle::{Bundle, BundleError, BundleValue};
use thiserror::Error;

pub type JsonResult<T> = Result<T, JsonError>;

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("JSON parse error ({0})")]
    Parse(#[from] serde_json::Error),
    #[error("No JSON mapping ({0})")]
    Unsupported(Box<str>),
    #[error(transparent)]
    Bundle(#[from] BundleError),
}

impl JsonError {
    fn unsupported(msg: impl Into<Box<str>>) -> Self {
        JsonError::Unsupported(msg.into())
    }
}

/// Render `bundle` as a JSON object value.
pub fn to_json_value(bundle: &Bundle) -> JsonResult<serde_json::Value> {
    let mut map = serde_json::Map::new();
    for (key, value) in bundle.iter() {
        let member = match value {
            BundleValue::Str(s) => serde_json::Value::String(s.clone()),
            BundleValue::StrArray(slots) => serde_json::Value::Array(
                slots
                    .iter()
                    .map(|slot| match slot {
                        Some(s) => serde_json::Value::String(s.clone()),
                        None => serde_json::Value::Null,
                    })
                    .collect(),
            ),
            BundleValue::Byte(_) | BundleValue::ByteArray(_) => {
                return Err(JsonError::unsupported(format!(
                    "byte cells cannot be rendered, found one under {key:?}"
                )))
            }
        };
        map.insert(key.to_owned(), member);
    }
    Ok(serde_json::Value::Object(map))
}

/// Render `bundle` as JSON text.
pub fn to_json(bundle: &Bundle) -> JsonResult<String> {
    let value = to_json_value(bundle)?;
    Ok(value.to_string())
}

/// Build a bundle from a JSON object value. Every member must be a
/// string or an array of strings and nulls; anything else is an error,
/// not a silent skip.
pub fn from_json_value(value: &serde_json::Value) -> JsonResult<Bundle> {
    let members = match value {
        serde_json::Value::Object(members) => members,
        _ => {
            return Err(JsonError::unsupported(
                "top level JSON value is not an object",
            ))
        }
    };
    let mut bundle = Bundle::new();
    for (key, member) in members {
        match member {
            serde_json::Value::String(s) => bundle.add_str(key, s)?,
            serde_json::Value::Array(elements) => {
                let mut slots = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        serde_json::Value::String(s) => slots.push(Some(s.clone())),
                        serde_json::Value::Null => slots.push(None),
                        _ => {
                            return Err(JsonError::unsupported(format!(
                                "array member {key:?} holds a non-string element"
                            )))
                        }
                    }
                }
                bundle.add(key, BundleValue::StrArray(slots))?;
            }
            _ => {
                return Err(JsonError::unsupported(format!(
                    "member {key:?} is not a string or an array of strings"
                )))
            }
        }
    }
    Ok(bundle)
}

/// Build a bundle from JSON text.
pub fn from_json(text: &str) -> JsonResult<Bundle> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    from_json_value(&value)
}
