use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::sentiment::Code;

/// Shown in place of a missing user ID.
pub const ANONYMOUS: &str = "anonymous";

/// Keys MongoDB extended JSON wraps scalar values in.
const EXTENDED_JSON_WRAPPERS: [&str; 4] = ["$numberInt", "$numberLong", "$numberDouble", "$oid"];

/// A document exactly as the store returned it.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDocument {
    /// The identifier the store assigned.
    pub id: String,

    /// The loosely-typed body.
    pub fields: Map<String, Value>,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        RawDocument {
            id: id.into(),
            fields,
        }
    }

    /// Returns the named field, unwrapped from extended JSON if
    /// necessary. `null` counts as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self.fields.get(field).map(unwrap_extended) {
            None | Some(Value::Null) => None,
            v => v,
        }
    }

    /// Returns the named field as text without validating it. Strings
    /// are returned as-is, other scalars in their JSON form.
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).map(|v| match v {
            Value::String(s) => s.clone(),
            v => v.to_string(),
        })
    }
}

/// A single geotagged mood log.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// The identifier the store assigned.
    pub id: String,

    /// The user who logged it, if known.
    pub user_id: UserId,

    /// When it was logged, verbatim as stored.
    pub timestamp: String,

    /// The sentiment code.
    pub sentiment: Code,

    /// Link to the video.
    pub vlog_path: String,

    /// Latitude.
    pub lat: f64,

    /// Longitude.
    pub lng: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UserId {
    Known(i64),
    Anonymous,
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Known(id) => write!(f, "{}", id),
            UserId::Anonymous => f.write_str(ANONYMOUS),
        }
    }
}

/// Explains why a document could not become a [`Record`].
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing field `{0}`")]
    Missing(&'static str),

    #[error("field `{field}` has invalid value {value}")]
    Invalid { field: &'static str, value: String },
}

impl ValidationError {
    /// The name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Missing(field) | ValidationError::Invalid { field, .. } => *field,
        }
    }
}

impl Record {
    /// Validates and coerces `document`. Unknown fields are ignored.
    pub fn from_document(document: &RawDocument) -> Result<Self, ValidationError> {
        let user_id = match document.get("user_id") {
            Some(value) => UserId::Known(coerce_integer("user_id", value)?),
            None => UserId::Anonymous,
        };

        Ok(Record {
            id: document.id.clone(),
            user_id,
            timestamp: expect_string("timestamp", required(document, "timestamp")?)?,
            sentiment: coerce_integer("sentiment", required(document, "sentiment")?)?,
            vlog_path: expect_string("vlog_path", required(document, "vlog_path")?)?,
            lat: coerce_float("lat", required(document, "lat")?)?,
            lng: coerce_float("lng", required(document, "lng")?)?,
        })
    }
}

fn unwrap_extended(value: &Value) -> &Value {
    match value {
        Value::Object(map) if map.len() == 1 => EXTENDED_JSON_WRAPPERS
            .iter()
            .find_map(|key| map.get(*key))
            .unwrap_or(value),
        _ => value,
    }
}

fn required<'a>(
    document: &'a RawDocument,
    field: &'static str,
) -> Result<&'a Value, ValidationError> {
    document.get(field).ok_or(ValidationError::Missing(field))
}

fn invalid(field: &'static str, value: &Value) -> ValidationError {
    ValidationError::Invalid {
        field,
        value: value.to_string(),
    }
}

fn expect_string(field: &'static str, value: &Value) -> Result<String, ValidationError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| invalid(field, value))
}

pub(crate) fn coerce_integer(field: &'static str, value: &Value) -> Result<i64, ValidationError> {
    let integral = |f: f64| {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            Some(f as i64)
        } else {
            None
        }
    };

    let coerced = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    };

    coerced.ok_or_else(|| invalid(field, value))
}

fn coerce_float(field: &'static str, value: &Value) -> Result<f64, ValidationError> {
    let coerced = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    };

    coerced.ok_or_else(|| invalid(field, value))
}
