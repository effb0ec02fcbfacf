//! Typed extraction of tool-call arguments.
//!
//! Validation failures short-circuit to `BadRequest` before any component
//! is touched.

use serde_json::Value;

use crate::error::{Result, ServerError};

/// Extension methods for pulling typed arguments out of a JSON object.
pub trait ParamExt {
    fn required_str(&self, key: &str) -> Result<&str>;
    fn optional_str(&self, key: &str) -> Result<Option<&str>>;
    fn optional_bool(&self, key: &str, default: bool) -> Result<bool>;
    fn optional_string_array(&self, key: &str) -> Result<Option<Vec<String>>>;
    fn required_string_array(&self, key: &str) -> Result<Vec<String>>;
    fn optional_value(&self, key: &str) -> Option<&Value>;
}

fn wrong_type(key: &str, expected: &str) -> ServerError {
    ServerError::bad_request(format!("argument '{}' must be a {}", key, expected))
}

impl ParamExt for Value {
    fn required_str(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            None | Some(Value::Null) => Err(ServerError::bad_request(format!(
                "missing required argument '{}'",
                key
            ))),
            Some(Value::String(s)) if s.trim().is_empty() => Err(ServerError::bad_request(
                format!("argument '{}' must not be empty", key),
            )),
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(wrong_type(key, "string")),
        }
    }

    fn optional_str(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(wrong_type(key, "string")),
        }
    }

    fn optional_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(wrong_type(key, "boolean")),
        }
    }

    fn optional_string_array(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        _ => return Err(wrong_type(key, "array of strings")),
                    }
                }
                Ok(Some(out))
            }
            Some(_) => Err(wrong_type(key, "array of strings")),
        }
    }

    fn required_string_array(&self, key: &str) -> Result<Vec<String>> {
        self.optional_string_array(key)?.ok_or_else(|| {
            ServerError::bad_request(format!("missing required argument '{}'", key))
        })
    }

    fn optional_value(&self, key: &str) -> Option<&Value> {
        match self.get(key) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }
}
