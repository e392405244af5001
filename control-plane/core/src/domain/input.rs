// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Unit Input
//!
//! Typed view over the dynamic key/value payload a transport delivers.
//! Numeric accessors accept any JSON number; integer accessors truncate
//! floats toward zero.

use serde_json::{Map, Value};

use super::errors::{UnitError, UnitResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Input(Map<String, Value>);

impl Input {
    /// `null` becomes an empty map; anything else that is not a map is
    /// rejected.
    pub fn from_value(value: Value) -> UnitResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self(map)),
            other => Err(UnitError::invalid_input(format!(
                "invalid input type: expected object, got {}",
                kind_of(&other)
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Text value, treating `""` as absent.
    pub fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.str(key).filter(|s| !s.is_empty())
    }

    /// Non-empty text or an `invalid_input` error naming the key.
    pub fn require_str(&self, key: &str) -> UnitResult<&str> {
        self.non_empty_str(key)
            .ok_or_else(|| UnitError::invalid_input(format!("{} is required", key)))
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(as_f64)
    }

    pub fn i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(as_i64)
    }

    /// Non-negative integer; negative values read as absent.
    pub fn usize(&self, key: &str) -> Option<usize> {
        self.i64(key).and_then(|n| usize::try_from(n).ok())
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn array(&self, key: &str) -> Option<&Vec<Value>> {
        self.0.get(key).and_then(Value::as_array)
    }

    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// List of text. Non-text elements of a mixed list are skipped.
    pub fn string_list(&self, key: &str) -> Option<Vec<String>> {
        self.array(key).map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Input {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

pub fn as_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

pub fn as_i64(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    number
        .as_i64()
        .or_else(|| number.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
        .or_else(|| number.as_f64().map(|f| f.trunc() as i64))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> Input {
        Input::from_value(value).unwrap()
    }

    #[test]
    fn test_null_is_empty_and_scalars_are_rejected() {
        assert_eq!(Input::from_value(Value::Null).unwrap(), Input::default());
        let err = Input::from_value(json!("text")).unwrap_err();
        assert!(err.to_string().contains("invalid input type"));
    }

    #[test]
    fn test_numeric_coercion() {
        let i = input(json!({"a": 300, "b": 2.9, "c": -1.5, "d": "7"}));
        assert_eq!(i.f64("a"), Some(300.0));
        assert_eq!(i.i64("a"), Some(300));
        assert_eq!(i.i64("b"), Some(2));
        assert_eq!(i.i64("c"), Some(-1));
        assert_eq!(i.i64("d"), None);
        assert_eq!(i.f64("missing"), None);
    }

    #[test]
    fn test_string_list_skips_non_text() {
        let i = input(json!({"channels": ["email", 3, "slack", null]}));
        assert_eq!(i.string_list("channels"), Some(vec!["email".to_string(), "slack".to_string()]));
        assert_eq!(i.string_list("missing"), None);
    }

    #[test]
    fn test_require_str() {
        let i = input(json!({"name": "", "model": "llama3"}));
        assert_eq!(i.require_str("model").unwrap(), "llama3");
        assert!(i.require_str("name").unwrap_err().to_string().contains("name is required"));
        assert!(i.non_empty_str("name").is_none());
    }
}
