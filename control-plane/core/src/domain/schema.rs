// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Declarative Schemas
//!
//! A [`Schema`] describes the dynamic payload a unit accepts or returns and
//! validates a `serde_json::Value` against it. Validation is pure: it never
//! mutates the schema or the value and always returns the same verdict for
//! the same pair.
//!
//! Rules, in evaluation order:
//!
//! 1. `null` fails unless the schema is marked optional.
//! 2. Objects: every `required` key must be present, then each declared
//!    property that is present is validated recursively. Unknown keys pass.
//! 3. Arrays: each element is validated against `items`.
//! 4. Leaf type check. `number` accepts any JSON integer or float.
//! 5. `enum` membership by literal equality.
//! 6. Numeric `min`/`max`, string `minLength`/`maxLength`, and `pattern`
//!    (which must match the whole string).
//!
//! A schema may list alternatives (`anyOf`); a value passes when it satisfies
//! the schema itself or any alternative, and failures report against the
//! schema itself.
//!
//! [`Schema::apply_defaults`] fills absent properties from their declared
//! `default` once a payload has validated.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use super::errors::UnitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Number,
    Boolean,
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Whole-string regex, compiled on first use and kept with the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern {
    source: String,
    #[serde(skip)]
    compiled: OnceLock<Regex>,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: OnceLock::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn regex(&self) -> Result<&Regex, SchemaError> {
        if let Some(regex) = self.compiled.get() {
            return Ok(regex);
        }
        let regex = anchored(&self.source)?;
        Ok(self.compiled.get_or_init(|| regex))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Field>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Soft hint; also lets `null` through.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,

    #[serde(rename = "anyOf", default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Schema>,
}

impl Schema {
    pub fn new(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            properties: BTreeMap::new(),
            items: None,
            required: Vec::new(),
            optional: false,
            title: None,
            description: None,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            pattern: None,
            enum_values: Vec::new(),
            default: None,
            examples: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(SchemaType::String)
    }

    pub fn number() -> Self {
        Self::new(SchemaType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(SchemaType::Boolean)
    }

    pub fn object() -> Self {
        Self::new(SchemaType::Object)
    }

    pub fn array(items: Schema) -> Self {
        let mut schema = Self::new(SchemaType::Array);
        schema.items = Some(Box::new(items));
        schema
    }

    /// Array of strings, the most common list shape in unit payloads.
    pub fn string_array() -> Self {
        Self::array(Self::string())
    }

    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            Field { name, schema },
        );
        self
    }

    pub fn require<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(Pattern::new(pattern));
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Also accept values matching `alternative`.
    pub fn or(mut self, alternative: Schema) -> Self {
        self.alternatives.push(alternative);
        self
    }

    pub fn example(mut self, value: impl Into<Value>) -> Self {
        self.examples.push(value.into());
        self
    }

    /// Structural checks on the schema itself: arrays carry `items`,
    /// `required` names declared properties, patterns compile and defaults
    /// satisfy their own schema.
    pub fn check(&self) -> Result<(), SchemaError> {
        match self.schema_type {
            SchemaType::Array => match &self.items {
                Some(items) => items.check().map_err(|e| e.in_item(0))?,
                None => return Err(SchemaError::MissingItems),
            },
            SchemaType::Object => {
                if let Some(name) = self
                    .required
                    .iter()
                    .find(|name| !self.properties.contains_key(name.as_str()))
                {
                    return Err(SchemaError::UndeclaredRequired(name.clone()));
                }
                for (name, field) in &self.properties {
                    field.schema.check().map_err(|e| e.in_field(name))?;
                }
            }
            _ => {}
        }
        if let Some(pattern) = &self.pattern {
            pattern.regex()?;
        }
        for (index, alternative) in self.alternatives.iter().enumerate() {
            alternative.check().map_err(|e| SchemaError::InvalidAlternative {
                index,
                source: Box::new(e),
            })?;
        }
        if let Some(default) = &self.default {
            self.validate(default).map_err(|e| SchemaError::InvalidDefault(Box::new(e)))?;
        }
        Ok(())
    }

    /// Insert declared defaults for absent object properties, descending
    /// into nested objects and array items that are present.
    pub fn apply_defaults(&self, value: &mut Value) {
        match (self.schema_type, value) {
            (SchemaType::Object, Value::Object(map)) => self.fill_object(map),
            (SchemaType::Array, Value::Array(items)) => {
                if let Some(item_schema) = &self.items {
                    for item in items {
                        item_schema.apply_defaults(item);
                    }
                }
            }
            _ => {}
        }
    }

    fn fill_object(&self, map: &mut Map<String, Value>) {
        for (name, field) in &self.properties {
            match map.get_mut(name) {
                Some(present) => field.schema.apply_defaults(present),
                None => {
                    if let Some(default) = &field.schema.default {
                        map.insert(name.clone(), default.clone());
                    }
                }
            }
        }
    }

    pub fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        let verdict = self.validate_own(value);
        if verdict.is_err() && self.alternatives.iter().any(|alt| alt.validate(value).is_ok()) {
            return Ok(());
        }
        verdict
    }

    fn validate_own(&self, value: &Value) -> Result<(), SchemaError> {
        if value.is_null() {
            if self.optional {
                return Ok(());
            }
            return Err(SchemaError::Null {
                expected: self.schema_type,
            });
        }

        match self.schema_type {
            SchemaType::Object => {
                let map = value.as_object().ok_or_else(|| self.mismatch(value))?;
                for name in &self.required {
                    if !map.contains_key(name) {
                        return Err(SchemaError::MissingRequired(name.clone()));
                    }
                }
                for (name, field) in &self.properties {
                    if let Some(v) = map.get(name) {
                        field.schema.validate(v).map_err(|e| e.in_field(name))?;
                    }
                }
            }
            SchemaType::Array => {
                let items = value.as_array().ok_or_else(|| self.mismatch(value))?;
                if let Some(item_schema) = &self.items {
                    for (index, item) in items.iter().enumerate() {
                        item_schema.validate(item).map_err(|e| e.in_item(index))?;
                    }
                }
            }
            SchemaType::String => {
                let text = value.as_str().ok_or_else(|| self.mismatch(value))?;
                self.check_enum(value)?;
                self.check_length(text)?;
                self.check_pattern(text)?;
            }
            SchemaType::Number => {
                let number = value.as_f64().ok_or_else(|| self.mismatch(value))?;
                self.check_enum(value)?;
                self.check_bounds(number)?;
            }
            SchemaType::Boolean => {
                value.as_bool().ok_or_else(|| self.mismatch(value))?;
                self.check_enum(value)?;
            }
        }
        Ok(())
    }

    fn mismatch(&self, value: &Value) -> SchemaError {
        SchemaError::TypeMismatch {
            expected: self.schema_type,
            found: json_type_name(value),
        }
    }

    fn check_enum(&self, value: &Value) -> Result<(), SchemaError> {
        if self.enum_values.is_empty() || self.enum_values.contains(value) {
            return Ok(());
        }
        Err(SchemaError::NotInEnum {
            value: value.to_string(),
        })
    }

    fn check_bounds(&self, number: f64) -> Result<(), SchemaError> {
        if let Some(min) = self.min {
            if number < min {
                return Err(SchemaError::BelowMinimum { value: number, min });
            }
        }
        if let Some(max) = self.max {
            if number > max {
                return Err(SchemaError::AboveMaximum { value: number, max });
            }
        }
        Ok(())
    }

    fn check_length(&self, text: &str) -> Result<(), SchemaError> {
        let len = text.chars().count();
        if let Some(min) = self.min_length {
            if len < min {
                return Err(SchemaError::TooShort { len, min });
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(SchemaError::TooLong { len, max });
            }
        }
        Ok(())
    }

    fn check_pattern(&self, text: &str) -> Result<(), SchemaError> {
        let Some(pattern) = &self.pattern else {
            return Ok(());
        };
        if pattern.regex()?.is_match(text) {
            Ok(())
        } else {
            Err(SchemaError::PatternMismatch {
                pattern: pattern.as_str().to_string(),
            })
        }
    }
}

fn anchored(pattern: &str) -> Result<Regex, SchemaError> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| SchemaError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("expected {expected}, got null")]
    Null { expected: SchemaType },

    #[error("expected {expected}, got {found}")]
    TypeMismatch {
        expected: SchemaType,
        found: &'static str,
    },

    #[error("required field \"{0}\" is missing")]
    MissingRequired(String),

    #[error("field \"{field}\": {source}")]
    Field {
        field: String,
        source: Box<SchemaError>,
    },

    #[error("array item {index}: {source}")]
    Item {
        index: usize,
        source: Box<SchemaError>,
    },

    #[error("value {value} is not one of the allowed values")]
    NotInEnum { value: String },

    #[error("value {value} is below minimum {min}")]
    BelowMinimum { value: f64, min: f64 },

    #[error("value {value} exceeds maximum {max}")]
    AboveMaximum { value: f64, max: f64 },

    #[error("length {len} is below minimum length {min}")]
    TooShort { len: usize, min: usize },

    #[error("length {len} exceeds maximum length {max}")]
    TooLong { len: usize, max: usize },

    #[error("value does not match pattern {pattern:?}")]
    PatternMismatch { pattern: String },

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("array schema has no items schema")]
    MissingItems,

    #[error("required field \"{0}\" is not a declared property")]
    UndeclaredRequired(String),

    #[error("default value is invalid: {0}")]
    InvalidDefault(Box<SchemaError>),

    #[error("alternative {index}: {source}")]
    InvalidAlternative {
        index: usize,
        source: Box<SchemaError>,
    },
}

impl SchemaError {
    fn in_field(self, field: &str) -> Self {
        SchemaError::Field {
            field: field.to_string(),
            source: Box::new(self),
        }
    }

    fn in_item(self, index: usize) -> Self {
        SchemaError::Item {
            index,
            source: Box::new(self),
        }
    }

    /// Dotted path to the offending value, e.g. `messages[1].role`.
    pub fn path(&self) -> String {
        let mut path = String::new();
        let mut current = self;
        loop {
            match current {
                SchemaError::Field { field, source } => {
                    if !path.is_empty() {
                        path.push('.');
                    }
                    path.push_str(field);
                    current = source;
                }
                SchemaError::Item { index, source } => {
                    path.push_str(&format!("[{}]", index));
                    current = source;
                }
                SchemaError::MissingRequired(name) => {
                    if !path.is_empty() {
                        path.push('.');
                    }
                    path.push_str(name);
                    return path;
                }
                _ => return path,
            }
        }
    }

    /// Innermost error with the path wrappers removed.
    pub fn leaf(&self) -> &SchemaError {
        match self {
            SchemaError::Field { source, .. } | SchemaError::Item { source, .. } => source.leaf(),
            other => other,
        }
    }
}

impl From<SchemaError> for UnitError {
    fn from(err: SchemaError) -> Self {
        let path = err.path();
        let unit_error = UnitError::invalid_input(err.to_string());
        if path.is_empty() {
            unit_error
        } else {
            unit_error.with_detail("path", path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorCode;
    use serde_json::json;

    fn chat_schema() -> Schema {
        Schema::object()
            .property("model", Schema::string().min_length(1))
            .property(
                "messages",
                Schema::array(
                    Schema::object()
                        .property("role", Schema::string().one_of(["system", "user", "assistant"]))
                        .property("content", Schema::string())
                        .require(["role", "content"]),
                ),
            )
            .property("temperature", Schema::number().range(0.0, 2.0))
            .property("stream", Schema::boolean())
            .require(["model", "messages"])
    }

    #[test]
    fn test_valid_payload_passes() {
        let input = json!({
            "model": "llama3",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 1,
            "extra": {"ignored": true}
        });
        assert!(chat_schema().validate(&input).is_ok());
    }

    #[test]
    fn test_required_checked_before_properties() {
        // temperature is out of range, but the missing model is reported first
        let input = json!({"messages": [], "temperature": 99});
        let err = chat_schema().validate(&input).unwrap_err();
        assert_eq!(err.to_string(), "required field \"model\" is missing");
    }

    #[test]
    fn test_numeric_widening() {
        let schema = Schema::number().range(0.0, 2.0);
        assert!(schema.validate(&json!(1)).is_ok());
        assert!(schema.validate(&json!(1.5)).is_ok());
        assert!(schema.validate(&json!(2u64)).is_ok());
        assert!(matches!(
            schema.validate(&json!(2.01)),
            Err(SchemaError::AboveMaximum { .. })
        ));
        assert!(matches!(
            schema.validate(&json!(-1)),
            Err(SchemaError::BelowMinimum { .. })
        ));
        assert!(matches!(
            schema.validate(&json!("1")),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_nested_error_path() {
        let input = json!({
            "model": "llama3",
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "robot", "content": "beep"}
            ]
        });
        let err = chat_schema().validate(&input).unwrap_err();
        assert_eq!(err.path(), "messages[1].role");
        assert!(matches!(err.leaf(), SchemaError::NotInEnum { .. }));
        assert_eq!(
            err.to_string(),
            "field \"messages\": array item 1: field \"role\": value \"robot\" is not one of the allowed values"
        );
    }

    #[test]
    fn test_null_fails_non_optional_leaves() {
        for schema in [Schema::string(), Schema::number(), Schema::boolean(), Schema::object()] {
            assert!(matches!(schema.validate(&Value::Null), Err(SchemaError::Null { .. })));
        }
        assert!(Schema::string().optional().validate(&Value::Null).is_ok());
    }

    #[test]
    fn test_pattern_must_match_whole_string() {
        let schema = Schema::string().pattern("[a-z]+-[0-9]+");
        assert!(schema.validate(&json!("gpu-0")).is_ok());
        assert!(schema.validate(&json!("xgpu-0!")).is_err());
        assert!(schema.validate(&json!("GPU-0")).is_err());
    }

    #[test]
    fn test_string_length_counts_characters() {
        let schema = Schema::string().min_length(2).max_length(3);
        assert!(schema.validate(&json!("日本")).is_ok());
        assert!(matches!(schema.validate(&json!("a")), Err(SchemaError::TooShort { .. })));
        assert!(matches!(schema.validate(&json!("abcd")), Err(SchemaError::TooLong { .. })));
    }

    #[test]
    fn test_validation_is_deterministic() {
        let schema = chat_schema();
        let input = json!({"model": 7, "messages": []});
        let first = schema.validate(&input);
        let second = schema.validate(&input);
        assert_eq!(first, second);
        assert!(first.is_err());
    }

    #[test]
    fn test_schema_check_rejects_malformed_trees() {
        let mut no_items = Schema::string_array();
        no_items.items = None;
        assert_eq!(no_items.check(), Err(SchemaError::MissingItems));

        let undeclared = Schema::object().require(["ghost"]);
        assert_eq!(
            undeclared.check(),
            Err(SchemaError::UndeclaredRequired("ghost".into()))
        );

        let bad_pattern = Schema::object().property("id", Schema::string().pattern("("));
        assert!(matches!(
            bad_pattern.check().unwrap_err().leaf(),
            SchemaError::InvalidPattern { .. }
        ));

        assert!(chat_schema().check().is_ok());
    }

    #[test]
    fn test_schema_check_rejects_default_outside_bounds() {
        let schema = Schema::object().property("limit", Schema::number().range(1.0, 10.0).default_value(50));
        assert!(matches!(
            schema.check().unwrap_err().leaf(),
            SchemaError::InvalidDefault(_)
        ));
    }

    #[test]
    fn test_alternatives_widen_accepted_values() {
        let schema = Schema::object()
            .property("input", Schema::string().or(Schema::string_array()))
            .require(["input"]);
        assert!(schema.check().is_ok());
        assert!(schema.validate(&json!({"input": "Hello world"})).is_ok());
        assert!(schema.validate(&json!({"input": ["Hello", "World"]})).is_ok());

        let err = schema.validate(&json!({"input": 42})).unwrap_err();
        assert_eq!(err.path(), "input");
        assert_eq!(
            err.leaf(),
            &SchemaError::TypeMismatch {
                expected: SchemaType::String,
                found: "number"
            }
        );
        assert!(schema.validate(&json!({"input": ["ok", 1]})).is_err());

        let broken = Schema::string().or(Schema::object().require(["ghost"]));
        assert!(matches!(broken.check(), Err(SchemaError::InvalidAlternative { index: 0, .. })));
    }

    #[test]
    fn test_apply_defaults_fills_only_absent_fields() {
        let schema = Schema::object()
            .property("limit", Schema::number().default_value(100))
            .property("offset", Schema::number().default_value(0))
            .property(
                "filters",
                Schema::array(Schema::object().property("op", Schema::string().default_value("eq"))),
            );

        let mut input = json!({"offset": 20, "filters": [{"field": "status"}, {"op": "ne"}]});
        schema.apply_defaults(&mut input);
        assert_eq!(
            input,
            json!({
                "limit": 100,
                "offset": 20,
                "filters": [{"field": "status", "op": "eq"}, {"op": "ne"}]
            })
        );

        let mut scalar = json!("untouched");
        schema.apply_defaults(&mut scalar);
        assert_eq!(scalar, json!("untouched"));
    }

    #[test]
    fn test_pattern_is_compiled_once_and_reused() {
        let schema = Schema::string().pattern("gpu-[0-9]+");
        let pattern = schema.pattern.as_ref().unwrap();
        assert!(pattern.compiled.get().is_none());

        assert!(schema.validate(&json!("gpu-1")).is_ok());
        let first: *const Regex = pattern.compiled.get().unwrap();
        assert!(schema.validate(&json!("gpu-2")).is_ok());
        let second: *const Regex = pattern.compiled.get().unwrap();
        assert_eq!(first, second);

        assert_eq!(schema, Schema::string().pattern("gpu-[0-9]+"));
        assert_eq!(serde_json::to_value(&schema).unwrap()["pattern"], "gpu-[0-9]+");
    }

    #[test]
    fn test_conversion_to_unit_error_keeps_path() {
        let err: UnitError = SchemaError::MissingRequired("severity".into()).into();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert_eq!(err.details()["path"], "severity");
        assert!(err.to_string().contains("severity"));
    }

    #[test]
    fn test_serialized_shape() {
        let schema = Schema::object()
            .property("limit", Schema::number().range(1.0, 1000.0).default_value(100))
            .property("name", Schema::string().min_length(1));
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["type"], "object");
        assert_eq!(value["properties"]["limit"]["schema"]["max"], 1000.0);
        assert_eq!(value["properties"]["name"]["schema"]["minLength"], 1);
    }
}
