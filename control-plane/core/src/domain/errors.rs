// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Unit Error Taxonomy
//!
//! Every unit, store, provider and runtime in the control plane reports
//! failures as a [`UnitError`]. The error carries a stable [`ErrorCode`]
//! which is what callers dispatch on; messages and context phrases are free
//! text for humans.
//!
//! ```
//! use asms_core::domain::errors::{ErrorCode, UnitError};
//!
//! let err = UnitError::not_found("rule not found").with_context("delete rule r-1");
//! assert!(err.is(&UnitError::not_found("anything")));
//! assert_eq!(err.to_string(), "delete rule r-1: [not_found] rule not found");
//! assert_eq!(err.code(), ErrorCode::NotFound);
//! ```

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

pub type UnitResult<T> = Result<T, UnitError>;

/// Stable, transport-visible error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input
    InvalidInput,
    ValidationFailed,
    InferenceInvalidParams,

    // Resource
    NotFound,
    AlreadyExists,
    DeviceNotFound,
    AlertRuleNotFound,
    AlertNotFound,
    ServiceNotFound,
    InferenceModelNotLoaded,

    // Operation
    Timeout,
    RateLimited,
    Cancelled,
    DeadlineExceeded,
    InferenceEngineError,
    InferenceTimeout,
    InferenceRateLimited,
    ServiceStartFailed,
    ServiceScaleFailed,
    DeviceUnreachable,
    DeviceMetricsError,

    // Internal
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::ValidationFailed => "validation_failed",
            ErrorCode::InferenceInvalidParams => "inference_invalid_params",
            ErrorCode::NotFound => "not_found",
            ErrorCode::AlreadyExists => "already_exists",
            ErrorCode::DeviceNotFound => "device_not_found",
            ErrorCode::AlertRuleNotFound => "alert_rule_not_found",
            ErrorCode::AlertNotFound => "alert_not_found",
            ErrorCode::ServiceNotFound => "service_not_found",
            ErrorCode::InferenceModelNotLoaded => "inference_model_not_loaded",
            ErrorCode::Timeout => "timeout",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::DeadlineExceeded => "deadline_exceeded",
            ErrorCode::InferenceEngineError => "inference_engine_error",
            ErrorCode::InferenceTimeout => "inference_timeout",
            ErrorCode::InferenceRateLimited => "inference_rate_limited",
            ErrorCode::ServiceStartFailed => "service_start_failed",
            ErrorCode::ServiceScaleFailed => "service_scale_failed",
            ErrorCode::DeviceUnreachable => "device_unreachable",
            ErrorCode::DeviceMetricsError => "device_metrics_error",
            ErrorCode::InternalError => "internal_error",
        }
    }

    /// How a transport should surface this code.
    pub fn status_class(&self) -> StatusClass {
        match self {
            ErrorCode::InvalidInput
            | ErrorCode::ValidationFailed
            | ErrorCode::InferenceInvalidParams => StatusClass::BadRequest,
            ErrorCode::NotFound
            | ErrorCode::DeviceNotFound
            | ErrorCode::AlertRuleNotFound
            | ErrorCode::AlertNotFound
            | ErrorCode::ServiceNotFound => StatusClass::NotFound,
            ErrorCode::AlreadyExists => StatusClass::Conflict,
            _ => StatusClass::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse response shape a transport maps an error onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    BadRequest,
    NotFound,
    Conflict,
    Internal,
}

impl StatusClass {
    pub fn http_status(&self) -> u16 {
        match self {
            StatusClass::BadRequest => 400,
            StatusClass::NotFound => 404,
            StatusClass::Conflict => 409,
            StatusClass::Internal => 500,
        }
    }
}

/// Tagged error value returned by every unit.
///
/// Equality is by code only: a context phrase added while the error travels
/// up the stack never changes what a caller's dispatch check sees.
#[derive(Debug, Clone)]
pub struct UnitError {
    code: ErrorCode,
    domain: Option<String>,
    message: String,
    context: Vec<String>,
    details: Map<String, Value>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl UnitError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            domain: None,
            message: message.into(),
            context: Vec::new(),
            details: Map::new(),
            source: None,
        }
    }

    /// Error tagged with the domain that raised it, for transport routing.
    pub fn in_domain(domain: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message).with_domain(domain)
    }

    /// Wrap a foreign error under a code.
    pub fn wrap<E>(source: E, code: ErrorCode, message: impl Into<String>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::new(code, message).with_source(source)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyExists, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "context canceled")
    }

    pub fn deadline_exceeded() -> Self {
        Self::new(ErrorCode::DeadlineExceeded, "context deadline exceeded")
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Prepend a context phrase, e.g. `"create rule"`.
    pub fn with_context(mut self, phrase: impl Into<String>) -> Self {
        self.context.insert(0, phrase.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &[String] {
        &self.context
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// Identity check by code.
    pub fn is(&self, other: &UnitError) -> bool {
        self.code == other.code
    }

    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.code == code
    }

    pub fn status_class(&self) -> StatusClass {
        self.code.status_class()
    }

    pub fn http_status(&self) -> u16 {
        self.status_class().http_status()
    }

    pub fn is_not_found(&self) -> bool {
        self.status_class() == StatusClass::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.code == ErrorCode::AlreadyExists
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::Timeout | ErrorCode::InferenceTimeout | ErrorCode::DeadlineExceeded
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.code, ErrorCode::RateLimited | ErrorCode::InferenceRateLimited)
    }

    /// True for the two errors a cancelled or expired call context yields.
    pub fn is_cancellation(&self) -> bool {
        matches!(self.code, ErrorCode::Cancelled | ErrorCode::DeadlineExceeded)
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code,
            message: self.to_string(),
            domain: self.domain.clone(),
        }
    }
}

impl PartialEq for UnitError {
    fn eq(&self, other: &Self) -> bool {
        self.is(other)
    }
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for phrase in &self.context {
            write!(f, "{}: ", phrase)?;
        }
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for UnitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl Serialize for UnitError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("UnitError", 4)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.to_string())?;
        state.serialize_field("domain", &self.domain)?;
        state.serialize_field("details", &self.details)?;
        state.end()
    }
}

/// What a transport hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_survives_context_wrapping() {
        let base = UnitError::in_domain("alert", ErrorCode::AlertRuleNotFound, "alert rule not found");
        let wrapped = base.clone().with_context("get rule r-9").with_context("update rule");

        assert!(wrapped.is(&base));
        assert_eq!(wrapped, base);
        assert_eq!(wrapped.domain(), Some("alert"));
        assert_eq!(
            wrapped.to_string(),
            "update rule: get rule r-9: [alert_rule_not_found] alert rule not found"
        );
    }

    #[test]
    fn test_different_codes_are_not_equal() {
        assert_ne!(UnitError::not_found("x"), UnitError::already_exists("x"));
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(UnitError::invalid_input("bad").http_status(), 400);
        assert_eq!(UnitError::new(ErrorCode::ServiceNotFound, "gone").http_status(), 404);
        assert_eq!(UnitError::already_exists("dup").http_status(), 409);
        assert_eq!(UnitError::new(ErrorCode::InferenceTimeout, "slow").http_status(), 500);
        assert_eq!(UnitError::internal("boom").status_class(), StatusClass::Internal);
    }

    #[test]
    fn test_predicates() {
        assert!(UnitError::new(ErrorCode::DeviceNotFound, "").is_not_found());
        assert!(UnitError::deadline_exceeded().is_timeout());
        assert!(UnitError::deadline_exceeded().is_cancellation());
        assert!(UnitError::new(ErrorCode::InferenceRateLimited, "").is_rate_limited());
        assert!(!UnitError::internal("").is_cancellation());
    }

    #[test]
    fn test_wrapped_source_is_rendered_and_exposed() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = UnitError::wrap(io, ErrorCode::InternalError, "save failed");

        assert_eq!(err.to_string(), "[internal_error] save failed: disk on fire");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_payload_serialization() {
        let err = UnitError::in_domain("device", ErrorCode::DeviceNotFound, "device not found");
        let payload = serde_json::to_value(err.to_payload()).unwrap();

        assert_eq!(payload["code"], "device_not_found");
        assert_eq!(payload["domain"], "device");
        assert_eq!(payload["message"], "[device_not_found] device not found");
    }
}
