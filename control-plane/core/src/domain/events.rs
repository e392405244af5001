// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Events
//!
//! Immutable event records and the publisher seam. Domains raise their own
//! event types (`alert.triggered`, `service.scaled`, ...) and every unit
//! execution raises `execution_started` / `execution_completed` /
//! `execution_failed` through the [`ExecutionContext`](super::execution::ExecutionContext).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::errors::ErrorCode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub domain: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
}

impl Event {
    /// New event with a fresh correlation id and the current time.
    pub fn new(event_type: impl Into<String>, domain: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            domain: domain.into(),
            payload,
            timestamp: Utc::now(),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Sink for events. Publishing is best-effort and must not block.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: Event);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: Event) {}
}

/// Optional publisher handle; `None` means "discard".
pub type SharedPublisher = Option<Arc<dyn EventPublisher>>;

/// Publish through an optional publisher.
pub fn emit(publisher: &SharedPublisher, event: Event) {
    if let Some(publisher) = publisher {
        publisher.publish(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionEventKind {
    ExecutionStarted,
    ExecutionCompleted,
    ExecutionFailed,
}

impl ExecutionEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionEventKind::ExecutionStarted => "execution_started",
            ExecutionEventKind::ExecutionCompleted => "execution_completed",
            ExecutionEventKind::ExecutionFailed => "execution_failed",
        }
    }
}

/// How correlation ids are assigned to a unit's lifecycle events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationScope {
    /// Every event gets its own id.
    #[default]
    PerEvent,
    /// Started and the terminal event share one id.
    PerExecution,
}

/// Payload of a unit lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub event_type: ExecutionEventKind,
    pub domain: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ExecutionEvent {
    pub fn into_event(self) -> Event {
        let payload = serde_json::to_value(&self).unwrap_or(Value::Null);
        Event {
            event_type: self.event_type.as_str().to_string(),
            domain: self.domain,
            payload,
            timestamp: self.timestamp,
            correlation_id: self.correlation_id,
        }
    }
}
