// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Execution Context
//!
//! Per-execution helper that raises the Started / Completed / Failed
//! lifecycle events of a unit and records execution metrics.

use chrono::Utc;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::errors::UnitError;
use super::events::{emit, CorrelationScope, ExecutionEvent, ExecutionEventKind, SharedPublisher};

pub struct ExecutionContext {
    publisher: SharedPublisher,
    domain: String,
    unit_name: String,
    scope: CorrelationScope,
    execution_id: String,
    started: Instant,
}

impl ExecutionContext {
    pub fn new(publisher: SharedPublisher, domain: impl Into<String>, unit_name: impl Into<String>) -> Self {
        Self {
            publisher,
            domain: domain.into(),
            unit_name: unit_name.into(),
            scope: CorrelationScope::default(),
            execution_id: Uuid::new_v4().to_string(),
            started: Instant::now(),
        }
    }

    pub fn with_correlation(mut self, scope: CorrelationScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    pub fn publish_started(&self, input: &Value) {
        debug!(unit = %self.unit_name, "unit execution started");
        let mut event = self.event(ExecutionEventKind::ExecutionStarted);
        event.input = Some(input.clone());
        emit(&self.publisher, event.into_event());
    }

    pub fn publish_completed(&self, output: &Value) {
        let elapsed = self.started.elapsed();
        self.record("completed", elapsed.as_secs_f64());
        debug!(unit = %self.unit_name, duration_ms = elapsed.as_millis() as u64, "unit execution completed");

        let mut event = self.event(ExecutionEventKind::ExecutionCompleted);
        event.output = Some(output.clone());
        event.duration_ms = Some(elapsed.as_millis() as u64);
        emit(&self.publisher, event.into_event());
    }

    pub fn publish_failed(&self, error: &UnitError) {
        let elapsed = self.started.elapsed();
        self.record("failed", elapsed.as_secs_f64());
        if error.is_cancellation() {
            debug!(unit = %self.unit_name, code = %error.code(), "unit execution cancelled");
        } else {
            warn!(unit = %self.unit_name, code = %error.code(), error = %error, "unit execution failed");
        }

        let mut event = self.event(ExecutionEventKind::ExecutionFailed);
        event.error = Some(error.to_string());
        event.error_code = Some(error.code());
        event.duration_ms = Some(elapsed.as_millis() as u64);
        emit(&self.publisher, event.into_event());
    }

    fn event(&self, kind: ExecutionEventKind) -> ExecutionEvent {
        let correlation_id = match self.scope {
            CorrelationScope::PerEvent => Uuid::new_v4().to_string(),
            CorrelationScope::PerExecution => self.execution_id.clone(),
        };
        ExecutionEvent {
            event_type: kind,
            domain: self.domain.clone(),
            name: self.unit_name.clone(),
            input: None,
            output: None,
            error: None,
            error_code: None,
            timestamp: Utc::now(),
            correlation_id,
            duration_ms: None,
        }
    }

    fn record(&self, outcome: &'static str, seconds: f64) {
        metrics::counter!(
            "asms_unit_executions_total",
            "domain" => self.domain.clone(),
            "unit" => self.unit_name.clone(),
            "outcome" => outcome
        )
        .increment(1);
        metrics::histogram!(
            "asms_unit_execution_seconds",
            "domain" => self.domain.clone(),
            "unit" => self.unit_name.clone()
        )
        .record(seconds);
    }
}
