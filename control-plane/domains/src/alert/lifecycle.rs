// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Alert lifecycle: `firing → acknowledged → resolved`, with `resolve`
//! allowed from any state. Every transition is persisted first and then
//! announced on the event publisher.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use asms_core::{emit, system_clock, CallContext, SharedClock, SharedPublisher, UnitResult};

use super::events;
use super::model::{Alert, AlertRule};
use super::store::AlertStore;

#[derive(Clone)]
pub struct AlertLifecycle {
    store: Arc<dyn AlertStore>,
    events: SharedPublisher,
    clock: SharedClock,
}

impl AlertLifecycle {
    pub fn new(store: Arc<dyn AlertStore>, events: SharedPublisher) -> Self {
        Self {
            store,
            events,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn AlertStore> {
        &self.store
    }

    pub fn events(&self) -> &SharedPublisher {
        &self.events
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Raise a firing alert for `rule` and publish `alert.triggered`.
    pub async fn trigger(
        &self,
        ctx: &CallContext,
        rule: &AlertRule,
        message: impl Into<String>,
        metrics: Option<Map<String, Value>>,
    ) -> UnitResult<Alert> {
        let mut alert = Alert::firing(rule, message, self.clock.now());
        alert.metrics = metrics;
        let alert = self
            .store
            .create_alert(ctx, alert)
            .await
            .map_err(|e| e.with_context("trigger alert"))?;
        info!(alert_id = %alert.id, rule_id = %alert.rule_id, severity = %alert.severity, "alert triggered");
        emit(&self.events, events::triggered(&alert));
        Ok(alert)
    }

    pub async fn acknowledge(&self, ctx: &CallContext, alert_id: &str) -> UnitResult<Alert> {
        let mut alert = self
            .store
            .get_alert(ctx, alert_id)
            .await
            .map_err(|e| e.with_context("get alert"))?;
        alert.acknowledge(self.clock.now());
        self.store
            .update_alert(ctx, alert.clone())
            .await
            .map_err(|e| e.with_context("acknowledge alert"))?;
        emit(&self.events, events::acknowledged(&alert));
        Ok(alert)
    }

    pub async fn resolve(&self, ctx: &CallContext, alert_id: &str) -> UnitResult<Alert> {
        let mut alert = self
            .store
            .get_alert(ctx, alert_id)
            .await
            .map_err(|e| e.with_context("get alert"))?;
        alert.resolve(self.clock.now());
        self.store
            .update_alert(ctx, alert.clone())
            .await
            .map_err(|e| e.with_context("resolve alert"))?;
        emit(&self.events, events::resolved(&alert));
        Ok(alert)
    }
}
