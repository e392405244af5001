// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Alert resources. Both are backed by a [`SharedPoller`], so any number of
//! watchers share one polling task.

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use asms_core::application::{Constant, Fetch, PollSpec, SharedPoller};
use asms_core::{CallContext, ResourceOperation, Resource, Schema, Subscription, UnitResult};

use super::errors::DOMAIN;
use super::model::RuleFilter;
use super::queries::{active_snapshot, rules_snapshot};
use super::store::AlertStore;

pub const RULES_URI: &str = "asms://alerts/rules";
pub const ACTIVE_URI: &str = "asms://alerts/active";

/// Every alert rule.
pub struct RulesResource {
    store: Arc<dyn AlertStore>,
    poller: Arc<SharedPoller>,
}

impl RulesResource {
    pub fn new(store: Arc<dyn AlertStore>, interval: Duration, capacity: usize) -> Self {
        let source = store.clone();
        let fetch: Fetch = Arc::new(move |ctx: CallContext| {
            let store = source.clone();
            async move { rules_snapshot(store.as_ref(), &ctx, RuleFilter::default()).await }.boxed()
        });
        let poller = SharedPoller::new(
            PollSpec::new(RULES_URI, interval).with_capacity(capacity),
            Arc::new(Constant(ResourceOperation::Refresh)),
            fetch,
        );
        Self { store, poller }
    }

    pub fn poller(&self) -> &Arc<SharedPoller> {
        &self.poller
    }
}

#[async_trait]
impl Resource for RulesResource {
    fn uri(&self) -> &str {
        RULES_URI
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .titled("Alert rules")
            .property("rules", Schema::array(Schema::object()))
    }

    async fn get(&self, ctx: &CallContext) -> UnitResult<Value> {
        rules_snapshot(self.store.as_ref(), ctx, RuleFilter::default()).await
    }

    fn watch(self: Arc<Self>, ctx: &CallContext) -> UnitResult<Subscription> {
        Ok(self.poller.subscribe(ctx))
    }
}

/// Firing and acknowledged alerts.
pub struct ActiveResource {
    store: Arc<dyn AlertStore>,
    poller: Arc<SharedPoller>,
}

impl ActiveResource {
    pub fn new(store: Arc<dyn AlertStore>, interval: Duration, capacity: usize) -> Self {
        let source = store.clone();
        let fetch: Fetch = Arc::new(move |ctx: CallContext| {
            let store = source.clone();
            async move { active_snapshot(store.as_ref(), &ctx).await }.boxed()
        });
        let poller = SharedPoller::new(
            PollSpec::new(ACTIVE_URI, interval).with_capacity(capacity),
            Arc::new(Constant(ResourceOperation::Update)),
            fetch,
        );
        Self { store, poller }
    }

    pub fn poller(&self) -> &Arc<SharedPoller> {
        &self.poller
    }
}

#[async_trait]
impl Resource for ActiveResource {
    fn uri(&self) -> &str {
        ACTIVE_URI
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .titled("Active alerts")
            .property("alerts", Schema::array(Schema::object()))
    }

    async fn get(&self, ctx: &CallContext) -> UnitResult<Value> {
        active_snapshot(self.store.as_ref(), ctx).await
    }

    fn watch(self: Arc<Self>, ctx: &CallContext) -> UnitResult<Subscription> {
        Ok(self.poller.subscribe(ctx))
    }
}
