// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Resources
//!
//! A resource is a pollable, watchable view addressed by an `asms://` URI.
//! `get` returns a snapshot; `watch` hands back a [`Subscription`] whose
//! channel is fed by a poller until the caller's context is cancelled or
//! the subscription is dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::context::CallContext;
use super::errors::{UnitError, UnitResult};
use super::schema::Schema;

pub const URI_SCHEME: &str = "asms://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceOperation {
    Refresh,
    Update,
    StatusChanged,
    HealthChanged,
    ModelsChanged,
    Error,
}

impl ResourceOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceOperation::Refresh => "refresh",
            ResourceOperation::Update => "update",
            ResourceOperation::StatusChanged => "status_changed",
            ResourceOperation::HealthChanged => "health_changed",
            ResourceOperation::ModelsChanged => "models_changed",
            ResourceOperation::Error => "error",
        }
    }
}

impl fmt::Display for ResourceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceUpdate {
    pub uri: String,
    pub timestamp: DateTime<Utc>,
    pub operation: ResourceOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<UnitError>,
}

impl ResourceUpdate {
    pub fn new(uri: impl Into<String>, operation: ResourceOperation, data: Value) -> Self {
        Self {
            uri: uri.into(),
            timestamp: Utc::now(),
            operation,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(uri: impl Into<String>, error: UnitError) -> Self {
        Self {
            uri: uri.into(),
            timestamp: Utc::now(),
            operation: ResourceOperation::Error,
            data: None,
            error: Some(error),
        }
    }
}

#[async_trait]
pub trait Resource: Send + Sync {
    fn uri(&self) -> &str;

    fn domain(&self) -> &str;

    fn schema(&self) -> Schema;

    async fn get(&self, ctx: &CallContext) -> UnitResult<Value>;

    fn watch(self: Arc<Self>, ctx: &CallContext) -> UnitResult<Subscription>;
}

/// Builds resources for URIs that carry an id, e.g. `asms://service/<id>`.
pub trait ResourceFactory: Send + Sync {
    fn can_create(&self, uri: &str) -> bool;

    fn create(&self, uri: &str) -> UnitResult<Arc<dyn Resource>>;

    /// Glob-ish pattern for listings, e.g. `asms://device/*`.
    fn pattern(&self) -> &str;
}

/// Live watch. Dropping it (or calling [`unsubscribe`](Self::unsubscribe))
/// stops the poller, after which the channel drains and closes.
#[derive(Debug)]
pub struct Subscription {
    uri: String,
    receiver: mpsc::Receiver<ResourceUpdate>,
    token: CancellationToken,
}

impl Subscription {
    pub fn new(uri: impl Into<String>, receiver: mpsc::Receiver<ResourceUpdate>, token: CancellationToken) -> Self {
        Self {
            uri: uri.into(),
            receiver,
            token,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Next update, or `None` once the watch has ended.
    pub async fn recv(&mut self) -> Option<ResourceUpdate> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ResourceUpdate> {
        self.receiver.try_recv().ok()
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn unsubscribe(self) {
        self.token.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_serialization() {
        let update = ResourceUpdate::new("asms://alerts/rules", ResourceOperation::Refresh, json!({"rules": []}));
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["operation"], "refresh");
        assert!(value.get("error").is_none());

        let failed = ResourceUpdate::failed("asms://services", UnitError::internal("store offline"));
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["operation"], "error");
        assert_eq!(value["error"]["code"], "internal_error");
    }

    #[tokio::test]
    async fn test_subscription_drop_cancels_token() {
        let (_tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let sub = Subscription::new("asms://services", rx, token.clone());
        assert!(sub.is_active());
        sub.unsubscribe();
        assert!(token.is_cancelled());
    }
}
