// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use asms_core::application::{CountDiff, Fetch, PollSpec, SharedPoller};
use asms_core::{CallContext, Resource, ResourceFactory, ResourceOperation, Schema, Subscription, UnitError, UnitResult};

use super::backend::InferenceBackend;
use super::errors::DOMAIN;
use super::queries::{models_projection, models_schema};

pub const MODELS_URI: &str = "asms://inference/models";

async fn models_snapshot(backend: &InferenceBackend, ctx: &CallContext) -> UnitResult<Value> {
    let models = backend
        .provider()?
        .list_models(ctx, None)
        .await
        .map_err(|e| e.with_context("get models"))?;
    Ok(models_projection(&models))
}

/// Model catalogue. Watchers get `models_changed` when the number of
/// models moves, `refresh` otherwise.
pub struct ModelsResource {
    backend: Arc<InferenceBackend>,
    poller: Arc<SharedPoller>,
}

impl ModelsResource {
    pub fn new(backend: Arc<InferenceBackend>, interval: Duration, capacity: usize) -> Self {
        let source = backend.clone();
        let fetch: Fetch = Arc::new(move |ctx: CallContext| {
            let backend = source.clone();
            async move { models_snapshot(&backend, &ctx).await }.boxed()
        });
        let poller = SharedPoller::new(
            PollSpec::new(MODELS_URI, interval).with_capacity(capacity),
            Arc::new(CountDiff::new("models", ResourceOperation::ModelsChanged)),
            fetch,
        );
        Self { backend, poller }
    }

    pub fn poller(&self) -> &Arc<SharedPoller> {
        &self.poller
    }
}

#[async_trait]
impl Resource for ModelsResource {
    fn uri(&self) -> &str {
        MODELS_URI
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn schema(&self) -> Schema {
        models_schema().titled("Inference models")
    }

    async fn get(&self, ctx: &CallContext) -> UnitResult<Value> {
        models_snapshot(&self.backend, ctx).await
    }

    fn watch(self: Arc<Self>, ctx: &CallContext) -> UnitResult<Subscription> {
        Ok(self.poller.subscribe(ctx))
    }
}

/// Resolves `asms://inference/...` URIs. Every lookup of the models URI
/// yields the same resource, so its watchers share one poller.
pub struct InferenceResourceFactory {
    models: Arc<ModelsResource>,
}

impl InferenceResourceFactory {
    pub fn new(backend: Arc<InferenceBackend>, interval: Duration, capacity: usize) -> Self {
        Self {
            models: Arc::new(ModelsResource::new(backend, interval, capacity)),
        }
    }
}

impl ResourceFactory for InferenceResourceFactory {
    fn can_create(&self, uri: &str) -> bool {
        uri == MODELS_URI
    }

    fn create(&self, uri: &str) -> UnitResult<Arc<dyn Resource>> {
        if !self.can_create(uri) {
            return Err(UnitError::not_found(format!("resource not found: {uri}")));
        }
        let resource: Arc<dyn Resource> = self.models.clone();
        Ok(resource)
    }

    fn pattern(&self) -> &str {
        "asms://inference/*"
    }
}
