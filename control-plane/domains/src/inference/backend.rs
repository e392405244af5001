// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

use asms_core::{emit, CallContext, SharedPublisher, UnitResult};

use super::errors::InferenceError;
use super::events;
use super::provider::InferenceProvider;

/// State shared by every inference unit and the models resource.
#[derive(Clone)]
pub struct InferenceBackend {
    provider: Option<Arc<dyn InferenceProvider>>,
    events: SharedPublisher,
}

impl InferenceBackend {
    pub fn new(provider: Option<Arc<dyn InferenceProvider>>, events: SharedPublisher) -> Self {
        Self { provider, events }
    }

    pub fn provider(&self) -> UnitResult<&Arc<dyn InferenceProvider>> {
        self.provider
            .as_ref()
            .ok_or_else(|| InferenceError::ProviderNotSet.into())
    }

    pub fn events(&self) -> &SharedPublisher {
        &self.events
    }

    /// Run one provider request, bracketed by `inference.request_*` events
    /// keyed by the call's request id. `tokens` reads the total token count
    /// off a successful result.
    pub(crate) async fn track<T, Fut>(
        &self,
        ctx: &CallContext,
        model: &str,
        request_type: &str,
        request: Fut,
        tokens: impl FnOnce(&T) -> u64,
    ) -> UnitResult<T>
    where
        Fut: Future<Output = UnitResult<T>>,
    {
        let request_id = ctx.request_id();
        emit(&self.events, events::request_started(request_id, model, request_type));
        let started = Instant::now();

        match request.await {
            Ok(value) => {
                let total = tokens(&value);
                debug!(request_id, model, request_type, total_tokens = total, "inference request completed");
                emit(&self.events, events::request_completed(request_id, started.elapsed(), total));
                Ok(value)
            }
            Err(err) => {
                debug!(request_id, model, request_type, error = %err, "inference request failed");
                emit(&self.events, events::request_failed(request_id, &err.to_string()));
                Err(err)
            }
        }
    }
}
