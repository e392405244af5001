// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Service lifecycle orchestration. The store holds the record of truth;
//! the provider does the work. Every transition is persisted before the
//! provider call it guards.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use asms_core::{emit, CallContext, SharedPublisher, UnitError, UnitResult};

use super::errors::ServiceError;
use super::events;
use super::model::{ModelService, ResourceClass, ServiceStatus};
use super::provider::ServiceProvider;
use super::store::ServiceStore;

/// State shared by every service unit and resource.
#[derive(Clone)]
pub struct ServiceBackend {
    store: Arc<dyn ServiceStore>,
    provider: Option<Arc<dyn ServiceProvider>>,
    events: SharedPublisher,
}

impl ServiceBackend {
    pub fn new(
        store: Arc<dyn ServiceStore>,
        provider: Option<Arc<dyn ServiceProvider>>,
        events: SharedPublisher,
    ) -> Self {
        Self {
            store,
            provider,
            events,
        }
    }

    pub fn store(&self) -> &Arc<dyn ServiceStore> {
        &self.store
    }

    pub fn provider(&self) -> UnitResult<&Arc<dyn ServiceProvider>> {
        self.provider.as_ref().ok_or_else(|| ServiceError::ProviderNotSet.into())
    }

    pub fn events(&self) -> &SharedPublisher {
        &self.events
    }

    pub async fn get(&self, ctx: &CallContext, service_id: &str) -> UnitResult<ModelService> {
        self.store
            .get(ctx, service_id)
            .await
            .map_err(|e| e.with_context(format!("get service {service_id}")))
    }

    pub async fn create(
        &self,
        ctx: &CallContext,
        model_id: &str,
        resource_class: ResourceClass,
        replicas: u32,
        persistent: bool,
    ) -> UnitResult<ModelService> {
        let provisioned = self
            .provider()?
            .create(ctx, model_id, resource_class, replicas, persistent)
            .await
            .map_err(|e| e.with_context("create service"))?;
        let service = self
            .store
            .create(ctx, provisioned)
            .await
            .map_err(|e| e.with_context("save service"))?;

        info!(service_id = %service.id, model_id, replicas, "service created");
        emit(&self.events, events::created(&service));
        Ok(service)
    }

    /// Bring a service up. `timeout` bounds the provider call only.
    pub async fn start(&self, ctx: &CallContext, service_id: &str, timeout: Option<Duration>) -> UnitResult<ModelService> {
        let provider = self.provider()?;
        let call_ctx = match timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.child(),
        };

        let mut service = self.get(ctx, service_id).await?;
        if service.status == ServiceStatus::Running {
            if provider.is_running(ctx, service_id).await? {
                return Err(ServiceError::AlreadyRunning(service_id.to_string()).into());
            }
            warn!(service_id, "service marked running but backend is down, resyncing");
            service.status = ServiceStatus::Stopped;
            service.active_replicas = 0;
            service = self.save(ctx, service).await?;
        }

        service.status = ServiceStatus::Starting;
        service = self.save(ctx, service).await?;

        if let Err(err) = call_ctx.run(provider.start(&call_ctx, service_id)).await {
            return Err(self.mark_failed(service, err).await);
        }

        service.status = ServiceStatus::Running;
        service.active_replicas = service.replicas;
        let service = self.save(ctx, service).await?;

        info!(service_id, replicas = service.replicas, "service started");
        emit(&self.events, events::started(&service));
        Ok(service)
    }

    /// Record the failure on a detached context so it lands even when the
    /// caller's deadline is what failed the start.
    async fn mark_failed(&self, mut service: ModelService, err: UnitError) -> UnitError {
        service.status = ServiceStatus::Failed;
        service.active_replicas = 0;
        let detached = CallContext::background();
        match self.store.update(&detached, service.clone()).await {
            Ok(saved) => service = saved,
            Err(save_err) => warn!(service_id = %service.id, error = %save_err, "could not record failed start"),
        }
        warn!(service_id = %service.id, error = %err, "service start failed");
        emit(&self.events, events::failed(&service, &err));
        err.with_context(format!("start service {}", service.id))
    }

    pub async fn stop(&self, ctx: &CallContext, service_id: &str, force: bool) -> UnitResult<ModelService> {
        let provider = self.provider()?;
        let mut service = self.get(ctx, service_id).await?;
        if service.status == ServiceStatus::Stopped {
            debug!(service_id, "service already stopped");
            return Ok(service);
        }

        let previous = service.status;
        service.status = ServiceStatus::Stopping;
        service = self.save(ctx, service).await?;

        if let Err(err) = provider.stop(ctx, service_id, force).await {
            if previous == ServiceStatus::Running {
                service.status = previous;
                self.save(ctx, service).await?;
                return Err(err.with_context(format!("stop service {service_id}")));
            }
            debug!(service_id, error = %err, "ignoring stop error for service that was not running");
        }

        service.status = ServiceStatus::Stopped;
        service.active_replicas = 0;
        let service = self.save(ctx, service).await?;

        let reason = if force { "forced" } else { "requested" };
        info!(service_id, reason, "service stopped");
        emit(&self.events, events::stopped(&service, reason));
        Ok(service)
    }

    pub async fn scale(&self, ctx: &CallContext, service_id: &str, replicas: u32) -> UnitResult<ModelService> {
        let provider = self.provider()?;
        let mut service = self.get(ctx, service_id).await?;

        provider
            .scale(ctx, service_id, replicas)
            .await
            .map_err(|e| e.with_context(format!("scale service {service_id}")))?;

        let old_replicas = service.replicas;
        service.replicas = replicas;
        if service.status == ServiceStatus::Running {
            service.active_replicas = replicas;
        }
        let service = self.save(ctx, service).await?;

        info!(service_id, old_replicas, new_replicas = replicas, "service scaled");
        emit(&self.events, events::scaled(&service, old_replicas));
        Ok(service)
    }

    pub async fn delete(&self, ctx: &CallContext, service_id: &str) -> UnitResult<()> {
        self.store
            .delete(ctx, service_id)
            .await
            .map_err(|e| e.with_context(format!("delete service {service_id}")))?;
        info!(service_id, "service deleted");
        Ok(())
    }

    async fn save(&self, ctx: &CallContext, service: ModelService) -> UnitResult<ModelService> {
        let id = service.id.clone();
        self.store
            .update(ctx, service)
            .await
            .map_err(|e| e.with_context(format!("update service {id}")))
    }
}
