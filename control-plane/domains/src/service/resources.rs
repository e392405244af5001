// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `asms://service/<id>` follows one service's status; `asms://services`
//! is the fleet listing.

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use asms_core::application::{fetch_from, spawn_poller, Constant, Fetch, FieldDiff, PollSpec, SharedPoller};
use asms_core::infrastructure::WatchConfig;
use asms_core::{
    CallContext, Resource, ResourceFactory, ResourceOperation, Schema, Subscription, UnitError, UnitResult,
};

use super::backend::ServiceBackend;
use super::errors::DOMAIN;
use super::model::ServiceFilter;
use super::queries::{detail_schema, list_projection, list_schema};

pub const SERVICES_URI: &str = "asms://services";
const SERVICE_URI_PREFIX: &str = "asms://service/";
const LIST_LIMIT: usize = 1000;

pub fn service_uri(service_id: &str) -> String {
    format!("{SERVICE_URI_PREFIX}{service_id}")
}

/// Service id addressed by `uri`, if it names a single service.
pub fn parse_service_uri(uri: &str) -> Option<&str> {
    uri.strip_prefix(SERVICE_URI_PREFIX)
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

/// Interval and channel settings for the service resources.
#[derive(Debug, Clone)]
pub struct ServiceWatchSettings {
    pub service: Duration,
    pub services: Duration,
    pub capacity: usize,
}

impl Default for ServiceWatchSettings {
    fn default() -> Self {
        Self::from(&WatchConfig::default())
    }
}

impl From<&WatchConfig> for ServiceWatchSettings {
    fn from(config: &WatchConfig) -> Self {
        Self {
            service: config.service,
            services: config.services,
            capacity: config.channel_capacity,
        }
    }
}

pub struct ServiceResource {
    uri: String,
    service_id: String,
    backend: Arc<ServiceBackend>,
    interval: Duration,
    capacity: usize,
}

impl ServiceResource {
    pub fn new(service_id: impl Into<String>, backend: Arc<ServiceBackend>, settings: &ServiceWatchSettings) -> Self {
        let service_id = service_id.into();
        Self {
            uri: service_uri(&service_id),
            service_id,
            backend,
            interval: settings.service,
            capacity: settings.capacity,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }
}

#[async_trait]
impl Resource for ServiceResource {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn schema(&self) -> Schema {
        detail_schema().describe("Model inference service")
    }

    async fn get(&self, ctx: &CallContext) -> UnitResult<Value> {
        Ok(self.backend.get(ctx, &self.service_id).await?.detail())
    }

    fn watch(self: Arc<Self>, ctx: &CallContext) -> UnitResult<Subscription> {
        let spec = PollSpec::new(self.uri.clone(), self.interval).with_capacity(self.capacity);
        let detector = Arc::new(FieldDiff::new("status", ResourceOperation::StatusChanged));
        Ok(spawn_poller(ctx, spec, detector, fetch_from(self)))
    }
}

async fn services_snapshot(backend: &ServiceBackend, ctx: &CallContext) -> UnitResult<Value> {
    let filter = ServiceFilter {
        limit: LIST_LIMIT,
        ..ServiceFilter::default()
    };
    let (services, total) = backend
        .store()
        .list(ctx, filter)
        .await
        .map_err(|e| e.with_context("list services"))?;
    Ok(list_projection(&services, total))
}

/// Every service. Watchers share one poller and get a plain `refresh`
/// each interval.
pub struct ServicesResource {
    backend: Arc<ServiceBackend>,
    poller: Arc<SharedPoller>,
}

impl ServicesResource {
    pub fn new(backend: Arc<ServiceBackend>, settings: &ServiceWatchSettings) -> Self {
        let source = backend.clone();
        let fetch: Fetch = Arc::new(move |ctx: CallContext| {
            let backend = source.clone();
            async move { services_snapshot(&backend, &ctx).await }.boxed()
        });
        let poller = SharedPoller::new(
            PollSpec::new(SERVICES_URI, settings.services).with_capacity(settings.capacity),
            Arc::new(Constant(ResourceOperation::Refresh)),
            fetch,
        );
        Self { backend, poller }
    }
}

#[async_trait]
impl Resource for ServicesResource {
    fn uri(&self) -> &str {
        SERVICES_URI
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn schema(&self) -> Schema {
        list_schema().titled("Services")
    }

    async fn get(&self, ctx: &CallContext) -> UnitResult<Value> {
        services_snapshot(&self.backend, ctx).await
    }

    fn watch(self: Arc<Self>, ctx: &CallContext) -> UnitResult<Subscription> {
        Ok(self.poller.subscribe(ctx))
    }
}

/// Resolves `asms://service/<id>` on demand. `asms://services` resolves to
/// the one shared listing resource.
pub struct ServiceResourceFactory {
    backend: Arc<ServiceBackend>,
    settings: ServiceWatchSettings,
    services: Arc<ServicesResource>,
}

impl ServiceResourceFactory {
    pub fn new(backend: Arc<ServiceBackend>, settings: ServiceWatchSettings) -> Self {
        let services = Arc::new(ServicesResource::new(backend.clone(), &settings));
        Self {
            backend,
            settings,
            services,
        }
    }

    pub fn services(&self) -> &Arc<ServicesResource> {
        &self.services
    }
}

impl ResourceFactory for ServiceResourceFactory {
    fn can_create(&self, uri: &str) -> bool {
        uri == SERVICES_URI || parse_service_uri(uri).is_some()
    }

    fn create(&self, uri: &str) -> UnitResult<Arc<dyn Resource>> {
        if uri == SERVICES_URI {
            let resource: Arc<dyn Resource> = self.services.clone();
            return Ok(resource);
        }
        let service_id = parse_service_uri(uri)
            .ok_or_else(|| UnitError::not_found(format!("resource not found: {uri}")))?;
        Ok(Arc::new(ServiceResource::new(service_id, self.backend.clone(), &self.settings)))
    }

    fn pattern(&self) -> &str {
        "asms://service/*"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::model::{ModelService, ResourceClass, ServiceStatus};
    use crate::service::provider::{MockServiceProvider, ServiceProvider};
    use crate::service::store::MemoryServiceStore;
    use asms_core::ErrorCode;

    fn factory() -> (ServiceResourceFactory, Arc<ServiceBackend>) {
        let provider: Arc<dyn ServiceProvider> = Arc::new(MockServiceProvider::new());
        let backend = Arc::new(ServiceBackend::new(
            Arc::new(MemoryServiceStore::new()),
            Some(provider),
            None,
        ));
        (
            ServiceResourceFactory::new(backend.clone(), ServiceWatchSettings::default()),
            backend,
        )
    }

    async fn seed(backend: &ServiceBackend, id: &str) -> ModelService {
        backend
            .store()
            .create(
                &CallContext::background(),
                ModelService::pending(id, "llama3", ResourceClass::Medium, 1),
            )
            .await
            .unwrap()
    }

    #[test]
    fn test_uri_resolution() {
        let (factory, _) = factory();
        assert!(factory.can_create("asms://service/svc-1"));
        assert!(factory.can_create(SERVICES_URI));
        assert!(!factory.can_create("asms://service/"));
        assert!(!factory.can_create("asms://service/a/b"));
        assert_eq!(parse_service_uri("asms://service/a/b"), None);
        assert_eq!(parse_service_uri("asms://service/svc-1/"), None);
        assert!(!factory.can_create("asms://device/gpu-0/info"));

        assert_eq!(parse_service_uri(&service_uri("svc-a")), Some("svc-a"));
        assert_eq!(factory.create("asms://service/").err().unwrap().code(), ErrorCode::NotFound);
        assert_eq!(factory.create("asms://service/a/b").err().unwrap().code(), ErrorCode::NotFound);

        let listing = factory.create(SERVICES_URI).unwrap();
        assert_eq!(listing.uri(), SERVICES_URI);
    }

    #[tokio::test]
    async fn test_get_service_and_listing() {
        let (factory, backend) = factory();
        let ctx = CallContext::background();
        seed(&backend, "svc-1").await;

        let one = factory.create("asms://service/svc-1").unwrap();
        assert_eq!(one.get(&ctx).await.unwrap()["status"], "pending");

        let all = factory.create(SERVICES_URI).unwrap().get(&ctx).await.unwrap();
        assert_eq!(all["total"], 1);

        let missing = factory.create("asms://service/svc-2").unwrap();
        assert_eq!(missing.get(&ctx).await.unwrap_err().code(), ErrorCode::ServiceNotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_transition_is_reported() {
        let (factory, backend) = factory();
        let ctx = CallContext::background();
        let mut svc = seed(&backend, "svc-1").await;

        let mut sub = factory.create("asms://service/svc-1").unwrap().watch(&ctx).unwrap();
        let first = sub.recv().await.unwrap();
        assert_eq!(first.operation, ResourceOperation::Refresh);

        svc.status = ServiceStatus::Running;
        backend.store().update(&ctx, svc).await.unwrap();

        let changed = sub.recv().await.unwrap();
        assert_eq!(changed.operation, ResourceOperation::StatusChanged);
        assert_eq!(changed.data.unwrap()["status"], "running");

        let steady = sub.recv().await.unwrap();
        assert_eq!(steady.operation, ResourceOperation::Refresh);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_service_reports_error() {
        let (factory, backend) = factory();
        let ctx = CallContext::background();
        seed(&backend, "svc-1").await;

        let mut sub = factory.create("asms://service/svc-1").unwrap().watch(&ctx).unwrap();
        sub.recv().await.unwrap();
        backend.store().delete(&ctx, "svc-1").await.unwrap();

        let update = sub.recv().await.unwrap();
        assert_eq!(update.operation, ResourceOperation::Error);
        assert!(update.data.is_none());
    }
}
