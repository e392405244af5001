// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Inference service orchestration seam.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use asms_core::{CallContext, UnitError, UnitResult};

use super::model::{ModelService, Recommendation, ResourceClass, ServiceId, ServiceMetrics};

#[async_trait]
pub trait ServiceProvider: Send + Sync {
    /// Provision a service. The returned record is `pending` and unsaved.
    async fn create(
        &self,
        ctx: &CallContext,
        model_id: &str,
        resource_class: ResourceClass,
        replicas: u32,
        persistent: bool,
    ) -> UnitResult<ModelService>;

    async fn start(&self, ctx: &CallContext, service_id: &str) -> UnitResult<()>;

    async fn stop(&self, ctx: &CallContext, service_id: &str, force: bool) -> UnitResult<()>;

    async fn scale(&self, ctx: &CallContext, service_id: &str, replicas: u32) -> UnitResult<()>;

    async fn get_metrics(&self, ctx: &CallContext, service_id: &str) -> UnitResult<ServiceMetrics>;

    async fn get_recommendation(
        &self,
        ctx: &CallContext,
        model_id: &str,
        hint: Option<&str>,
    ) -> UnitResult<Recommendation>;

    /// Whether the engine behind the service is actually up.
    async fn is_running(&self, ctx: &CallContext, service_id: &str) -> UnitResult<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceOperation {
    Create,
    Start,
    Stop,
    Scale,
    Metrics,
    Recommend,
}

/// In-process provider: every call succeeds with fixed figures unless a
/// failure has been injected.
pub struct MockServiceProvider {
    running: RwLock<bool>,
    start_delay: Option<Duration>,
    failures: RwLock<HashMap<ServiceOperation, UnitError>>,
}

impl Default for MockServiceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServiceProvider {
    pub fn new() -> Self {
        Self {
            running: RwLock::new(false),
            start_delay: None,
            failures: RwLock::new(HashMap::new()),
        }
    }

    /// Make `start` take this long. The wait gives up when the call
    /// context finishes.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    /// Answer for `is_running`.
    pub fn set_running(&self, running: bool) {
        *self.running.write() = running;
    }

    pub fn fail(&self, operation: ServiceOperation, err: Option<UnitError>) {
        let mut failures = self.failures.write();
        match err {
            Some(err) => failures.insert(operation, err),
            None => failures.remove(&operation),
        };
    }

    fn check(&self, operation: ServiceOperation) -> UnitResult<()> {
        match self.failures.read().get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ServiceProvider for MockServiceProvider {
    async fn create(
        &self,
        _ctx: &CallContext,
        model_id: &str,
        resource_class: ResourceClass,
        replicas: u32,
        _persistent: bool,
    ) -> UnitResult<ModelService> {
        self.check(ServiceOperation::Create)?;
        let suffix = Uuid::new_v4().simple().to_string();
        let id = ServiceId::new("mock", format!("{model_id}-{}", &suffix[..8]));
        let mut service = ModelService::pending(id.to_string(), model_id, resource_class, replicas);
        service.endpoints = vec!["http://localhost:8080".to_string()];
        Ok(service)
    }

    async fn start(&self, ctx: &CallContext, _service_id: &str) -> UnitResult<()> {
        self.check(ServiceOperation::Start)?;
        if let Some(delay) = self.start_delay {
            ctx.run(async {
                tokio::time::sleep(delay).await;
                Ok(())
            })
            .await?;
        }
        Ok(())
    }

    async fn stop(&self, _ctx: &CallContext, _service_id: &str, _force: bool) -> UnitResult<()> {
        self.check(ServiceOperation::Stop)
    }

    async fn scale(&self, _ctx: &CallContext, _service_id: &str, _replicas: u32) -> UnitResult<()> {
        self.check(ServiceOperation::Scale)
    }

    async fn get_metrics(&self, _ctx: &CallContext, _service_id: &str) -> UnitResult<ServiceMetrics> {
        self.check(ServiceOperation::Metrics)?;
        Ok(ServiceMetrics {
            requests_per_second: 100.0,
            latency_p50: 50.0,
            latency_p99: 200.0,
            total_requests: 10_000,
            error_rate: 0.01,
        })
    }

    async fn get_recommendation(
        &self,
        _ctx: &CallContext,
        _model_id: &str,
        _hint: Option<&str>,
    ) -> UnitResult<Recommendation> {
        self.check(ServiceOperation::Recommend)?;
        Ok(Recommendation {
            resource_class: ResourceClass::Medium,
            replicas: 2,
            expected_throughput: 100.0,
            engine_type: "mock".to_string(),
            device_type: "gpu".to_string(),
            reason: "default recommendation".to_string(),
        })
    }

    async fn is_running(&self, _ctx: &CallContext, _service_id: &str) -> UnitResult<bool> {
        Ok(*self.running.read())
    }
}
