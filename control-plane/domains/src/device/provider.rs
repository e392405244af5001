// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Device backend seam. Real drivers live outside this crate; the mock
//! backs tests and the CLI demo.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use asms_core::{CallContext, UnitError, UnitResult};

use super::errors::DeviceError;
use super::model::{DeviceHealth, DeviceInfo, DeviceMetrics};

#[async_trait]
pub trait DeviceProvider: Send + Sync {
    async fn detect(&self, ctx: &CallContext) -> UnitResult<Vec<DeviceInfo>>;

    async fn get_device(&self, ctx: &CallContext, device_id: &str) -> UnitResult<DeviceInfo>;

    async fn get_metrics(&self, ctx: &CallContext, device_id: &str) -> UnitResult<DeviceMetrics>;

    async fn get_health(&self, ctx: &CallContext, device_id: &str) -> UnitResult<DeviceHealth>;

    async fn set_power_limit(&self, ctx: &CallContext, device_id: &str, limit_watts: f64) -> UnitResult<()>;
}

struct MockState {
    devices: Vec<DeviceInfo>,
    metrics: DeviceMetrics,
    health: DeviceHealth,
    metrics_by_device: HashMap<String, DeviceMetrics>,
    health_by_device: HashMap<String, UnitResult<DeviceHealth>>,
    failure: Option<UnitError>,
    power_limit: Option<(String, f64)>,
}

/// In-memory provider with one `gpu-0` device by default.
pub struct MockDeviceProvider {
    state: RwLock<MockState>,
}

impl Default for MockDeviceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDeviceProvider {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockState {
                devices: vec![DeviceInfo {
                    id: "gpu-0".to_string(),
                    name: "Mock GPU".to_string(),
                    vendor: "MockVendor".to_string(),
                    device_type: "gpu".to_string(),
                    architecture: "mock-arch".to_string(),
                    memory: 24564,
                    capabilities: vec!["cuda".to_string(), "tensor".to_string()],
                }],
                metrics: DeviceMetrics {
                    utilization: 50.0,
                    temperature: 60.0,
                    power: 200.0,
                    memory_used: 8_192_000_000,
                    memory_total: 24_564_000_000,
                },
                health: DeviceHealth::healthy(),
                metrics_by_device: HashMap::new(),
                health_by_device: HashMap::new(),
                failure: None,
                power_limit: None,
            }),
        }
    }

    pub fn with_devices(self, devices: Vec<DeviceInfo>) -> Self {
        self.state.write().devices = devices;
        self
    }

    pub fn set_devices(&self, devices: Vec<DeviceInfo>) {
        self.state.write().devices = devices;
    }

    /// Metrics reported for every device without an override.
    pub fn set_metrics(&self, metrics: DeviceMetrics) {
        self.state.write().metrics = metrics;
    }

    pub fn set_device_metrics(&self, device_id: impl Into<String>, metrics: DeviceMetrics) {
        self.state.write().metrics_by_device.insert(device_id.into(), metrics);
    }

    pub fn set_health(&self, health: DeviceHealth) {
        self.state.write().health = health;
    }

    /// Per-device health, or a per-device failure.
    pub fn set_device_health(&self, device_id: impl Into<String>, health: UnitResult<DeviceHealth>) {
        self.state.write().health_by_device.insert(device_id.into(), health);
    }

    /// Every call fails with `err` until cleared with `None`.
    pub fn fail_with(&self, err: Option<UnitError>) {
        self.state.write().failure = err;
    }

    pub fn last_power_limit(&self) -> Option<(String, f64)> {
        self.state.read().power_limit.clone()
    }

    fn check(&self) -> UnitResult<()> {
        match &self.state.read().failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DeviceProvider for MockDeviceProvider {
    async fn detect(&self, _ctx: &CallContext) -> UnitResult<Vec<DeviceInfo>> {
        self.check()?;
        Ok(self.state.read().devices.clone())
    }

    async fn get_device(&self, _ctx: &CallContext, device_id: &str) -> UnitResult<DeviceInfo> {
        self.check()?;
        self.state
            .read()
            .devices
            .iter()
            .find(|d| d.id == device_id)
            .cloned()
            .ok_or_else(|| DeviceError::NotFound(device_id.to_string()).into())
    }

    async fn get_metrics(&self, _ctx: &CallContext, device_id: &str) -> UnitResult<DeviceMetrics> {
        self.check()?;
        let state = self.state.read();
        Ok(state
            .metrics_by_device
            .get(device_id)
            .copied()
            .unwrap_or(state.metrics))
    }

    async fn get_health(&self, _ctx: &CallContext, device_id: &str) -> UnitResult<DeviceHealth> {
        self.check()?;
        let state = self.state.read();
        match state.health_by_device.get(device_id) {
            Some(result) => result.clone(),
            None => Ok(state.health.clone()),
        }
    }

    async fn set_power_limit(&self, _ctx: &CallContext, device_id: &str, limit_watts: f64) -> UnitResult<()> {
        self.check()?;
        self.state.write().power_limit = Some((device_id.to_string(), limit_watts));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::model::HealthStatus;
    use asms_core::ErrorCode;

    #[tokio::test]
    async fn test_mock_defaults() {
        let provider = MockDeviceProvider::new();
        let ctx = CallContext::background();

        let devices = provider.detect(&ctx).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "gpu-0");
        assert_eq!(devices[0].capabilities, vec!["cuda", "tensor"]);

        let metrics = provider.get_metrics(&ctx, "gpu-0").await.unwrap();
        assert_eq!(metrics.memory_total, 24_564_000_000);
        assert_eq!(provider.get_health(&ctx, "gpu-0").await.unwrap().status, HealthStatus::Healthy);

        let err = provider.get_device(&ctx, "gpu-9").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DeviceNotFound);
    }

    #[tokio::test]
    async fn test_injected_failure_and_power_limit() {
        let provider = MockDeviceProvider::new();
        let ctx = CallContext::background();

        provider.set_power_limit(&ctx, "gpu-0", 250.0).await.unwrap();
        assert_eq!(provider.last_power_limit(), Some(("gpu-0".to_string(), 250.0)));

        provider.fail_with(Some(DeviceError::Unreachable("gpu-0".into()).into()));
        let err = provider.detect(&ctx).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DeviceUnreachable);

        provider.fail_with(None);
        assert!(provider.detect(&ctx).await.is_ok());
    }
}
