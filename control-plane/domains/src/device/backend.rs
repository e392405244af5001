// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;

use asms_core::{CallContext, SharedPublisher, UnitResult};

use super::errors::DeviceError;
use super::model::DeviceInfo;
use super::provider::DeviceProvider;

/// State shared by every device unit and resource.
#[derive(Clone)]
pub struct DeviceBackend {
    provider: Option<Arc<dyn DeviceProvider>>,
    events: SharedPublisher,
    temperature_threshold: f64,
}

impl DeviceBackend {
    pub fn new(provider: Option<Arc<dyn DeviceProvider>>, events: SharedPublisher) -> Self {
        Self {
            provider,
            events,
            temperature_threshold: 85.0,
        }
    }

    /// Celsius above which the metrics resource raises `device.metrics_alert`.
    pub fn with_temperature_threshold(mut self, celsius: f64) -> Self {
        self.temperature_threshold = celsius;
        self
    }

    pub fn provider(&self) -> UnitResult<&Arc<dyn DeviceProvider>> {
        self.provider.as_ref().ok_or_else(|| DeviceError::ProviderNotSet.into())
    }

    pub fn events(&self) -> &SharedPublisher {
        &self.events
    }

    pub fn temperature_threshold(&self) -> f64 {
        self.temperature_threshold
    }

    pub(crate) async fn detect(&self, ctx: &CallContext) -> UnitResult<Vec<DeviceInfo>> {
        self.provider()?
            .detect(ctx)
            .await
            .map_err(|e| e.with_context("detect devices"))
    }

    /// Explicit id, or the first detected device.
    pub(crate) async fn resolve_device_id(&self, ctx: &CallContext, device_id: Option<&str>) -> UnitResult<String> {
        if let Some(id) = device_id {
            return Ok(id.to_string());
        }
        let devices = self.detect(ctx).await?;
        devices
            .into_iter()
            .next()
            .map(|d| d.id)
            .ok_or_else(|| DeviceError::NoDevices.into())
    }
}
