// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Per-device resources under `asms://device/<id>/{info|metrics|health}`,
//! created on demand by [`DeviceResourceFactory`].

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use asms_core::application::{fetch_from, spawn_poller, ChangeDetector, Constant, FieldDiff, PollSpec};
use asms_core::infrastructure::WatchConfig;
use asms_core::{
    emit, CallContext, Resource, ResourceFactory, ResourceOperation, Schema, SharedPublisher, Subscription,
    UnitError, UnitResult,
};

use super::backend::DeviceBackend;
use super::errors::DOMAIN;
use super::events;
use super::queries::{detail_schema, health_schema, metrics_schema};

const URI_PREFIX: &str = "asms://device/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceResourceKind {
    Info,
    Metrics,
    Health,
}

impl DeviceResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceResourceKind::Info => "info",
            DeviceResourceKind::Metrics => "metrics",
            DeviceResourceKind::Health => "health",
        }
    }
}

impl fmt::Display for DeviceResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceResourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(DeviceResourceKind::Info),
            "metrics" => Ok(DeviceResourceKind::Metrics),
            "health" => Ok(DeviceResourceKind::Health),
            _ => Err(()),
        }
    }
}

pub fn resource_uri(kind: DeviceResourceKind, device_id: &str) -> String {
    format!("{URI_PREFIX}{device_id}/{kind}")
}

/// `asms://device/<id>/<kind>` → `(kind, id)`. Anything else, including an
/// empty id or an unknown kind, is `None`.
pub fn parse_resource_uri(uri: &str) -> Option<(DeviceResourceKind, &str)> {
    let rest = uri.strip_prefix(URI_PREFIX)?;
    let (device_id, kind) = rest.split_once('/')?;
    if device_id.is_empty() || kind.contains('/') {
        return None;
    }
    Some((kind.parse().ok()?, device_id))
}

/// Polling settings shared by every device resource.
#[derive(Debug, Clone)]
pub struct DeviceWatchSettings {
    pub info: Duration,
    pub metrics: Duration,
    pub health: Duration,
    pub capacity: usize,
}

impl Default for DeviceWatchSettings {
    fn default() -> Self {
        Self::from(&WatchConfig::default())
    }
}

impl From<&WatchConfig> for DeviceWatchSettings {
    fn from(config: &WatchConfig) -> Self {
        Self {
            info: config.device_info,
            metrics: config.device_metrics,
            health: config.device_health,
            capacity: config.channel_capacity,
        }
    }
}

pub struct DeviceResource {
    uri: String,
    kind: DeviceResourceKind,
    device_id: String,
    backend: Arc<DeviceBackend>,
    settings: DeviceWatchSettings,
}

impl DeviceResource {
    pub fn new(
        kind: DeviceResourceKind,
        device_id: impl Into<String>,
        backend: Arc<DeviceBackend>,
        settings: DeviceWatchSettings,
    ) -> Self {
        let device_id = device_id.into();
        Self {
            uri: resource_uri(kind, &device_id),
            kind,
            device_id,
            backend,
            settings,
        }
    }

    pub fn kind(&self) -> DeviceResourceKind {
        self.kind
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    fn interval(&self) -> Duration {
        match self.kind {
            DeviceResourceKind::Info => self.settings.info,
            DeviceResourceKind::Metrics => self.settings.metrics,
            DeviceResourceKind::Health => self.settings.health,
        }
    }

    fn detector(&self) -> Arc<dyn ChangeDetector> {
        match self.kind {
            DeviceResourceKind::Info => Arc::new(Constant(ResourceOperation::Refresh)),
            DeviceResourceKind::Metrics => Arc::new(TemperatureAlert {
                device_id: self.device_id.clone(),
                threshold: self.backend.temperature_threshold(),
                events: self.backend.events().clone(),
            }),
            DeviceResourceKind::Health => {
                let device_id = self.device_id.clone();
                let publisher = self.backend.events().clone();
                Arc::new(
                    FieldDiff::new("status", ResourceOperation::HealthChanged).on_transition(move |old, new| {
                        let old = old.as_str().unwrap_or_default();
                        let new = new.as_str().unwrap_or_default();
                        emit(&publisher, events::health_changed(&device_id, old, new));
                    }),
                )
            }
        }
    }
}

#[async_trait]
impl Resource for DeviceResource {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn schema(&self) -> Schema {
        match self.kind {
            DeviceResourceKind::Info => detail_schema().describe("Device information resource"),
            DeviceResourceKind::Metrics => metrics_schema().describe("Device real-time metrics resource"),
            DeviceResourceKind::Health => health_schema().describe("Device health status resource"),
        }
    }

    async fn get(&self, ctx: &CallContext) -> UnitResult<Value> {
        let provider = self.backend.provider()?;
        let id = &self.device_id;
        match self.kind {
            DeviceResourceKind::Info => provider
                .get_device(ctx, id)
                .await
                .map(|d| d.detail())
                .map_err(|e| e.with_context(format!("get device {id} info"))),
            DeviceResourceKind::Metrics => provider
                .get_metrics(ctx, id)
                .await
                .map(|m| m.projection())
                .map_err(|e| e.with_context(format!("get device {id} metrics"))),
            DeviceResourceKind::Health => provider
                .get_health(ctx, id)
                .await
                .map(|h| h.projection())
                .map_err(|e| e.with_context(format!("get device {id} health"))),
        }
    }

    fn watch(self: Arc<Self>, ctx: &CallContext) -> UnitResult<Subscription> {
        let spec = PollSpec::new(self.uri.clone(), self.interval()).with_capacity(self.settings.capacity);
        let detector = self.detector();
        Ok(spawn_poller(ctx, spec, detector, fetch_from(self)))
    }
}

/// Metrics snapshots are plain updates; a temperature above the threshold
/// additionally raises `device.metrics_alert`.
struct TemperatureAlert {
    device_id: String,
    threshold: f64,
    events: SharedPublisher,
}

impl ChangeDetector for TemperatureAlert {
    fn classify(&self, snapshot: &Value) -> ResourceOperation {
        if let Some(temperature) = snapshot.get("temperature").and_then(Value::as_f64) {
            if temperature > self.threshold {
                emit(
                    &self.events,
                    events::metrics_alert(&self.device_id, "temperature", temperature, self.threshold),
                );
            }
        }
        ResourceOperation::Update
    }
}

pub struct DeviceResourceFactory {
    backend: Arc<DeviceBackend>,
    settings: DeviceWatchSettings,
}

impl DeviceResourceFactory {
    pub fn new(backend: Arc<DeviceBackend>, settings: DeviceWatchSettings) -> Self {
        Self { backend, settings }
    }
}

impl ResourceFactory for DeviceResourceFactory {
    fn can_create(&self, uri: &str) -> bool {
        parse_resource_uri(uri).is_some()
    }

    fn create(&self, uri: &str) -> UnitResult<Arc<dyn Resource>> {
        let (kind, device_id) = parse_resource_uri(uri)
            .ok_or_else(|| UnitError::invalid_input(format!("invalid device resource uri: {uri}")))?;
        Ok(Arc::new(DeviceResource::new(
            kind,
            device_id,
            self.backend.clone(),
            self.settings.clone(),
        )))
    }

    fn pattern(&self) -> &str {
        "asms://device/*"
    }
}
