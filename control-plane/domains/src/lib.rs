// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Reference domains for the ASMS unit framework.
//!
//! | Domain | Shape | Units | Resources |
//! |---|---|---|---|
//! | [`alert`] | commands, queries, shared-poller resources | `alert.create_rule`, `alert.update_rule`, `alert.delete_rule`, `alert.acknowledge`, `alert.resolve`, `alert.list_rules`, `alert.history`, `alert.active` | `asms://alerts/rules`, `asms://alerts/active` |
//! | [`device`] | read-only queries, per-device resources | `device.detect`, `device.set_power_limit`, `device.info`, `device.metrics`, `device.health` | `asms://device/<id>/{info,metrics,health}` |
//! | [`inference`] | commands with streaming variants | `inference.chat`, `inference.complete`, `inference.embed`, `inference.rerank`, `inference.transcribe`, `inference.synthesize`, `inference.generate_image`, `inference.generate_video`, `inference.detect`, `inference.models`, `inference.voices` | `asms://inference/models` |
//! | [`service`] | lifecycle commands over a store | `service.create`, `service.start`, `service.stop`, `service.scale`, `service.delete`, `service.get`, `service.list`, `service.status`, `service.recommend` | `asms://services`, `asms://service/<id>` |
//!
//! [`ControlPlane::with_mocks`] wires all four onto one registry with
//! in-memory stores and mock providers.

pub mod alert;
pub mod device;
pub mod inference;
pub mod service;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use asms_core::infrastructure::RuntimeConfig;
use asms_core::{SharedPublisher, UnitRegistry, UnitResult};

/// A registry with every reference domain registered, plus the handles the
/// host needs to drive the domains directly.
pub struct ControlPlane {
    pub registry: UnitRegistry,
    pub alerts: Arc<alert::AlertLifecycle>,
    pub devices: Arc<device::DeviceBackend>,
    pub inference: Arc<inference::InferenceBackend>,
    pub services: Arc<service::ServiceBackend>,
}

/// Providers and stores the domains run on.
pub struct Backends {
    pub alert_store: Arc<dyn alert::AlertStore>,
    pub device_provider: Option<Arc<dyn device::DeviceProvider>>,
    pub inference_provider: Option<Arc<dyn inference::InferenceProvider>>,
    pub service_store: Arc<dyn service::ServiceStore>,
    pub service_provider: Option<Arc<dyn service::ServiceProvider>>,
}

impl Backends {
    /// In-memory stores and mock providers. `chunk_delay` paces mock
    /// inference streams.
    pub fn mocks(chunk_delay: Duration) -> Self {
        Self {
            alert_store: Arc::new(alert::MemoryAlertStore::new()),
            device_provider: Some(Arc::new(device::MockDeviceProvider::new())),
            inference_provider: Some(Arc::new(
                inference::MockInferenceProvider::new().with_chunk_delay(chunk_delay),
            )),
            service_store: Arc::new(service::MemoryServiceStore::new()),
            service_provider: Some(Arc::new(service::MockServiceProvider::new())),
        }
    }
}

impl ControlPlane {
    pub fn new(config: &RuntimeConfig, backends: Backends, events: SharedPublisher) -> UnitResult<Self> {
        let registry = UnitRegistry::new().with_correlation(config.events.correlation);

        let alerts = alert::register(&registry, backends.alert_store, events.clone(), &config.watch)?;
        let devices = device::register(
            &registry,
            device::DeviceBackend::new(backends.device_provider, events.clone())
                .with_temperature_threshold(config.device.temperature_alert_celsius),
            device::DeviceWatchSettings::from(&config.watch),
        )?;
        let inference = inference::register(
            &registry,
            inference::InferenceBackend::new(backends.inference_provider, events.clone()),
            &config.watch,
        )?;
        let services = service::register(
            &registry,
            service::ServiceBackend::new(backends.service_store, backends.service_provider, events),
            service::ServiceWatchSettings::from(&config.watch),
        )?;

        info!(
            units = registry.units().len(),
            resources = registry.resources().len(),
            factories = registry.factories().len(),
            "control plane registered"
        );

        Ok(Self {
            registry,
            alerts,
            devices,
            inference,
            services,
        })
    }

    pub fn with_mocks(config: &RuntimeConfig, events: SharedPublisher) -> UnitResult<Self> {
        Self::new(config, Backends::mocks(config.streaming.mock_chunk_delay), events)
    }
}
