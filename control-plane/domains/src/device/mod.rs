// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Device domain: read-only hardware inventory, telemetry and health behind
//! a [`DeviceProvider`]. The only mutation is `device.set_power_limit`.

pub mod backend;
pub mod commands;
pub mod errors;
pub mod events;
pub mod model;
pub mod provider;
pub mod queries;
pub mod resources;

use std::sync::Arc;

use asms_core::{UnitRegistry, UnitResult};

pub use backend::DeviceBackend;
pub use errors::{DeviceError, DOMAIN};
pub use model::{DeviceHealth, DeviceInfo, DeviceMetrics, HealthStatus};
pub use provider::{DeviceProvider, MockDeviceProvider};
pub use resources::{
    parse_resource_uri, resource_uri, DeviceResource, DeviceResourceFactory, DeviceResourceKind,
    DeviceWatchSettings,
};

/// Register device units and the per-device resource factory.
pub fn register(
    registry: &UnitRegistry,
    backend: DeviceBackend,
    settings: DeviceWatchSettings,
) -> UnitResult<Arc<DeviceBackend>> {
    let backend = Arc::new(backend);
    registry.register_units(commands::units(&backend))?;
    registry.register_units(queries::units(&backend))?;
    registry.register_factory(Arc::new(DeviceResourceFactory::new(backend.clone(), settings)));
    Ok(backend)
}
