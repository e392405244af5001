// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Service domain: the lifecycle of model inference services
//! (`pending → starting → running → stopping → stopped`, or `failed`),
//! persisted through a [`ServiceStore`] and carried out by a
//! [`ServiceProvider`].

pub mod backend;
pub mod commands;
pub mod errors;
pub mod events;
pub mod model;
pub mod provider;
pub mod queries;
pub mod resources;
pub mod store;

use std::sync::Arc;

use asms_core::{UnitRegistry, UnitResult};

pub use backend::ServiceBackend;
pub use errors::{ServiceError, DOMAIN};
pub use model::{ModelService, Recommendation, ResourceClass, ServiceFilter, ServiceId, ServiceMetrics, ServiceStatus};
pub use provider::{MockServiceProvider, ServiceOperation, ServiceProvider};
pub use resources::{
    parse_service_uri, service_uri, ServiceResource, ServiceResourceFactory, ServiceWatchSettings,
    ServicesResource, SERVICES_URI,
};
pub use store::{MemoryServiceStore, ServiceStore};

/// Register service units, the fleet listing and the per-service factory.
pub fn register(
    registry: &UnitRegistry,
    backend: ServiceBackend,
    settings: ServiceWatchSettings,
) -> UnitResult<Arc<ServiceBackend>> {
    let backend = Arc::new(backend);
    registry.register_units(commands::units(&backend))?;
    registry.register_units(queries::units(&backend))?;

    let factory = ServiceResourceFactory::new(backend.clone(), settings);
    registry.register_resource(factory.services().clone())?;
    registry.register_factory(Arc::new(factory));
    Ok(backend)
}
