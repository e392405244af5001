// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Inference domain: a uniform command surface over an
//! [`InferenceProvider`]. Every provider call is bracketed by
//! `inference.request_*` events keyed by the caller's request id.

pub mod backend;
pub mod commands;
pub mod errors;
pub mod events;
pub mod media;
pub mod model;
pub mod provider;
pub mod queries;
pub mod resources;

use std::sync::Arc;

use asms_core::infrastructure::WatchConfig;
use asms_core::{UnitRegistry, UnitResult};

pub use backend::InferenceBackend;
pub use errors::{InferenceError, DOMAIN};
pub use model::{InferenceModel, Message, Role, Usage, Voice};
pub use provider::{InferenceProvider, MockInferenceProvider, Operation};
pub use resources::{InferenceResourceFactory, ModelsResource, MODELS_URI};

/// Register inference units and the models resource factory.
pub fn register(
    registry: &UnitRegistry,
    backend: InferenceBackend,
    watch: &WatchConfig,
) -> UnitResult<Arc<InferenceBackend>> {
    let backend = Arc::new(backend);
    registry.register_units(commands::units(&backend))?;
    registry.register_units(media::units(&backend))?;
    registry.register_units(queries::units(&backend))?;
    registry.register_factory(Arc::new(InferenceResourceFactory::new(
        backend.clone(),
        watch.inference_models,
        watch.channel_capacity,
    )));
    Ok(backend)
}
