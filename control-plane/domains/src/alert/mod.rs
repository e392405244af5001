// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Alert domain: rules, the `firing → acknowledged → resolved` lifecycle,
//! and the `asms://alerts/*` resources.

pub mod commands;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod model;
pub mod queries;
pub mod resources;
pub mod store;

use std::sync::Arc;

use asms_core::infrastructure::WatchConfig;
use asms_core::{SharedPublisher, UnitRegistry, UnitResult};

pub use errors::{AlertError, DOMAIN};
pub use lifecycle::AlertLifecycle;
pub use model::{Alert, AlertFilter, AlertRule, AlertSeverity, AlertStatus, RuleFilter};
pub use resources::{ActiveResource, RulesResource, ACTIVE_URI, RULES_URI};
pub use store::{AlertStore, MemoryAlertStore};

/// Register alert units and resources. The returned lifecycle is how the
/// rest of the control plane raises alerts.
pub fn register(
    registry: &UnitRegistry,
    store: Arc<dyn AlertStore>,
    events: SharedPublisher,
    watch: &WatchConfig,
) -> UnitResult<Arc<AlertLifecycle>> {
    let lifecycle = Arc::new(AlertLifecycle::new(store.clone(), events));

    registry.register_units(commands::units(&lifecycle))?;
    registry.register_units(queries::units(&lifecycle))?;

    registry.register_resource(Arc::new(RulesResource::new(
        store.clone(),
        watch.alert_rules,
        watch.channel_capacity,
    )))?;
    registry.register_resource(Arc::new(ActiveResource::new(
        store,
        watch.alert_active,
        watch.channel_capacity,
    )))?;

    Ok(lifecycle)
}
