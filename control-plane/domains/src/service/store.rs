// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Service persistence contract and the in-memory store.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use asms_core::{system_clock, CallContext, SharedClock, UnitResult};

use super::errors::ServiceError;
use super::model::{ModelService, ServiceFilter};

#[async_trait]
pub trait ServiceStore: Send + Sync {
    /// Stamps both timestamps. Fails when the id is taken.
    async fn create(&self, ctx: &CallContext, service: ModelService) -> UnitResult<ModelService>;

    async fn get(&self, ctx: &CallContext, id: &str) -> UnitResult<ModelService>;

    async fn get_by_name(&self, ctx: &CallContext, name: &str) -> UnitResult<ModelService>;

    /// Filtered window plus the total number of matches before pagination.
    async fn list(&self, ctx: &CallContext, filter: ServiceFilter) -> UnitResult<(Vec<ModelService>, usize)>;

    /// Replaces the record and restamps `updated_at`.
    async fn update(&self, ctx: &CallContext, service: ModelService) -> UnitResult<ModelService>;

    async fn delete(&self, ctx: &CallContext, id: &str) -> UnitResult<()>;
}

pub struct MemoryServiceStore {
    services: RwLock<HashMap<String, ModelService>>,
    clock: SharedClock,
}

impl Default for MemoryServiceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServiceStore {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl ServiceStore for MemoryServiceStore {
    async fn create(&self, _ctx: &CallContext, mut service: ModelService) -> UnitResult<ModelService> {
        let mut services = self.services.write();
        if services.contains_key(&service.id) {
            return Err(ServiceError::AlreadyExists(service.id).into());
        }
        let now = self.clock.now();
        service.created_at = now;
        service.updated_at = now;
        services.insert(service.id.clone(), service.clone());
        Ok(service)
    }

    async fn get(&self, _ctx: &CallContext, id: &str) -> UnitResult<ModelService> {
        self.services
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(id.to_string()).into())
    }

    async fn get_by_name(&self, _ctx: &CallContext, name: &str) -> UnitResult<ModelService> {
        self.services
            .read()
            .values()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(name.to_string()).into())
    }

    async fn list(&self, _ctx: &CallContext, filter: ServiceFilter) -> UnitResult<(Vec<ModelService>, usize)> {
        let mut matched: Vec<ModelService> = self
            .services
            .read()
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let total = matched.len();
        let start = filter.offset.min(total);
        let end = match filter.limit {
            0 => total,
            limit => start.saturating_add(limit).min(total),
        };
        Ok((matched.drain(start..end).collect(), total))
    }

    async fn update(&self, _ctx: &CallContext, mut service: ModelService) -> UnitResult<ModelService> {
        let mut services = self.services.write();
        let Some(slot) = services.get_mut(&service.id) else {
            return Err(ServiceError::NotFound(service.id).into());
        };
        service.updated_at = self.clock.now();
        *slot = service.clone();
        Ok(service)
    }

    async fn delete(&self, _ctx: &CallContext, id: &str) -> UnitResult<()> {
        match self.services.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(id.to_string()).into()),
        }
    }
}
