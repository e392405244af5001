// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use asms_core::{Event, UnitError};
use serde_json::json;

use super::errors::DOMAIN;
use super::model::ModelService;

pub const EVENT_CREATED: &str = "service.created";
pub const EVENT_STARTED: &str = "service.started";
pub const EVENT_STOPPED: &str = "service.stopped";
pub const EVENT_SCALED: &str = "service.scaled";
pub const EVENT_FAILED: &str = "service.failed";

pub fn created(service: &ModelService) -> Event {
    Event::new(
        EVENT_CREATED,
        DOMAIN,
        json!({
            "service_id": service.id,
            "model_id": service.model_id,
            "status": service.status.as_str(),
            "replicas": service.replicas,
            "resource_class": service.resource_class.as_str(),
        }),
    )
}

pub fn started(service: &ModelService) -> Event {
    Event::new(
        EVENT_STARTED,
        DOMAIN,
        json!({
            "service_id": service.id,
            "model_id": service.model_id,
            "status": service.status.as_str(),
            "replicas": service.replicas,
            "endpoints": service.endpoints,
        }),
    )
}

pub fn stopped(service: &ModelService, reason: &str) -> Event {
    Event::new(
        EVENT_STOPPED,
        DOMAIN,
        json!({
            "service_id": service.id,
            "model_id": service.model_id,
            "status": service.status.as_str(),
            "reason": reason,
        }),
    )
}

pub fn scaled(service: &ModelService, old_replicas: u32) -> Event {
    Event::new(
        EVENT_SCALED,
        DOMAIN,
        json!({
            "service_id": service.id,
            "model_id": service.model_id,
            "old_replicas": old_replicas,
            "new_replicas": service.replicas,
        }),
    )
}

pub fn failed(service: &ModelService, error: &UnitError) -> Event {
    Event::new(
        EVENT_FAILED,
        DOMAIN,
        json!({
            "service_id": service.id,
            "model_id": service.model_id,
            "status": service.status.as_str(),
            "error": error.to_string(),
            "error_code": error.code().as_str(),
        }),
    )
}
