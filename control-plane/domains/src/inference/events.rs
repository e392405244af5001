// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use asms_core::Event;
use serde_json::json;
use std::time::Duration;

use super::errors::DOMAIN;

pub const EVENT_REQUEST_STARTED: &str = "inference.request_started";
pub const EVENT_REQUEST_COMPLETED: &str = "inference.request_completed";
pub const EVENT_REQUEST_FAILED: &str = "inference.request_failed";

pub fn request_started(request_id: &str, model: &str, request_type: &str) -> Event {
    Event::new(
        EVENT_REQUEST_STARTED,
        DOMAIN,
        json!({
            "request_id": request_id,
            "model": model,
            "type": request_type,
        }),
    )
    .with_correlation_id(request_id)
}

pub fn request_completed(request_id: &str, elapsed: Duration, total_tokens: u64) -> Event {
    Event::new(
        EVENT_REQUEST_COMPLETED,
        DOMAIN,
        json!({
            "request_id": request_id,
            "duration_ms": elapsed.as_millis() as u64,
            "total_tokens": total_tokens,
        }),
    )
    .with_correlation_id(request_id)
}

pub fn request_failed(request_id: &str, error: &str) -> Event {
    Event::new(
        EVENT_REQUEST_FAILED,
        DOMAIN,
        json!({
            "request_id": request_id,
            "error": error,
        }),
    )
    .with_correlation_id(request_id)
}
