// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use asms_core::Event;
use serde_json::json;

use super::errors::DOMAIN;
use super::model::DeviceInfo;

pub const EVENT_DETECTED: &str = "device.detected";
pub const EVENT_HEALTH_CHANGED: &str = "device.health_changed";
pub const EVENT_METRICS_ALERT: &str = "device.metrics_alert";

pub fn detected(device: &DeviceInfo) -> Event {
    Event::new(EVENT_DETECTED, DOMAIN, json!({ "device": device }))
}

pub fn health_changed(device_id: &str, old_status: &str, new_status: &str) -> Event {
    Event::new(
        EVENT_HEALTH_CHANGED,
        DOMAIN,
        json!({
            "device_id": device_id,
            "old_status": old_status,
            "new_status": new_status,
        }),
    )
}

pub fn metrics_alert(device_id: &str, metric: &str, value: f64, threshold: f64) -> Event {
    Event::new(
        EVENT_METRICS_ALERT,
        DOMAIN,
        json!({
            "device_id": device_id,
            "metric": metric,
            "value": value,
            "threshold": threshold,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shapes() {
        let e = health_changed("gpu-0", "healthy", "warning");
        assert_eq!(e.event_type, EVENT_HEALTH_CHANGED);
        assert_eq!(e.domain, "device");
        assert_eq!(e.payload["old_status"], "healthy");

        let a = metrics_alert("gpu-0", "temperature", 91.5, 85.0);
        let b = metrics_alert("gpu-0", "temperature", 91.5, 85.0);
        assert_eq!(a.payload["threshold"], 85.0);
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
