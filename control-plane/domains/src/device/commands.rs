// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use asms_core::{emit, CallContext, Example, Input, Schema, Unit, UnitResult};

use super::backend::DeviceBackend;
use super::errors::DeviceError;
use super::events;

pub fn units(backend: &Arc<DeviceBackend>) -> Vec<Unit> {
    vec![detect_unit(backend), set_power_limit_unit(backend)]
}

fn detect_unit(backend: &Arc<DeviceBackend>) -> Unit {
    let device = Schema::object()
        .property("id", Schema::string())
        .property("name", Schema::string())
        .property("vendor", Schema::string())
        .property("type", Schema::string())
        .property("memory", Schema::number())
        .property("architecture", Schema::string());

    Unit::command("device.detect", "Detect hardware devices on the system")
        .output(Schema::object().property("devices", Schema::array(device)))
        .example(Example::new(
            "Detect all hardware devices",
            json!({}),
            json!({"devices": [{
                "id": "gpu-0",
                "name": "NVIDIA RTX 4090",
                "vendor": "NVIDIA",
                "type": "gpu",
                "memory": 24564
            }]}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), detect)
}

async fn detect(backend: Arc<DeviceBackend>, ctx: CallContext, _input: Input) -> UnitResult<Value> {
    let devices = backend.detect(&ctx).await?;
    info!(count = devices.len(), "devices detected");
    for device in &devices {
        emit(backend.events(), events::detected(device));
    }
    let devices: Vec<Value> = devices.iter().map(|d| d.summary()).collect();
    Ok(json!({ "devices": devices }))
}

fn set_power_limit_unit(backend: &Arc<DeviceBackend>) -> Unit {
    Unit::command("device.set_power_limit", "Set power consumption limit for a device")
        .input(
            Schema::object()
                .property("device_id", Schema::string().describe("Device identifier"))
                .property(
                    "limit_watts",
                    Schema::number().min(0.0).describe("Power limit in watts"),
                )
                .require(["device_id", "limit_watts"]),
        )
        .output(Schema::object().property("success", Schema::boolean()))
        .example(Example::new(
            "Set power limit to 250 watts for gpu-0",
            json!({"device_id": "gpu-0", "limit_watts": 250.0}),
            json!({"success": true}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), set_power_limit)
}

async fn set_power_limit(backend: Arc<DeviceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let provider = backend.provider()?;
    let device_id = input.non_empty_str("device_id").ok_or(DeviceError::InvalidDeviceId)?;
    let limit_watts = input
        .f64("limit_watts")
        .filter(|watts| *watts > 0.0)
        .ok_or(DeviceError::InvalidPowerLimit)?;

    provider
        .set_power_limit(&ctx, device_id, limit_watts)
        .await
        .map_err(|e| e.with_context(format!("set power limit for device {device_id}")))?;
    info!(device_id, limit_watts, "power limit set");
    Ok(json!({ "success": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::provider::{DeviceProvider, MockDeviceProvider};
    use asms_core::infrastructure::EventRecorder;
    use asms_core::{ErrorCode, UnitRegistry};

    fn setup(provider: Option<Arc<MockDeviceProvider>>) -> (UnitRegistry, Arc<EventRecorder>) {
        let recorder = Arc::new(EventRecorder::new());
        let provider = provider.map(|p| p as Arc<dyn DeviceProvider>);
        let backend = Arc::new(DeviceBackend::new(provider, Some(recorder.clone())));
        let registry = UnitRegistry::new();
        registry.register_units(units(&backend)).unwrap();
        (registry, recorder)
    }

    #[tokio::test]
    async fn test_detect_lists_devices_and_publishes_per_device() {
        let (registry, recorder) = setup(Some(Arc::new(MockDeviceProvider::new())));
        let out = registry
            .execute(&CallContext::background(), "device.detect", json!({}))
            .await
            .unwrap();
        assert_eq!(out["devices"][0]["id"], "gpu-0");
        assert_eq!(out["devices"][0]["type"], "gpu");
        assert_eq!(out["devices"][0]["memory"], 24564);

        let detected = recorder.of_type(events::EVENT_DETECTED);
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].payload["device"]["name"], "Mock GPU");
    }

    #[tokio::test]
    async fn test_detect_without_provider() {
        let (registry, _) = setup(None);
        let err = registry
            .execute(&CallContext::background(), "device.detect", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(err.to_string().contains("device provider not set"));
    }

    #[tokio::test]
    async fn test_set_power_limit_validation() {
        let mock = Arc::new(MockDeviceProvider::new());
        let (registry, _) = setup(Some(mock.clone()));
        let ctx = CallContext::background();

        let out = registry
            .execute(&ctx, "device.set_power_limit", json!({"device_id": "gpu-0", "limit_watts": 250}))
            .await
            .unwrap();
        assert_eq!(out, json!({"success": true}));
        assert_eq!(mock.last_power_limit(), Some(("gpu-0".to_string(), 250.0)));

        let err = registry
            .execute(&ctx, "device.set_power_limit", json!({"device_id": "", "limit_watts": 250}))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "invalid device id");

        let err = registry
            .execute(&ctx, "device.set_power_limit", json!({"device_id": "gpu-0", "limit_watts": 0}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert_eq!(err.message(), "invalid power limit");

        let err = registry
            .execute(&ctx, "device.set_power_limit", json!({"device_id": "gpu-0", "limit_watts": "high"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_set_power_limit_provider_error_keeps_code() {
        let mock = Arc::new(MockDeviceProvider::new());
        mock.fail_with(Some(DeviceError::Unreachable("gpu-0".into()).into()));
        let (registry, _) = setup(Some(mock));
        let err = registry
            .execute(
                &CallContext::background(),
                "device.set_power_limit",
                json!({"device_id": "gpu-0", "limit_watts": 100}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DeviceUnreachable);
        assert!(err.to_string().starts_with("set power limit for device gpu-0: "));
    }
}
