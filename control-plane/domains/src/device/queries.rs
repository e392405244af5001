// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde_json::{json, Value};
use std::sync::Arc;

use asms_core::{CallContext, Example, Input, Schema, Unit, UnitResult};

use super::backend::DeviceBackend;
use super::model::HealthStatus;

pub fn units(backend: &Arc<DeviceBackend>) -> Vec<Unit> {
    vec![info_unit(backend), metrics_unit(backend), health_unit(backend)]
}

fn device_id_input(description: &str) -> Schema {
    Schema::object().property("device_id", Schema::string().describe(description))
}

pub(crate) fn detail_schema() -> Schema {
    Schema::object()
        .property("id", Schema::string())
        .property("name", Schema::string())
        .property("vendor", Schema::string())
        .property("architecture", Schema::string())
        .property("capabilities", Schema::string_array())
        .property("memory", Schema::number())
}

pub(crate) fn metrics_schema() -> Schema {
    Schema::object()
        .property("utilization", Schema::number().describe("GPU utilization percentage"))
        .property("temperature", Schema::number().describe("Temperature in Celsius"))
        .property("power", Schema::number().describe("Power draw in watts"))
        .property("memory_used", Schema::number().describe("Used memory in bytes"))
        .property("memory_total", Schema::number().describe("Total memory in bytes"))
}

pub(crate) fn health_schema() -> Schema {
    Schema::object()
        .property("status", Schema::string().one_of(HealthStatus::ALL))
        .property("issues", Schema::string_array())
}

fn info_unit(backend: &Arc<DeviceBackend>) -> Unit {
    Unit::query("device.info", "Get detailed information about a device or all devices")
        .input(device_id_input("Device identifier (optional, returns all if not specified)"))
        .output(detail_schema())
        .example(Example::new(
            "Get info for a specific device",
            json!({"device_id": "gpu-0"}),
            json!({
                "id": "gpu-0",
                "name": "NVIDIA RTX 4090",
                "vendor": "NVIDIA",
                "architecture": "Ada Lovelace",
                "capabilities": ["cuda", "tensor"],
                "memory": 24564
            }),
        ))
        .example(Example::new(
            "Get info for all devices when device_id is not provided",
            json!({}),
            json!({"devices": [{"id": "gpu-0", "name": "NVIDIA RTX 4090"}]}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), info)
}

async fn info(backend: Arc<DeviceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let provider = backend.provider()?;
    if let Some(device_id) = input.non_empty_str("device_id") {
        let device = provider
            .get_device(&ctx, device_id)
            .await
            .map_err(|e| e.with_context(format!("get device {device_id}")))?;
        return Ok(device.detail());
    }

    let devices = backend.detect(&ctx).await?;
    let devices: Vec<Value> = devices.iter().map(|d| d.detail()).collect();
    Ok(json!({ "devices": devices }))
}

fn metrics_unit(backend: &Arc<DeviceBackend>) -> Unit {
    Unit::query("device.metrics", "Get real-time metrics for a device")
        .input(device_id_input("Device identifier (optional, uses first device if not specified)"))
        .output(metrics_schema())
        .example(Example::new(
            "Get metrics for gpu-0",
            json!({"device_id": "gpu-0"}),
            json!({
                "utilization": 45.5,
                "temperature": 65.0,
                "power": 250.0,
                "memory_used": 8192000000u64,
                "memory_total": 24564000000u64
            }),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), metrics)
}

async fn metrics(backend: Arc<DeviceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let provider = backend.provider()?;
    let device_id = backend
        .resolve_device_id(&ctx, input.non_empty_str("device_id"))
        .await?;
    let metrics = provider
        .get_metrics(&ctx, &device_id)
        .await
        .map_err(|e| e.with_context(format!("get metrics for device {device_id}")))?;
    Ok(metrics.projection())
}

fn health_unit(backend: &Arc<DeviceBackend>) -> Unit {
    Unit::query("device.health", "Check health status of a device")
        .input(device_id_input("Device identifier (optional, checks all devices if not specified)"))
        .output(health_schema())
        .example(Example::new(
            "Health check for a healthy device",
            json!({"device_id": "gpu-0"}),
            json!({"status": "healthy", "issues": []}),
        ))
        .example(Example::new(
            "Health check for a device with warnings",
            json!({"device_id": "gpu-1"}),
            json!({"status": "warning", "issues": ["High temperature detected"]}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), health)
}

/// Without a device id, one entry per detected device; a failing device
/// reports `unknown` instead of failing the call.
async fn health(backend: Arc<DeviceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let provider = backend.provider()?;
    if let Some(device_id) = input.non_empty_str("device_id") {
        let health = provider
            .get_health(&ctx, device_id)
            .await
            .map_err(|e| e.with_context(format!("get health for device {device_id}")))?;
        return Ok(health.projection());
    }

    let devices = backend.detect(&ctx).await?;
    let mut results = Vec::with_capacity(devices.len());
    for device in &devices {
        let entry = match provider.get_health(&ctx, &device.id).await {
            Ok(health) => json!({
                "device_id": device.id,
                "status": health.status.as_str(),
                "issues": health.issues,
            }),
            Err(err) => json!({
                "device_id": device.id,
                "status": HealthStatus::Unknown.as_str(),
                "issues": [err.to_string()],
            }),
        };
        results.push(entry);
    }
    Ok(json!({ "devices": results }))
}
