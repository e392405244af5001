// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use asms_core::{CallContext, Example, Input, Schema, Unit, UnitResult};

use super::backend::ServiceBackend;
use super::errors::ServiceError;
use super::model::ResourceClass;

pub fn units(backend: &Arc<ServiceBackend>) -> Vec<Unit> {
    vec![
        create_unit(backend),
        start_unit(backend),
        stop_unit(backend),
        scale_unit(backend),
        delete_unit(backend),
    ]
}

pub(crate) fn service_id_field() -> Schema {
    Schema::string().describe("Service identifier").min_length(1)
}

pub(crate) fn require_service_id(input: &Input) -> UnitResult<&str> {
    input
        .non_empty_str("service_id")
        .ok_or_else(|| ServiceError::Required("service_id").into())
}

fn success() -> Schema {
    Schema::object().property("success", Schema::boolean())
}

fn replicas(input: &Input, default: u32) -> UnitResult<u32> {
    match input.get("replicas") {
        None | Some(Value::Null) => Ok(default),
        Some(_) => input
            .usize("replicas")
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| ServiceError::InvalidReplicas.into()),
    }
}

fn create_unit(backend: &Arc<ServiceBackend>) -> Unit {
    Unit::command("service.create", "Create a new model inference service")
        .input(
            Schema::object()
                .property("model_id", Schema::string().describe("Model to serve").min_length(1))
                .property(
                    "resource_class",
                    Schema::string()
                        .one_of(ResourceClass::ALL)
                        .default_value("medium")
                        .describe("Resource class for the service"),
                )
                .property(
                    "replicas",
                    Schema::number().range(1.0, 100.0).default_value(1).describe("Number of replicas"),
                )
                .property("persistent", Schema::boolean().describe("Keep the service across restarts"))
                .require(["model_id"]),
        )
        .output(Schema::object().property("service_id", Schema::string()))
        .example(Example::new(
            "Create a medium service for llama3",
            json!({"model_id": "llama3", "resource_class": "medium", "replicas": 2}),
            json!({"service_id": "svc-vllm-llama3"}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), create)
}

async fn create(backend: Arc<ServiceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let model_id = input
        .non_empty_str("model_id")
        .ok_or(ServiceError::Required("model_id"))?;
    let resource_class = match input.non_empty_str("resource_class") {
        Some(class) => class.parse::<ResourceClass>()?,
        None => ResourceClass::default(),
    };
    let replicas = replicas(&input, 1)?;
    let persistent = input.bool("persistent").unwrap_or(false);

    let service = backend
        .create(&ctx, model_id, resource_class, replicas, persistent)
        .await?;
    Ok(json!({"service_id": service.id}))
}

fn start_unit(backend: &Arc<ServiceBackend>) -> Unit {
    Unit::command("service.start", "Start a stopped service")
        .input(
            Schema::object()
                .property("service_id", service_id_field())
                .property(
                    "timeout",
                    Schema::number().range(1.0, 3600.0).describe("Seconds to wait for the service to come up"),
                )
                .require(["service_id"]),
        )
        .output(success())
        .example(Example::new(
            "Start a service with a two minute budget",
            json!({"service_id": "svc-vllm-llama3", "timeout": 120}),
            json!({"success": true}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), start)
}

async fn start(backend: Arc<ServiceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let service_id = require_service_id(&input)?;
    let timeout = input
        .f64("timeout")
        .filter(|secs| *secs > 0.0)
        .map(Duration::from_secs_f64);
    backend.start(&ctx, service_id, timeout).await?;
    Ok(json!({"success": true}))
}

fn stop_unit(backend: &Arc<ServiceBackend>) -> Unit {
    Unit::command("service.stop", "Stop a running service")
        .input(
            Schema::object()
                .property("service_id", service_id_field())
                .property("force", Schema::boolean().describe("Stop without draining in-flight requests"))
                .require(["service_id"]),
        )
        .output(success())
        .example(Example::new(
            "Stop a service",
            json!({"service_id": "svc-vllm-llama3"}),
            json!({"success": true}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), stop)
}

async fn stop(backend: Arc<ServiceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let service_id = require_service_id(&input)?;
    let force = input.bool("force").unwrap_or(false);
    backend.stop(&ctx, service_id, force).await?;
    Ok(json!({"success": true}))
}

fn scale_unit(backend: &Arc<ServiceBackend>) -> Unit {
    Unit::command("service.scale", "Scale service replicas up or down")
        .input(
            Schema::object()
                .property("service_id", service_id_field())
                .property("replicas", Schema::number().range(0.0, 100.0).describe("Target replica count"))
                .require(["service_id", "replicas"]),
        )
        .output(success())
        .example(Example::new(
            "Scale to four replicas",
            json!({"service_id": "svc-vllm-llama3", "replicas": 4}),
            json!({"success": true}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), scale)
}

async fn scale(backend: Arc<ServiceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let service_id = require_service_id(&input)?;
    if !input.contains("replicas") {
        return Err(ServiceError::Required("replicas").into());
    }
    let replicas = replicas(&input, 0)?;
    backend.scale(&ctx, service_id, replicas).await?;
    Ok(json!({"success": true}))
}

fn delete_unit(backend: &Arc<ServiceBackend>) -> Unit {
    Unit::command("service.delete", "Delete a model inference service")
        .input(
            Schema::object()
                .property("service_id", service_id_field())
                .require(["service_id"]),
        )
        .output(success())
        .example(Example::new(
            "Delete a service",
            json!({"service_id": "svc-vllm-llama3"}),
            json!({"success": true}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), delete)
}

async fn delete(backend: Arc<ServiceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let service_id = require_service_id(&input)?;
    backend.delete(&ctx, service_id).await?;
    Ok(json!({"success": true}))
}
