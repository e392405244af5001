// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use asms_core::{CallContext, Example, Input, Schema, Unit, UnitResult};

use super::backend::ServiceBackend;
use super::commands::{require_service_id, service_id_field};
use super::errors::ServiceError;
use super::model::{ModelService, ResourceClass, ServiceFilter, ServiceStatus};

pub fn units(backend: &Arc<ServiceBackend>) -> Vec<Unit> {
    vec![
        get_unit(backend),
        list_unit(backend),
        status_unit(backend),
        recommend_unit(backend),
    ]
}

pub(crate) fn summary_schema() -> Schema {
    Schema::object()
        .property("id", Schema::string())
        .property("model_id", Schema::string())
        .property("status", Schema::string().one_of(ServiceStatus::ALL))
        .property("replicas", Schema::number())
        .property("endpoints", Schema::string_array())
}

pub(crate) fn list_schema() -> Schema {
    Schema::object()
        .property("services", Schema::array(summary_schema()))
        .property("total", Schema::number())
}

pub(crate) fn detail_schema() -> Schema {
    Schema::object()
        .property("id", Schema::string())
        .property("name", Schema::string())
        .property("model_id", Schema::string())
        .property("status", Schema::string().one_of(ServiceStatus::ALL))
        .property("replicas", Schema::number())
        .property("active_replicas", Schema::number())
        .property("resource_class", Schema::string().one_of(ResourceClass::ALL))
        .property("endpoints", Schema::string_array())
        .property("config", Schema::object())
        .property("created_at", Schema::string())
        .property("updated_at", Schema::string())
}

pub(crate) fn list_projection(services: &[ModelService], total: usize) -> Value {
    let rows: Vec<Value> = services.iter().map(ModelService::summary).collect();
    json!({"services": rows, "total": total})
}

fn service_id_input() -> Schema {
    Schema::object()
        .property("service_id", service_id_field())
        .require(["service_id"])
}

fn get_unit(backend: &Arc<ServiceBackend>) -> Unit {
    Unit::query("service.get", "Get detailed information about a service")
        .input(service_id_input())
        .output(detail_schema().property(
            "metrics",
            Schema::object().describe("Live metrics, present while the service is running"),
        ))
        .example(Example::new(
            "Get a running service",
            json!({"service_id": "svc-vllm-llama3"}),
            json!({
                "id": "svc-vllm-llama3",
                "model_id": "llama3",
                "status": "running",
                "replicas": 2,
                "metrics": {"requests_per_second": 100.0}
            }),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), get)
}

async fn get(backend: Arc<ServiceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let service_id = require_service_id(&input)?;
    let service = backend.get(&ctx, service_id).await?;
    let mut detail = service.detail();

    if service.status == ServiceStatus::Running {
        let metrics = match backend.provider() {
            Ok(provider) => provider.get_metrics(&ctx, service_id).await,
            Err(err) => Err(err),
        };
        match metrics {
            Ok(metrics) => detail["metrics"] = metrics.projection(),
            Err(err) => debug!(service_id, error = %err, "metrics unavailable"),
        }
    }
    Ok(detail)
}

fn list_unit(backend: &Arc<ServiceBackend>) -> Unit {
    Unit::query("service.list", "List all services with optional filtering")
        .input(
            Schema::object()
                .property("status", Schema::string().one_of(ServiceStatus::ALL))
                .property("model_id", Schema::string().describe("Only services for this model"))
                .property("limit", Schema::number().range(1.0, 100.0).default_value(100))
                .property("offset", Schema::number().min(0.0).default_value(0)),
        )
        .output(list_schema())
        .example(Example::new(
            "List running services",
            json!({"status": "running"}),
            json!({
                "services": [{
                    "id": "svc-vllm-llama3",
                    "model_id": "llama3",
                    "status": "running",
                    "replicas": 2,
                    "endpoints": ["http://localhost:8080"]
                }],
                "total": 1
            }),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), list)
}

async fn list(backend: Arc<ServiceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let status = input
        .non_empty_str("status")
        .map(str::parse::<ServiceStatus>)
        .transpose()?;
    let filter = ServiceFilter {
        status,
        model_id: input.non_empty_str("model_id").map(str::to_string),
        limit: input.usize("limit").unwrap_or(100),
        offset: input.usize("offset").unwrap_or(0),
    };
    let (services, total) = backend
        .store()
        .list(&ctx, filter)
        .await
        .map_err(|e| e.with_context("list services"))?;
    Ok(list_projection(&services, total))
}

fn status_unit(backend: &Arc<ServiceBackend>) -> Unit {
    Unit::query("service.status", "Get detailed status and loading progress of a service")
        .input(service_id_input())
        .output(
            Schema::object()
                .property("id", Schema::string())
                .property("name", Schema::string())
                .property("model_id", Schema::string())
                .property("status", Schema::string().one_of(ServiceStatus::ALL))
                .property("endpoints", Schema::string_array()),
        )
        .example(Example::new(
            "Check whether a service is up",
            json!({"service_id": "svc-vllm-llama3"}),
            json!({
                "id": "svc-vllm-llama3",
                "name": "service-svc-vllm-llama3",
                "model_id": "llama3",
                "status": "starting",
                "endpoints": []
            }),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), status)
}

async fn status(backend: Arc<ServiceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let service_id = require_service_id(&input)?;
    let service = backend.get(&ctx, service_id).await?;
    Ok(json!({
        "id": service.id,
        "name": service.name,
        "model_id": service.model_id,
        "status": service.status.as_str(),
        "endpoints": service.endpoints,
    }))
}

fn recommend_unit(backend: &Arc<ServiceBackend>) -> Unit {
    Unit::query("service.recommend", "Get recommended configuration for a model")
        .input(
            Schema::object()
                .property("model_id", Schema::string().describe("Model to plan for").min_length(1))
                .property("hint", Schema::string().describe("Workload hint, e.g. latency or throughput"))
                .require(["model_id"]),
        )
        .output(
            Schema::object()
                .property("resource_class", Schema::string().one_of(ResourceClass::ALL))
                .property("replicas", Schema::number())
                .property("expected_throughput", Schema::number())
                .property("engine_type", Schema::string())
                .property("device_type", Schema::string())
                .property("reason", Schema::string()),
        )
        .example(Example::new(
            "Recommend a layout for llama3",
            json!({"model_id": "llama3"}),
            json!({"resource_class": "medium", "replicas": 2, "expected_throughput": 100.0}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), recommend)
}

async fn recommend(backend: Arc<ServiceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let model_id = input
        .non_empty_str("model_id")
        .ok_or(ServiceError::Required("model_id"))?;
    let recommendation = backend
        .provider()?
        .get_recommendation(&ctx, model_id, input.non_empty_str("hint"))
        .await
        .map_err(|e| e.with_context(format!("recommend configuration for {model_id}")))?;
    Ok(recommendation.projection())
}
