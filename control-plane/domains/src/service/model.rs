// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use asms_core::rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use super::errors::ServiceError;

/// `pending → starting → running → stopping → stopped`; any step may end
/// in `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Pending,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl ServiceStatus {
    pub const ALL: [&'static str; 6] = ["pending", "starting", "running", "stopping", "stopped", "failed"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Pending => "pending",
            ServiceStatus::Starting => "starting",
            ServiceStatus::Running => "running",
            ServiceStatus::Stopping => "stopping",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Failed => "failed",
        }
    }
}

impl FromStr for ServiceStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ServiceStatus::Pending),
            "starting" => Ok(ServiceStatus::Starting),
            "running" => Ok(ServiceStatus::Running),
            "stopping" => Ok(ServiceStatus::Stopping),
            "stopped" => Ok(ServiceStatus::Stopped),
            "failed" => Ok(ServiceStatus::Failed),
            other => Err(ServiceError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    Small,
    #[default]
    Medium,
    Large,
}

impl ResourceClass {
    pub const ALL: [&'static str; 3] = ["small", "medium", "large"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::Small => "small",
            ResourceClass::Medium => "medium",
            ResourceClass::Large => "large",
        }
    }
}

impl FromStr for ResourceClass {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(ResourceClass::Small),
            "medium" => Ok(ResourceClass::Medium),
            "large" => Ok(ResourceClass::Large),
            other => Err(ServiceError::InvalidResourceClass(other.to_string())),
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployed model behind an inference engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelService {
    pub id: String,
    pub name: String,
    pub model_id: String,
    pub status: ServiceStatus,
    pub replicas: u32,
    pub active_replicas: u32,
    pub resource_class: ResourceClass,
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModelService {
    /// Unsaved `pending` record; the store stamps the timestamps.
    pub fn pending(id: impl Into<String>, model_id: impl Into<String>, resource_class: ResourceClass, replicas: u32) -> Self {
        let id = id.into();
        let now = Utc::now();
        Self {
            name: format!("service-{id}"),
            id,
            model_id: model_id.into(),
            status: ServiceStatus::Pending,
            replicas,
            active_replicas: 0,
            resource_class,
            endpoints: Vec::new(),
            config: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// List row.
    pub fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "model_id": self.model_id,
            "status": self.status.as_str(),
            "replicas": self.replicas,
            "endpoints": self.endpoints,
        })
    }

    pub fn detail(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "model_id": self.model_id,
            "status": self.status.as_str(),
            "replicas": self.replicas,
            "active_replicas": self.active_replicas,
            "resource_class": self.resource_class.as_str(),
            "endpoints": self.endpoints,
            "config": self.config,
            "created_at": rfc3339(&self.created_at),
            "updated_at": rfc3339(&self.updated_at),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    pub requests_per_second: f64,
    pub latency_p50: f64,
    pub latency_p99: f64,
    pub total_requests: u64,
    pub error_rate: f64,
}

impl ServiceMetrics {
    pub fn projection(&self) -> Value {
        json!({
            "requests_per_second": self.requests_per_second,
            "latency_p50": self.latency_p50,
            "latency_p99": self.latency_p99,
            "total_requests": self.total_requests,
            "error_rate": self.error_rate,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub resource_class: ResourceClass,
    pub replicas: u32,
    pub expected_throughput: f64,
    /// e.g. vllm, whisper, tts, ollama.
    #[serde(default)]
    pub engine_type: String,
    /// gpu or cpu.
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub reason: String,
}

impl Recommendation {
    pub fn projection(&self) -> Value {
        json!({
            "resource_class": self.resource_class.as_str(),
            "replicas": self.replicas,
            "expected_throughput": self.expected_throughput,
            "engine_type": self.engine_type,
            "device_type": self.device_type,
            "reason": self.reason,
        })
    }
}

/// `limit == 0` means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFilter {
    pub status: Option<ServiceStatus>,
    pub model_id: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl ServiceFilter {
    pub fn matches(&self, service: &ModelService) -> bool {
        self.status.is_none_or(|s| s == service.status)
            && self.model_id.as_deref().is_none_or(|m| m == service.model_id)
    }
}

/// Parsed `svc-{engine}-{model}` identifier. The engine is the first dash
/// separated segment; the model keeps any further dashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceId {
    pub engine_type: String,
    pub model_id: String,
}

impl ServiceId {
    pub fn new(engine_type: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            engine_type: engine_type.into(),
            model_id: model_id.into(),
        }
    }
}

impl FromStr for ServiceId {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("svc-")
            .ok_or_else(|| ServiceError::InvalidServiceId(format!("{s} (must start with 'svc-')")))?;
        let (engine, model) = rest
            .split_once('-')
            .filter(|(engine, model)| !engine.is_empty() && !model.is_empty())
            .ok_or_else(|| ServiceError::InvalidServiceId(format!("{s} (expected svc-{{engine}}-{{model}})")))?;
        Ok(Self::new(engine, model))
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "svc-{}-{}", self.engine_type, self.model_id)
    }
}
