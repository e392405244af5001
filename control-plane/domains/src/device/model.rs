// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub vendor: String,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub architecture: String,
    /// MiB.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub memory: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl DeviceInfo {
    /// Inventory row as returned by `device.detect`.
    pub fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "vendor": self.vendor,
            "type": self.device_type,
            "memory": self.memory,
            "architecture": self.architecture,
        })
    }

    /// Detail view used by `device.info` and the info resource.
    pub fn detail(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "vendor": self.vendor,
            "architecture": self.architecture,
            "capabilities": self.capabilities,
            "memory": self.memory,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetrics {
    /// Percent.
    pub utilization: f64,
    /// Celsius.
    pub temperature: f64,
    /// Watts.
    pub power: f64,
    /// Bytes.
    pub memory_used: u64,
    pub memory_total: u64,
}

impl DeviceMetrics {
    pub fn projection(&self) -> Value {
        json!({
            "utilization": self.utilization,
            "temperature": self.temperature,
            "power": self.power,
            "memory_used": self.memory_used,
            "memory_total": self.memory_total,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

impl HealthStatus {
    pub const ALL: [&'static str; 4] = ["healthy", "warning", "critical", "unknown"];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
            HealthStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHealth {
    pub status: HealthStatus,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl DeviceHealth {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            issues: Vec::new(),
        }
    }

    pub fn with_issues<I, S>(status: HealthStatus, issues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status,
            issues: issues.into_iter().map(Into::into).collect(),
        }
    }

    pub fn projection(&self) -> Value {
        json!({ "status": self.status.as_str(), "issues": self.issues })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_omits_empty_optionals() {
        let info = DeviceInfo {
            id: "npu-0".into(),
            name: "Edge NPU".into(),
            vendor: "Acme".into(),
            device_type: "npu".into(),
            architecture: String::new(),
            memory: 0,
            capabilities: vec![],
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "npu");
        assert!(json.get("architecture").is_none());
        assert!(json.get("memory").is_none());
        assert_eq!(info.summary()["type"], "npu");
    }

    #[test]
    fn test_health_projection() {
        let health = DeviceHealth::with_issues(HealthStatus::Warning, ["High temperature detected"]);
        assert_eq!(
            health.projection(),
            json!({"status": "warning", "issues": ["High temperature detected"]})
        );
    }
}
