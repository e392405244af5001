// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use asms_core::rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use super::errors::AlertError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub const ALL: [&'static str; 3] = ["info", "warning", "critical"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl FromStr for AlertSeverity {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(AlertSeverity::Info),
            "warning" => Ok(AlertSeverity::Warning),
            "critical" => Ok(AlertSeverity::Critical),
            other => Err(AlertError::InvalidSeverity(other.to_string())),
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub const ALL: [&'static str; 3] = ["firing", "acknowledged", "resolved"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Firing => "firing",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    /// Firing or acknowledged.
    pub fn is_active(&self) -> bool {
        matches!(self, AlertStatus::Firing | AlertStatus::Acknowledged)
    }
}

impl FromStr for AlertStatus {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firing" => Ok(AlertStatus::Firing),
            "acknowledged" => Ok(AlertStatus::Acknowledged),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(AlertError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub condition: String,
    pub severity: AlertSeverity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,
    /// Seconds between two alerts of the same rule.
    #[serde(default)]
    pub cooldown: i64,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertRule {
    /// Unsaved rule; the store assigns the id (when empty) and timestamps.
    pub fn new(name: impl Into<String>, condition: impl Into<String>, severity: AlertSeverity) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: name.into(),
            condition: condition.into(),
            severity,
            channels: Vec::new(),
            cooldown: 0,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn projection(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "condition": self.condition,
            "severity": self.severity.as_str(),
            "channels": self.channels,
            "cooldown": self.cooldown,
            "enabled": self.enabled,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Map<String, Value>>,
    pub triggered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// A firing alert raised by `rule` at `at`.
    pub fn firing(rule: &AlertRule, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            severity: rule.severity,
            status: AlertStatus::Firing,
            message: message.into(),
            metrics: None,
            triggered_at: at,
            acknowledged_at: None,
            resolved_at: None,
        }
    }

    pub fn acknowledge(&mut self, at: DateTime<Utc>) {
        self.status = AlertStatus::Acknowledged;
        self.acknowledged_at = Some(at);
    }

    /// Not guarded: resolving twice restamps `resolved_at`.
    pub fn resolve(&mut self, at: DateTime<Utc>) {
        self.status = AlertStatus::Resolved;
        self.resolved_at = Some(at);
    }

    pub fn projection(&self) -> Value {
        json!({
            "id": self.id,
            "rule_id": self.rule_id,
            "rule_name": self.rule_name,
            "severity": self.severity.as_str(),
            "status": self.status.as_str(),
            "message": self.message,
            "triggered_at": rfc3339(&self.triggered_at),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleFilter {
    pub enabled_only: bool,
}

/// AND-composed; `None` fields do not filter. `limit == 0` means no limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertFilter {
    pub rule_id: Option<String>,
    pub status: Option<AlertStatus>,
    pub severity: Option<AlertSeverity>,
    pub limit: usize,
    pub offset: usize,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.rule_id.as_ref().is_none_or(|id| *id == alert.rule_id)
            && self.status.is_none_or(|s| s == alert.status)
            && self.severity.is_none_or(|s| s == alert.severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_parse_exactly() {
        assert_eq!("warning".parse::<AlertSeverity>().unwrap(), AlertSeverity::Warning);
        assert!("urgent".parse::<AlertSeverity>().is_err());
        assert!("Warning".parse::<AlertSeverity>().is_err());
        assert!(AlertStatus::Acknowledged.is_active());
        assert!(!AlertStatus::Resolved.is_active());
    }

    #[test]
    fn test_alert_lifecycle_transitions() {
        let rule = AlertRule::new("High CPU", "cpu > 80", AlertSeverity::Critical);
        let t0 = Utc::now();
        let mut alert = Alert::firing(&rule, "cpu at 93%", t0);
        assert_eq!(alert.status, AlertStatus::Firing);

        alert.acknowledge(t0 + chrono::Duration::seconds(1));
        assert_eq!(alert.status, AlertStatus::Acknowledged);
        assert!(alert.acknowledged_at.is_some());

        alert.resolve(t0 + chrono::Duration::seconds(2));
        let first = alert.resolved_at;
        alert.resolve(t0 + chrono::Duration::seconds(3));
        assert!(alert.resolved_at >= first);
        assert_eq!(alert.projection()["status"], "resolved");
    }

    #[test]
    fn test_filter_composes_with_and() {
        let rule = AlertRule {
            id: "r1".into(),
            ..AlertRule::new("n", "c", AlertSeverity::Info)
        };
        let alert = Alert::firing(&rule, "m", Utc::now());
        let filter = AlertFilter {
            rule_id: Some("r1".into()),
            status: Some(AlertStatus::Firing),
            ..Default::default()
        };
        assert!(filter.matches(&alert));
        let filter = AlertFilter {
            severity: Some(AlertSeverity::Critical),
            ..filter
        };
        assert!(!filter.matches(&alert));
    }
}
