// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use asms_core::{CallContext, Example, Input, Schema, Unit, UnitResult};

use super::errors::AlertError;
use super::lifecycle::AlertLifecycle;
use super::model::{AlertRule, AlertSeverity};

pub fn units(lifecycle: &Arc<AlertLifecycle>) -> Vec<Unit> {
    vec![
        create_rule_unit(lifecycle),
        update_rule_unit(lifecycle),
        delete_rule_unit(lifecycle),
        acknowledge_unit(lifecycle),
        resolve_unit(lifecycle),
    ]
}

fn success_schema() -> Schema {
    Schema::object().property("success", Schema::boolean())
}

fn create_rule_unit(lifecycle: &Arc<AlertLifecycle>) -> Unit {
    Unit::command("alert.create_rule", "Create a new alert rule")
        .input(
            Schema::object()
                .property("name", Schema::string().describe("Rule name"))
                .property("condition", Schema::string().describe("Alert condition expression"))
                .property(
                    "severity",
                    Schema::string()
                        .one_of(AlertSeverity::ALL)
                        .describe("Alert severity level"),
                )
                .property("channels", Schema::string_array().describe("Notification channels"))
                .property("cooldown", Schema::number().min(0.0).describe("Cooldown period in seconds"))
                .require(["name", "condition", "severity"]),
        )
        .output(Schema::object().property("rule_id", Schema::string()))
        .example(Example::new(
            "Create a CPU alert rule",
            json!({
                "name": "High CPU Usage",
                "condition": "cpu.utilization > 80",
                "severity": "warning",
                "channels": ["email", "slack"],
                "cooldown": 300
            }),
            json!({"rule_id": "rule-123"}),
        ))
        .events(lifecycle.events().clone())
        .bind(lifecycle.clone(), create_rule)
}

async fn create_rule(lifecycle: Arc<AlertLifecycle>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let name = input.require_str("name")?;
    let condition = input.require_str("condition")?;
    let severity: AlertSeverity = input.str("severity").unwrap_or_default().parse()?;

    let mut rule = AlertRule::new(name, condition, severity);
    rule.id = Uuid::new_v4().to_string();
    rule.channels = input.string_list("channels").unwrap_or_default();
    rule.cooldown = input.i64("cooldown").unwrap_or(0);

    let rule = lifecycle
        .store()
        .create_rule(&ctx, rule)
        .await
        .map_err(|e| e.with_context("create rule"))?;
    Ok(json!({ "rule_id": rule.id }))
}

fn update_rule_unit(lifecycle: &Arc<AlertLifecycle>) -> Unit {
    Unit::command("alert.update_rule", "Update an existing alert rule")
        .input(
            Schema::object()
                .property("rule_id", Schema::string().describe("Rule identifier"))
                .property("name", Schema::string().describe("New rule name"))
                .property("condition", Schema::string().describe("New condition expression"))
                .property("enabled", Schema::boolean().describe("Enable or disable the rule"))
                .require(["rule_id"]),
        )
        .output(success_schema())
        .example(Example::new(
            "Disable a rule",
            json!({"rule_id": "rule-123", "enabled": false}),
            json!({"success": true}),
        ))
        .events(lifecycle.events().clone())
        .bind(lifecycle.clone(), update_rule)
}

async fn update_rule(lifecycle: Arc<AlertLifecycle>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let rule_id = input.non_empty_str("rule_id").ok_or(AlertError::InvalidRuleId)?;

    let mut rule = lifecycle
        .store()
        .get_rule(&ctx, rule_id)
        .await
        .map_err(|e| e.with_context("get rule"))?;

    if let Some(name) = input.non_empty_str("name") {
        rule.name = name.to_string();
    }
    if let Some(condition) = input.non_empty_str("condition") {
        rule.condition = condition.to_string();
    }
    if let Some(enabled) = input.bool("enabled") {
        rule.enabled = enabled;
    }

    lifecycle
        .store()
        .update_rule(&ctx, rule)
        .await
        .map_err(|e| e.with_context("update rule"))?;
    Ok(json!({ "success": true }))
}

fn delete_rule_unit(lifecycle: &Arc<AlertLifecycle>) -> Unit {
    Unit::command("alert.delete_rule", "Delete an alert rule")
        .input(
            Schema::object()
                .property("rule_id", Schema::string().describe("Rule identifier"))
                .require(["rule_id"]),
        )
        .output(success_schema())
        .example(Example::new(
            "Delete a rule",
            json!({"rule_id": "rule-123"}),
            json!({"success": true}),
        ))
        .events(lifecycle.events().clone())
        .bind(lifecycle.clone(), delete_rule)
}

async fn delete_rule(lifecycle: Arc<AlertLifecycle>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let rule_id = input.non_empty_str("rule_id").ok_or(AlertError::InvalidRuleId)?;
    lifecycle
        .store()
        .delete_rule(&ctx, rule_id)
        .await
        .map_err(|e| e.with_context("delete rule"))?;
    Ok(json!({ "success": true }))
}

fn acknowledge_unit(lifecycle: &Arc<AlertLifecycle>) -> Unit {
    Unit::command("alert.acknowledge", "Acknowledge an alert")
        .input(
            Schema::object()
                .property("alert_id", Schema::string().describe("Alert identifier"))
                .require(["alert_id"]),
        )
        .output(success_schema())
        .example(Example::new(
            "Acknowledge a firing alert",
            json!({"alert_id": "alert-123"}),
            json!({"success": true}),
        ))
        .events(lifecycle.events().clone())
        .bind(lifecycle.clone(), acknowledge)
}

async fn acknowledge(lifecycle: Arc<AlertLifecycle>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let alert_id = input.non_empty_str("alert_id").ok_or(AlertError::InvalidAlertId)?;
    lifecycle.acknowledge(&ctx, alert_id).await?;
    Ok(json!({ "success": true }))
}

fn resolve_unit(lifecycle: &Arc<AlertLifecycle>) -> Unit {
    Unit::command("alert.resolve", "Resolve an alert")
        .input(
            Schema::object()
                .property("alert_id", Schema::string().describe("Alert identifier"))
                .require(["alert_id"]),
        )
        .output(success_schema())
        .example(Example::new(
            "Resolve an alert",
            json!({"alert_id": "alert-123"}),
            json!({"success": true}),
        ))
        .events(lifecycle.events().clone())
        .bind(lifecycle.clone(), resolve)
}

async fn resolve(lifecycle: Arc<AlertLifecycle>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let alert_id = input.non_empty_str("alert_id").ok_or(AlertError::InvalidAlertId)?;
    lifecycle.resolve(&ctx, alert_id).await?;
    Ok(json!({ "success": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::model::{Alert, AlertStatus};
    use crate::alert::store::{AlertStore, MemoryAlertStore};
    use asms_core::infrastructure::EventRecorder;
    use asms_core::{ErrorCode, UnitRegistry};
    use chrono::Utc;

    struct Fixture {
        registry: UnitRegistry,
        store: Arc<dyn AlertStore>,
        recorder: Arc<EventRecorder>,
    }

    fn fixture() -> Fixture {
        let recorder = Arc::new(EventRecorder::new());
        let store: Arc<dyn AlertStore> = Arc::new(MemoryAlertStore::new());
        let lifecycle = Arc::new(AlertLifecycle::new(store.clone(), Some(recorder.clone())));
        let registry = UnitRegistry::new();
        registry.register_units(units(&lifecycle)).unwrap();
        Fixture {
            registry,
            store,
            recorder,
        }
    }

    async fn exec(f: &Fixture, name: &str, input: Value) -> UnitResult<Value> {
        f.registry.execute(&CallContext::background(), name, input).await
    }

    #[tokio::test]
    async fn test_create_rule_happy_path() {
        let f = fixture();
        let out = exec(
            &f,
            "alert.create_rule",
            json!({
                "name": "High CPU",
                "condition": "cpu.utilization > 80",
                "severity": "warning",
                "channels": ["email", "slack"],
                "cooldown": 300
            }),
        )
        .await
        .unwrap();

        let rule_id = out["rule_id"].as_str().unwrap();
        assert!(Uuid::parse_str(rule_id).is_ok());

        let rules = f.store.list_rules(&CallContext::background(), Default::default()).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].enabled);
        assert_eq!(rules[0].channels, vec!["email", "slack"]);
        assert_eq!(rules[0].cooldown, 300);
        assert_eq!(f.recorder.types(), vec!["execution_started", "execution_completed"]);
    }

    #[tokio::test]
    async fn test_create_rule_invalid_severity_leaves_store_unchanged() {
        let f = fixture();
        let err = exec(
            &f,
            "alert.create_rule",
            json!({"name": "X", "condition": "y>1", "severity": "urgent"}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(err.to_string().contains("severity"));

        let rules = f.store.list_rules(&CallContext::background(), Default::default()).await.unwrap();
        assert!(rules.is_empty());
        assert_eq!(f.recorder.types(), vec!["execution_started", "execution_failed"]);
    }

    #[tokio::test]
    async fn test_create_rule_missing_required_field() {
        let f = fixture();
        let err = exec(&f, "alert.create_rule", json!({"name": "X", "severity": "bogus"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("required field \"condition\" is missing"));
    }

    #[tokio::test]
    async fn test_update_rule_applies_partial_fields() {
        let f = fixture();
        let out = exec(
            &f,
            "alert.create_rule",
            json!({"name": "Disk", "condition": "disk > 90", "severity": "info"}),
        )
        .await
        .unwrap();
        let rule_id = out["rule_id"].as_str().unwrap().to_string();

        let out = exec(
            &f,
            "alert.update_rule",
            json!({"rule_id": rule_id, "name": "", "condition": "disk > 95", "enabled": false}),
        )
        .await
        .unwrap();
        assert_eq!(out, json!({"success": true}));

        let rule = f.store.get_rule(&CallContext::background(), &rule_id).await.unwrap();
        assert_eq!(rule.name, "Disk");
        assert_eq!(rule.condition, "disk > 95");
        assert!(!rule.enabled);
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_rule() {
        let f = fixture();
        let err = exec(&f, "alert.update_rule", json!({"rule_id": "missing"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlertRuleNotFound);
        assert!(err.to_string().starts_with("get rule: "));

        let err = exec(&f, "alert.delete_rule", json!({"rule_id": ""})).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_acknowledge_then_resolve_twice() {
        let f = fixture();
        let ctx = CallContext::background();
        let rule = AlertRule {
            id: "r1".into(),
            ..AlertRule::new("Mem", "mem > 90", AlertSeverity::Warning)
        };
        let mut seeded = Alert::firing(&rule, "memory high", Utc::now());
        seeded.id = "a1".into();
        f.store.create_alert(&ctx, seeded).await.unwrap();

        let out = exec(&f, "alert.acknowledge", json!({"alert_id": "a1"})).await.unwrap();
        assert_eq!(out, json!({"success": true}));
        let stored = f.store.get_alert(&ctx, "a1").await.unwrap();
        assert_eq!(stored.status, AlertStatus::Acknowledged);
        assert!(stored.acknowledged_at.is_some());

        exec(&f, "alert.resolve", json!({"alert_id": "a1"})).await.unwrap();
        let first = f.store.get_alert(&ctx, "a1").await.unwrap().resolved_at;
        exec(&f, "alert.resolve", json!({"alert_id": "a1"})).await.unwrap();
        let second = f.store.get_alert(&ctx, "a1").await.unwrap().resolved_at;
        assert!(first.is_some() && second >= first);

        assert_eq!(f.recorder.of_type("alert.acknowledged").len(), 1);
        assert_eq!(f.recorder.of_type("alert.resolved").len(), 2);
    }
}
