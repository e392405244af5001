// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde_json::{json, Value};
use std::sync::Arc;

use asms_core::{CallContext, Example, Input, Schema, Unit, UnitResult};

use super::lifecycle::AlertLifecycle;
use super::model::{AlertFilter, AlertSeverity, AlertStatus, RuleFilter};
use super::store::AlertStore;

const DEFAULT_HISTORY_LIMIT: usize = 100;

pub fn units(lifecycle: &Arc<AlertLifecycle>) -> Vec<Unit> {
    vec![
        list_rules_unit(lifecycle),
        history_unit(lifecycle),
        active_unit(lifecycle),
    ]
}

fn alert_list_schema() -> Schema {
    Schema::array(
        Schema::object()
            .property("id", Schema::string())
            .property("rule_id", Schema::string())
            .property("rule_name", Schema::string())
            .property("severity", Schema::string())
            .property("status", Schema::string())
            .property("message", Schema::string())
            .property("triggered_at", Schema::string()),
    )
}

fn list_rules_unit(lifecycle: &Arc<AlertLifecycle>) -> Unit {
    Unit::query("alert.list_rules", "List alert rules")
        .input(
            Schema::object().property(
                "enabled_only",
                Schema::boolean().describe("Only return enabled rules"),
            ),
        )
        .output(Schema::object().property("rules", Schema::array(Schema::object())))
        .example(Example::new(
            "List enabled rules",
            json!({"enabled_only": true}),
            json!({"rules": [{
                "id": "rule-123",
                "name": "High CPU Usage",
                "condition": "cpu.utilization > 80",
                "severity": "warning",
                "channels": ["email"],
                "cooldown": 300,
                "enabled": true
            }]}),
        ))
        .events(lifecycle.events().clone())
        .bind(lifecycle.clone(), list_rules)
}

async fn list_rules(lifecycle: Arc<AlertLifecycle>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let filter = RuleFilter {
        enabled_only: input.bool("enabled_only").unwrap_or(false),
    };
    rules_snapshot(lifecycle.store().as_ref(), &ctx, filter).await
}

/// `{rules: [...]}`, shared with the rules resource.
pub(crate) async fn rules_snapshot(
    store: &dyn AlertStore,
    ctx: &CallContext,
    filter: RuleFilter,
) -> UnitResult<Value> {
    let rules = store
        .list_rules(ctx, filter)
        .await
        .map_err(|e| e.with_context("list rules"))?;
    let rules: Vec<Value> = rules.iter().map(|r| r.projection()).collect();
    Ok(json!({ "rules": rules }))
}

fn history_unit(lifecycle: &Arc<AlertLifecycle>) -> Unit {
    Unit::query("alert.history", "Get alert history")
        .input(
            Schema::object()
                .property("rule_id", Schema::string().describe("Filter by rule"))
                .property(
                    "status",
                    Schema::string().one_of(AlertStatus::ALL).describe("Filter by status"),
                )
                .property(
                    "severity",
                    Schema::string()
                        .one_of(AlertSeverity::ALL)
                        .describe("Filter by severity"),
                )
                .property(
                    "limit",
                    Schema::number()
                        .range(1.0, 1000.0)
                        .default_value(DEFAULT_HISTORY_LIMIT as u64)
                        .describe("Maximum number of alerts"),
                )
                .property(
                    "offset",
                    Schema::number().min(0.0).default_value(0).describe("Alerts to skip"),
                ),
        )
        .output(
            Schema::object()
                .property("alerts", alert_list_schema())
                .property("total", Schema::number()),
        )
        .example(Example::new(
            "Recent critical alerts",
            json!({"severity": "critical", "limit": 10}),
            json!({"alerts": [], "total": 0}),
        ))
        .events(lifecycle.events().clone())
        .bind(lifecycle.clone(), history)
}

async fn history(lifecycle: Arc<AlertLifecycle>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let filter = AlertFilter {
        rule_id: input.non_empty_str("rule_id").map(str::to_string),
        status: input.non_empty_str("status").map(str::parse::<AlertStatus>).transpose()?,
        severity: input.non_empty_str("severity").map(str::parse::<AlertSeverity>).transpose()?,
        limit: input.usize("limit").unwrap_or_default(),
        offset: input.usize("offset").unwrap_or_default(),
    };

    let (alerts, total) = lifecycle
        .store()
        .list_alerts(&ctx, filter)
        .await
        .map_err(|e| e.with_context("list alerts"))?;
    let alerts: Vec<Value> = alerts.iter().map(|a| a.projection()).collect();
    Ok(json!({ "alerts": alerts, "total": total }))
}

fn active_unit(lifecycle: &Arc<AlertLifecycle>) -> Unit {
    Unit::query("alert.active", "Get all active alerts")
        .output(Schema::object().property("alerts", alert_list_schema()))
        .example(Example::new(
            "Firing and acknowledged alerts",
            json!({}),
            json!({"alerts": []}),
        ))
        .events(lifecycle.events().clone())
        .bind(lifecycle.clone(), active)
}

async fn active(lifecycle: Arc<AlertLifecycle>, ctx: CallContext, _input: Input) -> UnitResult<Value> {
    active_snapshot(lifecycle.store().as_ref(), &ctx).await
}

/// `{alerts: [...]}` of firing and acknowledged alerts.
pub(crate) async fn active_snapshot(store: &dyn AlertStore, ctx: &CallContext) -> UnitResult<Value> {
    let alerts = store
        .list_active_alerts(ctx)
        .await
        .map_err(|e| e.with_context("list active alerts"))?;
    let alerts: Vec<Value> = alerts.iter().map(|a| a.projection()).collect();
    Ok(json!({ "alerts": alerts }))
}
