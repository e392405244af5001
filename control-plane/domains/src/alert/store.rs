// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Alert persistence contract and the reference in-memory store.
//!
//! Two maps keyed by id behind one readers-writer lock: writes (`create_*`,
//! `update_*`, `delete_*`) take the writer side, reads take the reader side.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use asms_core::{system_clock, CallContext, SharedClock, UnitResult};

use super::errors::AlertError;
use super::model::{Alert, AlertFilter, AlertRule, RuleFilter};

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Assigns an id when empty and stamps both timestamps. Returns the
    /// stored rule.
    async fn create_rule(&self, ctx: &CallContext, rule: AlertRule) -> UnitResult<AlertRule>;

    async fn get_rule(&self, ctx: &CallContext, id: &str) -> UnitResult<AlertRule>;

    async fn list_rules(&self, ctx: &CallContext, filter: RuleFilter) -> UnitResult<Vec<AlertRule>>;

    async fn update_rule(&self, ctx: &CallContext, rule: AlertRule) -> UnitResult<AlertRule>;

    async fn delete_rule(&self, ctx: &CallContext, id: &str) -> UnitResult<()>;

    /// Assigns an id when empty. An existing id is overwritten.
    async fn create_alert(&self, ctx: &CallContext, alert: Alert) -> UnitResult<Alert>;

    async fn get_alert(&self, ctx: &CallContext, id: &str) -> UnitResult<Alert>;

    /// Filtered window plus the total number of matches before pagination.
    async fn list_alerts(&self, ctx: &CallContext, filter: AlertFilter) -> UnitResult<(Vec<Alert>, usize)>;

    async fn update_alert(&self, ctx: &CallContext, alert: Alert) -> UnitResult<()>;

    /// Alerts that are firing or acknowledged.
    async fn list_active_alerts(&self, ctx: &CallContext) -> UnitResult<Vec<Alert>>;
}

#[derive(Default)]
struct Tables {
    rules: HashMap<String, AlertRule>,
    alerts: HashMap<String, Alert>,
}

pub struct MemoryAlertStore {
    tables: RwLock<Tables>,
    clock: SharedClock,
}

impl Default for MemoryAlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            clock,
        }
    }
}

/// Rules in creation order; alerts newest first. Ties break on id so
/// listings are stable.
fn sort_rules(rules: &mut [AlertRule]) {
    rules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn create_rule(&self, _ctx: &CallContext, mut rule: AlertRule) -> UnitResult<AlertRule> {
        let mut tables = self.tables.write();
        if rule.id.is_empty() {
            rule.id = Uuid::new_v4().to_string();
        }
        if tables.rules.contains_key(&rule.id) {
            return Err(AlertError::RuleExists(rule.id).into());
        }
        let now = self.clock.now();
        rule.created_at = now;
        rule.updated_at = now;
        tables.rules.insert(rule.id.clone(), rule.clone());
        Ok(rule)
    }

    async fn get_rule(&self, _ctx: &CallContext, id: &str) -> UnitResult<AlertRule> {
        self.tables
            .read()
            .rules
            .get(id)
            .cloned()
            .ok_or_else(|| AlertError::RuleNotFound(id.to_string()).into())
    }

    async fn list_rules(&self, _ctx: &CallContext, filter: RuleFilter) -> UnitResult<Vec<AlertRule>> {
        let mut rules: Vec<AlertRule> = self
            .tables
            .read()
            .rules
            .values()
            .filter(|r| !filter.enabled_only || r.enabled)
            .cloned()
            .collect();
        sort_rules(&mut rules);
        Ok(rules)
    }

    async fn update_rule(&self, _ctx: &CallContext, mut rule: AlertRule) -> UnitResult<AlertRule> {
        let mut tables = self.tables.write();
        if !tables.rules.contains_key(&rule.id) {
            return Err(AlertError::RuleNotFound(rule.id).into());
        }
        rule.updated_at = self.clock.now();
        tables.rules.insert(rule.id.clone(), rule.clone());
        Ok(rule)
    }

    async fn delete_rule(&self, _ctx: &CallContext, id: &str) -> UnitResult<()> {
        match self.tables.write().rules.remove(id) {
            Some(_) => Ok(()),
            None => Err(AlertError::RuleNotFound(id.to_string()).into()),
        }
    }

    async fn create_alert(&self, _ctx: &CallContext, mut alert: Alert) -> UnitResult<Alert> {
        if alert.id.is_empty() {
            alert.id = Uuid::new_v4().to_string();
        }
        self.tables.write().alerts.insert(alert.id.clone(), alert.clone());
        Ok(alert)
    }

    async fn get_alert(&self, _ctx: &CallContext, id: &str) -> UnitResult<Alert> {
        self.tables
            .read()
            .alerts
            .get(id)
            .cloned()
            .ok_or_else(|| AlertError::AlertNotFound(id.to_string()).into())
    }

    async fn list_alerts(&self, _ctx: &CallContext, filter: AlertFilter) -> UnitResult<(Vec<Alert>, usize)> {
        let mut matched: Vec<Alert> = self
            .tables
            .read()
            .alerts
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        sort_alerts(&mut matched);

        let total = matched.len();
        let start = filter.offset.min(total);
        let end = match filter.limit {
            0 => total,
            limit => start.saturating_add(limit).min(total),
        };
        Ok((matched.drain(start..end).collect(), total))
    }

    async fn update_alert(&self, _ctx: &CallContext, alert: Alert) -> UnitResult<()> {
        let mut tables = self.tables.write();
        match tables.alerts.get_mut(&alert.id) {
            Some(slot) => {
                *slot = alert;
                Ok(())
            }
            None => Err(AlertError::AlertNotFound(alert.id).into()),
        }
    }

    async fn list_active_alerts(&self, _ctx: &CallContext) -> UnitResult<Vec<Alert>> {
        let mut active: Vec<Alert> = self
            .tables
            .read()
            .alerts
            .values()
            .filter(|a| a.status.is_active())
            .cloned()
            .collect();
        sort_alerts(&mut active);
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::model::{AlertSeverity, AlertStatus};
    use asms_core::{Clock, ErrorCode, ManualClock};
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn ctx() -> CallContext {
        CallContext::background()
    }

    fn rule(name: &str) -> AlertRule {
        AlertRule::new(name, "cpu.utilization > 80", AlertSeverity::Warning)
    }

    fn alert(id: &str, rule_id: &str, status: AlertStatus, severity: AlertSeverity) -> Alert {
        let source = AlertRule {
            id: rule_id.to_string(),
            severity,
            ..rule("source")
        };
        let mut alert = Alert::firing(&source, "threshold crossed", Utc::now());
        alert.id = id.to_string();
        alert.status = status;
        alert
    }

    #[tokio::test]
    async fn test_create_rule_assigns_id_and_rejects_collision() {
        let store = MemoryAlertStore::new();
        let created = store.create_rule(&ctx(), rule("High CPU")).await.unwrap();
        assert!(!created.id.is_empty());
        assert!(created.created_at <= created.updated_at);

        let dup = AlertRule {
            id: created.id.clone(),
            ..rule("Again")
        };
        let err = store.create_rule(&ctx(), dup).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
    }

    #[tokio::test]
    async fn test_rule_round_trip_and_timestamps() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = MemoryAlertStore::with_clock(clock.clone());
        let created = store.create_rule(&ctx(), rule("High CPU")).await.unwrap();

        let read = store.get_rule(&ctx(), &created.id).await.unwrap();
        assert_eq!(read, created);

        clock.advance(Duration::seconds(5));
        let mut changed = read.clone();
        changed.enabled = false;
        let updated = store.update_rule(&ctx(), changed).await.unwrap();
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.updated_at, created.created_at + Duration::seconds(5));
        assert!(updated.updated_at <= clock.now());
    }

    #[tokio::test]
    async fn test_missing_rule_operations_fail_not_found() {
        let store = MemoryAlertStore::new();
        for err in [
            store.get_rule(&ctx(), "nope").await.unwrap_err(),
            store.delete_rule(&ctx(), "nope").await.unwrap_err(),
            store
                .update_rule(&ctx(), AlertRule { id: "nope".into(), ..rule("x") })
                .await
                .unwrap_err(),
        ] {
            assert_eq!(err.code(), ErrorCode::AlertRuleNotFound);
            assert!(err.is_not_found());
        }
    }

    #[tokio::test]
    async fn test_enabled_only_filter() {
        let store = MemoryAlertStore::new();
        store.create_rule(&ctx(), rule("on")).await.unwrap();
        store
            .create_rule(&ctx(), AlertRule { enabled: false, ..rule("off") })
            .await
            .unwrap();

        assert_eq!(store.list_rules(&ctx(), RuleFilter::default()).await.unwrap().len(), 2);
        let enabled = store
            .list_rules(&ctx(), RuleFilter { enabled_only: true })
            .await
            .unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "on");
    }

    #[tokio::test]
    async fn test_create_alert_overwrites_existing_id() {
        let store = MemoryAlertStore::new();
        store
            .create_alert(&ctx(), alert("a1", "r1", AlertStatus::Firing, AlertSeverity::Info))
            .await
            .unwrap();
        store
            .create_alert(&ctx(), alert("a1", "r2", AlertStatus::Resolved, AlertSeverity::Info))
            .await
            .unwrap();

        let stored = store.get_alert(&ctx(), "a1").await.unwrap();
        assert_eq!(stored.rule_id, "r2");
    }

    #[tokio::test]
    async fn test_pagination_keeps_total() {
        let store = MemoryAlertStore::new();
        let statuses = [
            AlertStatus::Firing,
            AlertStatus::Firing,
            AlertStatus::Resolved,
            AlertStatus::Firing,
            AlertStatus::Acknowledged,
        ];
        for (i, status) in statuses.into_iter().enumerate() {
            store
                .create_alert(&ctx(), alert(&format!("a{}", i), "r1", status, AlertSeverity::Warning))
                .await
                .unwrap();
        }

        let firing = |limit, offset| AlertFilter {
            status: Some(AlertStatus::Firing),
            limit,
            offset,
            ..Default::default()
        };

        let (page, total) = store.list_alerts(&ctx(), firing(2, 0)).await.unwrap();
        assert_eq!((page.len(), total), (2, 3));

        let (page, total) = store.list_alerts(&ctx(), firing(2, 2)).await.unwrap();
        assert_eq!((page.len(), total), (1, 3));

        let (page, total) = store.list_alerts(&ctx(), firing(0, 10)).await.unwrap();
        assert_eq!((page.len(), total), (0, 3));

        let (page, total) = store.list_alerts(&ctx(), firing(0, 0)).await.unwrap();
        assert_eq!((page.len(), total), (3, 3));
    }

    #[tokio::test]
    async fn test_active_is_firing_or_acknowledged() {
        let store = MemoryAlertStore::new();
        for (id, status) in [
            ("a", AlertStatus::Firing),
            ("b", AlertStatus::Acknowledged),
            ("c", AlertStatus::Resolved),
        ] {
            store
                .create_alert(&ctx(), alert(id, "r", status, AlertSeverity::Critical))
                .await
                .unwrap();
        }
        let mut ids: Vec<_> = store
            .list_active_alerts(&ctx())
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);

        let err = store
            .update_alert(&ctx(), alert("zzz", "r", AlertStatus::Firing, AlertSeverity::Info))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlertNotFound);
    }
}
