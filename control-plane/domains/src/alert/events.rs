// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use asms_core::Event;

use super::errors::DOMAIN;
use super::model::Alert;

pub const EVENT_TRIGGERED: &str = "alert.triggered";
pub const EVENT_ACKNOWLEDGED: &str = "alert.acknowledged";
pub const EVENT_RESOLVED: &str = "alert.resolved";

pub fn triggered(alert: &Alert) -> Event {
    Event::new(EVENT_TRIGGERED, DOMAIN, alert.projection())
}

pub fn acknowledged(alert: &Alert) -> Event {
    Event::new(EVENT_ACKNOWLEDGED, DOMAIN, alert.projection())
}

pub fn resolved(alert: &Alert) -> Event {
    Event::new(EVENT_RESOLVED, DOMAIN, alert.projection())
}
