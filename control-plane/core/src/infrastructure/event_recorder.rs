// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-memory publisher that keeps every event it is given. Used by tests
//! and by the CLI to print what an execution raised.

use parking_lot::RwLock;

use crate::domain::events::{Event, EventPublisher};

#[derive(Debug, Default)]
pub struct EventRecorder {
    events: RwLock<Vec<Event>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    pub fn of_type(&self, event_type: &str) -> Vec<Event> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn types(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.event_type.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.write())
    }
}

impl EventPublisher for EventRecorder {
    fn publish(&self, event: Event) {
        self.events.write().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_and_drains() {
        let recorder = EventRecorder::new();
        recorder.publish(Event::new("alert.triggered", "alert", json!({})));
        recorder.publish(Event::new("alert.resolved", "alert", json!({})));

        assert_eq!(recorder.types(), vec!["alert.triggered", "alert.resolved"]);
        assert_eq!(recorder.of_type("alert.resolved").len(), 1);
        assert_eq!(recorder.drain().len(), 2);
        assert!(recorder.is_empty());
    }
}
