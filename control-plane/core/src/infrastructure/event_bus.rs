// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// Event Bus - Pub/Sub for unit and domain events
//
// In-memory fan-out over a tokio broadcast channel. Publishing never
// blocks: when a receiver falls behind by more than the capacity it loses
// the oldest events and learns about it as `EventBusError::Lagged`.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::{Event, EventPublisher};

pub const DEFAULT_BUS_CAPACITY: usize = 1000;

#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<Event>>,
}

impl EventBus {
    /// Capacity is how many events a receiver may fall behind before it
    /// starts losing the oldest ones.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }

    /// Every event, in publish order.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Only events whose `domain` matches.
    pub fn subscribe_domain(&self, domain: impl Into<String>) -> DomainEventReceiver {
        DomainEventReceiver {
            receiver: self.sender.subscribe(),
            domain: domain.into(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: Event) {
        debug!(event_type = %event.event_type, domain = %event.domain, "publishing event");
        // send fails only when nobody is listening
        if self.sender.send(event).is_err() {
            debug!("no subscribers listening to event");
        }
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<Event>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<Event, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    pub fn try_recv(&mut self) -> Result<Event, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

pub struct DomainEventReceiver {
    receiver: broadcast::Receiver<Event>,
    domain: String,
}

impl DomainEventReceiver {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Next event of this receiver's domain; other domains are skipped.
    pub async fn recv(&mut self) -> Result<Event, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.domain == self.domain {
                return Ok(event);
            }
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
