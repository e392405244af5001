// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod config;
pub mod event_bus;
pub mod event_recorder;

pub use config::{ConfigError, DeviceConfig, EventsConfig, RuntimeConfig, StreamingConfig, WatchConfig};
pub use event_bus::{DomainEventReceiver, EventBus, EventBusError, EventReceiver, DEFAULT_BUS_CAPACITY};
pub use event_recorder::EventRecorder;
