// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod clock;
pub mod context;
pub mod errors;
pub mod events;
pub mod execution;
pub mod input;
pub mod resource;
pub mod schema;
pub mod unit;

pub use clock::{rfc3339, system_clock, Clock, ManualClock, SharedClock, SystemClock};
pub use context::CallContext;
pub use errors::{ErrorCode, ErrorPayload, StatusClass, UnitError, UnitResult};
pub use events::{
    emit, CorrelationScope, Event, EventPublisher, ExecutionEvent, ExecutionEventKind,
    NoopPublisher, SharedPublisher,
};
pub use execution::ExecutionContext;
pub use input::Input;
pub use resource::{Resource, ResourceFactory, ResourceOperation, ResourceUpdate, Subscription, URI_SCHEME};
pub use schema::{Field, Pattern, Schema, SchemaError, SchemaType};
pub use unit::{Example, StreamChunk, Unit, UnitBuilder, UnitDescriptor, UnitKind};
