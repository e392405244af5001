// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! ASMS Unit Framework
//!
//! Uniform shape for control-plane operations so a transport can discover,
//! validate, execute, stream and watch them without domain knowledge.
//!
//! # Architecture
//!
//! | Layer | Module | Contents |
//! |---|---|---|
//! | Domain | [`domain`] | schema, errors, call context, events, units, resources |
//! | Application | [`application`] | registry, streaming runtime, watch runtime |
//! | Infrastructure | [`infrastructure`] | event bus, event recorder, runtime config |
//!
//! Units are values: a [`UnitDescriptor`](domain::UnitDescriptor) plus an
//! async handler, built with [`Unit::command`](domain::Unit::command) or
//! [`Unit::query`](domain::Unit::query) and looked up by name through the
//! [`UnitRegistry`](application::UnitRegistry).

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::UnitRegistry;
pub use domain::*;
