// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! ASMS CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Hosts the unit registry in-process and renders its
//!   units, resources and configuration for the terminal

pub mod commands;
pub mod logging;
pub mod output;
pub mod runtime;
