// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the ASMS CLI

pub mod config;
pub mod exec;
pub mod resources;
pub mod units;

pub use self::config::ConfigCommand;
