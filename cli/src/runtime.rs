// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-process control plane for CLI commands: every domain on mock
//! providers and in-memory stores, with domain events captured for display.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use asms_core::infrastructure::{EventRecorder, RuntimeConfig};
use asms_core::{UnitError, UnitRegistry};
use asms_domains::ControlPlane;

pub struct Runtime {
    pub config: RuntimeConfig,
    pub plane: ControlPlane,
    pub events: Arc<EventRecorder>,
}

impl Runtime {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = RuntimeConfig::load_or_default(config_path).context("Failed to load configuration")?;
        Self::from_config(config)
    }

    pub fn from_config(config: RuntimeConfig) -> Result<Self> {
        let events = Arc::new(EventRecorder::new());
        let plane = ControlPlane::with_mocks(&config, Some(events.clone()))
            .map_err(unit_error)
            .context("Failed to register domains")?;
        Ok(Self { config, plane, events })
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.plane.registry
    }
}

/// `--input` text as a JSON value. Absent input is `{}`.
pub fn parse_input(raw: Option<&str>) -> Result<Value> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Value::Object(Default::default())),
        Some(text) => serde_json::from_str(text).context("--input is not valid JSON"),
    }
}

pub fn unit_error(err: UnitError) -> anyhow::Error {
    anyhow::anyhow!(err.to_string())
}
