// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Runtime Configuration
//!
//! Tunables of the unit runtime: watch intervals per resource kind, channel
//! capacities, the event bus, correlation scope and the device temperature
//! threshold. Every field has a default, so an empty file (or no file) is a
//! valid configuration.
//!
//! Discovery order: explicit path → `ASMS_CONFIG_PATH` →
//! `./asms-config.yaml` → `~/.asms/config.yaml` → `/etc/asms/config.yaml`
//! → defaults. Environment overrides are applied last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::streaming::DEFAULT_STREAM_CAPACITY;
use crate::application::watch::DEFAULT_WATCH_CAPACITY;
use crate::domain::events::CorrelationScope;
use crate::infrastructure::event_bus::DEFAULT_BUS_CAPACITY;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub watch: WatchConfig,
    pub streaming: StreamingConfig,
    pub events: EventsConfig,
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    #[serde(with = "humantime_serde")]
    pub alert_rules: Duration,
    #[serde(with = "humantime_serde")]
    pub alert_active: Duration,
    #[serde(with = "humantime_serde")]
    pub device_info: Duration,
    #[serde(with = "humantime_serde")]
    pub device_metrics: Duration,
    #[serde(with = "humantime_serde")]
    pub device_health: Duration,
    #[serde(with = "humantime_serde")]
    pub inference_models: Duration,
    #[serde(with = "humantime_serde")]
    pub service: Duration,
    #[serde(with = "humantime_serde")]
    pub services: Duration,
    pub channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            alert_rules: Duration::from_secs(30),
            alert_active: Duration::from_secs(5),
            device_info: Duration::from_secs(30),
            device_metrics: Duration::from_secs(5),
            device_health: Duration::from_secs(10),
            inference_models: Duration::from_secs(60),
            service: Duration::from_secs(30),
            services: Duration::from_secs(60),
            channel_capacity: DEFAULT_WATCH_CAPACITY,
        }
    }
}

impl WatchConfig {
    fn intervals(&self) -> [(&'static str, Duration); 8] {
        [
            ("alert_rules", self.alert_rules),
            ("alert_active", self.alert_active),
            ("device_info", self.device_info),
            ("device_metrics", self.device_metrics),
            ("device_health", self.device_health),
            ("inference_models", self.inference_models),
            ("service", self.service),
            ("services", self.services),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub channel_capacity: usize,
    /// Pause between mock provider chunks.
    #[serde(with = "humantime_serde")]
    pub mock_chunk_delay: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_STREAM_CAPACITY,
            mock_chunk_delay: Duration::from_millis(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub bus_capacity: usize,
    pub correlation: CorrelationScope,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            bus_capacity: DEFAULT_BUS_CAPACITY,
            correlation: CorrelationScope::PerEvent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub temperature_alert_celsius: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            temperature_alert_celsius: 85.0,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be at least 1")]
    ZeroCapacity(&'static str),

    #[error("watch interval {0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("device.temperature_alert_celsius must be a positive number, got {0}")]
    InvalidThreshold(f64),
}

impl RuntimeConfig {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        std::fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    /// First existing file in discovery order, if any.
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ASMS_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./asms-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".asms").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/asms/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load from an explicit path (which must be readable), else from
    /// discovery, else defaults; then apply environment overrides and
    /// validate.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else if let Some(path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else {
            tracing::debug!("No configuration file found in standard locations, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Override hook with an injectable lookup so tests do not touch the
    /// process environment.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("ASMS_WATCH_CHANNEL_CAPACITY") {
            match val.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => {
                    tracing::info!("Environment override: ASMS_WATCH_CHANNEL_CAPACITY={}", capacity);
                    self.watch.channel_capacity = capacity;
                }
                _ => tracing::warn!(
                    "Invalid value for ASMS_WATCH_CHANNEL_CAPACITY: '{}'. Expected a positive integer. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("ASMS_EVENT_CORRELATION") {
            match val.to_lowercase().as_str() {
                "per_event" => self.events.correlation = CorrelationScope::PerEvent,
                "per_execution" => self.events.correlation = CorrelationScope::PerExecution,
                _ => tracing::warn!(
                    "Invalid value for ASMS_EVENT_CORRELATION: '{}'. Expected per_event or per_execution. Ignoring.",
                    val
                ),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("watch.channel_capacity"));
        }
        if self.streaming.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("streaming.channel_capacity"));
        }
        if self.events.bus_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("events.bus_capacity"));
        }
        if let Some((name, _)) = self.watch.intervals().into_iter().find(|(_, d)| d.is_zero()) {
            return Err(ConfigError::ZeroInterval(name));
        }
        let threshold = self.device.temperature_alert_celsius;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(())
    }
}
