// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use asms_core::{ErrorCode, UnitError};

pub const DOMAIN: &str = "device";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("device not found: {0}")]
    NotFound(String),

    #[error("device unreachable: {0}")]
    Unreachable(String),

    #[error("device metrics error: {0}")]
    Metrics(String),

    #[error("no devices detected")]
    NoDevices,

    #[error("invalid device id")]
    InvalidDeviceId,

    #[error("invalid power limit")]
    InvalidPowerLimit,

    #[error("device provider not set")]
    ProviderNotSet,
}

impl DeviceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DeviceError::NotFound(_) | DeviceError::NoDevices => ErrorCode::DeviceNotFound,
            DeviceError::Unreachable(_) => ErrorCode::DeviceUnreachable,
            DeviceError::Metrics(_) => ErrorCode::DeviceMetricsError,
            DeviceError::InvalidDeviceId | DeviceError::InvalidPowerLimit => ErrorCode::InvalidInput,
            DeviceError::ProviderNotSet => ErrorCode::InternalError,
        }
    }
}

impl From<DeviceError> for UnitError {
    fn from(err: DeviceError) -> Self {
        let code = err.code();
        match err {
            DeviceError::InvalidDeviceId | DeviceError::InvalidPowerLimit | DeviceError::ProviderNotSet => {
                UnitError::new(code, err.to_string())
            }
            _ => UnitError::in_domain(DOMAIN, code, err.to_string()),
        }
    }
}
