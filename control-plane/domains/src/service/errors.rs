// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use asms_core::{ErrorCode, UnitError};

pub const DOMAIN: &str = "service";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("service not found: {0}")]
    NotFound(String),

    #[error("service already exists: {0}")]
    AlreadyExists(String),

    #[error("service already running: {0}")]
    AlreadyRunning(String),

    #[error("service start failed: {0}")]
    StartFailed(String),

    #[error("service scale failed: {0}")]
    ScaleFailed(String),

    #[error("{0} is required")]
    Required(&'static str),

    #[error("replicas must be a non-negative integer")]
    InvalidReplicas,

    #[error("invalid service id: {0}")]
    InvalidServiceId(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid resource class: {0}")]
    InvalidResourceClass(String),

    #[error("service provider not set")]
    ProviderNotSet,
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::NotFound(_) => ErrorCode::ServiceNotFound,
            ServiceError::AlreadyExists(_) | ServiceError::AlreadyRunning(_) => ErrorCode::AlreadyExists,
            ServiceError::StartFailed(_) => ErrorCode::ServiceStartFailed,
            ServiceError::ScaleFailed(_) => ErrorCode::ServiceScaleFailed,
            ServiceError::Required(_)
            | ServiceError::InvalidReplicas
            | ServiceError::InvalidServiceId(_)
            | ServiceError::InvalidStatus(_)
            | ServiceError::InvalidResourceClass(_) => ErrorCode::InvalidInput,
            ServiceError::ProviderNotSet => ErrorCode::InternalError,
        }
    }

    fn is_domain_error(&self) -> bool {
        matches!(
            self,
            ServiceError::NotFound(_) | ServiceError::StartFailed(_) | ServiceError::ScaleFailed(_)
        )
    }
}

impl From<ServiceError> for UnitError {
    fn from(err: ServiceError) -> Self {
        if err.is_domain_error() {
            UnitError::in_domain(DOMAIN, err.code(), err.to_string())
        } else {
            UnitError::new(err.code(), err.to_string())
        }
    }
}
