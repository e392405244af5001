// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use asms_core::{ErrorCode, UnitError};

pub const DOMAIN: &str = "inference";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferenceError {
    #[error("model not specified")]
    ModelNotSpecified,

    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} are required")]
    RequiredList(&'static str),

    #[error("invalid message format at index {0}")]
    InvalidMessage(usize),

    #[error("input must be string or array of strings")]
    InvalidEmbedInput,

    #[error("invalid inference parameters: {0}")]
    InvalidParams(String),

    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("inference engine error: {0}")]
    Engine(String),

    #[error("inference timeout")]
    Timeout,

    #[error("inference rate limited")]
    RateLimited,

    #[error("inference provider not set")]
    ProviderNotSet,
}

impl InferenceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            InferenceError::ModelNotSpecified
            | InferenceError::Required(_)
            | InferenceError::RequiredList(_)
            | InferenceError::InvalidMessage(_)
            | InferenceError::InvalidEmbedInput => ErrorCode::InvalidInput,
            InferenceError::InvalidParams(_) => ErrorCode::InferenceInvalidParams,
            InferenceError::ModelNotLoaded(_) => ErrorCode::InferenceModelNotLoaded,
            InferenceError::Engine(_) => ErrorCode::InferenceEngineError,
            InferenceError::Timeout => ErrorCode::InferenceTimeout,
            InferenceError::RateLimited => ErrorCode::InferenceRateLimited,
            InferenceError::ProviderNotSet => ErrorCode::InternalError,
        }
    }

    /// Backend failures carry the domain label; input problems do not.
    fn is_domain_error(&self) -> bool {
        matches!(
            self,
            InferenceError::ModelNotLoaded(_)
                | InferenceError::Engine(_)
                | InferenceError::Timeout
                | InferenceError::RateLimited
        )
    }
}

impl From<InferenceError> for UnitError {
    fn from(err: InferenceError) -> Self {
        if err.is_domain_error() {
            UnitError::in_domain(DOMAIN, err.code(), err.to_string())
        } else {
            UnitError::new(err.code(), err.to_string())
        }
    }
}
