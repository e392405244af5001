// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use asms_core::{ErrorCode, UnitError};

pub const DOMAIN: &str = "alert";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertError {
    #[error("alert rule not found: {0}")]
    RuleNotFound(String),

    #[error("alert not found: {0}")]
    AlertNotFound(String),

    #[error("rule already exists: {0}")]
    RuleExists(String),

    #[error("invalid severity: {0}")]
    InvalidSeverity(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid rule id")]
    InvalidRuleId,

    #[error("invalid alert id")]
    InvalidAlertId,
}

impl AlertError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AlertError::RuleNotFound(_) => ErrorCode::AlertRuleNotFound,
            AlertError::AlertNotFound(_) => ErrorCode::AlertNotFound,
            AlertError::RuleExists(_) => ErrorCode::AlreadyExists,
            AlertError::InvalidSeverity(_)
            | AlertError::InvalidStatus(_)
            | AlertError::InvalidRuleId
            | AlertError::InvalidAlertId => ErrorCode::InvalidInput,
        }
    }
}

impl From<AlertError> for UnitError {
    fn from(err: AlertError) -> Self {
        UnitError::in_domain(DOMAIN, err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asms_core::StatusClass;

    #[test]
    fn test_codes_route_to_status_classes() {
        let err: UnitError = AlertError::RuleNotFound("r-9".into()).into();
        assert_eq!(err.code(), ErrorCode::AlertRuleNotFound);
        assert_eq!(err.status_class(), StatusClass::NotFound);
        assert_eq!(err.domain(), Some("alert"));

        let err: UnitError = AlertError::RuleExists("r-1".into()).into();
        assert_eq!(err.http_status(), 409);

        let err: UnitError = AlertError::InvalidSeverity("urgent".into()).into();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(err.to_string().contains("severity"));
    }
}
