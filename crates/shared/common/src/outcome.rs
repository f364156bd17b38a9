//! Structured result of a write operation.
//!
//! Writes never surface expected business conditions as `Err`: a missing
//! user, a uniqueness conflict, a rejected input or a store failure all come
//! back as an `Outcome` with `success == false` and a message.

use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Why a write did not apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Conflict,
    Validation,
    Store,
}

/// `(success, message, data)` result of a write
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T = ()> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl<T> Outcome<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            failure: None,
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            failure: Some(kind),
        }
    }

    /// Fold a transaction result into an outcome.
    ///
    /// Business errors keep their own message. Store and internal errors are
    /// prefixed with `failed to <action>` and keep the underlying diagnostic.
    pub fn from_result(result: AppResult<T>, message: &str, action: &str) -> Self {
        match result {
            Ok(data) => Self::success(data, message),
            Err(err) => Self::from_error(err, action),
        }
    }

    pub fn from_error(err: AppError, action: &str) -> Self {
        let kind = match &err {
            AppError::NotFound(_) => FailureKind::NotFound,
            AppError::Conflict(_) => FailureKind::Conflict,
            AppError::Validation(_) => FailureKind::Validation,
            _ => FailureKind::Store,
        };

        if err.is_business() {
            tracing::debug!(code = err.code(), "{} rejected: {}", action, err);
            Self::failure(kind, err.to_string())
        } else {
            tracing::error!(code = err.code(), "failed to {}: {}", action, err);
            Self::failure(kind, format!("failed to {}: {}", action, err))
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Check the failure kind
    pub fn failed_with(&self, kind: FailureKind) -> bool {
        self.failure == Some(kind)
    }

    /// Drop the payload, keeping status and message
    pub fn discard(self) -> Outcome<()> {
        Outcome {
            success: self.success,
            message: self.message,
            data: self.success.then_some(()),
            failure: self.failure,
        }
    }
}

impl Outcome<()> {
    /// Successful write with no payload
    pub fn done(message: impl Into<String>) -> Self {
        Self::success((), message)
    }
}
