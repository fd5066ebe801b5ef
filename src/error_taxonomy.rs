//! Shared error taxonomy across the gateway, the session controller, and the UI.

use crate::client::GatewayError;
use crate::session::ValidationFailure;

/// Broad category for typed error handling and policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Timeout,
    Server,
    InvalidInput,
    Parse,
    Io,
}

/// Severity hint for UI and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
}

/// Unified envelope used when crossing subsystem boundaries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorEnvelope {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub recoverable: bool,
    pub code: String,
    pub message: String,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(
        category: ErrorCategory,
        severity: ErrorSeverity,
        recoverable: bool,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            recoverable,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Write the envelope to the log at a level matching its severity.
    pub fn log(&self, operation: &str) {
        match self.severity {
            ErrorSeverity::Info => tracing::info!(
                operation,
                code = %self.code,
                category = ?self.category,
                "{}",
                self.message
            ),
            ErrorSeverity::Warning => tracing::warn!(
                operation,
                code = %self.code,
                category = ?self.category,
                "{}",
                self.message
            ),
            ErrorSeverity::Error => tracing::error!(
                operation,
                code = %self.code,
                category = ?self.category,
                recoverable = self.recoverable,
                "{}",
                self.message
            ),
        }
    }
}

impl From<&GatewayError> for ErrorEnvelope {
    fn from(value: &GatewayError) -> Self {
        let message = value.to_string();
        match value {
            GatewayError::Transport(_) => Self::new(
                ErrorCategory::Network,
                ErrorSeverity::Error,
                true,
                "gateway_transport",
                message,
            ),
            GatewayError::Timeout(_) => Self::new(
                ErrorCategory::Timeout,
                ErrorSeverity::Warning,
                true,
                "gateway_timeout",
                message,
            ),
            GatewayError::Status { status, .. } if *status >= 500 => Self::new(
                ErrorCategory::Server,
                ErrorSeverity::Error,
                true,
                format!("gateway_http_{status}"),
                message,
            ),
            GatewayError::Status { status, .. } => Self::new(
                ErrorCategory::InvalidInput,
                ErrorSeverity::Error,
                false,
                format!("gateway_http_{status}"),
                message,
            ),
            GatewayError::Decode(_) => Self::new(
                ErrorCategory::Parse,
                ErrorSeverity::Error,
                false,
                "gateway_decode",
                message,
            ),
            GatewayError::Io(_) => Self::new(
                ErrorCategory::Io,
                ErrorSeverity::Error,
                true,
                "document_io",
                message,
            ),
        }
    }
}

impl From<ValidationFailure> for ErrorEnvelope {
    fn from(value: ValidationFailure) -> Self {
        let code = match value {
            ValidationFailure::EmptyMessage => "empty_message",
            ValidationFailure::MissingFile => "missing_file",
        };
        Self::new(
            ErrorCategory::InvalidInput,
            ErrorSeverity::Info,
            true,
            code,
            value.to_string(),
        )
    }
}
