use std::fmt;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable failure codes for the external block proposer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposerErrorCode {
    MissingApiKey,
    Forbidden,
    HttpTimeout,
    RateLimited,
    InvalidResponse,
    InvalidRequest,
    ProviderUnavailable,
    Unknown,
}

impl ProposerErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ProposerErrorCode::MissingApiKey => "MISSING_API_KEY",
            ProposerErrorCode::Forbidden => "FORBIDDEN",
            ProposerErrorCode::HttpTimeout => "HTTP_TIMEOUT",
            ProposerErrorCode::RateLimited => "RATE_LIMITED",
            ProposerErrorCode::InvalidResponse => "INVALID_RESPONSE",
            ProposerErrorCode::InvalidRequest => "INVALID_REQUEST",
            ProposerErrorCode::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            ProposerErrorCode::Unknown => "UNKNOWN_PROPOSER_ERROR",
        }
    }
}

impl fmt::Display for ProposerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("{message}")]
    Proposer {
        code: ProposerErrorCode,
        message: String,
        correlation_id: Option<String>,
        details: Option<JsonValue>,
    },

    #[error("store error: {message}")]
    Store { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "timegrid::validation", %message, "validation error");
        AppError::Validation {
            message,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "timegrid::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            details: Some(details),
        }
    }

    pub fn proposer(code: ProposerErrorCode, message: impl Into<String>) -> Self {
        Self::proposer_with_details(code, message, None, None)
    }

    pub fn proposer_with_details(
        code: ProposerErrorCode,
        message: impl Into<String>,
        correlation_id: Option<&str>,
        details: Option<JsonValue>,
    ) -> Self {
        let message = message.into();
        let correlation = correlation_id.map(|value| value.to_string());
        match (&correlation, &details) {
            (Some(id), Some(payload)) => {
                warn!(
                    target: "timegrid::proposer::error",
                    code = %code,
                    correlation_id = %id,
                    details = %payload,
                    %message
                );
            }
            (Some(id), None) => {
                warn!(
                    target: "timegrid::proposer::error",
                    code = %code,
                    correlation_id = %id,
                    %message
                );
            }
            (None, Some(payload)) => {
                warn!(target: "timegrid::proposer::error", code = %code, details = %payload, %message);
            }
            (None, None) => {
                warn!(target: "timegrid::proposer::error", code = %code, %message);
            }
        }

        AppError::Proposer {
            code,
            message,
            correlation_id: correlation,
            details,
        }
    }

    pub fn proposer_code(&self) -> Option<ProposerErrorCode> {
        match self {
            AppError::Proposer { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn proposer_correlation_id(&self) -> Option<&str> {
        match self {
            AppError::Proposer { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }

    pub fn proposer_details(&self) -> Option<&JsonValue> {
        match self {
            AppError::Proposer { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "timegrid::store", %message, "store error");
        AppError::Store { message }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "timegrid::other", %message, "other error");
        AppError::Other(message)
    }
}
