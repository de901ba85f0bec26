use serde::{Deserialize, Serialize};
use std::fmt;

/// Code carried by the provider error that the fetcher recovers from by bisection.
pub const REQUEST_TOO_LARGE: &str = "PROVIDER_REQUEST_TOO_LARGE";

/// Single structured error shape used across the pipeline, the provider client and the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn request_too_large(details: impl Into<String>) -> Self {
        Self::new(REQUEST_TOO_LARGE, "Provider rejected the request as too large")
            .with_details(details)
    }

    pub fn is_request_too_large(&self) -> bool {
        self.code == REQUEST_TOO_LARGE
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
