//! Application layer errors.
//!
//! These errors represent failures in orchestration: the network, the ports
//! and user hooks. HTTP-level failures are not errors here; they become
//! failure values stored in place of the payload.

use std::time::Duration;

use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur during fetch and render orchestration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplicationError {
    /// The fetcher could not reach the source at all.
    #[error("Transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// A join point exceeded the soft timeout.
    #[error("Timed out after {elapsed:?} waiting for {waiting_on}")]
    Timeout {
        waiting_on: String,
        elapsed: Duration,
    },

    /// A fetch task ended without delivering a result.
    #[error("Fetch for '{key}' was abandoned before completing")]
    FetchAbandoned { key: String },

    /// Port/Adapter not configured.
    #[error("Required adapter not configured: {name}")]
    AdapterNotConfigured { name: &'static str },

    /// Session storage read or write failed.
    #[error("Session storage error: {reason}")]
    Session { reason: String },

    /// A user hook returned an error or panicked.
    #[error("Hook '{hook}' failed: {reason}")]
    HookFailed { hook: &'static str, reason: String },

    /// The page could not satisfy a request.
    #[error("Page error: {reason}")]
    Page { reason: String },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport { url, .. } => vec![
                format!("Could not reach: {}", url),
                "Check the source URL and that the server is running".into(),
                "Relative sources resolve against --base-url".into(),
            ],
            Self::Timeout { .. } => vec![
                "A fetch took longer than the cycle timeout".into(),
                "Raise cycle_timeout_ms in the configuration".into(),
            ],
            Self::AdapterNotConfigured { name } => vec![
                format!("Required component not configured: {}", name),
                "Pass it to Framework::builder() before build()".into(),
            ],
            Self::Session { .. } => vec![
                "The session file could not be read or written".into(),
                "Check permissions or remove the file to start fresh".into(),
            ],
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } | Self::FetchAbandoned { .. } => {
                ErrorCategory::Network
            }
            Self::AdapterNotConfigured { .. } => ErrorCategory::Configuration,
            Self::Page { .. } => ErrorCategory::NotFound,
            Self::Session { .. } | Self::HookFailed { .. } => ErrorCategory::Internal,
        }
    }
}

/// Result alias for the application layer.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
