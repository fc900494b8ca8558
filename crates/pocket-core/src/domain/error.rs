// ============================================================================
// domain/error.rs - DOMAIN ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (they travel through fetch handles)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Invalid directive: {0}")]
    InvalidDirective(String),

    #[error("Invalid placeholder '{{{{{token}}}}}': {reason}")]
    InvalidPlaceholder { token: String, reason: String },

    #[error("Invalid storage tier: {0}")]
    InvalidStorageTier(String),

    #[error("Unknown entry kind: {0}")]
    UnknownEntryKind(String),

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    // ========================================================================
    // Constraint Violations
    // ========================================================================
    #[error("Required field missing: {field}")]
    MissingRequiredField { field: &'static str },

    #[error("Element {node} is not a trigger: {reason}")]
    InvalidTrigger { node: String, reason: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidDirective(msg) => vec![
                "The route fragment does not describe a directive".into(),
                format!("Details: {}", msg),
                "Expected: [{\"t\":\"#target\",\"l\":[{\"n\":\"NAME\",\"u\":\"/url\"}]}]".into(),
            ],
            Self::InvalidPlaceholder { token, .. } => vec![
                format!("Check the placeholder '{{{{{}}}}}'", token),
                "Placeholders look like {{data:key:path}} or {{rec:path}}".into(),
            ],
            Self::InvalidStorageTier(_) => vec![
                "Storage tiers are 0 (ephemeral), 1 (attribute) and 2 (session)".into(),
            ],
            Self::InvalidTrigger { .. } => vec![
                "Triggers need a data-core-templates or data-core-data attribute".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidDirective(_)
            | Self::InvalidPlaceholder { .. }
            | Self::InvalidStorageTier(_)
            | Self::UnknownEntryKind(_)
            | Self::UnsupportedMethod(_) => ErrorCategory::Validation,
            Self::InvalidTrigger { .. } => ErrorCategory::NotFound,
            Self::MissingRequiredField { .. } => ErrorCategory::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Internal,
}
