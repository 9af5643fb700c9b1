//! Error types for FlowChat.

use thiserror::Error;

/// A shared error type for the FlowChat core and the layers built on it.
///
/// `NotFound` and `InvalidMerge` indicate a UI sequencing defect (a selection
/// that was not revalidated against the store). `ExternalService` is the only
/// expected runtime failure and is normally absorbed by the fallback path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowchatError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A merge was requested over an ineligible selection
    #[error("Invalid merge: {0}")]
    InvalidMerge(String),

    /// A merge is already in flight for this conversation
    #[error("Merge already in progress for conversation '{conversation_id}'")]
    MergeInProgress { conversation_id: String },

    /// The completion collaborator failed
    #[error("External service failure: {message}")]
    ExternalService {
        message: String,
        status_code: Option<u16>,
        is_retryable: bool,
    },

    /// Invalid user input (e.g. an empty message)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlowchatError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an InvalidMerge error
    pub fn invalid_merge(message: impl Into<String>) -> Self {
        Self::InvalidMerge(message.into())
    }

    /// Creates an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an InvalidMerge error
    pub fn is_invalid_merge(&self) -> bool {
        matches!(self, Self::InvalidMerge(_))
    }

    /// Check if this is a MergeInProgress error
    pub fn is_merge_in_progress(&self) -> bool {
        matches!(self, Self::MergeInProgress { .. })
    }

    /// Check if this is an external service failure
    pub fn is_external_service(&self) -> bool {
        matches!(self, Self::ExternalService { .. })
    }

    /// Returns true for errors that signal a sequencing defect rather than a
    /// condition the user can recover from.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::InvalidMerge(_) | Self::Internal(_)
        )
    }
}

/// Failure of the text-completion collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The request never produced an HTTP response (connect, timeout, ...)
    #[error("Completion request failed: {message}")]
    Request { message: String, is_retryable: bool },

    /// The service answered with a non-success status
    #[error("Completion service returned {status_code}: {message}")]
    Status {
        status_code: u16,
        message: String,
        is_retryable: bool,
    },

    /// The response body could not be decoded
    #[error("Failed to decode completion response: {0}")]
    Decode(String),

    /// The response decoded but carried no text
    #[error("Completion service returned no content")]
    EmptyResponse,

    /// The collaborator is not configured (or deliberately offline)
    #[error("Completion service unavailable: {0}")]
    Unavailable(String),
}

impl CompletionError {
    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request { is_retryable, .. } | Self::Status { is_retryable, .. } => {
                *is_retryable
            }
            _ => false,
        }
    }

    /// The HTTP status code, if the service answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl From<CompletionError> for FlowchatError {
    fn from(err: CompletionError) -> Self {
        Self::ExternalService {
            status_code: err.status_code(),
            is_retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, FlowchatError>`.
pub type Result<T> = std::result::Result<T, FlowchatError>;
