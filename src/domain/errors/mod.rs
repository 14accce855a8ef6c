// Domain errors - Error types for the domain layer

use std::fmt;

use crate::domain::model::AssetKind;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// Referenced file not found
    FileNotFound(String),
    /// Duration outside the usable range
    InvalidDuration(String),
    /// Validation failed
    ValidationFailed(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            DomainError::InvalidDuration(msg) => write!(f, "Invalid duration: {}", msg),
            DomainError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

/// Why an asset could not be materialized
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// Remote service refused the submission (non-2xx or malformed response)
    GenerationRejected(String),
    /// Remote job did not reach a terminal state within the poll budget
    GenerationTimeout { polls: u32 },
    /// Remote job reached the `Failed` state
    GenerationFailed(String),
    /// Network or protocol error talking to a remote service
    Transport(String),
    /// Local source file does not exist
    SourceMissing(String),
    /// Local or fetched media could not be decoded
    SourceCorrupt(String),
    /// No adapter is registered for the asset kind
    Unavailable,
    /// The render was cancelled while the asset was in flight
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::GenerationRejected(msg) => write!(f, "generation rejected: {}", msg),
            FailureReason::GenerationTimeout { polls } => {
                write!(f, "generation timed out after {} polls", polls)
            }
            FailureReason::GenerationFailed(msg) => write!(f, "generation failed: {}", msg),
            FailureReason::Transport(msg) => write!(f, "transport error: {}", msg),
            FailureReason::SourceMissing(path) => write!(f, "source missing: {}", path),
            FailureReason::SourceCorrupt(msg) => write!(f, "source corrupt: {}", msg),
            FailureReason::Unavailable => write!(f, "no adapter available"),
            FailureReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Recoverable failure reported by an asset adapter.
///
/// Always absorbed by the compositor and replaced with a fallback slide.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterFailure {
    pub kind: AssetKind,
    pub reason: FailureReason,
}

impl AdapterFailure {
    pub fn new(kind: AssetKind, reason: FailureReason) -> Self {
        Self { kind, reason }
    }

    /// Rejections and timeouts are the remote-job specific subkinds
    pub fn is_remote_job_failure(&self) -> bool {
        matches!(
            self.reason,
            FailureReason::GenerationRejected(_) | FailureReason::GenerationTimeout { .. }
        )
    }
}

impl fmt::Display for AdapterFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} asset failed: {}", self.kind, self.reason)
    }
}

impl std::error::Error for AdapterFailure {}
