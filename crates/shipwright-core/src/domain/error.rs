//! Error taxonomy for the deployment pipeline.
//!
//! Every failure a request can surface is one of these variants. The
//! `client_fault` split drives the HTTP status mapping at the boundary:
//! client faults are rejected without retry, everything else is a system
//! fault the caller may safely resubmit (slug derivation is idempotent).

use thiserror::Error;

/// Errors produced while handling a deployment request.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Presented secret does not match the allow-listed identity.
    #[error("credential mismatch for {0}")]
    Unauthorized(String),

    /// Request violates a structural invariant (round, task, nonce,
    /// attachment name or payload).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Round 2 addressed a repository that does not exist.
    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    /// The hosting service could not be reached (transient).
    #[error("hosting service unavailable: {0}")]
    RemoteUnavailable(String),

    /// The hosting service rejected the operation (fatal).
    #[error("hosting service rejected request: {0}")]
    RemoteRejected(String),

    /// A version-control step failed; the request has no valid partial
    /// publish and must be replayed as a whole.
    #[error("publish failed: {0}")]
    Publish(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    /// Whether the failure was caused by the caller rather than the system.
    pub fn client_fault(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::InvalidRequest(_) | Self::RepositoryNotFound(_)
        )
    }
}

/// Result type for deployment operations.
pub type Result<T> = std::result::Result<T, DeployError>;
