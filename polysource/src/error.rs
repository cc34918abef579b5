//! Error taxonomy shared by every backend

/// Error types for media backend operations
///
/// Errors are `Clone` because live streams emit them as items instead of
/// terminating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// Identifier unowned by any backend, or collection/item absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation unsupported by this backend kind
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Transport or storage failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Malformed backend response
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl MediaError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn not_implemented(what: impl std::fmt::Display) -> Self {
        Self::NotImplemented(what.to_string())
    }

    /// Returns `true` for the two credential-related kinds
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            MediaError::AuthenticationRequired | MediaError::InvalidCredentials
        )
    }
}

/// Result type for media backend operations
pub type Result<T> = std::result::Result<T, MediaError>;
