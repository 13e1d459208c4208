use thiserror::Error;

/// Why an I/O wait was abandoned before it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Errors crossing the conversation storage contract.
///
/// Messages never carry raw driver output; backends log that detail
/// themselves and return only the failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("conversation not found")]
    NotFound,

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("invalid stored conversation: {0}")]
    Invalid(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<Interrupted> for StoreError {
    fn from(value: Interrupted) -> Self {
        match value {
            Interrupted::Cancelled => StoreError::Cancelled,
            Interrupted::DeadlineExceeded => StoreError::DeadlineExceeded,
        }
    }
}

/// Errors from an external secret source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("secret not found")]
    NotFound,

    #[error("secret provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("secret fetch cancelled")]
    Cancelled,

    #[error("secret fetch deadline exceeded")]
    DeadlineExceeded,
}

impl From<Interrupted> for SecretError {
    fn from(value: Interrupted) -> Self {
        match value {
            Interrupted::Cancelled => SecretError::Cancelled,
            Interrupted::DeadlineExceeded => SecretError::DeadlineExceeded,
        }
    }
}

/// Outcome of an authentication attempt.
///
/// A wrong key and an unresolvable secret both surface as
/// `InvalidCredentials`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("API key required")]
    MissingCredentials,

    #[error("invalid API key")]
    InvalidCredentials,
}

impl AuthError {
    /// Stable machine-readable code for client responses.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "MISSING_API_KEY",
            AuthError::InvalidCredentials => "INVALID_API_KEY",
        }
    }
}

/// Errors from the reply generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("reply generation failed: {0}")]
    Generation(String),

    #[error("reply generation cancelled")]
    Cancelled,

    #[error("reply generation deadline exceeded")]
    DeadlineExceeded,
}

impl From<Interrupted> for EngineError {
    fn from(value: Interrupted) -> Self {
        match value {
            Interrupted::Cancelled => EngineError::Cancelled,
            Interrupted::DeadlineExceeded => EngineError::DeadlineExceeded,
        }
    }
}

/// Errors from a full conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors parsing configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown storage backend: '{0}'")]
    UnknownBackend(String),

    #[error("unknown secret source: '{0}'")]
    UnknownSecretSource(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Unavailable("save conversation".to_string());
        assert_eq!(err.to_string(), "storage backend unavailable: save conversation");
        assert!(err.is_unavailable());
        assert!(StoreError::NotFound.is_not_found());
    }

    #[test]
    fn test_interrupted_conversions() {
        assert_eq!(StoreError::from(Interrupted::Cancelled), StoreError::Cancelled);
        assert_eq!(
            SecretError::from(Interrupted::DeadlineExceeded),
            SecretError::DeadlineExceeded
        );
        assert_eq!(EngineError::from(Interrupted::Cancelled), EngineError::Cancelled);
    }

    #[test]
    fn test_service_error_is_transparent() {
        let err: ServiceError = StoreError::NotFound.into();
        assert_eq!(err.to_string(), "conversation not found");
    }

    #[test]
    fn test_auth_error_display_is_generic() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "invalid API key");
        assert_eq!(AuthError::MissingCredentials.code(), "MISSING_API_KEY");
        assert_eq!(AuthError::InvalidCredentials.code(), "INVALID_API_KEY");
    }
}
