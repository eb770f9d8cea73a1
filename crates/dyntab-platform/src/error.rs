use dyntab_repo::RepoError;

/// Errors that can occur while loading or applying a platform description.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid platform description: {0}")]
    Invalid(String),

    /// A cross-reference names a node that is not declared.
    #[error("unknown node reference: {0}")]
    UnknownReference(String),

    /// Two nodes share a name.
    #[error("duplicate node name: {0}")]
    DuplicateName(String),

    #[error("repository error: {0}")]
    Repository(#[from] RepoError),
}

impl From<PlatformError> for RepoError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::Repository(inner) => inner,
            other => RepoError::InvalidParameter(other.to_string()),
        }
    }
}

/// Convenience alias for platform results.
pub type PlatformResult<T> = Result<T, PlatformError>;
