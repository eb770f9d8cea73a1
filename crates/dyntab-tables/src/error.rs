use dyntab_repo::RepoError;

/// Errors that can occur while building a table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// A referenced node, object, or generator does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad revision, oversize node or table, duplicate unique value, or a
    /// missing required object.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The output buffer could not be allocated.
    #[error("out of resources: cannot allocate {0} bytes")]
    OutOfResources(usize),

    /// A write fell outside the space reserved for it.
    #[error("bad buffer size: {0}")]
    BadBufferSize(String),

    /// The request names a table nobody can build.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepoError),
}

impl TableError {
    /// `NotFound` from this layer or the repository below it.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Repository(e) => e.is_not_found(),
            _ => false,
        }
    }

    pub fn is_invalid_parameter(&self) -> bool {
        match self {
            Self::InvalidParameter(_) => true,
            Self::Repository(RepoError::InvalidParameter(_)) => true,
            _ => false,
        }
    }
}

/// Convenience alias for table results.
pub type TableResult<T> = Result<T, TableError>;
