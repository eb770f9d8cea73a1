use dyntab_types::{ObjectId, Token};

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// No entry matched the requested id and token.
    #[error("object {id} ({}) not found for token {token}", id.name())]
    NotFound { id: ObjectId, token: Token },

    /// The call itself was malformed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A buffer could not be allocated.
    #[error("out of resources: cannot allocate {0} bytes")]
    OutOfResources(usize),

    /// A payload does not match the size its instance count implies.
    #[error("bad buffer size for object {id}: {detail}")]
    BadBufferSize { id: ObjectId, detail: String },

    /// No repository is available to serve the request.
    #[error("configuration repository not available")]
    Unsupported,

    /// The repository is a read-only snapshot.
    #[error("repository snapshot is read-only")]
    ReadOnly,

    /// A typed record could not be encoded.
    #[error("codec error: {0}")]
    Codec(String),
}

impl RepoError {
    /// Returns `true` for [`RepoError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience alias for repository results.
pub type RepoResult<T> = Result<T, RepoError>;
