use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid signature {0:?}: expected 4 ASCII characters")]
    InvalidSignature(String),

    #[error("invalid revision {0:?}: expected MAJOR.MINOR")]
    InvalidRevision(String),

    #[error("unknown table generator: {0}")]
    UnknownGenerator(String),

    #[error("unknown namespace in object id 0x{0:08x}")]
    UnknownNamespace(u32),
}
