use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Opaque 64-bit handle scoping an object instance or group of instances.
///
/// [`Token::NULL`] means "untagged" when writing and "any" when reading.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Token(u64);

impl Token {
    /// The wildcard / untagged token.
    pub const NULL: Token = Token(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("Token(NULL)")
        } else {
            write!(f, "Token(0x{:x})", self.0)
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u64> for Token {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Hands out fresh, never-null tokens.
///
/// Tokens are unique for the lifetime of one allocator; they carry no
/// meaning beyond identity.
#[derive(Debug)]
pub struct TokenAllocator {
    last: AtomicU64,
}

impl TokenAllocator {
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Allocate the next token.
    pub fn next_token(&self) -> Token {
        Token(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Number of tokens handed out so far.
    pub fn issued(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}

impl Default for TokenAllocator {
    fn default() -> Self {
        Self::new()
    }
}
