use dyntab_types::{ObjectId, Revision, Token};

use crate::descriptor::ObjectDescriptor;
use crate::error::RepoResult;

/// Revision of the repository protocol implemented by this crate.
pub const PROTOCOL_REVISION: Revision = Revision::new(1, 1);

/// Peers at or above this revision expect every `get` to be paired with
/// `free`; older peers skip it.
pub const FREE_REQUIRED_SINCE: Revision = Revision::new(1, 1);

/// The configuration repository protocol.
///
/// All implementations must satisfy these invariants:
/// - `get(id, NULL)` concatenates every entry of `id` in repository order;
///   `get(id, t)` only the entries whose token is `t`. Zero matches is
///   `NotFound` and no buffer escapes.
/// - `set(id, t, Some(d))` replaces the payload of the entry whose token is
///   exactly `t` (a null token only matches null-token entries), otherwise
///   inserts a new entry.
/// - `set(id, t, None)` deletes entries by the same wildcard rule as `get`.
///   Deleting nothing is not an error.
/// - The repository never interprets payload bytes.
pub trait ConfigRepository: Send + Sync {
    /// Protocol revision of this repository.
    fn revision(&self) -> Revision {
        PROTOCOL_REVISION
    }

    /// Aggregate every entry matching `id` (and `token`, unless null).
    fn get(&self, id: ObjectId, token: Token) -> RepoResult<ObjectDescriptor>;

    /// Replace, insert, or (with `None`) delete entries.
    ///
    /// The stored entry is keyed by `id` and `token`; the descriptor's own
    /// token field is ignored.
    fn set(&self, id: ObjectId, token: Token, descriptor: Option<ObjectDescriptor>)
        -> RepoResult<()>;

    /// Release a descriptor returned by [`get`](Self::get).
    fn free(&self, descriptor: ObjectDescriptor) -> RepoResult<()>;

    /// Whether callers must hand `get` results back through `free`.
    fn requires_free(&self) -> bool {
        self.revision() >= FREE_REQUIRED_SINCE
    }
}
