//! Configuration object repository.
//!
//! Platform code feeds typed records ("objects") into a central store; table
//! generators later query the store and serialize what they find. The store
//! itself is payload-agnostic: every entry is an `(ObjectId, Token, bytes)`
//! triple plus a logical instance count.
//!
//! # Layers
//!
//! - [`ConfigRepository`] -- the `get` / `set` / `free` protocol
//! - [`InMemoryRepository`] -- the only backend, a `RwLock`'d entry list
//! - [`RepositoryExt`] -- read-modify-write conveniences and typed access
//! - [`CmObject`] -- typed records encoded with `bincode`
//! - [`ConfigurationManager`] -- owns a repository, allocates tokens and
//!   fires ready-notifications for platform components
//!
//! # Design Rules
//!
//! 1. `get` with [`Token::NULL`](dyntab_types::Token::NULL) aggregates every
//!    entry of the id; a real token narrows to that entry.
//! 2. `set` with a payload replaces only an exact `(id, token)` match, else
//!    inserts a new entry at the head of the list.
//! 3. `set` without a payload deletes by the wildcard rule of `get`.
//! 4. Aggregation order is repository order: newest entry first.
//! 5. Table builds read from a [`RepositorySnapshot`], never the live store.

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod helpers;
pub mod manager;
pub mod memory;
pub mod std_objects;
pub mod traits;

pub use codec::CmObject;
pub use descriptor::ObjectDescriptor;
pub use error::{RepoError, RepoResult};
pub use helpers::RepositoryExt;
pub use manager::{ConfigurationManager, ObjectCount, ReadyCallback};
pub use memory::{EntrySummary, InMemoryRepository, RepositorySnapshot};
pub use std_objects::{AcpiTableInfo, ManagerInfo};
pub use traits::{ConfigRepository, FREE_REQUIRED_SINCE, PROTOCOL_REVISION};
