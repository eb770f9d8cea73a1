use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use dyntab_types::{ArmObject, ObjectId, StdObject, Token, TokenAllocator};

use crate::error::{RepoError, RepoResult};
use crate::helpers::RepositoryExt;
use crate::memory::{InMemoryRepository, RepositorySnapshot};
use crate::std_objects::ManagerInfo;

/// Callback fired once the manager is installed.
///
/// Returning [`RepoError::Unsupported`] re-registers the callback; it fires
/// again on the next [`ConfigurationManager::install`]. Any other error is
/// logged and the callback is dropped.
pub type ReadyCallback = Box<dyn FnMut(&ConfigurationManager) -> RepoResult<()> + Send>;

/// Instance count of one object id, as reported by
/// [`ConfigurationManager::describe`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectCount {
    pub object_id: ObjectId,
    pub name: &'static str,
    pub count: u32,
}

/// Owns the repository for one firmware instance.
///
/// Platform components register population callbacks before the manager is
/// installed; [`install`](Self::install) seeds the manager info object and
/// runs them. There is no global instance: callers pass the manager by
/// reference.
pub struct ConfigurationManager {
    repo: InMemoryRepository,
    tokens: TokenAllocator,
    pending: Mutex<Vec<ReadyCallback>>,
    installed: AtomicBool,
}

impl ConfigurationManager {
    pub fn new() -> Self {
        Self {
            repo: InMemoryRepository::new(),
            tokens: TokenAllocator::new(),
            pending: Mutex::new(Vec::new()),
            installed: AtomicBool::new(false),
        }
    }

    /// The live repository.
    pub fn repository(&self) -> &InMemoryRepository {
        &self.repo
    }

    /// Immutable copy of the repository for a table build.
    pub fn snapshot(&self) -> RepositorySnapshot {
        self.repo.snapshot()
    }

    /// Allocate a fresh cross-reference token.
    pub fn new_token(&self) -> Token {
        self.tokens.next_token()
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Number of callbacks still waiting for installation.
    pub fn pending_callbacks(&self) -> usize {
        self.pending.lock().expect("lock poisoned").len()
    }

    /// Install the manager and fire every queued ready-callback.
    ///
    /// The first call seeds the [`ManagerInfo`] object. Returns the number
    /// of callbacks that completed.
    pub fn install(&self) -> RepoResult<usize> {
        if !self.installed.swap(true, Ordering::AcqRel) {
            self.repo.add_object(Token::NULL, &ManagerInfo::default())?;
            tracing::info!("configuration manager installed");
        }

        let queued = std::mem::take(&mut *self.pending.lock().expect("lock poisoned"));
        let mut fired = 0;
        for callback in queued {
            if self.fire(callback) {
                fired += 1;
            }
        }
        self.repo.log_contents();
        Ok(fired)
    }

    /// Register a callback to run once the manager is installed.
    ///
    /// Runs immediately when the manager is already installed.
    pub fn register_on_ready(&self, callback: ReadyCallback) {
        if self.is_installed() {
            self.fire(callback);
        } else {
            self.pending.lock().expect("lock poisoned").push(callback);
        }
    }

    fn fire(&self, mut callback: ReadyCallback) -> bool {
        match callback(self) {
            Ok(()) => true,
            Err(RepoError::Unsupported) => {
                tracing::debug!("ready callback not ready yet, re-registering");
                self.pending.lock().expect("lock poisoned").push(callback);
                false
            }
            Err(e) => {
                tracing::warn!("ready callback failed: {}", e);
                false
            }
        }
    }

    /// Instance counts for every standard and ARM object id.
    pub fn describe(&self) -> RepoResult<Vec<ObjectCount>> {
        let ids = StdObject::ALL
            .into_iter()
            .map(ObjectId::std)
            .chain(ArmObject::ALL.into_iter().map(ObjectId::arm));
        ids.map(|object_id| {
            Ok(ObjectCount {
                object_id,
                name: object_id.name(),
                count: self.repo.count_only(object_id)?,
            })
        })
        .collect()
    }
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigurationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationManager")
            .field("installed", &self.is_installed())
            .field("entry_count", &self.repo.len())
            .field("tokens_issued", &self.tokens.issued())
            .finish()
    }
}
