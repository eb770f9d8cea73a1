use std::sync::RwLock;

use dyntab_types::{ObjectId, Token};

use crate::descriptor::ObjectDescriptor;
use crate::error::{RepoError, RepoResult};
use crate::traits::ConfigRepository;

/// One stored payload, keyed by object id and token.
#[derive(Clone, Debug)]
struct Entry {
    object_id: ObjectId,
    token: Token,
    count: u32,
    data: Vec<u8>,
}

impl Entry {
    /// Wildcard match used by reads and deletes.
    fn matches(&self, id: ObjectId, token: Token) -> bool {
        self.object_id == id && (token.is_null() || self.token == token)
    }
}

/// Summary of one repository entry, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntrySummary {
    pub object_id: ObjectId,
    pub token: Token,
    pub count: u32,
    pub size: usize,
}

fn aggregate(entries: &[Entry], id: ObjectId, token: Token) -> RepoResult<ObjectDescriptor> {
    let mut data: Vec<u8> = Vec::new();
    let mut count: u32 = 0;
    for entry in entries.iter().filter(|e| e.matches(id, token)) {
        data.try_reserve(entry.data.len())
            .map_err(|_| RepoError::OutOfResources(data.len() + entry.data.len()))?;
        data.extend_from_slice(&entry.data);
        count = count.checked_add(entry.count).ok_or_else(|| {
            RepoError::InvalidParameter(format!("instance count overflow for object {id}"))
        })?;
    }
    if count == 0 {
        return Err(RepoError::NotFound { id, token });
    }
    Ok(ObjectDescriptor::new(id, token, count, data))
}

fn check_free(descriptor: &ObjectDescriptor) -> RepoResult<()> {
    if descriptor.is_empty() {
        return Err(RepoError::InvalidParameter(format!(
            "descriptor for object {} owns no payload",
            descriptor.object_id
        )));
    }
    Ok(())
}

fn summarize(entries: &[Entry]) -> Vec<EntrySummary> {
    entries
        .iter()
        .map(|e| EntrySummary {
            object_id: e.object_id,
            token: e.token,
            count: e.count,
            size: e.data.len(),
        })
        .collect()
}

/// In-memory, list-based configuration repository.
///
/// Entries live in a `Vec` behind a `RwLock`. New entries are inserted at
/// the head, so aggregated reads return the newest entry first.
pub struct InMemoryRepository {
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Number of entries (not instances) currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Total payload bytes across all entries.
    pub fn total_bytes(&self) -> usize {
        self.entries
            .read()
            .expect("lock poisoned")
            .iter()
            .map(|e| e.data.len())
            .sum()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.write().expect("lock poisoned").clear();
    }

    /// Every entry in repository order.
    pub fn summaries(&self) -> Vec<EntrySummary> {
        summarize(&self.entries.read().expect("lock poisoned"))
    }

    /// Freeze the current contents into an immutable copy.
    ///
    /// Later writes to `self` are not visible through the snapshot.
    pub fn snapshot(&self) -> RepositorySnapshot {
        let entries = self.entries.read().expect("lock poisoned").clone();
        RepositorySnapshot { entries }
    }

    /// Log every entry at debug level.
    pub fn log_contents(&self) {
        for entry in self.summaries() {
            tracing::debug!(
                id = %entry.object_id,
                name = entry.object_id.name(),
                token = %entry.token,
                count = entry.count,
                size = entry.size,
                "repository entry"
            );
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigRepository for InMemoryRepository {
    fn get(&self, id: ObjectId, token: Token) -> RepoResult<ObjectDescriptor> {
        let entries = self.entries.read().expect("lock poisoned");
        aggregate(&entries, id, token)
    }

    fn set(
        &self,
        id: ObjectId,
        token: Token,
        descriptor: Option<ObjectDescriptor>,
    ) -> RepoResult<()> {
        let mut entries = self.entries.write().expect("lock poisoned");
        match descriptor {
            None => {
                let before = entries.len();
                entries.retain(|e| !e.matches(id, token));
                tracing::debug!(
                    id = %id,
                    token = %token,
                    removed = before - entries.len(),
                    "removed repository entries"
                );
            }
            Some(desc) => {
                if desc.object_id != id {
                    return Err(RepoError::InvalidParameter(format!(
                        "descriptor for object {} stored under id {id}",
                        desc.object_id
                    )));
                }
                // Replacement needs an exact token match, unlike reads and deletes.
                match entries
                    .iter_mut()
                    .find(|e| e.object_id == id && e.token == token)
                {
                    Some(entry) => {
                        entry.count = desc.count;
                        entry.data = desc.data;
                    }
                    None => entries.insert(
                        0,
                        Entry {
                            object_id: id,
                            token,
                            count: desc.count,
                            data: desc.data,
                        },
                    ),
                }
            }
        }
        Ok(())
    }

    fn free(&self, descriptor: ObjectDescriptor) -> RepoResult<()> {
        check_free(&descriptor)
    }
}

impl std::fmt::Debug for InMemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("entry_count", &self.len())
            .finish()
    }
}

/// Immutable copy of a repository taken for the duration of a table build.
///
/// Reads behave exactly like the source repository at the time the snapshot
/// was taken; writes fail with [`RepoError::ReadOnly`].
#[derive(Clone, Debug)]
pub struct RepositorySnapshot {
    entries: Vec<Entry>,
}

impl RepositorySnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summaries(&self) -> Vec<EntrySummary> {
        summarize(&self.entries)
    }
}

impl ConfigRepository for RepositorySnapshot {
    fn get(&self, id: ObjectId, token: Token) -> RepoResult<ObjectDescriptor> {
        aggregate(&self.entries, id, token)
    }

    fn set(&self, _id: ObjectId, _token: Token, _: Option<ObjectDescriptor>) -> RepoResult<()> {
        Err(RepoError::ReadOnly)
    }

    fn free(&self, descriptor: ObjectDescriptor) -> RepoResult<()> {
        check_free(&descriptor)
    }
}
