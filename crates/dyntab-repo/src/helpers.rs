use dyntab_types::{ObjectId, Token};

use crate::codec::CmObject;
use crate::descriptor::ObjectDescriptor;
use crate::error::{RepoError, RepoResult};
use crate::traits::ConfigRepository;

/// Read-modify-write conveniences layered on [`ConfigRepository`].
///
/// None of these are atomic with respect to other writers: each is a `get`
/// followed by a `set`. Implemented for every repository, including trait
/// objects.
pub trait RepositoryExt: ConfigRepository {
    /// Hand a `get` result back when the protocol revision asks for it.
    fn release(&self, descriptor: ObjectDescriptor) -> RepoResult<()> {
        if self.requires_free() && !descriptor.is_empty() {
            self.free(descriptor)
        } else {
            Ok(())
        }
    }

    /// Number of instances of `id` across all tokens. Absent objects count
    /// as zero.
    fn count_only(&self, id: ObjectId) -> RepoResult<u32> {
        match self.get(id, Token::NULL) {
            Ok(descriptor) => {
                let count = descriptor.count;
                self.release(descriptor)?;
                Ok(count)
            }
            Err(e) if e.is_not_found() => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Append one instance to the `(id, token)` entry, creating it if needed.
    fn add_instance(&self, id: ObjectId, token: Token, bytes: &[u8]) -> RepoResult<()> {
        let (count, combined) = match self.get(id, token) {
            Ok(existing) => {
                let mut combined = Vec::new();
                combined
                    .try_reserve(existing.size() + bytes.len())
                    .map_err(|_| RepoError::OutOfResources(existing.size() + bytes.len()))?;
                combined.extend_from_slice(&existing.data);
                combined.extend_from_slice(bytes);
                let count = existing.count;
                self.release(existing)?;
                (count, combined)
            }
            Err(e) if e.is_not_found() => (0, bytes.to_vec()),
            Err(e) => return Err(e),
        };
        let count = count.checked_add(1).ok_or_else(|| {
            RepoError::InvalidParameter(format!("instance count overflow for object {id}"))
        })?;
        self.set(id, token, Some(ObjectDescriptor::new(id, token, count, combined)))
    }

    /// Append `item_count` equally sized instances packed in `bytes`.
    fn add_instances(
        &self,
        id: ObjectId,
        token: Token,
        bytes: &[u8],
        item_count: usize,
    ) -> RepoResult<()> {
        if item_count == 0 || bytes.is_empty() || bytes.len() % item_count != 0 {
            return Err(RepoError::InvalidParameter(format!(
                "{} bytes cannot be split into {item_count} equal instances",
                bytes.len()
            )));
        }
        let item_size = bytes.len() / item_count;
        for item in bytes.chunks_exact(item_size) {
            self.add_instance(id, token, item)?;
        }
        Ok(())
    }

    /// Delete the `(id, token)` entries. Fails with `NotFound` when there
    /// was nothing to delete.
    fn remove_instance(&self, id: ObjectId, token: Token) -> RepoResult<()> {
        let existing = self.get(id, token)?;
        self.release(existing)?;
        self.set(id, token, None)
    }

    /// Payload of every instance of `id`, discarding the count.
    fn get_single(&self, id: ObjectId) -> RepoResult<Vec<u8>> {
        match self.get(id, Token::NULL) {
            Ok(descriptor) => {
                let data = descriptor.data.clone();
                self.release(descriptor)?;
                Ok(data)
            }
            Err(e) => {
                if e.is_not_found() {
                    tracing::warn!(id = %id, name = id.name(), "object not found");
                }
                Err(e)
            }
        }
    }

    /// Decode every record of `T` under `token`.
    fn get_list<T: CmObject>(&self, token: Token) -> RepoResult<Vec<T>> {
        let descriptor = self.get(T::OBJECT_ID, token)?;
        let items = T::decode_all(&descriptor);
        self.release(descriptor)?;
        items
    }

    /// Like [`get_list`](Self::get_list), with absent objects read as empty.
    fn get_list_or_empty<T: CmObject>(&self, token: Token) -> RepoResult<Vec<T>> {
        match self.get_list(token) {
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            other => other,
        }
    }

    /// First record of a singleton object.
    fn get_object<T: CmObject>(&self) -> RepoResult<T> {
        let id = T::OBJECT_ID;
        let items = match self.get_list::<T>(Token::NULL) {
            Ok(items) => items,
            Err(e) => {
                if e.is_not_found() {
                    tracing::warn!(id = %id, name = id.name(), "object not found");
                }
                return Err(e);
            }
        };
        if items.len() > 1 {
            tracing::debug!(
                id = %id,
                count = items.len(),
                "singleton object has several instances, using the first"
            );
        }
        items.into_iter().next().ok_or(RepoError::NotFound {
            id,
            token: Token::NULL,
        })
    }

    /// Append one typed record.
    fn add_object<T: CmObject>(&self, token: Token, item: &T) -> RepoResult<()> {
        self.add_instance(T::OBJECT_ID, token, &item.encode()?)
    }

    /// Append several typed records under one token.
    fn add_objects<T: CmObject>(&self, token: Token, items: &[T]) -> RepoResult<()> {
        items.iter().try_for_each(|item| self.add_object(token, item))
    }
}

impl<R: ConfigRepository + ?Sized> RepositoryExt for R {}
