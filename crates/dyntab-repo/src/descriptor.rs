use std::fmt;

use dyntab_types::{ObjectId, Token};

/// A flat concatenation of `count` instances of one object type.
///
/// The instance size is type-dependent and opaque to the repository, so the
/// payload length is never inferred from `count`.
#[derive(Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub object_id: ObjectId,
    pub token: Token,
    pub count: u32,
    pub data: Vec<u8>,
}

impl ObjectDescriptor {
    pub fn new(object_id: ObjectId, token: Token, count: u32, data: Vec<u8>) -> Self {
        Self {
            object_id,
            token,
            count,
            data,
        }
    }

    /// A descriptor holding exactly one instance.
    pub fn single(object_id: ObjectId, token: Token, data: Vec<u8>) -> Self {
        Self::new(object_id, token, 1, data)
    }

    /// Total payload length in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Debug for ObjectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDescriptor")
            .field("object_id", &self.object_id)
            .field("token", &self.token)
            .field("count", &self.count)
            .field("size", &self.size())
            .finish()
    }
}
