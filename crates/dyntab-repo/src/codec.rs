use serde::de::DeserializeOwned;
use serde::Serialize;

use dyntab_types::{ObjectId, Token};

use crate::descriptor::ObjectDescriptor;
use crate::error::{RepoError, RepoResult};

/// A typed configuration record with a fixed object id.
///
/// Records are stored with `bincode`; a descriptor holding `count` records
/// is their plain concatenation, so aggregated reads of several entries
/// decode the same way as a single entry.
pub trait CmObject: Serialize + DeserializeOwned {
    /// The repository id every record of this type is stored under.
    const OBJECT_ID: ObjectId;

    /// Encode one record.
    fn encode(&self) -> RepoResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| RepoError::Codec(e.to_string()))
    }

    /// Encode a list of records into one descriptor.
    fn encode_all(items: &[Self], token: Token) -> RepoResult<ObjectDescriptor>
    where
        Self: Sized,
    {
        let mut data = Vec::new();
        for item in items {
            bincode::serialize_into(&mut data, item).map_err(|e| RepoError::Codec(e.to_string()))?;
        }
        let count = u32::try_from(items.len())
            .map_err(|_| RepoError::InvalidParameter("too many instances".into()))?;
        Ok(ObjectDescriptor::new(Self::OBJECT_ID, token, count, data))
    }

    /// Decode exactly `descriptor.count` records.
    ///
    /// Missing or leftover bytes are [`RepoError::BadBufferSize`].
    fn decode_all(descriptor: &ObjectDescriptor) -> RepoResult<Vec<Self>>
    where
        Self: Sized,
    {
        let mut cursor: &[u8] = &descriptor.data;
        let mut items = Vec::new();
        for index in 0..descriptor.count {
            let item = bincode::deserialize_from(&mut cursor).map_err(|e| {
                RepoError::BadBufferSize {
                    id: descriptor.object_id,
                    detail: format!("instance {index} of {}: {e}", descriptor.count),
                }
            })?;
            items.push(item);
        }
        if !cursor.is_empty() {
            return Err(RepoError::BadBufferSize {
                id: descriptor.object_id,
                detail: format!("{} trailing bytes after {} instances", cursor.len(), descriptor.count),
            });
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyntab_types::ArmObject;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        uid: u32,
        name: String,
    }

    impl CmObject for Sample {
        const OBJECT_ID: ObjectId = ObjectId::arm(ArmObject::NamedComponent);
    }

    fn make_sample(uid: u32, name: &str) -> Sample {
        Sample {
            uid,
            name: name.into(),
        }
    }

    #[test]
    fn decode_variable_length_records() {
        let items = vec![make_sample(1, "a"), make_sample(2, "longer name")];
        let desc = Sample::encode_all(&items, Token::NULL).unwrap();
        assert_eq!(desc.count, 2);
        assert_eq!(desc.object_id, Sample::OBJECT_ID);
        assert_eq!(Sample::decode_all(&desc).unwrap(), items);
    }

    #[test]
    fn concatenated_encodings_decode_as_one_list() {
        let mut data = make_sample(5, "x").encode().unwrap();
        data.extend(make_sample(6, "yy").encode().unwrap());
        let desc = ObjectDescriptor::new(Sample::OBJECT_ID, Token::NULL, 2, data);
        let decoded = Sample::decode_all(&desc).unwrap();
        assert_eq!(decoded[1].uid, 6);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut desc = Sample::encode_all(&[make_sample(1, "a")], Token::NULL).unwrap();
        desc.data.push(0);
        let err = Sample::decode_all(&desc).unwrap_err();
        assert!(matches!(err, RepoError::BadBufferSize { .. }));
    }

    #[test]
    fn short_payload_is_rejected() {
        let mut desc = Sample::encode_all(&[make_sample(1, "a")], Token::NULL).unwrap();
        desc.count = 2;
        let err = Sample::decode_all(&desc).unwrap_err();
        assert!(matches!(err, RepoError::BadBufferSize { .. }));
    }
}
