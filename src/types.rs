use bson::Document as BsonDocument;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type CollectionName = String;

/// Key of a stored document: the integer `id` field.
pub type DocumentId = i64;

/// A wrapper for `bson::Document` so documents can travel inside bincode-encoded records.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializableBsonDocument(pub BsonDocument);

impl Serialize for SerializableBsonDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = bson::to_vec(&self.0).map_err(serde::ser::Error::custom)?;
        serializer.serialize_bytes(&bytes)
    }
}

impl<'de> Deserialize<'de> for SerializableBsonDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = <Vec<u8>>::deserialize(deserializer)?;
        let doc = bson::from_slice(&bytes).map_err(serde::de::Error::custom)?;
        Ok(Self(doc))
    }
}

/// Mutations recorded by a storage engine, replayed in order on open.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Operation {
    Upsert { collection: CollectionName, document: SerializableBsonDocument },
    Delete { collection: CollectionName, document_id: DocumentId },
    /// Removal of several documents as one record.
    DeleteMany { collection: CollectionName, document_ids: Vec<DocumentId> },
}
