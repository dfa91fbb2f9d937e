use crate::types::DocumentId;
use crate::wal::StorageEngine;
use bson::Document as BsonDocument;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Documents in insertion order, addressable by id.
///
/// Re-saving an existing id keeps its original position.
#[derive(Debug, Default)]
pub(crate) struct DocumentStore {
    next_seq: u64,
    by_seq: BTreeMap<u64, BsonDocument>,
    seq_of: HashMap<DocumentId, u64>,
}

impl DocumentStore {
    pub(crate) fn get(&self, id: DocumentId) -> Option<&BsonDocument> {
        self.seq_of.get(&id).and_then(|seq| self.by_seq.get(seq))
    }

    pub(crate) fn get_mut(&mut self, id: DocumentId) -> Option<&mut BsonDocument> {
        let seq = *self.seq_of.get(&id)?;
        self.by_seq.get_mut(&seq)
    }

    pub(crate) fn contains(&self, id: DocumentId) -> bool {
        self.seq_of.contains_key(&id)
    }

    pub(crate) fn upsert(&mut self, id: DocumentId, doc: BsonDocument) {
        if let Some(seq) = self.seq_of.get(&id) {
            self.by_seq.insert(*seq, doc);
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.seq_of.insert(id, seq);
        self.by_seq.insert(seq, doc);
    }

    pub(crate) fn remove(&mut self, id: DocumentId) -> Option<BsonDocument> {
        let seq = self.seq_of.remove(&id)?;
        self.by_seq.remove(&seq)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &BsonDocument> {
        self.by_seq.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_seq.len()
    }
}

pub struct Collection {
    name: String,
    pub(crate) docs: RwLock<DocumentStore>,
    pub(crate) storage: Arc<Mutex<Box<dyn StorageEngine>>>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).field("len", &self.len()).finish()
    }
}

impl Collection {
    pub(crate) fn new(name: String, storage: Arc<Mutex<Box<dyn StorageEngine>>>) -> Self {
        Self { name, docs: RwLock::new(DocumentStore::default()), storage }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
