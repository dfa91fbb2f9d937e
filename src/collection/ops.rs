use super::core::Collection;
use crate::errors::DbError;
use crate::logger::AUDIT_TARGET;
use crate::query::{Cursor, Filter, FindOptions, count_docs, eval_filter, find_docs};
use crate::types::{DocumentId, Operation, SerializableBsonDocument};
use crate::utils::num::bson_as_i64;
use bson::{Bson, Document as BsonDocument};

/// Primary key field every stored document must carry.
pub const ID_FIELD: &str = "id";

fn audit(op: &str, collection: &str, id: DocumentId) {
    log::info!(
        target: AUDIT_TARGET,
        "{}",
        serde_json::json!({ "op": op, "collection": collection, "id": id })
    );
}

fn document_id(doc: &BsonDocument) -> Result<DocumentId, DbError> {
    doc.get(ID_FIELD)
        .and_then(bson_as_i64)
        .ok_or_else(|| DbError::InvalidDocument(format!("document requires an integer `{ID_FIELD}`")))
}

impl Collection {
    #[must_use]
    pub fn find_document(&self, id: DocumentId) -> Option<BsonDocument> {
        self.docs.read().get(id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: DocumentId) -> bool {
        self.docs.read().contains(id)
    }

    /// Inserts or replaces the document keyed by its `id` field.
    ///
    /// # Errors
    /// Fails if the document has no integer id or the log append fails;
    /// in that case memory is left untouched.
    pub fn save_document(&self, document: BsonDocument) -> Result<DocumentId, DbError> {
        let id = document_id(&document)?;
        let mut docs = self.docs.write();
        // Persist first, then apply
        let op = Operation::Upsert {
            collection: self.name().to_string(),
            document: SerializableBsonDocument(document.clone()),
        };
        self.storage.lock().append(&op)?;
        docs.upsert(id, document);
        drop(docs);
        audit("save", self.name(), id);
        Ok(id)
    }

    /// Inserts the document only if its id is free; `false` when the id is taken.
    ///
    /// # Errors
    /// Fails if the document has no integer id or the log append fails.
    pub fn insert_document(&self, document: BsonDocument) -> Result<bool, DbError> {
        let id = document_id(&document)?;
        let mut docs = self.docs.write();
        if docs.contains(id) {
            return Ok(false);
        }
        let op = Operation::Upsert {
            collection: self.name().to_string(),
            document: SerializableBsonDocument(document.clone()),
        };
        self.storage.lock().append(&op)?;
        docs.upsert(id, document);
        drop(docs);
        audit("insert", self.name(), id);
        Ok(true)
    }

    /// Appends `value` to the array at top-level `field` of document `id`.
    ///
    /// Runs under the collection write lock, so concurrent pushes never lose
    /// each other's values. Returns `false` if no such document exists.
    ///
    /// # Errors
    /// Fails if `field` holds a non-array value or the log append fails.
    pub fn push_to_array(&self, id: DocumentId, field: &str, value: Bson) -> Result<bool, DbError> {
        let mut docs = self.docs.write();
        let Some(current) = docs.get(id) else {
            return Ok(false);
        };
        let mut updated = current.clone();
        match updated.get_mut(field) {
            Some(Bson::Array(items)) => items.push(value),
            Some(Bson::Null) | None => {
                updated.insert(field, Bson::Array(vec![value]));
            }
            Some(other) => {
                return Err(DbError::InvalidDocument(format!(
                    "cannot push to `{field}`: holds {:?}",
                    other.element_type()
                )));
            }
        }
        let op = Operation::Upsert {
            collection: self.name().to_string(),
            document: SerializableBsonDocument(updated.clone()),
        };
        self.storage.lock().append(&op)?;
        if let Some(slot) = docs.get_mut(id) {
            *slot = updated;
        }
        drop(docs);
        audit("push", self.name(), id);
        Ok(true)
    }

    /// # Errors
    /// Fails if the log append fails.
    pub fn delete_document(&self, id: DocumentId) -> Result<Option<BsonDocument>, DbError> {
        let mut docs = self.docs.write();
        if !docs.contains(id) {
            return Ok(None);
        }
        let op = Operation::Delete { collection: self.name().to_string(), document_id: id };
        self.storage.lock().append(&op)?;
        let removed = docs.remove(id);
        drop(docs);
        audit("delete", self.name(), id);
        Ok(removed)
    }

    /// Removes every document matching `filter` as one logged step and returns them
    /// in insertion order. Nothing is removed if the log append fails.
    ///
    /// # Errors
    /// Fails if the log append fails.
    pub fn delete_where(&self, filter: &Filter) -> Result<Vec<BsonDocument>, DbError> {
        let mut docs = self.docs.write();
        let victims: Vec<DocumentId> =
            docs.iter().filter(|d| eval_filter(d, filter)).filter_map(|d| document_id(d).ok()).collect();
        if victims.is_empty() {
            return Ok(Vec::new());
        }
        let op = Operation::DeleteMany { collection: self.name().to_string(), document_ids: victims.clone() };
        self.storage.lock().append(&op)?;
        let removed: Vec<BsonDocument> = victims.iter().filter_map(|id| docs.remove(*id)).collect();
        drop(docs);
        for id in &victims {
            audit("delete", self.name(), *id);
        }
        Ok(removed)
    }

    #[must_use]
    pub fn find(&self, filter: &Filter, options: &FindOptions) -> Cursor {
        find_docs(self, filter, options)
    }

    #[must_use]
    pub fn count(&self, filter: &Filter) -> usize {
        count_docs(self, filter)
    }

    /// Snapshot of all documents in insertion order.
    #[must_use]
    pub fn get_all_documents(&self) -> Vec<BsonDocument> {
        self.docs.read().iter().cloned().collect()
    }

    /// Applies a logged operation without logging it again.
    pub(crate) fn apply_replayed(&self, op: Operation) {
        match op {
            Operation::Upsert { document, .. } => match document_id(&document.0) {
                Ok(id) => self.docs.write().upsert(id, document.0),
                Err(e) => log::warn!("skipping replayed document in {}: {e}", self.name()),
            },
            Operation::Delete { document_id, .. } => {
                self.docs.write().remove(document_id);
            }
            Operation::DeleteMany { document_ids, .. } => {
                let mut docs = self.docs.write();
                for id in document_ids {
                    docs.remove(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Collection;
    use crate::engine::Engine;
    use crate::errors::DbError;
    use crate::query::Filter;
    use crate::types::Operation;
    use crate::wal::StorageEngine;
    use bson::{Bson, doc};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Storage whose appends start failing once `broken` is set.
    struct FlakyStorage {
        broken: Arc<AtomicBool>,
    }

    impl StorageEngine for FlakyStorage {
        fn append(&mut self, _operation: &Operation) -> Result<(), DbError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(DbError::Io("disk full".into()));
            }
            Ok(())
        }

        fn read_all(&mut self) -> Result<Vec<Operation>, DbError> {
            Ok(Vec::new())
        }
    }

    fn flaky_collection(name: &str) -> (Arc<Collection>, Arc<AtomicBool>) {
        let broken = Arc::new(AtomicBool::new(false));
        let storage: Box<dyn StorageEngine> = Box::new(FlakyStorage { broken: Arc::clone(&broken) });
        (Arc::new(Collection::new(name.to_string(), Arc::new(Mutex::new(storage)))), broken)
    }

    #[test]
    fn failed_bulk_delete_removes_nothing() {
        let (col, broken) = flaky_collection("c");
        for id in [1_i64, 2, 3] {
            col.save_document(doc! {"id": id, "gone": true}).unwrap();
        }
        broken.store(true, Ordering::SeqCst);
        assert!(matches!(col.delete_where(&Filter::eq("gone", true)), Err(DbError::Io(_))));
        assert_eq!(col.len(), 3);
        broken.store(false, Ordering::SeqCst);
        assert_eq!(col.delete_where(&Filter::eq("gone", true)).unwrap().len(), 3);
        assert!(col.is_empty());
    }

    #[test]
    fn save_requires_integer_id() {
        let e = Engine::in_memory();
        let col = e.create_collection("c");
        assert!(matches!(col.save_document(doc! {"name": "x"}), Err(DbError::InvalidDocument(_))));
        assert!(matches!(col.save_document(doc! {"id": "x"}), Err(DbError::InvalidDocument(_))));
        assert_eq!(col.save_document(doc! {"id": 7}).unwrap(), 7);
    }

    #[test]
    fn insert_refuses_taken_id() {
        let e = Engine::in_memory();
        let col = e.create_collection("c");
        assert!(col.insert_document(doc! {"id": 1_i64, "v": 1}).unwrap());
        assert!(!col.insert_document(doc! {"id": 1_i64, "v": 2}).unwrap());
        assert_eq!(col.find_document(1).unwrap().get_i32("v").unwrap(), 1);
    }

    #[test]
    fn resave_keeps_position() {
        let e = Engine::in_memory();
        let col = e.create_collection("c");
        for id in [1_i64, 2, 3] {
            col.save_document(doc! {"id": id, "v": 0}).unwrap();
        }
        col.save_document(doc! {"id": 1_i64, "v": 9}).unwrap();
        let all = col.get_all_documents();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].get_i32("v").unwrap(), 9);
    }

    #[test]
    fn push_appends_and_creates_array() {
        let e = Engine::in_memory();
        let col = e.create_collection("c");
        col.save_document(doc! {"id": 1_i64}).unwrap();
        assert!(col.push_to_array(1, "marks", Bson::Int32(5)).unwrap());
        assert!(col.push_to_array(1, "marks", Bson::Int32(6)).unwrap());
        assert!(!col.push_to_array(2, "marks", Bson::Int32(6)).unwrap());
        let d = col.find_document(1).unwrap();
        assert_eq!(d.get_array("marks").unwrap().len(), 2);
        col.save_document(doc! {"id": 3_i64, "marks": "oops"}).unwrap();
        assert!(col.push_to_array(3, "marks", Bson::Int32(1)).is_err());
    }

    #[test]
    fn delete_where_returns_removed_in_order() {
        let e = Engine::in_memory();
        let col = e.create_collection("c");
        for id in [4_i64, 1, 3, 2] {
            col.save_document(doc! {"id": id, "odd": id % 2 == 1}).unwrap();
        }
        let removed = col.delete_where(&Filter::eq("odd", true)).unwrap();
        let ids: Vec<i64> = removed.iter().map(|d| d.get_i64("id").unwrap()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(col.len(), 2);
        assert!(col.delete_document(1).unwrap().is_none());
        assert!(col.delete_document(4).unwrap().is_some());
    }
}
