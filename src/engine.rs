use crate::collection::Collection;
use crate::errors::DbError;
use crate::types::{CollectionName, Operation};
use crate::wal::{MemoryStorage, StorageEngine, Wal};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The embedded document store: named collections sharing one operation log.
pub struct Engine {
    path: Option<PathBuf>,
    storage: Arc<Mutex<Box<dyn StorageEngine>>>,
    collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("path", &self.path)
            .field("collections", &self.list_collection_names())
            .finish()
    }
}

impl Engine {
    /// An engine whose data lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        let storage: Box<dyn StorageEngine> = Box::new(MemoryStorage);
        Self {
            path: None,
            storage: Arc::new(Mutex::new(storage)),
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Opens (or creates) the operation log at `path` and replays it.
    ///
    /// # Errors
    /// Fails if the log cannot be opened or a complete record is corrupt.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let path = path.as_ref().to_path_buf();
        let mut wal = Wal::open(&path)?;
        let ops = wal.read_all()?;
        let storage: Box<dyn StorageEngine> = Box::new(wal);
        let engine = Self {
            path: Some(path),
            storage: Arc::new(Mutex::new(storage)),
            collections: RwLock::new(HashMap::new()),
        };
        let replayed = ops.len();
        for op in ops {
            let name = match &op {
                Operation::Upsert { collection, .. }
                | Operation::Delete { collection, .. }
                | Operation::DeleteMany { collection, .. } => collection.clone(),
            };
            engine.create_collection(&name).apply_replayed(op);
        }
        log::info!(
            "opened {} ({} operations replayed, {} collections)",
            engine.path.as_deref().map(Path::display).map_or_else(String::new, |d| d.to_string()),
            replayed,
            engine.collections.read().len()
        );
        Ok(engine)
    }

    /// Returns the named collection, creating it empty if needed.
    pub fn create_collection(&self, name: &str) -> Arc<Collection> {
        if let Some(col) = self.collections.read().get(name) {
            return Arc::clone(col);
        }
        let mut cols = self.collections.write();
        Arc::clone(cols.entry(name.to_string()).or_insert_with(|| {
            log::debug!("creating collection {name}");
            Arc::new(Collection::new(name.to_string(), Arc::clone(&self.storage)))
        }))
    }

    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<CollectionName> {
        let mut names: Vec<CollectionName> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Backing file, or `None` for an in-memory engine.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn create_collection_is_idempotent() {
        let e = Engine::in_memory();
        let a = e.create_collection("students");
        a.save_document(doc! {"id": 1_i64}).unwrap();
        let b = e.create_collection("students");
        assert_eq!(b.len(), 1);
        assert!(e.get_collection("other").is_none());
        e.create_collection("alpha");
        assert_eq!(e.list_collection_names(), vec!["alpha".to_string(), "students".to_string()]);
        assert!(e.path().is_none());
    }
}
