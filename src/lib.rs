//! Student records with dated, subject-tagged marks, backed by an embedded document store.
//!
//! Layers, leaf first: [`engine`]/[`collection`] store BSON documents and log every mutation
//! to a checksummed operation log; [`query`] and [`aggregation`] evaluate filters and
//! pipelines over them; [`repo`] maps typed student queries onto filters; [`service`]
//! exposes the student operations.

pub mod aggregation;
pub mod cli;
pub mod collection;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod fixtures;
pub mod logger;
pub mod query;
pub mod repo;
pub mod service;
pub mod types;
pub mod utils;
pub mod wal;

pub use document::{IdName, IdNameMarks, Mark, MarksBucket, Student};
pub use errors::{ConfigError, DbError, StudentsError};
pub use service::StudentsService;

use crate::config::StudentsConfig;
use crate::engine::Engine;
use crate::repo::CollectionStudentRepository;
use std::path::Path;
use std::sync::Arc;

/// Opens the students service on a database file, or in memory when `path` is `None`.
///
/// # Errors
/// Fails if the database file cannot be opened or replayed.
pub fn open_service(path: Option<&Path>, config: &StudentsConfig) -> Result<StudentsService, DbError> {
    let engine = match path {
        Some(p) => Engine::open(p)?,
        None => Engine::in_memory(),
    };
    let repo = Arc::new(CollectionStudentRepository::open(&engine));
    Ok(StudentsService::with_config(repo, config))
}
