//! Typed student queries over the document store.

mod store;

pub use store::{CollectionStudentRepository, STUDENTS_COLLECTION};

use crate::aggregation::Pipeline;
use crate::document::{Mark, StudentDoc};
use crate::errors::DbError;
use crate::query::Filter;
use crate::types::DocumentId;
use bson::Document as BsonDocument;
use chrono::NaiveDate;

/// Repository seam between the service and the store.
///
/// Queries that match nothing return `None` or an empty list, never an error.
pub trait StudentRepository: Send + Sync {
    fn exists_by_id(&self, id: DocumentId) -> bool;

    /// Stores a new student; `false` when the id is already taken.
    ///
    /// # Errors
    /// Propagates storage failures.
    fn insert(&self, student: &StudentDoc) -> Result<bool, DbError>;

    /// Appends one mark; `false` when the student does not exist.
    ///
    /// # Errors
    /// Propagates storage failures.
    fn push_mark(&self, id: DocumentId, mark: &Mark) -> Result<bool, DbError>;

    /// The student if it has at least one mark in `subject`.
    ///
    /// # Errors
    /// Fails if the stored document cannot be decoded.
    fn find_by_id_and_marks_subject(&self, id: DocumentId, subject: &str) -> Result<Option<StudentDoc>, DbError>;

    /// The student if it has at least one mark dated within `[from, to]`.
    ///
    /// # Errors
    /// Fails if the stored document cannot be decoded.
    fn find_by_id_and_marks_date_between(
        &self,
        id: DocumentId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<StudentDoc>, DbError>;

    /// Students whose phone starts with `prefix`, projected to id, name and phone.
    ///
    /// # Errors
    /// Fails if a stored document cannot be decoded.
    fn find_students_phone_prefix(&self, prefix: &str) -> Result<Vec<StudentDoc>, DbError>;

    /// Students with at least one mark, every one of them above `threshold`; id and name only.
    ///
    /// # Errors
    /// Fails if a stored document cannot be decoded.
    fn find_students_all_marks_greater(&self, threshold: i32) -> Result<Vec<StudentDoc>, DbError>;

    /// Deletes every student with fewer than `n` marks and returns them in natural order.
    ///
    /// # Errors
    /// Propagates storage failures.
    fn remove_students_few_marks(&self, n: usize) -> Result<Vec<StudentDoc>, DbError>;

    /// Raw filter passthrough.
    ///
    /// # Errors
    /// Fails if a stored document cannot be decoded.
    fn find(&self, filter: &Filter) -> Result<Vec<StudentDoc>, DbError>;

    /// # Errors
    /// Propagates pipeline failures.
    fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<BsonDocument>, DbError>;
}
