use super::StudentRepository;
use crate::aggregation::Pipeline;
use crate::collection::Collection;
use crate::document::{
    DATE, ID, MARKS, MARKS_SUBJECT, Mark, NAME, PHONE, SCORE, StudentDoc, date_to_bson, mark_to_bson,
};
use crate::engine::Engine;
use crate::errors::DbError;
use crate::query::{CmpOp, Filter, FindOptions};
use crate::types::DocumentId;
use bson::Document as BsonDocument;
use chrono::NaiveDate;
use std::sync::Arc;

pub const STUDENTS_COLLECTION: &str = "students";

/// [`StudentRepository`] over one store collection.
#[derive(Debug, Clone)]
pub struct CollectionStudentRepository {
    collection: Arc<Collection>,
}

impl CollectionStudentRepository {
    #[must_use]
    pub const fn new(collection: Arc<Collection>) -> Self {
        Self { collection }
    }

    /// Binds to the `students` collection of `engine`.
    #[must_use]
    pub fn open(engine: &Engine) -> Self {
        Self::new(engine.create_collection(STUDENTS_COLLECTION))
    }

    fn find_decoded(&self, filter: &Filter, projection: Option<&[&str]>) -> Result<Vec<StudentDoc>, DbError> {
        let options = FindOptions {
            projection: projection.map(|p| p.iter().map(|f| (*f).to_string()).collect()),
            ..FindOptions::default()
        };
        self.collection.find(filter, &options).map(|d| StudentDoc::from_bson(&d)).collect()
    }

    fn find_one(&self, filter: &Filter) -> Result<Option<StudentDoc>, DbError> {
        let options = FindOptions { limit: Some(1), ..FindOptions::default() };
        self.collection.find(filter, &options).next().map(|d| StudentDoc::from_bson(&d)).transpose()
    }
}

impl StudentRepository for CollectionStudentRepository {
    fn exists_by_id(&self, id: DocumentId) -> bool {
        self.collection.contains(id)
    }

    fn insert(&self, student: &StudentDoc) -> Result<bool, DbError> {
        self.collection.insert_document(student.to_bson())
    }

    fn push_mark(&self, id: DocumentId, mark: &Mark) -> Result<bool, DbError> {
        self.collection.push_to_array(id, MARKS, mark_to_bson(mark))
    }

    fn find_by_id_and_marks_subject(&self, id: DocumentId, subject: &str) -> Result<Option<StudentDoc>, DbError> {
        self.find_one(&Filter::And(vec![Filter::eq(ID, id), Filter::eq(MARKS_SUBJECT, subject)]))
    }

    fn find_by_id_and_marks_date_between(
        &self,
        id: DocumentId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<StudentDoc>, DbError> {
        let in_range = Filter::And(vec![
            Filter::cmp(DATE, CmpOp::Gte, date_to_bson(from)),
            Filter::cmp(DATE, CmpOp::Lte, date_to_bson(to)),
        ]);
        self.find_one(&Filter::And(vec![Filter::eq(ID, id), Filter::elem_match(MARKS, in_range)]))
    }

    fn find_students_phone_prefix(&self, prefix: &str) -> Result<Vec<StudentDoc>, DbError> {
        self.find_decoded(&Filter::prefix(PHONE, prefix)?, Some(&[ID, NAME, PHONE][..]))
    }

    fn find_students_all_marks_greater(&self, threshold: i32) -> Result<Vec<StudentDoc>, DbError> {
        let filter = Filter::And(vec![
            Filter::size(MARKS, CmpOp::Gt, 0),
            Filter::not(Filter::elem_match(MARKS, Filter::cmp(SCORE, CmpOp::Lte, threshold))),
        ]);
        self.find_decoded(&filter, Some(&[ID, NAME][..]))
    }

    fn remove_students_few_marks(&self, n: usize) -> Result<Vec<StudentDoc>, DbError> {
        let few = Filter::Or(vec![
            Filter::size(MARKS, CmpOp::Lt, n),
            Filter::Exists { path: MARKS.to_string(), exists: false },
        ]);
        let filter = if n == 0 { Filter::not(Filter::True) } else { few };
        self.collection.delete_where(&filter)?.iter().map(StudentDoc::from_bson).collect()
    }

    fn find(&self, filter: &Filter) -> Result<Vec<StudentDoc>, DbError> {
        self.find_decoded(filter, None)
    }

    fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<BsonDocument>, DbError> {
        self.collection.aggregate(pipeline)
    }
}
