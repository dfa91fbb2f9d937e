use super::StudentsService;
use crate::aggregation::{Accumulator, GROUP_ID, Pipeline, Projection};
use crate::document::{ID, IdName, IdNameMarks, MARKS, MARKS_SCORE, MARKS_SUBJECT, MarksBucket, NAME, StudentDoc};
use crate::errors::{DbError, StudentsError};
use crate::query::{CmpOp, Filter, Order, SortSpec};
use crate::utils::num::bson_as_i64;
use bson::{Bson, Document as BsonDocument};

/// Per-student average score field in grouped rows.
pub const AVG_SCORE_FIELD: &str = "avgScore";

fn avg_score() -> (String, Accumulator) {
    (AVG_SCORE_FIELD.to_string(), Accumulator::Avg(MARKS_SCORE.to_string()))
}

fn pushed_marks() -> (String, Accumulator) {
    (MARKS.to_string(), Accumulator::Push(MARKS.to_string()))
}

fn by_avg(order: Order) -> Vec<SortSpec> {
    vec![SortSpec::new(AVG_SCORE_FIELD, order)]
}

/// Reads a `{_id: {id, name}, marks?}` group row back into a student.
fn grouped_student(row: &BsonDocument) -> Result<StudentDoc, DbError> {
    let mut flat = row
        .get_document(GROUP_ID)
        .map_err(|e| DbError::Bson(format!("group row without key: {e}")))?
        .clone();
    if let Some(marks) = row.get(MARKS) {
        flat.insert(MARKS, marks.clone());
    }
    StudentDoc::from_bson(&flat)
}

fn bucket_bound(key: &BsonDocument, field: &str) -> Result<i32, DbError> {
    key.get(field)
        .and_then(bson_as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| DbError::Bson(format!("bucket {field} is not a score")))
}

impl StudentsService {
    /// Mean of every recorded score across all students.
    ///
    /// # Errors
    /// `NoMarks` when no student has any mark.
    pub fn average_score_over_all(&self) -> Result<f64, StudentsError> {
        let pipeline = Pipeline::new().unwind(MARKS).group(&[], vec![avg_score()]);
        let rows = self.repo.aggregate(&pipeline)?;
        rows.first()
            .and_then(|r| match r.get(AVG_SCORE_FIELD) {
                Some(Bson::Double(avg)) => Some(*avg),
                _ => None,
            })
            .ok_or(StudentsError::NoMarks)
    }

    /// Students whose own average is strictly above `threshold`, best first.
    ///
    /// # Errors
    /// Store failures only.
    pub fn students_with_average_above(&self, threshold: i32) -> Result<Vec<IdName>, StudentsError> {
        log::debug!("students with average above {threshold}");
        let pipeline = Pipeline::new()
            .unwind(MARKS)
            .group(&[ID, NAME], vec![avg_score()])
            .matching(Filter::cmp(AVG_SCORE_FIELD, CmpOp::Gt, threshold))
            .sort(by_avg(Order::Desc))
            .project(Projection::Exclude(vec![AVG_SCORE_FIELD.to_string()]));
        let rows = self.repo.aggregate(&pipeline)?;
        let students = rows.iter().map(grouped_student).collect::<Result<Vec<_>, _>>()?;
        Ok(students.into_iter().map(StudentDoc::into_id_name).collect())
    }

    /// [`Self::students_with_average_above`] at the configured good mark.
    ///
    /// # Errors
    /// Store failures only.
    pub fn good_students(&self) -> Result<Vec<IdName>, StudentsError> {
        self.students_with_average_above(self.good_mark)
    }

    /// Students with at least one mark and every score above `threshold`, in natural order.
    ///
    /// # Errors
    /// Store failures only.
    pub fn students_with_all_scores_above(&self, threshold: i32) -> Result<Vec<IdName>, StudentsError> {
        log::debug!("students with all scores above {threshold}");
        let found = self.repo.find_students_all_marks_greater(threshold)?;
        Ok(found.into_iter().map(StudentDoc::into_id_name).collect())
    }

    /// The first `n` students ranked by average score; students without marks are not ranked.
    ///
    /// # Errors
    /// Store failures only.
    pub fn top_students(&self, n: usize, order: Order) -> Result<Vec<IdNameMarks>, StudentsError> {
        let pipeline = Pipeline::new()
            .unwind(MARKS)
            .group(&[ID, NAME], vec![avg_score(), pushed_marks()])
            .sort(by_avg(order))
            .limit(n);
        self.ranked(&pipeline)
    }

    /// # Errors
    /// Store failures only.
    pub fn best_students(&self, n: usize) -> Result<Vec<IdNameMarks>, StudentsError> {
        self.top_students(n, Order::Desc)
    }

    /// # Errors
    /// Store failures only.
    pub fn worst_students(&self, n: usize) -> Result<Vec<IdNameMarks>, StudentsError> {
        self.top_students(n, Order::Asc)
    }

    /// The first `n` students by average score in `subject`, with only that subject's marks.
    ///
    /// # Errors
    /// Store failures only.
    pub fn top_students_by_subject(&self, n: usize, subject: &str) -> Result<Vec<IdNameMarks>, StudentsError> {
        let pipeline = Pipeline::new()
            .unwind(MARKS)
            .matching(Filter::eq(MARKS_SUBJECT, subject))
            .group(&[ID, NAME], vec![avg_score(), pushed_marks()])
            .sort(by_avg(Order::Desc))
            .limit(n);
        self.ranked(&pipeline)
    }

    fn ranked(&self, pipeline: &Pipeline) -> Result<Vec<IdNameMarks>, StudentsError> {
        let rows = self.repo.aggregate(pipeline)?;
        let students = rows.iter().map(grouped_student).collect::<Result<Vec<_>, _>>()?;
        Ok(students.into_iter().map(StudentDoc::into_id_name_marks).collect())
    }

    /// Splits all scores into at most `buckets` equal-population ranges.
    ///
    /// Equal scores never straddle two buckets, so fewer buckets may come back.
    ///
    /// # Errors
    /// `InvalidArgument` when `buckets` is zero.
    pub fn score_distribution(&self, buckets: usize) -> Result<Vec<MarksBucket>, StudentsError> {
        if buckets == 0 {
            log::warn!("rejecting score distribution with zero buckets");
            return Err(StudentsError::InvalidArgument("bucket count must be positive".into()));
        }
        let pipeline = Pipeline::new().unwind(MARKS).bucket_auto(MARKS_SCORE, buckets);
        let rows = self.repo.aggregate(&pipeline)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let key = row.get_document(GROUP_ID).map_err(|e| DbError::Bson(e.to_string()))?;
            let count = row
                .get("count")
                .and_then(bson_as_i64)
                .and_then(|c| u64::try_from(c).ok())
                .ok_or_else(|| DbError::Bson("bucket without count".into()))?;
            out.push(MarksBucket { min: bucket_bound(key, "min")?, max: bucket_bound(key, "max")?, count });
        }
        Ok(out)
    }
}
