use super::StudentsService;
use crate::document::{IdNameMarks, Mark, Student, StudentDoc};
use crate::errors::StudentsError;
use crate::query::parse_filter_json;
use crate::types::DocumentId;
use chrono::NaiveDate;

impl StudentsService {
    /// Stores a new student. Supplied marks are ignored: the record starts empty.
    ///
    /// # Errors
    /// `AlreadyExists` when the id is taken; store failures otherwise.
    pub fn add_student(&self, student: &Student) -> Result<Student, StudentsError> {
        let record = StudentDoc::of(student);
        if self.repo.exists_by_id(record.id) || !self.repo.insert(&record)? {
            log::warn!("rejecting student {}: id already exists", record.id);
            return Err(StudentsError::AlreadyExists(record.id));
        }
        log::trace!("added student {} ({})", record.id, record.name);
        Ok(record.into_student())
    }

    /// Appends `mark` to the student's marks as one atomic store operation.
    ///
    /// # Errors
    /// `StudentNotFound` when no student has `student_id`; store failures otherwise.
    pub fn add_mark(&self, student_id: DocumentId, mark: Mark) -> Result<Mark, StudentsError> {
        if !self.repo.push_mark(student_id, &mark)? {
            log::warn!("rejecting mark for student {student_id}: no such student");
            return Err(StudentsError::StudentNotFound(student_id));
        }
        log::trace!("added mark {} {} {} to student {student_id}", mark.subject, mark.score, mark.date);
        Ok(mark)
    }

    /// The student's marks in `subject`, in entry order; empty for unknown students.
    ///
    /// # Errors
    /// Store failures only.
    pub fn find_marks_by_subject(&self, id: DocumentId, subject: &str) -> Result<Vec<Mark>, StudentsError> {
        let Some(student) = self.repo.find_by_id_and_marks_subject(id, subject)? else {
            return Ok(Vec::new());
        };
        Ok(student.marks.into_iter().filter(|m| m.subject == subject).collect())
    }

    /// The student's marks dated within `[from, to]` inclusive, in entry order.
    ///
    /// # Errors
    /// Store failures only.
    pub fn find_marks_by_date_range(
        &self,
        id: DocumentId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Mark>, StudentsError> {
        if from > to {
            return Ok(Vec::new());
        }
        let Some(student) = self.repo.find_by_id_and_marks_date_between(id, from, to)? else {
            return Ok(Vec::new());
        };
        Ok(student.marks.into_iter().filter(|m| m.date >= from && m.date <= to).collect())
    }

    /// Students whose phone starts with `prefix` (taken literally). Marks are omitted.
    ///
    /// # Errors
    /// Store failures only.
    pub fn find_students_by_phone_prefix(&self, prefix: &str) -> Result<Vec<Student>, StudentsError> {
        let found = self.repo.find_students_phone_prefix(prefix)?;
        Ok(found.into_iter().map(StudentDoc::into_student).collect())
    }

    /// Raw JSON filter passthrough, e.g. `{"marks.score": {"$gte": 90}}`.
    ///
    /// # Errors
    /// Malformed filters surface as the store's query or JSON error.
    pub fn find_students_by_free_query(&self, query: &str) -> Result<Vec<IdNameMarks>, StudentsError> {
        let filter = parse_filter_json(query)?;
        let found = self.repo.find(&filter)?;
        Ok(found.into_iter().map(StudentDoc::into_id_name_marks).collect())
    }

    /// Deletes every student with fewer than `n` marks; returns their ids in deletion order.
    ///
    /// # Errors
    /// Store failures only.
    pub fn remove_students_with_few_marks(&self, n: usize) -> Result<Vec<DocumentId>, StudentsError> {
        let removed: Vec<DocumentId> = self.repo.remove_students_few_marks(n)?.into_iter().map(|s| s.id).collect();
        log::debug!("removed {} students with fewer than {n} marks", removed.len());
        Ok(removed)
    }
}
