use super::types::{IdName, IdNameMarks, Mark, Student};
use crate::errors::DbError;
use crate::types::DocumentId;
use crate::utils::num::bson_as_i64;
use bson::{Bson, Document as BsonDocument, doc};
use chrono::NaiveDate;

pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const PHONE: &str = "phone";
pub const MARKS: &str = "marks";
pub const SUBJECT: &str = "subject";
pub const SCORE: &str = "score";
pub const DATE: &str = "date";
pub const MARKS_SUBJECT: &str = "marks.subject";
pub const MARKS_SCORE: &str = "marks.score";
pub const MARKS_DATE: &str = "marks.date";

/// Stored date format; lexical order equals chronological order.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[must_use]
pub fn date_to_bson(date: NaiveDate) -> Bson {
    Bson::String(date.format(DATE_FORMAT).to_string())
}

#[must_use]
pub fn mark_to_bson(mark: &Mark) -> Bson {
    Bson::Document(doc! {
        SUBJECT: mark.subject.as_str(),
        SCORE: mark.score,
        DATE: date_to_bson(mark.date),
    })
}

/// # Errors
/// Returns `DbError::Bson` when the value is not a well-formed mark.
pub fn mark_from_bson(value: &Bson) -> Result<Mark, DbError> {
    let Bson::Document(d) = value else {
        return Err(DbError::Bson(format!("mark must be a document, got {:?}", value.element_type())));
    };
    let subject = d.get_str(SUBJECT).map_err(|e| DbError::Bson(e.to_string()))?;
    let score = d
        .get(SCORE)
        .and_then(bson_as_i64)
        .and_then(|s| i32::try_from(s).ok())
        .ok_or_else(|| DbError::Bson("mark score must be an integer".into()))?;
    let raw = d.get_str(DATE).map_err(|e| DbError::Bson(e.to_string()))?;
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| DbError::Bson(format!("mark date {raw:?}: {e}")))?;
    Ok(Mark { subject: subject.to_string(), score, date })
}

/// Stored shape of a student.
///
/// Reads are lenient: projections may drop `name`, `phone` or `marks`, which come back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDoc {
    pub id: DocumentId,
    pub name: String,
    pub phone: String,
    pub marks: Vec<Mark>,
}

impl StudentDoc {
    /// A fresh record: new students always start without marks.
    #[must_use]
    pub fn of(student: &Student) -> Self {
        Self {
            id: student.id,
            name: student.name.clone(),
            phone: student.phone.clone(),
            marks: Vec::new(),
        }
    }

    #[must_use]
    pub fn to_bson(&self) -> BsonDocument {
        doc! {
            ID: self.id,
            NAME: self.name.as_str(),
            PHONE: self.phone.as_str(),
            MARKS: self.marks.iter().map(mark_to_bson).collect::<Vec<Bson>>(),
        }
    }

    /// # Errors
    /// Fails when `id` is missing or any present field has the wrong type.
    pub fn from_bson(doc: &BsonDocument) -> Result<Self, DbError> {
        let id = doc
            .get(ID)
            .and_then(bson_as_i64)
            .ok_or_else(|| DbError::Bson("student document without integer id".into()))?;
        let text = |field: &str| -> Result<String, DbError> {
            match doc.get(field) {
                None | Some(Bson::Null) => Ok(String::new()),
                Some(Bson::String(s)) => Ok(s.clone()),
                Some(other) => Err(DbError::Bson(format!("{field} must be a string, got {other}"))),
            }
        };
        let marks = match doc.get(MARKS) {
            None | Some(Bson::Null) => Vec::new(),
            Some(Bson::Array(items)) => items.iter().map(mark_from_bson).collect::<Result<_, _>>()?,
            Some(other) => return Err(DbError::Bson(format!("marks must be an array, got {other}"))),
        };
        Ok(Self { id, name: text(NAME)?, phone: text(PHONE)?, marks })
    }

    #[must_use]
    pub fn into_student(self) -> Student {
        Student { id: self.id, name: self.name, phone: self.phone, marks: self.marks }
    }

    #[must_use]
    pub fn into_id_name(self) -> IdName {
        IdName { id: self.id, name: self.name }
    }

    #[must_use]
    pub fn into_id_name_marks(self) -> IdNameMarks {
        IdNameMarks { id: self.id, name: self.name, marks: self.marks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn new_student_record_drops_supplied_marks() {
        let mut s = Student::new(1, "Ann", "050-1");
        s.marks.push(Mark::new("Math", 90, date("2024-01-01")));
        let d = StudentDoc::of(&s).to_bson();
        assert_eq!(d.get_array(MARKS).unwrap().len(), 0);
        assert_eq!(d.get_i64(ID).unwrap(), 1);
    }

    #[test]
    fn marks_store_dates_as_iso_strings() {
        let b = mark_to_bson(&Mark::new("Math", 70, date("2024-03-05")));
        let Bson::Document(d) = &b else { panic!("not a document") };
        assert_eq!(d.get_str(DATE).unwrap(), "2024-03-05");
        assert_eq!(mark_from_bson(&b).unwrap().date, date("2024-03-05"));
    }

    #[test]
    fn lenient_read_of_projected_document() {
        let s = StudentDoc::from_bson(&doc! {"id": 4_i64, "name": "d"}).unwrap();
        assert_eq!(s.phone, "");
        assert!(s.marks.is_empty());
        assert!(StudentDoc::from_bson(&doc! {"name": "x"}).is_err());
        assert!(StudentDoc::from_bson(&doc! {"id": 1, "marks": [{"subject": "M", "score": 1, "date": "bad"}]}).is_err());
    }
}
