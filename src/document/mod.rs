mod core;
mod types;

pub use core::{
    DATE, DATE_FORMAT, ID, MARKS, MARKS_DATE, MARKS_SCORE, MARKS_SUBJECT, NAME, PHONE, SCORE,
    SUBJECT, StudentDoc, date_to_bson, mark_from_bson, mark_to_bson,
};
pub use types::{IdName, IdNameMarks, Mark, MarksBucket, Student};
