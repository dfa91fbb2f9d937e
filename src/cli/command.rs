use crate::types::DocumentId;
use chrono::NaiveDate;

/// One front-end request, independent of how arguments were parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddStudent {
        id: DocumentId,
        name: String,
        phone: String,
    },
    AddMark {
        id: DocumentId,
        subject: String,
        score: i32,
        date: NaiveDate,
    },
    MarksBySubject {
        id: DocumentId,
        subject: String,
    },
    MarksByDates {
        id: DocumentId,
        from: NaiveDate,
        to: NaiveDate,
    },
    PhonePrefix {
        prefix: String,
    },
    /// Raw JSON filter.
    Find {
        filter_json: String,
    },
    AllScoresAbove {
        threshold: i32,
    },
    RemoveFewMarks {
        min_marks: usize,
    },
    AverageScore,
    GoodStudents,
    AverageAbove {
        threshold: i32,
    },
    Best {
        n: usize,
    },
    Worst {
        n: usize,
    },
    BestInSubject {
        n: usize,
        subject: String,
    },
    Distribution {
        buckets: usize,
    },
    /// Inserts `count` random students starting at `first_id`.
    Seed {
        count: usize,
        first_id: DocumentId,
        max_marks: usize,
        seed: Option<u64>,
    },
}
