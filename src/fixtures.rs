//! Random student data for demos and load testing.

use crate::document::{Mark, Student};
use crate::types::DocumentId;
use chrono::{Days, NaiveDate};
use fake::Fake;
use fake::faker::name::en::Name;
use rand::Rng;

pub const SUBJECTS: [&str; 6] = ["Math", "Physics", "Chemistry", "Biology", "History", "Literature"];

/// `count` students with ids from `first_id`, each with up to `max_marks` marks dated
/// within a year after `start`.
pub fn random_students<R: Rng + ?Sized>(
    rng: &mut R,
    first_id: DocumentId,
    count: usize,
    max_marks: usize,
    start: NaiveDate,
) -> Vec<Student> {
    let mut out = Vec::with_capacity(count);
    let mut id = first_id;
    for _ in 0..count {
        let name: String = Name().fake_with_rng(rng);
        let phone = format!("05{}-{:07}", rng.random_range(0..10), rng.random_range(0..10_000_000));
        let mut student = Student::new(id, name, phone);
        for _ in 0..rng.random_range(0..=max_marks) {
            let subject = SUBJECTS[rng.random_range(0..SUBJECTS.len())];
            let date = start.checked_add_days(Days::new(rng.random_range(0..365))).unwrap_or(start);
            student.marks.push(Mark::new(subject, rng.random_range(40..=100), date));
        }
        out.push(student);
        id = id.saturating_add(1);
    }
    out
}
