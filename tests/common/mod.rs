#![allow(dead_code)]

use chrono::NaiveDate;
use std::sync::Arc;
use student_marks::engine::Engine;
use student_marks::repo::CollectionStudentRepository;
use student_marks::{Mark, Student, StudentsService};

pub const MATH: &str = "Math";
pub const PHYSICS: &str = "Physics";
pub const CHEM: &str = "Chem";

pub fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

pub fn service_on(engine: &Engine) -> StudentsService {
    StudentsService::new(Arc::new(CollectionStudentRepository::open(engine)))
}

pub fn empty_service() -> StudentsService {
    service_on(&Engine::in_memory())
}

/// Six students:
/// 1: Math 80, Physics 70, Math 90, Chem 95 (avg 83.75)
/// 2: Math 60, Physics 75, Chem 70 (avg 68.33)
/// 3: Math 95, Physics 90, Chem 100 (avg 95)
/// 4: Math 60
/// 5: Math 85, Physics 78 (avg 81.5)
/// 6: no marks
pub fn populate(service: &StudentsService) {
    let students: [(i64, &str, Vec<(&str, i32, u32)>); 6] = [
        (1, "050-1111111", vec![(MATH, 80, 1), (PHYSICS, 70, 2), (MATH, 90, 3), (CHEM, 95, 4)]),
        (2, "050-2222222", vec![(MATH, 60, 1), (PHYSICS, 75, 2), (CHEM, 70, 3)]),
        (3, "050-3333333", vec![(MATH, 95, 1), (PHYSICS, 90, 2), (CHEM, 100, 3)]),
        (4, "051-4444444", vec![(MATH, 60, 1)]),
        (5, "052-5555555", vec![(MATH, 85, 1), (PHYSICS, 78, 2)]),
        (6, "053-6666666", vec![]),
    ];
    for (id, phone, marks) in students {
        service.add_student(&Student::new(id, format!("name{id}"), phone)).unwrap();
        for (subject, score, day) in marks {
            service.add_mark(id, Mark::new(subject, score, d(day))).unwrap();
        }
    }
}

pub fn populated_service() -> StudentsService {
    let s = empty_service();
    populate(&s);
    s
}

pub fn ids<T>(rows: &[T], id: impl Fn(&T) -> i64) -> Vec<i64> {
    rows.iter().map(id).collect()
}
