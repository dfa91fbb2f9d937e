mod common;

use common::{MATH, d, empty_service};
use std::thread;
use student_marks::{Mark, Student};

#[test]
fn concurrent_add_mark_loses_nothing() {
    let s = empty_service();
    s.add_student(&Student::new(1, "busy", "050-0000000")).unwrap();
    let threads: Vec<_> = (0..8)
        .map(|t| {
            let s = s.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    s.add_mark(1, Mark::new(MATH, t * 10 + i % 10, d(1))).unwrap();
                }
            })
        })
        .collect();
    for h in threads {
        h.join().unwrap();
    }
    assert_eq!(s.find_marks_by_subject(1, MATH).unwrap().len(), 200);
}

#[test]
fn concurrent_add_student_admits_exactly_one() {
    let s = empty_service();
    let threads: Vec<_> = (0..8)
        .map(|t| {
            let s = s.clone();
            thread::spawn(move || s.add_student(&Student::new(7, format!("t{t}"), "050")).is_ok())
        })
        .collect();
    let winners = threads.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
    assert_eq!(winners, 1);
    assert_eq!(s.find_students_by_phone_prefix("050").unwrap().len(), 1);
}
