mod common;

use common::{CHEM, MATH, empty_service, ids, populated_service};
use student_marks::query::Order;
use student_marks::{MarksBucket, Student, StudentsError};

#[test]
fn global_average_over_every_mark() {
    let s = populated_service();
    let avg = s.average_score_over_all().unwrap();
    assert!((avg - 1048.0 / 13.0).abs() < 1e-9);
}

#[test]
fn global_average_without_marks_is_an_error() {
    let s = empty_service();
    assert!(matches!(s.average_score_over_all(), Err(StudentsError::NoMarks)));
    s.add_student(&Student::new(1, "a", "050")).unwrap();
    let err = s.average_score_over_all().unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn average_above_sorted_descending() {
    let s = populated_service();
    let good = s.students_with_average_above(80).unwrap();
    assert_eq!(ids(&good, |x| x.id), vec![3, 1, 5]);
    assert_eq!(good[0].name, "name3");
    assert_eq!(ids(&s.students_with_average_above(75).unwrap(), |x| x.id), vec![3, 1, 5]);
    assert!(s.students_with_average_above(95).unwrap().is_empty());
}

#[test]
fn good_students_match_average_above_at_threshold() {
    let s = populated_service();
    assert_eq!(s.good_students().unwrap(), s.students_with_average_above(80).unwrap());
    let strict = s.clone().with_good_mark(90);
    assert_eq!(strict.good_mark(), 90);
    assert_eq!(ids(&strict.good_students().unwrap(), |x| x.id), vec![3]);
}

#[test]
fn all_scores_above_is_conjunctive() {
    let s = populated_service();
    assert_eq!(ids(&s.students_with_all_scores_above(70).unwrap(), |x| x.id), vec![3, 5]);
    assert_eq!(ids(&s.students_with_all_scores_above(59).unwrap(), |x| x.id), vec![1, 2, 3, 4, 5]);
    assert!(s.students_with_all_scores_above(100).unwrap().is_empty());
}

#[test]
fn best_and_worst_rankings() {
    let s = populated_service();
    let best = s.best_students(2).unwrap();
    assert_eq!(ids(&best, |x| x.id), vec![3, 1]);
    assert_eq!(best[1].marks.len(), 4);
    assert_eq!(best[1].marks[2].score, 90);
    let worst = s.worst_students(2).unwrap();
    assert_eq!(ids(&worst, |x| x.id), vec![4, 2]);
    assert_eq!(s.top_students(2, Order::Asc).unwrap(), worst);
    assert_eq!(s.best_students(100).unwrap().len(), 5);
}

#[test]
fn best_and_worst_are_disjoint() {
    let s = populated_service();
    let best = ids(&s.best_students(2).unwrap(), |x| x.id);
    let worst = ids(&s.worst_students(2).unwrap(), |x| x.id);
    assert!(best.iter().all(|id| !worst.contains(id)));
}

#[test]
fn top_by_subject_ranks_on_subject_average() {
    let s = populated_service();
    let math = s.top_students_by_subject(3, MATH).unwrap();
    assert_eq!(ids(&math, |x| x.id), vec![3, 1, 5]);
    assert!(math.iter().flat_map(|x| &x.marks).all(|m| m.subject == MATH));
    assert_eq!(math[1].marks.len(), 2);
    let chem = s.top_students_by_subject(1, CHEM).unwrap();
    assert_eq!(ids(&chem, |x| x.id), vec![3]);
    assert!(s.top_students_by_subject(3, "Art").unwrap().is_empty());
}

#[test]
fn score_distribution_equal_population() {
    let s = populated_service();
    let dist = s.score_distribution(3).unwrap();
    assert_eq!(
        dist,
        vec![
            MarksBucket { min: 60, max: 75, count: 5 },
            MarksBucket { min: 78, max: 90, count: 5 },
            MarksBucket { min: 95, max: 100, count: 3 },
        ]
    );
    assert_eq!(dist.iter().map(|b| b.count).sum::<u64>(), 13);
    let one = s.score_distribution(1).unwrap();
    assert_eq!(one, vec![MarksBucket { min: 60, max: 100, count: 13 }]);
}

#[test]
fn score_distribution_edge_cases() {
    let s = populated_service();
    assert!(matches!(s.score_distribution(0), Err(StudentsError::InvalidArgument(_))));
    assert!(s.score_distribution(50).unwrap().len() <= 13);
    assert!(empty_service().score_distribution(4).unwrap().is_empty());
}
