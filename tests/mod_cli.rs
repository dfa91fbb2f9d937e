use chrono::NaiveDate;
use student_marks::cli::{Command, OutputMode, run_with_format};
use student_marks::config::StudentsConfig;
use student_marks::{StudentsService, open_service};

fn run(service: &StudentsService, cmd: Command, mode: OutputMode) -> String {
    let mut buf = Vec::new();
    run_with_format(service, cmd, mode, &mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

fn add(service: &StudentsService, id: i64, phone: &str, scores: &[i32]) {
    run(service, Command::AddStudent { id, name: format!("s{id}"), phone: phone.into() }, OutputMode::Plain);
    for (i, score) in scores.iter().enumerate() {
        let day = u32::try_from(i + 1).unwrap();
        let cmd = Command::AddMark { id, subject: "Math".into(), score: *score, date: date(day) };
        run(service, cmd, OutputMode::Plain);
    }
}

#[test]
fn commands_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("students.db");
    let cfg = StudentsConfig::default();
    {
        let s = open_service(Some(&path), &cfg).unwrap();
        add(&s, 1, "050-1", &[90, 85]);
        add(&s, 2, "051-2", &[40]);
    }
    let s = open_service(Some(&path), &cfg).unwrap();
    assert_eq!(run(&s, Command::AverageScore, OutputMode::Plain), "71.66666666666667\n");
    assert_eq!(run(&s, Command::GoodStudents, OutputMode::Plain), "1\ts1\n");
    let marks = run(&s, Command::MarksByDates { id: 1, from: date(2), to: date(9) }, OutputMode::Plain);
    assert_eq!(marks, "Math\t85\t2024-05-02\n");
}

#[test]
fn json_output_is_one_parseable_line() {
    let s = open_service(None, &StudentsConfig { good_mark: 50 }).unwrap();
    add(&s, 1, "050-1", &[90, 70]);
    add(&s, 2, "050-2", &[60]);
    let out = run(&s, Command::Best { n: 1 }, OutputMode::Json);
    assert_eq!(out.lines().count(), 1);
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v[0]["id"], 1);
    assert_eq!(v[0]["marks"][1]["score"], 70);

    let dist = run(&s, Command::Distribution { buckets: 3 }, OutputMode::Json);
    let v: serde_json::Value = serde_json::from_str(&dist).unwrap();
    assert_eq!(v.as_array().map(Vec::len), Some(3));
    assert_eq!(v[0]["min"], 60);

    let removed = run(&s, Command::RemoveFewMarks { min_marks: 2 }, OutputMode::Json);
    assert_eq!(removed.trim(), "[2]");
}

#[test]
fn human_output_reads_naturally() {
    let s = open_service(None, &StudentsConfig::default()).unwrap();
    add(&s, 7, "052-7", &[88]);
    let out = run(&s, Command::MarksBySubject { id: 7, subject: "Art".into() }, OutputMode::Human);
    assert_eq!(out, "no marks\n");
    let out = run(&s, Command::RemoveFewMarks { min_marks: 5 }, OutputMode::Human);
    assert_eq!(out, "removed 1 students: [7]\n");
}

#[test]
fn free_query_errors_are_reported() {
    let s = open_service(None, &StudentsConfig::default()).unwrap();
    let mut buf = Vec::new();
    let cmd = Command::Find { filter_json: "[1, 2]".into() };
    assert!(run_with_format(&s, cmd, OutputMode::Human, &mut buf).is_err());
    assert!(buf.is_empty());
}
