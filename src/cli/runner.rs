use crate::document::{IdName, IdNameMarks, Mark, Student};
use crate::fixtures::random_students;
use crate::service::StudentsService;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::error::Error;
use std::io::Write;

use super::command::Command;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Plain,
    Json,
}

fn json_line<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<(), Box<dyn Error>> {
    writeln!(out, "{}", serde_json::to_string(value)?)?;
    Ok(())
}

fn write_marks(out: &mut dyn Write, marks: &[Mark], mode: OutputMode) -> Result<(), Box<dyn Error>> {
    match mode {
        OutputMode::Json => json_line(out, marks)?,
        OutputMode::Plain => {
            for m in marks {
                writeln!(out, "{}\t{}\t{}", m.subject, m.score, m.date)?;
            }
        }
        OutputMode::Human => {
            if marks.is_empty() {
                writeln!(out, "no marks")?;
            }
            for m in marks {
                writeln!(out, "subject={} score={} date={}", m.subject, m.score, m.date)?;
            }
        }
    }
    Ok(())
}

fn write_students(out: &mut dyn Write, students: &[Student], mode: OutputMode) -> Result<(), Box<dyn Error>> {
    match mode {
        OutputMode::Json => json_line(out, students)?,
        OutputMode::Plain => {
            for s in students {
                writeln!(out, "{}\t{}\t{}", s.id, s.name, s.phone)?;
            }
        }
        OutputMode::Human => {
            for s in students {
                writeln!(out, "id={} name={} phone={} marks={}", s.id, s.name, s.phone, s.marks.len())?;
            }
        }
    }
    Ok(())
}

fn write_id_names(out: &mut dyn Write, rows: &[IdName], mode: OutputMode) -> Result<(), Box<dyn Error>> {
    match mode {
        OutputMode::Json => json_line(out, rows)?,
        OutputMode::Plain => {
            for r in rows {
                writeln!(out, "{}\t{}", r.id, r.name)?;
            }
        }
        OutputMode::Human => {
            for r in rows {
                writeln!(out, "id={} name={}", r.id, r.name)?;
            }
        }
    }
    Ok(())
}

fn write_ranked(out: &mut dyn Write, rows: &[IdNameMarks], mode: OutputMode) -> Result<(), Box<dyn Error>> {
    match mode {
        OutputMode::Json => json_line(out, rows)?,
        OutputMode::Plain => {
            for r in rows {
                writeln!(out, "{}\t{}\t{}", r.id, r.name, r.marks.len())?;
            }
        }
        OutputMode::Human => {
            for r in rows {
                let scores: Vec<String> = r.marks.iter().map(|m| format!("{}:{}", m.subject, m.score)).collect();
                writeln!(out, "id={} name={} marks=[{}]", r.id, r.name, scores.join(", "))?;
            }
        }
    }
    Ok(())
}

/// Executes `cmd` against `service`, writing results to `out` in `mode`.
///
/// # Errors
/// Service failures and write failures.
pub fn run_with_format(
    service: &StudentsService,
    cmd: Command,
    mode: OutputMode,
    out: &mut dyn Write,
) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::AddStudent { id, name, phone } => {
            let stored = service.add_student(&Student::new(id, name, phone))?;
            match mode {
                OutputMode::Json => json_line(out, &stored)?,
                OutputMode::Plain => writeln!(out, "added {}", stored.id)?,
                OutputMode::Human => writeln!(out, "added student id={} name={}", stored.id, stored.name)?,
            }
        }
        Command::AddMark { id, subject, score, date } => {
            let mark = service.add_mark(id, Mark::new(subject, score, date))?;
            match mode {
                OutputMode::Json => json_line(out, &mark)?,
                OutputMode::Plain => writeln!(out, "added {id}")?,
                OutputMode::Human => {
                    writeln!(out, "added mark student={id} subject={} score={}", mark.subject, mark.score)?;
                }
            }
        }
        Command::MarksBySubject { id, subject } => {
            write_marks(out, &service.find_marks_by_subject(id, &subject)?, mode)?;
        }
        Command::MarksByDates { id, from, to } => {
            write_marks(out, &service.find_marks_by_date_range(id, from, to)?, mode)?;
        }
        Command::PhonePrefix { prefix } => {
            write_students(out, &service.find_students_by_phone_prefix(&prefix)?, mode)?;
        }
        Command::Find { filter_json } => {
            write_ranked(out, &service.find_students_by_free_query(&filter_json)?, mode)?;
        }
        Command::AllScoresAbove { threshold } => {
            write_id_names(out, &service.students_with_all_scores_above(threshold)?, mode)?;
        }
        Command::RemoveFewMarks { min_marks } => {
            let removed = service.remove_students_with_few_marks(min_marks)?;
            match mode {
                OutputMode::Json => json_line(out, &removed)?,
                OutputMode::Plain => {
                    for id in &removed {
                        writeln!(out, "{id}")?;
                    }
                }
                OutputMode::Human => {
                    let ids: Vec<String> = removed.iter().map(ToString::to_string).collect();
                    writeln!(out, "removed {} students: [{}]", removed.len(), ids.join(", "))?;
                }
            }
        }
        Command::AverageScore => {
            let avg = service.average_score_over_all()?;
            match mode {
                OutputMode::Json => json_line(out, &serde_json::json!({ "average": avg }))?,
                OutputMode::Plain => writeln!(out, "{avg}")?,
                OutputMode::Human => writeln!(out, "average score {avg:.2}")?,
            }
        }
        Command::GoodStudents => write_id_names(out, &service.good_students()?, mode)?,
        Command::AverageAbove { threshold } => {
            write_id_names(out, &service.students_with_average_above(threshold)?, mode)?;
        }
        Command::Best { n } => write_ranked(out, &service.best_students(n)?, mode)?,
        Command::Worst { n } => write_ranked(out, &service.worst_students(n)?, mode)?,
        Command::BestInSubject { n, subject } => {
            write_ranked(out, &service.top_students_by_subject(n, &subject)?, mode)?;
        }
        Command::Distribution { buckets } => {
            let dist = service.score_distribution(buckets)?;
            match mode {
                OutputMode::Json => json_line(out, &dist)?,
                OutputMode::Plain => {
                    for b in &dist {
                        writeln!(out, "{}\t{}\t{}", b.min, b.max, b.count)?;
                    }
                }
                OutputMode::Human => {
                    for b in &dist {
                        writeln!(out, "{:>3}..{:<3} {}", b.min, b.max, b.count)?;
                    }
                }
            }
        }
        Command::Seed { count, first_id, max_marks, seed } => {
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_os_rng(),
            };
            let today = chrono::Local::now().date_naive();
            let start = today.checked_sub_days(chrono::Days::new(365)).unwrap_or(today);
            let students = random_students(&mut rng, first_id, count, max_marks, start);
            let mut marks = 0usize;
            for s in &students {
                service.add_student(s)?;
                for m in &s.marks {
                    service.add_mark(s.id, m.clone())?;
                    marks += 1;
                }
            }
            match mode {
                OutputMode::Json => {
                    json_line(out, &serde_json::json!({ "students": students.len(), "marks": marks }))?;
                }
                OutputMode::Plain => writeln!(out, "{}\t{marks}", students.len())?,
                OutputMode::Human => writeln!(out, "seeded {} students with {marks} marks", students.len())?,
            }
        }
    }
    Ok(())
}
