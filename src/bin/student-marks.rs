use clap::{Parser, Subcommand, ValueEnum};
use student_marks::cli::{self as prog_cli, Command, OutputMode};
use student_marks::config::{self, CliOverrides};
use student_marks::engine::Engine;
use student_marks::logger;
use student_marks::repo::CollectionStudentRepository;
use student_marks::service::StudentsService;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Format {
    Human,
    Plain,
    Json,
}

impl From<Format> for OutputMode {
    fn from(f: Format) -> Self {
        match f {
            Format::Human => Self::Human,
            Format::Plain => Self::Plain,
            Format::Json => Self::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "student-marks", version, about = "Student records and score reports", long_about = None)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Database file; takes precedence over config and environment
    #[arg(long)]
    db: Option<PathBuf>,
    /// Good-mark threshold; takes precedence over config and environment
    #[arg(long)]
    good_mark: Option<i32>,
    /// Use a throwaway in-memory store instead of a database file
    #[arg(long, conflicts_with = "db")]
    in_memory: bool,
    #[arg(long, value_enum, default_value_t = Format::Human)]
    format: Format,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(name = "add-student", about = "Register a new student")]
    AddStudent { id: i64, name: String, phone: String },
    #[command(name = "add-mark", about = "Append a mark to a student")]
    AddMark {
        id: i64,
        subject: String,
        score: i32,
        #[arg(help = "Date as YYYY-MM-DD")]
        date: NaiveDate,
    },
    #[command(name = "marks-subject", about = "A student's marks in one subject")]
    MarksSubject { id: i64, subject: String },
    #[command(name = "marks-dates", about = "A student's marks within an inclusive date range")]
    MarksDates { id: i64, from: NaiveDate, to: NaiveDate },
    #[command(name = "phone-prefix", about = "Students whose phone starts with a prefix")]
    PhonePrefix { prefix: String },
    #[command(name = "find", about = "Students matching a JSON filter, e.g. '{\"marks.score\":{\"$gte\":90}}'")]
    Find { filter: String },
    #[command(name = "all-scores-above", about = "Students whose every score exceeds a threshold")]
    AllScoresAbove { threshold: i32 },
    #[command(name = "remove-few-marks", about = "Delete students with fewer than N marks")]
    RemoveFewMarks { min_marks: usize },
    #[command(name = "avg", about = "Average of all scores")]
    Avg,
    #[command(name = "good", about = "Students averaging above the good mark")]
    Good,
    #[command(name = "avg-above", about = "Students averaging above a threshold")]
    AvgAbove { threshold: i32 },
    #[command(name = "best", about = "Top N students by average")]
    Best { n: usize },
    #[command(name = "worst", about = "Bottom N students by average")]
    Worst { n: usize },
    #[command(name = "best-subject", about = "Top N students by average in one subject")]
    BestSubject { n: usize, subject: String },
    #[command(name = "distribution", about = "Scores split into equal-population buckets")]
    Distribution { buckets: usize },
    #[command(name = "seed", about = "Insert random students")]
    Seed {
        count: usize,
        #[arg(long, default_value_t = 1)]
        first_id: i64,
        #[arg(long, default_value_t = 8)]
        max_marks: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
}

impl From<Commands> for Command {
    fn from(c: Commands) -> Self {
        match c {
            Commands::AddStudent { id, name, phone } => Self::AddStudent { id, name, phone },
            Commands::AddMark { id, subject, score, date } => Self::AddMark { id, subject, score, date },
            Commands::MarksSubject { id, subject } => Self::MarksBySubject { id, subject },
            Commands::MarksDates { id, from, to } => Self::MarksByDates { id, from, to },
            Commands::PhonePrefix { prefix } => Self::PhonePrefix { prefix },
            Commands::Find { filter } => Self::Find { filter_json: filter },
            Commands::AllScoresAbove { threshold } => Self::AllScoresAbove { threshold },
            Commands::RemoveFewMarks { min_marks } => Self::RemoveFewMarks { min_marks },
            Commands::Avg => Self::AverageScore,
            Commands::Good => Self::GoodStudents,
            Commands::AvgAbove { threshold } => Self::AverageAbove { threshold },
            Commands::Best { n } => Self::Best { n },
            Commands::Worst { n } => Self::Worst { n },
            Commands::BestSubject { n, subject } => Self::BestInSubject { n, subject },
            Commands::Distribution { buckets } => Self::Distribution { buckets },
            Commands::Seed { count, first_id, max_marks, seed } => {
                Self::Seed { count, first_id, max_marks, seed }
            }
        }
    }
}

const DEFAULT_DB: &str = "students.db";
const LOG_CONFIG_FILE: &str = "log4rs.yaml";

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let overrides = CliOverrides { config: cli.config.clone(), db: cli.db.clone(), good_mark: cli.good_mark };
    let cfg = config::load(&overrides)?;
    let yaml = Path::new(LOG_CONFIG_FILE);
    let logging = if yaml.exists() {
        logger::init_path(yaml)
    } else {
        logger::configure_from_env(cfg.log_dir.as_deref(), cfg.log_level.as_deref())
    };
    if let Err(e) = logging {
        eprintln!("logging disabled: {e}");
    }
    let engine = if cli.in_memory {
        Engine::in_memory()
    } else {
        Engine::open(cfg.db_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DB)))?
    };
    let repo = Arc::new(CollectionStudentRepository::open(&engine));
    let service = StudentsService::with_config(repo, &cfg.students);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    prog_cli::run_with_format(&service, cli.command.into(), cli.format.into(), &mut out)
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
