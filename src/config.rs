//! Application configuration.
//!
//! Precedence, highest first: command-line flags, environment, config files, defaults.
//! Config files are searched in order (`--config`, `$STUDENT_MARKS_CONFIG`,
//! `~/.config/student-marks.toml`, `./student-marks.toml`); for each key the first
//! file that sets it wins.
//!
//! ```toml
//! db_path = "students.db"
//! log_dir = "logs"
//! log_level = "debug"
//!
//! [students]
//! good_mark = 85
//! ```

use crate::errors::ConfigError;
use crate::service::DEFAULT_GOOD_MARK;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_CONFIG: &str = "STUDENT_MARKS_CONFIG";
pub const ENV_DB: &str = "STUDENT_MARKS_DB";
pub const ENV_GOOD_MARK: &str = "STUDENT_MARKS_GOOD_MARK";
pub const CONFIG_FILE_NAME: &str = "student-marks.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentsConfig {
    /// Average strictly above which a student counts as good.
    pub good_mark: i32,
}

impl Default for StudentsConfig {
    fn default() -> Self {
        Self { good_mark: DEFAULT_GOOD_MARK }
    }
}

/// Resolved configuration. `db_path: None` means an in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub db_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub students: StudentsConfig,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub good_mark: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileStudents {
    good_mark: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    db_path: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    log_level: Option<String>,
    students: FileStudents,
}

impl FileConfig {
    fn fill_from(&mut self, other: Self) {
        self.db_path = self.db_path.take().or(other.db_path);
        self.log_dir = self.log_dir.take().or(other.log_dir);
        self.log_level = self.log_level.take().or(other.log_level);
        self.students.good_mark = self.students.good_mark.or(other.students.good_mark);
    }
}

fn parse_file(text: &str, path: &Path) -> Result<FileConfig, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
}

/// Parses one config document on its own, defaults filling the gaps.
///
/// # Errors
/// Returns `ConfigError::Parse` for malformed TOML.
pub fn from_toml_str(text: &str) -> Result<AppConfig, ConfigError> {
    let file = parse_file(text, Path::new("<inline>"))?;
    Ok(AppConfig {
        db_path: file.db_path,
        log_dir: file.log_dir,
        log_level: file.log_level,
        students: StudentsConfig { good_mark: file.students.good_mark.unwrap_or(DEFAULT_GOOD_MARK) },
    })
}

/// Candidate config files, highest priority first.
pub fn config_paths(explicit: Option<&Path>, env: &dyn Fn(&str) -> Option<String>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = explicit {
        paths.push(p.to_path_buf());
    }
    if let Some(p) = env(ENV_CONFIG) {
        paths.push(PathBuf::from(p));
    }
    if let Some(home) = env("HOME").or_else(|| env("USERPROFILE")) {
        paths.push(PathBuf::from(home).join(".config").join(CONFIG_FILE_NAME));
    }
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(CONFIG_FILE_NAME));
    }
    paths
}

/// Loads configuration from the process environment.
///
/// # Errors
/// See [`load_with`].
pub fn load(cli: &CliOverrides) -> Result<AppConfig, ConfigError> {
    load_with(cli, &|key| std::env::var(key).ok())
}

/// Loads configuration reading environment variables through `env`.
///
/// # Errors
/// Fails when the `--config` file is missing, any existing file is unreadable or malformed,
/// or `STUDENT_MARKS_GOOD_MARK` is not an integer.
pub fn load_with(cli: &CliOverrides, env: &dyn Fn(&str) -> Option<String>) -> Result<AppConfig, ConfigError> {
    let mut files = FileConfig::default();
    for path in config_paths(cli.config.as_deref(), env) {
        let explicit = cli.config.as_deref() == Some(path.as_path());
        if !explicit && !path.exists() {
            continue;
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Read { path: path.display().to_string(), message: e.to_string() })?;
        log::debug!("loaded config {}", path.display());
        files.fill_from(parse_file(&text, &path)?);
    }

    let env_good_mark = match env(ENV_GOOD_MARK) {
        Some(raw) => Some(raw.trim().parse::<i32>().map_err(|_| ConfigError::InvalidValue {
            key: ENV_GOOD_MARK.to_string(),
            value: raw.clone(),
        })?),
        None => None,
    };

    let good_mark = cli
        .good_mark
        .or(env_good_mark)
        .or(files.students.good_mark)
        .unwrap_or(DEFAULT_GOOD_MARK);
    let db_path = cli.db.clone().or_else(|| env(ENV_DB).map(PathBuf::from)).or(files.db_path);
    Ok(AppConfig {
        db_path,
        log_dir: files.log_dir,
        log_level: files.log_level,
        students: StudentsConfig { good_mark },
    })
}
