//! Logging setup on top of `log4rs`.
//!
//! Layout under the log directory:
//! - `app.log`: everything routed through the root logger
//! - `audit.log`: one JSON line per stored mutation (target `student_marks::audit`)
//! - `dev6.log`: timing records from [`crate::utils::devlog::bench`], only when enabled
//!
//! Every file rolls at 10 MiB, keeping `retention` old files.

use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::error::Error;
use std::path::{Path, PathBuf};

pub const AUDIT_TARGET: &str = "student_marks::audit";
pub const DEV6_TARGET: &str = "student_marks::dev6";

pub const ENV_LOG_DIR: &str = "STUDENT_MARKS_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "STUDENT_MARKS_LOG_LEVEL";
pub const ENV_LOG_RETENTION: &str = "STUDENT_MARKS_LOG_RETENTION";
pub const ENV_DEV6: &str = "STUDENT_MARKS_DEV6";

const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_RETENTION: u32 = 7;
const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";

/// Initializes logging from a log4rs YAML file.
///
/// # Errors
/// Returns an error if the file is missing or invalid.
pub fn init_path(path: &Path) -> Result<(), Box<dyn Error>> {
    log4rs::init_file(path, log4rs::config::Deserializers::default())?;
    Ok(())
}

#[must_use]
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, Box<dyn Error>> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    Ok(RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))?)
}

/// Builds the rolling-file configuration without installing it.
///
/// # Errors
/// Returns an error if the directory or an appender cannot be created.
pub fn build_config(
    dir: &Path,
    level: LevelFilter,
    retention: u32,
    enable_dev6: bool,
) -> Result<Config, Box<dyn Error>> {
    std::fs::create_dir_all(dir)?;
    let mut builder = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(dir, "app", retention)?)))
        .appender(Appender::builder().build("audit", Box::new(rolling(dir, "audit", retention)?)))
        .logger(Logger::builder().appender("audit").additive(false).build(AUDIT_TARGET, LevelFilter::Info));
    builder = if enable_dev6 {
        builder
            .appender(Appender::builder().build("dev6", Box::new(rolling(dir, "dev6", retention)?)))
            .logger(Logger::builder().appender("dev6").additive(false).build(DEV6_TARGET, LevelFilter::Trace))
    } else {
        builder.logger(Logger::builder().additive(false).build(DEV6_TARGET, LevelFilter::Off))
    };
    Ok(builder.build(Root::builder().appender("app").build(level))?)
}

/// Installs rolling file logging for the process.
///
/// - `dir`: log directory, current directory when `None`
/// - `level`: `error|warn|info|debug|trace|off`, default `info`
/// - `retention`: rolled files kept per log, default 7
///
/// # Errors
/// Returns an error if the appenders cannot be created or a logger is already installed.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<u32>,
    enable_dev6: bool,
) -> Result<(), Box<dyn Error>> {
    let base = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let config = build_config(&base, parse_level(level), retention.unwrap_or(DEFAULT_RETENTION), enable_dev6)?;
    log4rs::init_config(config)?;
    Ok(())
}

/// [`configure_logging`] driven by `STUDENT_MARKS_LOG_*` variables, with `fallback_dir`
/// and `fallback_level` used when the variables are unset.
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_from_env(fallback_dir: Option<&Path>, fallback_level: Option<&str>) -> Result<(), Box<dyn Error>> {
    let dir = std::env::var(ENV_LOG_DIR).ok().map(PathBuf::from).or_else(|| fallback_dir.map(Path::to_path_buf));
    let level = std::env::var(ENV_LOG_LEVEL).ok().or_else(|| fallback_level.map(str::to_string));
    let retention = std::env::var(ENV_LOG_RETENTION).ok().and_then(|s| s.parse::<u32>().ok());
    let dev6 = std::env::var(ENV_DEV6)
        .is_ok_and(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
    configure_logging(dir.as_deref(), level.as_deref(), retention, dev6)
}
