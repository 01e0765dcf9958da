//! Debug logging for private-tab.
//!
//! Every `log::` record is written to `private_tab_debug.log` in the system
//! temp directory, so a host embedding the engine keeps its own stdout and
//! stderr clean. Level precedence, highest first:
//!
//! - the `--log-level` CLI flag
//! - `PRIVATE_TAB_DEBUG_LEVEL` (0 = off, 1 = errors, 2 = info, 3 = debug, 4 = trace)
//! - the config file's `log_level`, applied later via [`apply_config_level`]
//!
//! When `RUST_LOG` is set, records are mirrored to stderr as well.

use crate::config::LogLevel;
use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

const LEVEL_ENV: &str = "PRIVATE_TAB_DEBUG_LEVEL";
const LOG_FILE_NAME: &str = "private_tab_debug.log";

/// Debug level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off = 0,
    Error = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl DebugLevel {
    /// Unknown numbers turn logging off
    pub fn from_number(value: u8) -> Self {
        match value {
            1 => DebugLevel::Error,
            2 => DebugLevel::Info,
            3 => DebugLevel::Debug,
            4 => DebugLevel::Trace,
            _ => DebugLevel::Off,
        }
    }

    fn from_env() -> Option<Self> {
        let value = std::env::var(LEVEL_ENV).ok()?;
        value.trim().parse::<u8>().ok().map(Self::from_number)
    }

    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            DebugLevel::Off => LevelFilter::Off,
            DebugLevel::Error => LevelFilter::Error,
            DebugLevel::Info => LevelFilter::Info,
            DebugLevel::Debug => LevelFilter::Debug,
            DebugLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Path of the debug log file
pub fn log_path() -> PathBuf {
    std::env::temp_dir().join(LOG_FILE_NAME)
}

/// File sink behind the bridge
struct DebugLogger {
    file: Option<File>,
}

impl DebugLogger {
    fn open() -> Self {
        let path = log_path();
        let file = match OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&path)
        {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("private-tab: can't open debug log {:?}: {}", path, e);
                None
            }
        };
        let mut logger = DebugLogger { file };
        logger.write_raw(&format!(
            "{}\nprivate-tab debug session started at {} (pid {})\n{}\n",
            "=".repeat(80),
            timestamp(),
            std::process::id(),
            "=".repeat(80)
        ));
        logger
    }

    fn write_raw(&mut self, text: &str) {
        if let Some(file) = self.file.as_mut() {
            // nowhere left to report a failed write
            let _ = file.write_all(text.as_bytes());
            let _ = file.flush();
        }
    }
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();
static MIRROR_TO_STDERR: AtomicBool = AtomicBool::new(false);
/// Set once the CLI or the environment picked a level; config then stays out
static LEVEL_PINNED: AtomicBool = AtomicBool::new(false);

fn logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::open()))
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// One log line, newline included
fn format_line(level: log::Level, target: &str, message: &std::fmt::Arguments<'_>) -> String {
    format!("[{}] [{:<5}] [{}] {}\n", timestamp(), level, target, message)
}

struct LogBridge;

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record.level(), record.target(), record.args());
        logger().lock().write_raw(&line);
        if MIRROR_TO_STDERR.load(Ordering::Relaxed) {
            eprint!("{}", line);
        }
    }

    fn flush(&self) {
        if let Some(file) = logger().lock().file.as_mut() {
            let _ = file.flush();
        }
    }
}

static BRIDGE: LogBridge = LogBridge;

/// Route the `log` facade into the debug log file.
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init_log_bridge(cli_level: Option<LevelFilter>) {
    let mirror = std::env::var_os("RUST_LOG").is_some();
    MIRROR_TO_STDERR.store(mirror, Ordering::Relaxed);

    let level = match cli_level {
        Some(level) => {
            LEVEL_PINNED.store(true, Ordering::Relaxed);
            level
        }
        None => match DebugLevel::from_env() {
            Some(level) => {
                LEVEL_PINNED.store(true, Ordering::Relaxed);
                level.to_level_filter()
            }
            None => LogLevel::default().to_level_filter(),
        },
    };

    if log::set_logger(&BRIDGE).is_err() {
        log::debug!("Log bridge already installed");
        return;
    }
    log::set_max_level(level);
    log::info!("Debug log at {:?} (level {})", log_path(), level);
}

/// Apply the config file's level unless the CLI or environment pinned one.
///
/// Returns whether the level changed.
pub fn apply_config_level(level: LogLevel) -> bool {
    if LEVEL_PINNED.load(Ordering::Relaxed) {
        return false;
    }
    let filter = level.to_level_filter();
    if log::max_level() == filter {
        return false;
    }
    log::set_max_level(filter);
    true
}
