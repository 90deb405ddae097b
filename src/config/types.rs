//! Core configuration types.
//! - Config holds front-end settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.
//! - Modes are written and parsed as octal strings ("0600", "640", "0o755").

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::naming;
use crate::secure::DEFAULT_FILE_MODE;
use crate::tmpdir::DEFAULT_DIR_MODE;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Warnings and one line per created/published path (default)
    #[default]
    Normal,
    /// Capability fallbacks and strategy decisions
    Info,
    /// Every retry and syscall-level attempt
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" | "warn" => Some(LogLevel::Normal),
            "info" | "verbose" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Parse a permission mode written in octal. Only permission and
/// set-id/sticky bits are accepted.
pub fn parse_mode(s: &str) -> Result<u32, String> {
    let t = s.trim();
    let digits = t.strip_prefix("0o").unwrap_or(t);
    if digits.is_empty() {
        return Err(format!("invalid mode: '{s}'"));
    }
    let mode = u32::from_str_radix(digits, 8).map_err(|_| format!("invalid octal mode: '{s}'"))?;
    if mode > 0o7777 {
        return Err(format!("mode out of range: '{s}' (max 7777)"));
    }
    Ok(mode)
}

/// Front-end configuration. The library itself reads none of this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory for `mktemp` when the template has no directory part
    pub tmp_dir: Option<PathBuf>,
    /// Mode for created and published files
    pub file_mode: u32,
    /// Mode for created directories
    pub dir_mode: u32,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmp_dir: None,
            file_mode: DEFAULT_FILE_MODE,
            dir_mode: DEFAULT_DIR_MODE,
            log_level: LogLevel::Normal,
            log_file: None,
        }
    }
}

impl Config {
    /// Configured temp directory, else the environment-derived default.
    pub fn effective_tmp_dir(&self) -> PathBuf {
        self.tmp_dir.clone().unwrap_or_else(naming::tmp_dir)
    }
}
