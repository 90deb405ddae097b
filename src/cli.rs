//! CLI definition and parsing.
//! Defines Args (global flags plus one subcommand) and provides parse().
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug.
//! - Mode flags take octal strings, the same spelling as the XML config.

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::config::types::{parse_mode, Config, LogLevel};

/// Crash-safe temp files and directories with atomic publishing.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Create temp files/directories and publish files atomically")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable debug logging (equivalent to `--log-level debug`). Not global:
    /// `mktemp -d` means `--directory`.
    #[arg(short = 'd', long, help = "Enable debug logging (shorthand for --log-level debug)")]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Emit logs in structured JSON.
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Use this config file instead of $ATOMIC_TMP_CONFIG or the default location.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print where atomic_tmp looks for its config file, then exit.
    #[arg(long, help = "Print the config file location used by atomic_tmp and exit")]
    pub print_config: bool,

    /// Write a template config file at the config location, then exit.
    #[arg(long, help = "Write a template config file (never overwrites) and exit")]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a temp file (or directory) from a template and print its path.
    Mktemp {
        /// Template ending in at least six X; without a directory part it is
        /// placed in the temp directory.
        #[arg(value_name = "TEMPLATE")]
        template: Option<String>,

        /// Create a directory instead of a file.
        #[arg(short = 'd', long)]
        directory: bool,

        /// Temp directory for templates without a directory part.
        #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
        tmpdir: Option<PathBuf>,

        /// Exact mode for the new entry (octal).
        #[arg(long, value_name = "OCTAL", value_parser = parse_mode)]
        mode: Option<u32>,
    },

    /// Print a generated temp name for PATH without touching the filesystem.
    Name {
        #[arg(value_name = "PATH", value_hint = ValueHint::AnyPath)]
        path: PathBuf,

        /// Extra fragment inserted after the `.#` prefix.
        #[arg(long, value_name = "S")]
        extra: Option<String>,

        /// Place the name inside PATH instead of next to it.
        #[arg(long, conflicts_with = "placeholder")]
        child: bool,

        /// Print the XXXXXX template instead of a random name.
        #[arg(long)]
        placeholder: bool,
    },

    /// Copy stdin into a temp file next to TARGET and publish it atomically.
    Write {
        #[arg(value_name = "TARGET", value_hint = ValueHint::FilePath)]
        target: PathBuf,

        /// Atomically replace an existing TARGET instead of failing.
        #[arg(long)]
        replace: bool,

        /// Exact mode for the published file (octal).
        #[arg(long, value_name = "OCTAL", value_parser = parse_mode)]
        mode: Option<u32>,

        /// Skip fsync of the file and its directory.
        #[arg(long)]
        no_sync: bool,
    },
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        match &self.command {
            Some(Command::Mktemp { tmpdir, mode, directory, .. }) => {
                if let Some(dir) = tmpdir {
                    cfg.tmp_dir = Some(dir.clone());
                }
                if let Some(m) = mode {
                    if *directory {
                        cfg.dir_mode = *m;
                    } else {
                        cfg.file_mode = *m;
                    }
                }
            }
            Some(Command::Write { mode: Some(m), .. }) => cfg.file_mode = *m,
            _ => {}
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
