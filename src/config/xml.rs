//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Writes a template config through the crate's own create-only publish.
//!
//! Unknown XML fields are a hard error so typos surface immediately.

use anyhow::{bail, Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs::{self, DirBuilder};
use std::io::Write;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::paths::{path_has_symlink_ancestor, resolve_config_path};
use super::types::{parse_mode, Config, LogLevel};
use crate::errors::TmpError;
use crate::tmpfile::open_tmpfile_linkable;

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    tmp_dir: Option<String>,
    file_mode: Option<String>,
    dir_mode: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|t| !t.is_empty())
}

// Map XmlConfig -> Config; absent or empty elements keep the defaults.
fn xml_to_config(parsed: XmlConfig, origin: &Path) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(s) = non_empty(parsed.tmp_dir.as_deref()) {
        cfg.tmp_dir = Some(PathBuf::from(s));
    }
    if let Some(s) = non_empty(parsed.file_mode.as_deref()) {
        cfg.file_mode = parse_mode(s)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("file_mode in '{}'", origin.display()))?;
    }
    if let Some(s) = non_empty(parsed.dir_mode.as_deref()) {
        cfg.dir_mode = parse_mode(s)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("dir_mode in '{}'", origin.display()))?;
    }
    if let Some(s) = non_empty(parsed.log_level.as_deref()) {
        cfg.log_level = s
            .parse::<LogLevel>()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("log_level in '{}'", origin.display()))?;
    }
    if let Some(s) = non_empty(parsed.log_file.as_deref()) {
        cfg.log_file = Some(PathBuf::from(s));
    }
    Ok(cfg)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig =
        from_xml_str(&contents).with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed, path)
}

/// Outcome of looking for a config file.
#[derive(Debug)]
pub enum LoadResult {
    /// A config file was found and parsed.
    Loaded(Config, PathBuf),
    /// The default location has no config file; defaults apply.
    Missing(PathBuf),
}

/// Resolve the config path and load it if present. A missing file at the
/// default location is fine; a missing file that was asked for explicitly
/// (flag or env) is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadResult> {
    let asked = explicit.is_some() || std::env::var_os(super::CONFIG_ENV).is_some();
    let path = resolve_config_path(explicit)?;
    if !path.exists() {
        if asked {
            bail!("config file '{}' does not exist", path.display());
        }
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(LoadResult::Missing(path));
    }
    let cfg = load_config_from_xml_path(&path)?;
    debug!(path = %path.display(), "loaded config");
    Ok(LoadResult::Loaded(cfg, path))
}

fn template_contents() -> String {
    let defaults = Config::default();
    format!(
        "<!--\n  atomic_tmp configuration (XML)\n\n    tmp_dir    -> directory for mktemp when the template has no directory part\n                  (empty: $TMPDIR, $TEMP, $TMP, else /tmp)\n    file_mode  -> octal mode for created and published files\n    dir_mode   -> octal mode for created directories\n    log_level  -> quiet | normal | info | debug\n    log_file   -> path to a log file (optional; stderr is always used)\n\n  CLI flags override XML values.\n-->\n<config>\n  <tmp_dir></tmp_dir>\n  <file_mode>{:04o}</file_mode>\n  <dir_mode>{:04o}</dir_mode>\n  <log_level>{}</log_level>\n  <log_file></log_file>\n</config>\n",
        defaults.file_mode, defaults.dir_mode, defaults.log_level
    )
}

/// Write a template config at `path` (mode 0600, missing parents 0700).
/// Never overwrites: an existing file is an error and is left untouched.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "refusing to create config: an ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(parent)
            .with_context(|| format!("create config directory '{}'", parent.display()))?;
    }

    let mut tmp = open_tmpfile_linkable(path, 0, 0o600)?;
    if let Err(e) = tmp.write_all(template_contents().as_bytes()) {
        let _ = tmp.discard();
        return Err(TmpError::io("write", path, e).into());
    }
    match tmp.publish(path) {
        Ok(_) => {
            info!(path = %path.display(), "created template config");
            Ok(())
        }
        Err(failed) => {
            let _ = failed.file.discard();
            Err(failed.error).with_context(|| format!("create template config '{}'", path.display()))
        }
    }
}
