//! Default path helpers and symlink checks.
//! Determines the config file location and detects symlinked ancestors for safety.

use anyhow::{anyhow, Result};
use dirs::config_dir;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CONFIG_ENV;

/// Config file location. Precedence: `explicit` (the `--config` flag), then
/// `$ATOMIC_TMP_CONFIG`, then `<config_dir>/atomic_tmp/config.xml`.
/// Relative explicit/env paths are resolved against the working directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    let chosen = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));
    match chosen {
        Some(p) if p.is_relative() => Ok(env::current_dir()?.join(p)),
        Some(p) => Ok(p),
        None => default_config_path(),
    }
}

/// OS-appropriate default config path.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(mut base) = config_dir() {
        base.push("atomic_tmp");
        base.push("config.xml");
        return Ok(base);
    }
    env::var_os("HOME")
        .map(|h| PathBuf::from(h).join(".config").join("atomic_tmp").join("config.xml"))
        .ok_or_else(|| anyhow!("cannot determine a config directory (no config dir and HOME unset)"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.as_os_str().is_empty() {
            break;
        }
        match fs::symlink_metadata(anc) {
            Ok(meta) if meta.file_type().is_symlink() => return Ok(true),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        p = anc.parent();
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    #[test]
    fn explicit_path_wins() {
        let p = resolve_config_path(Some(Path::new("/etc/atomic_tmp.xml"))).unwrap();
        assert_eq!(p, PathBuf::from("/etc/atomic_tmp.xml"));
    }

    #[test]
    fn detects_symlinked_ancestor() {
        let td = tempdir().unwrap();
        let real = td.path().join("real");
        fs::create_dir(&real).unwrap();
        let link = td.path().join("link");
        symlink(&real, &link).unwrap();

        assert!(path_has_symlink_ancestor(&link.join("sub/config.xml")).unwrap());
        assert!(!path_has_symlink_ancestor(&real.join("sub/config.xml")).unwrap());
    }
}
