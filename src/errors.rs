//! Typed error definitions for atomic_tmp.
//! Every failure mode a caller may want to branch on (retry with a new name,
//! fall back to copying, pick another target) has its own variant.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T, E = TmpError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TmpError {
    #[error("Invalid template '{}': {reason}", template.display())]
    InvalidTemplate {
        template: PathBuf,
        reason: &'static str,
    },

    #[error("Name collision: '{}' already exists", .0.display())]
    NameCollision(PathBuf),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Cannot link '{}' to '{}': different filesystems", from.display(), to.display())]
    CrossDevice { from: PathBuf, to: PathBuf },

    #[error("Target already exists: {}", .0.display())]
    TargetExists(PathBuf),

    #[error("{op} '{}': {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TmpError {
    /// Stable numeric code for logs and process exit statuses.
    pub fn code(&self) -> i32 {
        match self {
            TmpError::InvalidTemplate { .. } => 10,
            TmpError::NameCollision(_) => 11,
            TmpError::ResourceExhausted(_) => 12,
            TmpError::CrossDevice { .. } => 13,
            TmpError::TargetExists(_) => 14,
            TmpError::Io { .. } => 20,
        }
    }

    pub fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        TmpError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Classify a failed link/rename that would give `to` its content:
    /// EEXIST becomes `TargetExists`, EXDEV becomes `CrossDevice`.
    pub(crate) fn publish(op: &'static str, from: &Path, to: &Path, source: io::Error) -> Self {
        match source.raw_os_error() {
            Some(libc::EEXIST) => TmpError::TargetExists(to.to_path_buf()),
            Some(libc::EXDEV) => TmpError::CrossDevice {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
            },
            _ => TmpError::io(op, to, source),
        }
    }

    pub(crate) fn invalid_template(template: &Path, reason: &'static str) -> Self {
        TmpError::InvalidTemplate {
            template: template.to_path_buf(),
            reason,
        }
    }

    /// Underlying OS error, if this error came from a system call.
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            TmpError::Io { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Short, actionable remediation hint for user-facing output.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            TmpError::InvalidTemplate { .. } => {
                Some("templates must end in at least six 'X' characters, e.g. /tmp/fooXXXXXX")
            }
            TmpError::NameCollision(_) => Some("another process claimed the name; retry"),
            TmpError::ResourceExhausted(_) => {
                Some("use a longer placeholder run or a shorter path, and check for contention")
            }
            TmpError::CrossDevice { .. } => {
                Some("create the temp file on the target's filesystem, or copy instead of linking")
            }
            TmpError::TargetExists(_) => {
                Some("pick another name, remove the target, or publish with replace semantics")
            }
            TmpError::Io { source, .. } => io_hint(source),
        }
    }
}

/// Platform-aware hint for a raw io::Error.
fn io_hint(e: &io::Error) -> Option<&'static str> {
    if let Some(code) = e.raw_os_error() {
        return match code {
            libc::EACCES | libc::EPERM => {
                Some("permission denied; check ownership and write permissions")
            }
            libc::ENOENT => Some("path not found; verify the directory exists"),
            libc::ENOSPC => Some("insufficient space on device"),
            libc::EROFS => Some("read-only filesystem; cannot write here"),
            libc::ELOOP => Some("too many symbolic link levels; possible symlink cycle"),
            libc::ENAMETOOLONG => Some("filename or path too long; shorten path segments"),
            libc::EMFILE => Some("process file descriptor limit reached"),
            libc::ENFILE => Some("system-wide file table overflow"),
            libc::EOPNOTSUPP => Some("operation not supported by this filesystem"),
            _ => None,
        };
    }
    match e.kind() {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership"),
        io::ErrorKind::NotFound => Some("path not found; verify it exists"),
        io::ErrorKind::InvalidInput => Some("invalid argument"),
        _ => None,
    }
}
