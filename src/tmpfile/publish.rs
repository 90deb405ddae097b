//! Publishing: giving a linkable temp file its permanent name.
//!
//! | strategy   | `Overwrite::Refuse`                | `Overwrite::Replace`                     |
//! |------------|------------------------------------|------------------------------------------|
//! | Descriptor | `linkat` (EEXIST -> TargetExists)  | `linkat` to random sibling, `rename` over |
//! | Rename     | `renameat2(RENAME_NOREPLACE)`      | `rename`                                 |
//!
//! Both overwrite modes mean the same thing under both strategies. The target
//! either keeps its old state or shows the complete new content; it never
//! resolves to a partial file.

use std::fmt;
use std::fs::File;
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use super::linkable::{Backing, LinkStrategy, LinkableTmpFile};
use super::TmpStream;
use crate::errors::TmpError;
use crate::naming::tempfn_random;
use crate::platform;
use crate::secure::MAX_ATTEMPTS;

/// What to do when the target path already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overwrite {
    /// Fail with `TargetExists`; the existing target is left untouched.
    #[default]
    Refuse,
    /// Atomically replace the existing target.
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    pub overwrite: Overwrite,
    /// fsync the file before it gets a name and the parent directory after.
    pub sync: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            overwrite: Overwrite::Refuse,
            sync: true,
        }
    }
}

/// A successfully published file. The stream stays open and is now an
/// ordinary reference to the file, independent of its name.
#[derive(Debug)]
pub struct Published<W: TmpStream = File> {
    stream: W,
    path: PathBuf,
    strategy: LinkStrategy,
}

impl<W: TmpStream> Published<W> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Which mechanism made the file visible.
    pub fn strategy(&self) -> LinkStrategy {
        self.strategy
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}

/// A failed publish. The handle comes back so the caller can retry under
/// another name, switch to `Overwrite::Replace`, copy the content elsewhere
/// (`CrossDevice`), or discard it.
pub struct PublishError<W: TmpStream = File> {
    pub error: TmpError,
    pub file: LinkableTmpFile<W>,
}

impl<W: TmpStream> fmt::Debug for PublishError<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishError")
            .field("error", &self.error)
            .field("strategy", &self.file.strategy())
            .finish()
    }
}

impl<W: TmpStream> fmt::Display for PublishError<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<W: TmpStream> std::error::Error for PublishError<W> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<W: TmpStream> From<PublishError<W>> for TmpError {
    fn from(e: PublishError<W>) -> Self {
        e.error
    }
}

impl<W: TmpStream> LinkableTmpFile<W> {
    /// Publish at `target`, failing with `TargetExists` if it is taken.
    /// Syncs file and directory.
    pub fn publish(self, target: impl AsRef<Path>) -> Result<Published<W>, PublishError<W>> {
        self.publish_with(target, PublishOptions::default())
    }

    /// Publish at `target`, atomically replacing whatever is there.
    /// Syncs file and directory.
    pub fn publish_replace(self, target: impl AsRef<Path>) -> Result<Published<W>, PublishError<W>> {
        self.publish_with(
            target,
            PublishOptions {
                overwrite: Overwrite::Replace,
                sync: true,
            },
        )
    }

    /// Publish at `target` (relative paths resolve against the directory the
    /// handle was opened relative to).
    pub fn publish_with(
        mut self,
        target: impl AsRef<Path>,
        opts: PublishOptions,
    ) -> Result<Published<W>, PublishError<W>> {
        let target = target.as_ref();
        // Descriptor replace renames a linked sibling, which retags the backing.
        let strategy = self.strategy();
        match publish_in_place(&mut self, target, opts) {
            Ok(()) => {
                if opts.sync
                    && let Err(e) = platform::fsync_parent(self.dir(), target)
                {
                    // The name is already visible; don't turn success into failure.
                    warn!(target = %target.display(), error = %e, "fsync of parent directory failed");
                }
                debug!(target = %target.display(), ?strategy, overwrite = ?opts.overwrite, "published temp file");
                Ok(Published {
                    stream: self.stream,
                    path: target.to_path_buf(),
                    strategy,
                })
            }
            Err(error) => Err(PublishError { error, file: self }),
        }
    }
}

fn publish_in_place<W: TmpStream>(
    tmp: &mut LinkableTmpFile<W>,
    target: &Path,
    opts: PublishOptions,
) -> Result<(), TmpError> {
    tmp.stream
        .flush()
        .map_err(|e| TmpError::io("flush", tmp.display_path(), e))?;
    if opts.sync {
        tmp.stream
            .file()
            .sync_all()
            .map_err(|e| TmpError::io("fsync", tmp.display_path(), e))?;
    }

    let transient = match &tmp.backing {
        Backing::Anonymous => None,
        Backing::Named(p) => Some(p.clone()),
    };
    let dir = platform::DirFd::from_owned(tmp.dir.as_ref());
    match (transient, opts.overwrite) {
        (None, Overwrite::Refuse) => {
            platform::linkat_fd(tmp.stream.file().as_fd(), dir, target)
                .map_err(|e| TmpError::publish("link", &tmp.origin, target, e))
        }
        (None, Overwrite::Replace) => {
            // linkat cannot replace, so link under a fresh sibling name and
            // rename that over the target.
            for attempt in 1..=MAX_ATTEMPTS {
                let sibling = tempfn_random(target, None)?;
                match platform::linkat_fd(tmp.stream.file().as_fd(), dir, &sibling) {
                    Ok(()) => {
                        // The file has a name now; track it so a failed rename
                        // still leaves a handle that can be retried or discarded.
                        tmp.backing = Backing::Named(sibling.clone());
                        return platform::renameat(dir, &sibling, dir, target)
                            .map_err(|e| TmpError::publish("rename", &sibling, target, e));
                    }
                    Err(e) if e.raw_os_error() == Some(libc::EEXIST) => {
                        trace!(attempt, sibling = %sibling.display(), "link sibling taken; retrying");
                    }
                    Err(e) => return Err(TmpError::publish("link", &tmp.origin, &sibling, e)),
                }
            }
            Err(TmpError::ResourceExhausted(format!(
                "no free link name next to '{}' after {MAX_ATTEMPTS} attempts",
                target.display()
            )))
        }
        (Some(path), Overwrite::Refuse) => platform::renameat_noreplace(dir, &path, dir, target)
            .map_err(|e| TmpError::publish("rename", &path, target, e)),
        (Some(path), Overwrite::Replace) => platform::renameat(dir, &path, dir, target)
            .map_err(|e| TmpError::publish("rename", &path, target, e)),
    }
}
