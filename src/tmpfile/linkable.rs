//! Temp files created without a name and published under one later.
//!
//! The link strategy is decided once, at open time, by trying `O_TMPFILE`
//! in the target's directory:
//! - it works: the file is anonymous and gets linked by descriptor;
//! - it doesn't: a hidden random sibling is created and later renamed.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::os::fd::{AsFd, OwnedFd};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::named::create_random_sibling;
use super::TmpStream;
use crate::errors::{Result, TmpError};
use crate::platform::{self, DirFd};

/// How a `LinkableTmpFile` will be given its final name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStrategy {
    /// Anonymous file linked into place through its descriptor.
    Descriptor,
    /// Hidden transient file renamed into place.
    Rename,
}

#[derive(Debug)]
pub(super) enum Backing {
    Anonymous,
    Named(PathBuf),
}

/// An open temp file waiting to be published. Consumed by `publish*` or
/// `discard`. Dropping it without either leaves a `Rename`-strategy file's
/// transient path on disk.
#[derive(Debug)]
pub struct LinkableTmpFile<W: TmpStream = File> {
    pub(super) stream: W,
    /// Directory relative paths resolve against; `None` is the working directory.
    pub(super) dir: Option<OwnedFd>,
    /// Directory the file was created in, for diagnostics.
    pub(super) origin: PathBuf,
    pub(super) backing: Backing,
}

impl<W: TmpStream> LinkableTmpFile<W> {
    pub fn strategy(&self) -> LinkStrategy {
        match self.backing {
            Backing::Anonymous => LinkStrategy::Descriptor,
            Backing::Named(_) => LinkStrategy::Rename,
        }
    }

    /// On-disk name of the file before publishing (`Rename` strategy only).
    pub fn transient_path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Anonymous => None,
            Backing::Named(p) => Some(p),
        }
    }

    pub fn file(&self) -> &File {
        self.stream.file()
    }

    pub fn stream_mut(&mut self) -> &mut W {
        &mut self.stream
    }

    pub(super) fn dir(&self) -> DirFd<'_> {
        DirFd::from_owned(self.dir.as_ref())
    }

    /// Path used in error messages: the transient name, else the origin directory.
    pub(super) fn display_path(&self) -> &Path {
        self.transient_path().unwrap_or(&self.origin)
    }

    /// Close without publishing, removing any transient path.
    pub fn discard(self) -> Result<()> {
        let LinkableTmpFile { stream, dir, backing, .. } = self;
        drop(stream);
        if let Backing::Named(tmp) = backing {
            platform::unlinkat(DirFd::from_owned(dir.as_ref()), &tmp, 0)
                .map_err(|e| TmpError::io("unlink", &tmp, e))?;
        }
        Ok(())
    }
}

impl LinkableTmpFile<File> {
    /// Put a `BufWriter` in front of the file.
    pub fn into_buffered(self) -> LinkableTmpFile<BufWriter<File>> {
        LinkableTmpFile {
            stream: BufWriter::new(self.stream),
            dir: self.dir,
            origin: self.origin,
            backing: self.backing,
        }
    }
}

impl<W: TmpStream> Write for LinkableTmpFile<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Open a linkable temp file destined for `target` (relative to `dir`),
/// with exactly `mode`. `flags` are extra open flags; `O_EXCL` is refused
/// because it would make an `O_TMPFILE` file permanently unlinkable.
pub fn open_tmpfile_linkable_at(
    dir: DirFd<'_>,
    target: &Path,
    flags: libc::c_int,
    mode: u32,
) -> Result<LinkableTmpFile> {
    if flags & libc::O_EXCL != 0 {
        return Err(TmpError::io(
            "open",
            target,
            io::Error::new(io::ErrorKind::InvalidInput, "O_EXCL is not allowed for linkable temp files"),
        ));
    }
    let origin = platform::parent_or_dot(target).to_path_buf();
    let owned_dir = dir
        .try_clone_to_owned()
        .map_err(|e| TmpError::io("dup directory", &origin, e))?;

    match platform::open_tmpfile(dir, &origin, flags, mode) {
        Ok(fd) => {
            // Still nameless, so widening past the umask here opens no window.
            platform::fchmod(fd.as_fd(), mode).map_err(|e| TmpError::io("chmod", &origin, e))?;
            return Ok(LinkableTmpFile {
                stream: File::from(fd),
                dir: owned_dir,
                origin,
                backing: Backing::Anonymous,
            });
        }
        Err(e) => {
            debug!(target = %target.display(), error = %e, "O_TMPFILE unavailable; using a named temp sibling");
        }
    }

    let (file, tmp) = create_random_sibling(dir, target, flags, mode)?;
    Ok(LinkableTmpFile {
        stream: file,
        dir: owned_dir,
        origin,
        backing: Backing::Named(tmp),
    })
}

/// `open_tmpfile_linkable_at` relative to the working directory.
pub fn open_tmpfile_linkable(target: &Path, flags: libc::c_int, mode: u32) -> Result<LinkableTmpFile> {
    open_tmpfile_linkable_at(DirFd::Cwd, target, flags, mode)
}

/// Buffered form of `open_tmpfile_linkable`.
pub fn fopen_tmpfile_linkable(
    target: &Path,
    flags: libc::c_int,
    mode: u32,
) -> Result<LinkableTmpFile<BufWriter<File>>> {
    open_tmpfile_linkable(target, flags, mode).map(LinkableTmpFile::into_buffered)
}
