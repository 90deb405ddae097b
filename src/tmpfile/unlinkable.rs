//! Anonymous temp files that can never be given a name.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use tracing::{debug, warn};

use crate::errors::{Result, TmpError};
use crate::naming::{tmp_dir, PathTemplate};
use crate::platform::{self, DirFd};
use crate::secure::{create_from_template, DEFAULT_FILE_MODE};

/// Open 0600 storage in `directory` (default: `tmp_dir()`) that no path
/// resolves to. Uses `O_TMPFILE|O_EXCL` where available; otherwise creates
/// an unguessable name and unlinks it before returning.
pub fn open_tmpfile_unlinkable(directory: Option<&Path>, flags: libc::c_int) -> Result<File> {
    let dir = directory.map(Path::to_path_buf).unwrap_or_else(tmp_dir);

    match platform::open_tmpfile(DirFd::Cwd, &dir, flags | libc::O_EXCL, DEFAULT_FILE_MODE) {
        Ok(fd) => return Ok(File::from(fd)),
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "O_TMPFILE unavailable; creating and unlinking a named file");
        }
    }

    create_then_unlink(&dir, flags)
}

/// Fallback without `O_TMPFILE`: a random 0600 name, removed right away.
fn create_then_unlink(dir: &Path, flags: libc::c_int) -> Result<File> {
    let template = PathTemplate::in_dir(dir, "atomic_tmp-")?;
    let (file, path) = create_from_template(DirFd::Cwd, &template, flags, DEFAULT_FILE_MODE)?;
    if let Err(e) = platform::unlinkat(DirFd::Cwd, &path, 0) {
        drop(file);
        if let Err(rm) = platform::unlinkat(DirFd::Cwd, &path, 0)
            && rm.kind() != io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %rm, "named fallback file left behind");
        }
        return Err(TmpError::io("unlink", &path, e));
    }
    Ok(file)
}

/// Buffered form of `open_tmpfile_unlinkable`.
pub fn fopen_tmpfile_unlinkable(directory: Option<&Path>, flags: libc::c_int) -> Result<BufWriter<File>> {
    open_tmpfile_unlinkable(directory, flags).map(BufWriter::new)
}
