//! Exclusive, permission-exact file creation.
//!
//! The mode is handed to `openat` so the file is born with at most the
//! requested bits (umask can only remove bits). The descriptor is then
//! `fchmod`ed to exactly `mode`, which can only add back what umask took.
//! At no instant is the file more permissive than requested, and the
//! process umask is never touched.

use rand::Rng;
use std::fs::File;
use std::io::{self, BufWriter};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

use crate::errors::{Result, TmpError};
use crate::naming::PathTemplate;
use crate::platform::{self, DirFd};

/// Default mode for temporary files: owner read/write.
pub const DEFAULT_FILE_MODE: u32 = 0o600;

/// Candidate names tried before giving up with `ResourceExhausted`.
pub const MAX_ATTEMPTS: u32 = 16;

/// Create `path` (relative to `dir`) exclusively, with exactly `mode`.
/// Never follows a symlink at `path`; an existing entry is `NameCollision`.
pub fn secure_create_at(dir: DirFd<'_>, path: &Path, flags: libc::c_int, mode: u32) -> Result<File> {
    let open_flags =
        libc::O_RDWR | libc::O_CREAT | libc::O_EXCL | libc::O_NOFOLLOW | libc::O_NOCTTY | flags;
    let fd = match platform::openat(dir, path, open_flags, mode) {
        Ok(fd) => fd,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(TmpError::NameCollision(path.to_path_buf()));
        }
        Err(e) => return Err(TmpError::io("create", path, e)),
    };
    if let Err(e) = platform::fchmod(fd.as_fd(), mode) {
        if let Err(rm) = platform::unlinkat(dir, path, 0) {
            warn!(path = %path.display(), error = %rm, "failed to remove file after chmod failure");
        }
        return Err(TmpError::io("chmod", path, e));
    }
    Ok(File::from(fd))
}

/// `secure_create_at` relative to the working directory.
pub fn secure_create(path: &Path, mode: u32) -> Result<File> {
    secure_create_at(DirFd::Cwd, path, 0, mode)
}

/// Fill `template` and create the result, retrying collisions up to
/// `MAX_ATTEMPTS`. Losers of a creation race never leave a file behind.
pub fn create_from_template(
    dir: DirFd<'_>,
    template: &PathTemplate,
    flags: libc::c_int,
    mode: u32,
) -> Result<(File, PathBuf)> {
    create_from_template_with(dir, template, flags, mode, &mut rand::thread_rng())
}

fn create_from_template_with<R: Rng>(
    dir: DirFd<'_>,
    template: &PathTemplate,
    flags: libc::c_int,
    mode: u32,
    rng: &mut R,
) -> Result<(File, PathBuf)> {
    for attempt in 1..=MAX_ATTEMPTS {
        let candidate = template.candidate_with(rng);
        match secure_create_at(dir, &candidate, flags, mode) {
            Ok(file) => return Ok((file, candidate)),
            Err(TmpError::NameCollision(p)) => {
                trace!(attempt, path = %p.display(), "temp name taken; retrying");
            }
            Err(e) => return Err(e),
        }
    }
    Err(TmpError::ResourceExhausted(format!(
        "no free name for template '{template}' after {MAX_ATTEMPTS} attempts"
    )))
}

/// Create a file from `template` with mode 0600. Returns the descriptor
/// and the realized path; the caller owns both.
pub fn mkostemp_safe(template: &PathTemplate) -> Result<(File, PathBuf)> {
    create_from_template(DirFd::Cwd, template, 0, DEFAULT_FILE_MODE)
}

/// Buffered form of `mkostemp_safe`.
pub fn fmkostemp_safe(template: &PathTemplate) -> Result<(BufWriter<File>, PathBuf)> {
    let (file, path) = mkostemp_safe(template)?;
    Ok((BufWriter::new(file), path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use std::fs;
    use std::io::Write;
    use std::os::unix::fs::{symlink, PermissionsExt};
    use tempfile::tempdir;

    fn mode_of(p: &Path) -> u32 {
        fs::symlink_metadata(p).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn requested_mode_is_exact_regardless_of_umask() {
        let td = tempdir().unwrap();
        for mode in [0o600, 0o640, 0o666] {
            let p = td.path().join(format!("f{mode:o}"));
            secure_create(&p, mode).unwrap();
            assert_eq!(mode_of(&p), mode, "mode for {}", p.display());
        }
    }

    #[test]
    fn existing_path_is_a_collision() {
        let td = tempdir().unwrap();
        let p = td.path().join("taken");
        fs::write(&p, b"original").unwrap();
        let err = secure_create(&p, 0o600).unwrap_err();
        assert!(matches!(err, TmpError::NameCollision(ref q) if q == &p), "{err:?}");
        assert_eq!(fs::read(&p).unwrap(), b"original");
    }

    #[test]
    fn dangling_symlink_is_not_followed() {
        let td = tempdir().unwrap();
        let link = td.path().join("link");
        let victim = td.path().join("victim");
        symlink(&victim, &link).unwrap();
        let err = secure_create(&link, 0o600).unwrap_err();
        assert!(matches!(err, TmpError::NameCollision(_)), "{err:?}");
        assert!(!victim.exists());
    }

    #[test]
    fn missing_directory_is_plain_io() {
        let td = tempdir().unwrap();
        let err = secure_create(&td.path().join("nope/file"), 0o600).unwrap_err();
        assert!(matches!(err, TmpError::Io { op: "create", .. }), "{err:?}");
    }

    #[test]
    fn mkostemp_creates_0600_file_matching_template() {
        let td = tempdir().unwrap();
        let t = PathTemplate::in_dir(td.path(), "job-").unwrap();
        let (mut f, p) = mkostemp_safe(&t).unwrap();
        f.write_all(b"data").unwrap();
        assert_eq!(p.parent(), Some(td.path()));
        assert!(p.file_name().unwrap().to_str().unwrap().starts_with("job-"));
        assert_eq!(mode_of(&p), 0o600);
        assert_eq!(fs::read(&p).unwrap(), b"data");
    }

    #[test]
    fn fmkostemp_flushes_through_buffer() {
        let td = tempdir().unwrap();
        let t = PathTemplate::in_dir(td.path(), "buf-").unwrap();
        let (mut w, p) = fmkostemp_safe(&t).unwrap();
        w.write_all(b"buffered").unwrap();
        w.flush().unwrap();
        assert_eq!(fs::read(&p).unwrap(), b"buffered");
    }

    #[test]
    fn persistent_collision_exhausts_retry_budget() {
        let td = tempdir().unwrap();
        let t = PathTemplate::in_dir(td.path(), "fixed-").unwrap();
        // A constant RNG makes every candidate identical.
        let mut rng = StepRng::new(0, 0);
        let only = t.candidate_with(&mut rng);
        fs::write(&only, b"squatter").unwrap();

        let err = create_from_template_with(DirFd::Cwd, &t, 0, 0o600, &mut rng).unwrap_err();
        assert!(matches!(err, TmpError::ResourceExhausted(_)), "{err:?}");
        assert_eq!(fs::read_dir(td.path()).unwrap().count(), 1, "losers must not leave files");
    }
}
