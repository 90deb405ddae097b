//! Crash-safe temporary files and directories with atomic publishing.
//!
//! Writers that must never expose a half-written file under its final name
//! create the content somewhere no reader looks, then make it visible in one
//! atomic step:
//!
//! ```no_run
//! use std::io::Write;
//! use std::path::Path;
//!
//! let target = Path::new("/etc/myapp/state.json");
//! let mut tmp = atomic_tmp::open_tmpfile_linkable(target, 0, 0o644)?;
//! tmp.write_all(b"{}")?;
//! tmp.publish(target)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Layers, leaf first:
//! - `naming`: candidate names from templates (`.#<extra><name><suffix>`).
//! - `secure`: exclusive creation with an exact mode.
//! - `tmpfile`: unlinkable, linkable and named temp files, plus publishing.
//! - `tmpdir`: temp directories.
//! - `platform`: `*at` syscall wrappers and `O_TMPFILE`/`renameat2` support.
//!
//! `cli`, `config` and `output` back the `atomic_tmp` binary.

#[cfg(not(unix))]
compile_error!("atomic_tmp relies on POSIX *at syscalls and only builds on Unix targets");

pub mod cli;
pub mod config;
pub mod errors;
pub mod naming;
pub mod output;
pub mod platform;
pub mod secure;
pub mod tmpdir;
pub mod tmpfile;

pub use config::{Config, LogLevel};
pub use errors::{Result, TmpError};
pub use naming::{tempfn_random, tempfn_random_child, tempfn_xxxxxx, tmp_dir, PathTemplate};
pub use platform::DirFd;
pub use secure::{fmkostemp_safe, mkostemp_safe, secure_create, secure_create_at, DEFAULT_FILE_MODE};
pub use tmpdir::{mkdtemp, mkdtemp_open, mkdtemp_with_mode, TmpDir, DEFAULT_DIR_MODE};
pub use tmpfile::{
    fopen_temporary, fopen_temporary_at, fopen_tmpfile_linkable, fopen_tmpfile_unlinkable,
    open_temporary_at, open_tmpfile_linkable, open_tmpfile_linkable_at, open_tmpfile_unlinkable,
    LinkStrategy, LinkableTmpFile, Overwrite, PublishError, PublishOptions, Published,
};
