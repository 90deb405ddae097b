//! Temp-name generation.
//!
//! Pure string work, no filesystem access (except `tmp_dir`, which only
//! stats the candidate directories). Generated file names are hidden:
//!
//! - `tempfn_xxxxxx("/foo/bar/waldo", Some("x"))` -> `/foo/bar/.#xwaldoXXXXXX` (a template)
//! - `tempfn_random("/foo/bar/waldo", None)`      -> `/foo/bar/.#waldo1f9c0a3b5e7d2468`
//! - `tempfn_random_child("/foo/bar/waldo", None)` -> `/foo/bar/waldo/.#1f9c0a3b5e7d2468`

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{Result, TmpError};

/// Shortest placeholder run accepted in a template.
pub const MIN_PLACEHOLDER: usize = 6;
/// Longest single path component, in bytes, not counting the NUL.
pub const NAME_MAX: usize = 255;
/// Longest full path, in bytes.
pub const PATH_MAX: usize = 4096;

const HIDDEN_PREFIX: &str = ".#";
const PLACEHOLDER: u8 = b'X';

/// A path whose file name ends in a run of `X` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTemplate {
    path: PathBuf,
    placeholder: usize,
}

impl PathTemplate {
    /// Validate a caller-supplied `<dir>/<prefix>XXXXXX` template.
    pub fn parse(template: impl Into<PathBuf>) -> Result<Self> {
        let path = template.into();
        let name = match path.file_name() {
            Some(n) if !path.as_os_str().as_bytes().ends_with(b"/") => n,
            _ => return Err(TmpError::invalid_template(&path, "template has no file name")),
        };
        let placeholder = name
            .as_bytes()
            .iter()
            .rev()
            .take_while(|b| **b == PLACEHOLDER)
            .count();
        if placeholder < MIN_PLACEHOLDER {
            return Err(TmpError::invalid_template(
                &path,
                "file name must end in at least 6 'X' placeholder characters",
            ));
        }
        check_lengths(name, &path)?;
        Ok(Self { path, placeholder })
    }

    /// `<dir>/<prefix>XXXXXX`.
    pub fn in_dir(dir: &Path, prefix: &str) -> Result<Self> {
        Self::parse(dir.join(format!("{prefix}XXXXXX")))
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Length of the trailing placeholder run.
    pub fn placeholder_len(&self) -> usize {
        self.placeholder
    }

    /// Fill the placeholder run with fresh random alphanumerics.
    pub fn candidate(&self) -> PathBuf {
        self.candidate_with(&mut rand::thread_rng())
    }

    pub(crate) fn candidate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> PathBuf {
        let mut bytes = self.path.as_os_str().as_bytes().to_vec();
        let start = bytes.len() - self.placeholder;
        for b in &mut bytes[start..] {
            *b = rng.sample(Alphanumeric);
        }
        PathBuf::from(OsString::from_vec(bytes))
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl FromStr for PathTemplate {
    type Err = TmpError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn check_lengths(name: &OsStr, path: &Path) -> Result<()> {
    if name.len() > NAME_MAX {
        return Err(TmpError::ResourceExhausted(format!(
            "file name of '{}' exceeds {NAME_MAX} bytes",
            path.display()
        )));
    }
    if path.as_os_str().len() >= PATH_MAX {
        return Err(TmpError::ResourceExhausted(format!(
            "path '{}' exceeds {PATH_MAX} bytes",
            path.display()
        )));
    }
    Ok(())
}

/// Build `<dir>/.#<pre><name><post>` (or `<p>/.#<pre><post>` when `child`).
/// An over-long `<name>` is truncated so the result fits in NAME_MAX.
fn tempfn_build(p: &Path, pre: Option<&str>, post: &str, child: bool) -> Result<PathBuf> {
    let pre = pre.unwrap_or("");
    if pre.contains('/') {
        return Err(TmpError::invalid_template(p, "extra fragment must not contain '/'"));
    }
    let len_add = HIDDEN_PREFIX.len() + pre.len() + post.len();
    if len_add > NAME_MAX {
        return Err(TmpError::ResourceExhausted(format!(
            "'{pre}{post}' does not fit in a {NAME_MAX}-byte file name"
        )));
    }

    let mut name = OsString::from(HIDDEN_PREFIX);
    name.push(pre);
    let dir = if child {
        p
    } else {
        let base = match p.file_name() {
            Some(n) => n.as_bytes(),
            None => return Err(TmpError::invalid_template(p, "path has no file name")),
        };
        let keep = base.len().min(NAME_MAX - len_add);
        name.push(OsStr::from_bytes(&base[..keep]));
        p.parent().unwrap_or_else(|| Path::new(""))
    };
    name.push(post);

    let result = if dir.as_os_str().is_empty() {
        PathBuf::from(name)
    } else {
        dir.join(name)
    };
    if result.as_os_str().len() >= PATH_MAX {
        return Err(TmpError::ResourceExhausted(format!(
            "generated path under '{}' exceeds {PATH_MAX} bytes",
            dir.display()
        )));
    }
    Ok(result)
}

fn random_suffix() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Hidden sibling template of `p`, for callers that fill and retry themselves.
pub fn tempfn_xxxxxx(p: &Path, extra: Option<&str>) -> Result<PathTemplate> {
    let path = tempfn_build(p, extra, "XXXXXX", false)?;
    PathTemplate::parse(path)
}

/// Hidden sibling of `p` with 64 random bits appended.
pub fn tempfn_random(p: &Path, extra: Option<&str>) -> Result<PathBuf> {
    tempfn_build(p, extra, &random_suffix(), false)
}

/// Hidden random name inside directory `p` (default: `tmp_dir()`).
pub fn tempfn_random_child(p: Option<&Path>, extra: Option<&str>) -> Result<PathBuf> {
    let dir = match p {
        Some(p) => p.to_path_buf(),
        None => tmp_dir(),
    };
    tempfn_build(&dir, extra, &random_suffix(), true)
}

/// Default temporary directory: the first of `$TMPDIR`, `$TEMP`, `$TMP` that
/// names an absolute, existing directory; otherwise `/tmp`.
pub fn tmp_dir() -> PathBuf {
    for var in ["TMPDIR", "TEMP", "TMP"] {
        if let Some(val) = env::var_os(var) {
            let p = PathBuf::from(val);
            if p.is_absolute() && p.is_dir() {
                return p;
            }
        }
    }
    PathBuf::from("/tmp")
}
