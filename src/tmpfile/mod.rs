//! Temporary files: anonymous, linkable, and named.
//!
//! - `open_tmpfile_unlinkable`: storage no path will ever reach.
//! - `open_tmpfile_linkable`: pathless for now, published later exactly once.
//! - `open_temporary_at`: a hidden, randomly named sibling the caller renames.
//!
//! Every entry point has an `f`-prefixed twin that wraps the descriptor in a
//! `BufWriter`.

mod linkable;
mod named;
mod publish;
mod unlinkable;

pub use linkable::{
    fopen_tmpfile_linkable, open_tmpfile_linkable, open_tmpfile_linkable_at, LinkStrategy,
    LinkableTmpFile,
};
pub use named::{fopen_temporary, fopen_temporary_at, open_temporary_at};
pub use publish::{Overwrite, PublishError, PublishOptions, Published};
pub use unlinkable::{fopen_tmpfile_unlinkable, open_tmpfile_unlinkable};

use std::fs::File;
use std::io::{BufWriter, Write};

/// Something a temp file is written through: the file itself or a buffer
/// in front of it. Publishing flushes the stream before naming the file.
pub trait TmpStream: Write {
    fn file(&self) -> &File;
}

impl TmpStream for File {
    fn file(&self) -> &File {
        self
    }
}

impl TmpStream for BufWriter<File> {
    fn file(&self) -> &File {
        self.get_ref()
    }
}
