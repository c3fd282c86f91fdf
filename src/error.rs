use std::fmt::Display;
use std::io;

use serde::{Deserialize, Serialize};

/// AtticDB errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// A syscall-level I/O problem. `origin` names the call site, `errno`
    /// carries the OS error number (0 if none was available).
    File {
        origin: String,
        filename: String,
        errno: i32,
    },
    /// An index file with an unknown format version. Fatal to the query.
    BadHeader { filename: String, detail: String },
    /// A data file whose size does not match its block size, or an index
    /// entry referencing blocks outside the file. Fatal to the query.
    BlockSizeMismatch { filename: String, detail: String },
    /// An environment precondition was violated before any work began.
    Context(String),
    /// Invalid on-disk data, typically decoding errors or corruption.
    Corrupt(String),
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::File {
                origin,
                filename,
                errno,
            } => write!(f, "{origin}: '{filename}' (errno {errno})"),
            Error::BadHeader { filename, detail } => {
                write!(f, "bad index header in '{filename}': {detail}")
            }
            Error::BlockSizeMismatch { filename, detail } => {
                write!(f, "block size mismatch in '{filename}': {detail}")
            }
            Error::Context(msg) => write!(f, "context error: {msg}"),
            Error::Corrupt(msg) => write!(f, "corrupt data: {msg}"),
        }
    }
}

impl Error {
    /// Wraps an io::Error with its call site and the affected file.
    pub fn file(origin: &'static str, filename: impl Into<String>, err: &io::Error) -> Self {
        Error::File {
            origin: origin.to_string(),
            filename: filename.into(),
            errno: err.raw_os_error().unwrap_or(0),
        }
    }
}

/// Constructs an Error::Corrupt for the given format string.
#[macro_export]
macro_rules! errcorrupt {
    ($($args:tt)*) => { $crate::error::Error::Corrupt(format!($($args)*)) };
}

/// An AtticDB Result returning Error.
pub type Result<T> = std::result::Result<T, Error>;

impl<T> From<Error> for Result<T> {
    fn from(error: Error) -> Self {
        Err(error)
    }
}
