use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{Error, Result};

/// A file handle whose operations report failures as `Error::File` tagged
/// with the call site that issued them.
#[derive(Debug)]
pub struct RawFile {
    file: File,
    filename: String,
}

impl RawFile {
    /// Opens an existing file read-only.
    pub fn open_read(origin: &'static str, filename: &str) -> Result<Self> {
        let file = File::open(filename).map_err(|e| Error::file(origin, filename, &e))?;
        Ok(Self {
            file,
            filename: filename.to_string(),
        })
    }

    /// Opens an existing file read-only, treating a missing file as absent
    /// rather than an error.
    pub fn open_optional(origin: &'static str, filename: &str) -> Result<Option<Self>> {
        match File::open(filename) {
            Ok(file) => Ok(Some(Self {
                file,
                filename: filename.to_string(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::file(origin, filename, &e)),
        }
    }

    /// Opens a file for reading and writing, creating it if missing.
    pub fn open_write(origin: &'static str, filename: &str) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(filename)
            .map_err(|e| Error::file(origin, filename, &e))?;
        Ok(Self {
            file,
            filename: filename.to_string(),
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn size(&self, origin: &'static str) -> Result<u64> {
        let meta = self
            .file
            .metadata()
            .map_err(|e| Error::file(origin, &self.filename, &e))?;
        Ok(meta.len())
    }

    /// Reads the whole file into memory.
    pub fn read_all(&mut self, origin: &'static str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_end(&mut buf))
            .map_err(|e| Error::file(origin, &self.filename, &e))?;
        Ok(buf)
    }

    /// Reads exactly `buf.len()` bytes at the given offset. Returns false
    /// without touching `buf` when the read would run past end of file.
    pub fn read_exact_at(&mut self, origin: &'static str, offset: u64, buf: &mut [u8]) -> Result<bool> {
        let size = self.size(origin)?;
        if offset + buf.len() as u64 > size {
            return Ok(false);
        }
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(buf))
            .map_err(|e| Error::file(origin, &self.filename, &e))?;
        Ok(true)
    }

    /// Truncates or extends the file to `len` bytes.
    pub fn resize(&mut self, origin: &'static str, len: u64) -> Result<()> {
        self.file
            .set_len(len)
            .map_err(|e| Error::file(origin, &self.filename, &e))
    }

    /// Writes `buf` at the start of the file.
    pub fn write_all_at_start(&mut self, origin: &'static str, buf: &[u8]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.write_all(buf))
            .map_err(|e| Error::file(origin, &self.filename, &e))
    }

    pub fn sync(&mut self, origin: &'static str) -> Result<()> {
        self.file
            .sync_all()
            .map_err(|e| Error::file(origin, &self.filename, &e))
    }
}

/// Reads a whole file, treating a missing file as absent.
pub fn read_optional(origin: &'static str, filename: &str) -> Result<Option<Vec<u8>>> {
    match RawFile::open_optional(origin, filename)? {
        Some(mut file) => Ok(Some(file.read_all(origin)?)),
        None => Ok(None),
    }
}

/// Atomically replaces `to` with `from` via rename.
pub fn rename(origin: &'static str, from: &str, to: &str) -> Result<()> {
    fs::rename(from, to).map_err(|e| Error::file(origin, from, &e))
}
