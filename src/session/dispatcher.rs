use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Presence sentinel / shared resource name of the base store.
pub const OSM_BASE_SHARED_NAME: &str = "osm3s_osm_base";
/// Same, for the areas store.
pub const AREA_SHARED_NAME: &str = "osm3s_areas";

/// The handshake a query performs against the cross-process dispatcher.
/// Readers run `request_read_and_idx` → `read_idx_finished` →
/// `read_finished`; the areas writer runs `write_start` → `write_commit`.
/// `ping` may be called at any time in between.
pub trait DispatcherClient {
    fn db_dir(&self) -> &str;

    fn request_read_and_idx(
        &mut self,
        max_time: u32,
        max_space: u64,
        client_token: u32,
    ) -> Result<()>;

    fn read_idx_finished(&mut self) -> Result<()>;

    /// Ends a read, carrying the accumulated per-phase CPU times.
    fn read_finished(&mut self, cpu_times: &[u64]) -> Result<()>;

    fn write_start(&mut self) -> Result<()>;

    fn write_commit(&mut self) -> Result<()>;

    fn ping(&self) -> Result<()>;
}

/// Fails when the presence sentinel of a dispatcher exists in `db_dir`:
/// either a dispatcher is running (attach through it instead), or it died
/// without cleaning up and the operator must remove the file.
pub fn ensure_no_stale_dispatcher(db_dir: &str, shared_name: &str) -> Result<()> {
    let sentinel = format!("{db_dir}{shared_name}");
    if Path::new(&sentinel).exists() {
        return Err(Error::Context(format!(
            "File {sentinel} present, which indicates a running dispatcher. \
             Delete file if no dispatcher is running."
        )));
    }
    Ok(())
}

/// In-process stand-in for the dispatcher, used when no dispatcher socket
/// is configured. Reads are granted freely (the on-disk data is immutable
/// without a writer); writer exclusivity is enforced with an advisory
/// file lock.
pub struct LocalDispatcher {
    db_dir: String,
    shared_name: &'static str,
    write_lock: Option<FileLock>,
}

impl LocalDispatcher {
    pub fn new(db_dir: impl Into<String>, shared_name: &'static str) -> Self {
        Self {
            db_dir: db_dir.into(),
            shared_name,
            write_lock: None,
        }
    }
}

impl DispatcherClient for LocalDispatcher {
    fn db_dir(&self) -> &str {
        &self.db_dir
    }

    fn request_read_and_idx(
        &mut self,
        max_time: u32,
        max_space: u64,
        client_token: u32,
    ) -> Result<()> {
        debug!(max_time, max_space, client_token, "local read grant");
        Ok(())
    }

    fn read_idx_finished(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_finished(&mut self, cpu_times: &[u64]) -> Result<()> {
        debug!(?cpu_times, "local read finished");
        Ok(())
    }

    fn write_start(&mut self) -> Result<()> {
        let path = format!("{}{}.lock", self.db_dir, self.shared_name);
        let lock = FileLock::lock(Path::new(&path))
            .map_err(|e| Error::file("DispatcherClient::write_start", &path, &e))?;
        self.write_lock = Some(lock);
        Ok(())
    }

    fn write_commit(&mut self) -> Result<()> {
        self.write_lock = None;
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// An exclusively flocked file holding the owner's pid. The lock is
/// released when the value drops; the file itself is left behind to avoid
/// unlink races.
struct FileLock {
    _file: File,
}

impl FileLock {
    fn lock(path: &Path) -> std::io::Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error());
        }

        writeln!(file, "{}", std::process::id())?;
        file.flush()?;
        Ok(Self { _file: file })
    }
}
