//! Scoped query session.
//!
//! A session brackets all per-query process state: rlimits sized from the
//! request budgets, the dispatcher read handshake, and the base-version
//! snapshot stamp. Teardown undoes what can be undone (the handshake) and
//! logs what cannot (rlimits); handshake failures during teardown are
//! logged rather than propagated.

pub mod dispatcher;

use tracing::{error, info};

pub use dispatcher::{
    ensure_no_stale_dispatcher, DispatcherClient, LocalDispatcher, AREA_SHARED_NAME,
    OSM_BASE_SHARED_NAME,
};

use crate::error::{Error, Result};
use crate::raw_file;

/// Single-line ASCII timestamp of the base snapshot.
pub const BASE_VERSION_FILE: &str = "osm_base_version";
/// Same, for the areas store.
pub const AREA_VERSION_FILE: &str = "area_version";

/// Per-query CPU and address-space budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Seconds of CPU time.
    pub max_time: u32,
    /// Bytes of address space.
    pub max_space: u64,
}

/// Applies process rlimits derived from the budgets: twice the allowance
/// plus slack, so the cooperative checkpoints trip long before the OS
/// kill. Only ever lowers an existing limit. Not undoable.
pub fn apply_rlimits(limits: &ResourceLimits) {
    let cpu = u64::from(limits.max_time).saturating_mul(2).saturating_add(60);
    let space = limits
        .max_space
        .saturating_mul(2)
        .saturating_add(1024 * 1024 * 1024);
    set_rlimit(libc::RLIMIT_CPU as i32, cpu);
    set_rlimit(libc::RLIMIT_AS as i32, space);
    info!(cpu, space, "process rlimits applied");
}

fn set_rlimit(resource: i32, value: u64) {
    unsafe {
        let mut limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        if libc::getrlimit(resource as _, &mut limit) == 0
            && value < limit.rlim_cur
            && value < limit.rlim_max
        {
            limit.rlim_cur = value;
            limit.rlim_max = value;
            libc::setrlimit(resource as _, &limit);
        }
    }
}

/// Undoes the backslash escaping of the version files.
pub fn de_escape(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            None => break,
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some(other) => result.push(other),
        }
    }
    result
}

/// The base snapshot timestamp, or empty when the file is missing.
pub fn base_version(db_dir: &str) -> Result<String> {
    read_version(db_dir, BASE_VERSION_FILE)
}

/// The areas snapshot timestamp, or empty when the file is missing.
pub fn area_version(db_dir: &str) -> Result<String> {
    read_version(db_dir, AREA_VERSION_FILE)
}

fn read_version(db_dir: &str, name: &str) -> Result<String> {
    let path = format!("{db_dir}{name}");
    match raw_file::read_optional("QuerySession::version", &path)? {
        Some(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            Ok(de_escape(text.lines().next().unwrap_or("")))
        }
        None => Ok(String::new()),
    }
}

/// Stages the areas snapshot timestamp for an atomic commit.
pub fn write_area_version_shadow(db_dir: &str, timestamp: &str) -> Result<()> {
    let path = format!("{db_dir}{AREA_VERSION_FILE}.shadow");
    std::fs::write(&path, format!("{timestamp}\n"))
        .map_err(|e| Error::file("QuerySession::write_area_version_shadow", &path, &e))
}

/// Renames the staged areas timestamp onto the primary.
pub fn commit_area_version(db_dir: &str) -> Result<()> {
    raw_file::rename(
        "QuerySession::commit_area_version",
        &format!("{db_dir}{AREA_VERSION_FILE}.shadow"),
        &format!("{db_dir}{AREA_VERSION_FILE}"),
    )
}

pub struct QuerySession {
    client: Option<Box<dyn DispatcherClient>>,
    db_dir: String,
    base_timestamp: String,
    client_token: u32,
    cpu_times: Vec<u64>,
}

impl QuerySession {
    /// Attaches through a dispatcher: apply rlimits, perform the read
    /// handshake, read the base snapshot stamp.
    pub fn attach(
        mut client: Box<dyn DispatcherClient>,
        limits: ResourceLimits,
        client_token: u32,
    ) -> Result<Self> {
        if limits.max_time > 0 {
            apply_rlimits(&limits);
        }

        info!("request_read_and_idx() start");
        if let Err(e) = client.request_read_and_idx(limits.max_time, limits.max_space, client_token)
        {
            // Rate-limit and timeout rejections carry the client identity
            // so the operator can find the offending consumer.
            match &e {
                Error::File { origin, .. }
                    if origin.ends_with("rate_limited") || origin.ends_with("timeout") =>
                {
                    error!(error = %e, client_token, "request_read_and_idx() rejected")
                }
                _ => error!(error = %e, "request_read_and_idx() failed"),
            }
            return Err(e);
        }
        info!("request_read_and_idx() end");

        let db_dir = client.db_dir().to_string();
        let base_timestamp = base_version(&db_dir)?;

        info!("read_idx_finished() start");
        if let Err(e) = client.read_idx_finished() {
            error!(error = %e, "read_idx_finished() failed");
            return Err(e);
        }
        info!("read_idx_finished() end");

        Ok(Self {
            client: Some(client),
            db_dir,
            base_timestamp,
            client_token,
            cpu_times: Vec::new(),
        })
    }

    /// Attaches directly to a database directory with no dispatcher.
    /// Fails when the presence sentinel of a (possibly stale) dispatcher
    /// exists.
    pub fn attach_local(
        db_dir: impl Into<String>,
        limits: ResourceLimits,
        shared_name: &str,
    ) -> Result<Self> {
        let db_dir = db_dir.into();
        if limits.max_time > 0 {
            apply_rlimits(&limits);
        }
        ensure_no_stale_dispatcher(&db_dir, shared_name)?;
        let base_timestamp = base_version(&db_dir)?;
        Ok(Self {
            client: None,
            db_dir,
            base_timestamp,
            client_token: 0,
            cpu_times: Vec::new(),
        })
    }

    pub fn db_dir(&self) -> &str {
        &self.db_dir
    }

    pub fn base_timestamp(&self) -> &str {
        &self.base_timestamp
    }

    /// Records one phase's CPU time for the teardown report.
    pub fn add_cpu_time(&mut self, millis: u64) {
        self.cpu_times.push(millis);
    }

    pub fn ping(&self) -> Result<()> {
        match &self.client {
            Some(client) => client.ping(),
            None => Ok(()),
        }
    }

    /// Starts the areas write phase and stages the version stamp.
    pub fn begin_area_write(&mut self, timestamp: &str) -> Result<()> {
        if let Some(client) = self.client.as_mut() {
            info!("write_start() start");
            client.write_start()?;
            info!("write_start() end");
        }
        write_area_version_shadow(&self.db_dir, timestamp)
    }

    /// Commits the areas write phase: dispatcher commit, then the staged
    /// version stamp is renamed onto the primary.
    pub fn commit_area_write(&mut self) -> Result<()> {
        if let Some(client) = self.client.as_mut() {
            info!("write_commit() start");
            client.write_commit()?;
            info!("write_commit() end");
        }
        commit_area_version(&self.db_dir)
    }

    /// Ends the session. Equivalent to dropping it, but explicit at call
    /// sites that care about ordering.
    pub fn finish(self) {}

    fn teardown(&mut self) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        info!(
            token = self.client_token,
            cpu_times = ?self.cpu_times,
            "read_finished() start"
        );
        match client.read_finished(&self.cpu_times) {
            Ok(()) => info!("read_finished() end"),
            Err(e) => error!(error = %e, "read_finished() failed"),
        }
        self.client = None;
    }
}

impl Drop for QuerySession {
    fn drop(&mut self) {
        self.teardown();
    }
}
