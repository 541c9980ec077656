//! # Job Store
//!
//! Reads and writes `.elj` job files through an explicitly constructed
//! [`JobStore`] handle:
//! - **Atomic saves**: write `.elj.tmp`, fsync, rename over the job file
//! - **Advisory locking**: OS lock via `fs2` plus a `.elj.lock` sidecar
//!   naming who holds it
//! - **Version validation**: refuse files written by an incompatible schema
//!
//! ## Example
//!
//! ```rust,no_run
//! use elec_core::job::Job;
//! use elec_core::store::JobStore;
//!
//! let mut store = JobStore::new("harbor.elj");
//! store.lock("j.sparks")?;
//!
//! let job = Job::new("J. Sparks", "24-117", "Harbor Homes");
//! store.save(&job)?;
//!
//! let loaded = store.load()?;
//! assert_eq!(loaded.meta.job_number, "24-117");
//! # Ok::<(), elec_core::errors::CalcError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::job::{Job, SCHEMA_VERSION};

/// File extension for job files
pub const JOB_EXTENSION: &str = "elj";

/// Locks older than this are considered abandoned
const LOCK_MAX_AGE_HOURS: i64 = 24;

/// Contents of a `.lock` sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub user_id: String,
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// A lock is stale once its process is gone (same machine) or it is
    /// more than a day old.
    pub fn is_stale(&self) -> bool {
        if hostname().as_deref() == Some(self.machine.as_str()) && !process_alive(self.pid) {
            return true;
        }
        Utc::now() - self.locked_at > Duration::hours(LOCK_MAX_AGE_HOURS)
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
            .or_else(|| {
                fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty())
            })
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists() || !Path::new("/proc/self").exists()
}

#[cfg(windows)]
fn process_alive(pid: u32) -> bool {
    use std::process::Command;
    Command::new("tasklist")
        .args(["/FI", &format!("PID eq {}", pid), "/NH"])
        .output()
        .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
        .unwrap_or(true)
}

#[cfg(not(any(unix, windows)))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Held advisory lock; the sidecar is removed on drop.
#[derive(Debug)]
pub struct FileLock {
    lock_path: PathBuf,
    // keeps the OS lock alive
    _file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on a job file.
    ///
    /// # Errors
    ///
    /// * `FileLocked` - a live lock is held by someone else
    /// * `FileError` - the sidecar could not be written
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> CalcResult<Self> {
        if let Some(existing) = FileLock::check(path) {
            return Err(CalcError::file_locked(
                path.display().to_string(),
                format!("{} ({})", existing.user_id, existing.machine),
                existing.locked_at.to_rfc3339(),
            ));
        }

        let lock_path = sidecar_path(path, "lock");
        let info = LockInfo::new(user_id);

        // Not truncated until the lock is ours
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| io_error("create lock", &lock_path, e))?;

        file.try_lock_exclusive().map_err(|_| {
            CalcError::file_locked(path.display().to_string(), "another process", "unknown")
        })?;

        let json = serde_json::to_string_pretty(&info).map_err(CalcError::serialization)?;
        file.set_len(0)
            .and_then(|_| file.write_all(json.as_bytes()))
            .and_then(|_| file.sync_all())
            .map_err(|e| io_error("write lock", &lock_path, e))?;

        tracing::info!(path = %path.display(), user = %info.user_id, "job lock acquired");
        Ok(FileLock {
            lock_path,
            _file: file,
            info,
        })
    }

    /// Live lock holder of a job file, if any.
    pub fn check(path: &Path) -> Option<LockInfo> {
        let contents = fs::read_to_string(sidecar_path(path, "lock")).ok()?;
        let info: LockInfo = serde_json::from_str(&contents).ok()?;
        if info.is_stale() {
            tracing::debug!(path = %path.display(), holder = %info.user_id, "ignoring stale lock");
            None
        } else {
            Some(info)
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// Handle to one job file.
#[derive(Debug)]
pub struct JobStore {
    path: PathBuf,
    lock: Option<FileLock>,
}

impl JobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JobStore {
            path: path.into(),
            lock: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Take the advisory lock for this store. Re-locking is a no-op.
    pub fn lock(&mut self, user_id: impl Into<String>) -> CalcResult<&LockInfo> {
        let lock = match self.lock.take() {
            Some(lock) => lock,
            None => FileLock::acquire(&self.path, user_id)?,
        };
        Ok(&self.lock.insert(lock).info)
    }

    pub fn unlock(&mut self) {
        if self.lock.take().is_some() {
            tracing::info!(path = %self.path.display(), "job lock released");
        }
    }

    pub fn is_locked_by_us(&self) -> bool {
        self.lock.is_some()
    }

    /// Lock held by someone other than this handle
    pub fn foreign_lock(&self) -> Option<LockInfo> {
        if self.lock.is_some() {
            return None;
        }
        FileLock::check(&self.path)
    }

    /// Save with atomic write semantics.
    ///
    /// Refused with `FileLocked` when another user holds a live lock.
    pub fn save(&self, job: &Job) -> CalcResult<()> {
        if let Some(holder) = self.foreign_lock() {
            return Err(CalcError::file_locked(
                self.path.display().to_string(),
                format!("{} ({})", holder.user_id, holder.machine),
                holder.locked_at.to_rfc3339(),
            ));
        }

        let json = serde_json::to_string_pretty(job).map_err(CalcError::serialization)?;
        let tmp_path = sidecar_path(&self.path, "tmp");

        let write = || -> std::io::Result<()> {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(json.as_bytes())?;
            tmp.sync_all()
        };
        write().map_err(|e| io_error("write temp file", &tmp_path, e))?;

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            io_error("rename to final", &self.path, e)
        })?;

        tracing::info!(
            path = %self.path.display(),
            job = %job.meta.job_number,
            records = job.record_count(),
            "job saved"
        );
        Ok(())
    }

    /// Load and check the schema version.
    pub fn load(&self) -> CalcResult<Job> {
        let contents =
            fs::read_to_string(&self.path).map_err(|e| io_error("read", &self.path, e))?;
        let job: Job = serde_json::from_str(&contents).map_err(|e| {
            CalcError::serialization(format!("Invalid job file {}: {}", self.path.display(), e))
        })?;
        validate_version(&job.meta.version)?;

        tracing::info!(
            path = %self.path.display(),
            job = %job.meta.job_number,
            records = job.record_count(),
            "job loaded"
        );
        Ok(job)
    }
}

/// `job.elj` -> `job.elj.<suffix>`
fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut sidecar = path.to_path_buf();
    let extension = path
        .extension()
        .map(|e| format!("{}.{}", e.to_string_lossy(), suffix))
        .unwrap_or_else(|| suffix.to_string());
    sidecar.set_extension(extension);
    sidecar
}

fn io_error(operation: &str, path: &Path, e: std::io::Error) -> CalcError {
    CalcError::file_error(operation, path.display().to_string(), e.to_string())
}

/// Same major version; on 0.x the file's minor may not be newer than ours.
fn validate_version(file_version: &str) -> CalcResult<()> {
    let parse = |v: &str| -> Option<(u32, u32)> {
        let mut parts = v.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map_or(Some(0), |p| p.parse().ok())?;
        Some((major, minor))
    };
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let (file_major, file_minor) = parse(file_version).ok_or_else(mismatch)?;
    let (major, minor) = parse(SCHEMA_VERSION).ok_or_else(mismatch)?;
    if file_major != major || (major == 0 && file_minor > minor) {
        return Err(mismatch());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::BoxDescriptor;
    use crate::categories::{BoxType, ConductorType};
    use crate::code_tables::CodeTables;
    use crate::gauge::Gauge;
    use crate::job::{Association, BoxFillRecord, WireRecord};
    use tempfile::TempDir;

    fn job_path(dir: &TempDir) -> PathBuf {
        dir.path().join(format!("test.{}", JOB_EXTENSION))
    }

    #[test]
    fn test_sidecar_paths() {
        let path = Path::new("/jobs/harbor.elj");
        assert_eq!(sidecar_path(path, "lock"), Path::new("/jobs/harbor.elj.lock"));
        assert_eq!(sidecar_path(path, "tmp"), Path::new("/jobs/harbor.elj.tmp"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = JobStore::new(job_path(&dir));

        let mut job = Job::new("Test Owner", "TEST-001", "Test Client");
        let wire = job.add_wire(WireRecord::new(ConductorType::Wire, Gauge::parse("12").unwrap()));
        let id = job
            .add_box_fill(BoxFillRecord::new(
                "B-1",
                BoxDescriptor::standard(BoxType::Square, "4x4x1.5"),
                vec![Association::new(wire, 4)],
            ))
            .unwrap();
        job.recalculate_box_fill(&id, CodeTables::nec_2023()).unwrap();
        store.save(&job).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.meta.job_number, "TEST-001");
        let record = &loaded.box_fills[&id];
        assert_eq!(record.result, job.box_fills[&id].result);
        assert_eq!(record.wires[0].id, wire);
    }

    #[test]
    fn test_atomic_save_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let path = job_path(&dir);
        let store = JobStore::new(&path);
        store.save(&Job::new("Test", "TEST", "Client")).unwrap();

        assert!(path.exists());
        assert!(!sidecar_path(&path, "tmp").exists());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = JobStore::new(job_path(&dir)).load().unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = job_path(&dir);
        fs::write(&path, "{ not json").unwrap();
        let err = JobStore::new(&path).load().unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_load_rejects_newer_schema() {
        let dir = TempDir::new().unwrap();
        let path = job_path(&dir);
        let store = JobStore::new(&path);
        let mut job = Job::new("Test", "TEST", "Client");
        job.meta.version = "0.9.0".to_string();
        store.save(&job).unwrap();

        assert_eq!(store.load().unwrap_err().error_code(), "VERSION_MISMATCH");
    }

    #[test]
    fn test_lock_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let path = job_path(&dir);
        let mut store = JobStore::new(&path);

        let info = store.lock("test@example.com").unwrap().clone();
        assert_eq!(info.user_id, "test@example.com");
        assert!(info.pid > 0);
        assert!(sidecar_path(&path, "lock").exists());
        assert!(store.is_locked_by_us());
        assert!(store.foreign_lock().is_none());

        // A second handle sees the lock and cannot save
        let other = JobStore::new(&path);
        assert!(other.foreign_lock().is_some());
        let err = other.save(&Job::default()).unwrap_err();
        assert_eq!(err.error_code(), "FILE_LOCKED");
        assert!(err.is_recoverable());

        // Our handle can
        store.save(&Job::default()).unwrap();

        store.unlock();
        assert!(!sidecar_path(&path, "lock").exists());
        assert!(other.foreign_lock().is_none());
    }

    #[test]
    fn test_stale_lock_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = job_path(&dir);
        let mut info = LockInfo::new("someone@else");
        info.locked_at = Utc::now() - Duration::hours(48);
        fs::write(sidecar_path(&path, "lock"), serde_json::to_string(&info).unwrap()).unwrap();

        assert!(FileLock::check(&path).is_none());
        let mut store = JobStore::new(&path);
        assert!(store.lock("me").is_ok());
    }

    #[test]
    fn test_held_lock_keeps_holder_info() {
        let dir = TempDir::new().unwrap();
        let path = job_path(&dir);
        let lock_path = sidecar_path(&path, "lock");

        // Info that looks stale, but the holder still has the file locked
        let mut info = LockInfo::new("slow@holder");
        info.locked_at = Utc::now() - Duration::hours(48);
        let contents = serde_json::to_string(&info).unwrap();
        fs::write(&lock_path, &contents).unwrap();
        let held = OpenOptions::new().read(true).write(true).open(&lock_path).unwrap();
        held.lock_exclusive().unwrap();

        let err = FileLock::acquire(&path, "me").unwrap_err();
        assert_eq!(err.error_code(), "FILE_LOCKED");
        assert_eq!(fs::read_to_string(&lock_path).unwrap(), contents);

        drop(held);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.7").is_ok());
        assert!(validate_version("0.0.3").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("garbage").is_err());
    }
}
