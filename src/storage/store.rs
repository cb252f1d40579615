use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use tracing::{debug, error, warn};

use super::entities::DomainTimers;

/// File name of the persisted mapping inside the application directory.
pub const STATE_FILE_NAME: &str = "site_timers.json";

/// Interface for abstracting storage of the domain timer mapping.
///
/// Both operations are deliberately infallible for callers: the timer keeps
/// running even when the disk misbehaves, it just stops remembering. Failures
/// are reported through logs only.
#[cfg_attr(test, mockall::automock)]
pub trait TimerStore {
    /// Reads the whole mapping. A missing or unreadable file yields an empty
    /// mapping so a fresh session can still start.
    fn load(&self) -> DomainTimers;

    /// Replaces the whole mapping on disk. On failure the previously stored
    /// state stays untouched.
    fn save(&self, timers: &DomainTimers);
}

/// The main realization of [TimerStore], backed by a single JSON file.
pub struct JsonTimerStore {
    path: PathBuf,
}

impl JsonTimerStore {
    pub fn new(path: PathBuf) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_mapping(&self, timers: &DomainTimers) -> Result<()> {
        let buffer = serde_json::to_vec(timers)?;

        // Write-then-rename so a crash mid-write cannot leave a truncated
        // mapping behind. The pid suffix keeps concurrent watchers from
        // clobbering each other's scratch file.
        let mut scratch_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| STATE_FILE_NAME.into());
        scratch_name.push(format!(".{}.tmp", std::process::id()));
        let scratch = self.path.with_file_name(scratch_name);

        std::fs::write(&scratch, &buffer)?;
        std::fs::rename(&scratch, &self.path)?;
        debug!("Saved {} domain timers to {:?}", timers.len(), self.path);
        Ok(())
    }
}

impl TimerStore for JsonTimerStore {
    fn load(&self) -> DomainTimers {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return DomainTimers::new(),
            Err(e) => {
                warn!("Couldn't read timer state at {:?}: {e}", self.path);
                return DomainTimers::new();
            }
        };

        match serde_json::from_str::<DomainTimers>(&raw) {
            Ok(timers) => timers,
            Err(e) => {
                // Might happen after shutdowns cut a write short, or when
                // something else edited the file. Start over rather than die.
                warn!(
                    "Stored timers at {:?} are not valid JSON, starting empty: {e}",
                    self.path
                );
                DomainTimers::new()
            }
        }
    }

    fn save(&self, timers: &DomainTimers) {
        if let Err(e) = self.write_mapping(timers) {
            error!("Couldn't save timer state to {:?}: {e:#}", self.path);
        }
    }
}


#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::storage::entities::{DomainTimerRecord, DomainTimers};

    use super::{JsonTimerStore, TimerStore, STATE_FILE_NAME};

    fn sample_timers() -> DomainTimers {
        let now = Utc.timestamp_millis_opt(1_530_705_600_000).unwrap();
        let mut timers = DomainTimers::new();
        timers.insert(
            "youtube.com".into(),
            DomainTimerRecord {
                total_time: Duration::milliseconds(42_000),
                session_start: now,
                date: "2018-07-04".to_owned(),
            },
        );
        timers.insert(
            "example.org".into(),
            DomainTimerRecord::fresh(now, "2018-07-04".to_owned()),
        );
        timers
    }

    #[test]
    fn test_missing_file_loads_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonTimerStore::new(dir.path().join(STATE_FILE_NAME))?;
        assert!(store.load().is_empty());
        Ok(())
    }

    #[test]
    fn test_save_then_load_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonTimerStore::new(dir.path().join(STATE_FILE_NAME))?;
        let timers = sample_timers();

        store.save(&timers);
        assert_eq!(store.load(), timers);
        Ok(())
    }

    #[test]
    fn test_save_of_loaded_mapping_is_byte_identical() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(STATE_FILE_NAME);
        let store = JsonTimerStore::new(path.clone())?;

        store.save(&sample_timers());
        let first = std::fs::read(&path)?;

        let reloaded = store.load();
        store.save(&reloaded);
        let second = std::fs::read(&path)?;

        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_corrupt_file_loads_empty_and_recovers() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(STATE_FILE_NAME);
        std::fs::write(&path, b"not json")?;

        let store = JsonTimerStore::new(path)?;
        assert!(store.load().is_empty());

        // The next save replaces the corrupt file with a valid one.
        let timers = sample_timers();
        store.save(&timers);
        assert_eq!(store.load(), timers);
        Ok(())
    }

    #[test]
    fn test_wrong_shape_loads_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(STATE_FILE_NAME);
        std::fs::write(&path, b"[1, 2, 3]")?;

        let store = JsonTimerStore::new(path)?;
        assert!(store.load().is_empty());
        Ok(())
    }

    #[test]
    fn test_new_creates_missing_parent_directories() -> Result<()> {
        let dir = tempdir()?;
        let nested = dir.path().join("deeper").join(STATE_FILE_NAME);
        let store = JsonTimerStore::new(nested)?;

        store.save(&sample_timers());
        assert_eq!(store.load(), sample_timers());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_save_keeps_previous_state() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let path = dir.path().join(STATE_FILE_NAME);
        let store = JsonTimerStore::new(path.clone())?;

        let timers = sample_timers();
        store.save(&timers);

        let mut readonly = std::fs::metadata(dir.path())?.permissions();
        readonly.set_mode(0o555);
        std::fs::set_permissions(dir.path(), readonly)?;

        let mut changed = timers.clone();
        changed.remove("youtube.com");
        store.save(&changed);

        let mut writable = std::fs::metadata(dir.path())?.permissions();
        writable.set_mode(0o755);
        std::fs::set_permissions(dir.path(), writable)?;

        assert_eq!(store.load(), timers);
        Ok(())
    }
}
