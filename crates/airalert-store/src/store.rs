//! JSON snapshot store.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use airalert_types::AlertState;

use crate::error::{Error, Result};

/// File-backed store for the [`AlertState`] snapshot.
///
/// The whole snapshot is rewritten on every save. Writes go to a temporary
/// sibling file which is then renamed over the real one, so a crash mid-write
/// leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Open the store at `path`, creating it with the default state if it
    /// does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let store = Self { path };
        if !store.path.exists() {
            info!("No state file at {}, creating one", store.path.display());
            store.save(&AlertState::default())?;
        }

        Ok(store)
    }

    /// Open the default state file location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_state_path())
    }

    /// Path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot.
    ///
    /// An empty file or a JSON `null` is treated as the default state.
    pub fn load(&self) -> Result<AlertState> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| Error::Read {
            path: self.path.clone(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(AlertState::default());
        }

        let state: Option<AlertState> =
            serde_json::from_str(&content).map_err(|e| Error::Corrupt {
                path: self.path.clone(),
                source: e,
            })?;
        let state = state.unwrap_or_default();
        debug!("Loaded alert state from {}: {:?}", self.path.display(), state);
        Ok(state)
    }

    /// Overwrite the snapshot.
    pub fn save(&self, state: &AlertState) -> Result<()> {
        let content = serde_json::to_string(state)?;
        let tmp = self.tmp_path();

        std::fs::write(&tmp, content).map_err(|e| Error::Write {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| Error::Write {
            path: self.path.clone(),
            source: e,
        })?;

        debug!("Saved alert state to {}", self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> StateStore {
        StateStore::open(dir.path().join("state.json")).unwrap()
    }

    #[test]
    fn test_open_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = StateStore::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(store.load().unwrap(), AlertState::default());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"was_high\":false"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let state = AlertState {
            was_high: true,
            last_high_aqi: 201.0,
            last_report_time: 1_600_000_000,
            cooldown_until: Some(1_600_000_900),
        };

        store.save(&state).unwrap();

        let reopened = StateStore::open(store.path()).unwrap();
        assert_eq!(reopened.load().unwrap(), state);
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_open_keeps_existing_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"was_high": true, "last_report_time": 12.5}"#).unwrap();

        let state = StateStore::open(&path).unwrap().load().unwrap();
        assert!(state.was_high);
        assert_eq!(state.last_report_time, 12);
    }

    #[test]
    fn test_empty_and_null_files_are_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        for content in ["", "  \n", "null"] {
            std::fs::write(&path, content).unwrap();
            let state = StateStore::open(&path).unwrap().load().unwrap();
            assert_eq!(state, AlertState::default());
        }
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = StateStore::open(&path).unwrap().load().unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
        assert!(err.to_string().contains("state.json"));
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let broken = StateStore {
            path: dir.path().join("gone").join("state.json"),
        };
        assert!(broken.save(&AlertState::default()).is_err());
        assert!(store.save(&AlertState::default()).is_ok());
    }
}
