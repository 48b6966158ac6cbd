//! Durable snapshot storage for the last completed analysis.
//!
//! One JSON document under a fixed key, best-effort in both directions:
//! write failures are logged and swallowed, and anything unreadable on
//! load is treated as absent. The session never depends on persistence
//! for correctness.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use shared::types::SessionSnapshot;
use tracing::{debug, warn};

/// Load/save/clear contract for the one persisted snapshot.
pub trait SnapshotStore: Send {
    fn save(&self, snapshot: &SessionSnapshot);
    fn load(&self) -> Option<SessionSnapshot>;
    fn clear(&self);
}

/// Snapshot stored as a JSON file, overwritten on every save.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Store under the platform data directory.
    pub fn new() -> Self {
        let path = directories::ProjectDirs::from("com.local", "Billwatch", "Billwatch")
            .map(|dirs| dirs.data_dir().join("last_analysis.json"))
            .unwrap_or_else(|| PathBuf::from("./last_analysis.json"));
        Self { path }
    }

    /// Store at an explicit path.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileSnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: &SessionSnapshot) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "could not create snapshot directory");
                return;
            }
        }
        match serde_json::to_string_pretty(snapshot) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %e, "snapshot write failed");
                }
            }
            Err(e) => warn!(error = %e, "snapshot serialization failed"),
        }
    }

    fn load(&self) -> Option<SessionSnapshot> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable snapshot");
                None
            }
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "snapshot cleared"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "snapshot removal failed"),
        }
    }
}

/// In-memory store. Goes through the same JSON round trip as the file
/// store so tests exercise the real serialization path.
#[derive(Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put raw text in the slot, bypassing serialization. Lets tests
    /// stage corrupt storage.
    pub fn set_raw(&self, raw: impl Into<String>) {
        *self.slot.lock() = Some(raw.into());
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, snapshot: &SessionSnapshot) {
        match serde_json::to_string(snapshot) {
            Ok(json) => *self.slot.lock() = Some(json),
            Err(e) => warn!(error = %e, "snapshot serialization failed"),
        }
    }

    fn load(&self) -> Option<SessionSnapshot> {
        let slot = self.slot.lock();
        let content = slot.as_deref()?;
        match serde_json::from_str(content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "discarding unreadable snapshot");
                None
            }
        }
    }

    fn clear(&self) {
        *self.slot.lock() = None;
    }
}

/// Persistence disabled. `load` never yields anything; the session
/// behaves identically apart from no restoration at startup.
pub struct NullSnapshotStore;

impl SnapshotStore for NullSnapshotStore {
    fn save(&self, _snapshot: &SessionSnapshot) {}

    fn load(&self) -> Option<SessionSnapshot> {
        None
    }

    fn clear(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::types::{AnalysisResult, AnalysisSummary, ChatMessage, Role};

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            file_name: "bills.csv".into(),
            result: AnalysisResult {
                filename: "bills.csv".into(),
                timestamp: Utc::now(),
                summary: AnalysisSummary::SpikeCounts {
                    total_consumers: 12,
                    spike_count: 3,
                    consumers_with_spikes: 2,
                    residential_count: 9,
                },
                anomalies: vec![],
                narrative: Some("Three spikes stand out.".into()),
            },
            transcript: vec![
                ChatMessage {
                    role: Role::Assistant,
                    text: "Three spikes stand out.".into(),
                    sequence: 0,
                },
                ChatMessage {
                    role: Role::User,
                    text: "Which consumers?".into(),
                    sequence: 1,
                },
            ],
            area_name: None,
        }
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::at_path(dir.path().join("snap.json"));

        assert!(store.load().is_none());

        let snap = snapshot();
        store.save(&snap);
        assert_eq!(store.load().unwrap(), snap);

        store.clear();
        assert!(store.load().is_none());
        // Clearing twice is fine.
        store.clear();
    }

    #[test]
    fn test_file_store_overwrites_prior_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::at_path(dir.path().join("snap.json"));

        let mut snap = snapshot();
        store.save(&snap);
        snap.file_name = "second.xlsx".into();
        store.save(&snap);

        assert_eq!(store.load().unwrap().file_name, "second.xlsx");
    }

    #[test]
    fn test_corrupt_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        fs::write(&path, "{not json at all").unwrap();

        let store = FileSnapshotStore::at_path(&path);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_file_store_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::at_path(dir.path().join("a/b/snap.json"));
        store.save(&snapshot());
        assert!(store.load().is_some());
    }

    #[test]
    fn test_memory_store_round_trip_and_corruption() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().is_none());

        let snap = snapshot();
        store.save(&snap);
        assert_eq!(store.load().unwrap(), snap);

        store.set_raw("]]]");
        assert!(store.load().is_none());

        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_null_store_never_yields() {
        let store = NullSnapshotStore;
        store.save(&snapshot());
        assert!(store.load().is_none());
    }
}
