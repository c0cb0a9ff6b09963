//! JSON file state store with an optional remote mirror

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vote_herald_domain::{PublicationState, StateError, StateMirror, StateStore};

/// State persisted as one JSON object `{"<vote id>": "<status>"}` per
/// legislature, each in its own file next to the configured path.
pub struct FileStateStore {
    path: PathBuf,
    mirror: Option<Arc<dyn StateMirror>>,
}

impl FileStateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            mirror: None,
        }
    }

    /// Mirror every commit to `mirror`, and read it back on load
    pub fn with_mirror(mut self, mirror: Arc<dyn StateMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// File holding the state of `legislature`: `state.json` becomes `state.XVI.json`
    pub fn path_for(&self, legislature: &str) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state".to_string());

        let file_name = match self.path.extension() {
            Some(ext) => format!("{}.{}.{}", stem, legislature, ext.to_string_lossy()),
            None => format!("{}.{}", stem, legislature),
        };

        self.path.with_file_name(file_name)
    }

    async fn read_local(&self, path: &Path) -> Option<PublicationState> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No state file, starting empty");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read state file, starting empty");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt state file, starting empty");
                None
            }
        }
    }

    async fn write_local(&self, path: &Path, state: &PublicationState) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string(state)
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        // Write next to the target and rename so a crash never leaves half a file
        let mut tmp_path = path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, path).await?;

        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self, legislature: &str) -> PublicationState {
        let local = self.read_local(&self.path_for(legislature)).await;

        let remote = match &self.mirror {
            Some(mirror) => match mirror.fetch(legislature).await {
                Ok(remote) => remote,
                Err(e) => {
                    tracing::warn!(legislature = %legislature, error = %e, "State mirror unavailable, using local state only");
                    None
                }
            },
            None => None,
        };

        match (local, remote) {
            (Some(mut local), Some(remote)) => {
                local.merge_missing(remote);
                local
            }
            (Some(local), None) => local,
            (None, Some(remote)) => {
                tracing::info!(votes = remote.len(), "Restored state from mirror");
                remote
            }
            (None, None) => PublicationState::new(),
        }
    }

    async fn commit(&self, legislature: &str, state: &PublicationState) -> Result<(), StateError> {
        let path = self.path_for(legislature);
        self.write_local(&path, state).await?;
        tracing::debug!(path = %path.display(), votes = state.len(), "Wrote state file");

        if let Some(mirror) = &self.mirror {
            mirror.store(legislature, state).await?;
            tracing::debug!(legislature = %legislature, "Mirrored state");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_memory::InMemoryStateStore;
    use tempfile::TempDir;
    use vote_herald_domain::VoteStatus;

    struct FailingMirror;

    #[async_trait]
    impl StateMirror for FailingMirror {
        async fn fetch(&self, _legislature: &str) -> Result<Option<PublicationState>, StateError> {
            Err(StateError::Mirror("unreachable".to_string()))
        }

        async fn store(
            &self,
            _legislature: &str,
            _state: &PublicationState,
        ) -> Result<(), StateError> {
            Err(StateError::Mirror("403 Forbidden".to_string()))
        }
    }

    fn sample_state() -> PublicationState {
        let mut state = PublicationState::new();
        state.mark_published("1");
        state.mark_errored("2");
        state
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileStateStore::new(dir.path().join("state.json"));

        assert!(store.load("XVI").await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("state.XVI.json"), "{not json").expect("write");

        let store = FileStateStore::new(dir.path().join("state.json"));

        assert!(store.load("XVI").await.is_empty());
    }

    #[test]
    fn test_path_for_inserts_legislature() {
        let store = FileStateStore::new("/var/lib/votes/state.json");
        assert_eq!(
            store.path_for("XVI"),
            PathBuf::from("/var/lib/votes/state.XVI.json")
        );

        let store = FileStateStore::new("votes");
        assert_eq!(store.path_for("XV"), PathBuf::from("votes.XV"));
    }

    #[tokio::test]
    async fn test_commit_writes_flat_json() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileStateStore::new(dir.path().join("nested").join("state.json"));

        store.commit("XVI", &sample_state()).await.unwrap();

        let path = dir.path().join("nested").join("state.XVI.json");
        let content = std::fs::read_to_string(&path).expect("read state");
        let value: serde_json::Value = serde_json::from_str(&content).expect("valid json");
        assert_eq!(
            value,
            serde_json::json!({"1": "published", "2": "errored"})
        );
        assert!(!dir.path().join("nested").join("state.XVI.json.tmp").exists());

        assert_eq!(store.load("XVI").await, sample_state());
    }

    #[tokio::test]
    async fn test_legislatures_do_not_share_state() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileStateStore::new(dir.path().join("state.json"));

        let mut xvi = PublicationState::new();
        xvi.mark_published("xvi-1");
        store.commit("XVI", &xvi).await.unwrap();

        // A mark-all run on XV replaces the whole XV mapping
        let mut xv = store.load("XV").await;
        xv.clear();
        xv.mark_published("xv-1");
        store.commit("XV", &xv).await.unwrap();

        let xvi_loaded = store.load("XVI").await;
        assert_eq!(xvi_loaded.status("xvi-1"), Some(VoteStatus::Published));
        assert!(xvi_loaded.is_new("xv-1"));
        assert_eq!(store.load("XV").await.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_mirrors_after_local_write() {
        let dir = TempDir::new().expect("temp dir");
        let mirror = Arc::new(InMemoryStateStore::new());
        let store = FileStateStore::new(dir.path().join("state.json")).with_mirror(mirror.clone());

        store.commit("XVI", &sample_state()).await.unwrap();

        assert!(dir.path().join("state.XVI.json").exists());
        assert_eq!(mirror.get("XVI"), Some(sample_state()));
        assert!(mirror.get("XV").is_none());
    }

    #[tokio::test]
    async fn test_mirror_failure_is_fatal_but_local_file_is_written() {
        let dir = TempDir::new().expect("temp dir");
        let store =
            FileStateStore::new(dir.path().join("state.json")).with_mirror(Arc::new(FailingMirror));

        let result = store.commit("XVI", &sample_state()).await;

        assert!(matches!(result, Err(StateError::Mirror(_))));
        assert!(dir.path().join("state.XVI.json").exists());
    }

    #[tokio::test]
    async fn test_load_restores_from_mirror_when_local_missing() {
        let dir = TempDir::new().expect("temp dir");
        let mirror = Arc::new(InMemoryStateStore::with_state("XVI", sample_state()));
        let store = FileStateStore::new(dir.path().join("state.json")).with_mirror(mirror);

        assert_eq!(store.load("XVI").await, sample_state());
    }

    #[tokio::test]
    async fn test_load_merges_local_over_mirror() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(
            dir.path().join("state.XVI.json"),
            r#"{"2": "published", "3": "skipped"}"#,
        )
        .expect("write");

        let mirror = Arc::new(InMemoryStateStore::with_state("XVI", sample_state()));
        let store = FileStateStore::new(dir.path().join("state.json")).with_mirror(mirror);

        let state = store.load("XVI").await;

        assert_eq!(state.status("1"), Some(VoteStatus::Published));
        assert_eq!(state.status("2"), Some(VoteStatus::Published));
        assert_eq!(state.status("3"), Some(VoteStatus::Skipped));
    }

    #[tokio::test]
    async fn test_unreachable_mirror_loads_local_state() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("state.XVI.json"), r#"{"5": "published"}"#).expect("write");

        let store =
            FileStateStore::new(dir.path().join("state.json")).with_mirror(Arc::new(FailingMirror));

        assert_eq!(store.load("XVI").await.len(), 1);
    }
}
