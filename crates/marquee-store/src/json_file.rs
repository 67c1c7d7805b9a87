use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use crate::document::{validate_collection, Document, DocumentPath, Query, WriteOp};
use crate::error::StoreError;
use crate::memory::StoreState;
use crate::traits::DocumentStore;

/// Store persisted as a single JSON file
///
/// Every committed batch rewrites the file through a temporary sibling and a
/// rename, so a crash mid-write leaves the previous contents in place. The
/// in-memory state is only replaced once the file write succeeded.
pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty when the file does not exist
    ///
    /// A file that cannot be parsed is copied to `<path>.bak` and the store
    /// starts empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = Self::load_state(&path).await?;
        info!(
            "Opened JSON store at {:?} ({} documents)",
            path,
            state.document_count()
        );
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_state(path: &Path) -> Result<StoreState, StoreError> {
        if !tokio::fs::try_exists(path).await? {
            debug!("Store file {:?} does not exist, starting empty", path);
            return Ok(StoreState::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(StoreState::default());
        }

        match serde_json::from_str::<StoreState>(&content) {
            Ok(state) => Ok(state),
            Err(e) => {
                let backup_path = path.with_extension("json.bak");
                if let Err(backup_err) = tokio::fs::copy(path, &backup_path).await {
                    warn!(
                        "Failed to backup unreadable store file: {}. Starting with empty store.",
                        backup_err
                    );
                } else {
                    warn!(
                        "Store file unreadable (error: {}). Backed up to {:?} and starting with empty store.",
                        e, backup_path
                    );
                }
                Ok(StoreState::default())
            }
        }
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_vec_pretty(state)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    fn backend_name(&self) -> &str {
        "json_file"
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        path.validate()?;
        Ok(self.state.read().await.get(path))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        validate_collection(&query.collection)?;
        Ok(self.state.read().await.query(query))
    }

    async fn commit(&self, batch: Vec<WriteOp>) -> Result<(), StoreError> {
        let size = batch.len();
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        next.apply_batch(batch)?;
        self.persist(&next).await?;
        *guard = next;
        debug!("json store commit: {} operations written to {:?}", size, self.path);
        Ok(())
    }
}
