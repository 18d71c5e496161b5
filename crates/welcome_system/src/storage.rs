//! Welcomed-player ledger storage

use crate::error::{StorageError, StorageResult};
use crate::types::ActorId;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::{fs as tokio_fs, io::AsyncWriteExt};
use tracing::{debug, info, instrument};

/// The durable part of the player state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub unique_join_count: u64,
    pub welcomed_players: Vec<ActorId>,
}

/// Ledger storage trait
#[async_trait]
pub trait LedgerStorage: Send + Sync + std::fmt::Debug {
    /// Load the ledger, or an empty one if nothing was saved yet
    async fn load(&self) -> StorageResult<LedgerSnapshot>;

    /// Replace the stored ledger
    async fn save(&self, snapshot: &LedgerSnapshot) -> StorageResult<()>;
}

/// JSON-file ledger storage
#[derive(Debug)]
pub struct JsonLedgerStorage {
    path: PathBuf,
}

impl JsonLedgerStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent_dir(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio_fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError::DirectoryCreate(parent.to_path_buf(), e))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStorage for JsonLedgerStorage {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> StorageResult<LedgerSnapshot> {
        let contents = match tokio_fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No ledger file yet, starting empty");
                return Ok(LedgerSnapshot::default());
            }
            Err(e) => return Err(StorageError::FileRead(self.path.clone(), e)),
        };

        serde_json::from_str(&contents)
            .map_err(|e| StorageError::Deserialization(self.path.clone(), e))
    }

    #[instrument(skip(self, snapshot), fields(path = %self.path.display()))]
    async fn save(&self, snapshot: &LedgerSnapshot) -> StorageResult<()> {
        self.ensure_parent_dir().await?;
        let temp_path = self.path.with_extension("tmp");

        let json = serde_json::to_string_pretty(snapshot).map_err(StorageError::Serialization)?;

        let mut file = tokio_fs::File::create(&temp_path)
            .await
            .map_err(|e| StorageError::FileCreate(temp_path.clone(), e))?;

        file.write_all(json.as_bytes())
            .await
            .map_err(|e| StorageError::FileWrite(temp_path.clone(), e))?;

        file.sync_all()
            .await
            .map_err(|e| StorageError::FileSync(temp_path.clone(), e))?;
        drop(file);

        // Atomic rename
        tokio_fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StorageError::FileRename(temp_path, self.path.clone(), e))?;

        debug!(
            "Saved ledger ({} welcomed, {} unique joins)",
            snapshot.welcomed_players.len(),
            snapshot.unique_join_count
        );
        Ok(())
    }
}

/// In-memory storage for tests and ephemeral servers.
#[derive(Debug, Default)]
pub struct MemoryLedgerStorage {
    saved: Mutex<Option<LedgerSnapshot>>,
    saves: Mutex<usize>,
}

impl MemoryLedgerStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last snapshot written, if any.
    pub fn saved(&self) -> Option<LedgerSnapshot> {
        self.saved.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl LedgerStorage for MemoryLedgerStorage {
    async fn load(&self) -> StorageResult<LedgerSnapshot> {
        Ok(self.saved.lock().clone().unwrap_or_default())
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> StorageResult<()> {
        *self.saved.lock() = Some(snapshot.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

/// Loads the ledger at startup. A missing file is an empty ledger; a corrupt
/// one is an error the caller must decide on.
pub async fn load_ledger(storage: &dyn LedgerStorage) -> StorageResult<LedgerSnapshot> {
    let snapshot = storage.load().await?;
    info!(
        "📂 Loaded ledger: {} welcomed players, {} unique joins",
        snapshot.welcomed_players.len(),
        snapshot.unique_join_count
    );
    Ok(snapshot)
}
