//! Background ledger writer.
//!
//! Callers never wait for disk. They request a save through a
//! [`SaveRequester`]; the writer task wakes up, takes a fresh snapshot of the
//! store and writes it. Requests that arrive while a write is in flight
//! collapse into one follow-up write, and since every write snapshots the
//! store at write time the file always converges on the latest state.

use crate::error::{StorageError, StorageResult};
use crate::state::PlayerStateStore;
use crate::storage::LedgerStorage;
use std::sync::Arc;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Cheap handle for asking the writer to persist the current state.
#[derive(Debug, Clone)]
pub struct SaveRequester {
    notify: Arc<Notify>,
}

impl SaveRequester {
    /// Fire-and-forget save request.
    pub fn request_save(&self) {
        self.notify.notify_one();
    }
}

/// Owns the writer task. Call [`LedgerWriter::shutdown`] to perform the final
/// save; dropping the writer aborts it without saving.
#[derive(Debug)]
pub struct LedgerWriter {
    requester: SaveRequester,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<StorageResult<()>>>,
}

impl LedgerWriter {
    pub fn spawn(store: Arc<PlayerStateStore>, storage: Arc<dyn LedgerStorage>) -> Self {
        let notify = Arc::new(Notify::new());
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let wakeups = notify.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = wakeups.notified() => {
                        if let Err(e) = storage.save(&store.snapshot()).await {
                            error!("Failed to save welcomed-player ledger: {}", e);
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }

            storage.save(&store.snapshot()).await
        });

        Self {
            requester: SaveRequester { notify },
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn requester(&self) -> SaveRequester {
        self.requester.clone()
    }

    pub fn request_save(&self) {
        self.requester.request_save();
    }

    /// Stops the writer after one last, awaited save of the current state.
    pub async fn shutdown(mut self) -> StorageResult<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        task.await
            .map_err(|e| StorageError::WriterStopped(e.to_string()))??;
        info!("💾 Welcomed-player ledger saved");
        Ok(())
    }
}

impl Drop for LedgerWriter {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LedgerSnapshot, MemoryLedgerStorage};
    use std::time::Duration;
    use uuid::Uuid;

    fn store() -> Arc<PlayerStateStore> {
        Arc::new(PlayerStateStore::new(Arc::new(Duration::from_secs(60))))
    }

    #[tokio::test]
    async fn test_request_save_writes_latest_state() {
        let store = store();
        let storage = Arc::new(MemoryLedgerStorage::new());
        let writer = LedgerWriter::spawn(store.clone(), storage.clone());

        let id = Uuid::new_v4();
        store.mark_welcomed(id);
        writer.request_save();

        for _ in 0..100 {
            if storage.saved().is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(
            storage.saved(),
            Some(LedgerSnapshot {
                unique_join_count: 1,
                welcomed_players: vec![id],
            })
        );

        writer.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_performs_final_save() {
        let store = store();
        let storage = Arc::new(MemoryLedgerStorage::new());
        let writer = LedgerWriter::spawn(store.clone(), storage.clone());

        for _ in 0..5 {
            store.mark_welcomed(Uuid::new_v4());
        }
        writer.shutdown().await.unwrap();

        let saved = storage.saved().unwrap();
        assert_eq!(saved.unique_join_count, 5);
        assert_eq!(saved.welcomed_players.len(), 5);
    }
}
