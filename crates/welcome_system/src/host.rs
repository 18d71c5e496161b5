//! Host integration and the primary execution context.
//!
//! Everything a player can see (broadcasts, direct messages, console
//! commands) must run in one serial context on the host. [`PrimaryContext`]
//! models that context as a single consumer task fed over a channel; the rest
//! of the system runs on the Tokio worker pool and hands host work over.

use crate::types::Actor;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Host-side effects. Implementations may assume they are only ever called
/// from the primary context, one call at a time.
pub trait Host: Send + Sync {
    /// Sends a message to every online player.
    fn broadcast(&self, message: &str);

    /// Sends a message to a single player.
    fn send_message(&self, actor: &Actor, message: &str);

    /// Executes a console command, returning whether the host accepted it.
    fn dispatch_command(&self, command: &str) -> bool;
}

type PrimaryJob = Box<dyn FnOnce(&dyn Host) + Send>;

/// Cloneable handle for scheduling work on the primary context.
#[derive(Clone)]
pub struct PrimaryContext {
    jobs: mpsc::UnboundedSender<PrimaryJob>,
}

impl PrimaryContext {
    /// Starts the primary context loop for `host`. The loop ends once every
    /// handle has been dropped. A job that panics is logged and skipped; any
    /// caller waiting on it sees `None`.
    pub fn spawn(host: Arc<dyn Host>) -> (Self, JoinHandle<()>) {
        let (jobs, mut rx) = mpsc::unbounded_channel::<PrimaryJob>();

        let task = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if catch_unwind(AssertUnwindSafe(|| job(host.as_ref()))).is_err() {
                    error!("❌ Host task panicked on the primary context");
                }
            }
            debug!("Primary context closed");
        });

        (Self { jobs }, task)
    }

    /// Schedules `job` without waiting for it. Returns false if the context
    /// has already shut down.
    pub fn run<F>(&self, job: F) -> bool
    where
        F: FnOnce(&dyn Host) + Send + 'static,
    {
        if self.jobs.send(Box::new(job)).is_err() {
            warn!("Primary context is closed; dropping host task");
            return false;
        }
        true
    }

    /// Runs `job` on the primary context and waits for its result.
    pub async fn call<F, R>(&self, job: F) -> Option<R>
    where
        F: FnOnce(&dyn Host) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let scheduled = self.run(move |host| {
            let _ = tx.send(job(host));
        });
        if !scheduled {
            return None;
        }
        rx.await.ok()
    }

    pub fn broadcast(&self, message: String) {
        self.run(move |host| host.broadcast(&message));
    }

    pub fn send_message(&self, actor: &Actor, message: String) {
        let actor = actor.clone();
        self.run(move |host| host.send_message(&actor, &message));
    }

    /// Executes a console command on the primary context.
    pub async fn dispatch_command(&self, command: String) -> bool {
        self.call(move |host| host.dispatch_command(&command))
            .await
            .unwrap_or(false)
    }

    /// Waits until every job scheduled before this call has run.
    pub async fn flush(&self) {
        let _ = self.call(|_| ()).await;
    }
}

impl std::fmt::Debug for PrimaryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimaryContext")
            .field("closed", &self.jobs.is_closed())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingHost;
    use super::*;

    #[tokio::test]
    async fn test_jobs_run_in_order() {
        let host = Arc::new(RecordingHost::default());
        let (primary, _task) = PrimaryContext::spawn(host.clone());

        for i in 0..10 {
            primary.broadcast(format!("line {i}"));
        }
        primary.flush().await;

        let broadcasts = host.broadcasts.lock();
        assert_eq!(broadcasts.len(), 10);
        assert_eq!(broadcasts[0], "line 0");
        assert_eq!(broadcasts[9], "line 9");
    }

    #[tokio::test]
    async fn test_dispatch_command_returns_host_result() {
        let host = Arc::new(RecordingHost {
            reject_commands: true,
            ..Default::default()
        });
        let (primary, _task) = PrimaryContext::spawn(host.clone());

        assert!(!primary.dispatch_command("crate key give Steve vote 1".into()).await);
        assert_eq!(host.commands.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_host_panic_does_not_stop_the_context() {
        let host = Arc::new(RecordingHost {
            panic_on_commands: true,
            ..Default::default()
        });
        let (primary, task) = PrimaryContext::spawn(host.clone());

        assert!(!primary.dispatch_command("crate key give Steve vote 1".into()).await);

        assert!(primary.run(|host| host.broadcast("still here")));
        primary.send_message(&Actor::from_name("Steve"), "hello".into());
        primary.flush().await;

        assert!(!task.is_finished());
        assert_eq!(*host.broadcasts.lock(), vec!["still here".to_string()]);
        assert_eq!(host.messages.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_context_reports_failure() {
        let host = Arc::new(RecordingHost::default());
        let (primary, task) = PrimaryContext::spawn(host);
        task.abort();
        let _ = task.await;

        assert!(!primary.dispatch_command("noop".into()).await);
        assert!(!primary.run(|_| ()));
    }
}
