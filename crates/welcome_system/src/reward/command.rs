//! Crate-key backend, delivered by a host console command.

use super::{RewardBackend, RewardVariant};
use crate::host::PrimaryContext;
use crate::types::Actor;
use async_trait::async_trait;
use tracing::warn;

/// Command namespace of the crate plugin.
pub const CRATE_NAMESPACE: &str = "crate";

/// Gives crate keys by running `crate key give <player> <key> <amount>`.
/// Host commands may only run on the primary context, so the dispatch hops
/// there and waits for the host's answer.
pub struct CrateCommandBackend {
    installed: bool,
    key_id: String,
    primary: PrimaryContext,
}

impl CrateCommandBackend {
    pub fn new(installed: bool, key_id: String, primary: PrimaryContext) -> Self {
        Self {
            installed,
            key_id,
            primary,
        }
    }

    /// Builds the console command for `keys` keys.
    pub fn command(&self, actor: &Actor, keys: u32) -> String {
        format!(
            "{} key give {} {} {}",
            CRATE_NAMESPACE, actor.name, self.key_id, keys
        )
    }
}

#[async_trait]
impl RewardBackend for CrateCommandBackend {
    fn variant(&self) -> RewardVariant {
        RewardVariant::CrateCommand
    }

    fn is_available(&self) -> bool {
        self.installed
    }

    async fn give(&self, actor: &Actor, amount: f64) -> bool {
        if !self.installed {
            warn!(
                actor = %actor.id,
                "Crate plugin not found! Crate key reward skipped for {}",
                actor.name
            );
            return false;
        }

        // Keys are whole items.
        let keys = amount.trunc();
        if keys < 1.0 || keys > u32::MAX as f64 {
            warn!(
                actor = %actor.id,
                "Invalid crate key amount: {} for {}",
                amount,
                actor.name
            );
            return false;
        }

        let command = self.command(actor, keys as u32);
        let dispatched = self.primary.dispatch_command(command.clone()).await;
        if !dispatched {
            warn!(
                actor = %actor.id,
                backend = %self.variant(),
                "Failed to dispatch crate key command: {}. Check if key ID '{}' exists.",
                command,
                self.key_id
            );
        }
        dispatched
    }

    fn display_label(&self, _amount: f64) -> String {
        format!("{} key(s)", self.key_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_dispatches_crate_command() {
        let host = Arc::new(RecordingHost::default());
        let (primary, _task) = PrimaryContext::spawn(host.clone());
        let backend = CrateCommandBackend::new(true, "vote".to_string(), primary);

        assert!(backend.give(&Actor::from_name("Steve"), 2.7).await);
        assert_eq!(
            host.commands.lock().as_slice(),
            &["crate key give Steve vote 2".to_string()]
        );
        assert_eq!(backend.display_label(2.0), "vote key(s)");
    }

    #[tokio::test]
    async fn test_rejected_or_invalid_dispatch() {
        let host = Arc::new(RecordingHost {
            reject_commands: true,
            ..Default::default()
        });
        let (primary, _task) = PrimaryContext::spawn(host.clone());
        let backend = CrateCommandBackend::new(true, "vote".to_string(), primary.clone());

        assert!(!backend.give(&Actor::from_name("Steve"), 1.0).await);
        assert!(!backend.give(&Actor::from_name("Steve"), 0.4).await);
        assert_eq!(host.commands.lock().len(), 1);

        let missing = CrateCommandBackend::new(false, "vote".to_string(), primary);
        assert!(!missing.is_available());
        assert!(!missing.give(&Actor::from_name("Steve"), 1.0).await);
        assert_eq!(host.commands.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_host_panic_fails_reward_but_keeps_output_flowing() {
        let host = Arc::new(RecordingHost {
            panic_on_commands: true,
            ..Default::default()
        });
        let (primary, _task) = PrimaryContext::spawn(host.clone());
        let backend = CrateCommandBackend::new(true, "vote".to_string(), primary.clone());

        assert!(!backend.give(&Actor::from_name("Steve"), 1.0).await);

        primary.broadcast("after failed reward".to_string());
        primary.flush().await;
        assert_eq!(
            host.broadcasts.lock().as_slice(),
            &["after failed reward".to_string()]
        );
    }
}
