//! Uniform entry point for reward delivery.

use super::{LedgerHook, RewardBackend, RewardBackends, RewardSelection, RewardVariant};
use crate::types::Actor;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

/// Hides which backend is active. The backend is resolved from the
/// configured [`RewardSelection`] once, and again only when an operator
/// reloads the configuration. There is no cross-backend fallback: if the
/// configured backend is unavailable the reward is skipped.
pub struct RewardDispatcher {
    backends: RewardBackends,
    active: RwLock<ActiveReward>,
}

/// The resolved backend together with the selection it was resolved from.
/// Both change under the same write guard.
#[derive(Clone)]
struct ActiveReward {
    backend: Arc<dyn RewardBackend>,
    selection: RewardSelection,
}

impl RewardDispatcher {
    pub fn new(backends: RewardBackends, selection: &RewardSelection) -> Self {
        let active = ActiveReward {
            backend: backends.resolve(selection),
            selection: selection.clone(),
        };
        Self {
            backends,
            active: RwLock::new(active),
        }
    }

    /// Switches to the backend for `selection`.
    pub fn select(&self, selection: &RewardSelection) {
        let backend = self.backends.resolve(selection);
        *self.active.write() = ActiveReward {
            backend,
            selection: selection.clone(),
        };
        info!("🎁 Reward backend set to {}", selection);
    }

    pub fn selection(&self) -> RewardSelection {
        self.active.read().selection.clone()
    }

    pub fn variant(&self) -> RewardVariant {
        self.active.read().backend.variant()
    }

    /// Registration point for a late economy provider.
    pub fn ledger_hook(&self) -> Arc<LedgerHook> {
        self.backends.ledger_hook()
    }

    fn backend(&self) -> Arc<dyn RewardBackend> {
        self.active.read().backend.clone()
    }

    /// Gives `amount` to `actor` through the configured backend. Returns false
    /// without touching the backend if it is currently unavailable.
    pub async fn give_reward(&self, actor: &Actor, amount: f64) -> bool {
        let backend = self.backend();
        if !backend.is_available() {
            warn!(
                actor = %actor.id,
                backend = %backend.variant(),
                "Reward backend unavailable, reward skipped for {}",
                actor.name
            );
            return false;
        }
        backend.give(actor, amount).await
    }

    pub fn display(&self, amount: f64) -> String {
        self.backend().display_label(amount)
    }

    pub fn is_reward_available(&self) -> bool {
        self.backend().is_available()
    }

    /// Logs whether the configured reward can currently be delivered.
    pub fn log_availability(&self) {
        let ActiveReward { backend, selection } = self.active.read().clone();
        if backend.is_available() {
            info!("✅ Reward system validated: {}", selection);
        } else {
            warn!(
                "Reward {} is not available! Ensure the required plugins are installed.",
                selection
            );
        }
    }
}
