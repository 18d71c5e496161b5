//! Generic economy ledger backend.
//!
//! The ledger's host system may be installed while its economy provider
//! registers only after we started. [`LedgerHook`] tracks that as a small
//! state machine:
//!
//! ```text
//! Unchecked --(provider registered)--> Available
//! Unchecked --(host system absent)---> Unavailable   (terminal)
//! ```

use super::{guard_transfer, LedgerProvider, RewardBackend, RewardVariant};
use crate::types::Actor;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    /// Installed, waiting for a provider to register
    Unchecked,
    Available,
    /// The host system is not installed; never changes
    Unavailable,
}

/// Late-registration slot for the economy provider. Written once, read by
/// every reward afterwards.
pub struct LedgerHook {
    installed: bool,
    provider: OnceCell<Arc<dyn LedgerProvider>>,
}

impl LedgerHook {
    pub fn new(installed: bool) -> Self {
        if installed {
            info!("💰 Economy ledger detected, waiting for a provider to register");
        } else {
            warn!("Economy ledger not installed! Currency rewards via vault disabled.");
        }
        Self {
            installed,
            provider: OnceCell::new(),
        }
    }

    pub fn state(&self) -> LedgerState {
        if !self.installed {
            LedgerState::Unavailable
        } else if self.provider.get().is_some() {
            LedgerState::Available
        } else {
            LedgerState::Unchecked
        }
    }

    /// Called by the host when an economy provider registers. Returns true if
    /// this registration made the ledger available.
    pub fn register(&self, provider: Arc<dyn LedgerProvider>) -> bool {
        if !self.installed {
            warn!(
                "Ignoring economy provider {}: ledger is not installed",
                provider.name()
            );
            return false;
        }

        let name = provider.name().to_string();
        match self.provider.set(provider) {
            Ok(()) => {
                info!("💰 Economy provider hooked: {}", name);
                true
            }
            Err(_) => {
                debug!("Economy provider {} ignored, a provider is already hooked", name);
                false
            }
        }
    }

    pub fn provider(&self) -> Option<Arc<dyn LedgerProvider>> {
        self.provider.get().cloned()
    }
}

impl std::fmt::Debug for LedgerHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerHook")
            .field("state", &self.state())
            .finish()
    }
}

pub struct LedgerCurrencyBackend {
    hook: Arc<LedgerHook>,
}

impl LedgerCurrencyBackend {
    pub fn new(hook: Arc<LedgerHook>) -> Self {
        Self { hook }
    }
}

#[async_trait]
impl RewardBackend for LedgerCurrencyBackend {
    fn variant(&self) -> RewardVariant {
        RewardVariant::LedgerCurrency
    }

    fn is_available(&self) -> bool {
        self.hook.state() == LedgerState::Available
    }

    async fn give(&self, actor: &Actor, amount: f64) -> bool {
        let Some(provider) = self.hook.provider() else {
            warn!(
                actor = %actor.id,
                "Economy ledger not available! Currency reward skipped for {}",
                actor.name
            );
            return false;
        };

        guard_transfer(self.variant(), actor, async move {
            provider.deposit(actor, amount).await.map(|()| true)
        })
        .await
    }

    fn display_label(&self, _amount: f64) -> String {
        self.hook
            .provider()
            .map(|provider| provider.currency_name_plural())
            .unwrap_or_else(|| "coins".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::testing::{Behaviour, TestLedger};
    use uuid::Uuid;

    fn actor() -> Actor {
        Actor::new(Uuid::new_v4(), "Steve")
    }

    #[test]
    fn test_state_machine() {
        let absent = LedgerHook::new(false);
        assert_eq!(absent.state(), LedgerState::Unavailable);
        assert!(!absent.register(TestLedger::new(Behaviour::Succeed)));
        assert_eq!(absent.state(), LedgerState::Unavailable);

        let hook = LedgerHook::new(true);
        assert_eq!(hook.state(), LedgerState::Unchecked);
        assert!(hook.register(TestLedger::new(Behaviour::Succeed)));
        assert_eq!(hook.state(), LedgerState::Available);
        assert!(!hook.register(TestLedger::new(Behaviour::Fail)));
    }

    #[tokio::test]
    async fn test_late_registration_makes_backend_available() {
        let hook = Arc::new(LedgerHook::new(true));
        let backend = LedgerCurrencyBackend::new(hook.clone());
        let steve = actor();

        assert!(!backend.is_available());
        assert!(!backend.give(&steve, 100.0).await);
        assert_eq!(backend.display_label(100.0), "coins");

        let ledger = TestLedger::new(Behaviour::Succeed);
        hook.register(ledger.clone());

        assert!(backend.is_available());
        assert!(backend.give(&steve, 100.0).await);
        assert_eq!(ledger.deposits.lock().as_slice(), &[(steve.id, 100.0)]);
        assert_eq!(backend.display_label(100.0), "dollars");
    }

    #[tokio::test]
    async fn test_provider_failures_become_false() {
        for behaviour in [Behaviour::Fail, Behaviour::Panic] {
            let hook = Arc::new(LedgerHook::new(true));
            hook.register(TestLedger::new(behaviour));
            let backend = LedgerCurrencyBackend::new(hook);
            assert!(!backend.give(&actor(), 10.0).await);
        }
    }
}
