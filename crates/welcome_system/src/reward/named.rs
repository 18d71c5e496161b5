//! Named-currency backend (`coinsengine:<currency_id>`).

use super::{guard_transfer, NamedCurrencyProvider, RewardBackend, RewardVariant};
use crate::types::Actor;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Pays rewards in one currency of a multi-currency system. The currency is
/// looked up on every call because currencies can be created after startup.
pub struct NamedCurrencyBackend {
    provider: Option<Arc<dyn NamedCurrencyProvider>>,
    currency_id: String,
}

impl NamedCurrencyBackend {
    pub fn new(provider: Option<Arc<dyn NamedCurrencyProvider>>, currency_id: String) -> Self {
        Self {
            provider,
            currency_id,
        }
    }
}

#[async_trait]
impl RewardBackend for NamedCurrencyBackend {
    fn variant(&self) -> RewardVariant {
        RewardVariant::NamedCurrency
    }

    fn is_available(&self) -> bool {
        self.provider
            .as_ref()
            .is_some_and(|provider| provider.currency(&self.currency_id).is_some())
    }

    async fn give(&self, actor: &Actor, amount: f64) -> bool {
        let Some(provider) = self.provider.clone() else {
            warn!(
                actor = %actor.id,
                "Currency system not available! Currency reward skipped for {}",
                actor.name
            );
            return false;
        };

        let Some(currency) = provider.currency(&self.currency_id) else {
            warn!(
                actor = %actor.id,
                "Currency '{}' not found! Currency reward skipped for {}",
                self.currency_id,
                actor.name
            );
            return false;
        };

        guard_transfer(self.variant(), actor, async move {
            provider
                .add_balance(actor, &currency, amount)
                .await
                .map(|()| true)
        })
        .await
    }

    fn display_label(&self, _amount: f64) -> String {
        match &self.provider {
            None => "unknown currency".to_string(),
            Some(provider) => provider
                .currency(&self.currency_id)
                .map(|currency| currency.name)
                .unwrap_or_else(|| self.currency_id.clone()),
        }
    }
}
