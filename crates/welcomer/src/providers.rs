//! In-process reward systems for running the welcomer standalone.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use welcome_system::{
    Actor, ActorId, LedgerProvider, NamedCurrency, NamedCurrencyProvider, PointsProvider,
    RewardProviders, TransferError,
};

/// Currency offered by the in-process multi-currency system.
pub const GEMS_CURRENCY_ID: &str = "gems";

#[derive(Debug, Default)]
pub struct InMemoryEconomy {
    balances: DashMap<ActorId, f64>,
}

#[async_trait]
impl LedgerProvider for InMemoryEconomy {
    fn name(&self) -> &str {
        "InMemoryEconomy"
    }

    fn currency_name_plural(&self) -> String {
        "coins".to_string()
    }

    async fn deposit(&self, actor: &Actor, amount: f64) -> Result<(), TransferError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(TransferError::Rejected(format!("invalid amount {amount}")));
        }
        *self.balances.entry(actor.id).or_insert(0.0) += amount;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPoints {
    balances: DashMap<ActorId, i64>,
}

#[async_trait]
impl PointsProvider for InMemoryPoints {
    async fn give(&self, actor: ActorId, points: i64) -> Result<bool, TransferError> {
        if points < 1 {
            return Ok(false);
        }
        *self.balances.entry(actor).or_insert(0) += points;
        Ok(true)
    }
}

#[derive(Debug)]
pub struct InMemoryCurrencies {
    currencies: Vec<NamedCurrency>,
    balances: DashMap<(ActorId, String), f64>,
}

impl Default for InMemoryCurrencies {
    fn default() -> Self {
        Self {
            currencies: vec![NamedCurrency {
                id: GEMS_CURRENCY_ID.to_string(),
                name: "Gems".to_string(),
            }],
            balances: DashMap::new(),
        }
    }
}

#[async_trait]
impl NamedCurrencyProvider for InMemoryCurrencies {
    fn currency(&self, id: &str) -> Option<NamedCurrency> {
        self.currencies
            .iter()
            .find(|currency| currency.id.eq_ignore_ascii_case(id))
            .cloned()
    }

    async fn add_balance(
        &self,
        actor: &Actor,
        currency: &NamedCurrency,
        amount: f64,
    ) -> Result<(), TransferError> {
        *self
            .balances
            .entry((actor.id, currency.id.clone()))
            .or_insert(0.0) += amount;
        Ok(())
    }
}

/// Every reward system the standalone host offers. The economy is kept out of
/// [`RewardProviders`] because it registers itself after startup.
#[derive(Debug, Clone, Default)]
pub struct LocalRewardSystems {
    pub economy: Arc<InMemoryEconomy>,
    pub points: Arc<InMemoryPoints>,
    pub currencies: Arc<InMemoryCurrencies>,
}

impl LocalRewardSystems {
    pub fn providers(&self) -> RewardProviders {
        RewardProviders {
            ledger_installed: true,
            points: Some(self.points.clone()),
            named_currency: Some(self.currencies.clone()),
            crates_installed: true,
        }
    }

    /// One-line summary of everything `actor` has earned.
    pub fn balance_report(&self, actor: &Actor) -> String {
        let coins = self
            .economy
            .balances
            .get(&actor.id)
            .map(|balance| *balance)
            .unwrap_or(0.0);
        let points = self
            .points
            .balances
            .get(&actor.id)
            .map(|balance| *balance)
            .unwrap_or(0);
        let gems = self
            .currencies
            .balances
            .get(&(actor.id, GEMS_CURRENCY_ID.to_string()))
            .map(|balance| *balance)
            .unwrap_or(0.0);
        format!(
            "{}: {} coins, {} points, {} gems",
            actor.name, coins, points, gems
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_balances_accumulate() {
        let systems = LocalRewardSystems::default();
        let steve = Actor::from_name("Steve");

        systems.economy.deposit(&steve, 100.0).await.unwrap();
        systems.economy.deposit(&steve, 50.0).await.unwrap();
        assert!(systems.economy.deposit(&steve, -1.0).await.is_err());
        assert!(systems.points.give(steve.id, 10).await.unwrap());
        assert!(!systems.points.give(steve.id, 0).await.unwrap());

        let gems = systems.currencies.currency("GEMS").unwrap();
        systems
            .currencies
            .add_balance(&steve, &gems, 2.5)
            .await
            .unwrap();

        assert_eq!(
            systems.balance_report(&steve),
            "Steve: 150 coins, 10 points, 2.5 gems"
        );
    }

    #[test]
    fn test_providers_report_installed_systems() {
        let providers = LocalRewardSystems::default().providers();
        assert!(providers.ledger_installed);
        assert!(providers.crates_installed);
        assert!(providers.points.is_some());
        assert!(providers
            .named_currency
            .is_some_and(|currencies| currencies.currency("tokens").is_none()));
    }
}
