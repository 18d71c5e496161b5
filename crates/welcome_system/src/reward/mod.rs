//! Reward delivery.
//!
//! A [`RewardBackend`] wraps one optional, independently installed reward
//! system. The configured backend is chosen once from a [`RewardSelection`]
//! and driven through the [`RewardDispatcher`]. Backends never return errors:
//! every provider failure is logged at the backend boundary and reported as
//! `false`.

pub mod command;
pub mod dispatcher;
pub mod ledger;
pub mod named;
pub mod points;

pub use command::{CrateCommandBackend, CRATE_NAMESPACE};
pub use dispatcher::RewardDispatcher;
pub use ledger::{LedgerCurrencyBackend, LedgerHook, LedgerState};
pub use named::NamedCurrencyBackend;
pub use points::PointsBackend;

use crate::error::TransferError;
use crate::host::PrimaryContext;
use crate::types::{Actor, ActorId};
use async_trait::async_trait;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, warn};

// ============================================================================
// Selection
// ============================================================================

/// Which currency system pays out a `currency` reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrencySelection {
    /// Generic economy ledger (`vault`)
    Ledger,
    /// Points system (`playerpoints`)
    Points,
    /// A named currency (`coinsengine:<id>`)
    Named(String),
}

/// The reward configured by the operator, resolved at validation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardSelection {
    Currency(CurrencySelection),
    CrateKey { key_id: String },
}

impl fmt::Display for RewardSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardSelection::Currency(CurrencySelection::Ledger) => write!(f, "currency (vault)"),
            RewardSelection::Currency(CurrencySelection::Points) => {
                write!(f, "currency (playerpoints)")
            }
            RewardSelection::Currency(CurrencySelection::Named(id)) => {
                write!(f, "currency (coinsengine:{id})")
            }
            RewardSelection::CrateKey { key_id } => write!(f, "crate_key ({key_id})"),
        }
    }
}

/// Concrete backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewardVariant {
    LedgerCurrency,
    Points,
    NamedCurrency,
    CrateCommand,
}

impl fmt::Display for RewardVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RewardVariant::LedgerCurrency => "ledger-currency",
            RewardVariant::Points => "points",
            RewardVariant::NamedCurrency => "named-currency",
            RewardVariant::CrateCommand => "crate-command",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Backend capability
// ============================================================================

#[async_trait]
pub trait RewardBackend: Send + Sync {
    fn variant(&self) -> RewardVariant;

    /// Whether the underlying system is present and initialized right now.
    fn is_available(&self) -> bool;

    /// Delivers `amount` to `actor`. Returns false on any failure.
    async fn give(&self, actor: &Actor, amount: f64) -> bool;

    /// Short unit name shown next to the amount.
    fn display_label(&self, amount: f64) -> String;
}

// ============================================================================
// External reward providers
// ============================================================================

/// A generic economy ledger. Registers itself with the host some time after
/// startup; see [`LedgerHook`].
#[async_trait]
pub trait LedgerProvider: Send + Sync {
    fn name(&self) -> &str;
    fn currency_name_plural(&self) -> String;
    async fn deposit(&self, actor: &Actor, amount: f64) -> Result<(), TransferError>;
}

/// A whole-number points system.
#[async_trait]
pub trait PointsProvider: Send + Sync {
    /// Returns the provider's own success flag.
    async fn give(&self, actor: ActorId, points: i64) -> Result<bool, TransferError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedCurrency {
    pub id: String,
    pub name: String,
}

/// A multi-currency system addressed by currency id.
#[async_trait]
pub trait NamedCurrencyProvider: Send + Sync {
    fn currency(&self, id: &str) -> Option<NamedCurrency>;
    async fn add_balance(
        &self,
        actor: &Actor,
        currency: &NamedCurrency,
        amount: f64,
    ) -> Result<(), TransferError>;
}

/// Reward systems detected on the host at startup. `None` / `false` means the
/// system is not installed at all, which is terminal.
#[derive(Clone, Default)]
pub struct RewardProviders {
    /// The ledger's host system is installed; its provider may register later
    pub ledger_installed: bool,
    pub points: Option<Arc<dyn PointsProvider>>,
    pub named_currency: Option<Arc<dyn NamedCurrencyProvider>>,
    /// The crate plugin that understands `crate key give` is installed
    pub crates_installed: bool,
}

/// Every backend the host could offer, built once at startup. The ledger hook
/// lives here so that a late registration survives reward reselection.
pub struct RewardBackends {
    ledger: Arc<LedgerHook>,
    points: Option<Arc<dyn PointsProvider>>,
    named_currency: Option<Arc<dyn NamedCurrencyProvider>>,
    crates_installed: bool,
    primary: PrimaryContext,
}

impl RewardBackends {
    pub fn new(providers: RewardProviders, primary: PrimaryContext) -> Self {
        Self {
            ledger: Arc::new(LedgerHook::new(providers.ledger_installed)),
            points: providers.points,
            named_currency: providers.named_currency,
            crates_installed: providers.crates_installed,
            primary,
        }
    }

    /// Registration point for a late ledger provider.
    pub fn ledger_hook(&self) -> Arc<LedgerHook> {
        self.ledger.clone()
    }

    pub fn resolve(&self, selection: &RewardSelection) -> Arc<dyn RewardBackend> {
        match selection {
            RewardSelection::Currency(CurrencySelection::Ledger) => {
                Arc::new(LedgerCurrencyBackend::new(self.ledger.clone()))
            }
            RewardSelection::Currency(CurrencySelection::Points) => {
                Arc::new(PointsBackend::new(self.points.clone()))
            }
            RewardSelection::Currency(CurrencySelection::Named(currency_id)) => Arc::new(
                NamedCurrencyBackend::new(self.named_currency.clone(), currency_id.clone()),
            ),
            RewardSelection::CrateKey { key_id } => Arc::new(CrateCommandBackend::new(
                self.crates_installed,
                key_id.clone(),
                self.primary.clone(),
            )),
        }
    }
}

/// Runs a provider transfer, converting errors and panics into `false`.
pub(crate) async fn guard_transfer<F>(variant: RewardVariant, actor: &Actor, transfer: F) -> bool
where
    F: Future<Output = Result<bool, TransferError>> + Send,
{
    match AssertUnwindSafe(transfer).catch_unwind().await {
        Ok(Ok(true)) => true,
        Ok(Ok(false)) => {
            warn!(
                actor = %actor.id,
                backend = %variant,
                "Reward provider declined transfer for {}",
                actor.name
            );
            false
        }
        Ok(Err(e)) => {
            error!(
                actor = %actor.id,
                backend = %variant,
                "Reward transfer for {} failed: {}",
                actor.name,
                e
            );
            false
        }
        Err(_) => {
            error!(
                actor = %actor.id,
                backend = %variant,
                "Reward provider panicked while rewarding {}",
                actor.name
            );
            false
        }
    }
}
