//! Welcome System - Player welcoming with rewards
//!
//! Lets established players welcome newcomers during a short window after
//! their first join and pays the welcomer through one of several optional
//! reward systems:
//! - Concurrent, time-windowed player state with an expiry reaper
//! - Reward backends for an economy ledger, points, named currencies and
//!   crate keys
//! - First-join announcements and configurable messages
//! - Atomic administrative reload
//! - A JSON ledger of welcomed players that survives restarts

pub mod config;
pub mod error;
pub mod host;
pub mod messages;
pub mod persistence;
pub mod reaper;
pub mod reload;
pub mod reward;
pub mod state;
pub mod storage;
pub mod types;
pub mod welcome;

pub use config::{ActiveConfig, CooldownSource, SharedConfig, WelcomerConfig};
pub use error::{
    ConfigError, ConfigResult, ReloadError, ReloadResult, StartupError, StartupResult,
    StorageError, StorageResult, TransferError,
};
pub use host::{Host, PrimaryContext};
pub use persistence::{LedgerWriter, SaveRequester};
pub use reaper::ExpiryReaper;
pub use reload::{ConfigLoader, FileConfigLoader, ReloadCoordinator};
pub use reward::{
    LedgerHook, LedgerProvider, NamedCurrency, NamedCurrencyProvider, PointsProvider,
    RewardDispatcher, RewardProviders, RewardSelection,
};
pub use state::PlayerStateStore;
pub use storage::{JsonLedgerStorage, LedgerSnapshot, LedgerStorage, MemoryLedgerStorage};
pub use types::{Actor, ActorId};
pub use welcome::{WelcomeOutcome, WelcomeService};

use reward::RewardBackends;
use storage::load_ledger;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

// ============================================================================
// Wiring
// ============================================================================

/// Everything a host needs to run welcomes, built and started in one place.
pub struct WelcomeSystem {
    config: Arc<SharedConfig>,
    store: Arc<PlayerStateStore>,
    dispatcher: Arc<RewardDispatcher>,
    service: WelcomeService,
    reloader: ReloadCoordinator,
    primary: PrimaryContext,
    primary_task: JoinHandle<()>,
    reaper: ExpiryReaper,
    writer: LedgerWriter,
}

impl WelcomeSystem {
    /// Validates `settings`, restores the welcomed-player ledger and starts
    /// the primary context, expiry reaper and ledger writer.
    ///
    /// Reward availability is not logged here: hosts usually register late
    /// providers right after start and then call
    /// [`RewardDispatcher::log_availability`].
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start(
        settings: WelcomerConfig,
        loader: Arc<dyn ConfigLoader>,
        providers: RewardProviders,
        host: Arc<dyn Host>,
        storage: Arc<dyn LedgerStorage>,
    ) -> StartupResult<Self> {
        let active = ActiveConfig::new(settings)?;
        let selection = active.reward.clone();
        let reaper_settings = active.settings.reaper.clone();
        let config = Arc::new(SharedConfig::new(active));

        let store = Arc::new(PlayerStateStore::new(config.clone()));
        store.restore(load_ledger(storage.as_ref()).await?);
        let reaper = store.start_reaper(&reaper_settings);

        let (primary, primary_task) = PrimaryContext::spawn(host);
        let backends = RewardBackends::new(providers, primary.clone());
        let dispatcher = Arc::new(RewardDispatcher::new(backends, &selection));

        let writer = LedgerWriter::spawn(store.clone(), storage);
        let service = WelcomeService::new(
            store.clone(),
            dispatcher.clone(),
            config.clone(),
            primary.clone(),
            writer.requester(),
        );
        let reloader = ReloadCoordinator::new(
            loader,
            config.clone(),
            dispatcher.clone(),
            store.clone(),
            writer.requester(),
        );

        info!("🚀 Welcome system started (reward: {})", selection);

        Ok(Self {
            config,
            store,
            dispatcher,
            service,
            reloader,
            primary,
            primary_task,
            reaper,
            writer,
        })
    }

    pub fn service(&self) -> &WelcomeService {
        &self.service
    }

    pub fn reloader(&self) -> &ReloadCoordinator {
        &self.reloader
    }

    pub fn store(&self) -> &Arc<PlayerStateStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<RewardDispatcher> {
        &self.dispatcher
    }

    pub fn config(&self) -> &Arc<SharedConfig> {
        &self.config
    }

    pub fn primary(&self) -> &PrimaryContext {
        &self.primary
    }

    /// Registration point for an economy provider that comes up after start.
    pub fn ledger_hook(&self) -> Arc<LedgerHook> {
        self.dispatcher.ledger_hook()
    }

    /// Stops the reaper, writes the ledger one last time and drains the
    /// primary context.
    pub async fn shutdown(self) -> StorageResult<()> {
        let Self {
            primary,
            primary_task,
            reaper,
            writer,
            ..
        } = self;

        reaper.shutdown().await;
        let saved = writer.shutdown().await;
        primary.flush().await;
        primary_task.abort();

        info!("✅ Welcome system stopped");
        saved
    }
}
