//! Administrative reload: new configuration, fresh player state.

use crate::config::{ActiveConfig, SharedConfig, WelcomerConfig};
use crate::error::{ConfigResult, ReloadResult};
use crate::persistence::SaveRequester;
use crate::reward::RewardDispatcher;
use crate::state::PlayerStateStore;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Source of configuration for a reload.
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    async fn load(&self) -> ConfigResult<WelcomerConfig>;
}

/// Reads the TOML configuration file, creating it with defaults if missing.
#[derive(Debug, Clone)]
pub struct FileConfigLoader {
    path: PathBuf,
}

impl FileConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigLoader for FileConfigLoader {
    async fn load(&self) -> ConfigResult<WelcomerConfig> {
        WelcomerConfig::load_from_file(&self.path).await
    }
}

pub struct ReloadCoordinator {
    loader: Arc<dyn ConfigLoader>,
    config: Arc<SharedConfig>,
    dispatcher: Arc<RewardDispatcher>,
    store: Arc<PlayerStateStore>,
    saver: SaveRequester,
}

impl ReloadCoordinator {
    pub fn new(
        loader: Arc<dyn ConfigLoader>,
        config: Arc<SharedConfig>,
        dispatcher: Arc<RewardDispatcher>,
        store: Arc<PlayerStateStore>,
        saver: SaveRequester,
    ) -> Self {
        Self {
            loader,
            config,
            dispatcher,
            store,
            saver,
        }
    }

    /// Re-reads and validates the configuration, then clears all player
    /// state. A configuration that fails to load or validate leaves both the
    /// running configuration and the player state untouched.
    pub async fn reload(&self) -> ReloadResult<()> {
        info!("🔄 Reloading configuration and data");

        let active = match self.loader.load().await.and_then(ActiveConfig::new) {
            Ok(active) => active,
            Err(e) => {
                error!("Reload failed: {}", e);
                return Err(e.into());
            }
        };

        let selection = active.reward.clone();
        self.config.replace(active);
        self.dispatcher.select(&selection);
        self.dispatcher.log_availability();

        self.store.reset();
        self.saver.request_save();

        info!("✅ Configuration and data reloaded");
        Ok(())
    }
}
