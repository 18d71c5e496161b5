//! Configuration for the welcome system.
//!
//! Settings are read from a TOML file, validated once, and then published
//! through [`SharedConfig`] so that readers on any thread always see one
//! complete, validated configuration. A reload swaps the whole value.

use crate::error::{ConfigError, ConfigResult};
use crate::reward::{CurrencySelection, RewardSelection};
use crate::types::{
    DEFAULT_COOLDOWN_RETENTION_SECS, DEFAULT_COOLDOWN_SECS, DEFAULT_REAPER_INTERVAL_SECS,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const COINSENGINE_PREFIX: &str = "coinsengine:";

/// Application configuration loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WelcomerConfig {
    /// Welcome command behaviour and reward settings
    pub welcome_command: WelcomeCommandSettings,
    /// Broadcast shown when a brand new player joins
    pub first_join: FirstJoinSettings,
    /// Background expiry sweep
    pub reaper: ReaperSettings,
    /// Welcomed-player ledger location
    pub data: DataSettings,
    /// Logging output
    pub logging: LoggingSettings,
}

/// Settings for the welcome command.
///
/// Message templates accept `%player_name%`, `%target_name%`, `%seconds%`,
/// `%reward_amount%` and `%reward_display%` where they make sense.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WelcomeCommandSettings {
    pub enabled: bool,
    /// Seconds a player must wait between two successful welcomes
    pub cooldown_secs: u64,
    /// `currency` or `crate_key`
    pub reward_type: String,
    /// `vault`, `playerpoints` or `coinsengine:<currency_id>`
    pub reward_currency: String,
    pub reward_amount: f64,
    /// Crate key identifier, required for `crate_key` rewards
    pub crate_key_name: String,
    pub welcome_message: String,
    pub no_new_players_message: String,
    pub expired_message: String,
    pub cooldown_message: String,
    pub success_message: String,
    pub reward_failed_message: String,
}

impl Default for WelcomeCommandSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            reward_type: "currency".to_string(),
            reward_currency: "vault".to_string(),
            reward_amount: 100.0,
            crate_key_name: "Test Key".to_string(),
            welcome_message: "Welcome to the server, %target_name%! Welcomed by %player_name%"
                .to_string(),
            no_new_players_message: "That player has already been welcomed!".to_string(),
            expired_message: "This player can no longer be welcomed!".to_string(),
            cooldown_message: "Please wait %seconds% seconds before using this command again!"
                .to_string(),
            success_message:
                "You welcomed a new player and received %reward_amount% %reward_display%!"
                    .to_string(),
            reward_failed_message:
                "You welcomed a new player, but the reward could not be delivered.".to_string(),
        }
    }
}

/// First-join broadcast settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirstJoinSettings {
    pub enabled: bool,
    /// Expected number of lines, checked against `lines` during validation
    pub line_count: usize,
    /// Lines accept `%player_name%` and `%unique_join_count%`
    pub lines: Vec<String>,
}

impl Default for FirstJoinSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            line_count: 5,
            lines: vec![
                "====================".to_string(),
                String::new(),
                "Welcome %player_name% to the server! [#%unique_join_count%]".to_string(),
                String::new(),
                "====================".to_string(),
            ],
        }
    }
}

/// Expiry sweep cadence and retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaperSettings {
    pub interval_secs: u64,
    /// Age after which cooldown entries are dropped. Must exceed the cooldown.
    pub cooldown_retention_secs: u64,
}

impl Default for ReaperSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_REAPER_INTERVAL_SECS,
            cooldown_retention_secs: DEFAULT_COOLDOWN_RETENTION_SECS,
        }
    }
}

impl ReaperSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cooldown_retention(&self) -> Duration {
        Duration::from_secs(self.cooldown_retention_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Path of the welcomed-player ledger file
    pub path: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data.json"),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl WelcomerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
            Self::from_toml_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
        } else {
            let default_config = Self::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .map_err(|e| ConfigError::Write(path.to_path_buf(), e))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Validates the configuration and resolves the reward selection.
    ///
    /// This is the single place where unknown reward types and currency
    /// selectors are rejected.
    pub fn validate(&self) -> ConfigResult<RewardSelection> {
        let welcome = &self.welcome_command;

        if self.first_join.enabled && self.first_join.lines.len() != self.first_join.line_count {
            return Err(ConfigError::FirstJoinLineCount {
                expected: self.first_join.line_count,
                actual: self.first_join.lines.len(),
            });
        }

        if welcome.cooldown_secs == 0 {
            return Err(ConfigError::ZeroCooldown);
        }
        if self.reaper.interval_secs == 0 {
            return Err(ConfigError::ZeroReaperInterval);
        }
        if self.reaper.cooldown_retention_secs <= welcome.cooldown_secs {
            return Err(ConfigError::RetentionTooShort {
                retention: self.reaper.cooldown_retention_secs,
                cooldown: welcome.cooldown_secs,
            });
        }

        let selection = parse_reward_selection(
            &welcome.reward_type,
            &welcome.reward_currency,
            &welcome.crate_key_name,
        )?;

        if !(welcome.reward_amount > 0.0) {
            return Err(ConfigError::NonPositiveAmount(welcome.reward_amount));
        }

        Ok(selection)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.welcome_command.cooldown_secs)
    }
}

fn parse_reward_selection(
    reward_type: &str,
    currency: &str,
    crate_key: &str,
) -> ConfigResult<RewardSelection> {
    if reward_type.eq_ignore_ascii_case("crate_key") {
        let key_id = crate_key.trim();
        if key_id.is_empty() {
            return Err(ConfigError::MissingCrateKey);
        }
        return Ok(RewardSelection::CrateKey {
            key_id: key_id.to_string(),
        });
    }

    if !reward_type.eq_ignore_ascii_case("currency") {
        return Err(ConfigError::InvalidRewardType(reward_type.to_string()));
    }

    let currency = currency.trim();
    if currency.is_empty() {
        return Err(ConfigError::MissingCurrency);
    }

    let lower = currency.to_lowercase();
    let selection = if lower == "vault" {
        CurrencySelection::Ledger
    } else if lower == "playerpoints" {
        CurrencySelection::Points
    } else if lower.starts_with(COINSENGINE_PREFIX) {
        let currency_id = currency[COINSENGINE_PREFIX.len()..].trim();
        if currency_id.is_empty() {
            return Err(ConfigError::EmptyCurrencyId(currency.to_string()));
        }
        CurrencySelection::Named(currency_id.to_string())
    } else {
        return Err(ConfigError::UnknownCurrency(currency.to_string()));
    };

    Ok(RewardSelection::Currency(selection))
}

// ============================================================================
// Validated, shareable configuration
// ============================================================================

/// A configuration that passed validation, together with its resolved
/// reward selection.
#[derive(Debug, Clone)]
pub struct ActiveConfig {
    pub settings: WelcomerConfig,
    pub reward: RewardSelection,
}

impl ActiveConfig {
    pub fn new(settings: WelcomerConfig) -> ConfigResult<Self> {
        let reward = settings.validate()?;
        Ok(Self { settings, reward })
    }
}

/// Read access to the welcome cooldown, consulted by the state store on every
/// cooldown query so that reloads take effect immediately.
pub trait CooldownSource: Send + Sync {
    fn cooldown(&self) -> Duration;
}

impl CooldownSource for Duration {
    fn cooldown(&self) -> Duration {
        *self
    }
}

/// The currently active configuration, swapped atomically on reload.
#[derive(Debug)]
pub struct SharedConfig {
    current: RwLock<Arc<ActiveConfig>>,
}

impl SharedConfig {
    pub fn new(active: ActiveConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(active)),
        }
    }

    pub fn current(&self) -> Arc<ActiveConfig> {
        self.current.read().clone()
    }

    /// Publishes a new configuration. Readers holding the previous `Arc`
    /// keep a consistent view until they drop it.
    pub fn replace(&self, active: ActiveConfig) {
        let next = Arc::new(active);
        let previous = std::mem::replace(&mut *self.current.write(), next.clone());
        if previous.reward != next.reward {
            warn!(
                "Reward selection changed from {} to {}",
                previous.reward, next.reward
            );
        }
    }
}

impl CooldownSource for SharedConfig {
    fn cooldown(&self) -> Duration {
        self.current.read().settings.cooldown()
    }
}
