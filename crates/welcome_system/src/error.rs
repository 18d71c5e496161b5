//! Error types for the welcome system.
//!
//! Only configuration and storage can fail with an error value. Reward
//! delivery reports plain booleans and the state store is total.

use std::{io::Error as IoError, path::PathBuf};
use thiserror::Error;

/// Configuration loading and validation errors. All of these are fatal at
/// startup and abort a reload before any state is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, IoError),

    #[error("Failed to write default config file {0}: {1}")]
    Write(PathBuf, IoError),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Failed to serialize default config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid reward-type: {0}. Must be 'currency' or 'crate_key'.")]
    InvalidRewardType(String),

    #[error("Currency type is missing or empty for reward-type 'currency'.")]
    MissingCurrency,

    #[error("Unknown reward-currency: {0}. Must be 'vault', 'playerpoints' or 'coinsengine:<currency_id>'.")]
    UnknownCurrency(String),

    #[error("Invalid CoinsEngine currency ID in reward-currency: {0}")]
    EmptyCurrencyId(String),

    #[error("Crate key name is missing or empty for reward-type 'crate_key'.")]
    MissingCrateKey,

    #[error("Reward amount must be positive: {0}")]
    NonPositiveAmount(f64),

    #[error("Welcome cooldown must be at least one second")]
    ZeroCooldown,

    #[error("Reaper interval must be at least one second")]
    ZeroReaperInterval,

    #[error("Cooldown retention ({retention}s) must exceed the welcome cooldown ({cooldown}s)")]
    RetentionTooShort { retention: u64, cooldown: u64 },

    #[error("First-join message has {actual} lines, but line_count is set to {expected}")]
    FirstJoinLineCount { expected: usize, actual: usize },
}

/// Welcomed-player ledger storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create directory {0}: {1}")]
    DirectoryCreate(PathBuf, IoError),

    #[error("Failed to read file {0}: {1}")]
    FileRead(PathBuf, IoError),

    #[error("Failed to create file {0}: {1}")]
    FileCreate(PathBuf, IoError),

    #[error("Failed to write to file {0}: {1}")]
    FileWrite(PathBuf, IoError),

    #[error("Failed to sync file {0}: {1}")]
    FileSync(PathBuf, IoError),

    #[error("Failed to rename file from {0} to {1}: {2}")]
    FileRename(PathBuf, PathBuf, IoError),

    #[error("Failed to serialize ledger: {0}")]
    Serialization(serde_json::Error),

    #[error("Failed to deserialize file {0}: {1}")]
    Deserialization(PathBuf, serde_json::Error),

    #[error("Ledger writer stopped unexpectedly: {0}")]
    WriterStopped(String),
}

/// Failure reported by an external reward provider. Backends catch these and
/// turn them into `false`; they never reach the dispatcher's caller.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transfer rejected: {0}")]
    Rejected(String),

    #[error("provider is not ready")]
    NotReady,
}

/// Administrative reload errors.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("Configuration reload failed: {0}")]
    Config(#[from] ConfigError),
}

/// Errors that prevent the welcome system from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type StartupResult<T> = Result<T, StartupError>;
pub type StorageResult<T> = Result<T, StorageError>;
pub type ReloadResult<T> = Result<T, ReloadError>;
