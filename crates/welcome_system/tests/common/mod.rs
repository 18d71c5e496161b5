//! Shared test doubles for the welcome system integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use welcome_system::{
    Actor, ActorId, ConfigLoader, ConfigResult, Host, LedgerProvider, TransferError,
    WelcomerConfig,
};

/// Host that records broadcasts and direct messages.
#[derive(Default)]
pub struct RecordingHost {
    pub broadcasts: Mutex<Vec<String>>,
    pub messages: Mutex<Vec<(String, String)>>,
    pub commands: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn messages_for(&self, name: &str) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(to, _)| to == name)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl Host for RecordingHost {
    fn broadcast(&self, message: &str) {
        self.broadcasts.lock().push(message.to_string());
    }

    fn send_message(&self, actor: &Actor, message: &str) {
        self.messages
            .lock()
            .push((actor.name.clone(), message.to_string()));
    }

    fn dispatch_command(&self, command: &str) -> bool {
        self.commands.lock().push(command.to_string());
        true
    }
}

/// Economy that always accepts deposits.
#[derive(Default)]
pub struct TestEconomy {
    pub deposits: Mutex<Vec<(ActorId, f64)>>,
}

#[async_trait]
impl LedgerProvider for TestEconomy {
    fn name(&self) -> &str {
        "TestEconomy"
    }

    fn currency_name_plural(&self) -> String {
        "coins".to_string()
    }

    async fn deposit(&self, actor: &Actor, amount: f64) -> Result<(), TransferError> {
        self.deposits.lock().push((actor.id, amount));
        Ok(())
    }
}

/// Loader returning a fixed configuration.
pub struct StaticLoader(pub WelcomerConfig);

#[async_trait]
impl ConfigLoader for StaticLoader {
    async fn load(&self) -> ConfigResult<WelcomerConfig> {
        Ok(self.0.clone())
    }
}

pub fn static_loader() -> Arc<dyn ConfigLoader> {
    Arc::new(StaticLoader(WelcomerConfig::default()))
}
