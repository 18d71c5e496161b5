//! Standalone console host.
//!
//! Stands in for a game server: player-facing output goes to stdout and
//! players are driven by typed commands.

use crate::providers::LocalRewardSystems;
use anyhow::Result;
use dashmap::DashMap;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{info, warn};
use welcome_system::reward::CRATE_NAMESPACE;
use welcome_system::{Actor, Host, WelcomeSystem};

const HELP: &str = "Commands: join <name>, leave <name>, welcome <welcomer> <target>, \
                    balance <name>, count, reload, help, quit";
const PLAYER_NOT_FOUND: &str = "Player not found!";

/// Prints everything players would see.
#[derive(Debug, Default)]
pub struct ConsoleHost;

impl Host for ConsoleHost {
    fn broadcast(&self, message: &str) {
        println!("[broadcast] {message}");
    }

    fn send_message(&self, actor: &Actor, message: &str) {
        println!("[to {}] {message}", actor.name);
    }

    fn dispatch_command(&self, command: &str) -> bool {
        let known = command
            .split_whitespace()
            .next()
            .is_some_and(|namespace| namespace == CRATE_NAMESPACE);
        if known {
            info!("⚙️ Console command: {}", command);
        } else {
            warn!("Unknown console command: {}", command);
        }
        known
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Join(String),
    Leave(String),
    Welcome { welcomer: String, target: String },
    Balance(String),
    Count,
    Reload,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_lowercase().as_str(), args.as_slice()) {
            ("join", [name]) => Self::Join(name.to_string()),
            ("leave", [name]) => Self::Leave(name.to_string()),
            ("welcome", [welcomer, target]) => Self::Welcome {
                welcomer: welcomer.to_string(),
                target: target.to_string(),
            },
            ("balance", [name]) => Self::Balance(name.to_string()),
            ("count", []) => Self::Count,
            ("reload", []) => Self::Reload,
            ("help", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            ("welcome", _) => return Err("Usage: welcome <welcomer> <target>".to_string()),
            ("join" | "leave" | "balance", _) => return Err(format!("Usage: {verb} <name>")),
            _ => return Err(format!("Unknown command '{verb}'. {HELP}")),
        };
        Ok(Some(command))
    }
}

/// Drives a [`WelcomeSystem`] from console commands.
pub struct Console<'a> {
    system: &'a WelcomeSystem,
    rewards: LocalRewardSystems,
    /// Online players by lowercase name
    online: DashMap<String, Actor>,
}

impl<'a> Console<'a> {
    pub fn new(system: &'a WelcomeSystem, rewards: LocalRewardSystems) -> Self {
        Self {
            system,
            rewards,
            online: DashMap::new(),
        }
    }

    fn online_player(&self, name: &str) -> Option<Actor> {
        self.online
            .get(&name.to_lowercase())
            .map(|entry| entry.value().clone())
    }

    /// Executes `command`, returning the console's own reply if it has one.
    /// Player-facing output goes through the host.
    pub async fn execute(&self, command: ConsoleCommand) -> Option<String> {
        match command {
            ConsoleCommand::Join(name) => {
                let actor = Actor::from_name(name);
                self.online.insert(actor.name.to_lowercase(), actor.clone());
                self.system.service().on_join(&actor);
                Some(format!("{} joined the game", actor.name))
            }
            ConsoleCommand::Leave(name) => match self.online.remove(&name.to_lowercase()) {
                Some((_, actor)) => Some(format!("{} left the game", actor.name)),
                None => Some(PLAYER_NOT_FOUND.to_string()),
            },
            ConsoleCommand::Welcome { welcomer, target } => {
                let (Some(welcomer), Some(target)) =
                    (self.online_player(&welcomer), self.online_player(&target))
                else {
                    return Some(PLAYER_NOT_FOUND.to_string());
                };
                self.system.service().welcome(&welcomer, &target).await;
                None
            }
            ConsoleCommand::Balance(name) => Some(
                self.rewards
                    .balance_report(&Actor::from_name(name)),
            ),
            ConsoleCommand::Count => Some(format!(
                "Unique joins: {}",
                self.system.store().unique_join_count()
            )),
            ConsoleCommand::Reload => Some(match self.system.reloader().reload().await {
                Ok(()) => "Configuration and data reloaded successfully!".to_string(),
                Err(e) => format!("Failed to reload: {e}. Check console for details."),
            }),
            ConsoleCommand::Help => Some(HELP.to_string()),
            ConsoleCommand::Quit => None,
        }
    }

    /// Reads commands from `input` until `quit` or end of input.
    pub async fn run<R>(&self, input: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(input).lines();
        while let Some(line) = lines.next_line().await? {
            let command = match ConsoleCommand::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(usage) => {
                    println!("{usage}");
                    continue;
                }
            };
            if command == ConsoleCommand::Quit {
                break;
            }
            if let Some(reply) = self.execute(command).await {
                println!("{reply}");
            }
            // Keep host output in step with the prompt
            self.system.primary().flush().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;
    use welcome_system::{
        FileConfigLoader, JsonLedgerStorage, LedgerStorage, WelcomerConfig,
    };

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ConsoleCommand::parse("join Alice"),
            Ok(Some(ConsoleCommand::Join("Alice".into())))
        );
        assert_eq!(
            ConsoleCommand::parse("  WELCOME Bob   Alice "),
            Ok(Some(ConsoleCommand::Welcome {
                welcomer: "Bob".into(),
                target: "Alice".into()
            }))
        );
        assert_eq!(ConsoleCommand::parse(""), Ok(None));
        assert_eq!(ConsoleCommand::parse("exit"), Ok(Some(ConsoleCommand::Quit)));
        assert!(ConsoleCommand::parse("welcome Bob").is_err());
        assert!(ConsoleCommand::parse("dance").is_err());
    }

    #[test]
    fn test_console_host_only_accepts_crate_commands() {
        let host = ConsoleHost;
        assert!(host.dispatch_command("crate key give Steve vote 1"));
        assert!(!host.dispatch_command("op Steve"));
    }

    #[tokio::test]
    async fn test_console_session() {
        let dir = TempDir::new().unwrap();
        let data_path = dir.path().join("data.json");
        let rewards = LocalRewardSystems::default();
        let system = WelcomeSystem::start(
            WelcomerConfig::default(),
            Arc::new(FileConfigLoader::new(dir.path().join("config.toml"))),
            rewards.providers(),
            Arc::new(ConsoleHost),
            Arc::new(JsonLedgerStorage::new(&data_path)),
        )
        .await
        .unwrap();
        system.ledger_hook().register(rewards.economy.clone());

        let console = Console::new(&system, rewards.clone());
        let script = b"join Alice\njoin Bob\n\nwelcome Bob Carol\nwelcome Bob Alice\nquit\njoin Dave\n";
        console.run(&script[..]).await.unwrap();

        assert_eq!(system.store().unique_join_count(), 1);
        assert!(!system.store().is_new_player(&Actor::from_name("alice").id));
        assert!(console.online_player("dave").is_none());
        assert_eq!(
            rewards.balance_report(&Actor::from_name("Bob")),
            "Bob: 100 coins, 0 points, 0 gems"
        );
        assert_eq!(
            console.execute(ConsoleCommand::Count).await.as_deref(),
            Some("Unique joins: 1")
        );

        system.shutdown().await.unwrap();
        let saved = JsonLedgerStorage::new(&data_path).load().await.unwrap();
        assert_eq!(saved.unique_join_count, 1);
    }
}
