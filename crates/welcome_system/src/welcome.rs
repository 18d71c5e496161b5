//! The welcome flow: eligibility checks, announcement, reward.

use crate::config::SharedConfig;
use crate::host::PrimaryContext;
use crate::messages::Placeholders;
use crate::persistence::SaveRequester;
use crate::reward::RewardDispatcher;
use crate::state::PlayerStateStore;
use crate::types::Actor;
use std::sync::Arc;
use tracing::{debug, info};

const DISABLED_MESSAGE: &str = "The welcome command is disabled!";
const SELF_WELCOME_MESSAGE: &str = "You cannot welcome yourself!";

/// Result of one welcome attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum WelcomeOutcome {
    Welcomed {
        reward_given: bool,
        amount: f64,
        display: String,
    },
    Disabled,
    SelfWelcome,
    AlreadyWelcomed,
    WindowExpired,
    OnCooldown {
        remaining_secs: u64,
    },
}

impl WelcomeOutcome {
    pub fn is_welcomed(&self) -> bool {
        matches!(self, WelcomeOutcome::Welcomed { .. })
    }
}

/// Drives welcomes and joins against the shared store, dispatcher and host.
#[derive(Clone)]
pub struct WelcomeService {
    store: Arc<PlayerStateStore>,
    dispatcher: Arc<RewardDispatcher>,
    config: Arc<SharedConfig>,
    primary: PrimaryContext,
    saver: SaveRequester,
}

impl WelcomeService {
    pub fn new(
        store: Arc<PlayerStateStore>,
        dispatcher: Arc<RewardDispatcher>,
        config: Arc<SharedConfig>,
        primary: PrimaryContext,
        saver: SaveRequester,
    ) -> Self {
        Self {
            store,
            dispatcher,
            config,
            primary,
            saver,
        }
    }

    pub fn store(&self) -> &Arc<PlayerStateStore> {
        &self.store
    }

    /// `welcomer` welcomes `target`. The welcomer is told about every
    /// rejection; on success the whole server sees the welcome message and the
    /// welcomer is rewarded.
    ///
    /// The target is marked welcomed and the welcomer's cooldown starts whether
    /// or not the reward could be delivered.
    pub async fn welcome(&self, welcomer: &Actor, target: &Actor) -> WelcomeOutcome {
        let active = self.config.current();
        let settings = &active.settings.welcome_command;

        if !settings.enabled {
            self.reply(welcomer, DISABLED_MESSAGE.to_string());
            return WelcomeOutcome::Disabled;
        }

        if welcomer.id == target.id {
            self.reply(welcomer, SELF_WELCOME_MESSAGE.to_string());
            return WelcomeOutcome::SelfWelcome;
        }

        if !self.store.is_new_player(&target.id) {
            self.reply(welcomer, settings.no_new_players_message.clone());
            return WelcomeOutcome::AlreadyWelcomed;
        }

        if !self.store.is_within_welcome_window(&target.id) {
            self.reply(welcomer, settings.expired_message.clone());
            return WelcomeOutcome::WindowExpired;
        }

        if self.store.is_on_cooldown(&welcomer.id) {
            let remaining_secs = self.store.remaining_cooldown(&welcomer.id);
            let message = Placeholders::new()
                .player(&welcomer.name)
                .seconds(remaining_secs)
                .render(&settings.cooldown_message);
            self.reply(welcomer, message);
            return WelcomeOutcome::OnCooldown { remaining_secs };
        }

        // Another welcomer may have claimed the target since the check above.
        if !self.store.try_mark_welcomed(target.id) {
            self.reply(welcomer, settings.no_new_players_message.clone());
            return WelcomeOutcome::AlreadyWelcomed;
        }
        self.store.set_cooldown(welcomer.id);
        self.saver.request_save();

        self.primary.broadcast(
            Placeholders::new()
                .player(&welcomer.name)
                .target(&target.name)
                .render(&settings.welcome_message),
        );

        let amount = settings.reward_amount;
        let reward_given = self.dispatcher.give_reward(welcomer, amount).await;
        let display = self.dispatcher.display(amount);

        let template = if reward_given {
            &settings.success_message
        } else {
            &settings.reward_failed_message
        };
        self.reply(
            welcomer,
            Placeholders::new()
                .player(&welcomer.name)
                .target(&target.name)
                .reward(amount, &display)
                .render(template),
        );

        info!(
            "👋 {} welcomed {} (reward delivered: {})",
            welcomer.name, target.name, reward_given
        );

        WelcomeOutcome::Welcomed {
            reward_given,
            amount,
            display,
        }
    }

    /// Records a join and, for brand new players, broadcasts the first-join
    /// announcement. Returns whether the announcement was sent.
    pub fn on_join(&self, actor: &Actor) -> bool {
        self.store.record_join(actor.id);

        let active = self.config.current();
        let first_join = &active.settings.first_join;
        if !first_join.enabled || !self.store.is_new_player(&actor.id) {
            debug!("{} joined", actor.name);
            return false;
        }

        let placeholders = Placeholders::new()
            .player(&actor.name)
            .unique_join_count(self.store.unique_join_count() + 1);
        for line in &first_join.lines {
            self.primary.broadcast(placeholders.render(line));
        }
        true
    }

    fn reply(&self, actor: &Actor, message: String) {
        self.primary.send_message(actor, message);
    }
}

impl std::fmt::Debug for WelcomeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WelcomeService")
            .field("store", &self.store)
            .field("reward", &self.dispatcher.selection())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActiveConfig, WelcomerConfig};
    use crate::host::testing::RecordingHost;
    use crate::persistence::LedgerWriter;
    use crate::reward::testing::{Behaviour, TestLedger};
    use crate::reward::{RewardBackends, RewardProviders};
    use crate::storage::MemoryLedgerStorage;
    use std::time::Duration;
    use tokio::time::advance;

    struct Fixture {
        service: WelcomeService,
        host: Arc<RecordingHost>,
        ledger: Arc<TestLedger>,
        config: Arc<SharedConfig>,
        storage: Arc<MemoryLedgerStorage>,
        writer: LedgerWriter,
    }

    fn fixture(settings: WelcomerConfig, ledger_behaviour: Behaviour) -> Fixture {
        let active = ActiveConfig::new(settings).unwrap();
        let selection = active.reward.clone();
        let config = Arc::new(SharedConfig::new(active));
        let store = Arc::new(PlayerStateStore::new(config.clone()));

        let host = Arc::new(RecordingHost::default());
        let (primary, _task) = PrimaryContext::spawn(host.clone());
        let backends = RewardBackends::new(
            RewardProviders {
                ledger_installed: true,
                ..Default::default()
            },
            primary.clone(),
        );
        let ledger = TestLedger::new(ledger_behaviour);
        backends.ledger_hook().register(ledger.clone());
        let dispatcher = Arc::new(RewardDispatcher::new(backends, &selection));

        let storage = Arc::new(MemoryLedgerStorage::new());
        let writer = LedgerWriter::spawn(store.clone(), storage.clone());
        let service = WelcomeService::new(
            store,
            dispatcher,
            config.clone(),
            primary,
            writer.requester(),
        );

        Fixture {
            service,
            host,
            ledger,
            config,
            storage,
            writer,
        }
    }

    fn messages_for(host: &RecordingHost, name: &str) -> Vec<String> {
        host.messages
            .lock()
            .iter()
            .filter(|(to, _)| to == name)
            .map(|(_, message)| message.clone())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_welcome() {
        let f = fixture(WelcomerConfig::default(), Behaviour::Succeed);
        let alice = Actor::from_name("Alice");
        let bob = Actor::from_name("Bob");

        f.service.on_join(&alice);
        advance(Duration::from_secs(30)).await;

        let outcome = f.service.welcome(&bob, &alice).await;
        assert_eq!(
            outcome,
            WelcomeOutcome::Welcomed {
                reward_given: true,
                amount: 100.0,
                display: "dollars".to_string(),
            }
        );

        let store = f.service.store();
        assert!(!store.is_new_player(&alice.id));
        assert!(store.is_on_cooldown(&bob.id));
        assert_eq!(store.unique_join_count(), 1);
        assert_eq!(f.ledger.deposits.lock().as_slice(), &[(bob.id, 100.0)]);

        f.service.primary.flush().await;
        assert_eq!(
            f.host.broadcasts.lock().as_slice(),
            &["Welcome to the server, Alice! Welcomed by Bob".to_string()]
        );
        assert_eq!(
            messages_for(&f.host, "Bob"),
            vec!["You welcomed a new player and received 100 dollars!".to_string()]
        );

        f.writer.shutdown().await.unwrap();
        assert_eq!(f.storage.saved().unwrap().welcomed_players, vec![alice.id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections() {
        let f = fixture(WelcomerConfig::default(), Behaviour::Succeed);
        let alice = Actor::from_name("Alice");
        let bob = Actor::from_name("Bob");
        let carol = Actor::from_name("Carol");

        assert_eq!(f.service.welcome(&bob, &bob).await, WelcomeOutcome::SelfWelcome);
        assert_eq!(
            f.service.welcome(&bob, &alice).await,
            WelcomeOutcome::WindowExpired
        );

        f.service.on_join(&alice);
        assert!(f.service.welcome(&bob, &alice).await.is_welcomed());
        assert_eq!(
            f.service.welcome(&carol, &alice).await,
            WelcomeOutcome::AlreadyWelcomed
        );

        f.service.on_join(&carol);
        advance(Duration::from_millis(1500)).await;
        assert_eq!(
            f.service.welcome(&bob, &carol).await,
            WelcomeOutcome::OnCooldown { remaining_secs: 58 }
        );

        f.service.primary.flush().await;
        let bob_messages = messages_for(&f.host, "Bob");
        assert_eq!(bob_messages[0], SELF_WELCOME_MESSAGE);
        assert_eq!(bob_messages[1], "This player can no longer be welcomed!");
        assert_eq!(
            bob_messages.last().unwrap(),
            "Please wait 58 seconds before using this command again!"
        );
        assert_eq!(f.ledger.deposits.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reward_failure_still_commits_welcome() {
        let f = fixture(WelcomerConfig::default(), Behaviour::Fail);
        let alice = Actor::from_name("Alice");
        let bob = Actor::from_name("Bob");

        f.service.on_join(&alice);
        let outcome = f.service.welcome(&bob, &alice).await;
        assert!(matches!(
            outcome,
            WelcomeOutcome::Welcomed {
                reward_given: false,
                ..
            }
        ));
        assert!(!f.service.store().is_new_player(&alice.id));
        assert!(f.service.store().is_on_cooldown(&bob.id));

        f.service.primary.flush().await;
        assert_eq!(
            messages_for(&f.host, "Bob"),
            vec!["You welcomed a new player, but the reward could not be delivered.".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_command() {
        let mut settings = WelcomerConfig::default();
        settings.welcome_command.enabled = false;
        let f = fixture(settings, Behaviour::Succeed);
        let alice = Actor::from_name("Alice");

        f.service.on_join(&alice);
        assert_eq!(
            f.service.welcome(&Actor::from_name("Bob"), &alice).await,
            WelcomeOutcome::Disabled
        );
        assert!(f.service.store().is_new_player(&alice.id));
        assert!(f.ledger.deposits.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_join_announcement() {
        let mut settings = WelcomerConfig::default();
        settings.first_join.enabled = true;
        settings.first_join.line_count = 2;
        settings.first_join.lines = vec![
            "Welcome %player_name%!".to_string(),
            "You are player #%unique_join_count%".to_string(),
        ];
        let f = fixture(settings, Behaviour::Succeed);
        let alice = Actor::from_name("Alice");
        let bob = Actor::from_name("Bob");

        assert!(f.service.on_join(&alice));
        f.service.welcome(&bob, &alice).await;
        // Already welcomed players are not announced again
        assert!(!f.service.on_join(&alice));
        assert!(f.service.on_join(&bob));

        f.service.primary.flush().await;
        let broadcasts = f.host.broadcasts.lock().clone();
        assert_eq!(
            broadcasts,
            vec![
                "Welcome Alice!".to_string(),
                "You are player #1".to_string(),
                "Welcome to the server, Alice! Welcomed by Bob".to_string(),
                "Welcome Bob!".to_string(),
                "You are player #2".to_string(),
            ]
        );
        assert!(f.config.current().settings.first_join.enabled);
    }
}
