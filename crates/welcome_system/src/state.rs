//! Player eligibility state.
//!
//! [`PlayerStateStore`] is the single owner of the three per-player facts the
//! welcome flow needs (welcomed flag, join time, cooldown start) and of the
//! unique-join counter. Steady-state operations go straight to per-key
//! concurrent maps under a shared epoch guard, so they never serialize on each
//! other. Only [`PlayerStateStore::reset`] and [`PlayerStateStore::restore`]
//! take the epoch exclusively, which makes a full reset atomic for readers.

use crate::config::{CooldownSource, ReaperSettings};
use crate::reaper::ExpiryReaper;
use crate::storage::LedgerSnapshot;
use crate::types::{ActorId, WELCOME_WINDOW};
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Number of entries removed by one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub expired_joins: usize,
    pub expired_cooldowns: usize,
}

/// Concurrent, time-windowed store of welcome eligibility.
pub struct PlayerStateStore {
    /// Players that have been welcomed at least once
    welcomed: DashSet<ActorId>,
    /// Start of each player's current session
    join_times: DashMap<ActorId, Instant>,
    /// When each welcomer last welcomed somebody
    cooldowns: DashMap<ActorId, Instant>,
    unique_joins: AtomicU64,
    /// Shared by every steady-state operation, exclusive for reset/restore
    epoch: RwLock<()>,
    cooldown: Arc<dyn CooldownSource>,
}

impl PlayerStateStore {
    /// Creates an empty store. `cooldown` is consulted on every cooldown
    /// query, so configuration reloads apply without rebuilding the store.
    pub fn new(cooldown: Arc<dyn CooldownSource>) -> Self {
        Self {
            welcomed: DashSet::new(),
            join_times: DashMap::new(),
            cooldowns: DashMap::new(),
            unique_joins: AtomicU64::new(0),
            epoch: RwLock::new(()),
            cooldown,
        }
    }

    /// Starts the background sweep that bounds the join and cooldown maps.
    /// Must be called from within a Tokio runtime.
    pub fn start_reaper(self: &Arc<Self>, settings: &ReaperSettings) -> ExpiryReaper {
        ExpiryReaper::spawn(
            Arc::clone(self),
            settings.interval(),
            settings.cooldown_retention(),
        )
    }

    /// True iff `id` has never been welcomed in the current reset epoch.
    pub fn is_new_player(&self, id: &ActorId) -> bool {
        let _epoch = self.epoch.read();
        !self.welcomed.contains(id)
    }

    /// Records the start of a session. A repeated join restarts the window.
    pub fn record_join(&self, id: ActorId) {
        let _epoch = self.epoch.read();
        self.join_times.insert(id, Instant::now());
    }

    pub fn is_within_welcome_window(&self, id: &ActorId) -> bool {
        let _epoch = self.epoch.read();
        match self.join_times.get(id) {
            Some(joined_at) => Instant::now() < *joined_at + WELCOME_WINDOW,
            None => false,
        }
    }

    pub fn is_on_cooldown(&self, actor: &ActorId) -> bool {
        let _epoch = self.epoch.read();
        match self.cooldowns.get(actor) {
            Some(started_at) => match started_at.checked_add(self.cooldown.cooldown()) {
                Some(ends_at) => Instant::now() < ends_at,
                None => true,
            },
            None => false,
        }
    }

    /// Whole seconds left on `actor`'s cooldown, truncated and never negative.
    pub fn remaining_cooldown(&self, actor: &ActorId) -> u64 {
        let _epoch = self.epoch.read();
        let Some(started_at) = self.cooldowns.get(actor).map(|entry| *entry) else {
            return 0;
        };
        match started_at.checked_add(self.cooldown.cooldown()) {
            Some(ends_at) => ends_at.saturating_duration_since(Instant::now()).as_secs(),
            None => u64::MAX,
        }
    }

    /// Starts `actor`'s welcome cooldown now.
    pub fn set_cooldown(&self, actor: ActorId) {
        let _epoch = self.epoch.read();
        self.cooldowns.insert(actor, Instant::now());
    }

    /// Marks `target` as welcomed, closes its welcome window and bumps the
    /// unique-join counter by exactly one.
    ///
    /// The store does not deduplicate: callers check [`Self::is_new_player`]
    /// first. Once this returns, `is_new_player(target)` is false until the
    /// next reset.
    pub fn mark_welcomed(&self, target: ActorId) {
        let _epoch = self.epoch.read();
        self.welcomed.insert(target);
        self.join_times.remove(&target);
        let count = self.unique_joins.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Marked {} as welcomed (unique joins: {})", target, count);
    }

    /// Like [`Self::mark_welcomed`], but only the first caller for a given
    /// target wins. Returns false, changing nothing, if `target` was already
    /// welcomed.
    pub fn try_mark_welcomed(&self, target: ActorId) -> bool {
        let _epoch = self.epoch.read();
        if !self.welcomed.insert(target) {
            return false;
        }
        self.join_times.remove(&target);
        let count = self.unique_joins.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Marked {} as welcomed (unique joins: {})", target, count);
        true
    }

    pub fn unique_join_count(&self) -> u64 {
        let _epoch = self.epoch.read();
        self.unique_joins.load(Ordering::Acquire)
    }

    /// Clears every map and the counter in one step with respect to readers.
    pub fn reset(&self) {
        let _epoch = self.epoch.write();
        self.welcomed.clear();
        self.join_times.clear();
        self.cooldowns.clear();
        self.unique_joins.store(0, Ordering::Release);
        info!("🔄 Player state reset");
    }

    /// Replaces the welcomed set and counter with a persisted snapshot.
    /// Session data (join times, cooldowns) is left untouched.
    pub fn restore(&self, snapshot: LedgerSnapshot) {
        let _epoch = self.epoch.write();
        self.welcomed.clear();
        for id in snapshot.welcomed_players {
            self.welcomed.insert(id);
        }
        self.unique_joins
            .store(snapshot.unique_join_count, Ordering::Release);
        info!(
            "📂 Restored {} welcomed players (unique joins: {})",
            self.welcomed.len(),
            snapshot.unique_join_count
        );
    }

    /// Copies the durable part of the state for the persistence collaborator.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let _epoch = self.epoch.read();
        let mut welcomed_players: Vec<ActorId> = self.welcomed.iter().map(|id| *id).collect();
        welcomed_players.sort_unstable();
        LedgerSnapshot {
            unique_join_count: self.unique_joins.load(Ordering::Acquire),
            welcomed_players,
        }
    }

    /// Drops join entries past the welcome window and cooldown entries older
    /// than `cooldown_retention`. The retention is raised above the current
    /// cooldown if needed so that an active cooldown is never evicted.
    /// Welcomed flags are never touched.
    pub fn sweep_expired(&self, cooldown_retention: Duration) -> SweepStats {
        let _epoch = self.epoch.read();
        let now = Instant::now();
        let retention = cooldown_retention.max(self.cooldown.cooldown() + Duration::from_secs(1));

        let joins_before = self.join_times.len();
        self.join_times
            .retain(|_, joined_at| now.saturating_duration_since(*joined_at) < WELCOME_WINDOW);
        let cooldowns_before = self.cooldowns.len();
        self.cooldowns
            .retain(|_, started_at| now.saturating_duration_since(*started_at) < retention);

        SweepStats {
            expired_joins: joins_before.saturating_sub(self.join_times.len()),
            expired_cooldowns: cooldowns_before.saturating_sub(self.cooldowns.len()),
        }
    }

    /// Number of join entries currently held.
    pub fn tracked_joins(&self) -> usize {
        self.join_times.len()
    }

    /// Number of cooldown entries currently held.
    pub fn tracked_cooldowns(&self) -> usize {
        self.cooldowns.len()
    }
}

impl std::fmt::Debug for PlayerStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerStateStore")
            .field("welcomed", &self.welcomed.len())
            .field("join_times", &self.join_times.len())
            .field("cooldowns", &self.cooldowns.len())
            .field("unique_joins", &self.unique_joins.load(Ordering::Relaxed))
            .finish()
    }
}
