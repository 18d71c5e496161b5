//! Core identity types and timing constants shared by every component.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Stable, globally unique identifier of a player.
pub type ActorId = Uuid;

/// How long after joining a player may still be welcomed.
pub const WELCOME_WINDOW: Duration = Duration::from_secs(60);

/// Default cooldown between two successful welcomes by the same player.
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

/// Default age after which cooldown entries are evicted by the reaper.
pub const DEFAULT_COOLDOWN_RETENTION_SECS: u64 = 300;

/// Default reaper cadence.
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 60;

/// A player as seen by the welcome flow: its identity plus the display name
/// that host-facing messages and commands need.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
}

impl Actor {
    pub fn new(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Creates an actor whose id is derived from its name, so the same name
    /// always maps to the same identity across restarts.
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.to_lowercase().as_bytes());
        Self { id, name }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_from_name_is_stable() {
        let a = Actor::from_name("Steve");
        let b = Actor::from_name("steve");
        assert_eq!(a.id, b.id);
        assert_eq!(a.name, "Steve");
        assert_ne!(a.id, Actor::from_name("Alex").id);
    }
}
