//! Whole-number points backend.

use super::{guard_transfer, PointsProvider, RewardBackend, RewardVariant};
use crate::types::Actor;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Pays rewards as points. Availability is fixed at construction: the points
/// system is either installed or it is not.
pub struct PointsBackend {
    provider: Option<Arc<dyn PointsProvider>>,
}

impl PointsBackend {
    pub fn new(provider: Option<Arc<dyn PointsProvider>>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl RewardBackend for PointsBackend {
    fn variant(&self) -> RewardVariant {
        RewardVariant::Points
    }

    fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    async fn give(&self, actor: &Actor, amount: f64) -> bool {
        let Some(provider) = self.provider.clone() else {
            warn!(
                actor = %actor.id,
                "Points system not available! Reward skipped for {}",
                actor.name
            );
            return false;
        };

        // Points are integral; fractions are dropped.
        let points = amount.trunc() as i64;
        if points < 1 {
            warn!(
                actor = %actor.id,
                "Reward of {} is less than one point, skipped for {}",
                amount,
                actor.name
            );
            return false;
        }

        guard_transfer(self.variant(), actor, provider.give(actor.id, points)).await
    }

    fn display_label(&self, _amount: f64) -> String {
        "points".to_string()
    }
}
