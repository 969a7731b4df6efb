//! Lasting Omens effects and how each one modifies costs, production and
//! trade rates.
//!
//! Every effect kind answers the same small set of questions (what does it do
//! to this cost, this grant, this trade rate, and does it survive the next
//! tick), so callers fold over the active list without matching on kinds.

use super::cards::OmenCard;
use crate::board::{PlayerId, Resource};
use crate::economy::BuildKind;
use crate::player::ResourceHand;
use serde::{Deserialize, Serialize};

/// A modifier attached to one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Adds resources to the cost of one build kind
    CostSurcharge {
        build: BuildKind,
        extra: ResourceHand,
        turns_remaining: u32,
    },
    /// Waives resources from the cost of one build kind
    CostDiscount {
        build: BuildKind,
        waived: ResourceHand,
        turns_remaining: u32,
    },
    /// Every production grant to the player yields `extra` more
    ProductionBonus { extra: u32, rolls_remaining: u32 },
    /// Grants of `resource` to the player yield nothing
    ProductionBlock {
        resource: Resource,
        rolls_remaining: u32,
    },
    /// Bank trades cost `extra` more of the given resource
    TradeRatePenalty { extra: u32, turns_remaining: u32 },
    /// The next bank trade that this improves happens at `rate`
    TradeRateOverride { rate: u32 },
    /// Roads need not connect to the player's network
    RoadFreedom { turns_remaining: u32 },
    /// Negates the next debuff the player draws
    DebuffWard,
}

impl EffectKind {
    /// Application order within one modifier pipeline; lower runs first.
    /// Surcharges apply before discounts, bonuses before blocks.
    pub fn stage(&self) -> u8 {
        match self {
            EffectKind::CostSurcharge { .. }
            | EffectKind::ProductionBonus { .. }
            | EffectKind::TradeRatePenalty { .. } => 0,
            EffectKind::CostDiscount { .. }
            | EffectKind::ProductionBlock { .. }
            | EffectKind::TradeRateOverride { .. } => 1,
            EffectKind::RoadFreedom { .. } | EffectKind::DebuffWard => 2,
        }
    }

    /// Apply this effect's contribution to the cost of `build`
    pub fn modify_cost(&self, build: BuildKind, cost: ResourceHand) -> ResourceHand {
        match self {
            EffectKind::CostSurcharge { build: b, extra, .. } if *b == build => {
                let mut cost = cost;
                cost.add_hand(extra);
                cost
            }
            EffectKind::CostDiscount { build: b, waived, .. } if *b == build => {
                let mut cost = cost;
                cost.saturating_subtract(waived);
                cost
            }
            _ => cost,
        }
    }

    /// Apply this effect's contribution to a single production grant
    pub fn modify_production(&self, resource: Resource, amount: u32) -> u32 {
        match self {
            EffectKind::ProductionBonus { extra, .. } if amount > 0 => amount + extra,
            EffectKind::ProductionBlock { resource: r, .. } if *r == resource => 0,
            _ => amount,
        }
    }

    /// Apply this effect's additive contribution to a trade rate.
    /// One-shot overrides are resolved separately because they are consumed.
    pub fn modify_trade_rate(&self, rate: u32) -> u32 {
        match self {
            EffectKind::TradeRatePenalty { extra, .. } => rate + extra,
            _ => rate,
        }
    }

    pub fn affects_cost(&self) -> bool {
        matches!(
            self,
            EffectKind::CostSurcharge { .. } | EffectKind::CostDiscount { .. }
        )
    }

    pub fn affects_production(&self) -> bool {
        matches!(
            self,
            EffectKind::ProductionBonus { .. } | EffectKind::ProductionBlock { .. }
        )
    }

    /// Advance a turn-counted effect at the end of its owner's turn.
    /// Returns false once the effect has expired.
    pub fn tick_turn(&mut self) -> bool {
        match self {
            EffectKind::CostSurcharge { turns_remaining, .. }
            | EffectKind::CostDiscount { turns_remaining, .. }
            | EffectKind::TradeRatePenalty { turns_remaining, .. }
            | EffectKind::RoadFreedom { turns_remaining } => {
                *turns_remaining = turns_remaining.saturating_sub(1);
                *turns_remaining > 0
            }
            _ => true,
        }
    }

    /// Advance a roll-counted effect after any dice roll.
    /// Returns false once the effect has expired.
    pub fn tick_roll(&mut self) -> bool {
        match self {
            EffectKind::ProductionBonus { rolls_remaining, .. }
            | EffectKind::ProductionBlock { rolls_remaining, .. } => {
                *rolls_remaining = rolls_remaining.saturating_sub(1);
                *rolls_remaining > 0
            }
            _ => true,
        }
    }
}

/// An effect in play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEffect {
    /// Activation order, unique per game
    pub seq: u64,
    pub player: PlayerId,
    /// Card that created the effect
    pub source: OmenCard,
    pub kind: EffectKind,
}
