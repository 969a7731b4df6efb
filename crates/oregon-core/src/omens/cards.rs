//! The Oregon's Omens card list.

use super::effects::EffectKind;
use crate::board::Resource;
use crate::economy::BuildKind;
use crate::player::ResourceHand;
use serde::{Deserialize, Serialize};

/// Whether a card helps or hurts the player who draws it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OmenClass {
    Buff,
    Debuff,
}

/// When a card takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OmenTiming {
    /// Resolved the moment it is drawn, then discarded
    OnDraw,
    /// Kept in hand until the player chooses to play it
    OnPlay,
}

/// What resolving a card does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OmenOutcome {
    /// Bank pays the player
    Gain(ResourceHand),
    /// Player loses up to this much (clamped at what they hold)
    Loss(ResourceHand),
    /// Attach a lasting effect to the player
    Effect(EffectKind),
    /// Player moves the robber and may steal
    RobberMove,
}

/// Every named card in the Omens deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OmenCard {
    // ==================== Buffs kept in hand ====================
    BountifulHarvest,
    AbandonedWagon,
    WellStockedPantry,
    PathfindersMap,
    RobbersRegret,
    FortVancouverTradingPost,
    WillametteValleyBloom,
    BarnRaising,

    // ==================== Buffs resolved on draw ====================
    TrailProvisions,

    // ==================== Debuffs resolved on draw ====================
    Dysentery,
    BrokenWagonAxle,
    BotchedRiverCrossing,
    Drought,
    SwindlingMerchant,
    HarshWinter,
}

impl OmenCard {
    pub const ALL: [OmenCard; 15] = [
        OmenCard::BountifulHarvest,
        OmenCard::AbandonedWagon,
        OmenCard::WellStockedPantry,
        OmenCard::PathfindersMap,
        OmenCard::RobbersRegret,
        OmenCard::FortVancouverTradingPost,
        OmenCard::WillametteValleyBloom,
        OmenCard::BarnRaising,
        OmenCard::TrailProvisions,
        OmenCard::Dysentery,
        OmenCard::BrokenWagonAxle,
        OmenCard::BotchedRiverCrossing,
        OmenCard::Drought,
        OmenCard::SwindlingMerchant,
        OmenCard::HarshWinter,
    ];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            OmenCard::BountifulHarvest => "Bountiful Harvest",
            OmenCard::AbandonedWagon => "Abandoned Wagon",
            OmenCard::WellStockedPantry => "Well-Stocked Pantry",
            OmenCard::PathfindersMap => "Pathfinder's Map",
            OmenCard::RobbersRegret => "Robber's Regret",
            OmenCard::FortVancouverTradingPost => "Fort Vancouver Trading Post",
            OmenCard::WillametteValleyBloom => "Willamette Valley Bloom",
            OmenCard::BarnRaising => "Barn Raising",
            OmenCard::TrailProvisions => "Trail Provisions",
            OmenCard::Dysentery => "Dysentery",
            OmenCard::BrokenWagonAxle => "Broken Wagon Axle",
            OmenCard::BotchedRiverCrossing => "Botched River Crossing",
            OmenCard::Drought => "Drought",
            OmenCard::SwindlingMerchant => "Swindling Merchant",
            OmenCard::HarshWinter => "Harsh Winter",
        }
    }

    /// Rules text shown to players
    pub fn description(&self) -> &'static str {
        match self {
            OmenCard::BountifulHarvest => "Gain 2 wheat.",
            OmenCard::AbandonedWagon => "Gain 1 wood and 1 brick.",
            OmenCard::WellStockedPantry => "The next debuff you draw has no effect.",
            OmenCard::PathfindersMap => "Roads you build this turn need not connect to your network.",
            OmenCard::RobbersRegret => "Move the robber and you may steal from a player on the new hex.",
            OmenCard::FortVancouverTradingPost => "Your next bank trade is at 2:1.",
            OmenCard::WillametteValleyBloom => "Your production grants one extra unit for the next 3 rolls.",
            OmenCard::BarnRaising => "Settlements cost no wood or brick until the end of your next turn.",
            OmenCard::TrailProvisions => "Gain 1 sheep and 1 wheat.",
            OmenCard::Dysentery => "Lose 1 wheat and 1 sheep.",
            OmenCard::BrokenWagonAxle => "Roads cost 1 extra wood until the end of your next turn.",
            OmenCard::BotchedRiverCrossing => "Lose 1 ore and 1 wood.",
            OmenCard::Drought => "Your wheat hexes produce nothing for the next 3 rolls.",
            OmenCard::SwindlingMerchant => "Bank trades cost 1 extra until the end of your next turn.",
            OmenCard::HarshWinter => "Cities cost 1 extra ore until the end of your next turn.",
        }
    }

    pub fn class(&self) -> OmenClass {
        match self {
            OmenCard::Dysentery
            | OmenCard::BrokenWagonAxle
            | OmenCard::BotchedRiverCrossing
            | OmenCard::Drought
            | OmenCard::SwindlingMerchant
            | OmenCard::HarshWinter => OmenClass::Debuff,
            _ => OmenClass::Buff,
        }
    }

    pub fn timing(&self) -> OmenTiming {
        match (self.class(), self) {
            (OmenClass::Debuff, _) | (_, OmenCard::TrailProvisions) => OmenTiming::OnDraw,
            _ => OmenTiming::OnPlay,
        }
    }

    pub fn is_debuff(&self) -> bool {
        self.class() == OmenClass::Debuff
    }

    /// Copies of this card in the standard deck
    pub fn copies(&self) -> usize {
        match self {
            OmenCard::BarnRaising
            | OmenCard::BotchedRiverCrossing
            | OmenCard::SwindlingMerchant
            | OmenCard::HarshWinter => 1,
            _ => 2,
        }
    }

    /// What resolving this card does
    pub fn outcome(&self) -> OmenOutcome {
        match self {
            OmenCard::BountifulHarvest => OmenOutcome::Gain(ResourceHand::single(Resource::Wheat, 2)),
            OmenCard::AbandonedWagon => OmenOutcome::Gain(ResourceHand::with_amounts(1, 1, 0, 0, 0)),
            OmenCard::WellStockedPantry => OmenOutcome::Effect(EffectKind::DebuffWard),
            OmenCard::PathfindersMap => OmenOutcome::Effect(EffectKind::RoadFreedom { turns_remaining: 1 }),
            OmenCard::RobbersRegret => OmenOutcome::RobberMove,
            OmenCard::FortVancouverTradingPost => OmenOutcome::Effect(EffectKind::TradeRateOverride { rate: 2 }),
            OmenCard::WillametteValleyBloom => OmenOutcome::Effect(EffectKind::ProductionBonus {
                extra: 1,
                rolls_remaining: 3,
            }),
            OmenCard::BarnRaising => OmenOutcome::Effect(EffectKind::CostDiscount {
                build: BuildKind::Settlement,
                waived: ResourceHand::with_amounts(1, 1, 0, 0, 0),
                turns_remaining: 2,
            }),
            OmenCard::TrailProvisions => OmenOutcome::Gain(ResourceHand::with_amounts(0, 0, 1, 1, 0)),
            OmenCard::Dysentery => OmenOutcome::Loss(ResourceHand::with_amounts(0, 0, 1, 1, 0)),
            OmenCard::BrokenWagonAxle => OmenOutcome::Effect(EffectKind::CostSurcharge {
                build: BuildKind::Road,
                extra: ResourceHand::single(Resource::Wood, 1),
                turns_remaining: 2,
            }),
            OmenCard::BotchedRiverCrossing => OmenOutcome::Loss(ResourceHand::with_amounts(1, 0, 0, 0, 1)),
            OmenCard::Drought => OmenOutcome::Effect(EffectKind::ProductionBlock {
                resource: Resource::Wheat,
                rolls_remaining: 3,
            }),
            OmenCard::SwindlingMerchant => OmenOutcome::Effect(EffectKind::TradeRatePenalty {
                extra: 1,
                turns_remaining: 2,
            }),
            OmenCard::HarshWinter => OmenOutcome::Effect(EffectKind::CostSurcharge {
                build: BuildKind::City,
                extra: ResourceHand::single(Resource::Ore, 1),
                turns_remaining: 2,
            }),
        }
    }

    /// The unshuffled 26-card deck
    pub fn standard_deck() -> Vec<OmenCard> {
        Self::ALL
            .iter()
            .flat_map(|card| std::iter::repeat(*card).take(card.copies()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_size() {
        let deck = OmenCard::standard_deck();
        assert_eq!(deck.len(), 26);

        let debuffs = deck.iter().filter(|c| c.is_debuff()).count();
        assert_eq!(debuffs, 9);
    }

    #[test]
    fn test_debuffs_resolve_on_draw() {
        for card in OmenCard::ALL {
            if card.is_debuff() {
                assert_eq!(card.timing(), OmenTiming::OnDraw, "{}", card.name());
            }
        }
        assert_eq!(OmenCard::TrailProvisions.timing(), OmenTiming::OnDraw);
        assert_eq!(OmenCard::BountifulHarvest.timing(), OmenTiming::OnPlay);
    }

    #[test]
    fn test_loss_cards_only_take_resources() {
        for card in [OmenCard::Dysentery, OmenCard::BotchedRiverCrossing] {
            match card.outcome() {
                OmenOutcome::Loss(hand) => assert_eq!(hand.total(), 2),
                other => panic!("unexpected outcome {:?}", other),
            }
        }
    }
}
