//! Oregon's Omens: an optional card deck layered over the base rules.
//!
//! This module contains:
//! - The shared deck, discard pile and active effects ([`OmensState`])
//! - Drawing and playing cards
//! - The cost, production and trade-rate modifier pipelines that the economy
//!   and production engines consult
//! - Turn and roll bookkeeping that expires duration effects
//! - The omen award for the first player to purchase five cards
//!
//! All state lives in [`GameState::omens`] and every player's hand; nothing
//! here is global, so a snapshot replays exactly.

pub mod cards;
pub mod effects;

pub use cards::{OmenCard, OmenClass, OmenOutcome, OmenTiming};
pub use effects::{ActiveEffect, EffectKind};

use crate::actions::GameEvent;
use crate::board::{PlayerId, Resource};
use crate::economy::{self, BuildKind};
use crate::game::{GameError, GamePhase, GameState, RobberCause, TurnStage};
use crate::placement::RoadRule;
use crate::player::ResourceHand;
use crate::rng::GameRng;
use im::Vector;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Maximum cards a player may hold
pub const OMEN_HAND_LIMIT: usize = 5;

/// Purchases needed for the omen award
pub const OMEN_AWARD_THRESHOLD: u32 = 5;

/// Victory points the omen award is worth
pub const OMEN_AWARD_POINTS: u32 = 2;

/// Deck, discard pile and effects in play
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OmensState {
    /// Draw pile; the next card is at the back
    pub deck: Vector<OmenCard>,
    pub discard: Vector<OmenCard>,
    /// In activation order
    pub active_effects: Vector<ActiveEffect>,
    pub next_effect_seq: u64,
    /// First player to reach the purchase threshold
    pub award_holder: Option<PlayerId>,
}

impl OmensState {
    /// A freshly shuffled standard deck
    pub fn new(rng: &mut GameRng) -> Self {
        let mut deck = OmenCard::standard_deck();
        deck.shuffle(rng);
        Self {
            deck: deck.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Effects attached to `player`, in activation order
    pub fn effects_for(&self, player: PlayerId) -> impl Iterator<Item = &ActiveEffect> {
        self.active_effects.iter().filter(move |e| e.player == player)
    }

    /// Cards left to draw before a reshuffle
    pub fn cards_remaining(&self) -> usize {
        self.deck.len()
    }

    fn activate(&mut self, player: PlayerId, source: OmenCard, kind: EffectKind) -> u64 {
        let seq = self.next_effect_seq;
        self.next_effect_seq += 1;
        self.active_effects.push_back(ActiveEffect {
            seq,
            player,
            source,
            kind,
        });
        seq
    }

    fn remove_effect(&mut self, seq: u64) {
        self.active_effects.retain(|e| e.seq != seq);
    }
}

/// `player`'s effects filtered and sorted by (stage, activation order)
fn staged_effects<'a>(
    state: &'a GameState,
    player: PlayerId,
    filter: impl Fn(&EffectKind) -> bool,
) -> Vec<&'a ActiveEffect> {
    let mut effects: Vec<&ActiveEffect> = state
        .omens
        .effects_for(player)
        .filter(|e| filter(&e.kind))
        .collect();
    effects.sort_by_key(|e| (e.kind.stage(), e.seq));
    effects
}

// ==================== Modifier Pipelines ====================

/// Base cost with every active cost effect for `player` applied:
/// surcharges first, then discounts, each in activation order
pub fn effective_build_cost(state: &GameState, player: PlayerId, kind: BuildKind) -> ResourceHand {
    staged_effects(state, player, EffectKind::affects_cost)
        .into_iter()
        .fold(kind.base_cost(), |cost, e| e.kind.modify_cost(kind, cost))
}

/// Amount a production grant yields after `player`'s production effects
pub fn modified_production(state: &GameState, player: PlayerId, resource: Resource, base: u32) -> u32 {
    staged_effects(state, player, EffectKind::affects_production)
        .into_iter()
        .fold(base, |amount, e| e.kind.modify_production(resource, amount))
}

/// Resolve the trade rate and the override it would consume, if any
fn resolve_trade_rate(state: &GameState, player: PlayerId, resource: Resource) -> (u32, Option<u64>) {
    let harbor = economy::trade_rate(&state.board, player, resource);
    let penalized = state
        .omens
        .effects_for(player)
        .fold(harbor, |rate, e| e.kind.modify_trade_rate(rate));

    let override_effect = state
        .omens
        .effects_for(player)
        .find_map(|e| match e.kind {
            EffectKind::TradeRateOverride { rate } => Some((e.seq, rate)),
            _ => None,
        });

    match override_effect {
        Some((seq, rate)) if rate < penalized => (rate, Some(seq)),
        _ => (penalized, None),
    }
}

/// Trade rate for `player` giving `resource`: harbor rate, plus active
/// penalties, then the earliest one-shot override if it improves the rate.
///
/// Returns the rate together with the state after the override (if used) is
/// consumed; callers apply both or neither.
pub fn effective_trade_rate(state: &GameState, player: PlayerId, resource: Resource) -> (u32, GameState) {
    let (rate, consumed) = resolve_trade_rate(state, player, resource);
    let mut next = state.clone();
    if let Some(seq) = consumed {
        next.omens.remove_effect(seq);
    }
    (rate, next)
}

/// The rate [`effective_trade_rate`] would return, without consuming anything
pub fn peek_trade_rate(state: &GameState, player: PlayerId, resource: Resource) -> u32 {
    resolve_trade_rate(state, player, resource).0
}

/// Road adjacency rule currently in force for `player`
pub fn road_rule_for(state: &GameState, player: PlayerId) -> RoadRule {
    let free = state
        .omens
        .effects_for(player)
        .any(|e| matches!(e.kind, EffectKind::RoadFreedom { .. }));
    if free {
        RoadRule::Unrestricted
    } else {
        RoadRule::Connected
    }
}

/// Whether `player` holds an unused ward against debuffs
pub fn has_debuff_ward(state: &GameState, player: PlayerId) -> bool {
    state
        .omens
        .effects_for(player)
        .any(|e| e.kind == EffectKind::DebuffWard)
}

// ==================== Draw & Play ====================

fn require_omens(state: &GameState, player: PlayerId) -> Result<usize, GameError> {
    if !state.config.omens_enabled {
        return Err(GameError::OmensDisabled);
    }
    state.require_main_stage(player)?;
    state.player_index(player).ok_or(GameError::UnknownPlayer(player))
}

/// Whether `player` may draw right now
pub fn can_draw_omen(state: &GameState, player: PlayerId) -> bool {
    require_omens(state, player).is_ok()
        && state.player(player).is_some_and(|p| p.omens_hand.len() < OMEN_HAND_LIMIT)
        && !(state.omens.deck.is_empty() && state.omens.discard.is_empty())
        && economy::can_afford(state, player, BuildKind::OmenCard)
}

/// Whether `player` may play `card` right now
pub fn can_play_omen(state: &GameState, player: PlayerId, card: OmenCard) -> bool {
    require_omens(state, player).is_ok()
        && state
            .player(player)
            .is_some_and(|p| !p.omen_played_this_turn && p.omens_hand.contains(&card))
}

/// Pay for and draw the top card, resolving it if it acts on draw
pub fn draw_omen(state: &mut GameState, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
    let idx = require_omens(state, player)?;
    if state.players[idx].omens_hand.len() >= OMEN_HAND_LIMIT {
        return Err(GameError::OmenHandFull);
    }
    if state.omens.deck.is_empty() && state.omens.discard.is_empty() {
        return Err(GameError::OmenDeckEmpty);
    }

    let cost = effective_build_cost(state, player, BuildKind::OmenCard);
    if !state.players[idx].resources.try_subtract(&cost) {
        return Err(GameError::CannotAfford(
            state.players[idx].resources.missing(&cost),
        ));
    }

    let mut events = Vec::new();
    if state.omens.deck.is_empty() {
        let mut cards: Vec<OmenCard> = state.omens.discard.iter().copied().collect();
        cards.shuffle(&mut state.rng);
        state.omens.deck = cards.into_iter().collect();
        state.omens.discard = Vector::new();
        events.push(GameEvent::OmenDeckReshuffled {
            cards: state.omens.deck.len(),
        });
    }

    let card = state.omens.deck.pop_back().ok_or(GameError::OmenDeckEmpty)?;
    state.players[idx].omens_purchased += 1;
    events.push(GameEvent::OmenDrawn { player, card });

    match card.timing() {
        OmenTiming::OnPlay => state.players[idx].omens_hand.push(card),
        OmenTiming::OnDraw => {
            let ward = if card.is_debuff() {
                state
                    .omens
                    .effects_for(player)
                    .find(|e| e.kind == EffectKind::DebuffWard)
                    .map(|e| e.seq)
            } else {
                None
            };
            match ward {
                Some(seq) => {
                    state.omens.remove_effect(seq);
                    events.push(GameEvent::OmenWarded { player, card });
                }
                None => events.extend(resolve(state, player, card)),
            }
            state.omens.discard.push_back(card);
        }
    }

    events.extend(check_omen_award(state, player));
    Ok(events)
}

/// Play `card` from hand. At most one card per turn.
pub fn play_omen(state: &mut GameState, player: PlayerId, card: OmenCard) -> Result<Vec<GameEvent>, GameError> {
    let idx = require_omens(state, player)?;
    if state.players[idx].omen_played_this_turn {
        return Err(GameError::OmenAlreadyPlayed);
    }
    if !state.players[idx].take_omen(card) {
        return Err(GameError::NoSuchCard(card.name().to_string()));
    }

    state.players[idx].omen_played_this_turn = true;
    state.omens.discard.push_back(card);

    let mut events = vec![GameEvent::OmenPlayed { player, card }];
    events.extend(resolve(state, player, card));
    Ok(events)
}

/// Apply a card's outcome to `player`
fn resolve(state: &mut GameState, player: PlayerId, card: OmenCard) -> Vec<GameEvent> {
    let Some(idx) = state.player_index(player) else {
        return Vec::new();
    };

    match card.outcome() {
        OmenOutcome::Gain(hand) => {
            state.players[idx].resources.add_hand(&hand);
            vec![GameEvent::OmenResources {
                player,
                card,
                gained: hand,
                lost: ResourceHand::new(),
            }]
        }
        OmenOutcome::Loss(hand) => {
            let lost = state.players[idx].resources.saturating_subtract(&hand);
            vec![GameEvent::OmenResources {
                player,
                card,
                gained: ResourceHand::new(),
                lost,
            }]
        }
        OmenOutcome::Effect(kind) => {
            state.omens.activate(player, card, kind);
            vec![GameEvent::OmenEffectStarted { player, card }]
        }
        OmenOutcome::RobberMove => {
            state.phase = GamePhase::Playing(TurnStage::RobberMove {
                cause: RobberCause::RobbersRegret,
            });
            vec![GameEvent::RobberActivated {
                player,
                cause: RobberCause::RobbersRegret,
            }]
        }
    }
}

// ==================== Bookkeeping ====================

/// End-of-turn reset for the player whose turn is ending: clears the
/// per-turn play flag and advances that player's turn-counted effects
pub fn reset_player_omens_flags_for_new_turn(state: &mut GameState, player: PlayerId) -> Vec<GameEvent> {
    if let Some(idx) = state.player_index(player) {
        state.players[idx].omen_played_this_turn = false;
    }
    tick_effects(state, |e| e.player == player, EffectKind::tick_turn)
}

/// After every dice roll (7 included): advance every roll-counted effect
pub fn apply_production_modifiers_after_roll(state: &mut GameState) -> Vec<GameEvent> {
    tick_effects(state, |_| true, EffectKind::tick_roll)
}

fn tick_effects(
    state: &mut GameState,
    select: impl Fn(&ActiveEffect) -> bool,
    tick: impl Fn(&mut EffectKind) -> bool,
) -> Vec<GameEvent> {
    let mut kept = Vector::new();
    let mut events = Vec::new();
    for mut effect in state.omens.active_effects.iter().cloned() {
        if !select(&effect) || tick(&mut effect.kind) {
            kept.push_back(effect);
        } else {
            events.push(GameEvent::OmenEffectExpired {
                player: effect.player,
                card: effect.source,
            });
        }
    }
    state.omens.active_effects = kept;
    events
}

/// Grant the omen award to `player` if they are the first to reach the
/// purchase threshold
pub fn check_omen_award(state: &mut GameState, player: PlayerId) -> Option<GameEvent> {
    if !state.config.omen_award_enabled || state.omens.award_holder.is_some() {
        return None;
    }
    let purchased = state.player(player)?.omens_purchased;
    if purchased < OMEN_AWARD_THRESHOLD {
        return None;
    }
    state.omens.award_holder = Some(player);
    info!(player, purchased, "omen award granted");
    Some(GameEvent::OmenAwardGranted { player })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;
    use crate::test_support::main_stage_game;
    use pretty_assertions::assert_eq;

    fn stacked(state: &mut GameState, player: PlayerId, cards: &[OmenCard]) {
        let idx = state.player_index(player).unwrap();
        state.omens.deck = cards.iter().rev().copied().collect();
        state.omens.discard = Vector::new();
        state.players[idx].resources = ResourceHand::with_amounts(0, 0, 10, 10, 10);
    }

    #[test]
    fn test_draw_pays_cost_and_counts_purchase() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        stacked(&mut state, p, &[OmenCard::BountifulHarvest]);

        assert_eq!(state.omens.cards_remaining(), 1);
        let events = draw_omen(&mut state, p).unwrap();
        assert_eq!(state.omens.cards_remaining(), 0);
        let player = state.player(p).unwrap();
        assert_eq!(player.resources, ResourceHand::with_amounts(0, 0, 9, 9, 9));
        assert_eq!(player.omens_hand, vec![OmenCard::BountifulHarvest]);
        assert_eq!(player.omens_purchased, 1);
        assert!(events.contains(&GameEvent::OmenDrawn {
            player: p,
            card: OmenCard::BountifulHarvest
        }));
    }

    #[test]
    fn test_hand_limit() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        stacked(&mut state, p, &[OmenCard::BarnRaising; 6]);

        for _ in 0..OMEN_HAND_LIMIT {
            draw_omen(&mut state, p).unwrap();
        }
        assert!(matches!(draw_omen(&mut state, p), Err(GameError::OmenHandFull)));
        assert!(!can_draw_omen(&state, p));
    }

    #[test]
    fn test_disabled_omens_reject_draws() {
        let mut state = main_stage_game(GameConfig {
            omens_enabled: false,
            ..GameConfig::default()
        });
        let p = state.current_player_id();
        assert!(matches!(draw_omen(&mut state, p), Err(GameError::OmensDisabled)));
    }

    #[test]
    fn test_empty_deck_reshuffles_discard() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        stacked(&mut state, p, &[]);
        state.omens.discard = vec![OmenCard::TrailProvisions, OmenCard::TrailProvisions]
            .into_iter()
            .collect();

        let events = draw_omen(&mut state, p).unwrap();
        assert!(events.contains(&GameEvent::OmenDeckReshuffled { cards: 2 }));
        assert_eq!(state.omens.cards_remaining(), 1);
        // Trail Provisions resolves immediately and goes back to the discard
        assert_eq!(state.omens.discard.len(), 1);

        state.omens.deck = Vector::new();
        state.omens.discard = Vector::new();
        assert!(matches!(draw_omen(&mut state, p), Err(GameError::OmenDeckEmpty)));
    }

    #[test]
    fn test_debuff_loss_clamps_at_zero() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        stacked(&mut state, p, &[OmenCard::BotchedRiverCrossing]);

        draw_omen(&mut state, p).unwrap();
        let hand = state.player(p).unwrap().resources;
        // Cost paid (sheep, wheat, ore), then 1 ore lost and no wood to lose
        assert_eq!(hand, ResourceHand::with_amounts(0, 0, 9, 9, 8));
    }

    #[test]
    fn test_stacked_surcharges_are_cumulative() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        stacked(&mut state, p, &[OmenCard::BrokenWagonAxle, OmenCard::BrokenWagonAxle]);

        draw_omen(&mut state, p).unwrap();
        draw_omen(&mut state, p).unwrap();
        assert_eq!(
            effective_build_cost(&state, p, BuildKind::Road),
            ResourceHand::with_amounts(3, 1, 0, 0, 0)
        );
    }

    #[test]
    fn test_surcharge_applies_before_discount() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        // Discount activated first, surcharge second: the surcharge still runs first
        state.omens.activate(
            p,
            OmenCard::BarnRaising,
            EffectKind::CostDiscount {
                build: BuildKind::Settlement,
                waived: ResourceHand::with_amounts(2, 0, 0, 0, 0),
                turns_remaining: 2,
            },
        );
        state.omens.activate(
            p,
            OmenCard::BrokenWagonAxle,
            EffectKind::CostSurcharge {
                build: BuildKind::Settlement,
                extra: ResourceHand::single(Resource::Wood, 1),
                turns_remaining: 2,
            },
        );
        assert_eq!(
            effective_build_cost(&state, p, BuildKind::Settlement),
            ResourceHand::with_amounts(0, 1, 1, 1, 0)
        );
    }

    #[test]
    fn test_pantry_negates_exactly_one_debuff() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        stacked(
            &mut state,
            p,
            &[OmenCard::WellStockedPantry, OmenCard::HarshWinter, OmenCard::HarshWinter],
        );

        draw_omen(&mut state, p).unwrap();
        play_omen(&mut state, p, OmenCard::WellStockedPantry).unwrap();
        assert!(has_debuff_ward(&state, p));

        let events = draw_omen(&mut state, p).unwrap();
        assert!(events.contains(&GameEvent::OmenWarded {
            player: p,
            card: OmenCard::HarshWinter
        }));
        assert!(!has_debuff_ward(&state, p));
        assert_eq!(effective_build_cost(&state, p, BuildKind::City).ore, 3);

        draw_omen(&mut state, p).unwrap();
        assert_eq!(effective_build_cost(&state, p, BuildKind::City).ore, 4);
    }

    #[test]
    fn test_one_play_per_turn() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        let idx = state.current_player_index;
        state.players[idx].omens_hand = vec![OmenCard::BountifulHarvest, OmenCard::AbandonedWagon];
        state.players[idx].resources = ResourceHand::new();

        play_omen(&mut state, p, OmenCard::BountifulHarvest).unwrap();
        assert_eq!(state.players[idx].resources.wheat, 2);
        assert!(matches!(
            play_omen(&mut state, p, OmenCard::AbandonedWagon),
            Err(GameError::OmenAlreadyPlayed)
        ));
        assert!(!can_play_omen(&state, p, OmenCard::AbandonedWagon));

        reset_player_omens_flags_for_new_turn(&mut state, p);
        assert!(can_play_omen(&state, p, OmenCard::AbandonedWagon));
    }

    #[test]
    fn test_playing_a_card_not_in_hand() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        assert!(matches!(
            play_omen(&mut state, p, OmenCard::BarnRaising),
            Err(GameError::NoSuchCard(_))
        ));
    }

    #[test]
    fn test_trade_override_consumed_only_when_it_improves() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        state.omens.activate(p, OmenCard::FortVancouverTradingPost, EffectKind::TradeRateOverride { rate: 2 });

        let harbor = economy::trade_rate(&state.board, p, Resource::Wood);
        let (rate, after) = effective_trade_rate(&state, p, Resource::Wood);
        if harbor > 2 {
            assert_eq!(rate, 2);
            assert_eq!(after.omens.active_effects.len(), 0);
        } else {
            assert_eq!(rate, harbor);
            assert_eq!(after.omens.active_effects.len(), 1);
        }
        // Peeking never consumes
        assert_eq!(peek_trade_rate(&state, p, Resource::Wood), rate);
        assert_eq!(state.omens.active_effects.len(), 1);
    }

    #[test]
    fn test_penalty_raises_rate() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        let harbor = economy::trade_rate(&state.board, p, Resource::Sheep);
        state.omens.activate(
            p,
            OmenCard::SwindlingMerchant,
            EffectKind::TradeRatePenalty {
                extra: 1,
                turns_remaining: 2,
            },
        );
        assert_eq!(peek_trade_rate(&state, p, Resource::Sheep), harbor + 1);

        reset_player_omens_flags_for_new_turn(&mut state, p);
        assert_eq!(peek_trade_rate(&state, p, Resource::Sheep), harbor + 1);
        let events = reset_player_omens_flags_for_new_turn(&mut state, p);
        assert_eq!(
            events,
            vec![GameEvent::OmenEffectExpired {
                player: p,
                card: OmenCard::SwindlingMerchant
            }]
        );
        assert_eq!(peek_trade_rate(&state, p, Resource::Sheep), harbor);
    }

    #[test]
    fn test_turn_ticks_only_touch_the_ending_player() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        let other = state.players.iter().map(|pl| pl.id).find(|id| *id != p).unwrap();
        state.omens.activate(other, OmenCard::PathfindersMap, EffectKind::RoadFreedom { turns_remaining: 1 });

        reset_player_omens_flags_for_new_turn(&mut state, p);
        assert_eq!(road_rule_for(&state, other), RoadRule::Unrestricted);
        reset_player_omens_flags_for_new_turn(&mut state, other);
        assert_eq!(road_rule_for(&state, other), RoadRule::Connected);
    }

    #[test]
    fn test_roll_ticks_expire_production_effects() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        state.omens.activate(
            p,
            OmenCard::Drought,
            EffectKind::ProductionBlock {
                resource: Resource::Wheat,
                rolls_remaining: 3,
            },
        );
        assert_eq!(modified_production(&state, p, Resource::Wheat, 2), 0);

        apply_production_modifiers_after_roll(&mut state);
        apply_production_modifiers_after_roll(&mut state);
        assert_eq!(modified_production(&state, p, Resource::Wheat, 2), 0);
        apply_production_modifiers_after_roll(&mut state);
        assert_eq!(modified_production(&state, p, Resource::Wheat, 2), 2);
    }

    #[test]
    fn test_award_goes_to_first_player_over_threshold() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        let other = state.players.iter().map(|pl| pl.id).find(|id| *id != p).unwrap();
        let idx = state.player_index(other).unwrap();
        state.players[idx].omens_purchased = 7;
        state.omens.award_holder = Some(other);

        stacked(&mut state, p, &[OmenCard::BarnRaising; 5]);
        for _ in 0..5 {
            draw_omen(&mut state, p).unwrap();
        }
        assert_eq!(state.omens.award_holder, Some(other));
    }

    #[test]
    fn test_award_counts_purchases_not_hand() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        stacked(&mut state, p, &[OmenCard::TrailProvisions; 5]);

        let mut last = Vec::new();
        for _ in 0..5 {
            last = draw_omen(&mut state, p).unwrap();
        }
        assert!(state.player(p).unwrap().omens_hand.is_empty());
        assert!(last.contains(&GameEvent::OmenAwardGranted { player: p }));
        assert_eq!(state.omens.award_holder, Some(p));
    }

    #[test]
    fn test_award_can_be_disabled() {
        let mut state = main_stage_game(GameConfig {
            omen_award_enabled: false,
            ..GameConfig::default()
        });
        let p = state.current_player_id();
        let idx = state.current_player_index;
        state.players[idx].omens_purchased = 9;
        assert_eq!(check_omen_award(&mut state, p), None);
    }
}
