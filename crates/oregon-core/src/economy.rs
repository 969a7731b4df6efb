//! Building costs, affordability and bank trading.
//!
//! Base costs live here; the Omens layer adjusts them per player through
//! [`crate::omens::effective_build_cost`]. Trades are with the bank only,
//! at 4:1 unless a harbor grants 3:1 (generic) or 2:1 (specific).

use crate::board::{Board, HarborKind, PlayerId, Resource};
use crate::game::{GameError, GameState};
use crate::omens;
use crate::player::ResourceHand;
use serde::{Deserialize, Serialize};

/// Default bank exchange rate
pub const BANK_RATE: u32 = 4;

/// Things a player can pay for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildKind {
    Road,
    Settlement,
    City,
    OmenCard,
}

impl BuildKind {
    /// Cost before any Omens modifiers
    pub fn base_cost(&self) -> ResourceHand {
        match self {
            // 1 wood, 1 brick
            BuildKind::Road => ResourceHand::with_amounts(1, 1, 0, 0, 0),
            // 1 wood, 1 brick, 1 sheep, 1 wheat
            BuildKind::Settlement => ResourceHand::with_amounts(1, 1, 1, 1, 0),
            // 2 wheat, 3 ore
            BuildKind::City => ResourceHand::with_amounts(0, 0, 0, 2, 3),
            // 1 sheep, 1 wheat, 1 ore
            BuildKind::OmenCard => ResourceHand::with_amounts(0, 0, 1, 1, 1),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuildKind::Road => "road",
            BuildKind::Settlement => "settlement",
            BuildKind::City => "city",
            BuildKind::OmenCard => "omen card",
        }
    }
}

/// Cost before any Omens modifiers
pub fn base_cost(kind: BuildKind) -> ResourceHand {
    kind.base_cost()
}

/// Whether `player` can pay the effective cost of `kind`
pub fn can_afford(state: &GameState, player: PlayerId, kind: BuildKind) -> bool {
    state.player(player).is_some() && missing_resources(state, player, kind).is_empty()
}

/// Whether `hand` covers `cost`
pub fn can_afford_with_cost(hand: &ResourceHand, cost: &ResourceHand) -> bool {
    hand.can_afford(cost)
}

/// Per-resource shortfall against the effective cost of `kind`.
/// Empty exactly when the player can afford it. Unknown players are short
/// the whole cost.
pub fn missing_resources(state: &GameState, player: PlayerId, kind: BuildKind) -> Vec<(Resource, u32)> {
    let cost = omens::effective_build_cost(state, player, kind);
    match state.player(player) {
        Some(p) => p.resources.missing(&cost),
        None => ResourceHand::new().missing(&cost),
    }
}

/// Best harbor-derived rate for giving `resource`, ignoring Omens effects
pub fn trade_rate(board: &Board, player: PlayerId, resource: Resource) -> u32 {
    board
        .player_harbors(player)
        .into_iter()
        .filter_map(|kind| match kind {
            HarborKind::Generic => Some(kind.rate()),
            HarborKind::Specific(r) if r == resource => Some(kind.rate()),
            HarborKind::Specific(_) => None,
        })
        .fold(BANK_RATE, u32::min)
}

/// Check a bank trade without applying it, using the non-consuming rate
pub fn can_bank_trade(state: &GameState, player: PlayerId, give: Resource, get: Resource) -> bool {
    give != get
        && state.is_main_stage_for(player)
        && state.player(player).is_some_and(|p| {
            p.resources.get(give) >= omens::peek_trade_rate(state, player, give)
        })
}

/// Trade `rate` units of `give` for one `get`.
///
/// The rate is resolved through the Omens layer, which may consume a one-shot
/// override; the consumption and the exchange land on `state` together or not
/// at all. Returns the rate paid.
pub fn bank_trade(
    state: &mut GameState,
    player: PlayerId,
    give: Resource,
    get: Resource,
) -> Result<u32, GameError> {
    if give == get {
        return Err(GameError::InvalidTrade("Cannot trade a resource for itself".into()));
    }
    state.require_main_stage(player)?;

    let (rate, resolved) = omens::effective_trade_rate(state, player, give);
    let mut next = resolved;
    let idx = next.player_index(player).ok_or(GameError::UnknownPlayer(player))?;

    let mut hand = next.players[idx].resources;
    if !hand.try_subtract(&ResourceHand::single(give, rate)) {
        return Err(GameError::InvalidTrade(format!(
            "Need {} {} to trade at {}:1",
            rate,
            give.name(),
            rate
        )));
    }
    hand.add(get, 1);
    next.players[idx].resources = hand;

    *state = next;
    Ok(rate)
}
