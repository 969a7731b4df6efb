//! Dice-driven production and the robber.
//!
//! A roll is turned into a production plan once: which hexes match, which
//! one the robber sits on, and what each bordering structure grants after
//! Omens modifiers. [`distribute_resources`] applies the plan and the
//! presentation queries read it, so the two always agree.

use crate::board::{HexId, PlayerId, Resource};
use crate::game::GameState;
use crate::omens;
use crate::player::ResourceHand;
use crate::topology::VertexId;

/// Sum that triggers the robber instead of production
pub const ROBBER_ROLL: u8 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Grant {
    player_index: usize,
    resource: Resource,
    amount: u32,
}

#[derive(Debug, Default)]
struct ProductionPlan {
    grants: Vec<Grant>,
    produced: Vec<HexId>,
    blocked: Vec<HexId>,
}

fn production_plan(state: &GameState, dice_sum: u8) -> ProductionPlan {
    let mut plan = ProductionPlan::default();
    if dice_sum == ROBBER_ROLL {
        return plan;
    }

    let board = &state.board;
    for hex in board.hexes().filter(|h| h.number == Some(dice_sum)) {
        let Some(resource) = hex.resource() else {
            continue;
        };
        if hex.id == board.robber_hex() {
            plan.blocked.push(hex.id);
            continue;
        }

        let mut granted = false;
        for vertex in board.hex_corners(hex.id).into_iter().flatten() {
            let Some(structure) = board.structure_at(vertex) else {
                continue;
            };
            let Some(player_index) = state.player_index(structure.owner) else {
                continue;
            };
            let amount = omens::modified_production(state, structure.owner, resource, structure.production());
            if amount > 0 {
                granted = true;
                plan.grants.push(Grant {
                    player_index,
                    resource,
                    amount,
                });
            }
        }
        if granted {
            plan.produced.push(hex.id);
        }
    }
    plan
}

/// Grant production for `dice_sum` and return the units each player received,
/// indexed by seat. Also stored as the state's last resource flash.
pub fn distribute_resources(state: &mut GameState, dice_sum: u8) -> Vec<Vec<Resource>> {
    let plan = production_plan(state, dice_sum);
    let mut flash: Vec<Vec<Resource>> = vec![Vec::new(); state.players.len()];

    for grant in plan.grants {
        state.players[grant.player_index]
            .resources
            .add(grant.resource, grant.amount);
        flash[grant.player_index].extend(std::iter::repeat(grant.resource).take(grant.amount as usize));
    }

    state.last_resource_flash = flash.clone();
    flash
}

/// Hexes matching `dice_sum` that the robber stops from producing
pub fn hexes_blocked_by_robber(state: &GameState, dice_sum: u8) -> Vec<HexId> {
    production_plan(state, dice_sum).blocked
}

/// Hexes that grant at least one unit on `dice_sum`
pub fn hexes_that_produced(state: &GameState, dice_sum: u8) -> Vec<HexId> {
    production_plan(state, dice_sum).produced
}

/// One unit of each bordering resource hex, for a second setup settlement
pub fn give_initial_resources(state: &mut GameState, player: PlayerId, vertex: VertexId) -> ResourceHand {
    let mut hand = ResourceHand::new();
    for resource in state.board.hexes_at_vertex(vertex).filter_map(|h| h.resource()) {
        hand.add(resource, 1);
    }
    if let Some(idx) = state.player_index(player) {
        state.players[idx].resources.add_hand(&hand);
    }
    hand
}

// ==================== Robber ====================

/// Hexes the robber may move to
pub fn robber_targets(state: &GameState) -> Vec<HexId> {
    let robber = state.board.robber_hex();
    state
        .board
        .hexes()
        .map(|h| h.id)
        .filter(|h| *h != robber)
        .collect()
}

/// Legal moves in the robber stage: every other hex, or the robber's own hex
/// when the board has no other, in which case the move leaves it in place
pub fn robber_destinations(state: &GameState) -> Vec<HexId> {
    let targets = robber_targets(state);
    if targets.is_empty() {
        vec![state.board.robber_hex()]
    } else {
        targets
    }
}

/// Players the thief may rob on `hex`: anyone else with a structure there,
/// including players holding nothing
pub fn steal_candidates(state: &GameState, hex: HexId, thief: PlayerId) -> Vec<PlayerId> {
    state
        .board
        .players_on_hex(hex)
        .into_iter()
        .filter(|p| *p != thief)
        .collect()
}

/// Move one unit of a uniformly chosen held kind from victim to thief.
/// Returns `None` when the victim holds nothing.
pub fn steal_resource(state: &mut GameState, thief: PlayerId, victim: PlayerId) -> Option<Resource> {
    let thief_idx = state.player_index(thief)?;
    let victim_idx = state.player_index(victim)?;

    let mut hand = state.players[victim_idx].resources;
    let stolen = hand.steal_random(&mut state.rng)?;
    state.players[victim_idx].resources = hand;
    state.players[thief_idx].resources.add(stolen, 1);
    Some(stolen)
}
