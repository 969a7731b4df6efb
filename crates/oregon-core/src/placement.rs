//! Placement legality for settlements, roads and cities.
//!
//! Every check includes whose turn it is, the phase and stage, and whether
//! the player still has a piece of that kind. Affordability is not part of
//! legality; the orchestrator checks cost separately so it can report what is
//! missing.

use crate::board::{Board, PlayerId, StructureKind};
use crate::game::{GamePhase, GameState};
use crate::topology::{EdgeId, VertexId};
use serde::{Deserialize, Serialize};

/// Whether a road must connect to the player's network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadRule {
    /// Road must touch the player's structure or road
    Connected,
    /// Adjacency suspended (Pathfinder's Map)
    Unrestricted,
}

/// Vertex exists, is empty, and no neighbouring vertex holds a structure
pub fn satisfies_distance_rule(board: &Board, vertex: VertexId) -> bool {
    match board.vertex(vertex) {
        Some(v) => {
            !v.is_occupied()
                && v.neighbors
                    .iter()
                    .all(|n| board.structure_at(*n).is_none())
        }
        None => false,
    }
}

fn touches_own_road(board: &Board, vertex: VertexId, player: PlayerId) -> bool {
    board
        .vertex(vertex)
        .is_some_and(|v| v.edges.iter().any(|e| board.road_owner(*e) == Some(player)))
}

/// Whether a road on `edge` would join `player`'s network.
///
/// An endpoint connects when it holds the player's own structure or when
/// another of the player's roads meets there. Opponent structures at the
/// endpoint do not cut the network.
pub fn road_connects(board: &Board, edge: EdgeId, player: PlayerId) -> bool {
    let Some(e) = board.edge(edge) else {
        return false;
    };
    e.vertices.iter().any(|v| {
        board.structure_at(*v).is_some_and(|s| s.owner == player)
            || board.vertex(*v).is_some_and(|vx| {
                vx.edges
                    .iter()
                    .any(|other| *other != edge && board.road_owner(*other) == Some(player))
            })
    })
}

fn edge_is_free(board: &Board, edge: EdgeId) -> bool {
    board.edge(edge).is_some_and(|e| e.road.is_none())
}

/// Whether `player` may put a settlement on `vertex` right now
pub fn can_place_settlement(state: &GameState, vertex: VertexId, player: PlayerId) -> bool {
    if !state.is_active(player) {
        return false;
    }
    if !state.player(player).is_some_and(|p| p.settlements_remaining > 0) {
        return false;
    }
    if !satisfies_distance_rule(&state.board, vertex) {
        return false;
    }

    match &state.phase {
        GamePhase::Setup => state.setup_pending_vertex.is_none(),
        GamePhase::Playing(_) => {
            state.is_main_stage_for(player) && touches_own_road(&state.board, vertex, player)
        }
        _ => false,
    }
}

/// Whether `player` may build a road on `edge` during their main stage
pub fn can_place_road(state: &GameState, edge: EdgeId, player: PlayerId, rule: RoadRule) -> bool {
    state.is_main_stage_for(player)
        && state.player(player).is_some_and(|p| p.roads_remaining > 0)
        && edge_is_free(&state.board, edge)
        && (rule == RoadRule::Unrestricted || road_connects(&state.board, edge, player))
}

/// Whether `player` may place their setup road on `edge`: it must leave the
/// settlement they just placed
pub fn can_place_road_in_setup(state: &GameState, edge: EdgeId, player: PlayerId) -> bool {
    if !matches!(state.phase, GamePhase::Setup) || !state.is_active(player) {
        return false;
    }
    if !state.player(player).is_some_and(|p| p.roads_remaining > 0) {
        return false;
    }
    match state.setup_pending_vertex {
        Some(vertex) => {
            edge_is_free(&state.board, edge)
                && state.board.edge(edge).is_some_and(|e| e.touches(vertex))
        }
        None => false,
    }
}

/// Whether `player` may upgrade their settlement on `vertex`
pub fn can_build_city(state: &GameState, vertex: VertexId, player: PlayerId) -> bool {
    state.is_main_stage_for(player)
        && state.player(player).is_some_and(|p| p.cities_remaining > 0)
        && state
            .board
            .structure_at(vertex)
            .is_some_and(|s| s.owner == player && s.kind == StructureKind::Settlement)
}

// ==================== Enumerations ====================

/// Every vertex where `player` may place a settlement now
pub fn placeable_vertices(state: &GameState, player: PlayerId) -> Vec<VertexId> {
    (0..state.board.vertex_count())
        .filter(|v| can_place_settlement(state, *v, player))
        .collect()
}

/// Every edge where `player` may place a road now. During setup this is the
/// set of roads leaving the pending settlement.
pub fn placeable_roads(state: &GameState, player: PlayerId, rule: RoadRule) -> Vec<EdgeId> {
    (0..state.board.edge_count())
        .filter(|e| match state.phase {
            GamePhase::Setup => can_place_road_in_setup(state, *e, player),
            _ => can_place_road(state, *e, player, rule),
        })
        .collect()
}

/// Placeable roads incident to `vertex`
pub fn placeable_roads_for_vertex(
    state: &GameState,
    player: PlayerId,
    vertex: VertexId,
    rule: RoadRule,
) -> Vec<EdgeId> {
    let Some(v) = state.board.vertex(vertex) else {
        return Vec::new();
    };
    v.edges
        .iter()
        .copied()
        .filter(|e| match state.phase {
            GamePhase::Setup => can_place_road_in_setup(state, *e, player),
            _ => can_place_road(state, *e, player, rule),
        })
        .collect()
}

/// Every settlement of `player` that can become a city now
pub fn upgradeable_vertices(state: &GameState, player: PlayerId) -> Vec<VertexId> {
    state
        .board
        .structures_of(player)
        .map(|(v, _)| v)
        .filter(|v| can_build_city(state, *v, player))
        .collect()
}
