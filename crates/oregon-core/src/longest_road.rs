//! Longest road: the longest trail through one player's roads.

use crate::actions::GameEvent;
use crate::board::{Board, PlayerId};
use crate::game::GameState;
use crate::topology::{EdgeId, VertexId};
use std::collections::HashSet;
use tracing::info;

/// Minimum length that earns the award
pub const MIN_LONGEST_ROAD: usize = 6;

/// Victory points the award is worth
pub const LONGEST_ROAD_POINTS: u32 = 2;

/// Length of `player`'s longest trail, never reusing an edge.
///
/// Edges owned by anyone else, or by no one, break continuity. Structures on
/// vertices do not.
pub fn longest_road_length(board: &Board, player: PlayerId) -> usize {
    let mut best = 0;
    let mut visited = HashSet::new();
    for edge in board.roads_of(player) {
        let Some(e) = board.edge(edge) else {
            continue;
        };
        for start in e.vertices {
            best = best.max(walk(board, player, start, &mut visited));
        }
    }
    best
}

fn walk(board: &Board, player: PlayerId, at: VertexId, visited: &mut HashSet<EdgeId>) -> usize {
    let Some(vertex) = board.vertex(at) else {
        return 0;
    };

    let mut best = 0;
    for &edge in &vertex.edges {
        if board.road_owner(edge) != Some(player) || visited.contains(&edge) {
            continue;
        }
        let Some(next) = board.edge(edge).and_then(|e| e.other_end(at)) else {
            continue;
        };
        visited.insert(edge);
        best = best.max(1 + walk(board, player, next, visited));
        visited.remove(&edge);
    }
    best
}

/// Re-evaluate the award after a road is placed.
///
/// With no holder, the longest road of at least [`MIN_LONGEST_ROAD`] wins it.
/// The holder keeps it on a tie; only a strictly longer road takes it away.
/// Between equally long challengers the active player goes first, then seat
/// order.
pub fn update_longest_road(state: &mut GameState) -> Option<GameEvent> {
    let lengths: Vec<(PlayerId, usize)> = state
        .players
        .iter()
        .map(|p| (p.id, longest_road_length(&state.board, p.id)))
        .collect();

    let holder = state.longest_road_player;
    let bar = holder
        .and_then(|h| lengths.iter().find(|(p, _)| *p == h).map(|(_, len)| *len))
        .map(|len| len + 1)
        .unwrap_or(MIN_LONGEST_ROAD)
        .max(MIN_LONGEST_ROAD);

    let active = state.current_player_id();
    let challenger = lengths
        .iter()
        .enumerate()
        .filter(|(_, (p, len))| Some(*p) != holder && *len >= bar)
        .max_by_key(|(seat, (p, len))| (*len, *p == active, std::cmp::Reverse(*seat)))
        .map(|(_, (p, len))| (*p, *len))?;

    let (player, length) = challenger;
    state.longest_road_player = Some(player);
    info!(player, length, previous = ?holder, "longest road awarded");
    Some(GameEvent::LongestRoadChanged {
        player,
        previous: holder,
        length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Hex, Terrain};
    use crate::game::GameConfig;
    use crate::hex::HexCoord;
    use crate::test_support::main_stage_with_board;

    fn two_row_board() -> Board {
        let hexes = (0..4)
            .map(|q| Hex::new(q as usize, HexCoord::new(q, 0), Terrain::Wood, 5))
            .collect();
        Board::new(hexes)
    }

    /// Lay roads along the top zigzag of the row, `count` edges long
    fn top_path(board: &Board, count: usize) -> Vec<EdgeId> {
        let mut path = Vec::new();
        let mut vertices = Vec::new();
        for hex in 0..board.hex_count() {
            let c = board.hex_corners(hex).unwrap();
            if vertices.is_empty() {
                vertices.push(c[4]);
            }
            vertices.push(c[5]);
            vertices.push(c[0]);
        }
        for pair in vertices.windows(2).take(count) {
            path.push(board.edge_between(pair[0], pair[1]).unwrap());
        }
        path
    }

    #[test]
    fn test_no_roads() {
        let board = two_row_board();
        assert_eq!(longest_road_length(&board, 1), 0);
    }

    #[test]
    fn test_straight_path() {
        let mut board = two_row_board();
        for e in top_path(&board, 5) {
            board.place_road(e, 1);
        }
        assert_eq!(longest_road_length(&board, 1), 5);
    }

    #[test]
    fn test_branch_counts_longest_arm() {
        let mut board = two_row_board();
        let path = top_path(&board, 4);
        for e in &path {
            board.place_road(*e, 1);
        }
        // Spur hanging down from a middle vertex
        let c = board.hex_corners(0).unwrap();
        let spur = board.edge_between(c[0], c[1]).unwrap();
        board.place_road(spur, 1);
        assert_eq!(longest_road_length(&board, 1), 4);
    }

    #[test]
    fn test_loop_counts_every_edge_once() {
        let mut board = two_row_board();
        let c = board.hex_corners(0).unwrap();
        for i in 0..6 {
            board.place_road(board.edge_between(c[i], c[(i + 1) % 6]).unwrap(), 1);
        }
        assert_eq!(longest_road_length(&board, 1), 6);
    }

    #[test]
    fn test_opponent_edge_breaks_continuity() {
        let mut board = two_row_board();
        let path = top_path(&board, 7);
        for (i, e) in path.iter().enumerate() {
            board.place_road(*e, if i == 3 { 2 } else { 1 });
        }
        assert_eq!(longest_road_length(&board, 1), 3);
        assert_eq!(longest_road_length(&board, 2), 1);
    }

    #[test]
    fn test_award_needs_six() {
        let mut state = main_stage_with_board(GameConfig::default(), two_row_board());
        let p = state.current_player_id();
        let path = top_path(&state.board, 6);
        for e in &path[..5] {
            state.board.place_road(*e, p);
        }
        assert_eq!(update_longest_road(&mut state), None);

        state.board.place_road(path[5], p);
        assert_eq!(
            update_longest_road(&mut state),
            Some(GameEvent::LongestRoadChanged {
                player: p,
                previous: None,
                length: 6
            })
        );
        assert_eq!(state.longest_road_player, Some(p));
    }

    #[test]
    fn test_tie_keeps_holder_and_longer_takes_it() {
        let mut state = main_stage_with_board(GameConfig::default(), two_row_board());
        let holder = state.players[1].id;
        let challenger = state.current_player_id();
        state.longest_road_player = Some(holder);

        // Holder: top zigzag of 6; challenger: bottom zigzag
        for e in top_path(&state.board, 6) {
            state.board.place_road(e, holder);
        }
        let mut bottom = Vec::new();
        for hex in 0..state.board.hex_count() {
            let c = state.board.hex_corners(hex).unwrap();
            if bottom.is_empty() {
                bottom.push(c[3]);
            }
            bottom.push(c[2]);
            bottom.push(c[1]);
        }
        let edges: Vec<EdgeId> = bottom
            .windows(2)
            .map(|w| state.board.edge_between(w[0], w[1]).unwrap())
            .collect();

        for e in &edges[..6] {
            state.board.place_road(*e, challenger);
        }
        assert_eq!(update_longest_road(&mut state), None);
        assert_eq!(state.longest_road_player, Some(holder));

        state.board.place_road(edges[6], challenger);
        let event = update_longest_road(&mut state).unwrap();
        assert_eq!(
            event,
            GameEvent::LongestRoadChanged {
                player: challenger,
                previous: Some(holder),
                length: 7
            }
        );
    }
}
