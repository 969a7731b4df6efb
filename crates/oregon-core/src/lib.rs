//! Settlers of Oregon - a Catan-style game engine with the Oregon's Omens variant
//!
//! This crate provides the core game logic, including:
//! - Hex coordinate system and the vertex/edge topology derived from it
//! - Board representation with hexes, structures, roads and harbors
//! - Player state and resource management
//! - The Oregon's Omens deck and its lasting effects
//! - Game state machine with full rule enforcement
//!
//! # Architecture
//!
//! The engine is a pure rules library. Every transition takes a `GameState`
//! and returns a new one, so callers can keep history, diff states, or throw a
//! candidate state away. It can be compiled to:
//! - Native Rust for simulations and server-side hosting
//! - WebAssembly for an in-browser client (`wasm` feature)
//!
//! # Modules
//!
//! - [`hex`]: Axial hex coordinates
//! - [`topology`]: Vertices and edges derived from a hex layout
//! - [`board`]: The board, standard layout generator and board queries
//! - [`player`]: Players and resource hands
//! - [`economy`]: Costs and bank trades
//! - [`placement`]: Where settlements, roads and cities may go
//! - [`production`]: Dice production and the robber
//! - [`longest_road`]: The longest road award
//! - [`omens`]: The Oregon's Omens card variant
//! - [`game`]: Game state machine
//! - [`policy`]: Simulated players

pub mod actions;
pub mod board;
pub mod economy;
pub mod game;
pub mod hex;
pub mod longest_road;
pub mod omens;
pub mod placement;
pub mod player;
pub mod policy;
pub mod production;
pub mod rng;
pub mod topology;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent, LogEntry, LogKind};
pub use board::{Board, Harbor, HarborKind, Hex, HexId, PlayerId, Resource, Structure, StructureKind, Terrain};
pub use economy::BuildKind;
pub use game::{GameConfig, GameError, GamePhase, GameState, RobberCause, SnapshotError, TurnStage};
pub use hex::HexCoord;
pub use omens::{OmenCard, OmenClass};
pub use placement::RoadRule;
pub use player::{Player, PlayerColor, ResourceHand};
pub use policy::{GreedyPolicy, Policy, RandomPolicy};
pub use rng::GameRng;
pub use topology::{Edge, EdgeId, Vertex, VertexId};

/// Fixtures shared by the unit tests
#[cfg(test)]
pub(crate) mod test_support {
    use crate::board::Board;
    use crate::game::{GameConfig, GamePhase, GameState, TurnStage};

    const NAMES: [&str; 3] = ["Abigail", "Jedediah", "Narcissa"];

    /// Three players in the lobby on the seed-7 board
    pub fn new_game(config: GameConfig) -> GameState {
        GameState::new(config, &NAMES, 7).unwrap()
    }

    /// Roll order resolved, nothing placed yet
    pub fn setup_game(config: GameConfig) -> GameState {
        let mut state = new_game(config);
        state = state.try_apply(1, crate::GameAction::StartGame).unwrap().0;
        while let GamePhase::RollOrder(order) = &state.phase {
            let roller = order.next_roller().unwrap();
            state = state.try_apply(roller, crate::GameAction::RollForOrder).unwrap().0;
        }
        assert_eq!(state.phase, GamePhase::Setup);
        state
    }

    /// Setup played out with the first legal placement each time, then
    /// dropped straight into the first player's main stage
    pub fn main_stage_game(config: GameConfig) -> GameState {
        let mut state = setup_game(config);
        while state.phase == GamePhase::Setup {
            let p = state.current_player_id();
            let action = state.valid_actions(p).into_iter().next().unwrap();
            state = state.try_apply(p, action).unwrap().0;
        }
        state.phase = GamePhase::Playing(TurnStage::Main);
        state
    }

    /// A custom board with no setup: empty board, seat 0 in the main stage
    pub fn main_stage_with_board(config: GameConfig, board: Board) -> GameState {
        let mut state = GameState::with_board(config, &NAMES, board, 7).unwrap();
        state.phase = GamePhase::Playing(TurnStage::Main);
        state.current_player_index = 0;
        state.turn_number = 1;
        state
    }
}
