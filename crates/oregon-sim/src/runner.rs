//! Self-play game runner.

use crate::config::{PolicyKind, SimConfig};
use oregon_core::{GameConfig, GameError, GameState, GreedyPolicy, PlayerId, Policy, RandomPolicy, SnapshotError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const NAMES: [&str; 4] = ["Abigail", "Jedediah", "Narcissa", "Ezra"];

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Engine rejected a policy action: {0}")]
    Engine(#[from] GameError),

    #[error("Snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Could not write snapshot: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one simulated game
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    pub seed: u64,
    pub winner: Option<String>,
    pub turns: u32,
    pub actions: usize,
    /// Name and final victory points, in seat order
    pub scores: Vec<(String, u32)>,
    pub longest_road: Option<String>,
    pub omen_award: Option<String>,
    /// Omens cards still in the draw pile
    pub omen_cards_left: usize,
}

impl GameSummary {
    fn from_state(state: &GameState, seed: u64, actions: usize) -> Self {
        let name = |id: PlayerId| state.player_name(id);
        Self {
            seed,
            winner: state.winner().map(name),
            turns: state.turn_number,
            actions,
            scores: state.players.iter().map(|p| (p.name.clone(), p.victory_points)).collect(),
            longest_road: state.longest_road_player.map(name),
            omen_award: state.omens.award_holder.map(name),
            omen_cards_left: state.omens.cards_remaining(),
        }
    }
}

fn seat_policies(config: &SimConfig, seed: u64) -> Vec<Box<dyn Policy>> {
    (0..config.players as u64)
        .map(|seat| -> Box<dyn Policy> {
            match config.policy {
                PolicyKind::Random => Box::new(RandomPolicy::with_seed(seed ^ (seat + 1))),
                PolicyKind::Greedy => Box::new(GreedyPolicy::with_seed(seed ^ (seat + 1))),
            }
        })
        .collect()
}

/// Play one game to the end or to the action cap
pub fn run_game(config: &SimConfig, seed: u64) -> Result<(GameState, GameSummary), RunError> {
    let game_config = GameConfig {
        omens_enabled: config.omens,
        ..GameConfig::default()
    };
    let mut state = GameState::new(game_config, &NAMES[..config.players], seed)?;
    // Policies are keyed by player id, which is fixed before seats are reordered
    let mut policies = seat_policies(config, seed);

    let mut actions = 0;
    while !state.is_finished() && actions < config.max_actions {
        let player = state.current_player_id();
        let Some(policy) = policies.get_mut(usize::from(player).saturating_sub(1)) else {
            break;
        };
        let Some(action) = policy.choose_action(&state, player) else {
            warn!(seed, player, phase = state.phase.name(), "policy had no action");
            break;
        };
        debug!(seed, player, ?action, "policy chose");
        let (next, _) = state.try_apply(player, action)?;
        state = next;
        actions += 1;
    }

    let summary = GameSummary::from_state(&state, seed, actions);
    match &summary.winner {
        Some(winner) => info!(seed, winner = %winner, turns = summary.turns, actions, "game finished"),
        None => warn!(seed, turns = summary.turns, actions, "game hit the action cap"),
    }
    Ok((state, summary))
}

/// Write `state` as `game-<seed>.json` under `dir`
pub fn write_snapshot(dir: &Path, seed: u64, state: &GameState) -> Result<PathBuf, RunError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("game-{}.json", seed));
    std::fs::write(&path, state.to_json()?)?;
    Ok(path)
}

/// Play every configured game, writing snapshots if a directory is set
pub fn run_all(config: &SimConfig) -> Result<Vec<GameSummary>, RunError> {
    let mut summaries = Vec::with_capacity(config.games);
    for i in 0..config.games as u64 {
        let seed = config.seed.wrapping_add(i);
        let (state, summary) = run_game(config, seed)?;
        if let Some(dir) = &config.snapshot_dir {
            let path = write_snapshot(dir, seed, &state)?;
            debug!(path = %path.display(), "snapshot written");
        }
        summaries.push(summary);
    }
    Ok(summaries)
}

/// Wins per player name, for the closing report
pub fn tally_wins(summaries: &[GameSummary]) -> Vec<(String, usize)> {
    let mut wins: Vec<(String, usize)> = Vec::new();
    for winner in summaries.iter().filter_map(|s| s.winner.as_ref()) {
        match wins.iter_mut().find(|(name, _)| name == winner) {
            Some((_, count)) => *count += 1,
            None => wins.push((winner.clone(), 1)),
        }
    }
    wins.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    wins
}
