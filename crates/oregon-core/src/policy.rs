//! Action policies for simulated players.
//!
//! A [`Policy`] looks at a state and picks one of the actions that
//! [`GameState::valid_actions`] lists for a player. Two are provided:
//! - [`RandomPolicy`]: uniform over valid actions
//! - [`GreedyPolicy`]: builds whenever it can, on the best-producing spots
//!
//! Any `FnMut(&GameState, PlayerId) -> Option<GameAction>` closure is a
//! policy too, which is handy for scripted tests.

use crate::actions::GameAction;
use crate::board::{PlayerId, Resource};
use crate::game::GameState;
use crate::topology::VertexId;
use rand::prelude::*;

/// Chooses the next action for a player
pub trait Policy {
    /// `None` when the player has nothing to do right now
    fn choose_action(&mut self, state: &GameState, player: PlayerId) -> Option<GameAction>;
}

impl<F> Policy for F
where
    F: FnMut(&GameState, PlayerId) -> Option<GameAction>,
{
    fn choose_action(&mut self, state: &GameState, player: PlayerId) -> Option<GameAction> {
        self(state, player)
    }
}

/// Picks uniformly among valid actions
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for RandomPolicy {
    fn choose_action(&mut self, state: &GameState, player: PlayerId) -> Option<GameAction> {
        state.valid_actions(player).choose(&mut self.rng).cloned()
    }
}

/// Expected rolls out of 36 for a number token
fn pips(number: Option<u8>) -> u32 {
    match number {
        Some(n) if (2..=12).contains(&n) => 6 - (7 - n as i32).unsigned_abs(),
        _ => 0,
    }
}

fn vertex_value(state: &GameState, vertex: VertexId) -> u32 {
    state
        .board
        .hexes_at_vertex(vertex)
        .filter(|h| h.id != state.board.robber_hex())
        .map(|h| pips(h.number))
        .sum()
}

/// Builds as soon as it can afford to, preferring high-yield vertices.
pub struct GreedyPolicy {
    rng: StdRng,
    /// Chance of spending on an Omens card when nothing else is affordable
    omen_appetite: f64,
}

impl GreedyPolicy {
    pub fn new() -> Self {
        Self::with_seed(StdRng::from_entropy().gen())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            omen_appetite: 0.3,
        }
    }

    fn best_vertex<F>(&self, state: &GameState, actions: &[GameAction], pick: F) -> Option<GameAction>
    where
        F: Fn(&GameAction) -> Option<VertexId>,
    {
        actions
            .iter()
            .filter_map(|a| pick(a).map(|v| (a, vertex_value(state, v))))
            .max_by_key(|(_, value)| *value)
            .map(|(a, _)| a.clone())
    }

    fn robber_hex(&self, state: &GameState, player: PlayerId, actions: &[GameAction]) -> Option<GameAction> {
        actions
            .iter()
            .filter_map(|a| match a {
                GameAction::MoveRobber(hex) => Some((a, *hex)),
                _ => None,
            })
            .max_by_key(|(_, hex)| {
                let on_hex = state.board.players_on_hex(*hex);
                let mine = on_hex.contains(&player);
                let opponents = on_hex.iter().filter(|p| **p != player).count();
                let yield_ = state.board.hex(*hex).map(|h| pips(h.number)).unwrap_or(0);
                (!mine, opponents, yield_)
            })
            .map(|(a, _)| a.clone())
    }

    fn richest_victim(&self, state: &GameState, actions: &[GameAction]) -> Option<GameAction> {
        actions
            .iter()
            .filter_map(|a| match a {
                GameAction::StealFrom(victim) => Some((a, *victim)),
                _ => None,
            })
            .max_by_key(|(_, victim)| state.player(*victim).map(|p| p.resources.total()).unwrap_or(0))
            .map(|(a, _)| a.clone())
    }

    /// Trade the most plentiful resource for the scarcest one
    fn rebalance(&self, state: &GameState, player: PlayerId, actions: &[GameAction]) -> Option<GameAction> {
        let hand = state.player(player)?.resources;
        let scarcest = Resource::ALL.into_iter().min_by_key(|r| hand.get(*r))?;
        actions
            .iter()
            .filter(|a| matches!(a, GameAction::BankTrade { get, .. } if *get == scarcest))
            .max_by_key(|a| match a {
                GameAction::BankTrade { give, .. } => hand.get(*give),
                _ => 0,
            })
            .cloned()
    }
}

impl Default for GreedyPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for GreedyPolicy {
    fn choose_action(&mut self, state: &GameState, player: PlayerId) -> Option<GameAction> {
        let actions = state.valid_actions(player);
        if actions.len() <= 1 {
            return actions.into_iter().next();
        }

        let has = |pred: fn(&GameAction) -> bool| actions.iter().any(pred);

        if has(|a| matches!(a, GameAction::PlaceSetupSettlement(_))) {
            return self.best_vertex(state, &actions, |a| match a {
                GameAction::PlaceSetupSettlement(v) => Some(*v),
                _ => None,
            });
        }
        if has(|a| matches!(a, GameAction::PlaceSetupRoad(_))) {
            return actions.choose(&mut self.rng).cloned();
        }
        if has(|a| matches!(a, GameAction::MoveRobber(_))) {
            return self.robber_hex(state, player, &actions);
        }
        // Never declines a Regret steal
        if has(|a| matches!(a, GameAction::StealFrom(_))) {
            return self.richest_victim(state, &actions);
        }

        // ==================== Main stage ====================

        if let Some(play) = actions.iter().find(|a| matches!(a, GameAction::PlayOmen(_))) {
            return Some(play.clone());
        }
        if let Some(city) = self.best_vertex(state, &actions, |a| match a {
            GameAction::BuildCity(v) => Some(*v),
            _ => None,
        }) {
            return Some(city);
        }
        if let Some(settlement) = self.best_vertex(state, &actions, |a| match a {
            GameAction::BuildSettlement(v) => Some(*v),
            _ => None,
        }) {
            return Some(settlement);
        }

        let roads: Vec<_> = actions
            .iter()
            .filter(|a| matches!(a, GameAction::BuildRoad(_)))
            .collect();
        if let Some(road) = roads.choose(&mut self.rng) {
            return Some((*road).clone());
        }

        if actions.contains(&GameAction::DrawOmen) && self.rng.gen_bool(self.omen_appetite) {
            return Some(GameAction::DrawOmen);
        }
        if let Some(trade) = self.rebalance(state, player, &actions) {
            return Some(trade);
        }

        actions
            .iter()
            .find(|a| matches!(a, GameAction::EndTurn))
            .or_else(|| actions.first())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameConfig, GamePhase, TurnStage};
    use crate::omens::OmenCard;
    use crate::player::ResourceHand;
    use crate::test_support::{main_stage_game, new_game, setup_game};

    #[test]
    fn test_pips() {
        assert_eq!(pips(Some(6)), 5);
        assert_eq!(pips(Some(8)), 5);
        assert_eq!(pips(Some(2)), 1);
        assert_eq!(pips(Some(12)), 1);
        assert_eq!(pips(None), 0);
    }

    #[test]
    fn test_random_policy_only_picks_valid_actions() {
        let state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        let valid = state.valid_actions(p);
        let mut policy = RandomPolicy::with_seed(5);
        for _ in 0..20 {
            let action = policy.choose_action(&state, p).unwrap();
            assert!(valid.contains(&action));
        }
    }

    #[test]
    fn test_no_action_for_waiting_player() {
        let state = main_stage_game(GameConfig::default());
        let other = state.players[state.next_player_index()].id;
        assert_eq!(RandomPolicy::with_seed(1).choose_action(&state, other), None);
        assert_eq!(GreedyPolicy::with_seed(1).choose_action(&state, other), None);
    }

    #[test]
    fn test_closure_is_a_policy() {
        let state = new_game(GameConfig::default());
        let mut first = |s: &GameState, p: PlayerId| s.valid_actions(p).into_iter().next();
        assert_eq!(first.choose_action(&state, 1), Some(GameAction::StartGame));
    }

    #[test]
    fn test_greedy_takes_best_setup_spot() {
        let state = setup_game(GameConfig::default());
        let p = state.current_player_id();
        let Some(GameAction::PlaceSetupSettlement(chosen)) = GreedyPolicy::with_seed(2).choose_action(&state, p)
        else {
            panic!("expected a setup settlement");
        };
        let best = crate::placement::placeable_vertices(&state, p)
            .into_iter()
            .map(|v| vertex_value(&state, v))
            .max()
            .unwrap();
        assert_eq!(vertex_value(&state, chosen), best);
    }

    #[test]
    fn test_greedy_builds_city_first() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        let idx = state.current_player_index;
        state.players[idx].resources = ResourceHand::with_amounts(1, 1, 1, 3, 3);
        state.players[idx].omens_hand.clear();

        let action = GreedyPolicy::with_seed(3).choose_action(&state, p).unwrap();
        assert!(matches!(action, GameAction::BuildCity(_)));
    }

    #[test]
    fn test_greedy_plays_held_omen() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        let idx = state.current_player_index;
        state.players[idx].omens_hand = vec![OmenCard::BountifulHarvest];

        let action = GreedyPolicy::with_seed(3).choose_action(&state, p).unwrap();
        assert_eq!(action, GameAction::PlayOmen(OmenCard::BountifulHarvest));
    }

    #[test]
    fn test_greedy_ends_turn_with_nothing_to_do() {
        let mut state = main_stage_game(GameConfig::default());
        let p = state.current_player_id();
        let idx = state.current_player_index;
        state.players[idx].resources = ResourceHand::new();
        state.players[idx].omens_hand.clear();
        assert_eq!(state.phase, GamePhase::Playing(TurnStage::Main));

        let action = GreedyPolicy::with_seed(3).choose_action(&state, p).unwrap();
        assert_eq!(action, GameAction::EndTurn);
    }
}
