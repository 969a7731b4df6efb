//! Integration tests for the Settlers of Oregon engine.
//!
//! These tests drive whole games through the public API, from the lobby
//! through setup to victory, and check the board and piece invariants after
//! every step.

use oregon_core::omens::OmenCard;
use oregon_core::player::{CITY_PIECES, ROAD_PIECES, SETTLEMENT_PIECES};
use oregon_core::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const NAMES: [&str; 3] = ["Abigail", "Jedediah", "Narcissa"];

fn new_game(seed: u64) -> GameState {
    GameState::new(GameConfig::default(), &NAMES, seed).unwrap()
}

/// Apply policy choices until the game ends or `max_actions` run out,
/// calling `check` on every intermediate state
fn play<P: Policy>(mut game: GameState, policy: &mut P, max_actions: usize, mut check: impl FnMut(&GameState)) -> GameState {
    for _ in 0..max_actions {
        if game.is_finished() {
            break;
        }
        let player = game.current_player_id();
        let Some(action) = policy.choose_action(&game, player) else {
            break;
        };
        game = match game.try_apply(player, action.clone()) {
            Ok((next, _)) => next,
            Err(e) => panic!("{:?} was offered to player {} but rejected: {}", action, player, e),
        };
        check(&game);
    }
    game
}

/// First valid action while the game is still in the lobby, roll order or
/// setup; nothing once play begins
fn first_before_play(game: &GameState, player: PlayerId) -> Option<GameAction> {
    matches!(game.phase, GamePhase::Lobby | GamePhase::RollOrder(_) | GamePhase::Setup)
        .then(|| game.valid_actions(player).into_iter().next())
        .flatten()
}

/// Run through roll order and setup with the first valid placement each time
fn complete_setup(game: GameState) -> GameState {
    let game = play(game, &mut first_before_play, 100, |_| {});
    assert_eq!(game.phase, GamePhase::Playing(TurnStage::PreRoll));
    game
}

fn assert_distance_rule(game: &GameState) {
    for vertex in game.board.vertices().filter(|v| v.is_occupied()) {
        for n in &vertex.neighbors {
            assert!(
                game.board.structure_at(*n).is_none(),
                "structures on neighbouring vertices {} and {}",
                vertex.id,
                n
            );
        }
    }
}

fn assert_pieces_accounted(game: &GameState) {
    for player in game.players.iter() {
        let structures: Vec<Structure> = game.board.structures_of(player.id).map(|(_, s)| s).collect();
        let settlements = structures.iter().filter(|s| s.kind == StructureKind::Settlement).count() as u32;
        let cities = structures.iter().filter(|s| s.kind == StructureKind::City).count() as u32;
        let roads = game.board.roads_of(player.id).count() as u32;

        assert_eq!(settlements + player.settlements_remaining, SETTLEMENT_PIECES);
        assert_eq!(cities + player.cities_remaining, CITY_PIECES);
        assert_eq!(roads + player.roads_remaining, ROAD_PIECES);
    }
}

fn assert_invariants(game: &GameState) {
    assert_distance_rule(game);
    assert_pieces_accounted(game);
    assert!(game.setup_placements <= 2 * game.player_count());
    for player in game.players.iter() {
        assert_eq!(player.victory_points, game.victory_points(player.id));
        assert!(player.omens_hand.len() <= omens::OMEN_HAND_LIMIT);
    }
}

/// Top corner of the first numbered hex the robber is not on, with its
/// number and resource
fn producing_corner(game: &GameState) -> (VertexId, u8, Resource) {
    game.board
        .hexes()
        .filter(|h| h.id != game.board.robber_hex())
        .find_map(|h| {
            let number = h.number.filter(|n| *n != 7)?;
            let corners = game.board.hex_corners(h.id)?;
            Some((corners[5], number, h.resource()?))
        })
        .unwrap()
}

#[test]
fn test_setup_phase_completes_in_snake_order() {
    let game = new_game(11);
    let game = play(game, &mut |g: &GameState, p: PlayerId| {
        matches!(g.phase, GamePhase::Lobby | GamePhase::RollOrder(_))
            .then(|| g.valid_actions(p).into_iter().next())
            .flatten()
    }, 100, |_| {});
    assert_eq!(game.phase, GamePhase::Setup);
    let seats: Vec<PlayerId> = game.players.iter().map(|p| p.id).collect();

    let mut order = Vec::new();
    let mut game = game;
    while game.phase == GamePhase::Setup {
        let p = game.current_player_id();
        let action = game.valid_actions(p).into_iter().next().unwrap();
        if matches!(action, GameAction::PlaceSetupSettlement(_)) {
            order.push(p);
        }
        game = game.try_apply(p, action).unwrap().0;
    }

    assert_eq!(order, vec![seats[0], seats[1], seats[2], seats[2], seats[1], seats[0]]);
    for player in game.players.iter() {
        assert_eq!(player.settlements_remaining, 3);
        assert_eq!(player.roads_remaining, 13);
    }
    assert_eq!(game.current_player_id(), seats[0]);
    assert_invariants(&game);
}

#[test]
fn test_city_collects_two_on_its_number() {
    let mut game = complete_setup(new_game(21));
    let p = game.current_player_id();
    let (vertex, number, resource) = producing_corner(&game);

    // Clear the board around the chosen corner and hands, then build a city
    game.board = Board::standard_with_rng(&mut GameRng::new(21).for_context("board"));
    for i in 0..game.players.len() {
        game.players[i].resources = ResourceHand::new();
    }
    game.board.place_settlement(vertex, p);
    game.board.upgrade_to_city(vertex);

    let die1 = (number - 1).min(6);
    let die2 = number - die1;
    let (game, events) = game.try_apply_roll(p, (die1, die2)).unwrap();

    let seat = game.player_index(p).unwrap();
    let expected: u32 = game
        .board
        .hexes_at_vertex(vertex)
        .filter(|h| h.number == Some(number) && h.id != game.board.robber_hex())
        .map(|h| if h.resource() == Some(resource) { 2 } else { 0 })
        .sum();
    assert!(expected >= 2);
    assert_eq!(game.players[seat].resources.get(resource), expected);
    assert_eq!(
        game.last_resource_flash[seat].iter().filter(|r| **r == resource).count() as u32,
        expected
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::ResourcesProduced { player, .. } if *player == p)));
    assert_eq!(game.phase, GamePhase::Playing(TurnStage::Main));
}

#[test]
fn test_seven_moves_robber_and_produces_nothing() {
    let game = complete_setup(new_game(5));
    let p = game.current_player_id();
    let before: Vec<ResourceHand> = game.players.iter().map(|pl| pl.resources).collect();

    let (game, events) = game.try_apply_roll(p, (5, 2)).unwrap();
    assert!(events.iter().all(|e| !matches!(e, GameEvent::ResourcesProduced { .. })));
    assert!(game.last_resource_flash.iter().all(|f| f.is_empty()));
    assert_eq!(game.players.iter().map(|pl| pl.resources).collect::<Vec<_>>(), before);
    assert_eq!(
        game.phase,
        GamePhase::Playing(TurnStage::RobberMove {
            cause: RobberCause::SevenRolled
        })
    );
    assert!(game
        .valid_actions(p)
        .iter()
        .all(|a| matches!(a, GameAction::MoveRobber(_))));
}

#[test]
fn test_settlement_affordability() {
    let game = complete_setup(new_game(8));
    let p = game.current_player_id();
    let seat = game.player_index(p).unwrap();
    let (mut game, _) = game.try_apply_roll(p, (1, 1)).unwrap();

    game.players[seat].resources = ResourceHand::with_amounts(1, 1, 1, 0, 0);
    assert!(!economy::can_afford(&game, p, BuildKind::Settlement));
    assert_eq!(
        economy::missing_resources(&game, p, BuildKind::Settlement),
        vec![(Resource::Wheat, 1)]
    );

    game.players[seat].resources.add(Resource::Wheat, 1);
    assert!(economy::can_afford(&game, p, BuildKind::Settlement));
}

#[test]
fn test_rejected_action_leaves_state_untouched() {
    let game = complete_setup(new_game(3));
    let p = game.current_player_id();
    let other = game.players[1].id;

    let err = game.try_apply(other, GameAction::RollDice).unwrap_err();
    assert_eq!(err, GameError::NotYourTurn);
    assert_eq!(game.apply(other, GameAction::RollDice), game);

    let err = game.try_apply(p, GameAction::BuildCity(0)).unwrap_err();
    assert_eq!(err, GameError::InvalidPhase);
    assert_eq!(game.apply(p, GameAction::BuildCity(0)), game);
}

#[test]
fn test_omens_can_be_switched_off() {
    let config = GameConfig {
        omens_enabled: false,
        ..GameConfig::default()
    };
    let game = GameState::new(config, &NAMES, 9).unwrap();
    let game = complete_setup(game);
    let p = game.current_player_id();
    let (mut game, _) = game.try_apply_roll(p, (2, 2)).unwrap();
    let seat = game.player_index(p).unwrap();
    game.players[seat].resources = ResourceHand::with_amounts(3, 3, 3, 3, 3);
    game.players[seat].omens_hand = vec![OmenCard::BountifulHarvest];

    let actions = game.valid_actions(p);
    assert!(!actions.contains(&GameAction::DrawOmen));
    assert!(!actions.iter().any(|a| matches!(a, GameAction::PlayOmen(_))));
    assert_eq!(game.try_apply(p, GameAction::DrawOmen).unwrap_err(), GameError::OmensDisabled);
}

#[test]
fn test_greedy_games_finish() {
    let mut finished = 0;
    for seed in 0..4 {
        let mut policy = GreedyPolicy::with_seed(seed);
        let game = play(new_game(seed), &mut policy, 10_000, assert_invariants);
        if let Some(winner) = game.winner() {
            finished += 1;
            assert!(game.victory_points(winner) >= game.config.victory_points_to_win);
            assert!(matches!(game.log.last(), Some(entry) if entry.message.contains("wins")));
        }
    }
    assert!(finished > 0, "no greedy game reached the victory target");
}

#[test]
fn test_snapshot_resumes_identically() {
    let mut policy = GreedyPolicy::with_seed(77);
    let game = play(new_game(77), &mut policy, 300, |_| {});
    let restored = GameState::from_json(&game.to_json().unwrap()).unwrap();
    assert_eq!(restored, game);

    let a = play(game, &mut GreedyPolicy::with_seed(1), 200, |_| {});
    let b = play(restored, &mut GreedyPolicy::with_seed(1), 200, |_| {});
    assert_eq!(a, b);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_random_play_keeps_invariants(seed in any::<u64>()) {
        let mut policy = RandomPolicy::with_seed(seed);
        let game = play(new_game(seed), &mut policy, 400, assert_invariants);
        prop_assert!(!game.log.is_empty());
    }
}
