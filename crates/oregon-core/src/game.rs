//! Core game state machine.
//!
//! This module contains the `GameState` value and the phase machine that
//! drives it: `lobby -> roll_order -> setup -> playing -> ended`.
//!
//! A `GameState` is never changed in place by a player action. [`GameState::try_apply`]
//! works on a clone and hands back the new state with the events it produced,
//! or an error and nothing else; [`GameState::apply`] is the same transition
//! with errors turned into a no-op. Collections inside the state are `im`
//! persistent structures, so the clone shares everything it does not touch.

use crate::actions::{GameAction, GameEvent, LogEntry};
use crate::board::{Board, HexId, PlayerId, Resource};
use crate::economy::{self, BuildKind};
use crate::longest_road::{self, LONGEST_ROAD_POINTS};
use crate::omens::{self, OmensState, OMEN_AWARD_POINTS};
use crate::placement;
use crate::player::{Player, ResourceHand};
use crate::production::{self, ROBBER_ROLL};
use crate::rng::GameRng;
use crate::topology::{EdgeId, VertexId};
use im::Vector;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Fewest players a game can seat
pub const MIN_PLAYERS: usize = 2;

/// Most players a game can seat
pub const MAX_PLAYERS: usize = 4;

/// Victory points needed to win
pub const VICTORY_POINTS_TO_WIN: u32 = 10;

/// Rule options fixed when the game is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Play with the Oregon's Omens deck
    pub omens_enabled: bool,
    /// Grant 2 VP to the first player to purchase five Omens cards
    pub omen_award_enabled: bool,
    pub victory_points_to_win: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            omens_enabled: true,
            omen_award_enabled: true,
            victory_points_to_win: VICTORY_POINTS_TO_WIN,
        }
    }
}

/// Why the robber is moving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobberCause {
    SevenRolled,
    RobbersRegret,
}

/// Where the active player is within their turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStage {
    /// Must roll before anything else
    PreRoll,
    /// Build, trade, Omens, end turn
    Main,
    /// Choose a hex for the robber
    RobberMove { cause: RobberCause },
    /// Choose a victim on the robber's new hex
    RobberSteal {
        cause: RobberCause,
        hex: HexId,
        victims: Vec<PlayerId>,
    },
}

/// Seating rolls in progress.
///
/// `ranking` holds groups of players from highest roll to lowest. A group
/// with more than one player is still tied and rolls again on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOrderState {
    pub ranking: Vec<Vec<PlayerId>>,
    /// Totals rolled so far by the group currently rolling
    pub rolls: Vec<(PlayerId, u8)>,
}

impl RollOrderState {
    fn new(players: Vec<PlayerId>) -> Self {
        Self {
            ranking: vec![players],
            rolls: Vec::new(),
        }
    }

    fn tied_group(&self) -> Option<&Vec<PlayerId>> {
        self.ranking.iter().find(|g| g.len() > 1)
    }

    /// Next player to roll, if any group is still tied
    pub fn next_roller(&self) -> Option<PlayerId> {
        self.tied_group()?
            .iter()
            .copied()
            .find(|p| !self.rolls.iter().any(|(r, _)| r == p))
    }

    /// Split the tied group by this round's totals once everyone in it rolled.
    /// Returns the new groups that are still tied.
    fn settle_round(&mut self) -> Vec<Vec<PlayerId>> {
        let Some(pos) = self.ranking.iter().position(|g| g.len() > 1) else {
            return Vec::new();
        };
        if self.ranking[pos].len() != self.rolls.len() {
            return Vec::new();
        }

        let mut rolls = std::mem::take(&mut self.rolls);
        // Stable: equal totals keep seat order inside the new group
        rolls.sort_by(|a, b| b.1.cmp(&a.1));

        let mut groups: Vec<Vec<PlayerId>> = Vec::new();
        let mut last_total = None;
        for (player, total) in rolls {
            match groups.last_mut() {
                Some(group) if last_total == Some(total) => group.push(player),
                _ => groups.push(vec![player]),
            }
            last_total = Some(total);
        }

        let still_tied = groups.iter().filter(|g| g.len() > 1).cloned().collect();
        self.ranking.splice(pos..=pos, groups);
        still_tied
    }

    fn final_order(&self) -> Option<Vec<PlayerId>> {
        if self.tied_group().is_some() {
            return None;
        }
        Some(self.ranking.iter().flatten().copied().collect())
    }
}

/// Game phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for someone to start
    Lobby,
    /// Players roll for seating order
    RollOrder(RollOrderState),
    /// Snake-order placement of two settlements and two roads each
    Setup,
    /// Regular turns
    Playing(TurnStage),
    /// Game is over
    Ended { winner: PlayerId },
}

impl GamePhase {
    /// Short phase name
    pub fn name(&self) -> &'static str {
        match self {
            GamePhase::Lobby => "lobby",
            GamePhase::RollOrder(_) => "roll_order",
            GamePhase::Setup => "setup",
            GamePhase::Playing(_) => "playing",
            GamePhase::Ended { .. } => "ended",
        }
    }
}

fn format_missing(missing: &[(Resource, u32)]) -> String {
    missing
        .iter()
        .map(|(r, n)| format!("{} {}", n, r.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("Invalid placement location")]
    InvalidLocation,

    #[error("Cannot afford this: missing {}", format_missing(.0))]
    CannotAfford(Vec<(Resource, u32)>),

    #[error("No pieces remaining")]
    NoPiecesRemaining,

    #[error("Oregon's Omens is not enabled for this game")]
    OmensDisabled,

    #[error("Omens hand is full")]
    OmenHandFull,

    #[error("No Omens cards left in deck")]
    OmenDeckEmpty,

    #[error("Don't have that card: {0}")]
    NoSuchCard(String),

    #[error("Already played an Omens card this turn")]
    OmenAlreadyPlayed,

    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    #[error("That player cannot be robbed here")]
    InvalidVictim,

    #[error("Dice must show 1 to 6")]
    InvalidDice,

    #[error("Game is over")]
    GameOver,

    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("A game needs 2 to 4 players, got {0}")]
    InvalidPlayerCount(usize),
}

/// Errors loading a saved game
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Inconsistent snapshot: {0}")]
    Invalid(String),
}

/// Seat order for setup placements: 0..n then n..0
pub fn setup_order_sequence(player_count: usize) -> Vec<usize> {
    (0..player_count).chain((0..player_count).rev()).collect()
}

/// The complete game state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub config: GameConfig,
    /// Current game phase
    pub phase: GamePhase,
    /// The game board
    pub board: Board,
    /// All players, in seat order once roll order is decided
    pub players: Vector<Player>,
    /// Seat of the player who acts next
    pub current_player_index: usize,
    /// Completed setup settlement+road pairs
    pub setup_placements: usize,
    /// Setup settlement still waiting for its road
    pub setup_pending_vertex: Option<VertexId>,
    /// Most recent dice roll
    pub last_dice: Option<(u8, u8)>,
    /// Units each seat received on the most recent roll
    pub last_resource_flash: Vec<Vec<Resource>>,
    pub longest_road_player: Option<PlayerId>,
    pub omens: OmensState,
    /// Append-only gameplay log
    pub log: Vector<LogEntry>,
    /// Turn number (starts at 1 when play begins)
    pub turn_number: u32,
    pub rng: GameRng,
}

impl GameState {
    /// Create a game in the lobby on a freshly generated standard board
    pub fn new<S: AsRef<str>>(config: GameConfig, names: &[S], seed: u64) -> Result<Self, GameError> {
        let board = Board::standard_with_rng(&mut GameRng::new(seed).for_context("board"));
        Self::with_board(config, names, board, seed)
    }

    /// Create a game in the lobby on a given board
    pub fn with_board<S: AsRef<str>>(
        config: GameConfig,
        names: &[S],
        board: Board,
        seed: u64,
    ) -> Result<Self, GameError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&names.len()) {
            return Err(GameError::InvalidPlayerCount(names.len()));
        }

        let mut rng = GameRng::new(seed);
        let omens = if config.omens_enabled {
            OmensState::new(&mut rng)
        } else {
            OmensState::default()
        };
        let players: Vector<Player> = names
            .iter()
            .enumerate()
            .map(|(i, name)| Player::new(i as PlayerId + 1, name.as_ref()))
            .collect();

        Ok(Self {
            config,
            phase: GamePhase::Lobby,
            board,
            last_resource_flash: vec![Vec::new(); players.len()],
            players,
            current_player_index: 0,
            setup_placements: 0,
            setup_pending_vertex: None,
            last_dice: None,
            longest_road_player: None,
            omens,
            log: Vector::new(),
            turn_number: 0,
            rng,
        })
    }

    // ==================== Read Helpers ====================

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Seat of a player
    pub fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn player_name(&self, id: PlayerId) -> String {
        self.player(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("Player {}", id))
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    /// Id of the player who acts next (0 if the seat is somehow empty)
    pub fn current_player_id(&self) -> PlayerId {
        self.current_player().map(|p| p.id).unwrap_or(0)
    }

    /// Seat that moves after the current one
    pub fn next_player_index(&self) -> usize {
        (self.current_player_index + 1) % self.players.len().max(1)
    }

    /// Whether it is `player`'s move in a phase that has an active player
    pub fn is_active(&self, player: PlayerId) -> bool {
        match self.phase {
            GamePhase::RollOrder(_) | GamePhase::Setup | GamePhase::Playing(_) => {
                self.current_player_id() == player
            }
            GamePhase::Lobby | GamePhase::Ended { .. } => false,
        }
    }

    pub fn is_main_stage_for(&self, player: PlayerId) -> bool {
        self.require_main_stage(player).is_ok()
    }

    /// `player` must be active and in the main stage of their turn
    pub fn require_main_stage(&self, player: PlayerId) -> Result<(), GameError> {
        self.require_active(player)?;
        match self.phase {
            GamePhase::Playing(TurnStage::Main) => Ok(()),
            _ => Err(GameError::InvalidPhase),
        }
    }

    fn require_active(&self, player: PlayerId) -> Result<(), GameError> {
        if self.is_active(player) {
            Ok(())
        } else {
            Err(GameError::NotYourTurn)
        }
    }

    /// Victory points: settlements 1, cities 2, longest road 2, omen award 2
    pub fn victory_points(&self, player: PlayerId) -> u32 {
        let mut vp = self.board.structure_points(player);
        if self.longest_road_player == Some(player) {
            vp += LONGEST_ROAD_POINTS;
        }
        if self.config.omen_award_enabled && self.omens.award_holder == Some(player) {
            vp += OMEN_AWARD_POINTS;
        }
        vp
    }

    pub fn refresh_victory_points(&mut self) {
        let points: Vec<u32> = self.players.iter().map(|p| self.victory_points(p.id)).collect();
        for (i, vp) in points.into_iter().enumerate() {
            self.players[i].victory_points = vp;
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, GamePhase::Ended { .. })
    }

    pub fn winner(&self) -> Option<PlayerId> {
        match self.phase {
            GamePhase::Ended { winner } => Some(winner),
            _ => None,
        }
    }

    // ==================== Action Enumeration ====================

    /// Every action `player` could legally take right now
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        let mut actions = Vec::new();
        if self.player(player).is_none() {
            return actions;
        }

        match &self.phase {
            GamePhase::Lobby => actions.push(GameAction::StartGame),

            GamePhase::RollOrder(order) => {
                if order.next_roller() == Some(player) {
                    actions.push(GameAction::RollForOrder);
                }
            }

            GamePhase::Setup => {
                if !self.is_active(player) {
                    return actions;
                }
                if self.setup_pending_vertex.is_some() {
                    for edge in placement::placeable_roads(self, player, placement::RoadRule::Connected) {
                        actions.push(GameAction::PlaceSetupRoad(edge));
                    }
                } else {
                    for vertex in placement::placeable_vertices(self, player) {
                        actions.push(GameAction::PlaceSetupSettlement(vertex));
                    }
                }
            }

            GamePhase::Playing(stage) => {
                if !self.is_active(player) {
                    return actions;
                }
                match stage {
                    TurnStage::PreRoll => actions.push(GameAction::RollDice),
                    TurnStage::RobberMove { .. } => {
                        for hex in production::robber_destinations(self) {
                            actions.push(GameAction::MoveRobber(hex));
                        }
                    }
                    TurnStage::RobberSteal { cause, victims, .. } => {
                        for victim in victims {
                            actions.push(GameAction::StealFrom(*victim));
                        }
                        if *cause == RobberCause::RobbersRegret {
                            actions.push(GameAction::SkipSteal);
                        }
                    }
                    TurnStage::Main => self.main_stage_actions(player, &mut actions),
                }
            }

            GamePhase::Ended { .. } => {}
        }

        actions
    }

    fn main_stage_actions(&self, player: PlayerId, actions: &mut Vec<GameAction>) {
        if economy::can_afford(self, player, BuildKind::Road) {
            let rule = omens::road_rule_for(self, player);
            for edge in placement::placeable_roads(self, player, rule) {
                actions.push(GameAction::BuildRoad(edge));
            }
        }
        if economy::can_afford(self, player, BuildKind::Settlement) {
            for vertex in placement::placeable_vertices(self, player) {
                actions.push(GameAction::BuildSettlement(vertex));
            }
        }
        if economy::can_afford(self, player, BuildKind::City) {
            for vertex in placement::upgradeable_vertices(self, player) {
                actions.push(GameAction::BuildCity(vertex));
            }
        }

        for give in Resource::ALL {
            for get in Resource::ALL {
                if economy::can_bank_trade(self, player, give, get) {
                    actions.push(GameAction::BankTrade { give, get });
                }
            }
        }

        if omens::can_draw_omen(self, player) {
            actions.push(GameAction::DrawOmen);
        }
        if let Some(p) = self.player(player) {
            let mut cards = p.omens_hand.clone();
            cards.sort();
            cards.dedup();
            for card in cards {
                if omens::can_play_omen(self, player, card) {
                    actions.push(GameAction::PlayOmen(card));
                }
            }
        }

        actions.push(GameAction::EndTurn);
    }

    // ==================== Transitions ====================

    /// Apply `action` for `player` to a copy of this state.
    ///
    /// On success returns the new state and the events it produced; the new
    /// state already has victory points refreshed, the win checked and log
    /// entries appended. On error this state is untouched.
    pub fn try_apply(&self, player: PlayerId, action: GameAction) -> Result<(GameState, Vec<GameEvent>), GameError> {
        let result = self.transition(player, |state| state.apply_action(player, &action));
        match &result {
            Ok((_, events)) => debug!(player, ?action, events = events.len(), "action applied"),
            Err(err) => debug!(player, ?action, %err, "action rejected"),
        }
        result
    }

    /// Like [`GameState::try_apply`], returning this state unchanged on error
    pub fn apply(&self, player: PlayerId, action: GameAction) -> GameState {
        match self.try_apply(player, action) {
            Ok((next, _)) => next,
            Err(_) => self.clone(),
        }
    }

    /// Resolve a `RollDice` with dice chosen by the caller instead of the
    /// game RNG (for animated dice that pre-roll, and for tests)
    pub fn try_apply_roll(&self, player: PlayerId, dice: (u8, u8)) -> Result<(GameState, Vec<GameEvent>), GameError> {
        if !(1..=6).contains(&dice.0) || !(1..=6).contains(&dice.1) {
            return Err(GameError::InvalidDice);
        }
        self.transition(player, |state| state.roll_dice(player, Some(dice)))
    }

    fn transition<F>(&self, player: PlayerId, apply: F) -> Result<(GameState, Vec<GameEvent>), GameError>
    where
        F: FnOnce(&mut GameState) -> Result<Vec<GameEvent>, GameError>,
    {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if self.player(player).is_none() {
            return Err(GameError::UnknownPlayer(player));
        }

        let mut next = self.clone();
        let mut events = apply(&mut next)?;

        next.refresh_victory_points();
        events.extend(next.check_victory(player));

        if next.phase.name() != self.phase.name() {
            info!(from = self.phase.name(), to = next.phase.name(), "phase changed");
        }
        for event in &events {
            let entry = event.log_entry(&next);
            next.log.push_back(entry);
        }

        Ok((next, events))
    }

    fn apply_action(&mut self, player: PlayerId, action: &GameAction) -> Result<Vec<GameEvent>, GameError> {
        match *action {
            // ==================== Lobby & Roll Order ====================
            GameAction::StartGame => self.start_game(),
            GameAction::RollForOrder => self.roll_for_order(player),

            // ==================== Setup Phase ====================
            GameAction::PlaceSetupSettlement(vertex) => self.place_setup_settlement(player, vertex),
            GameAction::PlaceSetupRoad(edge) => self.place_setup_road(player, edge),

            // ==================== Dice & Robber ====================
            GameAction::RollDice => self.roll_dice(player, None),
            GameAction::MoveRobber(hex) => self.move_robber(player, hex),
            GameAction::StealFrom(victim) => self.steal_from(player, victim),
            GameAction::SkipSteal => self.skip_steal(player),

            // ==================== Building ====================
            GameAction::BuildRoad(edge) => self.build_road(player, edge),
            GameAction::BuildSettlement(vertex) => self.build_settlement(player, vertex),
            GameAction::BuildCity(vertex) => self.build_city(player, vertex),

            // ==================== Trading ====================
            GameAction::BankTrade { give, get } => {
                let rate = economy::bank_trade(self, player, give, get)?;
                Ok(vec![GameEvent::BankTraded {
                    player,
                    gave: give,
                    gave_amount: rate,
                    got: get,
                }])
            }

            // ==================== Omens ====================
            GameAction::DrawOmen => omens::draw_omen(self, player),
            GameAction::PlayOmen(card) => omens::play_omen(self, player, card),

            // ==================== Turn Management ====================
            GameAction::EndTurn => self.end_turn(player),
        }
    }

    fn start_game(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(GameError::InvalidPhase);
        }
        let ids: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();
        self.phase = GamePhase::RollOrder(RollOrderState::new(ids));
        self.current_player_index = 0;
        Ok(vec![GameEvent::GameStarted {
            players: self.players.len(),
        }])
    }

    fn roll_for_order(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let GamePhase::RollOrder(mut order) = self.phase.clone() else {
            return Err(GameError::InvalidPhase);
        };
        if order.next_roller() != Some(player) {
            return Err(GameError::NotYourTurn);
        }

        let roll = self.rng.roll_dice();
        let total = roll.0 + roll.1;
        order.rolls.push((player, total));
        let mut events = vec![GameEvent::RolledForOrder { player, roll, total }];

        for tied in order.settle_round() {
            events.push(GameEvent::OrderTieBreak { players: tied });
        }

        if let Some(seating) = order.final_order() {
            self.players = seating.iter().filter_map(|id| self.player(*id).cloned()).collect();
            self.last_resource_flash = vec![Vec::new(); self.players.len()];
            self.current_player_index = 0;
            self.phase = GamePhase::Setup;
            events.push(GameEvent::TurnOrderDecided { order: seating });
        } else {
            if let Some(next) = order.next_roller() {
                self.current_player_index = self.player_index(next).unwrap_or(0);
            }
            self.phase = GamePhase::RollOrder(order);
        }

        Ok(events)
    }

    fn place_setup_settlement(&mut self, player: PlayerId, vertex: VertexId) -> Result<Vec<GameEvent>, GameError> {
        if self.phase != GamePhase::Setup || self.setup_pending_vertex.is_some() {
            return Err(GameError::InvalidPhase);
        }
        self.require_active(player)?;
        if !placement::can_place_settlement(self, vertex, player) {
            return Err(GameError::InvalidLocation);
        }

        let idx = self.current_player_index;
        self.board.place_settlement(vertex, player);
        self.players[idx].settlements_remaining -= 1;
        self.setup_pending_vertex = Some(vertex);

        let mut events = vec![GameEvent::SetupSettlementPlaced { player, vertex }];

        // Second round: pay out the bordering hexes
        if self.setup_placements >= self.players.len() {
            let resources = production::give_initial_resources(self, player, vertex);
            if !resources.is_empty() {
                events.push(GameEvent::InitialResources { player, resources });
            }
        }

        Ok(events)
    }

    fn place_setup_road(&mut self, player: PlayerId, edge: EdgeId) -> Result<Vec<GameEvent>, GameError> {
        if self.phase != GamePhase::Setup || self.setup_pending_vertex.is_none() {
            return Err(GameError::InvalidPhase);
        }
        self.require_active(player)?;
        if !placement::can_place_road_in_setup(self, edge, player) {
            return Err(GameError::InvalidLocation);
        }

        let idx = self.current_player_index;
        self.board.place_road(edge, player);
        self.players[idx].roads_remaining -= 1;
        self.setup_pending_vertex = None;
        self.setup_placements += 1;

        let mut events = vec![GameEvent::SetupRoadPlaced { player, edge }];
        events.extend(longest_road::update_longest_road(self));

        let sequence = setup_order_sequence(self.players.len());
        match sequence.get(self.setup_placements) {
            Some(&seat) => self.current_player_index = seat,
            None => {
                self.current_player_index = 0;
                self.turn_number = 1;
                self.phase = GamePhase::Playing(TurnStage::PreRoll);
                events.push(GameEvent::SetupComplete {
                    first_player: self.current_player_id(),
                });
            }
        }

        Ok(events)
    }

    fn roll_dice(&mut self, player: PlayerId, forced: Option<(u8, u8)>) -> Result<Vec<GameEvent>, GameError> {
        self.require_active(player)?;
        if self.phase != GamePhase::Playing(TurnStage::PreRoll) {
            return Err(GameError::InvalidPhase);
        }

        let roll = match forced {
            Some(dice) => dice,
            None => self.rng.roll_dice(),
        };
        let total = roll.0 + roll.1;
        self.last_dice = Some(roll);

        let mut events = vec![GameEvent::DiceRolled { player, roll, total }];

        if total == ROBBER_ROLL {
            self.last_resource_flash = vec![Vec::new(); self.players.len()];
            let cause = RobberCause::SevenRolled;
            self.phase = GamePhase::Playing(TurnStage::RobberMove { cause });
            events.push(GameEvent::RobberActivated { player, cause });
        } else {
            let blocked = production::hexes_blocked_by_robber(self, total);
            let flash = production::distribute_resources(self, total);
            for (seat, units) in flash.iter().enumerate() {
                if units.is_empty() {
                    continue;
                }
                let mut resources = ResourceHand::new();
                for unit in units {
                    resources.add(*unit, 1);
                }
                events.push(GameEvent::ResourcesProduced {
                    player: self.players[seat].id,
                    resources,
                });
            }
            if !blocked.is_empty() {
                events.push(GameEvent::ProductionBlocked { hexes: blocked });
            }
            self.phase = GamePhase::Playing(TurnStage::Main);
        }

        events.extend(omens::apply_production_modifiers_after_roll(self));
        Ok(events)
    }

    fn move_robber(&mut self, player: PlayerId, hex: HexId) -> Result<Vec<GameEvent>, GameError> {
        self.require_active(player)?;
        let GamePhase::Playing(TurnStage::RobberMove { cause }) = self.phase else {
            return Err(GameError::InvalidPhase);
        };
        if !production::robber_destinations(self).contains(&hex) {
            return Err(GameError::InvalidLocation);
        }
        if hex == self.board.robber_hex() {
            // Nowhere else to go: no move, no theft
            self.phase = GamePhase::Playing(TurnStage::Main);
            return Ok(vec![GameEvent::RobberStayed { player, hex }]);
        }

        self.board.move_robber(hex);
        let events = vec![GameEvent::RobberMoved { player, hex }];

        let victims = production::steal_candidates(self, hex, player);
        self.phase = if victims.is_empty() {
            GamePhase::Playing(TurnStage::Main)
        } else {
            GamePhase::Playing(TurnStage::RobberSteal { cause, hex, victims })
        };

        Ok(events)
    }

    fn steal_from(&mut self, player: PlayerId, victim: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_active(player)?;
        let GamePhase::Playing(TurnStage::RobberSteal { victims, .. }) = &self.phase else {
            return Err(GameError::InvalidPhase);
        };
        if !victims.contains(&victim) {
            return Err(GameError::InvalidVictim);
        }

        let resource = production::steal_resource(self, player, victim);
        self.phase = GamePhase::Playing(TurnStage::Main);
        Ok(vec![GameEvent::ResourceStolen {
            thief: player,
            victim,
            resource,
        }])
    }

    fn skip_steal(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_active(player)?;
        match self.phase {
            GamePhase::Playing(TurnStage::RobberSteal {
                cause: RobberCause::RobbersRegret,
                ..
            }) => {
                self.phase = GamePhase::Playing(TurnStage::Main);
                Ok(vec![GameEvent::StealSkipped { player }])
            }
            _ => Err(GameError::InvalidPhase),
        }
    }

    /// Deduct the effective cost of `kind`, or report what is missing
    fn pay(&mut self, player: PlayerId, kind: BuildKind) -> Result<(), GameError> {
        let cost = omens::effective_build_cost(self, player, kind);
        let idx = self.player_index(player).ok_or(GameError::UnknownPlayer(player))?;
        if self.players[idx].resources.try_subtract(&cost) {
            Ok(())
        } else {
            Err(GameError::CannotAfford(self.players[idx].resources.missing(&cost)))
        }
    }

    fn build_road(&mut self, player: PlayerId, edge: EdgeId) -> Result<Vec<GameEvent>, GameError> {
        self.require_main_stage(player)?;
        let idx = self.current_player_index;
        if self.players[idx].roads_remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        let rule = omens::road_rule_for(self, player);
        if !placement::can_place_road(self, edge, player, rule) {
            return Err(GameError::InvalidLocation);
        }
        self.pay(player, BuildKind::Road)?;

        self.board.place_road(edge, player);
        self.players[idx].roads_remaining -= 1;

        let mut events = vec![GameEvent::RoadBuilt { player, edge }];
        events.extend(longest_road::update_longest_road(self));
        Ok(events)
    }

    fn build_settlement(&mut self, player: PlayerId, vertex: VertexId) -> Result<Vec<GameEvent>, GameError> {
        self.require_main_stage(player)?;
        let idx = self.current_player_index;
        if self.players[idx].settlements_remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        if !placement::can_place_settlement(self, vertex, player) {
            return Err(GameError::InvalidLocation);
        }
        self.pay(player, BuildKind::Settlement)?;

        self.board.place_settlement(vertex, player);
        self.players[idx].settlements_remaining -= 1;
        Ok(vec![GameEvent::SettlementBuilt { player, vertex }])
    }

    fn build_city(&mut self, player: PlayerId, vertex: VertexId) -> Result<Vec<GameEvent>, GameError> {
        self.require_main_stage(player)?;
        let idx = self.current_player_index;
        if self.players[idx].cities_remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        if !placement::can_build_city(self, vertex, player) {
            return Err(GameError::InvalidLocation);
        }
        self.pay(player, BuildKind::City)?;

        self.board.upgrade_to_city(vertex);
        self.players[idx].cities_remaining -= 1;
        // Settlement piece returned
        self.players[idx].settlements_remaining += 1;
        Ok(vec![GameEvent::CityBuilt { player, vertex }])
    }

    fn end_turn(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_main_stage(player)?;

        let mut events = omens::reset_player_omens_flags_for_new_turn(self, player);

        self.current_player_index = self.next_player_index();
        self.turn_number += 1;
        self.last_dice = None;
        self.phase = GamePhase::Playing(TurnStage::PreRoll);

        events.push(GameEvent::TurnEnded {
            player,
            next_player: self.current_player_id(),
        });
        Ok(events)
    }

    /// End the game if someone reached the target. The acting player is
    /// checked first, then everyone else in seat order.
    fn check_victory(&mut self, actor: PlayerId) -> Option<GameEvent> {
        if self.is_finished() {
            return None;
        }
        let target = self.config.victory_points_to_win;
        let winner = self
            .player(actor)
            .filter(|p| p.victory_points >= target)
            .or_else(|| self.players.iter().find(|p| p.victory_points >= target))
            .map(|p| (p.id, p.victory_points))?;

        let (player, victory_points) = winner;
        self.phase = GamePhase::Ended { winner: player };
        info!(player, victory_points, turn = self.turn_number, "game won");
        Some(GameEvent::GameWon { player, victory_points })
    }

    // ==================== Snapshots ====================

    /// Serialize the whole state, RNG position included
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load a state saved by [`GameState::to_json`] and check that it hangs
    /// together
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let state: GameState = serde_json::from_str(json)?;
        state.validate()?;
        Ok(state)
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        let n = self.players.len();
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&n) {
            return Err(SnapshotError::Invalid(format!("{} players", n)));
        }
        let mut ids: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != n {
            return Err(SnapshotError::Invalid("duplicate player ids".into()));
        }
        if self.current_player_index >= n {
            return Err(SnapshotError::Invalid("current player out of range".into()));
        }
        if self.setup_placements > 2 * n {
            return Err(SnapshotError::Invalid("too many setup placements".into()));
        }
        if self
            .setup_pending_vertex
            .is_some_and(|v| self.board.vertex(v).is_none())
        {
            return Err(SnapshotError::Invalid("pending vertex out of range".into()));
        }
        if !self.board.is_consistent() {
            return Err(SnapshotError::Invalid("board ids do not line up".into()));
        }
        Ok(())
    }
}
