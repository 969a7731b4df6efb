//! Game actions that players can take.
//!
//! This module defines all possible actions in the game, the events that
//! result from those actions, and the gameplay log entries derived from them.

use crate::board::{HexId, PlayerId, Resource};
use crate::game::{GameState, RobberCause};
use crate::omens::OmenCard;
use crate::player::ResourceHand;
use crate::topology::{EdgeId, VertexId};
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Lobby & Roll Order ====================
    /// Close the lobby and begin rolling for turn order
    StartGame,
    /// Roll two dice for seating order
    RollForOrder,

    // ==================== Setup Phase ====================
    /// Place initial settlement during setup
    PlaceSetupSettlement(VertexId),
    /// Place initial road during setup (must leave the just-placed settlement)
    PlaceSetupRoad(EdgeId),

    // ==================== Turn Actions ====================
    /// Roll the dice (must be done at start of turn)
    RollDice,

    // ==================== Robber Actions ====================
    /// Move the robber to a new hex (after rolling 7 or playing Robber's Regret)
    MoveRobber(HexId),
    /// Choose a player to steal from (after moving robber)
    StealFrom(PlayerId),
    /// Decline to steal (Robber's Regret only)
    SkipSteal,

    // ==================== Building Actions (Main Stage) ====================
    /// Build a road at an edge
    BuildRoad(EdgeId),
    /// Build a settlement at a vertex
    BuildSettlement(VertexId),
    /// Upgrade a settlement to a city
    BuildCity(VertexId),

    // ==================== Trading ====================
    /// Trade with the bank (4:1) or through a harbor (3:1 or 2:1)
    BankTrade { give: Resource, get: Resource },

    // ==================== Omens ====================
    /// Pay for and draw the top Omens card
    DrawOmen,
    /// Play an Omens card from hand
    PlayOmen(OmenCard),

    // ==================== Turn Management ====================
    /// End your turn
    EndTurn,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Lobby closed
    GameStarted { players: usize },

    /// A seating roll
    RolledForOrder { player: PlayerId, roll: (u8, u8), total: u8 },
    /// Tied players roll again among themselves
    OrderTieBreak { players: Vec<PlayerId> },
    /// Seating order settled
    TurnOrderDecided { order: Vec<PlayerId> },

    /// Setup settlement placed
    SetupSettlementPlaced { player: PlayerId, vertex: VertexId },
    /// Setup road placed
    SetupRoadPlaced { player: PlayerId, edge: EdgeId },
    /// Second setup settlement paid out
    InitialResources { player: PlayerId, resources: ResourceHand },
    /// Setup finished; the first turn begins
    SetupComplete { first_player: PlayerId },

    /// Dice were rolled
    DiceRolled { player: PlayerId, roll: (u8, u8), total: u8 },
    /// Resources were distributed after a dice roll
    ResourcesProduced { player: PlayerId, resources: ResourceHand },
    /// The robber stopped a matching hex from producing
    ProductionBlocked { hexes: Vec<HexId> },

    /// The player must move the robber
    RobberActivated { player: PlayerId, cause: RobberCause },
    /// Robber was moved
    RobberMoved { player: PlayerId, hex: HexId },
    /// Robber had no other hex to go to and stayed put
    RobberStayed { player: PlayerId, hex: HexId },
    /// Resource was stolen; `None` when the victim held nothing
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Option<Resource>,
    },
    /// The player declined to steal
    StealSkipped { player: PlayerId },

    /// Road was built
    RoadBuilt { player: PlayerId, edge: EdgeId },
    /// Settlement was built
    SettlementBuilt { player: PlayerId, vertex: VertexId },
    /// City was built
    CityBuilt { player: PlayerId, vertex: VertexId },

    /// Bank or harbor trade completed
    BankTraded {
        player: PlayerId,
        gave: Resource,
        gave_amount: u32,
        got: Resource,
    },

    /// Omens card drawn
    OmenDrawn { player: PlayerId, card: OmenCard },
    /// Omens card played from hand
    OmenPlayed { player: PlayerId, card: OmenCard },
    /// A card moved resources between the bank and the player
    OmenResources {
        player: PlayerId,
        card: OmenCard,
        gained: ResourceHand,
        lost: ResourceHand,
    },
    /// A card attached a lasting effect
    OmenEffectStarted { player: PlayerId, card: OmenCard },
    /// A lasting effect ran out
    OmenEffectExpired { player: PlayerId, card: OmenCard },
    /// A ward cancelled a debuff
    OmenWarded { player: PlayerId, card: OmenCard },
    /// The discard pile became the new deck
    OmenDeckReshuffled { cards: usize },
    /// First player to five purchases
    OmenAwardGranted { player: PlayerId },

    /// Longest road changed hands
    LongestRoadChanged {
        player: PlayerId,
        previous: Option<PlayerId>,
        length: usize,
    },

    /// Turn ended
    TurnEnded { player: PlayerId, next_player: PlayerId },
    /// Game over
    GameWon { player: PlayerId, victory_points: u32 },
}

/// Category of a log line, for filtering and styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    System,
    Setup,
    Dice,
    Build,
    Trade,
    Robber,
    Omens,
    Award,
}

/// One line of the gameplay log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub message: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn for_player(self, player: String) -> Self {
        Self {
            message: format!("{} ({})", self.message, player),
            ..self
        }
    }
}

impl GameEvent {
    /// Human-readable log line, using player names from `state`
    pub fn log_entry(&self, state: &GameState) -> LogEntry {
        let name = |id: PlayerId| state.player_name(id);

        match self {
            GameEvent::GameStarted { players } => {
                LogEntry::new(LogKind::System, format!("Game started with {} players", players))
            }
            GameEvent::RolledForOrder { player, total, .. } => {
                LogEntry::new(LogKind::System, format!("{} rolled {} for turn order", name(*player), total))
            }
            GameEvent::OrderTieBreak { players } => {
                let names: Vec<String> = players.iter().map(|p| name(*p)).collect();
                LogEntry::new(LogKind::System, format!("Tie! {} roll again", names.join(", ")))
            }
            GameEvent::TurnOrderDecided { order } => {
                let names: Vec<String> = order.iter().map(|p| name(*p)).collect();
                LogEntry::new(LogKind::System, format!("Turn order: {}", names.join(", ")))
            }
            GameEvent::SetupSettlementPlaced { player, .. } => {
                LogEntry::new(LogKind::Setup, format!("{} placed a settlement", name(*player)))
            }
            GameEvent::SetupRoadPlaced { player, .. } => {
                LogEntry::new(LogKind::Setup, format!("{} placed a road", name(*player)))
            }
            GameEvent::InitialResources { player, resources } => {
                LogEntry::new(LogKind::Setup, format!("{} received {}", name(*player), resources))
            }
            GameEvent::SetupComplete { first_player } => {
                LogEntry::new(LogKind::System, format!("Setup complete. {} goes first", name(*first_player)))
            }
            GameEvent::DiceRolled { player, roll, total } => LogEntry::new(
                LogKind::Dice,
                format!("{} rolled {} ({} + {})", name(*player), total, roll.0, roll.1),
            ),
            GameEvent::ResourcesProduced { player, resources } => {
                LogEntry::new(LogKind::Dice, format!("{} collected {}", name(*player), resources))
            }
            GameEvent::ProductionBlocked { hexes } => {
                LogEntry::new(LogKind::Robber, format!("The robber blocked {} hex(es)", hexes.len()))
            }
            GameEvent::RobberActivated { player, cause } => {
                let why = match cause {
                    RobberCause::SevenRolled => "rolled a 7",
                    RobberCause::RobbersRegret => "played Robber's Regret",
                };
                LogEntry::new(LogKind::Robber, format!("{} {} and must move the robber", name(*player), why))
            }
            GameEvent::RobberMoved { player, hex } => {
                LogEntry::new(LogKind::Robber, format!("{} moved the robber to hex {}", name(*player), hex))
            }
            GameEvent::RobberStayed { player, hex } => LogEntry::new(
                LogKind::Robber,
                format!("{} left the robber on hex {}", name(*player), hex),
            ),
            GameEvent::ResourceStolen { thief, victim, resource } => {
                let message = match resource {
                    Some(_) => format!("{} stole a resource from {}", name(*thief), name(*victim)),
                    None => format!("{} had nothing for {} to steal", name(*victim), name(*thief)),
                };
                LogEntry::new(LogKind::Robber, message)
            }
            GameEvent::StealSkipped { player } => {
                LogEntry::new(LogKind::Robber, format!("{} chose not to steal", name(*player)))
            }
            GameEvent::RoadBuilt { player, .. } => {
                LogEntry::new(LogKind::Build, format!("{} built a road", name(*player)))
            }
            GameEvent::SettlementBuilt { player, .. } => {
                LogEntry::new(LogKind::Build, format!("{} built a settlement", name(*player)))
            }
            GameEvent::CityBuilt { player, .. } => {
                LogEntry::new(LogKind::Build, format!("{} built a city", name(*player)))
            }
            GameEvent::BankTraded {
                player,
                gave,
                gave_amount,
                got,
            } => LogEntry::new(
                LogKind::Trade,
                format!(
                    "{} traded {} {} for 1 {}",
                    name(*player),
                    gave_amount,
                    gave.name(),
                    got.name()
                ),
            ),
            GameEvent::OmenDrawn { player, card } => {
                LogEntry::new(LogKind::Omens, format!("{} drew {}", name(*player), card.name()))
            }
            GameEvent::OmenPlayed { player, card } => {
                LogEntry::new(LogKind::Omens, format!("{} played {}", name(*player), card.name()))
            }
            GameEvent::OmenResources {
                player,
                card,
                gained,
                lost,
            } => {
                let message = if lost.is_empty() {
                    format!("{}: {} gained {}", card.name(), name(*player), gained)
                } else {
                    format!("{}: {} lost {}", card.name(), name(*player), lost)
                };
                LogEntry::new(LogKind::Omens, message)
            }
            GameEvent::OmenEffectStarted { player, card } => {
                LogEntry::new(LogKind::Omens, format!("{}: {}", card.name(), card.description()))
                    .for_player(name(*player))
            }
            GameEvent::OmenEffectExpired { player, card } => {
                LogEntry::new(LogKind::Omens, format!("{} wore off for {}", card.name(), name(*player)))
            }
            GameEvent::OmenWarded { player, card } => LogEntry::new(
                LogKind::Omens,
                format!("{}'s pantry held off {}", name(*player), card.name()),
            ),
            GameEvent::OmenDeckReshuffled { cards } => {
                LogEntry::new(LogKind::Omens, format!("Omens deck reshuffled ({} cards)", cards))
            }
            GameEvent::OmenAwardGranted { player } => {
                LogEntry::new(LogKind::Award, format!("{} earned the Omens award", name(*player)))
            }
            GameEvent::LongestRoadChanged { player, length, .. } => LogEntry::new(
                LogKind::Award,
                format!("{} now holds the longest road ({})", name(*player), length),
            ),
            GameEvent::TurnEnded { player, next_player } => LogEntry::new(
                LogKind::System,
                format!("{} ended their turn. {}'s turn", name(*player), name(*next_player)),
            ),
            GameEvent::GameWon { player, victory_points } => LogEntry::new(
                LogKind::System,
                format!("{} wins with {} victory points!", name(*player), victory_points),
            ),
        }
    }
}
