//! WebAssembly bindings for the Settlers of Oregon engine.
//!
//! Everything crosses the boundary as JSON strings or plain numbers.

use wasm_bindgen::prelude::*;

use crate::actions::GameAction;
use crate::board::{PlayerId, Resource};
use crate::economy::BuildKind;
use crate::game::{GameConfig, GameState};
use crate::omens;
use crate::placement;
use crate::policy::{GreedyPolicy, Policy, RandomPolicy};
use crate::production;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_json<T: serde::Serialize>(value: &T, fallback: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| fallback.to_string())
}

fn parse_resource(json: &str) -> Result<Resource, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid resource: {}", e)))
}

/// A game held on the JS side
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new game from a JSON array of player names
    #[wasm_bindgen(constructor)]
    pub fn new(player_names_json: &str, seed: u64, omens_enabled: bool) -> Result<WasmGame, JsValue> {
        let names: Vec<String> = serde_json::from_str(player_names_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid player names: {}", e)))?;
        let config = GameConfig {
            omens_enabled,
            ..GameConfig::default()
        };
        let state = GameState::new(config, names.as_slice(), seed).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmGame { state })
    }

    /// Resume from a snapshot produced by `getState`
    #[wasm_bindgen(js_name = fromSnapshot)]
    pub fn from_snapshot(json: &str) -> Result<WasmGame, JsValue> {
        let state = GameState::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmGame { state })
    }

    /// Full state snapshot
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        to_json(&self.state, "{}")
    }

    #[wasm_bindgen(js_name = getCurrentPlayer)]
    pub fn get_current_player(&self) -> u8 {
        self.state.current_player_id()
    }

    /// Valid actions for a player as a JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self, player: PlayerId) -> String {
        to_json(&self.state.valid_actions(player), "[]")
    }

    /// Apply a JSON action; resolves to the JSON events
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, player: PlayerId, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        match self.state.try_apply(player, action) {
            Ok((next, events)) => {
                self.state = next;
                Ok(to_json(&events, "[]"))
            }
            Err(e) => Err(JsValue::from_str(&format!("Action failed: {}", e))),
        }
    }

    /// Resolve a roll with dice the UI already animated
    #[wasm_bindgen(js_name = applyRoll)]
    pub fn apply_roll(&mut self, player: PlayerId, die1: u8, die2: u8) -> Result<String, JsValue> {
        match self.state.try_apply_roll(player, (die1, die2)) {
            Ok((next, events)) => {
                self.state = next;
                Ok(to_json(&events, "[]"))
            }
            Err(e) => Err(JsValue::from_str(&format!("Action failed: {}", e))),
        }
    }

    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    #[wasm_bindgen(js_name = getWinner)]
    pub fn get_winner(&self) -> Option<u8> {
        self.state.winner()
    }

    #[wasm_bindgen(js_name = getVictoryPoints)]
    pub fn get_victory_points(&self, player: PlayerId) -> u32 {
        self.state.victory_points(player)
    }

    /// Get the current phase as JSON
    #[wasm_bindgen(js_name = getPhase)]
    pub fn get_phase(&self) -> String {
        to_json(&self.state.phase, "\"Unknown\"")
    }

    #[wasm_bindgen(js_name = getDiceRoll)]
    pub fn get_dice_roll(&self) -> Option<Vec<u8>> {
        self.state.last_dice.map(|(a, b)| vec![a, b])
    }

    /// Units each seat received on the last roll, for the resource flash
    #[wasm_bindgen(js_name = getResourceFlash)]
    pub fn get_resource_flash(&self) -> String {
        to_json(&self.state.last_resource_flash, "[]")
    }

    /// Hexes that produced, and hexes the robber blocked, for a dice total
    #[wasm_bindgen(js_name = getProductionHighlights)]
    pub fn get_production_highlights(&self, total: u8) -> String {
        let produced = production::hexes_that_produced(&self.state, total);
        let blocked = production::hexes_blocked_by_robber(&self.state, total);
        to_json(&(produced, blocked), "[[],[]]")
    }

    #[wasm_bindgen(js_name = getBoard)]
    pub fn get_board(&self) -> String {
        to_json(&self.state.board, "{}")
    }

    #[wasm_bindgen(js_name = getPlayer)]
    pub fn get_player(&self, player: PlayerId) -> String {
        match self.state.player(player) {
            Some(p) => to_json(p, "{}"),
            None => "null".to_string(),
        }
    }

    /// Omens cards left before the discard is reshuffled
    #[wasm_bindgen(js_name = getOmenDeckSize)]
    pub fn get_omen_deck_size(&self) -> usize {
        self.state.omens.cards_remaining()
    }

    #[wasm_bindgen(js_name = getLog)]
    pub fn get_log(&self) -> String {
        to_json(&self.state.log, "[]")
    }

    // ==================== Placement hints ====================

    #[wasm_bindgen(js_name = getPlaceableVertices)]
    pub fn get_placeable_vertices(&self, player: PlayerId) -> String {
        to_json(&placement::placeable_vertices(&self.state, player), "[]")
    }

    #[wasm_bindgen(js_name = getPlaceableRoads)]
    pub fn get_placeable_roads(&self, player: PlayerId) -> String {
        let rule = omens::road_rule_for(&self.state, player);
        to_json(&placement::placeable_roads(&self.state, player, rule), "[]")
    }

    #[wasm_bindgen(js_name = getUpgradeableVertices)]
    pub fn get_upgradeable_vertices(&self, player: PlayerId) -> String {
        to_json(&placement::upgradeable_vertices(&self.state, player), "[]")
    }

    // ==================== Costs and rates ====================

    /// Current bank rate for giving `resource_json` (e.g. `"wood"`)
    #[wasm_bindgen(js_name = getTradeRate)]
    pub fn get_trade_rate(&self, player: PlayerId, resource_json: &str) -> Result<u32, JsValue> {
        let resource = parse_resource(resource_json)?;
        Ok(omens::peek_trade_rate(&self.state, player, resource))
    }

    /// Effective cost of a build after Omens effects, as a resource hand
    #[wasm_bindgen(js_name = getBuildCost)]
    pub fn get_build_cost(&self, player: PlayerId, kind_json: &str) -> Result<String, JsValue> {
        let kind: BuildKind =
            serde_json::from_str(kind_json).map_err(|e| JsValue::from_str(&format!("Invalid build kind: {}", e)))?;
        Ok(to_json(&omens::effective_build_cost(&self.state, player, kind), "{}"))
    }

    /// Suggested action for a player. `style` is "random" or "greedy".
    #[wasm_bindgen(js_name = getBotAction)]
    pub fn get_bot_action(&self, player: PlayerId, style: &str, seed: u64) -> String {
        let action = match style {
            "random" => RandomPolicy::with_seed(seed).choose_action(&self.state, player),
            _ => GreedyPolicy::with_seed(seed).choose_action(&self.state, player),
        };
        match action {
            Some(action) => to_json(&action, "null"),
            None => "null".to_string(),
        }
    }
}
