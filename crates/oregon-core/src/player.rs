//! Players, their pieces and their resource hands.
//!
//! Counts in a [`ResourceHand`] are unsigned, so a hand can never go negative;
//! every subtraction either checks affordability first or clamps.

use crate::board::{PlayerId, Resource};
use crate::omens::OmenCard;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SETTLEMENT_PIECES: u32 = 5;
pub const CITY_PIECES: u32 = 4;
pub const ROAD_PIECES: u32 = 15;

/// Seat colour shown by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerColor {
    Crimson,
    Columbia,
    Marigold,
    Fir,
}

impl PlayerColor {
    /// Colour for seat ids 1-4, repeating after that
    pub fn for_player(id: PlayerId) -> Self {
        [Self::Crimson, Self::Columbia, Self::Marigold, Self::Fir][usize::from(id.wrapping_sub(1)) % 4]
    }
}

/// Counts of each resource a player holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHand {
    pub wood: u32,
    pub brick: u32,
    pub sheep: u32,
    pub wheat: u32,
    pub ore: u32,
}

impl ResourceHand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amounts in `Resource::ALL` order
    pub const fn with_amounts(wood: u32, brick: u32, sheep: u32, wheat: u32, ore: u32) -> Self {
        Self {
            wood,
            brick,
            sheep,
            wheat,
            ore,
        }
    }

    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    pub fn total(&self) -> u32 {
        self.wood + self.brick + self.sheep + self.wheat + self.ore
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Wood => self.wood,
            Resource::Brick => self.brick,
            Resource::Sheep => self.sheep,
            Resource::Wheat => self.wheat,
            Resource::Ore => self.ore,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Wood => &mut self.wood,
            Resource::Brick => &mut self.brick,
            Resource::Sheep => &mut self.sheep,
            Resource::Wheat => &mut self.wheat,
            Resource::Ore => &mut self.ore,
        }
    }

    pub fn set(&mut self, resource: Resource, count: u32) {
        *self.slot(resource) = count;
    }

    pub fn add(&mut self, resource: Resource, amount: u32) {
        *self.slot(resource) += amount;
    }

    pub fn add_hand(&mut self, other: &ResourceHand) {
        for resource in Resource::ALL {
            self.add(resource, other.get(resource));
        }
    }

    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL.iter().all(|r| self.get(*r) >= cost.get(*r))
    }

    /// Per-resource shortfall against a cost, in `Resource::ALL` order.
    /// Empty exactly when the cost is affordable.
    pub fn missing(&self, cost: &ResourceHand) -> Vec<(Resource, u32)> {
        Resource::ALL
            .iter()
            .filter_map(|r| {
                let short = cost.get(*r).saturating_sub(self.get(*r));
                (short > 0).then_some((*r, short))
            })
            .collect()
    }

    /// Pay `cost` in full or leave the hand untouched
    pub fn try_subtract(&mut self, cost: &ResourceHand) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for resource in Resource::ALL {
            *self.slot(resource) -= cost.get(resource);
        }
        true
    }

    /// Subtract as much of `amount` as the hand holds, clamping at zero.
    /// Returns what was actually removed.
    pub fn saturating_subtract(&mut self, amount: &ResourceHand) -> ResourceHand {
        let mut removed = ResourceHand::new();
        for resource in Resource::ALL {
            let slot = self.slot(resource);
            let taken = amount.get(resource).min(*slot);
            *slot -= taken;
            removed.set(resource, taken);
        }
        removed
    }

    /// Resource kinds with at least one unit
    pub fn kinds_held(&self) -> Vec<Resource> {
        Resource::ALL.into_iter().filter(|r| self.get(*r) > 0).collect()
    }

    /// Take one unit of a kind picked uniformly among the kinds held
    pub fn steal_random<R: Rng>(&mut self, rng: &mut R) -> Option<Resource> {
        let resource = *self.kinds_held().choose(rng)?;
        *self.slot(resource) -= 1;
        Some(resource)
    }

    /// Iterate over (resource, count) pairs, including zeros
    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        Resource::ALL.into_iter().map(move |r| (r, self.get(r)))
    }
}

impl fmt::Display for ResourceHand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(r, n)| format!("{} {}", n, r.name()))
            .collect();
        if parts.is_empty() {
            write!(f, "nothing")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// One seat at the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Seat id, 1-4
    pub id: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    pub resources: ResourceHand,
    /// Pieces still in the player's supply
    pub settlements_remaining: u32,
    pub cities_remaining: u32,
    pub roads_remaining: u32,
    /// Victory points, recomputed after every state change
    pub victory_points: u32,
    /// Omens cards held and not yet played
    pub omens_hand: Vec<OmenCard>,
    /// Omens cards ever drawn, independent of what is still in hand
    pub omens_purchased: u32,
    /// Whether an Omens card was played this turn
    pub omen_played_this_turn: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: PlayerColor::for_player(id),
            resources: ResourceHand::new(),
            settlements_remaining: SETTLEMENT_PIECES,
            cities_remaining: CITY_PIECES,
            roads_remaining: ROAD_PIECES,
            victory_points: 0,
            omens_hand: Vec::new(),
            omens_purchased: 0,
            omen_played_this_turn: false,
        }
    }

    /// Remove one copy of `card` from the hand
    pub fn take_omen(&mut self, card: OmenCard) -> bool {
        match self.omens_hand.iter().position(|c| *c == card) {
            Some(pos) => {
                self.omens_hand.remove(pos);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_hand_counts_and_affordability() {
        let hand = ResourceHand::with_amounts(2, 1, 0, 2, 3);
        assert_eq!(hand.total(), 8);
        assert_eq!(hand.kinds_held(), vec![Resource::Wood, Resource::Brick, Resource::Wheat, Resource::Ore]);
        assert!(hand.can_afford(&ResourceHand::with_amounts(0, 0, 0, 2, 3)));
        assert!(!hand.can_afford(&ResourceHand::single(Resource::Sheep, 1)));
    }

    #[test]
    fn test_try_subtract_is_all_or_nothing() {
        let mut hand = ResourceHand::with_amounts(1, 0, 2, 0, 0);
        assert!(!hand.try_subtract(&ResourceHand::with_amounts(1, 1, 0, 0, 0)));
        assert_eq!(hand, ResourceHand::with_amounts(1, 0, 2, 0, 0));

        assert!(hand.try_subtract(&ResourceHand::with_amounts(1, 0, 1, 0, 0)));
        assert_eq!(hand, ResourceHand::with_amounts(0, 0, 1, 0, 0));
    }

    #[test]
    fn test_missing_lists_shortfall() {
        let hand = ResourceHand::with_amounts(1, 0, 0, 1, 1);
        let cost = ResourceHand::with_amounts(1, 1, 1, 1, 0);
        assert_eq!(
            hand.missing(&cost),
            vec![(Resource::Brick, 1), (Resource::Sheep, 1)]
        );
        assert!(hand.missing(&ResourceHand::single(Resource::Wood, 1)).is_empty());
    }

    #[test]
    fn test_saturating_subtract_clamps_at_zero() {
        let mut hand = ResourceHand::with_amounts(0, 0, 3, 1, 0);
        let removed = hand.saturating_subtract(&ResourceHand::with_amounts(0, 0, 1, 2, 0));
        assert_eq!(removed, ResourceHand::with_amounts(0, 0, 1, 1, 0));
        assert_eq!(hand, ResourceHand::with_amounts(0, 0, 2, 0, 0));
    }

    #[test]
    fn test_steal_random() {
        let mut hand = ResourceHand::with_amounts(0, 0, 0, 1, 0);
        let mut rng = StdRng::seed_from_u64(1);

        let stolen = hand.steal_random(&mut rng);
        assert_eq!(stolen, Some(Resource::Wheat));
        assert!(hand.is_empty());
        assert_eq!(hand.steal_random(&mut rng), None);
    }

    #[test]
    fn test_steal_picks_kinds_uniformly() {
        // 9 ore and 1 wood: a per-card draw would almost never pick wood
        let mut rng = StdRng::seed_from_u64(99);
        let mut wood = 0;
        for _ in 0..400 {
            let mut hand = ResourceHand::with_amounts(1, 0, 0, 0, 9);
            if hand.steal_random(&mut rng) == Some(Resource::Wood) {
                wood += 1;
            }
        }
        assert!((150..=250).contains(&wood), "wood stolen {} times", wood);
    }

    #[test]
    fn test_display_hand() {
        let hand = ResourceHand::with_amounts(2, 0, 0, 1, 0);
        assert_eq!(hand.to_string(), "2 wood, 1 wheat");
        assert_eq!(ResourceHand::new().to_string(), "nothing");
    }

    #[test]
    fn test_new_player_pieces() {
        let player = Player::new(1, "Abigail");
        assert_eq!(player.settlements_remaining, 5);
        assert_eq!(player.cities_remaining, 4);
        assert_eq!(player.roads_remaining, 15);
        assert_eq!(player.color, PlayerColor::Crimson);
        assert_eq!(PlayerColor::for_player(4), PlayerColor::Fir);
        assert_eq!(player.victory_points, 0);
    }

    #[test]
    fn test_take_omen_removes_one_copy() {
        let mut player = Player::new(2, "Jedediah");
        player.omens_hand = vec![OmenCard::BountifulHarvest, OmenCard::BountifulHarvest];
        assert!(player.take_omen(OmenCard::BountifulHarvest));
        assert_eq!(player.omens_hand.len(), 1);
        assert!(!player.take_omen(OmenCard::BarnRaising));
    }
}
