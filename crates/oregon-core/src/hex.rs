//! Axial hex coordinates and pointy-top geometry.
//!
//! Only the hex grid lives here. Vertices and edges are derived from corner
//! positions in [`crate::topology`], so the engine never reasons about corner
//! coordinates directly.

use serde::{Deserialize, Serialize};

/// Unit steps to the six neighbouring hexes, clockwise from east.
const DIRECTIONS: [(i32, i32); 6] = [(1, 0), (0, 1), (-1, 1), (-1, 0), (0, -1), (1, -1)];

/// Axial position of a hex; `q` grows eastward, `r` south-eastward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    fn step(&self, (dq, dr): (i32, i32)) -> Self {
        Self::new(self.q + dq, self.r + dr)
    }

    /// Neighbouring hexes, clockwise from east
    pub fn neighbors(&self) -> [HexCoord; 6] {
        DIRECTIONS.map(|d| self.step(d))
    }

    pub fn is_adjacent(&self, other: &HexCoord) -> bool {
        self.distance_to(other) == 1
    }

    /// Steps between two hexes
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        let dq = self.q - other.q;
        let dr = self.r - other.r;
        ((dq.abs() + dr.abs() + (dq + dr).abs()) / 2) as u32
    }

    /// This hex followed by every ring out to `radius`.
    ///
    /// Each ring starts east of the centre and walks clockwise; the standard
    /// layout deals terrain and numbers in this order.
    pub fn spiral(&self, radius: u32) -> Vec<HexCoord> {
        let mut hexes = vec![*self];
        for ring in 1..=radius as i32 {
            let mut hex = self.step((ring, -ring));
            for direction in DIRECTIONS.iter().cycle().skip(1).take(6) {
                for _ in 0..ring {
                    hex = hex.step(*direction);
                    hexes.push(hex);
                }
            }
        }
        hexes
    }

    /// Centre of the hex for a circumradius of `size`
    pub fn to_pixel(&self, size: f64) -> (f64, f64) {
        let root3 = 3.0_f64.sqrt();
        let x = size * root3 * (self.q as f64 + self.r as f64 / 2.0);
        let y = size * 1.5 * self.r as f64;
        (x, y)
    }

    /// Corner positions, clockwise from the upper-right one.
    ///
    /// Corner `i` sits at `60 * i - 30` degrees, so corner 5 is the top and
    /// corner 2 the bottom.
    pub fn corners(&self, size: f64) -> [(f64, f64); 6] {
        let (cx, cy) = self.to_pixel(size);
        std::array::from_fn(|i| {
            let angle = (60.0 * i as f64 - 30.0).to_radians();
            (cx + size * angle.cos(), cy + size * angle.sin())
        })
    }
}
