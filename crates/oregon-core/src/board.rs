//! Game board representation including hexes, buildings, and harbors.
//!
//! This module contains:
//! - Resource and terrain types (Oregon themed)
//! - Hexes, structures and harbors
//! - The id-keyed board built on top of [`crate::topology`]
//! - The standard 19-hex layout generator
//! - Board queries and the primitive mutations used by the orchestrator

use crate::hex::HexCoord;
use crate::topology::{build_topology, Edge, EdgeId, Vertex, VertexId};
use im::Vector;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Player identifier (1-4)
pub type PlayerId = u8;

/// Hex identifier: the hex's position in the board layout
pub type HexId = usize;

/// Resource types - Oregon themed!
///
/// - Wood: Douglas fir stands of the Cascades
/// - Brick: Willamette river clay
/// - Sheep: high desert ranches
/// - Wheat: Columbia plateau farms
/// - Ore: Blue Mountain mines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Wood,
    Brick,
    Sheep,
    Wheat,
    Ore,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Wood,
        Resource::Brick,
        Resource::Sheep,
        Resource::Wheat,
        Resource::Ore,
    ];

    /// Lowercase name used in log messages
    pub fn name(&self) -> &'static str {
        match self {
            Resource::Wood => "wood",
            Resource::Brick => "brick",
            Resource::Sheep => "sheep",
            Resource::Wheat => "wheat",
            Resource::Ore => "ore",
        }
    }
}

/// Terrain of a hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Wood,
    Brick,
    Sheep,
    Wheat,
    Ore,
    /// Produces nothing; the robber starts here
    Desert,
}

impl Terrain {
    /// The resource this terrain produces, if any
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Terrain::Wood => Some(Resource::Wood),
            Terrain::Brick => Some(Resource::Brick),
            Terrain::Sheep => Some(Resource::Sheep),
            Terrain::Wheat => Some(Resource::Wheat),
            Terrain::Ore => Some(Resource::Ore),
            Terrain::Desert => None,
        }
    }
}

/// A single hex tile on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hex {
    pub id: HexId,
    /// Position on the hex grid
    pub coord: HexCoord,
    pub terrain: Terrain,
    /// Dice number that triggers production (2-12, None for desert)
    pub number: Option<u8>,
}

impl Hex {
    /// Create a producing hex
    pub fn new(id: HexId, coord: HexCoord, terrain: Terrain, number: u8) -> Self {
        Self {
            id,
            coord,
            terrain,
            number: terrain.resource().map(|_| number),
        }
    }

    /// Create a desert hex
    pub fn desert(id: HexId, coord: HexCoord) -> Self {
        Self {
            id,
            coord,
            terrain: Terrain::Desert,
            number: None,
        }
    }

    /// Get the resource this hex produces, if any
    pub fn resource(&self) -> Option<Resource> {
        self.terrain.resource()
    }
}

/// Kind of structure standing on a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureKind {
    Settlement,
    City,
}

/// A settlement or city
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub owner: PlayerId,
    pub kind: StructureKind,
}

impl Structure {
    pub fn settlement(owner: PlayerId) -> Self {
        Self {
            owner,
            kind: StructureKind::Settlement,
        }
    }

    pub fn city(owner: PlayerId) -> Self {
        Self {
            owner,
            kind: StructureKind::City,
        }
    }

    /// Victory points provided by this building
    pub fn victory_points(&self) -> u32 {
        match self.kind {
            StructureKind::Settlement => 1,
            StructureKind::City => 2,
        }
    }

    /// Resource multiplier (how many resources per production)
    pub fn production(&self) -> u32 {
        match self.kind {
            StructureKind::Settlement => 1,
            StructureKind::City => 2,
        }
    }
}

/// Harbor types for bank trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarborKind {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl HarborKind {
    /// The exchange rate for this harbor
    pub fn rate(&self) -> u32 {
        match self {
            HarborKind::Generic => 3,
            HarborKind::Specific(_) => 2,
        }
    }
}

/// Harbor placement on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Harbor {
    pub kind: HarborKind,
    /// The coastal edge where ships dock
    pub edge: EdgeId,
    /// Both endpoints of that edge; a structure on either grants the rate
    pub vertices: [VertexId; 2],
}

/// The complete game board.
///
/// Hex, vertex and edge ids are positions in their respective vectors.
/// Collections are persistent (`im`), so cloning a board shares structure
/// with the original and only the touched vertex or edge is copied on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    hexes: Vector<Hex>,
    vertices: Vector<Vertex>,
    edges: Vector<Edge>,
    hex_corners: Vector<[VertexId; 6]>,
    harbors: Vector<Harbor>,
    robber_hex: HexId,
}

impl Board {
    /// Build a board from a hex layout.
    ///
    /// Hex ids are reassigned to their position in `hexes`. The robber starts
    /// on the first desert. A layout with no desert puts it on hex 0, which
    /// then produces nothing until the robber is moved off it.
    pub fn new(hexes: Vec<Hex>) -> Self {
        let hexes: Vec<Hex> = hexes
            .into_iter()
            .enumerate()
            .map(|(id, hex)| Hex { id, ..hex })
            .collect();

        let topology = build_topology(&hexes);
        let robber_hex = hexes
            .iter()
            .find(|h| h.terrain == Terrain::Desert)
            .map(|h| h.id)
            .unwrap_or(0);

        Self {
            hexes: hexes.into_iter().collect(),
            vertices: topology.vertices.into_iter().collect(),
            edges: topology.edges.into_iter().collect(),
            hex_corners: topology.hex_corners.into_iter().collect(),
            harbors: Vector::new(),
            robber_hex,
        }
    }

    /// Attach harbors to coastal edges. Edges that are unknown or not on the
    /// coast are skipped.
    pub fn with_harbors(mut self, harbors: impl IntoIterator<Item = (EdgeId, HarborKind)>) -> Self {
        for (edge_id, kind) in harbors {
            if let Some(edge) = self.edges.get(edge_id) {
                if edge.is_coastal() {
                    self.harbors.push_back(Harbor {
                        kind,
                        edge: edge_id,
                        vertices: edge.vertices,
                    });
                }
            }
        }
        self
    }

    /// Create the standard Oregon board layout with randomized tiles and numbers
    pub fn standard() -> Self {
        let mut rng = rand::thread_rng();
        Self::standard_with_rng(&mut rng)
    }

    /// Create the standard board layout with a provided RNG
    /// This allows for deterministic board generation when needed
    pub fn standard_with_rng<R: Rng>(rng: &mut R) -> Self {
        let board = Self::new(Self::standard_layout(rng));
        let harbors = board.standard_harbors(rng);
        board.with_harbors(harbors)
    }

    /// The 19 land hexes of the standard board with shuffled terrain and numbers.
    ///
    /// Distribution: 4 wood, 4 wheat, 4 sheep, 3 ore, 3 brick, 1 desert.
    pub fn standard_layout<R: Rng>(rng: &mut R) -> Vec<Hex> {
        let coords = HexCoord::new(0, 0).spiral(2);

        let mut terrains: Vec<Terrain> = Vec::with_capacity(coords.len());
        terrains.extend(std::iter::repeat(Terrain::Wood).take(4));
        terrains.extend(std::iter::repeat(Terrain::Wheat).take(4));
        terrains.extend(std::iter::repeat(Terrain::Sheep).take(4));
        terrains.extend(std::iter::repeat(Terrain::Ore).take(3));
        terrains.extend(std::iter::repeat(Terrain::Brick).take(3));
        terrains.push(Terrain::Desert);
        terrains.shuffle(rng);

        // Numbers: 2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12
        let numbers: Vec<u8> = vec![2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

        let producing: Vec<HexCoord> = coords
            .iter()
            .zip(terrains.iter())
            .filter(|(_, t)| **t != Terrain::Desert)
            .map(|(c, _)| *c)
            .collect();
        let assignment = Self::assign_numbers_avoiding_adjacent_68(&producing, &numbers, rng);
        let mut numbers_by_coord: HashMap<HexCoord, u8> =
            producing.into_iter().zip(assignment).collect();

        coords
            .into_iter()
            .zip(terrains)
            .enumerate()
            .map(|(id, (coord, terrain))| match numbers_by_coord.remove(&coord) {
                Some(number) => Hex::new(id, coord, terrain, number),
                None => Hex::desert(id, coord),
            })
            .collect()
    }

    /// Assign dice numbers to positions while trying to avoid 6 and 8 being adjacent
    fn assign_numbers_avoiding_adjacent_68<R: Rng>(
        coords: &[HexCoord],
        numbers: &[u8],
        rng: &mut R,
    ) -> Vec<u8> {
        const MAX_ATTEMPTS: usize = 100;

        let mut shuffled = numbers.to_vec();
        for _ in 0..MAX_ATTEMPTS {
            shuffled.shuffle(rng);
            if Self::is_valid_number_placement(coords, &shuffled) {
                return shuffled;
            }
        }

        // Rare: fall back to the last shuffle so generation always completes
        shuffled
    }

    /// Check if a number placement is valid (no adjacent 6 and 8)
    fn is_valid_number_placement(coords: &[HexCoord], numbers: &[u8]) -> bool {
        let hot = |n: u8| n == 6 || n == 8;
        for (i, a) in coords.iter().enumerate() {
            if !hot(numbers[i]) {
                continue;
            }
            for (j, b) in coords.iter().enumerate().skip(i + 1) {
                if hot(numbers[j]) && a.is_adjacent(b) {
                    return false;
                }
            }
        }
        true
    }

    /// Standard harbors: 4 generic (3:1) and 5 specific (2:1, one per resource)
    /// on coastal edges spread around the board
    fn standard_harbors<R: Rng>(&self, rng: &mut R) -> Vec<(EdgeId, HarborKind)> {
        let mut kinds = vec![
            HarborKind::Generic,
            HarborKind::Generic,
            HarborKind::Generic,
            HarborKind::Generic,
            HarborKind::Specific(Resource::Wood),
            HarborKind::Specific(Resource::Brick),
            HarborKind::Specific(Resource::Sheep),
            HarborKind::Specific(Resource::Wheat),
            HarborKind::Specific(Resource::Ore),
        ];
        kinds.shuffle(rng);

        let selected = self.select_distributed_coastal_edges(kinds.len(), rng);
        selected.into_iter().zip(kinds).collect()
    }

    /// Select `count` coastal edges that are well-distributed around the board.
    /// Edges sharing a vertex with an already selected edge are never chosen,
    /// so no vertex touches two harbors.
    fn select_distributed_coastal_edges<R: Rng>(&self, count: usize, rng: &mut R) -> Vec<EdgeId> {
        let mut available = self.coastal_edges();
        available.shuffle(rng);

        let mut selected: Vec<EdgeId> = Vec::new();
        while selected.len() < count {
            let best = available
                .iter()
                .enumerate()
                .filter(|(_, e)| !selected.iter().any(|s| self.edges_share_vertex(*s, **e)))
                .map(|(idx, e)| {
                    let min_dist = selected
                        .iter()
                        .map(|s| self.edge_distance(*s, *e))
                        .fold(f64::MAX, f64::min);
                    (idx, min_dist)
                })
                .fold(None, |best: Option<(usize, f64)>, (idx, dist)| match best {
                    Some((_, d)) if d >= dist => best,
                    _ => Some((idx, dist)),
                });

            match best {
                Some((idx, _)) => selected.push(available.remove(idx)),
                None => break,
            }
        }

        selected
    }

    fn edges_share_vertex(&self, a: EdgeId, b: EdgeId) -> bool {
        let a = self.edges[a].vertices;
        let b = self.edges[b].vertices;
        a.iter().any(|v| b.contains(v))
    }

    /// Approximate distance between two edges using their midpoints
    fn edge_distance(&self, a: EdgeId, b: EdgeId) -> f64 {
        let (x1, y1) = self.edge_midpoint(a);
        let (x2, y2) = self.edge_midpoint(b);
        ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
    }

    /// Midpoint of an edge in unit-hex pixel space
    pub fn edge_midpoint(&self, edge: EdgeId) -> (f64, f64) {
        let [a, b] = self.edges[edge].vertices;
        let (x1, y1) = self.vertices[a].position;
        let (x2, y2) = self.vertices[b].position;
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }

    // ==================== Query Methods ====================

    pub fn hexes(&self) -> impl Iterator<Item = &Hex> {
        self.hexes.iter()
    }

    pub fn hex(&self, id: HexId) -> Option<&Hex> {
        self.hexes.get(id)
    }

    pub fn hex_count(&self) -> usize {
        self.hexes.len()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn harbors(&self) -> impl Iterator<Item = &Harbor> {
        self.harbors.iter()
    }

    /// Get the robber's current location
    pub fn robber_hex(&self) -> HexId {
        self.robber_hex
    }

    /// The six corner vertices of a hex, clockwise from the upper-right corner
    pub fn hex_corners(&self, hex: HexId) -> Option<[VertexId; 6]> {
        self.hex_corners.get(hex).copied()
    }

    /// Structure standing on a vertex
    pub fn structure_at(&self, vertex: VertexId) -> Option<Structure> {
        self.vertices.get(vertex).and_then(|v| v.structure)
    }

    /// Owner of the road on an edge
    pub fn road_owner(&self, edge: EdgeId) -> Option<PlayerId> {
        self.edges.get(edge).and_then(|e| e.road)
    }

    /// The edge joining two vertices, if they are neighbours
    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.vertices
            .get(a)?
            .edges
            .iter()
            .copied()
            .find(|e| self.edges.get(*e).is_some_and(|edge| edge.touches(b)))
    }

    /// Edges bordering exactly one hex
    pub fn coastal_edges(&self) -> Vec<EdgeId> {
        self.edges.iter().filter(|e| e.is_coastal()).map(|e| e.id).collect()
    }

    /// Hexes a vertex borders
    pub fn hexes_at_vertex(&self, vertex: VertexId) -> impl Iterator<Item = &Hex> {
        self.vertices
            .get(vertex)
            .into_iter()
            .flat_map(|v| v.hexes.iter())
            .filter_map(|h| self.hexes.get(*h))
    }

    /// Get all harbors a player has access to (through their buildings)
    pub fn player_harbors(&self, player: PlayerId) -> Vec<HarborKind> {
        self.harbors
            .iter()
            .filter(|harbor| {
                harbor
                    .vertices
                    .iter()
                    .any(|v| self.structure_at(*v).is_some_and(|s| s.owner == player))
            })
            .map(|harbor| harbor.kind)
            .collect()
    }

    /// Players with a structure on a corner of the hex, in ascending id order
    pub fn players_on_hex(&self, hex: HexId) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self
            .hex_corners(hex)
            .into_iter()
            .flatten()
            .filter_map(|v| self.structure_at(v).map(|s| s.owner))
            .collect();
        players.sort_unstable();
        players.dedup();
        players
    }

    /// Vertices holding a structure owned by `player`
    pub fn structures_of(&self, player: PlayerId) -> impl Iterator<Item = (VertexId, Structure)> + '_ {
        self.vertices.iter().filter_map(move |v| match v.structure {
            Some(s) if s.owner == player => Some((v.id, s)),
            _ => None,
        })
    }

    /// Edges holding a road owned by `player`
    pub fn roads_of(&self, player: PlayerId) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.road == Some(player))
            .map(|e| e.id)
    }

    /// Victory points from structures on the board
    pub fn structure_points(&self, player: PlayerId) -> u32 {
        self.structures_of(player).map(|(_, s)| s.victory_points()).sum()
    }

    // ==================== Mutation Methods ====================
    //
    // These assume validation already happened; legality lives in `placement`.

    /// Place a settlement
    pub fn place_settlement(&mut self, vertex: VertexId, player: PlayerId) {
        if let Some(v) = self.vertices.get_mut(vertex) {
            v.structure = Some(Structure::settlement(player));
        }
    }

    /// Upgrade a settlement to a city in place
    pub fn upgrade_to_city(&mut self, vertex: VertexId) {
        if let Some(v) = self.vertices.get_mut(vertex) {
            if let Some(s) = v.structure.as_mut() {
                s.kind = StructureKind::City;
            }
        }
    }

    /// Place a road
    pub fn place_road(&mut self, edge: EdgeId, player: PlayerId) {
        if let Some(e) = self.edges.get_mut(edge) {
            e.road = Some(player);
        }
    }

    /// Move the robber to a new location
    pub fn move_robber(&mut self, hex: HexId) {
        if hex < self.hexes.len() {
            self.robber_hex = hex;
        }
    }

    /// Ids match positions and every cross-reference points at something
    /// that exists. Used when loading a snapshot.
    pub fn is_consistent(&self) -> bool {
        let hexes = self.hexes.len();
        let vertices = self.vertices.len();
        let edges = self.edges.len();

        self.robber_hex < hexes
            && self.hex_corners.len() == hexes
            && self.hexes.iter().enumerate().all(|(i, h)| h.id == i)
            && self.hex_corners.iter().flatten().all(|v| *v < vertices)
            && self.vertices.iter().enumerate().all(|(i, v)| {
                v.id == i
                    && v.hexes.iter().all(|h| *h < hexes)
                    && v.edges.iter().all(|e| *e < edges)
                    && v.neighbors.iter().all(|n| *n < vertices)
            })
            && self.edges.iter().enumerate().all(|(i, e)| {
                e.id == i && e.vertices.iter().all(|v| *v < vertices) && e.hexes.iter().all(|h| *h < hexes)
            })
            && self
                .harbors
                .iter()
                .all(|h| h.edge < edges && h.vertices.iter().all(|v| *v < vertices))
    }
}
