//! Vertex/edge graph derived from a hex layout.
//!
//! Every hex corner becomes (or reuses) a shared vertex, identified by its
//! pixel position rounded to three decimals. Every pair of consecutive corners
//! becomes (or reuses) an edge. Ids are handed out in first-seen order while
//! walking the hexes in input order and each hex's corners clockwise, so the
//! same layout always yields the same ids.

use crate::board::{Hex, HexId, PlayerId, Structure};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Vertex identifier: the vertex's position in the board's vertex list
pub type VertexId = usize;

/// Edge identifier: the edge's position in the board's edge list
pub type EdgeId = usize;

/// Corner positions are compared at this precision
const CORNER_PRECISION: f64 = 1000.0;

/// A corner shared by up to three hexes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    /// Pixel position for a unit-sized hex grid
    pub position: (f64, f64),
    /// Bordering hexes (1-3)
    pub hexes: Vec<HexId>,
    /// Incident edges (2-3)
    pub edges: Vec<EdgeId>,
    /// Vertices one edge away
    pub neighbors: Vec<VertexId>,
    pub structure: Option<Structure>,
}

impl Vertex {
    pub fn is_occupied(&self) -> bool {
        self.structure.is_some()
    }

    /// Owner of the structure on this vertex
    pub fn owner(&self) -> Option<PlayerId> {
        self.structure.map(|s| s.owner)
    }
}

/// A side shared by one or two hexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// Endpoints, lower id first
    pub vertices: [VertexId; 2],
    /// Bordering hexes; a single hex means the edge is on the coast
    pub hexes: Vec<HexId>,
    pub road: Option<PlayerId>,
}

impl Edge {
    pub fn is_coastal(&self) -> bool {
        self.hexes.len() == 1
    }

    pub fn touches(&self, vertex: VertexId) -> bool {
        self.vertices.contains(&vertex)
    }

    /// The endpoint opposite `vertex`, if `vertex` is an endpoint
    pub fn other_end(&self, vertex: VertexId) -> Option<VertexId> {
        match self.vertices {
            [a, b] if a == vertex => Some(b),
            [a, b] if b == vertex => Some(a),
            _ => None,
        }
    }
}

/// Output of [`build_topology`]
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
    /// The six vertex ids of each hex, indexed by hex position in the input
    pub hex_corners: Vec<[VertexId; 6]>,
}

fn corner_key((x, y): (f64, f64)) -> (i64, i64) {
    (
        (x * CORNER_PRECISION).round() as i64,
        (y * CORNER_PRECISION).round() as i64,
    )
}

/// Build the shared vertex and edge graph for a hex layout.
///
/// Pure and deterministic. Hex ids recorded on vertices and edges are taken
/// from `hex.id`.
pub fn build_topology(hexes: &[Hex]) -> Topology {
    let mut vertices: Vec<Vertex> = Vec::new();
    let mut edges: Vec<Edge> = Vec::new();
    let mut hex_corners: Vec<[VertexId; 6]> = Vec::with_capacity(hexes.len());

    let mut vertex_index: HashMap<(i64, i64), VertexId> = HashMap::new();
    let mut edge_index: HashMap<(VertexId, VertexId), EdgeId> = HashMap::new();

    for hex in hexes {
        let mut corners = [0; 6];

        for (slot, corner) in corners.iter_mut().zip(hex.coord.corners(1.0)) {
            let key = corner_key(corner);
            let id = match vertex_index.get(&key) {
                Some(&id) => id,
                None => {
                    let id = vertices.len();
                    vertices.push(Vertex {
                        id,
                        position: (
                            key.0 as f64 / CORNER_PRECISION,
                            key.1 as f64 / CORNER_PRECISION,
                        ),
                        hexes: Vec::new(),
                        edges: Vec::new(),
                        neighbors: Vec::new(),
                        structure: None,
                    });
                    vertex_index.insert(key, id);
                    id
                }
            };
            if !vertices[id].hexes.contains(&hex.id) {
                vertices[id].hexes.push(hex.id);
            }
            *slot = id;
        }

        for i in 0..6 {
            let (a, b) = (corners[i], corners[(i + 1) % 6]);
            let key = (a.min(b), a.max(b));
            let id = match edge_index.get(&key) {
                Some(&id) => id,
                None => {
                    let id = edges.len();
                    edges.push(Edge {
                        id,
                        vertices: [key.0, key.1],
                        hexes: Vec::new(),
                        road: None,
                    });
                    edge_index.insert(key, id);
                    vertices[a].edges.push(id);
                    vertices[b].edges.push(id);
                    vertices[a].neighbors.push(b);
                    vertices[b].neighbors.push(a);
                    id
                }
            };
            if !edges[id].hexes.contains(&hex.id) {
                edges[id].hexes.push(hex.id);
            }
        }

        hex_corners.push(corners);
    }

    Topology {
        vertices,
        edges,
        hex_corners,
    }
}
