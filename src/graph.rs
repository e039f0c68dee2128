// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::packed::PackedGraph;
use crate::spatial::{window, SpatialIndex};
use crate::{earth_distance, Coord, Edge, Node, RoadClass};

/// Reasons why a packed dataset can't be turned into a [Graph].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("edge {from} → {to} references a node which does not exist")]
    DanglingEdge { from: u32, to: u32 },

    #[error("edge {from} → {to} has an unknown road class code {code}")]
    UnknownRoadClass { from: u32, to: u32, code: u8 },

    #[error("edge {from} → {to} has an invalid weight {weight}")]
    InvalidWeight { from: u32, to: u32, weight: f32 },

    #[error("node {0} has a non-finite position")]
    InvalidPosition(u32),

    #[error("graph has {0} nodes, which does not fit in 32-bit node ids")]
    TooManyNodes(usize),
}

/// Represents a road network as a dense table of [Nodes](Node)
/// with outgoing [Edges](Edge), plus a spatial index over node positions.
///
/// Node ids are indices into the node table. A graph is built once
/// and never mutated afterwards.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Vec<Edge>>,
    index: SpatialIndex,
}

impl Graph {
    /// Builds a graph from node positions (indexed by node id)
    /// and `(from, edge)` pairs. Edges keep their relative order
    /// in the adjacency lists.
    pub fn from_parts<I>(positions: Vec<Coord>, edges: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = (u32, Edge)>,
    {
        let count = u32::try_from(positions.len()).map_err(|_| LoadError::TooManyNodes(positions.len()))?;

        let nodes: Vec<Node> = positions
            .into_iter()
            .zip(0..count)
            .map(|(coord, id)| {
                if coord[0].is_finite() && coord[1].is_finite() {
                    Ok(Node {
                        id,
                        lng: coord[0],
                        lat: coord[1],
                    })
                } else {
                    Err(LoadError::InvalidPosition(id))
                }
            })
            .collect::<Result<_, _>>()?;

        let mut adjacency: Vec<Vec<Edge>> = vec![Vec::new(); nodes.len()];
        for (from, edge) in edges {
            if from >= count || edge.to >= count {
                return Err(LoadError::DanglingEdge { from, to: edge.to });
            }
            if !edge.weight.is_finite() || edge.weight < 0.0 {
                return Err(LoadError::InvalidWeight {
                    from,
                    to: edge.to,
                    weight: edge.weight,
                });
            }
            adjacency[from as usize].push(edge);
        }

        let index = SpatialIndex::load(nodes.iter().map(|n| (n.coord(), n.id)));
        log::debug!(
            "loaded graph with {} nodes and {} edges",
            nodes.len(),
            adjacency.iter().map(Vec::len).sum::<usize>()
        );

        Ok(Self {
            nodes,
            edges: adjacency,
            index,
        })
    }

    /// Builds a graph from the builder's [packed](crate::packed) representation.
    pub fn from_packed(packed: &PackedGraph) -> Result<Self, LoadError> {
        let positions = packed.positions();
        let mut edges = Vec::with_capacity(packed.edges.len());
        for e in &packed.edges {
            let class = RoadClass::from_code(e.class).ok_or(LoadError::UnknownRoadClass {
                from: e.from,
                to: e.to,
                code: e.class,
            })?;
            edges.push((
                e.from,
                Edge {
                    to: e.to,
                    weight: e.weight,
                    class,
                },
            ));
        }
        Self::from_parts(positions, edges)
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the total number of directed edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Returns an iterator over all [Nodes](Node) in the graph, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Retrieves a [Node] with the provided id.
    #[inline]
    pub fn get_node(&self, id: u32) -> Option<Node> {
        self.nodes.get(id as usize).copied()
    }

    /// Retrieves the `[lng, lat]` position of a node with the provided id.
    #[inline]
    pub fn coord(&self, id: u32) -> Option<Coord> {
        self.nodes.get(id as usize).map(Node::coord)
    }

    /// Gets all outgoing [Edges](Edge) from a node with a given id.
    #[inline]
    pub fn get_edges(&self, from_id: u32) -> &[Edge] {
        self.edges
            .get(from_id as usize)
            .map(|e| e.as_slice())
            .unwrap_or_default()
    }

    /// Gets the weight of an [Edge] from one node to another.
    /// If such an edge doesn't exist, returns [f32::INFINITY].
    pub fn get_edge(&self, from_id: u32, to_id: u32) -> f32 {
        self.get_edges(from_id)
            .iter()
            .find(|e| e.to == to_id)
            .map(|e| e.weight)
            .unwrap_or(f32::INFINITY)
    }

    /// Returns the [spatial index](SpatialIndex) over node positions.
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Finds up to `limit` node ids closest to `target`, ordered by increasing distance.
    ///
    /// Only nodes inside the square window of half-width `radius_deg` (in degrees)
    /// are considered. An empty result means the window was empty; callers
    /// are responsible for retrying with a larger radius.
    pub fn closest_nodes(&self, target: Coord, limit: usize, radius_deg: f64) -> Vec<u32> {
        let mut candidates: Vec<(f64, u32)> = self
            .index
            .query(window(target, radius_deg))
            .map(|(coord, id)| (earth_distance(target, coord), id))
            .collect();

        candidates.sort_by(|(a, a_id), (b, b_id)| a.total_cmp(b).then(a_id.cmp(b_id)));
        candidates.truncate(limit);
        candidates.into_iter().map(|(_, id)| id).collect()
    }

    /// Finds the closest [Node] to the given position within `radius_deg` degrees.
    pub fn find_nearest_node(&self, target: Coord, radius_deg: f64) -> Option<Node> {
        self.closest_nodes(target, 1, radius_deg)
            .first()
            .and_then(|&id| self.get_node(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(to: u32, weight: f32) -> Edge {
        Edge {
            to,
            weight,
            class: RoadClass::Plain,
        }
    }

    fn line_graph() -> Graph {
        Graph::from_parts(
            vec![[0.0, 0.0], [0.001, 0.0], [0.002, 0.0], [0.003, 0.0]],
            vec![(0, edge(1, 1.0)), (1, edge(2, 1.0)), (2, edge(3, 1.0)), (1, edge(0, 1.0))],
        )
        .unwrap()
    }

    #[test]
    fn adjacency_lookup() {
        let g = line_graph();
        assert_eq!(g.len(), 4);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.get_edges(1), &[edge(2, 1.0), edge(0, 1.0)]);
        assert!(g.get_edges(3).is_empty());
        assert!(g.get_edges(99).is_empty());
        assert_eq!(g.get_edge(0, 1), 1.0);
        assert!(g.get_edge(1, 3).is_infinite());
    }

    #[test]
    fn rejects_dangling_edges() {
        let err = Graph::from_parts(vec![[0.0, 0.0]], vec![(0, edge(5, 1.0))]).unwrap_err();
        assert_eq!(err, LoadError::DanglingEdge { from: 0, to: 5 });
    }

    #[test]
    fn rejects_invalid_weights_and_positions() {
        let err = Graph::from_parts(vec![[0.0, 0.0], [1.0, 1.0]], vec![(0, edge(1, -1.0))]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidWeight { from: 0, to: 1, .. }));

        let err = Graph::from_parts(vec![[0.0, f64::NAN]], vec![]).unwrap_err();
        assert_eq!(err, LoadError::InvalidPosition(0));
    }

    #[test]
    fn closest_nodes_sorted_and_limited() {
        let g = line_graph();
        assert_eq!(g.closest_nodes([0.0021, 0.0], 2, 0.01), vec![2, 3]);
        assert_eq!(g.closest_nodes([0.0021, 0.0], 10, 0.01), vec![2, 3, 1, 0]);
        assert!(g.closest_nodes([1.0, 1.0], 5, 0.01).is_empty());
        assert_eq!(g.find_nearest_node([0.0029, 0.0001], 0.01).map(|n| n.id), Some(3));
    }
}
