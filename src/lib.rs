// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Turn-aware truck routing and live navigation over a pre-built road graph.
//!
//! The crate has two halves. The offline [builder] converts GeoJSON road
//! polylines into a deduplicated, directed, weighted graph with inferred one-way
//! topology, and stores it in a [packed] form. At runtime the packed data is loaded
//! into a [Graph], searched with a heading- and turn-aware A* ([find_route]), and
//! wrapped by a [navigation] session which keeps a route up to date while the
//! vehicle moves.
//!
//! # Example
//!
//! ```no_run
//! let packed = haulroute::packed::read_dir("path/to/roadnetwork").expect("failed to read graph");
//! let g = haulroute::Graph::from_packed(&packed).expect("invalid graph");
//!
//! let start = g.find_nearest_node([7.4246, 43.7384], 0.05).unwrap();
//! let end = g.find_nearest_node([7.4323, 43.7478], 0.05).unwrap();
//!
//! let mut ctx = haulroute::SearchContext::new(haulroute::DEFAULT_MAX_NODES);
//! let query = haulroute::SearchQuery::new(start.id, [end.id]);
//! let route = haulroute::find_route(&g, &mut ctx, &query, &haulroute::TRUCK_PROFILE)
//!     .expect("failed to find route");
//!
//! println!("Route: {:?}", route.path);
//! ```

mod astar;
pub mod builder;
mod geometry;
mod graph;
mod heap;
pub mod navigation;
pub mod packed;
pub mod spatial;

pub use astar::{
    find_route, CostProfile, Route, SearchContext, SearchError, SearchQuery, StartMode,
    DEFAULT_MAX_NODES, TRUCK_PROFILE,
};
pub use geometry::{
    angular_difference, approx_distance_km, bearing, earth_distance, planar_heading,
    project_onto_segment, radian_difference, signed_turn_angle, squared_distance,
    squared_point_segment_distance,
};
pub use graph::{Graph, LoadError};
pub use heap::MinHeap;

/// A `[longitude, latitude]` position, in degrees.
pub type Coord = [f64; 2];

/// Represents an element of the [Graph].
///
/// Ids are dense and assigned by the [builder]: a node's id
/// is its index in the graph's node table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: u32,
    pub lng: f64,
    pub lat: f64,
}

impl Node {
    /// Returns the `[lng, lat]` position of the node.
    #[inline]
    pub fn coord(&self) -> Coord {
        [self.lng, self.lat]
    }
}

/// Kind of road an [Edge] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum RoadClass {
    #[default]
    Plain = 0,

    /// Freeways and other divided roads.
    Freeway = 1,

    Roundabout = 2,
}

impl RoadClass {
    /// Returns the compact code used in the [packed] format.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parses a code produced by [RoadClass::code].
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Plain),
            1 => Some(Self::Freeway),
            2 => Some(Self::Roundabout),
            _ => None,
        }
    }
}

/// Represents an outgoing (one-way) connection from a specific [Node].
///
/// `weight` is the physical length of the segment in meters,
/// plus any penalty applied by the [builder]. It is never negative.
/// A missing reverse edge means the road is one-way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: u32,
    pub weight: f32,
    pub class: RoadClass,
}
