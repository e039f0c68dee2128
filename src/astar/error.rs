// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Reasons why [find_route](crate::find_route) did not produce a route.
///
/// None of these are fatal: callers (like the [navigation](crate::navigation) session)
/// treat every variant as "no route" and may retry with different parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    /// The set of acceptable destination nodes is empty.
    NoDestinations,

    /// The start node (or the anchor destination node) doesn't exist in the graph.
    InvalidReference(u32),

    /// The graph has more nodes than the [SearchContext](crate::SearchContext) can hold.
    CapacityExceeded { nodes: usize, capacity: usize },

    /// Every node reachable from the start was expanded without reaching a destination.
    Exhausted,

    /// Route search has exceeded its iteration budget.
    /// Either the nodes are really far apart, or no route exists.
    ///
    /// Concluding that no route exists requires traversing the whole graph,
    /// which is too slow for real-time use. The budget protects against that.
    StepLimitExceeded,

    /// Walking back the parent pointers exceeded the path length cap,
    /// which can only happen with corrupted search state.
    PathTooLong,
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDestinations => write!(f, "no destination nodes"),
            Self::InvalidReference(node_id) => write!(f, "invalid node: {}", node_id),
            Self::CapacityExceeded { nodes, capacity } => write!(
                f,
                "graph has {} nodes, but the search context only holds {}",
                nodes, capacity
            ),
            Self::Exhausted => write!(f, "no route exists"),
            Self::StepLimitExceeded => write!(f, "step limit exceeded"),
            Self::PathTooLong => write!(f, "path reconstruction exceeded its length cap"),
        }
    }
}

impl std::error::Error for SearchError {}
