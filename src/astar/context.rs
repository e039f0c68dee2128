// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::MinHeap;

/// Recommended [SearchContext] capacity: the largest node id space
/// a single deployment is expected to handle.
pub const DEFAULT_MAX_NODES: usize = 900_000;

/// Reusable scratch state for [find_route](crate::find_route).
///
/// Holds per-node cost, parent and visited flags for a fixed number of node ids,
/// so repeated searches don't allocate. Only the slots touched by the previous
/// search are reset at the start of a new one.
///
/// A context is not meant for concurrent use; give every thread its own.
#[derive(Debug, Clone)]
pub struct SearchContext {
    costs: Vec<f64>,
    previous: Vec<Option<u32>>,
    visited: Vec<bool>,
    touched: Vec<u32>,
    pub(super) heap: MinHeap,
}

impl SearchContext {
    /// Allocates scratch buffers for node ids in `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            costs: vec![f64::INFINITY; capacity],
            previous: vec![None; capacity],
            visited: vec![false; capacity],
            touched: Vec::new(),
            heap: MinHeap::default(),
        }
    }

    /// Returns the number of node ids this context can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.costs.len()
    }

    /// Restores every slot touched since the last reset to its initial state.
    pub(super) fn reset(&mut self) {
        for id in self.touched.drain(..) {
            let i = id as usize;
            self.costs[i] = f64::INFINITY;
            self.previous[i] = None;
            self.visited[i] = false;
        }
        self.heap.clear();
    }

    #[inline]
    pub(super) fn cost(&self, id: u32) -> f64 {
        self.costs[id as usize]
    }

    #[inline]
    pub(super) fn previous(&self, id: u32) -> Option<u32> {
        self.previous[id as usize]
    }

    #[inline]
    pub(super) fn is_visited(&self, id: u32) -> bool {
        self.visited[id as usize]
    }

    #[inline]
    pub(super) fn mark_visited(&mut self, id: u32) {
        self.visited[id as usize] = true;
    }

    /// Records a better way to reach `id`.
    #[inline]
    pub(super) fn relax(&mut self, id: u32, cost: f64, previous: Option<u32>) {
        let i = id as usize;
        if self.costs[i].is_infinite() && self.previous[i].is_none() {
            self.touched.push(id);
        }
        self.costs[i] = cost;
        self.previous[i] = previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_touched_slots() {
        let mut ctx = SearchContext::new(8);
        ctx.relax(3, 12.5, Some(1));
        ctx.relax(1, 0.0, None);
        ctx.mark_visited(1);
        ctx.heap.push(3, 12.5);

        assert_eq!(ctx.cost(3), 12.5);
        assert_eq!(ctx.previous(3), Some(1));
        assert!(ctx.is_visited(1));

        ctx.reset();
        for id in 0..8 {
            assert!(ctx.cost(id).is_infinite());
            assert_eq!(ctx.previous(id), None);
            assert!(!ctx.is_visited(id));
        }
        assert!(ctx.heap.is_empty());
        assert_eq!(ctx.capacity(), 8);
    }

    #[test]
    fn relaxing_twice_records_one_touch() {
        let mut ctx = SearchContext::new(4);
        ctx.relax(2, 10.0, Some(0));
        ctx.relax(2, 5.0, Some(1));
        assert_eq!(ctx.touched, vec![2]);
    }
}
