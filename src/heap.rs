// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Default number of slots allocated by [MinHeap::default].
pub const DEFAULT_HEAP_CAPACITY: usize = 50_000;

/// Array-backed binary min-heap over `(node id, cost)` pairs.
///
/// There is no decrease-key operation. The same id may be pushed multiple times,
/// and callers are expected to skip stale entries (e.g. with a "visited" flag).
/// Entries with equal costs are popped in an unspecified order.
#[derive(Debug, Clone)]
pub struct MinHeap {
    ids: Vec<u32>,
    costs: Vec<f64>,
    len: usize,
}

impl Default for MinHeap {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HEAP_CAPACITY)
    }
}

impl MinHeap {
    /// Creates an empty heap with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ids: vec![0; capacity],
            costs: vec![0.0; capacity],
            len: 0,
        }
    }

    /// Returns the number of entries in the heap.
    #[inline]
    pub fn size(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of entries the heap can hold without growing.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ids.len()
    }

    /// Removes all entries, keeping the allocated storage.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Inserts an entry, doubling the backing storage when full.
    pub fn push(&mut self, id: u32, cost: f64) {
        if self.len >= self.ids.len() {
            self.grow();
        }

        self.ids[self.len] = id;
        self.costs[self.len] = cost;
        self.sift_up(self.len);
        self.len += 1;
    }

    /// Removes and returns the id with the lowest cost,
    /// or `None` if the heap is empty.
    pub fn pop(&mut self) -> Option<u32> {
        if self.len == 0 {
            return None;
        }

        let top = self.ids[0];
        self.len -= 1;

        if self.len > 0 {
            self.ids[0] = self.ids[self.len];
            self.costs[0] = self.costs[self.len];
            self.sift_down(0);
        }

        Some(top)
    }

    fn grow(&mut self) {
        let new_capacity = self.ids.len() * 2;
        self.ids.resize(new_capacity, 0);
        self.costs.resize(new_capacity, 0.0);
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.costs[index] >= self.costs[parent] {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < self.len && self.costs[left] < self.costs[smallest] {
                smallest = left;
            }
            if right < self.len && self.costs[right] < self.costs[smallest] {
                smallest = right;
            }
            if smallest == index {
                break;
            }

            self.swap(index, smallest);
            index = smallest;
        }
    }

    #[inline]
    fn swap(&mut self, i: usize, j: usize) {
        self.ids.swap(i, j);
        self.costs.swap(i, j);
    }
}
