// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use crate::Coord;

/// Axis-aligned bounding box: left (min lng), bottom (min lat), right (max lng), top (max lat).
pub type BBox = [f64; 4];

/// Returns the square [BBox] with the given half-width around `center`.
#[inline]
pub fn window(center: Coord, half_width: f64) -> BBox {
    [
        center[0] - half_width,
        center[1] - half_width,
        center[0] + half_width,
        center[1] + half_width,
    ]
}

#[inline]
fn envelope(bbox: BBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox[0], bbox[1]], [bbox[2], bbox[3]])
}

type IndexedPoint = GeomWithData<[f64; 2], u32>;

/// R-tree over node positions, used to speed up nearest-node lookups.
///
/// The index assumes planar lng/lat geometry; windows crossing
/// the antimeridian are not supported.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
}

impl SpatialIndex {
    /// Bulk-builds an index from a static set of `(position, id)` pairs.
    pub fn load<I: IntoIterator<Item = (Coord, u32)>>(points: I) -> Self {
        let points = points
            .into_iter()
            .map(|(coord, id)| IndexedPoint::new(coord, id))
            .collect();
        Self {
            tree: RTree::bulk_load(points),
        }
    }

    /// Adds a single point to the index.
    pub fn insert(&mut self, coord: Coord, id: u32) {
        self.tree.insert(IndexedPoint::new(coord, id));
    }

    /// Returns the number of indexed points.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Returns all indexed points inside the provided [BBox], in no particular order.
    pub fn query(&self, bbox: BBox) -> impl Iterator<Item = (Coord, u32)> + '_ {
        self.tree
            .locate_in_envelope_intersecting(&envelope(bbox))
            .map(|p| (*p.geom(), p.data))
    }
}

type IndexedLine = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// R-tree over polyline bounding boxes, used by the graph builder
/// to find lines passing near a point.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    tree: RTree<IndexedLine>,
}

impl LineIndex {
    /// Builds an index over the bounding boxes of all provided lines.
    /// Items are identified by their position in the iterator.
    pub fn load<'a, I: IntoIterator<Item = &'a [Coord]>>(lines: I) -> Self {
        let items = lines
            .into_iter()
            .enumerate()
            .filter_map(|(idx, coords)| {
                bounding_box(coords).map(|bbox| {
                    IndexedLine::new(
                        Rectangle::from_corners([bbox[0], bbox[1]], [bbox[2], bbox[3]]),
                        idx,
                    )
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// Returns indices of all lines whose bounding box intersects the provided [BBox].
    pub fn query(&self, bbox: BBox) -> impl Iterator<Item = usize> + '_ {
        self.tree
            .locate_in_envelope_intersecting(&envelope(bbox))
            .map(|l| l.data)
    }
}

/// Computes the bounding box of a set of positions,
/// returning `None` for an empty set.
pub fn bounding_box(coords: &[Coord]) -> Option<BBox> {
    let first = coords.first()?;
    Some(coords.iter().fold(
        [first[0], first[1], first[0], first[1]],
        |[min_x, min_y, max_x, max_y], c| {
            [min_x.min(c[0]), min_y.min(c[1]), max_x.max(c[0]), max_y.max(c[1])]
        },
    ))
}
