// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::angular_difference;

/// Direction of traffic on a line, relative to the order of its vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Traffic follows the vertex order.
    Forward,

    /// Traffic goes against the vertex order.
    Backward,

    #[default]
    Ambiguous,
}

/// Terminal nodes of a line in the graph, with the bearings of its first
/// and last segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineEnds {
    pub start: u32,
    pub end: u32,
    pub start_bearing: f64,
    pub end_bearing: f64,
}

impl LineEnds {
    /// Returns the ends of the same line drawn in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
            start_bearing: (self.end_bearing + 180.0) % 360.0,
            end_bearing: (self.start_bearing + 180.0) % 360.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Attachment {
    line: usize,
    is_start: bool,
    bearing: f64,
}

/// Infers the [Direction] of every line from how it connects to its neighbors.
///
/// A line sharing its start node with an aligned line which ends there is fed
/// by that line, and a line sharing its end node with an aligned line which starts
/// there feeds it; both are votes for [Direction::Forward]. Aligned neighbors attached
/// by the same kind of end vote for [Direction::Backward]. Lines are aligned if their
/// bearings at the shared node differ by less than `threshold` degrees.
///
/// Lines set to `None` take no part in voting and get [Direction::Ambiguous].
pub fn infer_directions(lines: &[Option<LineEnds>], threshold: f64) -> Vec<Direction> {
    let mut attachments: HashMap<u32, Vec<Attachment>> = HashMap::default();
    for (line, ends) in lines.iter().enumerate() {
        let Some(ends) = ends else { continue };
        attachments.entry(ends.start).or_default().push(Attachment {
            line,
            is_start: true,
            bearing: ends.start_bearing,
        });
        attachments.entry(ends.end).or_default().push(Attachment {
            line,
            is_start: false,
            bearing: ends.end_bearing,
        });
    }

    lines
        .iter()
        .enumerate()
        .map(|(line, ends)| match ends {
            Some(ends) => vote(line, ends, &attachments, threshold),
            None => Direction::Ambiguous,
        })
        .collect()
}

fn vote(
    line: usize,
    ends: &LineEnds,
    attachments: &HashMap<u32, Vec<Attachment>>,
    threshold: f64,
) -> Direction {
    let mut forward = 0;
    let mut backward = 0;

    for neighbor in aligned(attachments, line, ends.start, ends.start_bearing, threshold) {
        if neighbor.is_start {
            backward += 1;
        } else {
            forward += 1;
        }
    }

    for neighbor in aligned(attachments, line, ends.end, ends.end_bearing, threshold) {
        if neighbor.is_start {
            forward += 1;
        } else {
            backward += 1;
        }
    }

    match forward.cmp(&backward) {
        std::cmp::Ordering::Greater => Direction::Forward,
        std::cmp::Ordering::Less => Direction::Backward,
        std::cmp::Ordering::Equal => Direction::Ambiguous,
    }
}

/// Returns other lines attached at `node` with a bearing close to `bearing`.
fn aligned(
    attachments: &HashMap<u32, Vec<Attachment>>,
    line: usize,
    node: u32,
    bearing: f64,
    threshold: f64,
) -> impl Iterator<Item = &Attachment> {
    attachments
        .get(&node)
        .into_iter()
        .flatten()
        .filter(move |a| a.line != line && angular_difference(a.bearing, bearing) < threshold)
}
