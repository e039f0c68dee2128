// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Offline conversion of GeoJSON road polylines into a routing graph.
//!
//! Roads are snapped together at their endpoints, split at junctions,
//! deduplicated into nodes and turned into weighted, directed edges.
//! One-way information comes from the `roadType` property (roundabouts),
//! lane counts and the way roads connect to each other.

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use graph_builder::GraphBuilder;

use crate::packed::{PackedEdge, PackedGraph};
use crate::{Coord, Edge, Graph, LoadError};

mod geojson;
mod graph_builder;
mod model;
mod topology;

pub use model::{RoadProps, RoadType};
pub use topology::{infer_directions, Direction, LineEnds};

/// Format of the input road network file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the content
    #[default]
    Unknown,

    /// Force uncompressed [GeoJSON](https://datatracker.ietf.org/doc/html/rfc7946)
    GeoJson,

    /// Force [GeoJSON](https://datatracker.ietf.org/doc/html/rfc7946)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    GeoJsonGz,

    /// Force [GeoJSON](https://datatracker.ietf.org/doc/html/rfc7946)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    GeoJsonBz2,
}

impl FileFormat {
    /// Guesses the format from the first bytes of the input.
    pub fn detect(head: &[u8]) -> Self {
        if head.starts_with(&[0x1f, 0x8b]) {
            Self::GeoJsonGz
        } else if head.starts_with(b"BZh") {
            Self::GeoJsonBz2
        } else {
            Self::GeoJson
        }
    }
}

/// Additional controls for converting road polylines into a [Graph].
///
/// Distances are in meters, unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    /// Format of the input data.
    pub file_format: FileFormat,

    /// Line endpoints closer than this are merged into their centroid.
    pub endpoint_snap_tolerance: f64,

    /// Line endpoints closer than this to another line create a junction on that line.
    pub junction_snap_distance: f64,

    /// Half-width of the window (in degrees) used to look for lines near an endpoint.
    pub junction_window: f64,

    /// Vertices closer than this become a single node.
    pub node_merge_tolerance: f64,

    /// Half-width of the window (in degrees) used to look for nodes to merge with.
    pub node_merge_window: f64,

    /// Split points closer than this (in kilometers along the line) to the previous
    /// one are dropped.
    pub position_epsilon: f64,

    /// Maximum bearing difference (in degrees) for two lines to count as aligned
    /// when inferring one-way topology.
    pub alignment_threshold: f64,

    /// Added to the weight of freeway edges going against the direction of traffic.
    pub against_traffic_penalty: f32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            file_format: FileFormat::Unknown,
            endpoint_snap_tolerance: 3.0,
            junction_snap_distance: 5.0,
            junction_window: 0.0002,
            node_merge_tolerance: 0.5,
            node_merge_window: 0.000005,
            position_epsilon: 1e-6,
            alignment_threshold: 60.0,
            against_traffic_penalty: 300.0,
        }
    }
}

/// Errors which prevent a road network from being read.
///
/// Individual malformed features are not errors - they are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a FeatureCollection, got {0:?}")]
    NotAFeatureCollection(String),
}

/// Counters collected while building a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildStats {
    /// Features in the input, including skipped ones.
    pub features: usize,

    /// Malformed features which were skipped.
    pub skipped: usize,

    /// Line endpoints moved by endpoint snapping.
    pub snapped_endpoints: usize,

    /// Split points injected into lines passing close to another line's endpoint.
    pub injected_junctions: usize,

    pub nodes: usize,
    pub edges: usize,
}

/// Result of building a graph.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Node positions, indexed by node id.
    pub nodes: Vec<Coord>,

    /// Directed edges with their origin node id.
    pub edges: Vec<(u32, Edge)>,

    pub stats: BuildStats,
}

impl BuildOutput {
    /// Converts the output into its [packed](crate::packed) form.
    pub fn to_packed(&self) -> PackedGraph {
        PackedGraph {
            nodes: self.nodes.iter().map(|&c| crate::packed::to_fixed(c)).collect(),
            edges: self
                .edges
                .iter()
                .map(|&(from, e)| PackedEdge {
                    from,
                    to: e.to,
                    weight: e.weight,
                    class: e.class.code(),
                })
                .collect(),
        }
    }

    /// Converts the output directly into a runtime [Graph].
    pub fn into_graph(self) -> Result<Graph, LoadError> {
        Graph::from_parts(self.nodes, self.edges)
    }
}

/// Builds a graph from GeoJSON read from the provided stream, as per the provided [Options].
///
/// The provided stream will be automatically wrapped in a buffered reader.
pub fn build_from_io<R: io::Read>(options: &Options, reader: R) -> Result<BuildOutput, Error> {
    let mut b = io::BufReader::new(reader);
    let format = match options.file_format {
        FileFormat::Unknown => FileFormat::detect(b.fill_buf()?),
        f => f,
    };

    let collection = match format {
        FileFormat::Unknown | FileFormat::GeoJson => geojson::from_io(b)?,

        FileFormat::GeoJsonGz => {
            let d = flate2::read::MultiGzDecoder::new(b);
            geojson::from_io(io::BufReader::new(d))?
        }

        FileFormat::GeoJsonBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(b);
            geojson::from_io(io::BufReader::new(d))?
        }
    };

    Ok(GraphBuilder::new(options, collection.roads).build(collection.total))
}

/// Builds a graph from a GeoJSON file at the provided path, as per the provided [Options].
pub fn build_from_file<P: AsRef<Path>>(options: &Options, path: P) -> Result<BuildOutput, Error> {
    let f = File::open(path)?;
    build_from_io(options, f)
}

/// Builds a graph from GeoJSON in a static buffer, as per the provided [Options].
pub fn build_from_buffer(options: &Options, data: &[u8]) -> Result<BuildOutput, Error> {
    let format = match options.file_format {
        FileFormat::Unknown => FileFormat::detect(data),
        f => f,
    };

    if format == FileFormat::GeoJson {
        // Fast path is available for in-memory uncompressed data
        let collection = geojson::from_slice(data)?;
        Ok(GraphBuilder::new(options, collection.roads).build(collection.total))
    } else {
        let options = Options {
            file_format: format,
            ..*options
        };
        build_from_io(&options, io::Cursor::new(data))
    }
}
