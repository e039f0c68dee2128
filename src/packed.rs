// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Compact on-disk representation of a road graph, shared between
//! the offline [builder](crate::builder) and the runtime [Graph].
//!
//! A packed graph is a directory with three JSON documents:
//! - `nodes.json`: `[[lng, lat], ...]` in fixed-point millionths of a degree,
//!   where the array index is the node id;
//! - `edges.json`: `[[from, to, weight, class], ...]`;
//! - `meta.json`: totals and the format version.
//!
//! `nodes.json` and `edges.json` may be gzip-compressed (`.json.gz`).

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use crate::{Coord, Graph};

/// Number of fixed-point units in one degree.
pub const FIXED_POINT_SCALE: f64 = 1_000_000.0;

/// Version of the packed format written by [write_dir].
pub const FORMAT_VERSION: u32 = 1;

const NODES_FILE: &str = "nodes.json";
const EDGES_FILE: &str = "edges.json";
const META_FILE: &str = "meta.json";

/// Errors which may occur when reading or writing a packed graph.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}: {1}")]
    Io(PathBuf, #[source] io::Error),

    #[error("{0}: {1}")]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("{0}: neither {1} nor {1}.gz exists")]
    Missing(PathBuf, &'static str),

    #[error("unsupported packed format version {0}")]
    UnsupportedVersion(u32),

    #[error("{0}: {1} has {3} entries, but meta.json expects {2}")]
    CountMismatch(PathBuf, &'static str, usize, usize),
}

/// Whether [write_dir] should gzip the node and edge datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

/// A single directed edge in the packed format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(u32, u32, f32, u8)", into = "(u32, u32, f32, u8)")]
pub struct PackedEdge {
    pub from: u32,
    pub to: u32,
    pub weight: f32,
    pub class: u8,
}

impl From<(u32, u32, f32, u8)> for PackedEdge {
    fn from((from, to, weight, class): (u32, u32, f32, u8)) -> Self {
        Self {
            from,
            to,
            weight,
            class,
        }
    }
}

impl From<PackedEdge> for (u32, u32, f32, u8) {
    fn from(e: PackedEdge) -> Self {
        (e.from, e.to, e.weight, e.class)
    }
}

/// Summary written next to the datasets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub version: u32,
    pub total_features: usize,
    pub total_nodes: usize,
    pub total_edges: usize,
}

/// In-memory form of the packed datasets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedGraph {
    /// Fixed-point `[lng, lat]` per node, indexed by node id.
    pub nodes: Vec<[i32; 2]>,
    pub edges: Vec<PackedEdge>,
}

/// Converts a position in degrees into fixed-point units.
#[inline]
pub fn to_fixed(coord: Coord) -> [i32; 2] {
    [
        (coord[0] * FIXED_POINT_SCALE).round() as i32,
        (coord[1] * FIXED_POINT_SCALE).round() as i32,
    ]
}

/// Converts a fixed-point position back into degrees.
#[inline]
pub fn from_fixed(p: [i32; 2]) -> Coord {
    [p[0] as f64 / FIXED_POINT_SCALE, p[1] as f64 / FIXED_POINT_SCALE]
}

impl PackedGraph {
    /// Returns node positions in degrees, indexed by node id.
    pub fn positions(&self) -> Vec<Coord> {
        self.nodes.iter().map(|&p| from_fixed(p)).collect()
    }

    /// Packs a runtime [Graph]. Positions are rounded to fixed-point precision.
    pub fn from_graph(g: &Graph) -> Self {
        let nodes = g.iter().map(|n| to_fixed(n.coord())).collect();
        let edges = g
            .iter()
            .flat_map(|n| {
                g.get_edges(n.id).iter().map(move |e| PackedEdge {
                    from: n.id,
                    to: e.to,
                    weight: e.weight,
                    class: e.class.code(),
                })
            })
            .collect();
        Self { nodes, edges }
    }
}

/// Writes a [PackedGraph] into the provided directory, creating it if necessary.
pub fn write_dir<P: AsRef<Path>>(
    dir: P,
    packed: &PackedGraph,
    total_features: usize,
    compression: Compression,
) -> Result<Meta, Error> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::Io(dir.to_path_buf(), e))?;

    write_json(&dir.join(NODES_FILE), &packed.nodes, compression)?;
    write_json(&dir.join(EDGES_FILE), &packed.edges, compression)?;

    let meta = Meta {
        version: FORMAT_VERSION,
        total_features,
        total_nodes: packed.nodes.len(),
        total_edges: packed.edges.len(),
    };
    write_json(&dir.join(META_FILE), &meta, Compression::None)?;

    log::info!(
        "wrote {} nodes and {} edges to {}",
        meta.total_nodes,
        meta.total_edges,
        dir.display()
    );
    Ok(meta)
}

/// Reads a [PackedGraph] from a directory written by [write_dir].
/// Plain and gzip-compressed datasets are detected automatically.
pub fn read_dir<P: AsRef<Path>>(dir: P) -> Result<PackedGraph, Error> {
    let dir = dir.as_ref();

    let meta_path = dir.join(META_FILE);
    let meta: Option<Meta> = if meta_path.exists() {
        Some(read_json(&meta_path)?)
    } else {
        None
    };

    if let Some(version) = meta.as_ref().map(|m| m.version).filter(|&v| v != FORMAT_VERSION) {
        return Err(Error::UnsupportedVersion(version));
    }

    let nodes: Vec<[i32; 2]> = read_json(&locate(dir, NODES_FILE)?)?;
    let edges: Vec<PackedEdge> = read_json(&locate(dir, EDGES_FILE)?)?;

    if let Some(meta) = meta {
        if nodes.len() != meta.total_nodes {
            return Err(Error::CountMismatch(dir.to_path_buf(), NODES_FILE, meta.total_nodes, nodes.len()));
        }
        if edges.len() != meta.total_edges {
            return Err(Error::CountMismatch(dir.to_path_buf(), EDGES_FILE, meta.total_edges, edges.len()));
        }
    }

    Ok(PackedGraph { nodes, edges })
}

fn locate(dir: &Path, name: &'static str) -> Result<PathBuf, Error> {
    let plain = dir.join(name);
    if plain.exists() {
        return Ok(plain);
    }

    let gz = dir.join(format!("{name}.gz"));
    if gz.exists() {
        return Ok(gz);
    }

    Err(Error::Missing(dir.to_path_buf(), name))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, compression: Compression) -> Result<(), Error> {
    let gz = path.with_extension("json.gz");
    let (path, stale) = match compression {
        Compression::None => (path.to_path_buf(), gz),
        Compression::Gzip => (gz, path.to_path_buf()),
    };

    // Only one variant of a dataset may exist, see [locate].
    match fs::remove_file(&stale) {
        Ok(()) => log::debug!("removed stale {}", stale.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::Io(stale, e)),
    }

    let io_err = |e| Error::Io(path.clone(), e);

    let f = File::create(&path).map_err(io_err)?;
    let json_err = |e| Error::Json(path.clone(), e);

    match compression {
        Compression::None => {
            let mut w = BufWriter::new(f);
            serde_json::to_writer(&mut w, value).map_err(json_err)?;
            w.flush().map_err(io_err)?;
        }
        Compression::Gzip => {
            let mut w = GzEncoder::new(BufWriter::new(f), flate2::Compression::default());
            serde_json::to_writer(&mut w, value).map_err(json_err)?;
            w.finish().and_then(|mut inner| inner.flush()).map_err(io_err)?;
        }
    }
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, Error> {
    let f = File::open(path).map_err(|e| Error::Io(path.to_path_buf(), e))?;
    let is_gz = path.extension().is_some_and(|ext| ext == "gz");

    let result = if is_gz {
        serde_json::from_reader(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        serde_json::from_reader(BufReader::new(f))
    };
    result.map_err(|e| Error::Json(path.to_path_buf(), e))
}
