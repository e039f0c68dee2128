// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use haulroute::builder::{self, FileFormat};
use haulroute::navigation::{self, VehicleState};
use haulroute::packed::{self, Compression};
use haulroute::{Graph, SearchContext};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct GraphLoadError(PathBuf, #[source] Box<dyn Error + Send + Sync>);

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Converts GeoJSON road polylines into a packed graph
    Build {
        /// The path to the GeoJSON file
        input: PathBuf,

        /// The directory to write the packed graph into
        out_dir: PathBuf,

        /// Format of the input file
        #[arg(long, value_enum, default_value_t = Format::Auto)]
        format: Format,

        /// Compress the node and edge datasets with gzip
        #[arg(long)]
        gzip: bool,
    },

    /// Finds a route over a packed graph and prints it as GeoJSON
    Route {
        /// The directory with the packed graph
        graph_dir: PathBuf,

        /// Latitude of the start point
        start_lat: f64,

        /// Longitude of the start point
        start_lon: f64,

        /// Latitude of the end point
        end_lat: f64,

        /// Longitude of the end point
        end_lon: f64,

        /// Vehicle heading at the start, in degrees clockwise from north
        #[arg(long, default_value_t = 0.0)]
        heading: f64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Auto,
    Geojson,
    Gz,
    Bz2,
}

impl From<Format> for FileFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Auto => FileFormat::Unknown,
            Format::Geojson => FileFormat::GeoJson,
            Format::Gz => FileFormat::GeoJsonGz,
            Format::Bz2 => FileFormat::GeoJsonBz2,
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Build {
            input,
            out_dir,
            format,
            gzip,
        } => build(&input, &out_dir, format.into(), gzip),

        Command::Route {
            graph_dir,
            start_lat,
            start_lon,
            end_lat,
            end_lon,
            heading,
        } => route(&graph_dir, [start_lon, start_lat], [end_lon, end_lat], heading),
    }
}

fn build(input: &Path, out_dir: &Path, file_format: FileFormat, gzip: bool) -> Result<(), Box<dyn Error>> {
    let options = builder::Options {
        file_format,
        ..Default::default()
    };

    let output = builder::build_from_file(&options, input)
        .map_err(|e| GraphLoadError(input.to_path_buf(), Box::new(e)))?;

    let stats = output.stats;
    log::info!(
        "{} features ({} skipped), {} endpoints snapped, {} junctions injected",
        stats.features,
        stats.skipped,
        stats.snapped_endpoints,
        stats.injected_junctions,
    );

    let compression = if gzip { Compression::Gzip } else { Compression::None };
    packed::write_dir(out_dir, &output.to_packed(), stats.features, compression)?;
    Ok(())
}

fn route(graph_dir: &Path, start: [f64; 2], end: [f64; 2], heading: f64) -> Result<(), Box<dyn Error>> {
    let g = load_graph(graph_dir)?;
    let config = navigation::Config {
        capacity: g.len(),
        ..Default::default()
    };
    let mut ctx = SearchContext::new(config.capacity);

    let vehicle = VehicleState::new(start, heading);
    let planned = navigation::plan_route(&g, &mut ctx, &vehicle, end, &config)
        .ok_or("no route between the given points")?;

    log::info!(
        "route of {:.1} km ({:.2} h) found in {} iterations",
        planned.stats.total_km(),
        planned.stats.total_hours(),
        planned.route.iterations,
    );

    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");
    println!("    {{");
    println!("      \"type\": \"Feature\",");
    println!(
        "      \"properties\": {{\"end\": {}, \"km\": {:.3}, \"hours\": {:.3}}},",
        planned.route.end,
        planned.stats.total_km(),
        planned.stats.total_hours(),
    );

    println!("      \"geometry\": {{");
    println!("        \"type\": \"LineString\",");
    println!("        \"coordinates\": [");

    let mut coords = planned.path.iter().peekable();
    while let Some(c) = coords.next() {
        let suffix = if coords.peek().is_some() { "," } else { "" };
        println!("          [{}, {}]{}", c[0], c[1], suffix);
    }

    println!("        ]");
    println!("      }}");
    println!("    }}");
    println!("  ]");
    println!("}}");

    Ok(())
}

fn load_graph(dir: &Path) -> Result<Graph, GraphLoadError> {
    let packed = packed::read_dir(dir).map_err(|e| GraphLoadError(dir.to_path_buf(), Box::new(e)))?;
    Graph::from_packed(&packed).map_err(|e| GraphLoadError(dir.to_path_buf(), Box::new(e)))
}
