//! Command-line interface for building Strata layers from an OSM extract.
#![forbid(unsafe_code)]

use std::io;
use std::num::NonZeroUsize;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use strata_core::{Dispatcher, Layer, RunReport};
use strata_data::{
    DatasetMetadata, LayerName, LayerOptions, NodeIndexKind, PbfSource, PbfStats, SinkOptions,
    UnresolvedPolicy, build_layer,
};

mod error;

pub use error::CliError;

const ARG_OSM_PBF: &str = "osm-pbf";
const ARG_OUTPUT_DIR: &str = "output-dir";
const ENV_OSM_PBF: &str = "STRATA_CMDS_BUILD_OSM_PBF";
const ENV_OUTPUT_DIR: &str = "STRATA_CMDS_BUILD_OUTPUT_DIR";

/// Run the Strata CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments are invalid or the build fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Build(args) => {
            let outcome = run_build(args)?;
            log_outcome(&outcome);
        }
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "strata",
    about = "Extract thematic GeoParquet layers from OpenStreetMap extracts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build layer files and the metadata sidecar from one OSM PBF file.
    Build(BuildArgs),
}

/// CLI arguments for the `build` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read an OSM PBF extract once and write one GeoParquet file \
                 per enabled layer plus metadata.json. Options can come from \
                 CLI flags, configuration files, or environment variables.",
    about = "Build GeoParquet layers from an OSM PBF extract"
)]
#[ortho_config(prefix = "STRATA")]
struct BuildArgs {
    /// Path to the OpenStreetMap PBF file.
    #[arg(long = ARG_OSM_PBF, value_name = "path")]
    #[serde(default)]
    osm_pbf: Option<Utf8PathBuf>,
    /// Directory receiving the layer files and metadata.json.
    #[arg(long = ARG_OUTPUT_DIR, value_name = "dir")]
    #[serde(default)]
    output_dir: Option<Utf8PathBuf>,
    /// Comma-separated layer names; every layer when omitted.
    #[arg(long, value_name = "names")]
    #[serde(default)]
    layers: Option<String>,
    /// Node location index used for geometry assembly.
    #[arg(long, value_name = "hash|sorted")]
    #[serde(default)]
    node_index: Option<NodeIndexKind>,
    /// Rows buffered per layer before a row group is flushed.
    #[arg(long, value_name = "rows")]
    #[serde(default)]
    row_group_size: Option<NonZeroUsize>,
    /// What to do with addresses no street relation resolved.
    #[arg(long, value_name = "report|emit")]
    #[serde(default)]
    unresolved_addresses: Option<UnresolvedPolicy>,
}

impl BuildArgs {
    fn into_config(self) -> Result<BuildConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        BuildConfig::try_from(merged)
    }
}

/// Fully resolved `build` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BuildConfig {
    osm_pbf: Utf8PathBuf,
    output_dir: Utf8PathBuf,
    layers: Vec<LayerName>,
    node_index: NodeIndexKind,
    options: LayerOptions,
}

impl BuildConfig {
    fn validate_sources(&self) -> Result<(), CliError> {
        let is_file = match strata_fs::file_is_file(&self.osm_pbf) {
            Ok(is_file) => is_file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(source) => {
                return Err(CliError::InspectSourcePath {
                    field: ARG_OSM_PBF,
                    path: self.osm_pbf.clone(),
                    source,
                });
            }
        };
        if !is_file {
            return Err(CliError::MissingSourceFile {
                field: ARG_OSM_PBF,
                path: self.osm_pbf.clone(),
            });
        }
        match strata_fs::dir_is_dir(&self.output_dir) {
            Ok(true) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Ok(false) => Err(CliError::OutputDirectoryNotDirectory {
                path: self.output_dir.clone(),
            }),
            Err(source) => Err(CliError::InspectOutputDirectory {
                path: self.output_dir.clone(),
                source,
            }),
        }
    }
}

impl TryFrom<BuildArgs> for BuildConfig {
    type Error = CliError;

    fn try_from(args: BuildArgs) -> Result<Self, Self::Error> {
        let osm_pbf = args.osm_pbf.ok_or(CliError::MissingArgument {
            field: ARG_OSM_PBF,
            env: ENV_OSM_PBF,
        })?;
        let output_dir = args.output_dir.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT_DIR,
            env: ENV_OUTPUT_DIR,
        })?;
        let layers = match args.layers.as_deref() {
            Some(list) => parse_layers(list)?,
            None => LayerName::ALL.to_vec(),
        };
        let mut sink = SinkOptions::default();
        if let Some(rows) = args.row_group_size {
            sink = sink.with_row_group_size(rows);
        }
        Ok(Self {
            osm_pbf,
            output_dir,
            layers,
            node_index: args.node_index.unwrap_or_default(),
            options: LayerOptions {
                sink,
                unresolved: args.unresolved_addresses.unwrap_or_default(),
            },
        })
    }
}

/// Parse a comma-separated layer list, dropping blanks and duplicates.
fn parse_layers(list: &str) -> Result<Vec<LayerName>, CliError> {
    let mut layers = Vec::new();
    for entry in list.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let name: LayerName = entry.parse()?;
        if !layers.contains(&name) {
            layers.push(name);
        }
    }
    if layers.is_empty() {
        return Err(CliError::NoLayers);
    }
    Ok(layers)
}

/// What a successful `build` produced.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BuildOutcome {
    report: RunReport,
    stats: PbfStats,
    metadata_path: Utf8PathBuf,
}

fn run_build(args: BuildArgs) -> Result<BuildOutcome, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    build(&config)
}

fn build(config: &BuildConfig) -> Result<BuildOutcome, CliError> {
    strata_fs::ensure_dir(&config.output_dir).map_err(|source| {
        CliError::CreateOutputDirectory {
            path: config.output_dir.clone(),
            source,
        }
    })?;
    let layers = create_layers(config)?;
    info!(
        "building {} layer(s) from {} into {}",
        layers.len(),
        config.osm_pbf,
        config.output_dir
    );
    let mut source =
        PbfSource::new(config.osm_pbf.as_std_path()).with_node_index(config.node_index);
    let report = Dispatcher::new(layers).run(&mut source)?;
    let metadata = DatasetMetadata::from_pbf(config.osm_pbf.as_std_path())?;
    let metadata_path = metadata.write_to(&config.output_dir)?;
    Ok(BuildOutcome {
        report,
        stats: source.stats(),
        metadata_path,
    })
}

fn create_layers(config: &BuildConfig) -> Result<Vec<Box<dyn Layer>>, CliError> {
    config
        .layers
        .iter()
        .map(|&layer| {
            build_layer(layer, &config.output_dir, config.options)
                .map_err(|source| CliError::CreateLayer { layer, source })
        })
        .collect()
}

fn log_outcome(outcome: &BuildOutcome) {
    let elements = outcome.report.elements;
    info!(
        "read {} points, {} shapes and {} relations",
        elements.points, elements.shapes, elements.relations
    );
    for layer in &outcome.report.layers {
        info!(
            "{}: {} rows written, {} rejected",
            layer.name, layer.rows_written, layer.rejected
        );
        if layer.unresolved > 0 {
            warn!("{}: {} cached elements never resolved", layer.name, layer.unresolved);
        }
    }
    let stats = outcome.stats;
    if stats.ways_missing_nodes > 0 || stats.failed_areas > 0 {
        warn!(
            "skipped {} way(s) with missing nodes and {} unassembled area relation(s)",
            stats.ways_missing_nodes, stats.failed_areas
        );
    }
    info!("wrote {}", outcome.metadata_path);
}

#[cfg(test)]
mod tests;
