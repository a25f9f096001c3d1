//! Error types emitted by the Strata CLI.
//!
//! Keep this error type reasonably small, as the CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use strata_core::DispatchError;
use strata_data::{LayerName, MetadataError, SinkError, UnknownLayer};
use thiserror::Error;

/// Errors emitted by the Strata CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// The input path does not exist or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        /// Flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// The input path could not be inspected.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The output directory exists but is not a directory.
    #[error("output directory {path:?} is not a directory")]
    OutputDirectoryNotDirectory {
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// The output directory could not be inspected.
    #[error("failed to inspect output directory {path:?}: {source}")]
    InspectOutputDirectory {
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The output directory could not be created.
    #[error("failed to create output directory {path:?}: {source}")]
    CreateOutputDirectory {
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// `--layers` named a layer that does not exist.
    #[error(transparent)]
    UnknownLayer(#[from] UnknownLayer),
    /// `--layers` selected nothing.
    #[error("--layers selects no layer")]
    NoLayers,
    /// A layer's output file could not be created.
    #[error("failed to create the {layer} layer: {source}")]
    CreateLayer {
        /// Layer being created.
        layer: LayerName,
        /// Sink error.
        #[source]
        source: SinkError,
    },
    /// The extraction pass failed.
    #[error("extraction failed: {0}")]
    Dispatch(#[from] DispatchError),
    /// The metadata sidecar could not be produced.
    #[error("failed to write dataset metadata: {0}")]
    Metadata(#[from] MetadataError),
}
