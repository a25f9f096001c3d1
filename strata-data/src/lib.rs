//! File-facing parts of Strata.
//!
//! Responsibilities:
//! - Stream OSM PBF input as typed elements ([`PbfSource`]).
//! - Write chunked GeoParquet output ([`GeoParquetSink`]).
//! - Implement the thematic layers and the address denormalization engine.
//! - Record dataset provenance in the `metadata.json` sidecar.
//!
//! Boundaries:
//! - Element routing and tag projection live in `strata-core`.
//! - Filesystem access goes through `strata-fs`.

pub mod layers;
pub mod metadata;
pub mod pbf;
pub mod sink;

pub use layers::{
    AddressesLayer, BoundariesLayer, BuildingsLayer, LayerName, LayerOptions, ParksLayer,
    PlacesLayer, RoadsLayer, SettlementsLayer, UnknownLayer, UnknownPolicy, UnresolvedPolicy,
    build_layer, columns_of,
};
pub use metadata::{DatasetMetadata, METADATA_FILE_NAME, MetadataError};
pub use pbf::{
    HeaderError, NodeIndexKind, PbfSource, PbfStats, ReplicationHeader, SourceError,
    UnknownNodeIndex, read_header,
};
pub use sink::{
    GEO_METADATA_KEY, GeoParquetSink, SinkError, SinkOptions, SinkSummary, layer_schema,
};
