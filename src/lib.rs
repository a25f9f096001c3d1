//! Facade crate for Strata, a single-pass OpenStreetMap to GeoParquet
//! extractor.
//!
//! This crate re-exports the streaming model from `strata-core` and the PBF
//! source, layers and sink from `strata-data`.
//!
//! # Examples
//! ```no_run
//! use camino::Utf8Path;
//! use strata::{Dispatcher, LayerName, LayerOptions, PbfSource, build_layer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let output = Utf8Path::new("layers");
//! let layers = [LayerName::Roads, LayerName::Addresses]
//!     .into_iter()
//!     .map(|name| build_layer(name, output, LayerOptions::default()))
//!     .collect::<Result<Vec<_>, _>>()?;
//! let report = Dispatcher::new(layers).run(&mut PbfSource::new("extract.osm.pbf"))?;
//! for layer in &report.layers {
//!     println!("{}: {} rows", layer.name, layer.rows_written);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub use strata_core::{
    Capabilities, Column, ColumnRule, ColumnType, ColumnValue, DispatchError, Dispatcher, Element,
    ElementKind, ElementSource, ElementVisitor, GeometryError, InterestFilter, Layer, LayerError,
    LayerReport, LayerSummary, Point, Relation, RunReport, Shape, ShapeGeometry, ShapeOrigin, Tags,
    project,
};

pub use strata_data::{
    DatasetMetadata, GeoParquetSink, LayerName, LayerOptions, MetadataError, NodeIndexKind,
    PbfSource, SinkError, SinkOptions, SourceError, UnresolvedPolicy, build_layer,
};
