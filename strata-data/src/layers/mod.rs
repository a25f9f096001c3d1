//! Thematic output layers.
//!
//! Every layer owns one [`GeoParquetSink`] and decides, per element, whether
//! the element belongs to its theme and which geometry represents it. Tag
//! projection is driven by each layer's static column table.

use std::fmt;
use std::str::FromStr;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use strata_core::{Column, ElementKind, Layer, LayerError, Tags, project};
use thiserror::Error;

use crate::sink::{GeoParquetSink, SinkError, SinkOptions};

mod addresses;
mod boundaries;
mod buildings;
mod parks;
mod places;
mod roads;
mod settlements;
#[cfg(test)]
mod testing;

pub use addresses::{AddressesLayer, UnknownPolicy, UnresolvedPolicy};
pub use boundaries::BoundariesLayer;
pub use buildings::BuildingsLayer;
pub use parks::ParksLayer;
pub use places::PlacesLayer;
pub use roads::RoadsLayer;
pub use settlements::SettlementsLayer;

/// Names of the available layers.
///
/// # Examples
/// ```
/// use strata_data::LayerName;
///
/// let name: LayerName = "roads".parse()?;
/// assert_eq!(name.file_name(), "roads.parquet");
/// # Ok::<(), strata_data::UnknownLayer>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerName {
    /// Highways as points, lines and explicit areas.
    Roads,
    /// Building footprints.
    Buildings,
    /// Address points and footprints.
    Addresses,
    /// Administrative and related boundaries.
    Boundaries,
    /// Parks and protected areas.
    Parks,
    /// Named places, reduced to points.
    Places,
    /// Named settlements.
    Settlements,
}

impl LayerName {
    /// Every layer, in output order.
    pub const ALL: [Self; 7] = [
        Self::Roads,
        Self::Buildings,
        Self::Addresses,
        Self::Boundaries,
        Self::Parks,
        Self::Places,
        Self::Settlements,
    ];

    /// Lowercase layer name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Roads => "roads",
            Self::Buildings => "buildings",
            Self::Addresses => "addresses",
            Self::Boundaries => "boundaries",
            Self::Parks => "parks",
            Self::Places => "places",
            Self::Settlements => "settlements",
        }
    }

    /// Output file name inside the output directory.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.parquet", self.as_str())
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a layer name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown layer `{0}`")]
pub struct UnknownLayer(pub String);

impl FromStr for LayerName {
    type Err = UnknownLayer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownLayer(wanted.to_owned()))
    }
}

/// Settings shared by every layer built for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerOptions {
    /// Sink tuning.
    pub sink: SinkOptions,
    /// Treatment of address orphans left at the end of the pass.
    pub unresolved: UnresolvedPolicy,
}

/// Create the layer `name`, writing to `<output_dir>/<name>.parquet`.
///
/// # Errors
/// Fails when the output file cannot be created.
pub fn build_layer(
    name: LayerName,
    output_dir: &Utf8Path,
    options: LayerOptions,
) -> Result<Box<dyn Layer>, SinkError> {
    let path = output_dir.join(name.file_name());
    Ok(match name {
        LayerName::Roads => Box::new(RoadsLayer::create(&path, options.sink)?),
        LayerName::Buildings => Box::new(BuildingsLayer::create(&path, options.sink)?),
        LayerName::Addresses => Box::new(AddressesLayer::create(
            &path,
            options.sink,
            options.unresolved,
        )?),
        LayerName::Boundaries => Box::new(BoundariesLayer::create(&path, options.sink)?),
        LayerName::Parks => Box::new(ParksLayer::create(&path, options.sink)?),
        LayerName::Places => Box::new(PlacesLayer::create(&path, options.sink)?),
        LayerName::Settlements => Box::new(SettlementsLayer::create(&path, options.sink)?),
    })
}

/// Column table of a layer.
#[must_use]
pub const fn columns_of(name: LayerName) -> &'static [Column] {
    match name {
        LayerName::Roads => roads::COLUMNS,
        LayerName::Buildings => buildings::COLUMNS,
        LayerName::Addresses => addresses::COLUMNS,
        LayerName::Boundaries => boundaries::COLUMNS,
        LayerName::Parks => parks::COLUMNS,
        LayerName::Places => places::COLUMNS,
        LayerName::Settlements => settlements::COLUMNS,
    }
}

/// Projects tags through a layer's column table into its sink.
struct ThemeWriter {
    columns: &'static [Column],
    sink: GeoParquetSink,
}

impl ThemeWriter {
    fn create(
        path: &Utf8Path,
        columns: &'static [Column],
        options: SinkOptions,
    ) -> Result<Self, SinkError> {
        let sink = GeoParquetSink::create(path, columns.to_vec(), options)?;
        Ok(Self { columns, sink })
    }

    fn write(
        &mut self,
        kind: ElementKind,
        id: i64,
        tags: &Tags,
        wkb: Vec<u8>,
    ) -> Result<(), LayerError> {
        let values = project(self.columns, tags);
        self.sink.append(kind, id, values, wkb)?;
        Ok(())
    }

    fn finish(self) -> Result<u64, LayerError> {
        Ok(self.sink.finish()?.rows_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("roads", LayerName::Roads)]
    #[case(" Settlements ", LayerName::Settlements)]
    #[case("ADDRESSES", LayerName::Addresses)]
    fn parses_layer_names(#[case] raw: &str, #[case] expected: LayerName) {
        assert_eq!(raw.parse::<LayerName>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_layers() {
        assert_eq!(
            "highways".parse::<LayerName>(),
            Err(UnknownLayer("highways".to_owned()))
        );
    }

    #[rstest]
    fn every_layer_declares_unique_columns() {
        for name in LayerName::ALL {
            let columns = columns_of(name);
            assert!(!columns.is_empty(), "{name} has no columns");
            let mut names: Vec<_> = columns.iter().map(|column| column.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), columns.len(), "{name} repeats a column");
        }
    }

    #[rstest]
    fn builds_every_layer_into_the_output_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(dir.path()).expect("UTF-8 temp dir");
        for name in LayerName::ALL {
            let layer = build_layer(name, root, LayerOptions::default()).expect("build layer");
            assert_eq!(layer.name(), name.as_str());
            let summary = layer.finish().expect("finish empty layer");
            assert_eq!(summary.rows_written, 0);
            assert!(root.join(name.file_name()).is_file());
        }
    }
}
