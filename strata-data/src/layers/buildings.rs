//! Building footprints.

use camino::Utf8Path;
use strata_core::{Capabilities, Column, Layer, LayerError, LayerSummary, Shape};

use super::{LayerName, ThemeWriter};
use crate::sink::{SinkError, SinkOptions};

pub(super) const COLUMNS: &[Column] = &[
    // building type and properties
    Column::text("building"),
    Column::text("building:levels"),
    Column::text("building:flats"),
    Column::text("building:material"),
    Column::text("building:colour"),
    Column::text("building:part"),
    Column::text("building:use"),
    // name, address and other identifiers
    Column::text("name"),
    Column::text("addr:housenumber"),
    Column::text("addr:street"),
    Column::text("addr:city"),
    Column::text("addr:postcode"),
    Column::text("website"),
    Column::text("wikipedia"),
    Column::text("wikidata"),
    // physical properties
    Column::text("height"),
    Column::text("roof:shape"),
    Column::text("roof:levels"),
    Column::text("roof:colour"),
    Column::text("roof:material"),
    Column::text("roof:orientation"),
    Column::text("roof:height"),
    Column::text("start_date"),
    // access
    Column::text("access"),
    Column::text("wheelchair"),
];

/// The `buildings` layer. Only areas are written.
pub struct BuildingsLayer {
    writer: ThemeWriter,
}

impl BuildingsLayer {
    /// Create the layer writing to `path`.
    ///
    /// # Errors
    /// Fails when the output file cannot be created.
    pub fn create(path: &Utf8Path, options: SinkOptions) -> Result<Self, SinkError> {
        Ok(Self {
            writer: ThemeWriter::create(path, COLUMNS, options)?,
        })
    }
}

impl Layer for BuildingsLayer {
    fn name(&self) -> &str {
        LayerName::Buildings.as_str()
    }

    fn interest(&self) -> &'static [&'static str] {
        &["building"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none().with_shape()
    }

    fn shape(&mut self, shape: &Shape) -> Result<(), LayerError> {
        if !shape.is_area() || !shape.tags.contains_key("building") {
            return Ok(());
        }
        self.writer
            .write(shape.kind(), shape.id, &shape.tags, shape.to_wkb()?)
    }

    fn finish(self: Box<Self>) -> Result<LayerSummary, LayerError> {
        Ok(LayerSummary {
            rows_written: self.writer.finish()?,
            unresolved: 0,
        })
    }
}
