//! Named places as points. Areas tagged `place=*` contribute their centroid.

use camino::Utf8Path;
use geo::{Centroid, Geometry};
use strata_core::{
    Capabilities, Column, ElementKind, GeometryError, Layer, LayerError, LayerSummary, Point,
    Shape, ShapeGeometry, Tags, wkb,
};

use super::{LayerName, ThemeWriter};
use crate::sink::{SinkError, SinkOptions};

pub(super) const COLUMNS: &[Column] = &[
    Column::text("place"),
    Column::text("name"),
    Column::prefix_map("names", "name:"),
    Column::text("alt_name"),
    Column::prefix_map("alt_names", "alt_name:"),
    Column::text("official_name"),
    Column::prefix_map("official_names", "official_name:"),
    Column::text("wikidata"),
    Column::text("wikipedia"),
    Column::uint32("population"),
];

pub(super) fn is_named_place(tags: &Tags) -> bool {
    tags.contains_key("place") && tags.contains_key("name")
}

/// The `places` layer.
pub struct PlacesLayer {
    writer: ThemeWriter,
}

impl PlacesLayer {
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

impl Layer for PlacesLayer {
    fn name(&self) -> &str {
        LayerName::Places.as_str()
    }

    fn interest(&self) -> &'static [&'static str] {
        &["place"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none().with_point().with_shape()
    }

    fn point(&mut self, point: &Point) -> Result<(), LayerError> {
        if !is_named_place(&point.tags) {
            return Ok(());
        }
        self.writer
            .write(ElementKind::Node, point.id, &point.tags, point.to_wkb()?)
    }

    fn shape(&mut self, shape: &Shape) -> Result<(), LayerError> {
        let ShapeGeometry::Area(area) = &shape.geometry else {
            return Ok(());
        };
        if !is_named_place(&shape.tags) {
            return Ok(());
        }
        // Boundary relations usually carry a place node as their label member.
        if !shape.from_way() && shape.tags.contains_key("boundary") {
            return Ok(());
        }
        let centroid = area.centroid().ok_or(GeometryError::Empty)?;
        let encoded = wkb::encode(&Geometry::Point(centroid))?;
        self.writer
            .write(shape.kind(), shape.id, &shape.tags, encoded)
    }

    fn finish(self: Box<Self>) -> Result<LayerSummary, LayerError> {
        Ok(LayerSummary {
            rows_written: self.writer.finish()?,
            unresolved: 0,
        })
    }
}
