//! Parks, nature reserves and protected areas.

use camino::Utf8Path;
use strata_core::{
    Capabilities, Column, ElementKind, Layer, LayerError, LayerSummary, Point, Shape, Tags,
};

use super::{LayerName, ThemeWriter};
use crate::sink::{SinkError, SinkOptions};

pub(super) const COLUMNS: &[Column] = &[
    Column::text("boundary"),
    Column::text("protected_area"),
    Column::text("leisure"),
    Column::split("name"),
    Column::prefix_map_split("names", "name:"),
    Column::split("short_name"),
    Column::prefix_map_split("short_names", "short_name:"),
    Column::split("official_name"),
    Column::prefix_map_split("official_names", "official_name:"),
    Column::text("protect_class"),
    Column::text("protection_title"),
    Column::text("protected"),
    Column::text("iucn_level"),
    Column::text("access"),
    Column::text("operator"),
    Column::text("operator:type"),
    Column::text("owner"),
    Column::text("ownership"),
    Column::text("start_date"),
    Column::text("related_law"),
    Column::text("website"),
    Column::text("wikidata"),
    Column::text("wikipedia"),
];

fn is_park(tags: &Tags) -> bool {
    matches!(
        tags.get("boundary"),
        Some("national_park" | "protected_area")
    ) || matches!(tags.get("leisure"), Some("park" | "nature_reserve"))
}

/// The `parks` layer: points and areas.
pub struct ParksLayer {
    writer: ThemeWriter,
}

impl ParksLayer {
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

impl Layer for ParksLayer {
    fn name(&self) -> &str {
        LayerName::Parks.as_str()
    }

    fn interest(&self) -> &'static [&'static str] {
        &["boundary", "leisure"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none().with_point().with_shape()
    }

    fn point(&mut self, point: &Point) -> Result<(), LayerError> {
        if !is_park(&point.tags) {
            return Ok(());
        }
        self.writer
            .write(ElementKind::Node, point.id, &point.tags, point.to_wkb()?)
    }

    fn shape(&mut self, shape: &Shape) -> Result<(), LayerError> {
        if !shape.is_area() || !is_park(&shape.tags) {
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
