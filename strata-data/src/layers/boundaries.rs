//! Administrative, maritime, disputed and place boundaries.
//!
//! `multilingual_names` maps the language suffix to the name, so `name:en`
//! is stored under `en`. Readers expecting the full `name:en` key must add
//! the prefix back.

use camino::Utf8Path;
use strata_core::{Capabilities, Column, Layer, LayerError, LayerSummary, Shape};

use super::{LayerName, ThemeWriter};
use crate::sink::{SinkError, SinkOptions};

pub(super) const COLUMNS: &[Column] = &[
    Column::text("name"),
    Column::prefix_map("multilingual_names", "name:"),
    Column::text("type"),
    Column::text("admin_level"),
    Column::text("boundary"),
    Column::text("place"),
    Column::text("ISO3166-2"),
    Column::text("ISO3166-1:alpha2"),
    Column::text("ISO3166-1:alpha3"),
];

/// The `boundaries` layer.
pub struct BoundariesLayer {
    writer: ThemeWriter,
}

impl BoundariesLayer {
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

impl Layer for BoundariesLayer {
    fn name(&self) -> &str {
        LayerName::Boundaries.as_str()
    }

    fn interest(&self) -> &'static [&'static str] {
        &["boundary"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none().with_shape()
    }

    fn shape(&mut self, shape: &Shape) -> Result<(), LayerError> {
        let relevant = matches!(
            shape.tags.get("boundary"),
            Some("administrative" | "maritime" | "disputed" | "place")
        );
        if !shape.is_area() || !relevant {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::testing::{area_shape, output_ids, read_batches};
    use arrow::array::AsArray;
    use rstest::rstest;
    use strata_core::Tags;

    #[rstest]
    fn keeps_listed_boundary_kinds_with_their_names() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8Path::from_path(dir.path())
            .expect("UTF-8")
            .join("boundaries.parquet");
        let mut layer =
            Box::new(BoundariesLayer::create(&path, SinkOptions::default()).expect("create"));
        layer
            .shape(&area_shape(
                62_422,
                false,
                Tags::from([
                    ("boundary", "administrative"),
                    ("admin_level", "4"),
                    ("name", "Berlin"),
                    ("name:en", "Berlin"),
                    ("name:pl", "Berlin"),
                ]),
            ))
            .expect("boundary");
        layer
            .shape(&area_shape(
                7,
                false,
                Tags::from([("boundary", "national_park")]),
            ))
            .expect("park boundary");
        layer.finish().expect("finish");

        assert_eq!(output_ids(&path), vec![("relation", 62_422)]);
        let batches = read_batches(&path);
        let tags = batches.first().expect("one batch").column(2).as_struct();
        let names = tags
            .column_by_name("multilingual_names")
            .expect("names column")
            .as_map();
        assert_eq!(names.value_length(0), 2);
        let keys = names.keys().as_string::<i32>();
        assert_eq!(keys.value(0), "en");
        assert_eq!(keys.value(1), "pl");
    }
}
