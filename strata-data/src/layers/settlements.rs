//! Named human settlements and their parts, as points.

use camino::Utf8Path;
use strata_core::{Capabilities, Column, ElementKind, Layer, LayerError, LayerSummary, Point};

use super::{LayerName, ThemeWriter, places};
use crate::sink::{SinkError, SinkOptions};

pub(super) const COLUMNS: &[Column] = places::COLUMNS;

const SETTLEMENT_TYPES: &[&str] = &[
    "city",
    "town",
    "village",
    "hamlet",
    "isolated_dwelling",
    "farm",
    "allotments",
    // parts of settlements
    "borough",
    "suburb",
    "quarter",
    "neighborhood",
    "city_block",
];

/// The `settlements` layer.
pub struct SettlementsLayer {
    writer: ThemeWriter,
}

impl SettlementsLayer {
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

impl Layer for SettlementsLayer {
    fn name(&self) -> &str {
        LayerName::Settlements.as_str()
    }

    fn interest(&self) -> &'static [&'static str] {
        &["place"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none().with_point()
    }

    fn point(&mut self, point: &Point) -> Result<(), LayerError> {
        let settlement = point
            .tags
            .get("place")
            .is_some_and(|place| SETTLEMENT_TYPES.contains(&place));
        if !settlement || !point.tags.contains_key("name") {
            return Ok(());
        }
        self.writer
            .write(ElementKind::Node, point.id, &point.tags, point.to_wkb()?)
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
    use crate::layers::testing::{output_ids, point_at, text_column};
    use rstest::rstest;
    use strata_core::Tags;

    #[rstest]
    fn keeps_named_settlements_only() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8Path::from_path(dir.path())
            .expect("UTF-8")
            .join("settlements.parquet");
        let mut layer =
            Box::new(SettlementsLayer::create(&path, SinkOptions::default()).expect("create"));
        let candidates = [
            (1, Tags::from([("place", "allotments"), ("name", "Plots")])),
            (2, Tags::from([("place", "borough"), ("name", "Camden")])),
            (3, Tags::from([("place", "island"), ("name", "Skye")])),
            (4, Tags::from([("place", "village")])),
        ];
        for (id, tags) in candidates {
            layer.point(&point_at(id, tags)).expect("point");
        }
        layer.finish().expect("finish");

        assert_eq!(output_ids(&path), vec![("node", 1), ("node", 2)]);
        assert_eq!(
            text_column(&path, "name"),
            vec![Some("Plots".to_owned()), Some("Camden".to_owned())]
        );
    }
}
