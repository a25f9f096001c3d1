//! Highways: crossings and other nodes as points, ways as lines, and
//! explicitly tagged areas as polygons.

use camino::Utf8Path;
use strata_core::{
    Capabilities, Column, ElementKind, Layer, LayerError, LayerSummary, Point, Shape,
};

use super::{LayerName, ThemeWriter};
use crate::sink::{SinkError, SinkOptions};

pub(super) const COLUMNS: &[Column] = &[
    // type and subtypes
    Column::text("highway"),
    Column::text("service"),
    Column::text("crossing"),
    Column::text("cycleway"),
    Column::text("cycleway:left"),
    Column::text("cycleway:right"),
    Column::text("footway"),
    Column::text("construction"),
    // identifiers
    Column::text("name"),
    Column::text("ref"),
    // physical properties
    Column::text("bridge"),
    Column::text("covered"),
    Column::text("lanes"),
    Column::text("layer"),
    Column::text("lit"),
    Column::text("sidewalk"),
    Column::text("smoothness"),
    Column::text("surface"),
    Column::text("tracktype"),
    Column::text("tunnel"),
    Column::text("wheelchair"),
    Column::text("width"),
    // access and restrictions
    Column::text("access"),
    Column::text("bicycle"),
    Column::text("bus"),
    Column::text("foot"),
    Column::text("hgv"),
    Column::text("maxspeed"),
    Column::text("motor_vehicle"),
    Column::text("motorcycle"),
    Column::text("oneway"),
    Column::text("toll"),
];

/// The `roads` layer.
pub struct RoadsLayer {
    writer: ThemeWriter,
}

impl RoadsLayer {
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

fn explicit_area(shape: &Shape) -> bool {
    shape.tags.get("area") == Some("yes")
}

impl Layer for RoadsLayer {
    fn name(&self) -> &str {
        LayerName::Roads.as_str()
    }

    fn interest(&self) -> &'static [&'static str] {
        &["highway"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none().with_point().with_shape()
    }

    fn point(&mut self, point: &Point) -> Result<(), LayerError> {
        if !point.tags.contains_key("highway") {
            return Ok(());
        }
        self.writer
            .write(ElementKind::Node, point.id, &point.tags, point.to_wkb()?)
    }

    fn shape(&mut self, shape: &Shape) -> Result<(), LayerError> {
        if !shape.tags.contains_key("highway") {
            return Ok(());
        }
        let wanted = if shape.is_area() {
            // Closed highway ways are lines unless tagged area=yes.
            !shape.from_way() || explicit_area(shape)
        } else {
            !(shape.closed && explicit_area(shape))
        };
        if !wanted {
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
    use crate::layers::testing::{area_shape, line_shape, output_ids, point_at};
    use rstest::rstest;
    use strata_core::Tags;

    #[rstest]
    #[case::plain_way(Tags::from([("highway", "residential")]), false, vec![("way", 10)])]
    #[case::closed_way(Tags::from([("highway", "pedestrian")]), true, vec![("way", 10)])]
    #[case::explicit_area(
        Tags::from([("highway", "pedestrian"), ("area", "yes")]),
        true,
        vec![("way", 10)]
    )]
    fn ways_become_exactly_one_row(
        #[case] tags: Tags,
        #[case] closed: bool,
        #[case] expected: Vec<(&str, i64)>,
    ) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8Path::from_path(dir.path()).expect("UTF-8").join("roads.parquet");
        let mut layer =
            Box::new(RoadsLayer::create(&path, SinkOptions::default()).expect("create"));
        layer.shape(&line_shape(10, closed, tags.clone())).expect("line");
        if closed {
            layer.shape(&area_shape(10, true, tags)).expect("area");
        }
        assert_eq!(layer.finish().expect("finish").rows_written, 1);
        assert_eq!(output_ids(&path), expected);
    }

    #[rstest]
    fn ignores_elements_without_highway() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8Path::from_path(dir.path()).expect("UTF-8").join("roads.parquet");
        let mut layer =
            Box::new(RoadsLayer::create(&path, SinkOptions::default()).expect("create"));
        layer
            .point(&point_at(1, Tags::from([("amenity", "bench")])))
            .expect("point");
        layer
            .point(&point_at(2, Tags::from([("highway", "crossing")])))
            .expect("point");
        assert_eq!(layer.finish().expect("finish").rows_written, 1);
        assert_eq!(output_ids(&path), vec![("node", 2)]);
    }
}
