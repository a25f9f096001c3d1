//! Element builders and output readers shared by the layer unit tests.

use std::fs::File;

use arrow::array::{Array, AsArray, RecordBatch};
use arrow::datatypes::Int64Type;
use camino::Utf8Path;
use geo::{LineString, MultiPolygon, coord, polygon};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use strata_core::{Point, Shape, ShapeGeometry, ShapeOrigin, Tags};

pub(crate) fn point_at(id: i64, tags: Tags) -> Point {
    Point::new(id, coord! { x: 2.35, y: 48.85 }, tags)
}

pub(crate) fn line_shape(id: i64, closed: bool, tags: Tags) -> Shape {
    let mut coords = vec![
        coord! { x: 0.0, y: 0.0 },
        coord! { x: 1.0, y: 0.0 },
        coord! { x: 1.0, y: 1.0 },
    ];
    if closed {
        coords.push(coord! { x: 0.0, y: 0.0 });
    }
    Shape::new(
        id,
        ShapeOrigin::Way,
        ShapeGeometry::Line(LineString::new(coords)),
        tags,
    )
}

pub(crate) fn area_shape(id: i64, from_way: bool, tags: Tags) -> Shape {
    let origin = if from_way {
        ShapeOrigin::Way
    } else {
        ShapeOrigin::Relation
    };
    let area = MultiPolygon::new(vec![polygon![
        (x: 0.0, y: 0.0),
        (x: 2.0, y: 0.0),
        (x: 2.0, y: 2.0),
        (x: 0.0, y: 2.0),
        (x: 0.0, y: 0.0),
    ]]);
    Shape::new(id, origin, ShapeGeometry::Area(area), tags)
}

pub(crate) fn read_batches(path: &Utf8Path) -> Vec<RecordBatch> {
    let file = File::open(path).expect("open layer output");
    ParquetRecordBatchReaderBuilder::try_new(file)
        .expect("parquet reader")
        .build()
        .expect("batch reader")
        .collect::<Result<Vec<_>, _>>()
        .expect("decode batches")
}

pub(crate) fn output_ids(path: &Utf8Path) -> Vec<(&'static str, i64)> {
    let mut rows = Vec::new();
    for batch in read_batches(path) {
        let kinds = batch.column(0).as_string::<i32>();
        let ids = batch.column(1).as_primitive::<Int64Type>();
        for row in 0..batch.num_rows() {
            let kind = match kinds.value(row) {
                "node" => "node",
                "way" => "way",
                "relation" => "relation",
                other => panic!("unexpected element type {other}"),
            };
            rows.push((kind, ids.value(row)));
        }
    }
    rows
}

pub(crate) fn text_column(path: &Utf8Path, name: &str) -> Vec<Option<String>> {
    let mut values = Vec::new();
    for batch in read_batches(path) {
        let tags = batch.column(2).as_struct();
        let column = tags
            .column_by_name(name)
            .unwrap_or_else(|| panic!("column {name} missing"))
            .as_string::<i32>();
        for row in 0..column.len() {
            values.push((!column.is_null(row)).then(|| column.value(row).to_owned()));
        }
    }
    values
}

pub(crate) fn geometries(path: &Utf8Path) -> Vec<Vec<u8>> {
    let mut values = Vec::new();
    for batch in read_batches(path) {
        let column = batch.column(4).as_binary::<i32>();
        for row in 0..column.len() {
            values.push(column.value(row).to_vec());
        }
    }
    values
}
