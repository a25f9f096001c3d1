//! Fixture decoding and output readers shared by the behaviour tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use arrow::array::{Array, AsArray, RecordBatch};
use arrow::datatypes::Int64Type;
use base64::{Engine as _, engine::general_purpose};
use camino::Utf8Path;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::{Builder, TempPath};

/// Directory containing the encoded fixture blobs.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Decode a Base64-encoded fixture into a temporary `.osm.pbf` file.
pub fn decode_fixture(dir: &Path, stem: &str) -> TempPath {
    let encoded_path = dir.join(format!("{stem}.osm.pbf.b64"));
    let encoded = fs::read_to_string(&encoded_path).unwrap_or_else(|err| {
        panic!("failed to read base64 fixture {encoded_path:?}: {err}");
    });
    let cleaned: String = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let decoded = general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .unwrap_or_else(|err| {
            panic!("failed to decode base64 fixture {encoded_path:?}: {err}");
        });
    let mut tempfile = Builder::new()
        .prefix(stem)
        .suffix(".osm.pbf")
        .tempfile()
        .unwrap_or_else(|err| {
            panic!("failed to create temporary fixture for {stem}: {err}");
        });
    tempfile.write_all(&decoded).unwrap_or_else(|err| {
        panic!("failed to write decoded fixture for {stem}: {err}");
    });
    tempfile.flush().unwrap_or_else(|err| {
        panic!("failed to flush decoded fixture for {stem}: {err}");
    });
    tempfile.into_temp_path()
}

/// All record batches of a layer file.
pub fn read_batches(path: &Utf8Path) -> Vec<RecordBatch> {
    let file = File::open(path).unwrap_or_else(|err| panic!("failed to open {path}: {err}"));
    ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap_or_else(|err| panic!("{path} is not parquet: {err}"))
        .build()
        .unwrap_or_else(|err| panic!("failed to read {path}: {err}"))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|err| panic!("failed to decode {path}: {err}"))
}

/// `(type, id)` of every row, in file order.
pub fn row_keys(path: &Utf8Path) -> Vec<(String, i64)> {
    let mut rows = Vec::new();
    for batch in read_batches(path) {
        let kinds = batch.column(0).as_string::<i32>();
        let ids = batch.column(1).as_primitive::<Int64Type>();
        for row in 0..batch.num_rows() {
            rows.push((kinds.value(row).to_owned(), ids.value(row)));
        }
    }
    rows
}

/// Values of one text column inside the `tags` struct.
pub fn tag_column(path: &Utf8Path, name: &str) -> Vec<Option<String>> {
    let mut values = Vec::new();
    for batch in read_batches(path) {
        let column = batch
            .column(2)
            .as_struct()
            .column_by_name(name)
            .unwrap_or_else(|| panic!("{path} has no tag column {name}"))
            .as_string::<i32>()
            .clone();
        for row in 0..column.len() {
            values.push((!column.is_null(row)).then(|| column.value(row).to_owned()));
        }
    }
    values
}
