//! Chunked GeoParquet writer shared by every layer.
//!
//! A [`GeoParquetSink`] owns one output file. Rows are buffered in memory and
//! written as a single row group whenever the configured threshold is reached;
//! [`GeoParquetSink::finish`] writes the remainder and the footer. Every file
//! carries the GeoParquet `geo` key/value metadata describing the WKB geometry
//! column and its bounding-box covering.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryArray, Float32Array, Int64Array, ListBuilder, MapBuilder, StringArray,
    StringBuilder, StructArray, UInt32Builder,
};
use arrow::datatypes::{DataType, Field, Fields, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use camino::{Utf8Path, Utf8PathBuf};
use geo::Rect;
use log::debug;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use serde::Serialize;
use strata_core::{Column, ColumnType, ColumnValue, ElementKind, GeometryError, LayerError, wkb};
use thiserror::Error;

/// Key under which the GeoParquet metadata document is stored.
pub const GEO_METADATA_KEY: &str = "geo";

const DEFAULT_ROW_GROUP_SIZE: NonZeroUsize = NonZeroUsize::MIN.saturating_add(99_999);

/// Tuning knobs for a [`GeoParquetSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkOptions {
    /// Rows buffered before a row group is written.
    pub row_group_size: NonZeroUsize,
    /// Zstandard compression level.
    pub zstd_level: i32,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            zstd_level: 1,
        }
    }
}

impl SinkOptions {
    /// Override the row group threshold.
    #[must_use]
    pub const fn with_row_group_size(mut self, row_group_size: NonZeroUsize) -> Self {
        self.row_group_size = row_group_size;
        self
    }
}

/// Errors raised by [`GeoParquetSink`].
#[derive(Debug, Error)]
pub enum SinkError {
    /// The row's WKB could not be decoded; the row was not buffered.
    #[error("cannot derive bounding box: {0}")]
    Geometry(#[from] GeometryError),
    /// The value tuple does not match the schema width.
    #[error("row has {found} values but the schema declares {expected} columns")]
    ColumnCount {
        /// Declared columns.
        expected: usize,
        /// Supplied values.
        found: usize,
    },
    /// A value does not match its column's declared type.
    #[error("column `{column}` expects {expected:?} but received {found:?}")]
    ColumnType {
        /// Column name.
        column: &'static str,
        /// Declared type.
        expected: ColumnType,
        /// Supplied type.
        found: ColumnType,
    },
    /// The output file could not be created.
    #[error("failed to create output file {path}")]
    Create {
        /// Target path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Arrow rejected the buffered rows.
    #[error("failed to assemble record batch")]
    Arrow(#[from] ArrowError),
    /// Parquet encoding or I/O failed.
    #[error("failed to write parquet output")]
    Parquet(#[from] ParquetError),
    /// The GeoParquet metadata document could not be serialised.
    #[error("failed to encode GeoParquet metadata")]
    Metadata(#[from] serde_json::Error),
}

impl SinkError {
    /// Whether the row was rejected and the sink can keep accepting rows.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Geometry(_))
    }
}

impl From<SinkError> for LayerError {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Geometry(geometry) => Self::Geometry(geometry),
            other => Self::output(other),
        }
    }
}

/// Totals reported by [`GeoParquetSink::finish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkSummary {
    /// Rows written to the file.
    pub rows_written: u64,
    /// Row groups written to the file.
    pub row_groups: u64,
}

#[derive(Debug)]
struct BufferedRow {
    kind: ElementKind,
    id: i64,
    values: Vec<Option<ColumnValue>>,
    bbox: [f32; 4],
    wkb: Vec<u8>,
}

/// Buffered writer for one layer's GeoParquet file.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use strata_core::{Column, ColumnValue, ElementKind};
/// use strata_data::{GeoParquetSink, SinkOptions};
///
/// # fn main() -> Result<(), strata_data::SinkError> {
/// let columns = vec![Column::text("highway")];
/// let mut sink = GeoParquetSink::create(
///     Utf8Path::new("roads.parquet"),
///     columns,
///     SinkOptions::default(),
/// )?;
/// let wkb = vec![1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
/// sink.append(
///     ElementKind::Node,
///     1,
///     vec![Some(ColumnValue::Text("crossing".into()))],
///     wkb,
/// )?;
/// sink.finish()?;
/// # Ok(())
/// # }
/// ```
pub struct GeoParquetSink<W: Write + Send = File> {
    columns: Vec<Column>,
    schema: SchemaRef,
    writer: ArrowWriter<W>,
    buffer: Vec<BufferedRow>,
    row_group_size: usize,
    rows_written: u64,
    row_groups: u64,
}

impl GeoParquetSink<File> {
    /// Create (or truncate) the file at `path` and write the layer into it.
    ///
    /// # Errors
    /// Returns [`SinkError::Create`] when the file cannot be created.
    pub fn create(
        path: &Utf8Path,
        columns: Vec<Column>,
        options: SinkOptions,
    ) -> Result<Self, SinkError> {
        let file = strata_fs::create_file(path).map_err(|source| SinkError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file, columns, options)
    }
}

impl<W: Write + Send> GeoParquetSink<W> {
    /// Write the layer into `writer`.
    ///
    /// # Errors
    /// Fails when the parquet writer cannot be initialised.
    pub fn new(writer: W, columns: Vec<Column>, options: SinkOptions) -> Result<Self, SinkError> {
        let schema = layer_schema(&columns);
        let properties = writer_properties(options)?;
        let writer = ArrowWriter::try_new(writer, Arc::clone(&schema), Some(properties))?;
        let row_group_size = options.row_group_size.get();
        Ok(Self {
            columns,
            schema,
            writer,
            buffer: Vec::with_capacity(row_group_size.min(4096)),
            row_group_size,
            rows_written: 0,
            row_groups: 0,
        })
    }

    /// Arrow schema of the output file.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// Buffer one row, writing a row group once the threshold is reached.
    ///
    /// # Errors
    /// [`SinkError::Geometry`] rejects the row and leaves the sink usable.
    /// Shape mismatches and write failures are fatal.
    pub fn append(
        &mut self,
        kind: ElementKind,
        id: i64,
        values: Vec<Option<ColumnValue>>,
        wkb: Vec<u8>,
    ) -> Result<(), SinkError> {
        self.check_values(&values)?;
        let bbox = bbox_of(wkb::bounds(&wkb)?);
        self.buffer.push(BufferedRow {
            kind,
            id,
            values,
            bbox,
            wkb,
        });
        if self.buffer.len() >= self.row_group_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Rows buffered but not yet written.
    #[must_use]
    pub const fn pending_rows(&self) -> usize {
        self.buffer.len()
    }

    /// Row groups written so far.
    #[must_use]
    pub const fn row_groups_written(&self) -> u64 {
        self.row_groups
    }

    /// Rows written to row groups so far.
    #[must_use]
    pub const fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Write buffered rows and the file footer.
    ///
    /// # Errors
    /// Fails when the final row group or the footer cannot be written.
    pub fn finish(mut self) -> Result<SinkSummary, SinkError> {
        self.flush()?;
        self.writer.close()?;
        Ok(SinkSummary {
            rows_written: self.rows_written,
            row_groups: self.row_groups,
        })
    }

    fn check_values(&self, values: &[Option<ColumnValue>]) -> Result<(), SinkError> {
        if values.len() != self.columns.len() {
            return Err(SinkError::ColumnCount {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        for (column, value) in self.columns.iter().zip(values) {
            if let Some(supplied) = value
                && supplied.column_type() != column.column_type()
            {
                return Err(SinkError::ColumnType {
                    column: column.name,
                    expected: column.column_type(),
                    found: supplied.column_type(),
                });
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let rows = std::mem::take(&mut self.buffer);
        let batch = record_batch(&self.schema, &self.columns, &rows)?;
        self.writer.write(&batch)?;
        self.writer.flush()?;
        self.row_groups += 1;
        self.rows_written += u64::try_from(rows.len()).unwrap_or(u64::MAX);
        debug!(
            "wrote row group {} with {} rows",
            self.row_groups,
            rows.len()
        );
        self.buffer = rows;
        self.buffer.clear();
        Ok(())
    }
}

/// Arrow schema for a layer with the given columns.
///
/// The layout is `type`, `id`, `tags` (one field per column, in order),
/// `bbox` and `geometry`.
#[must_use]
pub fn layer_schema(columns: &[Column]) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("type", DataType::Utf8, true),
        Field::new("id", DataType::Int64, true),
        Field::new("tags", DataType::Struct(tag_fields(columns)), true),
        Field::new("bbox", DataType::Struct(bbox_fields()), true),
        Field::new("geometry", DataType::Binary, true),
    ]))
}

fn tag_fields(columns: &[Column]) -> Fields {
    columns
        .iter()
        .map(|column| Field::new(column.name, column_data_type(column.column_type()), true))
        .collect()
}

fn bbox_fields() -> Fields {
    ["xmin", "ymin", "xmax", "ymax"]
        .into_iter()
        .map(|name| Field::new(name, DataType::Float32, true))
        .collect()
}

fn column_data_type(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Text => DataType::Utf8,
        ColumnType::TextList => text_list_type(),
        ColumnType::TextMap => map_type(DataType::Utf8),
        ColumnType::TextListMap => map_type(text_list_type()),
        ColumnType::UInt32 => DataType::UInt32,
    }
}

fn text_list_type() -> DataType {
    DataType::List(Arc::new(Field::new_list_field(DataType::Utf8, true)))
}

// Matches the layout produced by `MapBuilder` with default field names.
fn map_type(values: DataType) -> DataType {
    let entries = Fields::from(vec![
        Field::new("keys", DataType::Utf8, false),
        Field::new("values", values, true),
    ]);
    DataType::Map(
        Arc::new(Field::new("entries", DataType::Struct(entries), false)),
        false,
    )
}

#[derive(Serialize)]
struct GeoMetadata {
    version: &'static str,
    primary_column: &'static str,
    columns: BTreeMap<&'static str, GeometryColumn>,
}

#[derive(Serialize)]
struct GeometryColumn {
    encoding: &'static str,
    geometry_types: Vec<&'static str>,
    covering: Covering,
}

#[derive(Serialize)]
struct Covering {
    bbox: BboxCovering,
}

#[derive(Serialize)]
struct BboxCovering {
    xmin: [&'static str; 2],
    ymin: [&'static str; 2],
    xmax: [&'static str; 2],
    ymax: [&'static str; 2],
}

/// The GeoParquet metadata document written under [`GEO_METADATA_KEY`].
///
/// # Errors
/// Fails only if JSON serialisation fails.
pub fn geo_metadata_json() -> Result<String, serde_json::Error> {
    let document = GeoMetadata {
        version: "1.1.0",
        primary_column: "geometry",
        columns: BTreeMap::from([(
            "geometry",
            GeometryColumn {
                encoding: "WKB",
                geometry_types: Vec::new(),
                covering: Covering {
                    bbox: BboxCovering {
                        xmin: ["bbox", "xmin"],
                        ymin: ["bbox", "ymin"],
                        xmax: ["bbox", "xmax"],
                        ymax: ["bbox", "ymax"],
                    },
                },
            },
        )]),
    };
    serde_json::to_string(&document)
}

fn writer_properties(options: SinkOptions) -> Result<WriterProperties, SinkError> {
    let geo = KeyValue {
        key: GEO_METADATA_KEY.to_owned(),
        value: Some(geo_metadata_json()?),
    };
    Ok(WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::try_new(options.zstd_level)?))
        .set_max_row_group_size(options.row_group_size.get())
        .set_key_value_metadata(Some(vec![geo]))
        .build())
}

fn record_batch(
    schema: &SchemaRef,
    columns: &[Column],
    rows: &[BufferedRow],
) -> Result<RecordBatch, ArrowError> {
    let kinds = StringArray::from_iter_values(rows.iter().map(|row| row.kind.as_str()));
    let ids = Int64Array::from_iter_values(rows.iter().map(|row| row.id));
    let tags = tags_array(columns, rows)?;
    let bbox = bbox_array(rows)?;
    let geometry = BinaryArray::from_iter_values(rows.iter().map(|row| row.wkb.as_slice()));
    RecordBatch::try_new(
        Arc::clone(schema),
        vec![
            Arc::new(kinds),
            Arc::new(ids),
            Arc::new(tags),
            Arc::new(bbox),
            Arc::new(geometry),
        ],
    )
}

fn tags_array(columns: &[Column], rows: &[BufferedRow]) -> Result<StructArray, ArrowError> {
    if columns.is_empty() {
        return Ok(StructArray::new_empty_fields(rows.len(), None));
    }
    let arrays = columns
        .iter()
        .enumerate()
        .map(|(index, column)| column_array(column.column_type(), rows, index))
        .collect::<Result<Vec<_>, _>>()?;
    StructArray::try_new(tag_fields(columns), arrays, None)
}

fn column_array(
    column_type: ColumnType,
    rows: &[BufferedRow],
    index: usize,
) -> Result<ArrayRef, ArrowError> {
    let values = rows
        .iter()
        .map(|row| row.values.get(index).and_then(Option::as_ref));
    Ok(match column_type {
        ColumnType::Text => {
            let mut builder = StringBuilder::new();
            for value in values {
                match value {
                    Some(ColumnValue::Text(text)) => builder.append_value(text),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::TextList => {
            let mut builder = ListBuilder::new(StringBuilder::new());
            for value in values {
                match value {
                    Some(ColumnValue::TextList(items)) => {
                        for item in items {
                            builder.values().append_value(item);
                        }
                        builder.append(true);
                    }
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::TextMap => {
            let mut builder = MapBuilder::new(None, StringBuilder::new(), StringBuilder::new());
            for value in values {
                match value {
                    Some(ColumnValue::TextMap(map)) => {
                        for (key, entry) in map {
                            builder.keys().append_value(key);
                            builder.values().append_value(entry);
                        }
                        builder.append(true)?;
                    }
                    _ => builder.append(false)?,
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::TextListMap => {
            let mut builder = MapBuilder::new(
                None,
                StringBuilder::new(),
                ListBuilder::new(StringBuilder::new()),
            );
            for value in values {
                match value {
                    Some(ColumnValue::TextListMap(map)) => {
                        for (key, items) in map {
                            builder.keys().append_value(key);
                            for item in items {
                                builder.values().values().append_value(item);
                            }
                            builder.values().append(true);
                        }
                        builder.append(true)?;
                    }
                    _ => builder.append(false)?,
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::UInt32 => {
            let mut builder = UInt32Builder::new();
            for value in values {
                match value {
                    Some(ColumnValue::UInt32(number)) => builder.append_value(*number),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
    })
}

fn bbox_array(rows: &[BufferedRow]) -> Result<StructArray, ArrowError> {
    let arrays: Vec<ArrayRef> = (0..4)
        .map(|corner| {
            Arc::new(Float32Array::from_iter_values(
                rows.iter()
                    .map(|row| row.bbox.get(corner).copied().unwrap_or(f32::NAN)),
            )) as ArrayRef
        })
        .collect();
    StructArray::try_new(bbox_fields(), arrays, None)
}

/// Narrow a bounding box to `f32`, rounding outwards so the box still covers
/// the geometry.
fn bbox_of(rect: Rect<f64>) -> [f32; 4] {
    let min = rect.min();
    let max = rect.max();
    [
        round_down(min.x),
        round_down(min.y),
        round_up(max.x),
        round_up(max.y),
    ]
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the narrowed value is corrected outward below"
)]
fn round_down(value: f64) -> f32 {
    let narrowed = value as f32;
    if f64::from(narrowed) > value {
        narrowed.next_down()
    } else {
        narrowed
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the narrowed value is corrected outward below"
)]
fn round_up(value: f64) -> f32 {
    let narrowed = value as f32;
    if f64::from(narrowed) < value {
        narrowed.next_up()
    } else {
        narrowed
    }
}
