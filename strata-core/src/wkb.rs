//! Well-known binary (WKB) encoding and bounds extraction.
//!
//! Output is always little-endian, two-dimensional ISO WKB. The reader accepts
//! either byte order for the 2D geometry types 1-7, which is what the sink
//! needs to derive bounding boxes without materialising `geo` geometries.

use geo::{Coord, Geometry, LineString, Polygon, Rect};
use thiserror::Error;

const BYTE_ORDER_BIG: u8 = 0;
const BYTE_ORDER_LITTLE: u8 = 1;

const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOINT: u32 = 4;
const WKB_MULTILINESTRING: u32 = 5;
const WKB_MULTIPOLYGON: u32 = 6;
const WKB_GEOMETRYCOLLECTION: u32 = 7;

/// Nested collections deeper than this are rejected as malformed.
const MAX_DEPTH: usize = 16;

/// Errors raised while building, encoding or decoding geometries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GeometryError {
    /// A coordinate was NaN or infinite.
    #[error("geometry contains a non-finite coordinate")]
    NonFinite,
    /// A line or ring had too few vertices.
    #[error("{part} has {found} points, at least {required} required")]
    TooFewPoints {
        /// Geometry part being built.
        part: &'static str,
        /// Vertex count found.
        found: usize,
        /// Minimum vertex count.
        required: usize,
    },
    /// The geometry carried no coordinates at all.
    #[error("geometry is empty")]
    Empty,
    /// Member ways could not be joined into closed rings.
    #[error("ring could not be closed from the member ways")]
    UnclosedRing,
    /// A multipolygon had no outer ring.
    #[error("multipolygon has no outer ring")]
    NoOuterRing,
    /// The geometry type cannot be written as WKB by this encoder.
    #[error("unsupported geometry type {0}")]
    Unsupported(&'static str),
    /// WKB input ended before the geometry was complete.
    #[error("WKB truncated at byte {offset}")]
    Truncated {
        /// Offset of the failed read.
        offset: usize,
    },
    /// WKB input used an unknown byte-order marker.
    #[error("invalid WKB byte order marker {0}")]
    InvalidByteOrder(u8),
    /// WKB input used an unknown or unsupported type code.
    #[error("unsupported WKB geometry type code {0}")]
    UnknownType(u32),
    /// WKB collections were nested too deeply.
    #[error("WKB nesting exceeds {MAX_DEPTH} levels")]
    TooDeep,
}

/// Encode a geometry as little-endian 2D WKB.
///
/// Lines need at least two points and polygon rings at least four. Every
/// coordinate must be finite.
///
/// # Errors
/// Returns [`GeometryError`] when the geometry breaks those rules or is a
/// kind WKB output does not cover.
///
/// # Examples
/// ```
/// use geo::{Geometry, Point};
/// use strata_core::wkb;
///
/// let bytes = wkb::encode(&Geometry::Point(Point::new(1.0, 2.0)))?;
/// let bounds = wkb::bounds(&bytes)?;
/// assert_eq!(bounds.min().x, 1.0);
/// assert_eq!(bounds.max().y, 2.0);
/// # Ok::<(), strata_core::GeometryError>(())
/// ```
pub fn encode(geometry: &Geometry<f64>) -> Result<Vec<u8>, GeometryError> {
    let mut out = Vec::new();
    write_geometry(&mut out, geometry)?;
    Ok(out)
}

fn write_geometry(out: &mut Vec<u8>, geometry: &Geometry<f64>) -> Result<(), GeometryError> {
    match geometry {
        Geometry::Point(point) => {
            write_header(out, WKB_POINT);
            write_coord(out, point.0)
        }
        Geometry::LineString(line) => {
            write_header(out, WKB_LINESTRING);
            write_line(out, line)
        }
        Geometry::Polygon(polygon) => {
            write_header(out, WKB_POLYGON);
            write_polygon(out, polygon)
        }
        Geometry::MultiPoint(points) => {
            if points.0.is_empty() {
                return Err(GeometryError::Empty);
            }
            write_header(out, WKB_MULTIPOINT);
            write_count(out, points.0.len());
            for point in &points.0 {
                write_header(out, WKB_POINT);
                write_coord(out, point.0)?;
            }
            Ok(())
        }
        Geometry::MultiLineString(lines) => {
            if lines.0.is_empty() {
                return Err(GeometryError::Empty);
            }
            write_header(out, WKB_MULTILINESTRING);
            write_count(out, lines.0.len());
            for line in &lines.0 {
                write_header(out, WKB_LINESTRING);
                write_line(out, line)?;
            }
            Ok(())
        }
        Geometry::MultiPolygon(polygons) => {
            if polygons.0.is_empty() {
                return Err(GeometryError::Empty);
            }
            write_header(out, WKB_MULTIPOLYGON);
            write_count(out, polygons.0.len());
            for polygon in &polygons.0 {
                write_header(out, WKB_POLYGON);
                write_polygon(out, polygon)?;
            }
            Ok(())
        }
        Geometry::GeometryCollection(_) => Err(GeometryError::Unsupported("GeometryCollection")),
        Geometry::Line(_) => Err(GeometryError::Unsupported("Line")),
        Geometry::Rect(_) => Err(GeometryError::Unsupported("Rect")),
        Geometry::Triangle(_) => Err(GeometryError::Unsupported("Triangle")),
    }
}

#[expect(clippy::little_endian_bytes, reason = "WKB output is always little-endian")]
fn write_header(out: &mut Vec<u8>, code: u32) {
    out.push(BYTE_ORDER_LITTLE);
    out.extend_from_slice(&code.to_le_bytes());
}

#[expect(clippy::little_endian_bytes, reason = "WKB output is always little-endian")]
fn write_count(out: &mut Vec<u8>, count: usize) {
    // Counts beyond u32 cannot be produced from OSM data.
    let narrowed = u32::try_from(count).unwrap_or(u32::MAX);
    out.extend_from_slice(&narrowed.to_le_bytes());
}

#[expect(clippy::little_endian_bytes, reason = "WKB output is always little-endian")]
fn write_coord(out: &mut Vec<u8>, coord: Coord<f64>) -> Result<(), GeometryError> {
    if !coord.x.is_finite() || !coord.y.is_finite() {
        return Err(GeometryError::NonFinite);
    }
    out.extend_from_slice(&coord.x.to_le_bytes());
    out.extend_from_slice(&coord.y.to_le_bytes());
    Ok(())
}

fn write_line(out: &mut Vec<u8>, line: &LineString<f64>) -> Result<(), GeometryError> {
    if line.0.len() < 2 {
        return Err(GeometryError::TooFewPoints {
            part: "linestring",
            found: line.0.len(),
            required: 2,
        });
    }
    write_count(out, line.0.len());
    line.0.iter().try_for_each(|coord| write_coord(out, *coord))
}

fn write_ring(out: &mut Vec<u8>, ring: &LineString<f64>) -> Result<(), GeometryError> {
    if ring.0.len() < 4 {
        return Err(GeometryError::TooFewPoints {
            part: "ring",
            found: ring.0.len(),
            required: 4,
        });
    }
    write_count(out, ring.0.len());
    ring.0.iter().try_for_each(|coord| write_coord(out, *coord))
}

fn write_polygon(out: &mut Vec<u8>, polygon: &Polygon<f64>) -> Result<(), GeometryError> {
    write_count(out, 1 + polygon.interiors().len());
    write_ring(out, polygon.exterior())?;
    polygon
        .interiors()
        .iter()
        .try_for_each(|ring| write_ring(out, ring))
}

/// Compute the bounding box of a WKB geometry.
///
/// Empty points (NaN coordinates) do not contribute. A geometry without any
/// coordinates yields [`GeometryError::Empty`].
///
/// # Errors
/// Returns [`GeometryError`] for truncated or malformed input.
pub fn bounds(wkb: &[u8]) -> Result<Rect<f64>, GeometryError> {
    let mut reader = Reader {
        bytes: wkb,
        offset: 0,
    };
    let mut extent = Extent::default();
    reader.read_geometry(&mut extent, 0)?;
    extent.into_rect().ok_or(GeometryError::Empty)
}

#[derive(Debug, Default)]
struct Extent {
    min: Option<Coord<f64>>,
    max: Option<Coord<f64>>,
}

impl Extent {
    fn include(&mut self, coord: Coord<f64>) {
        self.min = Some(match self.min {
            Some(min) => Coord {
                x: min.x.min(coord.x),
                y: min.y.min(coord.y),
            },
            None => coord,
        });
        self.max = Some(match self.max {
            Some(max) => Coord {
                x: max.x.max(coord.x),
                y: max.y.max(coord.y),
            },
            None => coord,
        });
    }

    fn into_rect(self) -> Option<Rect<f64>> {
        Some(Rect::new(self.min?, self.max?))
    }
}

#[derive(Debug, Clone, Copy)]
enum ByteOrder {
    Big,
    Little,
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], GeometryError> {
        let end = self.offset.saturating_add(N);
        let chunk = self
            .bytes
            .get(self.offset..end)
            .and_then(|slice| <[u8; N]>::try_from(slice).ok())
            .ok_or(GeometryError::Truncated {
                offset: self.offset,
            })?;
        self.offset = end;
        Ok(chunk)
    }

    fn read_order(&mut self) -> Result<ByteOrder, GeometryError> {
        let [marker] = self.take::<1>()?;
        match marker {
            BYTE_ORDER_BIG => Ok(ByteOrder::Big),
            BYTE_ORDER_LITTLE => Ok(ByteOrder::Little),
            other => Err(GeometryError::InvalidByteOrder(other)),
        }
    }

    #[expect(
        clippy::big_endian_bytes,
        clippy::little_endian_bytes,
        reason = "WKB input declares its own byte order"
    )]
    fn read_u32(&mut self, order: ByteOrder) -> Result<u32, GeometryError> {
        let raw = self.take::<4>()?;
        Ok(match order {
            ByteOrder::Big => u32::from_be_bytes(raw),
            ByteOrder::Little => u32::from_le_bytes(raw),
        })
    }

    #[expect(
        clippy::big_endian_bytes,
        clippy::little_endian_bytes,
        reason = "WKB input declares its own byte order"
    )]
    fn read_f64(&mut self, order: ByteOrder) -> Result<f64, GeometryError> {
        let raw = self.take::<8>()?;
        Ok(match order {
            ByteOrder::Big => f64::from_be_bytes(raw),
            ByteOrder::Little => f64::from_le_bytes(raw),
        })
    }

    fn read_coord(&mut self, order: ByteOrder, extent: &mut Extent) -> Result<(), GeometryError> {
        let x = self.read_f64(order)?;
        let y = self.read_f64(order)?;
        if x.is_nan() && y.is_nan() {
            return Ok(());
        }
        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        extent.include(Coord { x, y });
        Ok(())
    }

    fn read_points(&mut self, order: ByteOrder, extent: &mut Extent) -> Result<(), GeometryError> {
        let count = self.read_u32(order)?;
        (0..count).try_for_each(|_| self.read_coord(order, extent))
    }

    fn read_geometry(&mut self, extent: &mut Extent, depth: usize) -> Result<(), GeometryError> {
        if depth > MAX_DEPTH {
            return Err(GeometryError::TooDeep);
        }
        let order = self.read_order()?;
        match self.read_u32(order)? {
            WKB_POINT => self.read_coord(order, extent),
            WKB_LINESTRING => self.read_points(order, extent),
            WKB_POLYGON => {
                let rings = self.read_u32(order)?;
                (0..rings).try_for_each(|_| self.read_points(order, extent))
            }
            WKB_MULTIPOINT | WKB_MULTILINESTRING | WKB_MULTIPOLYGON | WKB_GEOMETRYCOLLECTION => {
                let parts = self.read_u32(order)?;
                (0..parts).try_for_each(|_| self.read_geometry(extent, depth + 1))
            }
            other => Err(GeometryError::UnknownType(other)),
        }
    }
}

#[cfg(test)]
#[expect(
    clippy::big_endian_bytes,
    clippy::little_endian_bytes,
    reason = "tests build WKB in both byte orders"
)]
mod tests {
    use super::*;
    use geo::{LineString, MultiPolygon, Point, coord, line_string, polygon};
    use rstest::rstest;

    fn square() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 3.0),
            (x: 0.0, y: 3.0),
            (x: 0.0, y: 0.0),
        ]
    }

    #[rstest]
    fn point_layout_matches_iso_wkb() {
        let bytes = encode(&Geometry::Point(Point::new(1.0, 2.0))).expect("encode point");
        let mut expected = vec![1_u8, 1, 0, 0, 0];
        expected.extend_from_slice(&1.0_f64.to_le_bytes());
        expected.extend_from_slice(&2.0_f64.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[rstest]
    fn multipolygon_bounds_cover_all_rings() {
        let far = polygon![
            (x: 10.0, y: -5.0),
            (x: 11.0, y: -5.0),
            (x: 11.0, y: -4.0),
            (x: 10.0, y: -5.0),
        ];
        let geometry = Geometry::MultiPolygon(MultiPolygon::new(vec![square(), far]));
        let bytes = encode(&geometry).expect("encode multipolygon");
        let rect = bounds(&bytes).expect("bounds");
        assert_eq!(rect.min(), coord! { x: 0.0, y: -5.0 });
        assert_eq!(rect.max(), coord! { x: 11.0, y: 3.0 });
    }

    #[rstest]
    fn big_endian_input_is_accepted() {
        let mut bytes = vec![0_u8];
        bytes.extend_from_slice(&WKB_POINT.to_be_bytes());
        bytes.extend_from_slice(&(-3.5_f64).to_be_bytes());
        bytes.extend_from_slice(&7.25_f64.to_be_bytes());
        let rect = bounds(&bytes).expect("bounds of big-endian point");
        assert_eq!(rect.min(), coord! { x: -3.5, y: 7.25 });
    }

    #[rstest]
    #[case::single_point_line(line_string![(x: 0.0, y: 0.0)])]
    #[case::empty_line(LineString::new(Vec::new()))]
    fn short_lines_are_rejected(#[case] line: LineString<f64>) {
        let err = encode(&Geometry::LineString(line)).expect_err("short line must fail");
        assert!(matches!(err, GeometryError::TooFewPoints { required: 2, .. }));
    }

    #[rstest]
    fn non_finite_coordinates_are_rejected() {
        let err = encode(&Geometry::Point(Point::new(f64::NAN, 1.0)))
            .expect_err("NaN must not be encoded");
        assert_eq!(err, GeometryError::NonFinite);
    }

    #[rstest]
    #[case::empty(&[][..])]
    #[case::header_only(&[1, 1, 0, 0, 0][..])]
    fn truncated_input_is_reported(#[case] bytes: &[u8]) {
        let err = bounds(bytes).expect_err("truncated WKB must fail");
        assert!(matches!(err, GeometryError::Truncated { .. }));
    }

    #[rstest]
    fn unknown_type_codes_are_reported() {
        let mut bytes = vec![1_u8];
        bytes.extend_from_slice(&1001_u32.to_le_bytes());
        assert_eq!(bounds(&bytes), Err(GeometryError::UnknownType(1001)));
    }

    #[rstest]
    fn empty_point_has_no_bounds() {
        let mut bytes = vec![1_u8];
        bytes.extend_from_slice(&WKB_POINT.to_le_bytes());
        bytes.extend_from_slice(&f64::NAN.to_le_bytes());
        bytes.extend_from_slice(&f64::NAN.to_le_bytes());
        assert_eq!(bounds(&bytes), Err(GeometryError::Empty));
    }
}
