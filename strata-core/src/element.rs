//! Typed OpenStreetMap elements delivered by an element source.
//!
//! Coordinates are WGS84 with `x = longitude` and `y = latitude`. Identifiers
//! are the raw OSM identifiers; shapes keep the id of the way or relation they
//! were assembled from.

use geo::{Coord, Geometry, LineString, MultiPolygon};

use crate::Tags;
use crate::wkb::{self, GeometryError};

/// OSM element type as written to the `type` output column.
///
/// # Examples
/// ```
/// use strata_core::ElementKind;
///
/// assert_eq!(ElementKind::Relation.as_str(), "relation");
/// assert_eq!(ElementKind::Node.to_string(), "node");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A node.
    Node,
    /// A way.
    Way,
    /// A relation.
    Relation,
}

impl ElementKind {
    /// Lowercase OSM name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged node.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// OSM node id.
    pub id: i64,
    /// Node location.
    pub location: Coord<f64>,
    /// Node tags.
    pub tags: Tags,
}

impl Point {
    /// Construct a point.
    #[must_use]
    pub const fn new(id: i64, location: Coord<f64>, tags: Tags) -> Self {
        Self { id, location, tags }
    }

    /// Encode the location as WKB.
    ///
    /// # Errors
    /// Fails when the location is not finite.
    pub fn to_wkb(&self) -> Result<Vec<u8>, GeometryError> {
        wkb::encode(&Geometry::Point(self.location.into()))
    }
}

/// Where an assembled shape came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeOrigin {
    /// Built from a single way.
    Way,
    /// Built from the member ways of a relation.
    Relation,
}

impl ShapeOrigin {
    /// Element kind of the originating object.
    #[must_use]
    pub const fn kind(self) -> ElementKind {
        match self {
            Self::Way => ElementKind::Way,
            Self::Relation => ElementKind::Relation,
        }
    }
}

/// Geometry of an assembled shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    /// A linestring built from a way's node locations.
    Line(LineString<f64>),
    /// An area built from a closed way or a multipolygon relation.
    Area(MultiPolygon<f64>),
}

/// A line or area assembled by the element source.
///
/// # Examples
/// ```
/// use geo::{LineString, coord};
/// use strata_core::{ElementKind, Shape, ShapeGeometry, ShapeOrigin, Tags};
///
/// let line = LineString::new(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }]);
/// let shape = Shape::new(7, ShapeOrigin::Way, ShapeGeometry::Line(line), Tags::new());
///
/// assert_eq!(shape.kind(), ElementKind::Way);
/// assert!(!shape.is_area());
/// assert!(!shape.closed);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Id of the originating way or relation.
    pub id: i64,
    /// Whether the shape comes from a way or a relation.
    pub origin: ShapeOrigin,
    /// Assembled geometry.
    pub geometry: ShapeGeometry,
    /// Whether the originating way is closed. Always true for relation areas.
    pub closed: bool,
    /// Tags of the originating object.
    pub tags: Tags,
}

impl Shape {
    /// Construct a shape, deriving `closed` from the geometry.
    #[must_use]
    pub fn new(id: i64, origin: ShapeOrigin, geometry: ShapeGeometry, tags: Tags) -> Self {
        let closed = match &geometry {
            ShapeGeometry::Line(line) => line.0.len() > 2 && line.is_closed(),
            ShapeGeometry::Area(_) => true,
        };
        Self {
            id,
            origin,
            geometry,
            closed,
            tags,
        }
    }

    /// Element kind written to the `type` column.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.origin.kind()
    }

    /// Whether the shape carries an area geometry.
    #[must_use]
    pub const fn is_area(&self) -> bool {
        matches!(self.geometry, ShapeGeometry::Area(_))
    }

    /// Whether the shape was assembled from a single way.
    #[must_use]
    pub const fn from_way(&self) -> bool {
        matches!(self.origin, ShapeOrigin::Way)
    }

    /// Encode the geometry as WKB.
    ///
    /// # Errors
    /// Returns [`GeometryError`] for non-finite coordinates or degenerate
    /// lines and rings.
    pub fn to_wkb(&self) -> Result<Vec<u8>, GeometryError> {
        match &self.geometry {
            ShapeGeometry::Line(line) => wkb::encode(&Geometry::LineString(line.clone())),
            ShapeGeometry::Area(area) => wkb::encode(&Geometry::MultiPolygon(area.clone())),
        }
    }
}

/// Kind of object a relation member points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Node member.
    Node,
    /// Way member.
    Way,
    /// Relation member.
    Relation,
}

impl MemberKind {
    /// Element kind the member refers to.
    #[must_use]
    pub const fn element_kind(self) -> ElementKind {
        match self {
            Self::Node => ElementKind::Node,
            Self::Way => ElementKind::Way,
            Self::Relation => ElementKind::Relation,
        }
    }
}

/// One member of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Referenced element id.
    pub id: i64,
    /// Referenced element kind.
    pub kind: MemberKind,
    /// Member role, empty when unset.
    pub role: String,
}

impl Member {
    /// Construct a member.
    #[must_use]
    pub fn new(id: i64, kind: MemberKind, role: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            role: role.into(),
        }
    }
}

/// A grouping relation with ordered members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// OSM relation id.
    pub id: i64,
    /// Relation tags.
    pub tags: Tags,
    /// Members in producer order.
    pub members: Vec<Member>,
}

impl Relation {
    /// Construct a relation.
    #[must_use]
    pub const fn new(id: i64, tags: Tags, members: Vec<Member>) -> Self {
        Self { id, tags, members }
    }
}

/// Any element an element source can yield.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A tagged node.
    Point(Point),
    /// An assembled line or area.
    Shape(Shape),
    /// A relation.
    Relation(Relation),
}

impl Element {
    /// Tags of the wrapped element.
    #[must_use]
    pub const fn tags(&self) -> &Tags {
        match self {
            Self::Point(point) => &point.tags,
            Self::Shape(shape) => &shape.tags,
            Self::Relation(relation) => &relation.tags,
        }
    }
}
