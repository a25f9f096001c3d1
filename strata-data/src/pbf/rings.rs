//! Multipolygon assembly from relation member ways.
//!
//! Member ways are joined end to end into closed rings. Each outer ring
//! becomes a polygon; inner rings are attached to the first outer ring that
//! contains them.

use geo::{Contains, Coord, LineString, MultiPolygon, Polygon};
use strata_core::GeometryError;

/// One member way of an area relation, already resolved to coordinates.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RingMember {
    pub(crate) outer: bool,
    pub(crate) coords: Vec<Coord<f64>>,
}

impl RingMember {
    /// Classify a member by role. Unset roles count as outer.
    pub(crate) fn from_role(role: &str, coords: Vec<Coord<f64>>) -> Option<Self> {
        match role {
            "outer" | "" => Some(Self {
                outer: true,
                coords,
            }),
            "inner" => Some(Self {
                outer: false,
                coords,
            }),
            _ => None,
        }
    }
}

fn is_closed_ring(coords: &[Coord<f64>]) -> bool {
    coords.len() >= 4 && coords.first() == coords.last()
}

fn join_rings(mut segments: Vec<Vec<Coord<f64>>>) -> Result<Vec<LineString<f64>>, GeometryError> {
    let mut rings = Vec::new();
    while let Some(mut current) = segments.pop() {
        while !is_closed_ring(&current) {
            let Some(&end) = current.last() else {
                return Err(GeometryError::Empty);
            };
            let Some(position) = segments
                .iter()
                .position(|segment| segment.first() == Some(&end) || segment.last() == Some(&end))
            else {
                return Err(GeometryError::UnclosedRing);
            };
            let mut next = segments.swap_remove(position);
            if next.first() != Some(&end) {
                next.reverse();
            }
            current.extend(next.into_iter().skip(1));
        }
        rings.push(LineString::new(current));
    }
    Ok(rings)
}

/// Build a multipolygon from the member ways of an area relation.
pub(crate) fn assemble(members: Vec<RingMember>) -> Result<MultiPolygon<f64>, GeometryError> {
    let (outer, inner): (Vec<_>, Vec<_>) = members
        .into_iter()
        .filter(|member| !member.coords.is_empty())
        .partition(|member| member.outer);
    if outer.is_empty() {
        return Err(GeometryError::NoOuterRing);
    }
    let outer_rings = join_rings(outer.into_iter().map(|member| member.coords).collect())?;
    let inner_rings = join_rings(inner.into_iter().map(|member| member.coords).collect())?;

    let mut polygons: Vec<Polygon<f64>> = outer_rings
        .into_iter()
        .map(|ring| Polygon::new(ring, Vec::new()))
        .collect();
    for ring in inner_rings {
        let Some(&probe) = ring.0.first() else {
            continue;
        };
        if let Some(polygon) = polygons
            .iter_mut()
            .find(|polygon| polygon.contains(&probe))
        {
            polygon.interiors_push(ring);
        }
    }
    Ok(MultiPolygon::new(polygons))
}
