//! OSM PBF element source.
//!
//! [`PbfSource`] reads the file in sequential passes so that shapes can be
//! assembled without holding the dataset in memory:
//!
//! 1. relations: note the member ways of `multipolygon` and `boundary`
//!    relations that pass the interest filter;
//! 2. ways: note every node referenced by a matching way or a noted member
//!    way, and keep the node refs of the member ways only;
//! 3. nodes: index the referenced locations and forward tagged nodes that pass
//!    the filter as points;
//! 4. ways and relations: assemble each matching way and area relation as it
//!    is read and forward the shape;
//! 5. relations: forward the matching relations.
//!
//! Every shape therefore reaches the visitor before any relation. Ways or
//! relations with unresolvable geometry are logged and skipped.

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use log::{debug, info, warn};
use osmpbf::{Element as PbfElement, ElementReader, RelMemberType};
use strata_core::{
    ElementSource, ElementVisitor, GeometryError, InterestFilter, Member, MemberKind, Point,
    Relation, Shape, ShapeGeometry, ShapeOrigin, Tags,
};
use thiserror::Error;

mod header;
mod index;
mod rings;

pub use header::{HeaderError, ReplicationHeader, read_header};
pub use index::{NodeIndexKind, UnknownNodeIndex};

use index::{NodeLocations, valid_location};
use rings::RingMember;

/// Errors returned while streaming an OSM PBF file.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file could not be opened.
    #[error("failed to open OSM PBF file at {path:?}")]
    Open {
        /// Input path.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: osmpbf::Error,
    },
    /// A blob could not be decoded.
    #[error("failed to decode OSM PBF data at {path:?}")]
    Decode {
        /// Input path.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: osmpbf::Error,
    },
}

/// Counters describing what one [`PbfSource::stream`] call produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PbfStats {
    /// Node locations kept for geometry assembly.
    pub indexed_nodes: u64,
    /// Ways skipped because a referenced node was missing.
    pub ways_missing_nodes: u64,
    /// Area relations whose rings could not be assembled.
    pub failed_areas: u64,
}

/// [`ElementSource`] over an OSM PBF file.
///
/// # Examples
/// ```no_run
/// use strata_core::Dispatcher;
/// use strata_data::{NodeIndexKind, PbfSource};
///
/// # fn main() -> Result<(), strata_core::DispatchError> {
/// let mut source = PbfSource::new("extract.osm.pbf").with_node_index(NodeIndexKind::Sorted);
/// let report = Dispatcher::new(Vec::new()).run(&mut source)?;
/// println!("{} points", report.elements.points);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PbfSource {
    path: PathBuf,
    node_index: NodeIndexKind,
    stats: PbfStats,
}

/// Node refs of area relation member ways, keyed by way id.
type MemberRefs = HashMap<i64, Vec<i64>>;

fn is_area_relation(tags: &Tags) -> bool {
    matches!(tags.get("type"), Some("multipolygon" | "boundary"))
}

const fn member_kind(kind: RelMemberType) -> MemberKind {
    match kind {
        RelMemberType::Node => MemberKind::Node,
        RelMemberType::Way => MemberKind::Way,
        RelMemberType::Relation => MemberKind::Relation,
    }
}

impl PbfSource {
    /// Stream the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            node_index: NodeIndexKind::default(),
            stats: PbfStats::default(),
        }
    }

    /// Choose the node location index.
    #[must_use]
    pub const fn with_node_index(mut self, node_index: NodeIndexKind) -> Self {
        self.node_index = node_index;
        self
    }

    /// Input path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Counters from the most recent pass.
    #[must_use]
    pub const fn stats(&self) -> PbfStats {
        self.stats
    }

    fn for_each<F>(&self, visit: F) -> Result<(), SourceError>
    where
        F: FnMut(PbfElement<'_>),
    {
        let reader = ElementReader::from_path(&self.path).map_err(|source| SourceError::Open {
            source,
            path: self.path.clone(),
        })?;
        reader
            .for_each(visit)
            .map_err(|source| SourceError::Decode {
                source,
                path: self.path.clone(),
            })
    }

    fn collect_area_members(&self, filter: &InterestFilter) -> Result<HashSet<i64>, SourceError> {
        let mut member_ways = HashSet::new();
        self.for_each(|element| {
            let PbfElement::Relation(relation) = element else {
                return;
            };
            if !filter.accepts(relation.tags()) || !is_area_relation(&tags_of(&relation)) {
                return;
            }
            member_ways.extend(
                relation
                    .members()
                    .filter(|member| member.member_type == RelMemberType::Way)
                    .map(|member| member.member_id),
            );
        })?;
        Ok(member_ways)
    }

    fn collect_way_nodes(
        &self,
        filter: &InterestFilter,
        member_ways: &HashSet<i64>,
    ) -> Result<(HashSet<i64>, MemberRefs), SourceError> {
        let mut wanted_nodes = HashSet::new();
        let mut member_refs = MemberRefs::new();
        self.for_each(|element| {
            let PbfElement::Way(way) = element else {
                return;
            };
            let member = member_ways.contains(&way.id());
            if !member && !filter.accepts(way.tags()) {
                return;
            }
            wanted_nodes.extend(way.refs());
            if member {
                member_refs.insert(way.id(), way.refs().collect());
            }
        })?;
        Ok((wanted_nodes, member_refs))
    }

    fn read_nodes(
        &self,
        filter: &InterestFilter,
        wanted: &HashSet<i64>,
        visitor: &mut dyn ElementVisitor,
    ) -> Result<(NodeLocations, bool), SourceError> {
        let mut locations = NodeLocations::new(self.node_index, wanted.len());
        let mut stopped = false;
        let mut handle = |id: i64, lon: f64, lat: f64, point: Option<Tags>| {
            let Some(location) = valid_location(lon, lat) else {
                warn!("node {id} has an out-of-range location ({lon}, {lat}); skipped");
                return;
            };
            if wanted.contains(&id) {
                locations.insert(id, location);
            }
            if let Some(tags) = point
                && !stopped
            {
                stopped = visitor.point(&Point::new(id, location, tags)).is_break();
            }
        };
        self.for_each(|element| match element {
            PbfElement::Node(node) => {
                let tags = filter
                    .accepts(node.tags())
                    .then(|| Tags::from_borrowed(node.tags()));
                handle(node.id(), node.lon(), node.lat(), tags);
            }
            PbfElement::DenseNode(node) => {
                let tags = filter
                    .accepts(node.tags())
                    .then(|| Tags::from_borrowed(node.tags()));
                handle(node.id(), node.lon(), node.lat(), tags);
            }
            PbfElement::Way(_) | PbfElement::Relation(_) => {}
        })?;
        locations.seal();
        Ok((locations, stopped))
    }

    fn emit_shapes(
        &self,
        filter: &InterestFilter,
        assembler: &mut Assembler<'_>,
    ) -> Result<(), SourceError> {
        self.for_each(|element| {
            if assembler.stopped {
                return;
            }
            let flow = match element {
                PbfElement::Way(way) if filter.accepts(way.tags()) => {
                    let refs: Vec<i64> = way.refs().collect();
                    assembler.way(way.id(), &refs, Tags::from_borrowed(way.tags()))
                }
                PbfElement::Relation(relation) if filter.accepts(relation.tags()) => {
                    let tags = tags_of(&relation);
                    if is_area_relation(&tags) {
                        assembler.area(&relation_of(&relation, tags))
                    } else {
                        ControlFlow::Continue(())
                    }
                }
                _ => ControlFlow::Continue(()),
            };
            assembler.stopped = flow.is_break();
        })
    }

    fn emit_relations(
        &self,
        filter: &InterestFilter,
        visitor: &mut dyn ElementVisitor,
    ) -> Result<(), SourceError> {
        let mut stopped = false;
        self.for_each(|element| {
            let PbfElement::Relation(relation) = element else {
                return;
            };
            if stopped || !filter.accepts(relation.tags()) {
                return;
            }
            let converted = relation_of(&relation, tags_of(&relation));
            stopped = visitor.relation(&converted).is_break();
        })?;
        if stopped {
            debug!("visitor stopped the pass early");
        }
        Ok(())
    }
}

fn tags_of(relation: &osmpbf::Relation<'_>) -> Tags {
    Tags::from_borrowed(relation.tags())
}

fn relation_of(relation: &osmpbf::Relation<'_>, tags: Tags) -> Relation {
    let members = relation
        .members()
        .map(|member| {
            let role = member.role().unwrap_or_else(|err| {
                warn!(
                    "relation {} has an undecodable member role: {err}",
                    relation.id()
                );
                ""
            });
            Member::new(member.member_id, member_kind(member.member_type), role)
        })
        .collect();
    Relation::new(relation.id(), tags, members)
}

/// Builds shapes from sealed node locations and forwards them as they are read.
struct Assembler<'a> {
    locations: &'a NodeLocations,
    member_refs: &'a MemberRefs,
    stats: &'a mut PbfStats,
    visitor: &'a mut dyn ElementVisitor,
    stopped: bool,
}

impl Assembler<'_> {
    fn resolve(&mut self, refs: &[i64], way: i64) -> Option<Vec<Coord<f64>>> {
        let coords: Option<Vec<_>> = refs.iter().map(|id| self.locations.get(*id)).collect();
        if coords.is_none() {
            debug!("way {way} references a node without a location");
            self.stats.ways_missing_nodes += 1;
        }
        coords
    }

    fn way(&mut self, id: i64, refs: &[i64], tags: Tags) -> ControlFlow<()> {
        let Some(coords) = self.resolve(refs, id) else {
            return ControlFlow::Continue(());
        };
        if coords.len() < 2 {
            debug!("way {id} has fewer than two nodes; skipped");
            return ControlFlow::Continue(());
        }
        let ring = coords.len() >= 4 && refs.first() == refs.last();
        let area = ring && tags.get("area") != Some("no");
        let line = Shape::new(
            id,
            ShapeOrigin::Way,
            ShapeGeometry::Line(LineString::new(coords.clone())),
            tags.clone(),
        );
        self.visitor.shape(&line)?;
        if area {
            let outline = Polygon::new(LineString::new(coords), Vec::new());
            let shape = Shape::new(
                id,
                ShapeOrigin::Way,
                ShapeGeometry::Area(MultiPolygon::new(vec![outline])),
                tags,
            );
            self.visitor.shape(&shape)?;
        }
        ControlFlow::Continue(())
    }

    fn area(&mut self, relation: &Relation) -> ControlFlow<()> {
        match self.rings(relation).and_then(rings::assemble) {
            Ok(area) => {
                let shape = Shape::new(
                    relation.id,
                    ShapeOrigin::Relation,
                    ShapeGeometry::Area(area),
                    relation.tags.clone(),
                );
                self.visitor.shape(&shape)
            }
            Err(err) => {
                warn!("relation {} skipped: {err}", relation.id);
                self.stats.failed_areas += 1;
                ControlFlow::Continue(())
            }
        }
    }

    fn rings(&mut self, relation: &Relation) -> Result<Vec<RingMember>, GeometryError> {
        let mut members = Vec::new();
        let member_ways = relation
            .members
            .iter()
            .filter(|member| member.kind == MemberKind::Way);
        for member in member_ways {
            let member_refs = self.member_refs;
            let coords = member_refs
                .get(&member.id)
                .and_then(|refs| self.resolve(refs, member.id))
                .ok_or(GeometryError::UnclosedRing)?;
            members.extend(RingMember::from_role(&member.role, coords));
        }
        Ok(members)
    }
}

impl ElementSource for PbfSource {
    type Error = SourceError;

    fn stream(
        &mut self,
        filter: &InterestFilter,
        visitor: &mut dyn ElementVisitor,
    ) -> Result<(), SourceError> {
        self.stats = PbfStats::default();
        let member_ways = self.collect_area_members(filter)?;
        let (wanted_nodes, member_refs) = self.collect_way_nodes(filter, &member_ways)?;
        drop(member_ways);
        info!(
            "indexing {} nodes; holding refs of {} area member ways",
            wanted_nodes.len(),
            member_refs.len()
        );
        let (locations, stopped) = self.read_nodes(filter, &wanted_nodes, visitor)?;
        drop(wanted_nodes);
        self.stats.indexed_nodes = u64::try_from(locations.len()).unwrap_or(u64::MAX);
        if stopped {
            debug!("visitor stopped the pass early");
            return Ok(());
        }

        let mut stats = self.stats;
        let mut assembler = Assembler {
            locations: &locations,
            member_refs: &member_refs,
            stats: &mut stats,
            visitor: &mut *visitor,
            stopped: false,
        };
        self.emit_shapes(filter, &mut assembler)?;
        let stopped = assembler.stopped;
        self.stats = stats;
        drop(member_refs);
        drop(locations);
        if self.stats.ways_missing_nodes > 0 {
            warn!(
                "skipped {} way(s) referencing nodes without locations",
                self.stats.ways_missing_nodes
            );
        }
        if stopped {
            debug!("visitor stopped the pass early");
            return Ok(());
        }
        self.emit_relations(filter, visitor)
    }
}
