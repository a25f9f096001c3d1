//! Address points and footprints, including addresses whose street is only
//! known through an `associatedStreet` or `street` relation.
//!
//! An element with a house number or name and a location identifier is
//! written as soon as it arrives. An element with a house identifier but no
//! location is an orphan: its geometry and tags are cached until a street
//! relation names it as a member, at which point the relation's `name` is
//! copied into `addr:street` and the row is written. Each orphan is written
//! at most once; whatever is left when the pass ends is handled according to
//! the layer's [`UnresolvedPolicy`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use camino::Utf8Path;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use strata_core::{
    Capabilities, Column, ElementKind, Layer, LayerError, LayerSummary, MemberKind, Point,
    Relation, Shape, Tags,
};
use thiserror::Error;

use super::{LayerName, ThemeWriter};
use crate::sink::{SinkError, SinkOptions};

pub(super) const COLUMNS: &[Column] = &[
    Column::text("addr:housenumber"),
    Column::text("addr:housename"),
    // Czech conscription, street and provisional numbers
    Column::text("addr:conscriptionnumber"),
    Column::text("addr:streetnumber"),
    Column::text("addr:provisionalnumber"),
    Column::text("addr:unit"),
    Column::text("addr:street"),
    Column::text("naptan:Street"),
    Column::text("addr:place"),
    Column::text("addr:city"),
    Column::text("addr:postcode"),
    Column::text("addr:hamlet"),
    Column::text("addr:district"),
    Column::text("addr:suburb"),
    Column::text("addr:neighbourhood"),
    Column::text("addr:quarter"),
    Column::text("addr:block_number"),
    Column::text("addr:full"),
    Column::text("postal_code"),
    Column::text("building"),
    Column::text("name"),
];

const HOUSE_KEYS: [&str; 2] = ["addr:housenumber", "addr:housename"];

const LOCATION_KEYS: [&str; 5] = [
    "addr:street",
    "addr:place",
    "naptan:Street",
    "addr:neighbourhood",
    "addr:quarter",
];

const MEMBER_ROLES: [&str; 3] = ["house", "address", "addr:houselink"];

/// What happens to orphaned addresses no street relation claimed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Log how many orphans were left, and each id at debug level.
    #[default]
    Report,
    /// Write the orphans without a location identifier.
    Emit,
}

impl UnresolvedPolicy {
    /// Lowercase policy name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Emit => "emit",
        }
    }
}

impl fmt::Display for UnresolvedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when an unresolved-address policy name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown unresolved-address policy `{0}` (expected `report` or `emit`)")]
pub struct UnknownPolicy(pub String);

impl FromStr for UnresolvedPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Ok(Self::Report),
            "emit" => Ok(Self::Emit),
            other => Err(UnknownPolicy(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completeness {
    Complete,
    Orphan,
    Unrelated,
}

fn completeness(tags: &Tags) -> Completeness {
    if !HOUSE_KEYS.iter().any(|key| tags.contains_key(key)) {
        Completeness::Unrelated
    } else if LOCATION_KEYS.iter().any(|key| tags.contains_key(key)) {
        Completeness::Complete
    } else {
        Completeness::Orphan
    }
}

#[derive(Debug)]
struct Orphan {
    kind: ElementKind,
    wkb: Vec<u8>,
    tags: Tags,
}

/// The `addresses` layer.
pub struct AddressesLayer {
    writer: ThemeWriter,
    nodes: HashMap<i64, Orphan>,
    areas: HashMap<(ElementKind, i64), Orphan>,
    policy: UnresolvedPolicy,
}

impl AddressesLayer {
    /// Create the layer writing to `path`.
    ///
    /// # Errors
    /// Fails when the output file cannot be created.
    pub fn create(
        path: &Utf8Path,
        options: SinkOptions,
        policy: UnresolvedPolicy,
    ) -> Result<Self, SinkError> {
        Ok(Self {
            writer: ThemeWriter::create(path, COLUMNS, options)?,
            nodes: HashMap::new(),
            areas: HashMap::new(),
            policy,
        })
    }

    /// Orphans currently waiting for a street relation.
    #[must_use]
    pub fn cached_orphans(&self) -> usize {
        self.nodes.len() + self.areas.len()
    }

    fn take_orphan(&mut self, kind: MemberKind, id: i64) -> Option<Orphan> {
        match kind {
            MemberKind::Node => self.nodes.remove(&id),
            MemberKind::Way | MemberKind::Relation => {
                self.areas.remove(&(kind.element_kind(), id))
            }
        }
    }

    fn emit_unresolved(&mut self) -> Result<(), LayerError> {
        let mut orphans: Vec<(i64, Orphan)> = self.nodes.drain().collect();
        orphans.extend(self.areas.drain().map(|((_, id), orphan)| (id, orphan)));
        orphans.sort_by(|(a_id, a), (b_id, b)| {
            (a.kind.as_str(), a_id).cmp(&(b.kind.as_str(), b_id))
        });
        for (id, orphan) in orphans {
            self.writer.write(orphan.kind, id, &orphan.tags, orphan.wkb)?;
        }
        Ok(())
    }

    fn report_unresolved(&self) {
        let count = self.cached_orphans();
        if count == 0 {
            return;
        }
        warn!("{count} address element(s) were never matched to a street relation");
        for id in self.nodes.keys() {
            debug!("unresolved address node {id}");
        }
        for (kind, id) in self.areas.keys() {
            debug!("unresolved address {kind} {id}");
        }
    }
}

impl Layer for AddressesLayer {
    fn name(&self) -> &str {
        LayerName::Addresses.as_str()
    }

    fn interest(&self) -> &'static [&'static str] {
        &["addr:housenumber", "addr:housename", "type"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn point(&mut self, point: &Point) -> Result<(), LayerError> {
        match completeness(&point.tags) {
            Completeness::Complete => {
                self.writer
                    .write(ElementKind::Node, point.id, &point.tags, point.to_wkb()?)
            }
            Completeness::Orphan => {
                let orphan = Orphan {
                    kind: ElementKind::Node,
                    wkb: point.to_wkb()?,
                    tags: point.tags.clone(),
                };
                self.nodes.insert(point.id, orphan);
                Ok(())
            }
            Completeness::Unrelated => Ok(()),
        }
    }

    fn shape(&mut self, shape: &Shape) -> Result<(), LayerError> {
        if !shape.is_area() {
            return Ok(());
        }
        match completeness(&shape.tags) {
            Completeness::Complete => {
                self.writer
                    .write(shape.kind(), shape.id, &shape.tags, shape.to_wkb()?)
            }
            Completeness::Orphan => {
                let orphan = Orphan {
                    kind: shape.kind(),
                    wkb: shape.to_wkb()?,
                    tags: shape.tags.clone(),
                };
                self.areas.insert((shape.kind(), shape.id), orphan);
                Ok(())
            }
            Completeness::Unrelated => Ok(()),
        }
    }

    fn relation(&mut self, relation: &Relation) -> Result<(), LayerError> {
        if !matches!(
            relation.tags.get("type"),
            Some("associatedStreet" | "street")
        ) {
            return Ok(());
        }
        let Some(name) = relation.tags.get("name") else {
            debug!("street relation {} has no name tag", relation.id);
            return Ok(());
        };
        let members: Vec<_> = relation
            .members
            .iter()
            .filter(|member| MEMBER_ROLES.contains(&member.role.as_str()))
            .collect();
        if members.is_empty() {
            return Ok(());
        }
        if name.is_empty() {
            warn!("street relation {} has an empty name", relation.id);
            return Ok(());
        }
        for member in members {
            // Complete addresses were written on arrival and are never cached.
            let Some(mut orphan) = self.take_orphan(member.kind, member.id) else {
                continue;
            };
            orphan.tags.insert("addr:street", name);
            self.writer
                .write(orphan.kind, member.id, &orphan.tags, orphan.wkb)?;
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<LayerSummary, LayerError> {
        let unresolved = u64::try_from(self.cached_orphans()).unwrap_or(u64::MAX);
        match self.policy {
            UnresolvedPolicy::Report => self.report_unresolved(),
            UnresolvedPolicy::Emit => self.emit_unresolved()?,
        }
        Ok(LayerSummary {
            rows_written: self.writer.finish()?,
            unresolved,
        })
    }
}
