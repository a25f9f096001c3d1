//! Core model and streaming machinery for Strata.
//!
//! Strata turns one OpenStreetMap extract into several thematic GeoParquet
//! layers in a single pass. This crate holds the parts that do not touch the
//! file system: the element model, the column projector, the aggregate
//! interest filter, the fan-out [`Dispatcher`] and the WKB codec used to derive
//! bounding boxes.

pub mod columns;
pub mod dispatch;
pub mod element;
pub mod filter;
pub mod layer;
pub mod source;
pub mod tags;
pub mod wkb;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use columns::{
    Column, ColumnRule, ColumnType, ColumnValue, project, split_multi_value, tags_with_prefix,
};
pub use dispatch::{DispatchError, Dispatcher, ElementCounts, LayerReport, RunReport};
pub use element::{
    Element, ElementKind, Member, MemberKind, Point, Relation, Shape, ShapeGeometry, ShapeOrigin,
};
pub use filter::InterestFilter;
pub use layer::{Capabilities, Layer, LayerError, LayerSummary};
pub use source::{ElementSource, ElementVisitor};
pub use tags::Tags;
pub use wkb::GeometryError;
