//! Streaming element sources.

use std::ops::ControlFlow;

use crate::{InterestFilter, Point, Relation, Shape};

/// Receives elements from an [`ElementSource`], one at a time.
///
/// Returning [`ControlFlow::Break`] asks the source to stop streaming.
pub trait ElementVisitor {
    /// A tagged node that passed the filter.
    fn point(&mut self, point: &Point) -> ControlFlow<()>;

    /// An assembled line or area that passed the filter.
    fn shape(&mut self, shape: &Shape) -> ControlFlow<()>;

    /// A relation that passed the filter.
    fn relation(&mut self, relation: &Relation) -> ControlFlow<()>;
}

/// A single forward pass over typed OSM elements.
///
/// Implementations must skip elements rejected by `filter` before handing them
/// to the visitor, and must never forward untagged elements.
pub trait ElementSource {
    /// Error raised when the underlying data cannot be read.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Stream every matching element into `visitor`.
    ///
    /// # Errors
    /// Returns the source's error when reading or decoding fails. A visitor
    /// break is not an error.
    fn stream(
        &mut self,
        filter: &InterestFilter,
        visitor: &mut dyn ElementVisitor,
    ) -> Result<(), Self::Error>;
}
