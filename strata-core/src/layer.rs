//! The interface every thematic output layer implements.
//!
//! A layer declares, once, which element kinds it handles through
//! [`Capabilities`]. The dispatcher only calls the handlers a layer declared;
//! the remaining trait methods keep their no-op defaults.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{GeometryError, Point, Relation, Shape};

/// Element kinds a layer wants to receive.
///
/// # Examples
/// ```
/// use strata_core::Capabilities;
///
/// let caps = Capabilities::none().with_point().with_shape();
/// assert!(caps.point && caps.shape && !caps.relation);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Receives tagged nodes.
    pub point: bool,
    /// Receives assembled lines and areas.
    pub shape: bool,
    /// Receives relations.
    pub relation: bool,
}

impl Capabilities {
    /// No handlers.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            point: false,
            shape: false,
            relation: false,
        }
    }

    /// Every handler.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            point: true,
            shape: true,
            relation: true,
        }
    }

    /// Add the point handler.
    #[must_use]
    pub const fn with_point(mut self) -> Self {
        self.point = true;
        self
    }

    /// Add the shape handler.
    #[must_use]
    pub const fn with_shape(mut self) -> Self {
        self.shape = true;
        self
    }

    /// Add the relation handler.
    #[must_use]
    pub const fn with_relation(mut self) -> Self {
        self.relation = true;
        self
    }
}

/// Errors a layer handler can raise.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LayerError {
    /// The element's geometry could not be built or bounded. The element is
    /// skipped and the pass continues.
    #[error("rejected geometry: {0}")]
    Geometry(#[from] GeometryError),
    /// Writing output failed. The pass stops.
    #[error("layer output failed")]
    Output {
        /// Underlying writer error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl LayerError {
    /// Wrap a writer failure.
    #[must_use]
    pub fn output(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Output {
            source: source.into(),
        }
    }

    /// Whether the dispatcher may skip the element and carry on.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Geometry(_))
    }
}

/// Totals a layer reports when it finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerSummary {
    /// Rows written to the layer's output.
    pub rows_written: u64,
    /// Cached elements that were never resolved.
    pub unresolved: u64,
}

/// A thematic output layer.
///
/// # Examples
/// ```
/// use strata_core::{Capabilities, Layer, LayerError, LayerSummary, Point};
///
/// #[derive(Default)]
/// struct CountingLayer {
///     seen: u64,
/// }
///
/// impl Layer for CountingLayer {
///     fn name(&self) -> &str {
///         "counting"
///     }
///
///     fn interest(&self) -> &'static [&'static str] {
///         &["amenity"]
///     }
///
///     fn capabilities(&self) -> Capabilities {
///         Capabilities::none().with_point()
///     }
///
///     fn point(&mut self, _point: &Point) -> Result<(), LayerError> {
///         self.seen += 1;
///         Ok(())
///     }
///
///     fn finish(self: Box<Self>) -> Result<LayerSummary, LayerError> {
///         Ok(LayerSummary { rows_written: self.seen, unresolved: 0 })
///     }
/// }
/// ```
pub trait Layer {
    /// Layer name, used in logs and the run report.
    fn name(&self) -> &str;

    /// Tag keys the layer cares about.
    fn interest(&self) -> &'static [&'static str];

    /// Handlers the layer implements. Read once, at registration.
    fn capabilities(&self) -> Capabilities;

    /// Handle a tagged node.
    fn point(&mut self, _point: &Point) -> Result<(), LayerError> {
        Ok(())
    }

    /// Handle an assembled line or area.
    fn shape(&mut self, _shape: &Shape) -> Result<(), LayerError> {
        Ok(())
    }

    /// Handle a relation.
    fn relation(&mut self, _relation: &Relation) -> Result<(), LayerError> {
        Ok(())
    }

    /// Flush buffered output and close the layer.
    fn finish(self: Box<Self>) -> Result<LayerSummary, LayerError>;
}
