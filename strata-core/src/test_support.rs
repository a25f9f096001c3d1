//! In-memory sources and layers used by unit and behaviour tests.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use crate::{
    Capabilities, Element, ElementKind, ElementSource, ElementVisitor, InterestFilter, Layer,
    LayerError, LayerSummary, Point, Relation, Shape,
};

/// Element source backed by a vector, streamed in insertion order.
///
/// The source applies the interest filter and drops untagged elements, as a
/// real decoder would.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    elements: Vec<Element>,
}

impl MemorySource {
    /// Create a source from a list of elements.
    #[must_use]
    pub fn with_elements<I>(elements: I) -> Self
    where
        I: IntoIterator<Item = Element>,
    {
        Self {
            elements: elements.into_iter().collect(),
        }
    }

    /// Append a point.
    #[must_use]
    pub fn with_point(mut self, point: Point) -> Self {
        self.elements.push(Element::Point(point));
        self
    }

    /// Append a shape.
    #[must_use]
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.elements.push(Element::Shape(shape));
        self
    }

    /// Append a relation.
    #[must_use]
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.elements.push(Element::Relation(relation));
        self
    }

    /// Append any element.
    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }
}

impl ElementSource for MemorySource {
    type Error = Infallible;

    fn stream(
        &mut self,
        filter: &InterestFilter,
        visitor: &mut dyn ElementVisitor,
    ) -> Result<(), Self::Error> {
        for element in &self.elements {
            if !filter.accepts(element.tags().iter()) {
                continue;
            }
            let flow = match element {
                Element::Point(point) => visitor.point(point),
                Element::Shape(shape) => visitor.shape(shape),
                Element::Relation(relation) => visitor.relation(relation),
            };
            if flow.is_break() {
                break;
            }
        }
        Ok(())
    }
}

/// What a [`RecordingLayer`] saw.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Recording {
    /// Ids of points received.
    pub points: Vec<i64>,
    /// Kinds and ids of shapes received.
    pub shapes: Vec<(ElementKind, i64)>,
    /// Ids of relations received.
    pub relations: Vec<i64>,
    /// Number of `finish` calls.
    pub finish_calls: u32,
    /// Whether `finish` ran.
    pub finished: bool,
}

/// Shared handle to a [`Recording`].
pub type RecordingLog = Rc<RefCell<Recording>>;

/// Layer that records every element it receives.
#[derive(Debug)]
pub struct RecordingLayer {
    name: String,
    interest: &'static [&'static str],
    capabilities: Capabilities,
    log: RecordingLog,
}

impl RecordingLayer {
    /// Create a layer handling every element kind.
    #[must_use]
    pub fn new(name: &str, interest: &'static [&'static str]) -> Self {
        Self {
            name: name.to_owned(),
            interest,
            capabilities: Capabilities::all(),
            log: RecordingLog::default(),
        }
    }

    /// Restrict the handlers the layer declares.
    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Handle to the layer's recording, valid after the layer is consumed.
    #[must_use]
    pub fn log(&self) -> RecordingLog {
        Rc::clone(&self.log)
    }
}

impl Layer for RecordingLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn interest(&self) -> &'static [&'static str] {
        self.interest
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn point(&mut self, point: &Point) -> Result<(), LayerError> {
        self.log.borrow_mut().points.push(point.id);
        Ok(())
    }

    fn shape(&mut self, shape: &Shape) -> Result<(), LayerError> {
        self.log.borrow_mut().shapes.push((shape.kind(), shape.id));
        Ok(())
    }

    fn relation(&mut self, relation: &Relation) -> Result<(), LayerError> {
        self.log.borrow_mut().relations.push(relation.id);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<LayerSummary, LayerError> {
        let mut log = self.log.borrow_mut();
        log.finish_calls += 1;
        log.finished = true;
        let rows = log.points.len() + log.shapes.len() + log.relations.len();
        Ok(LayerSummary {
            rows_written: u64::try_from(rows).unwrap_or(u64::MAX),
            unresolved: 0,
        })
    }
}

/// Layer whose point handler always fails with the supplied error.
#[derive(Debug)]
pub struct FailingLayer {
    name: String,
    interest: &'static [&'static str],
    make_error: fn() -> LayerError,
}

impl FailingLayer {
    /// Create a point-only layer that fails on every point.
    #[must_use]
    pub fn new(
        name: &str,
        interest: &'static [&'static str],
        make_error: fn() -> LayerError,
    ) -> Self {
        Self {
            name: name.to_owned(),
            interest,
            make_error,
        }
    }
}

impl Layer for FailingLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn interest(&self) -> &'static [&'static str] {
        self.interest
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none().with_point()
    }

    fn point(&mut self, _point: &Point) -> Result<(), LayerError> {
        Err((self.make_error)())
    }

    fn finish(self: Box<Self>) -> Result<LayerSummary, LayerError> {
        Ok(LayerSummary::default())
    }
}

