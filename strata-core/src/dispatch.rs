//! Single-pass fan-out of source elements to every interested layer.
//!
//! The dispatcher reads each layer's [`Capabilities`] once, at construction,
//! and keeps one route list per element kind. During the pass every element
//! that passes the aggregate [`InterestFilter`] is handed to each layer on the
//! matching route. Recoverable layer errors are logged and counted; output
//! failures stop the pass.

use std::error::Error as StdError;
use std::ops::ControlFlow;

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    ElementKind, ElementSource, ElementVisitor, InterestFilter, Layer, LayerError, LayerSummary,
    Point, Relation, Shape,
};

/// Errors that end a dispatch run.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The element source failed to read or decode input.
    #[error("element source failed")]
    Source(#[source] Box<dyn StdError + Send + Sync>),
    /// A layer hit a fatal error while handling an element.
    #[error("layer `{layer}` failed while handling {kind} {id}")]
    Layer {
        /// Failing layer.
        layer: String,
        /// Kind of the element being handled.
        kind: ElementKind,
        /// Id of the element being handled.
        id: i64,
        /// Layer error.
        #[source]
        source: LayerError,
    },
    /// A layer failed to flush or close its output.
    #[error("layer `{layer}` failed to finish")]
    Finish {
        /// Failing layer.
        layer: String,
        /// Layer error.
        #[source]
        source: LayerError,
    },
}

/// Per-layer outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    /// Layer name.
    pub name: String,
    /// Rows the layer wrote.
    pub rows_written: u64,
    /// Elements the layer rejected with a recoverable error.
    pub rejected: u64,
    /// Cached elements the layer never resolved.
    pub unresolved: u64,
}

/// Elements forwarded by the source, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementCounts {
    /// Points received.
    pub points: u64,
    /// Shapes received.
    pub shapes: u64,
    /// Relations received.
    pub relations: u64,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Elements received from the source.
    pub elements: ElementCounts,
    /// One entry per layer, in registration order.
    pub layers: Vec<LayerReport>,
}

impl RunReport {
    /// Report for the layer called `name`.
    #[must_use]
    pub fn layer(&self, name: &str) -> Option<&LayerReport> {
        self.layers.iter().find(|layer| layer.name == name)
    }
}

struct Slot {
    name: String,
    layer: Box<dyn Layer>,
    rejected: u64,
}

#[derive(Debug, Default)]
struct Routes {
    point: Vec<usize>,
    shape: Vec<usize>,
    relation: Vec<usize>,
}

/// Drives one pass over an [`ElementSource`] and fans elements out to layers.
///
/// # Examples
/// ```
/// use std::convert::Infallible;
/// use strata_core::{Dispatcher, ElementSource, ElementVisitor, InterestFilter};
///
/// struct Empty;
///
/// impl ElementSource for Empty {
///     type Error = Infallible;
///
///     fn stream(
///         &mut self,
///         _filter: &InterestFilter,
///         _visitor: &mut dyn ElementVisitor,
///     ) -> Result<(), Infallible> {
///         Ok(())
///     }
/// }
///
/// let report = Dispatcher::new(Vec::new()).run(&mut Empty)?;
/// assert!(report.layers.is_empty());
/// # Ok::<(), strata_core::DispatchError>(())
/// ```
pub struct Dispatcher {
    slots: Vec<Slot>,
    routes: Routes,
    filter: InterestFilter,
}

impl Dispatcher {
    /// Register `layers`, reading their capabilities and interest keys once.
    #[must_use]
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Self {
        let mut routes = Routes::default();
        let mut filter = InterestFilter::new();
        let slots = layers
            .into_iter()
            .enumerate()
            .map(|(index, layer)| {
                let caps = layer.capabilities();
                if caps.point {
                    routes.point.push(index);
                }
                if caps.shape {
                    routes.shape.push(index);
                }
                if caps.relation {
                    routes.relation.push(index);
                }
                filter.extend(layer.interest().iter().copied());
                Slot {
                    name: layer.name().to_owned(),
                    layer,
                    rejected: 0,
                }
            })
            .collect();
        Self {
            slots,
            routes,
            filter,
        }
    }

    /// Union of every registered layer's interest keys.
    #[must_use]
    pub const fn filter(&self) -> &InterestFilter {
        &self.filter
    }

    /// Names of the registered layers, in registration order.
    pub fn layer_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots.iter().map(|slot| slot.name.as_str())
    }

    /// Stream `source` through every layer, then finish each layer once.
    ///
    /// When the source fails or a layer reports a fatal error the pass stops
    /// and no layer is finished, so partially written outputs stay
    /// unfinalized.
    ///
    /// # Errors
    /// Returns [`DispatchError::Source`] or [`DispatchError::Layer`] when the
    /// pass is aborted, and the first [`DispatchError::Finish`] when finishing
    /// fails. Every layer is still finished in the latter case.
    pub fn run<S: ElementSource>(mut self, source: &mut S) -> Result<RunReport, DispatchError> {
        info!(
            "dispatching to {} layer(s) with interest keys [{}]",
            self.slots.len(),
            self.filter.keys().collect::<Vec<_>>().join(", ")
        );
        let mut pass = Pass {
            slots: &mut self.slots,
            routes: &self.routes,
            counts: ElementCounts::default(),
            fatal: None,
        };
        let streamed = source.stream(&self.filter, &mut pass);
        let counts = pass.counts;
        if let Some(fatal) = pass.fatal {
            return Err(fatal);
        }
        streamed.map_err(|err| DispatchError::Source(Box::new(err)))?;
        debug!(
            "stream complete: {} points, {} shapes, {} relations",
            counts.points, counts.shapes, counts.relations
        );
        self.finish_all(counts)
    }

    fn finish_all(self, elements: ElementCounts) -> Result<RunReport, DispatchError> {
        let mut report = RunReport {
            elements,
            layers: Vec::with_capacity(self.slots.len()),
        };
        let mut first_error = None;
        for slot in self.slots {
            match slot.layer.finish() {
                Ok(LayerSummary {
                    rows_written,
                    unresolved,
                }) => report.layers.push(LayerReport {
                    name: slot.name,
                    rows_written,
                    rejected: slot.rejected,
                    unresolved,
                }),
                Err(source) => {
                    warn!("layer `{}` failed to finish: {source}", slot.name);
                    if first_error.is_none() {
                        first_error = Some(DispatchError::Finish {
                            layer: slot.name,
                            source,
                        });
                    }
                }
            }
        }
        first_error.map_or(Ok(report), Err)
    }
}

struct Pass<'a> {
    slots: &'a mut [Slot],
    routes: &'a Routes,
    counts: ElementCounts,
    fatal: Option<DispatchError>,
}

impl Pass<'_> {
    fn deliver<F>(
        &mut self,
        targets: &[usize],
        kind: ElementKind,
        id: i64,
        mut call: F,
    ) -> ControlFlow<()>
    where
        F: FnMut(&mut dyn Layer) -> Result<(), LayerError>,
    {
        for &index in targets {
            let Some(slot) = self.slots.get_mut(index) else {
                continue;
            };
            match call(slot.layer.as_mut()) {
                Ok(()) => {}
                Err(err) if err.is_recoverable() => {
                    warn!("layer `{}` skipped {kind} {id}: {err}", slot.name);
                    slot.rejected += 1;
                }
                Err(source) => {
                    self.fatal = Some(DispatchError::Layer {
                        layer: slot.name.clone(),
                        kind,
                        id,
                        source,
                    });
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    }
}

impl ElementVisitor for Pass<'_> {
    fn point(&mut self, point: &Point) -> ControlFlow<()> {
        self.counts.points += 1;
        let routes = self.routes;
        self.deliver(&routes.point, ElementKind::Node, point.id, |layer| {
            layer.point(point)
        })
    }

    fn shape(&mut self, shape: &Shape) -> ControlFlow<()> {
        self.counts.shapes += 1;
        let routes = self.routes;
        self.deliver(&routes.shape, shape.kind(), shape.id, |layer| {
            layer.shape(shape)
        })
    }

    fn relation(&mut self, relation: &Relation) -> ControlFlow<()> {
        self.counts.relations += 1;
        let routes = self.routes;
        self.deliver(&routes.relation, ElementKind::Relation, relation.id, |layer| {
            layer.relation(relation)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingLayer, MemorySource, RecordingLayer};
    use crate::{Capabilities, GeometryError, Tags};
    use geo::coord;
    use rstest::{fixture, rstest};

    fn point(id: i64, tags: &[(&str, &str)]) -> Point {
        Point::new(
            id,
            coord! { x: 0.0, y: 0.0 },
            tags.iter().copied().collect::<Tags>(),
        )
    }

    #[fixture]
    fn source() -> MemorySource {
        MemorySource::default()
            .with_point(point(1, &[("highway", "crossing")]))
            .with_point(point(2, &[("natural", "tree")]))
            .with_point(point(3, &[("building", "yes")]))
    }

    #[rstest]
    fn filter_is_union_of_layer_interests() {
        let dispatcher = Dispatcher::new(vec![
            Box::new(RecordingLayer::new("roads", &["highway"])),
            Box::new(RecordingLayer::new("addresses", &["addr:housenumber", "type"])),
        ]);
        assert_eq!(
            dispatcher.filter().keys().collect::<Vec<_>>(),
            vec!["addr:housenumber", "highway", "type"]
        );
    }

    #[rstest]
    fn only_filtered_elements_reach_layers(mut source: MemorySource) {
        let layer = RecordingLayer::new("roads", &["highway"]);
        let log = layer.log();
        let report = Dispatcher::new(vec![Box::new(layer)])
            .run(&mut source)
            .expect("run succeeds");
        assert_eq!(log.borrow().points, vec![1]);
        assert_eq!(report.elements.points, 1);
    }

    #[rstest]
    fn layers_without_capability_are_skipped(mut source: MemorySource) {
        let layer = RecordingLayer::new("roads", &["highway"])
            .with_capabilities(Capabilities::none().with_relation());
        let log = layer.log();
        Dispatcher::new(vec![Box::new(layer)])
            .run(&mut source)
            .expect("run succeeds");
        let log = log.borrow();
        assert!(log.points.is_empty());
        assert!(log.finished);
    }

    #[rstest]
    fn recoverable_errors_are_counted_and_the_pass_continues(mut source: MemorySource) {
        let failing = FailingLayer::new("broken", &["highway"], || {
            LayerError::Geometry(GeometryError::Empty)
        });
        let healthy = RecordingLayer::new("buildings", &["building"]);
        let log = healthy.log();
        let report = Dispatcher::new(vec![Box::new(failing), Box::new(healthy)])
            .run(&mut source)
            .expect("recoverable errors do not abort");
        assert_eq!(report.layer("broken").map(|layer| layer.rejected), Some(2));
        assert_eq!(log.borrow().points, vec![1, 3]);
    }

    #[rstest]
    fn fatal_errors_abort_without_finishing(mut source: MemorySource) {
        let failing = FailingLayer::new("broken", &["highway"], || {
            LayerError::output(std::io::Error::other("disk full"))
        });
        let healthy = RecordingLayer::new("buildings", &["building"]);
        let log = healthy.log();
        let err = Dispatcher::new(vec![Box::new(failing), Box::new(healthy)])
            .run(&mut source)
            .expect_err("output errors abort the run");
        assert!(matches!(err, DispatchError::Layer { id: 1, .. }));
        let log = log.borrow();
        assert!(log.points.is_empty());
        assert!(!log.finished);
    }
}
