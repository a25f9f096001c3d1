//! Behavioural tests for the fan-out dispatcher.

use geo::{MultiPolygon, coord, polygon};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::{cell::RefCell, convert::Infallible, fs, path::PathBuf, rc::Rc};
use strata_core::{
    Capabilities, DispatchError, Dispatcher, Element, ElementSource, ElementVisitor,
    InterestFilter, Layer, LayerError, LayerSummary, Point, RunReport, Shape, ShapeGeometry,
    ShapeOrigin, Tags,
};

#[derive(Debug, Default)]
struct Seen {
    points: Vec<i64>,
    shapes: Vec<i64>,
    finish_calls: u32,
}

struct ProbeLayer {
    name: &'static str,
    capabilities: Capabilities,
    seen: Rc<RefCell<Seen>>,
}

impl Layer for ProbeLayer {
    fn name(&self) -> &str {
        self.name
    }

    fn interest(&self) -> &'static [&'static str] {
        &["boundary"]
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn point(&mut self, point: &Point) -> Result<(), LayerError> {
        self.seen.borrow_mut().points.push(point.id);
        Ok(())
    }

    fn shape(&mut self, shape: &Shape) -> Result<(), LayerError> {
        self.seen.borrow_mut().shapes.push(shape.id);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<LayerSummary, LayerError> {
        self.seen.borrow_mut().finish_calls += 1;
        Ok(LayerSummary::default())
    }
}

struct VecSource(Vec<Element>);

impl ElementSource for VecSource {
    type Error = Infallible;

    fn stream(
        &mut self,
        filter: &InterestFilter,
        visitor: &mut dyn ElementVisitor,
    ) -> Result<(), Infallible> {
        for element in &self.0 {
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

type Probes = Vec<(&'static str, Capabilities, Rc<RefCell<Seen>>)>;

const AREA_ID: i64 = 42;

#[fixture]
fn probes() -> RefCell<Probes> {
    RefCell::new(Vec::new())
}

#[fixture]
fn elements() -> RefCell<Vec<Element>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn outcome() -> RefCell<Option<Result<RunReport, DispatchError>>> {
    RefCell::new(None)
}

fn register(probes: &RefCell<Probes>, layers: [(&'static str, Capabilities); 2]) {
    *probes.borrow_mut() = layers
        .into_iter()
        .map(|(name, caps)| (name, caps, Rc::new(RefCell::new(Seen::default()))))
        .collect();
}

fn seen_by(probes: &RefCell<Probes>, name: &str) -> Rc<RefCell<Seen>> {
    probes
        .borrow()
        .iter()
        .find(|(candidate, _, _)| *candidate == name)
        .map(|(_, _, seen)| Rc::clone(seen))
        .unwrap_or_else(|| panic!("layer {name} registered"))
}

#[given("a boundaries layer and a parks layer that both watch boundary")]
fn boundaries_and_parks(#[from(probes)] probes: &RefCell<Probes>) {
    register(
        probes,
        [
            ("boundaries", Capabilities::none().with_shape()),
            ("parks", Capabilities::none().with_point().with_shape()),
        ],
    );
}

#[given("a boundaries layer and a point-only layer that both watch boundary")]
fn boundaries_and_point_only(#[from(probes)] probes: &RefCell<Probes>) {
    register(
        probes,
        [
            ("boundaries", Capabilities::none().with_shape()),
            ("markers", Capabilities::none().with_point()),
        ],
    );
}

#[given("a source holding an area tagged boundary=administrative")]
fn administrative_area(#[from(elements)] elements: &RefCell<Vec<Element>>) {
    let area = MultiPolygon::new(vec![polygon![
        (x: 0.0, y: 0.0),
        (x: 1.0, y: 0.0),
        (x: 1.0, y: 1.0),
        (x: 0.0, y: 0.0),
    ]]);
    let shape = Shape::new(
        AREA_ID,
        ShapeOrigin::Relation,
        ShapeGeometry::Area(area),
        Tags::from([("boundary", "administrative")]),
    );
    elements.borrow_mut().push(Element::Shape(shape));
}

#[given("a source holding a point tagged natural=tree")]
fn tree_point(#[from(elements)] elements: &RefCell<Vec<Element>>) {
    let point = Point::new(
        7,
        coord! { x: 2.0, y: 3.0 },
        Tags::from([("natural", "tree")]),
    );
    elements.borrow_mut().push(Element::Point(point));
}

#[when("the dispatcher runs")]
fn run_dispatcher(
    #[from(probes)] probes: &RefCell<Probes>,
    #[from(elements)] elements: &RefCell<Vec<Element>>,
    #[from(outcome)] outcome: &RefCell<Option<Result<RunReport, DispatchError>>>,
) {
    let layers: Vec<Box<dyn Layer>> = probes
        .borrow()
        .iter()
        .map(|(name, capabilities, seen)| {
            Box::new(ProbeLayer {
                name: *name,
                capabilities: *capabilities,
                seen: Rc::clone(seen),
            }) as Box<dyn Layer>
        })
        .collect();
    let mut source = VecSource(elements.borrow().clone());
    *outcome.borrow_mut() = Some(Dispatcher::new(layers).run(&mut source));
}

#[then("both layers receive the area")]
fn both_receive(#[from(probes)] probes: &RefCell<Probes>) {
    for name in ["boundaries", "parks"] {
        let seen = seen_by(probes, name);
        assert_eq!(seen.borrow().shapes, vec![AREA_ID], "{name} missed the area");
    }
}

#[then("only the boundaries layer receives the area")]
fn only_boundaries_receive(#[from(probes)] probes: &RefCell<Probes>) {
    assert_eq!(seen_by(probes, "boundaries").borrow().shapes, vec![AREA_ID]);
    let markers = seen_by(probes, "markers");
    assert!(markers.borrow().shapes.is_empty());
    assert!(markers.borrow().points.is_empty());
}

#[then("no layer receives any element")]
fn nothing_received(#[from(probes)] probes: &RefCell<Probes>) {
    for (name, _, seen) in probes.borrow().iter() {
        let seen = seen.borrow();
        assert!(
            seen.points.is_empty() && seen.shapes.is_empty(),
            "{name} received a filtered element"
        );
    }
}

#[then("every layer is finished exactly once")]
fn finished_once(
    #[from(probes)] probes: &RefCell<Probes>,
    #[from(outcome)] outcome: &RefCell<Option<Result<RunReport, DispatchError>>>,
) {
    let borrowed = outcome.borrow();
    let report = borrowed
        .as_ref()
        .expect("dispatcher ran")
        .as_ref()
        .expect("run succeeded");
    assert_eq!(report.layers.len(), probes.borrow().len());
    for (name, _, seen) in probes.borrow().iter() {
        assert_eq!(seen.borrow().finish_calls, 1, "{name} finish count");
    }
}

#[scenario(path = "tests/features/fan_out.feature", index = 0)]
fn scenario_shared_interest_key(
    probes: RefCell<Probes>,
    elements: RefCell<Vec<Element>>,
    outcome: RefCell<Option<Result<RunReport, DispatchError>>>,
) {
    let _ = (probes, elements, outcome);
}

#[scenario(path = "tests/features/fan_out.feature", index = 1)]
fn scenario_missing_handler(
    probes: RefCell<Probes>,
    elements: RefCell<Vec<Element>>,
    outcome: RefCell<Option<Result<RunReport, DispatchError>>>,
) {
    let _ = (probes, elements, outcome);
}

#[scenario(path = "tests/features/fan_out.feature", index = 2)]
fn scenario_filtered_element(
    probes: RefCell<Probes>,
    elements: RefCell<Vec<Element>>,
    outcome: RefCell<Option<Result<RunReport, DispatchError>>>,
) {
    let _ = (probes, elements, outcome);
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/fan_out.feature");
    let contents = fs::read_to_string(&feature).unwrap_or_else(|err| {
        panic!("failed to read feature file {feature:?}: {err}");
    });
    let titles: Vec<&str> = contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .collect();
    assert_eq!(
        titles,
        vec![
            "a shared interest key reaches both layers",
            "layers without a shape handler are skipped",
            "elements outside every interest are filtered out",
        ]
    );
}
