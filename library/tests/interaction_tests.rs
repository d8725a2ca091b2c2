use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use diagram_canvas::config::KEY_DELETE;
use diagram_canvas::controller::{CanvasEvent, KeyEvent, PointerEvent};
use diagram_canvas::model::{NodeModel, PortModel, PortRef};
use diagram_canvas::{
    Action, ActionObserver, CanvasConfig, CanvasHost, DiagramModel, InteractionController,
    ModelRef, Point, Rect, SceneGeometry,
};

const NODE_WIDTH: f64 = 50.0;
const NODE_HEIGHT: f64 = 30.0;
const PORT_RADIUS: f64 = 8.0;

/// Canvas placed at (100, 50) on screen; nodes are 50x30 boxes.
struct BoxScene {
    port_offsets: HashMap<PortRef, Point>,
}

impl SceneGeometry for BoxScene {
    fn element_at(&self, model: &DiagramModel, canvas_point: Point) -> Option<ModelRef> {
        let world = model.to_world(canvas_point);
        let mut hits = Vec::new();
        for node in model.nodes() {
            for port in node.ports() {
                if port.position().distance(world) <= PORT_RADIUS {
                    hits.push(ModelRef::Port(port.port_ref()));
                }
            }
            if Rect::from_min_size(node.position, NODE_WIDTH, NODE_HEIGHT).contains(world) {
                hits.push(ModelRef::Node(node.id));
            }
        }
        for link in model.links() {
            for point in link.points() {
                if point.position.distance(world) <= PORT_RADIUS {
                    hits.push(ModelRef::Point(point.id));
                }
            }
        }
        ModelRef::topmost(hits)
    }

    fn port_position(&self, model: &DiagramModel, port: &PortRef) -> Option<Point> {
        let node = model.node(port.node_id).ok()?;
        Some(node.position + *self.port_offsets.get(port)?)
    }
}

impl CanvasHost for BoxScene {
    fn viewport(&self) -> Rect {
        Rect::from_min_size(Point::new(100.0, 50.0), 640.0, 480.0)
    }

    fn request_repaint(&mut self) {}
}

#[derive(Clone, Default)]
struct Counts {
    started: Rc<Cell<usize>>,
    stopped: Rc<Cell<usize>>,
}

impl ActionObserver for Counts {
    fn action_started(&mut self, _action: &Action) -> bool {
        self.started.set(self.started.get() + 1);
        true
    }

    fn action_stopped(&mut self, _action: &Action) {
        self.stopped.set(self.stopped.get() + 1);
    }
}

fn pointer(kind: fn(PointerEvent) -> CanvasEvent, x: f64, y: f64) -> CanvasEvent {
    kind(PointerEvent::new(Point::new(x, y)))
}

#[test]
fn test_link_node_move_and_delete_on_zoomed_canvas() {
    let config = CanvasConfig::from_toml_str("allow_loose_links = false").unwrap();
    let counts = Counts::default();
    let mut controller = InteractionController::new(config).with_observer(counts.clone());

    let mut model = DiagramModel::new();
    let mut a = NodeModel::new("source", Point::new(0.0, 0.0));
    let out = a.add_port(PortModel::output("out"));
    let mut b = NodeModel::new("sink", Point::new(200.0, 0.0));
    let input = b.add_port(PortModel::input("in"));
    model.add_node(a);
    model.add_node(b);
    model.set_zoom_level(200.0);
    model.set_offset(Point::new(10.0, 10.0));

    let mut scene = BoxScene {
        port_offsets: HashMap::from([
            (out.clone(), Point::new(50.0, 15.0)),
            (input.clone(), Point::new(0.0, 15.0)),
        ]),
    };
    for port in [&out, &input] {
        let position = scene.port_position(&model, port).unwrap();
        model.set_port_position(port, position).unwrap();
    }

    // screen = world * 2 + offset + canvas origin
    for event in [
        pointer(CanvasEvent::PointerDown, 210.0, 90.0),
        pointer(CanvasEvent::PointerMove, 510.0, 90.0),
        pointer(CanvasEvent::PointerUp, 510.0, 90.0),
    ] {
        controller.handle(&mut model, &mut scene, event).unwrap();
    }

    let link_id = model.links().next().unwrap().id();
    let link = model.link(link_id).unwrap();
    assert_eq!(link.source(), Some(&out));
    assert_eq!(link.target(), Some(&input));
    assert_eq!(
        link.positions().collect::<Vec<_>>(),
        vec![Point::new(50.0, 15.0), Point::new(200.0, 15.0)]
    );

    // drag node B by (20, 10) world units
    for event in [
        pointer(CanvasEvent::PointerDown, 570.0, 80.0),
        pointer(CanvasEvent::PointerMove, 610.0, 100.0),
        pointer(CanvasEvent::PointerUp, 610.0, 100.0),
    ] {
        controller.handle(&mut model, &mut scene, event).unwrap();
    }
    assert_eq!(model.node(input.node_id).unwrap().position, Point::new(220.0, 10.0));
    assert_eq!(model.port(&input).unwrap().position(), Point::new(220.0, 25.0));
    assert_eq!(
        model.link(link_id).unwrap().last_point().unwrap().position,
        Point::new(220.0, 25.0)
    );

    controller
        .handle(
            &mut model,
            &mut scene,
            CanvasEvent::KeyUp(KeyEvent { key_code: KEY_DELETE }),
        )
        .unwrap();
    assert!(!model.contains_node(input.node_id));
    assert!(!model.contains_link(link_id));
    assert!(model.port(&out).unwrap().links().is_empty());

    assert_eq!(counts.started.get(), 2);
    assert_eq!(counts.stopped.get(), 2);
}
