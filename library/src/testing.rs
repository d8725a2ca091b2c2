//! Scripted host used by the unit tests.

use std::collections::HashMap;
use uuid::Uuid;

use crate::action::Action;
use crate::geometry::{self, Point, Rect};
use crate::host::{ActionObserver, CanvasHost, SceneGeometry};
use crate::model::{DiagramModel, ModelRef, PortRef};

pub const NODE_SIZE: f64 = 40.0;
pub const HANDLE_RADIUS: f64 = 6.0;
pub const LINK_TOLERANCE: f64 = 3.0;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Hit-tests against simple shapes derived from the model: nodes are
/// `NODE_SIZE` squares, ports and points are discs, links are polylines.
/// Ports sit at their node's position plus a per-port offset.
pub struct TestHost {
    pub viewport: Rect,
    pub port_offsets: HashMap<PortRef, Point>,
    pub repaints: usize,
    pub invalidated: Vec<Uuid>,
}

impl Default for TestHost {
    fn default() -> Self {
        Self {
            viewport: Rect::from_min_size(Point::ZERO, 800.0, 600.0),
            port_offsets: HashMap::new(),
            repaints: 0,
            invalidated: Vec::new(),
        }
    }
}

impl TestHost {
    pub fn with_origin(origin: Point) -> Self {
        Self {
            viewport: Rect::from_min_size(origin, 800.0, 600.0),
            ..Self::default()
        }
    }

    /// Store the host-resolved position of every port in the model.
    pub fn sync_ports(&self, model: &mut DiagramModel) {
        let ports: Vec<PortRef> = model.nodes().flat_map(|n| n.port_refs()).collect();
        for port in ports {
            if let Some(position) = self.port_position(model, &port) {
                model.set_port_position(&port, position).unwrap();
            }
        }
    }
}

impl SceneGeometry for TestHost {
    fn element_at(&self, model: &DiagramModel, canvas_point: Point) -> Option<ModelRef> {
        let world = model.to_world(canvas_point);
        let mut hits = Vec::new();
        for node in model.nodes() {
            for port in node.ports() {
                if port.position().distance(world) <= HANDLE_RADIUS {
                    hits.push(ModelRef::Port(port.port_ref()));
                }
            }
            let rect = Rect::from_min_size(node.position, NODE_SIZE, NODE_SIZE);
            if rect.contains(world) {
                hits.push(ModelRef::Node(node.id));
            }
        }
        for link in model.links() {
            for point in link.points() {
                if point.position.distance(world) <= HANDLE_RADIUS {
                    hits.push(ModelRef::Point(point.id));
                }
            }
            let positions: Vec<Point> = link.positions().collect();
            if positions
                .windows(2)
                .any(|s| geometry::distance_to_segment(world, s[0], s[1]) <= LINK_TOLERANCE)
            {
                hits.push(ModelRef::Link(link.id()));
            }
        }
        ModelRef::topmost(hits)
    }

    fn port_position(&self, model: &DiagramModel, port: &PortRef) -> Option<Point> {
        let node = model.node(port.node_id).ok()?;
        let offset = self.port_offsets.get(port).copied().unwrap_or(Point::ZERO);
        Some(node.position + offset)
    }
}

impl CanvasHost for TestHost {
    fn viewport(&self) -> Rect {
        self.viewport
    }

    fn request_repaint(&mut self) {
        self.repaints += 1;
    }

    fn invalidate_link(&mut self, link_id: Uuid) {
        self.invalidated.push(link_id);
    }
}

/// Records every hook call; optionally vetoes action starts.
#[derive(Default)]
pub struct RecordingObserver {
    pub log: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
    pub veto: bool,
}

impl ActionObserver for RecordingObserver {
    fn action_started(&mut self, action: &Action) -> bool {
        self.log.borrow_mut().push(format!("started:{}", action.name()));
        !self.veto
    }

    fn action_updated(&mut self, action: &Action) {
        self.log.borrow_mut().push(format!("updated:{}", action.name()));
    }

    fn action_stopped(&mut self, action: &Action) {
        self.log.borrow_mut().push(format!("stopped:{}", action.name()));
    }
}
