//! The gesture in progress between pointer-down and pointer-up.
//!
//! [`Action`] is a plain sum type; the controller dispatches on it in one
//! place and calls the matching update function below.

use uuid::Uuid;

use crate::error::CanvasError;
use crate::geometry::{Point, Rect};
use crate::host::SceneGeometry;
use crate::model::{DiagramModel, ModelRef};

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Action {
    #[default]
    Idle,
    Selecting(SelectingAction),
    MoveItems(MoveItemsAction),
    MoveCanvas(MoveCanvasAction),
}

impl Action {
    pub fn is_idle(&self) -> bool {
        matches!(self, Action::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Idle => "idle",
            Action::Selecting(_) => "selecting",
            Action::MoveItems(_) => "move-items",
            Action::MoveCanvas(_) => "move-canvas",
        }
    }
}

// ---------------------------------------------------------------------------
// Selecting
// ---------------------------------------------------------------------------

/// Rubber-band selection. Corners are canvas-relative screen coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectingAction {
    pub origin: Point,
    pub current: Point,
}

impl SelectingAction {
    pub fn new(origin: Point) -> Self {
        Self {
            origin,
            current: origin,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_two_points(self.origin, self.current)
    }

    /// Whether a world position falls inside the box.
    pub fn contains(&self, model: &DiagramModel, world: Point) -> bool {
        self.rect().contains(model.to_screen(world))
    }
}

/// Move the box corner and reselect: nodes by position, links only when
/// every one of their points is inside.
pub fn update_selection(
    action: &mut SelectingAction,
    model: &mut DiagramModel,
    canvas_point: Point,
) -> Result<(), CanvasError> {
    action.current = canvas_point;
    let updates: Vec<(ModelRef, bool)> = {
        let view: &DiagramModel = model;
        let rect = action.rect();
        let nodes = view
            .nodes()
            .map(|n| (ModelRef::Node(n.id), action.contains(view, n.position)));
        let links = view.links().map(|l| {
            let inside = rect.contains_all(l.positions().map(|p| view.to_screen(p)));
            (ModelRef::Link(l.id()), inside)
        });
        nodes.chain(links).collect()
    };
    for (entity, selected) in updates {
        model.set_selected(&entity, selected)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Moving items
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct MovedItem {
    pub model: ModelRef,
    pub initial: Point,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveItemsAction {
    /// Pointer position (absolute screen) at gesture start.
    pub anchor: Point,
    pub items: Vec<MovedItem>,
    /// Set once the pointer has moved away from the anchor.
    pub moved: bool,
}

impl MoveItemsAction {
    /// Snapshot every unlocked selected node and point. A selected link
    /// contributes all of its points.
    pub fn capture(model: &DiagramModel, anchor: Point) -> Self {
        let mut items: Vec<MovedItem> = Vec::new();
        let push = |items: &mut Vec<MovedItem>, entity: ModelRef, initial: Point| {
            if !items.iter().any(|i| i.model == entity) {
                items.push(MovedItem {
                    model: entity,
                    initial,
                });
            }
        };
        for entity in model.selected_items() {
            if model.is_locked(&entity) {
                continue;
            }
            match &entity {
                ModelRef::Node(id) => {
                    if let Ok(node) = model.node(*id) {
                        push(&mut items, entity.clone(), node.position);
                    }
                }
                ModelRef::Link(id) => {
                    if let Ok(link) = model.link(*id) {
                        for point in link.points() {
                            push(&mut items, ModelRef::Point(point.id), point.position);
                        }
                    }
                }
                ModelRef::Point(id) => {
                    if let Ok(point) = model.point(*id) {
                        push(&mut items, entity.clone(), point.position);
                    }
                }
                ModelRef::Port(_) => {}
            }
        }
        Self {
            anchor,
            items,
            moved: false,
        }
    }

    pub fn point_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.items.iter().filter_map(|i| match i.model {
            ModelRef::Point(id) => Some(id),
            _ => None,
        })
    }
}

/// Apply the pointer delta to every captured item.
///
/// Nodes and free points land on the grid. Points attached to a port move
/// by the snapped delta from their exact initial position. Ports of moved
/// nodes are re-resolved through `geometry` and drag their link ends along.
pub fn move_items<G>(
    action: &mut MoveItemsAction,
    model: &mut DiagramModel,
    geometry: &G,
    pointer: Point,
) -> Result<(), CanvasError>
where
    G: SceneGeometry + ?Sized,
{
    let raw = pointer - action.anchor;
    if !raw.is_zero() {
        action.moved = true;
    }
    let delta = raw / model.zoom_factor();
    let mut moved_nodes = Vec::new();
    // Items deleted since the snapshot was taken are skipped.
    for item in &action.items {
        match &item.model {
            ModelRef::Node(id) => {
                let position = model.grid_point(item.initial + delta);
                let Ok(node) = model.node_mut(*id) else {
                    continue;
                };
                node.position = position;
                moved_nodes.push(*id);
            }
            ModelRef::Point(id) => {
                let Ok(link) = model.link_of_point(*id) else {
                    continue;
                };
                let position = if link.is_point_connected(*id) {
                    item.initial + model.grid_point(delta)
                } else {
                    model.grid_point(item.initial + delta)
                };
                model.point_mut(*id)?.position = position;
            }
            ModelRef::Link(_) | ModelRef::Port(_) => {}
        }
    }
    for node_id in moved_nodes {
        let ports = model.node(node_id)?.port_refs();
        for port in ports {
            if let Some(position) = geometry.port_position(model, &port) {
                model.set_port_position(&port, position)?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Moving the canvas
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct MoveCanvasAction {
    pub anchor: Point,
    pub initial_offset: Point,
}

/// Pan in screen space. With translation disabled the gesture is still
/// tracked but leaves the offset alone.
pub fn move_canvas(
    action: &MoveCanvasAction,
    model: &mut DiagramModel,
    pointer: Point,
    translation_enabled: bool,
) {
    if translation_enabled {
        model.set_offset(action.initial_offset + (pointer - action.anchor));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinkModel, NodeModel, PortModel};
    use crate::testing::TestHost;

    #[test]
    fn test_selection_box_is_all_or_nothing_for_links() {
        let mut model = DiagramModel::new();
        let node = model.add_node(NodeModel::new("default", Point::new(20.0, 20.0)));
        let link = model
            .add_link(LinkModel::new().with_points(&[
                Point::new(10.0, 10.0),
                Point::new(50.0, 50.0),
                Point::new(90.0, 10.0),
            ]))
            .unwrap();

        let mut action = SelectingAction::new(Point::new(0.0, 0.0));
        update_selection(&mut action, &mut model, Point::new(100.0, 100.0)).unwrap();
        assert!(model.node(node).unwrap().selected);
        assert!(model.link(link).unwrap().selected);

        // shrink the box so the last point falls outside
        update_selection(&mut action, &mut model, Point::new(60.0, 100.0)).unwrap();
        assert!(model.node(node).unwrap().selected);
        assert!(!model.link(link).unwrap().selected);
    }

    #[test]
    fn test_selection_box_honours_zoom_and_offset() {
        let mut model = DiagramModel::new();
        let node = model.add_node(NodeModel::new("default", Point::new(100.0, 100.0)));
        model.set_zoom_level(50.0);
        model.set_offset(Point::new(10.0, 10.0));
        // the node is drawn at (60, 60)
        let mut action = SelectingAction::new(Point::ZERO);
        update_selection(&mut action, &mut model, Point::new(70.0, 70.0)).unwrap();
        assert!(model.node(node).unwrap().selected);
        update_selection(&mut action, &mut model, Point::new(55.0, 70.0)).unwrap();
        assert!(!model.node(node).unwrap().selected);
    }

    #[test]
    fn test_capture_skips_locked_and_expands_links() {
        let mut model = DiagramModel::new();
        let free = model.add_node(NodeModel::new("default", Point::new(5.0, 5.0)));
        let mut locked = NodeModel::new("default", Point::ZERO);
        locked.locked = true;
        let locked = model.add_node(locked);
        let link = model.add_link(LinkModel::new()).unwrap();
        for entity in [ModelRef::Node(free), ModelRef::Node(locked), ModelRef::Link(link)] {
            model.set_selected(&entity, true).unwrap();
        }
        let first_point = model.link(link).unwrap().points()[0].id;
        model.set_selected(&ModelRef::Point(first_point), true).unwrap();

        let action = MoveItemsAction::capture(&model, Point::ZERO);
        assert_eq!(action.items.len(), 3);
        assert_eq!(action.items[0].model, ModelRef::Node(free));
        assert_eq!(action.point_ids().count(), 2);
    }

    #[test]
    fn test_move_items_snaps_and_scales() {
        let mut model = DiagramModel::new();
        model.set_grid_size(10.0);
        model.set_zoom_level(200.0);
        let node = model.add_node(NodeModel::new("default", Point::new(0.0, 0.0)));
        model.set_selected(&ModelRef::Node(node), true).unwrap();

        let mut action = MoveItemsAction::capture(&model, Point::new(100.0, 100.0));
        let host = TestHost::default();
        move_items(&mut action, &mut model, &host, Point::new(100.0, 100.0)).unwrap();
        assert!(!action.moved);

        // 34px at 200% is 17 world units, snapped to 20
        move_items(&mut action, &mut model, &host, Point::new(134.0, 108.0)).unwrap();
        assert!(action.moved);
        assert_eq!(model.node(node).unwrap().position, Point::new(20.0, 0.0));
    }

    #[test]
    fn test_connected_points_move_by_snapped_delta() {
        let mut model = DiagramModel::new();
        model.set_grid_size(10.0);
        let mut a = NodeModel::new("default", Point::ZERO);
        let pa = a.add_port(PortModel::output("out").with_position(Point::new(3.0, 3.0)));
        model.add_node(a);
        let link = model
            .add_link(
                LinkModel::new()
                    .with_points(&[Point::new(3.0, 3.0), Point::new(47.0, 3.0)])
                    .with_ports(Some(pa), None),
            )
            .unwrap();
        model.set_selected(&ModelRef::Link(link), true).unwrap();

        let mut action = MoveItemsAction::capture(&model, Point::ZERO);
        let host = TestHost::default();
        move_items(&mut action, &mut model, &host, Point::new(12.0, 0.0)).unwrap();

        let link = model.link(link).unwrap();
        // attached end: raw initial + snapped delta (10)
        assert_eq!(link.points()[0].position, Point::new(13.0, 3.0));
        // free end: snapped absolute position (59 -> 60, 3 -> 0)
        assert_eq!(link.points()[1].position, Point::new(60.0, 0.0));
    }

    #[test]
    fn test_moving_a_node_recomputes_ports_and_attached_ends() {
        let mut model = DiagramModel::new();
        let mut a = NodeModel::new("default", Point::ZERO);
        let pa = a.add_port(PortModel::output("out"));
        let node = model.add_node(a);
        let link = model
            .add_link(LinkModel::new().with_ports(Some(pa.clone()), None))
            .unwrap();
        model.set_selected(&ModelRef::Node(node), true).unwrap();

        let mut host = TestHost::default();
        host.port_offsets.insert(pa.clone(), Point::new(40.0, 20.0));
        let mut action = MoveItemsAction::capture(&model, Point::ZERO);
        move_items(&mut action, &mut model, &host, Point::new(15.0, 25.0)).unwrap();

        assert_eq!(model.port(&pa).unwrap().position(), Point::new(55.0, 45.0));
        assert_eq!(
            model.link(link).unwrap().first_point().unwrap().position,
            Point::new(55.0, 45.0)
        );
    }

    #[test]
    fn test_move_items_skips_removed_entries() {
        let mut model = DiagramModel::new();
        let gone = model.add_node(NodeModel::new("default", Point::ZERO));
        let kept = model.add_node(NodeModel::new("default", Point::new(50.0, 0.0)));
        let link = model.add_link(LinkModel::new()).unwrap();
        for entity in [ModelRef::Node(gone), ModelRef::Node(kept), ModelRef::Link(link)] {
            model.set_selected(&entity, true).unwrap();
        }
        let mut action = MoveItemsAction::capture(&model, Point::ZERO);
        model.remove_node(gone).unwrap();
        model.remove_link(link).unwrap();

        let host = TestHost::default();
        move_items(&mut action, &mut model, &host, Point::new(5.0, 5.0)).unwrap();
        assert_eq!(model.node(kept).unwrap().position, Point::new(55.0, 5.0));
    }

    #[test]
    fn test_move_canvas_respects_translation_flag() {
        let mut model = DiagramModel::new();
        model.set_zoom_level(300.0);
        let action = MoveCanvasAction {
            anchor: Point::new(10.0, 10.0),
            initial_offset: Point::new(5.0, 5.0),
        };
        move_canvas(&action, &mut model, Point::new(30.0, 0.0), false);
        assert_eq!(model.offset(), Point::ZERO);
        // not divided by zoom
        move_canvas(&action, &mut model, Point::new(30.0, 0.0), true);
        assert_eq!(model.offset(), Point::new(25.0, -5.0));
    }
}
