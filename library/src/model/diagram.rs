//! The diagram root: owns nodes and links, zoom/offset/grid state and the
//! change listeners.

use indexmap::IndexMap;
use uuid::Uuid;

use super::link::LinkModel;
use super::node::NodeModel;
use super::point::PointModel;
use super::port::{PortModel, PortRef};
use super::ModelRef;
use crate::error::CanvasError;
use crate::geometry::{self, Point};

/// Zoom levels (percent) must stay strictly above this value.
pub const MIN_ZOOM_LEVEL: f64 = 10.0;
pub const DEFAULT_ZOOM_LEVEL: f64 = 100.0;
/// Value stored when a zoom level at or below the minimum is requested.
const ZOOM_FLOOR: f64 = MIN_ZOOM_LEVEL + 1e-3;

/// Notification emitted after a model mutation has been applied.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelEvent {
    NodesUpdated { node_id: Uuid, added: bool },
    LinksUpdated { link_id: Uuid, added: bool },
    /// A link's source or target port was reassigned.
    LinkPortsChanged { link_id: Uuid },
    OffsetUpdated { offset: Point },
    ZoomUpdated { zoom: f64 },
    GridUpdated { grid_size: f64 },
    SelectionChanged { entity: ModelRef, selected: bool },
    EntityRemoved { entity: ModelRef },
}

/// Handle returned by [`DiagramModel::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerHandle(Uuid);

type Listener = Box<dyn FnMut(&ModelEvent)>;

pub struct DiagramModel {
    pub id: Uuid,
    /// Locks every entity of the diagram.
    pub locked: bool,
    nodes: IndexMap<Uuid, NodeModel>,
    links: IndexMap<Uuid, LinkModel>,
    zoom: f64,
    offset: Point,
    grid_size: f64,
    listeners: IndexMap<ListenerHandle, Listener>,
}

impl Default for DiagramModel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DiagramModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramModel")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("zoom", &self.zoom)
            .field("offset", &self.offset)
            .field("grid_size", &self.grid_size)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl DiagramModel {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            locked: false,
            nodes: IndexMap::new(),
            links: IndexMap::new(),
            zoom: DEFAULT_ZOOM_LEVEL,
            offset: Point::ZERO,
            grid_size: 0.0,
            listeners: IndexMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl FnMut(&ModelEvent) + 'static) -> ListenerHandle {
        let handle = ListenerHandle(Uuid::new_v4());
        self.listeners.insert(handle, Box::new(listener));
        handle
    }

    /// Returns false if the handle was not registered.
    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.listeners.shift_remove(&handle).is_some()
    }

    fn emit(&mut self, event: ModelEvent) {
        for listener in self.listeners.values_mut() {
            listener(&event);
        }
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    pub fn add_node(&mut self, node: NodeModel) -> Uuid {
        let id = node.id;
        self.nodes.insert(id, node);
        self.emit(ModelEvent::NodesUpdated { node_id: id, added: true });
        id
    }

    /// Remove a node together with every link attached to its ports.
    pub fn remove_node(&mut self, node_id: Uuid) -> Result<NodeModel, CanvasError> {
        let link_ids = self.node(node_id)?.link_ids();
        for link_id in link_ids {
            if self.links.contains_key(&link_id) {
                self.remove_link(link_id)?;
            }
        }
        let node = self
            .nodes
            .shift_remove(&node_id)
            .ok_or(CanvasError::NodeNotFound(node_id))?;
        self.emit(ModelEvent::NodesUpdated { node_id, added: false });
        self.emit(ModelEvent::EntityRemoved {
            entity: ModelRef::Node(node_id),
        });
        Ok(node)
    }

    pub fn node(&self, node_id: Uuid) -> Result<&NodeModel, CanvasError> {
        self.nodes
            .get(&node_id)
            .ok_or(CanvasError::NodeNotFound(node_id))
    }

    pub fn node_mut(&mut self, node_id: Uuid) -> Result<&mut NodeModel, CanvasError> {
        self.nodes
            .get_mut(&node_id)
            .ok_or(CanvasError::NodeNotFound(node_id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeModel> {
        self.nodes.values()
    }

    pub fn contains_node(&self, node_id: Uuid) -> bool {
        self.nodes.contains_key(&node_id)
    }

    // -----------------------------------------------------------------------
    // Ports
    // -----------------------------------------------------------------------

    pub fn port(&self, port: &PortRef) -> Result<&PortModel, CanvasError> {
        self.nodes
            .get(&port.node_id)
            .and_then(|n| n.port(&port.port_name))
            .ok_or_else(|| CanvasError::PortNotFound(port.clone()))
    }

    pub fn port_mut(&mut self, port: &PortRef) -> Result<&mut PortModel, CanvasError> {
        self.nodes
            .get_mut(&port.node_id)
            .and_then(|n| n.port_mut(&port.port_name))
            .ok_or_else(|| CanvasError::PortNotFound(port.clone()))
    }

    /// Move a port and every link end attached to it.
    pub fn set_port_position(&mut self, port: &PortRef, position: Point) -> Result<(), CanvasError> {
        let link_ids: Vec<Uuid> = {
            let port_model = self.port_mut(port)?;
            port_model.set_position(position);
            port_model.links().iter().copied().collect()
        };
        for link_id in link_ids {
            let Some(link) = self.links.get_mut(&link_id) else {
                continue;
            };
            let len = link.points().len();
            let is_source = link.source() == Some(port);
            let is_target = link.target() == Some(port);
            let points = link.points_mut();
            if is_source && len > 0 {
                points[0].position = position;
            }
            if is_target && len > 0 {
                points[len - 1].position = position;
            }
        }
        Ok(())
    }

    /// Put a link's port-connected ends back onto their ports.
    pub fn sync_link_ends(&mut self, link_id: Uuid) -> Result<(), CanvasError> {
        let link = self.link(link_id)?;
        let source = match link.source() {
            Some(port) => Some(self.port(port)?.position()),
            None => None,
        };
        let target = match link.target() {
            Some(port) => Some(self.port(port)?.position()),
            None => None,
        };
        let points = self.link_mut(link_id)?.points_mut();
        if let (Some(position), Some(first)) = (source, points.first_mut()) {
            first.position = position;
        }
        if let (Some(position), Some(last)) = (target, points.last_mut()) {
            last.position = position;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Links & points
    // -----------------------------------------------------------------------

    /// Add a link and register it with its source and target ports.
    pub fn add_link(&mut self, link: LinkModel) -> Result<Uuid, CanvasError> {
        let id = link.id();
        for port in link.source().into_iter().chain(link.target()) {
            self.port(port)?;
        }
        if let Some(source) = link.source().cloned() {
            self.port_mut(&source)?.add_link(id);
        }
        if let Some(target) = link.target().cloned() {
            self.port_mut(&target)?.add_link(id);
        }
        self.links.insert(id, link);
        self.emit(ModelEvent::LinksUpdated { link_id: id, added: true });
        Ok(id)
    }

    pub fn remove_link(&mut self, link_id: Uuid) -> Result<LinkModel, CanvasError> {
        let link = self
            .links
            .shift_remove(&link_id)
            .ok_or(CanvasError::LinkNotFound(link_id))?;
        for port in link.source().into_iter().chain(link.target()) {
            if let Ok(port) = self.port_mut(port) {
                port.remove_link(link_id);
            }
        }
        self.emit(ModelEvent::LinksUpdated { link_id, added: false });
        self.emit(ModelEvent::EntityRemoved {
            entity: ModelRef::Link(link_id),
        });
        Ok(link)
    }

    pub fn link(&self, link_id: Uuid) -> Result<&LinkModel, CanvasError> {
        self.links
            .get(&link_id)
            .ok_or(CanvasError::LinkNotFound(link_id))
    }

    pub fn link_mut(&mut self, link_id: Uuid) -> Result<&mut LinkModel, CanvasError> {
        self.links
            .get_mut(&link_id)
            .ok_or(CanvasError::LinkNotFound(link_id))
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkModel> {
        self.links.values()
    }

    pub fn contains_link(&self, link_id: Uuid) -> bool {
        self.links.contains_key(&link_id)
    }

    /// Links joining the unordered pair `a`/`b`.
    pub fn links_between(&self, a: &PortRef, b: &PortRef) -> Vec<Uuid> {
        self.links
            .values()
            .filter(|l| l.connects(a, b))
            .map(LinkModel::id)
            .collect()
    }

    /// Point `point_id` lives on this link.
    pub fn link_of_point(&self, point_id: Uuid) -> Result<&LinkModel, CanvasError> {
        self.links
            .values()
            .find(|l| l.point(point_id).is_some())
            .ok_or(CanvasError::PointNotFound(point_id))
    }

    pub fn point(&self, point_id: Uuid) -> Result<&PointModel, CanvasError> {
        self.links
            .values()
            .find_map(|l| l.point(point_id))
            .ok_or(CanvasError::PointNotFound(point_id))
    }

    pub fn point_mut(&mut self, point_id: Uuid) -> Result<&mut PointModel, CanvasError> {
        self.links
            .values_mut()
            .find_map(|l| l.point_mut(point_id))
            .ok_or(CanvasError::PointNotFound(point_id))
    }

    pub fn contains_point(&self, point_id: Uuid) -> bool {
        self.point(point_id).is_ok()
    }

    /// Remove a waypoint. Endpoints are kept; a link reduced below two
    /// points is removed altogether.
    pub fn remove_point(&mut self, point_id: Uuid) -> Result<(), CanvasError> {
        let link_id = self.link_of_point(point_id)?.id();
        let link = self.link_mut(link_id)?;
        let index = link
            .point_index(point_id)
            .ok_or(CanvasError::PointNotFound(point_id))?;
        if index == 0 || index + 1 == link.points().len() {
            return Ok(());
        }
        link.remove_point(point_id);
        let remaining = link.points().len();
        self.emit(ModelEvent::EntityRemoved {
            entity: ModelRef::Point(point_id),
        });
        if remaining < 2 {
            self.remove_link(link_id)?;
        }
        Ok(())
    }

    pub(crate) fn set_link_target(
        &mut self,
        link_id: Uuid,
        port: Option<PortRef>,
    ) -> Result<(), CanvasError> {
        if let Some(port) = &port {
            self.port(port)?;
        }
        let old = self.link(link_id)?.target().cloned();
        self.link_mut(link_id)?.set_target(port.clone());
        self.relink_port(link_id, old, port)
    }

    fn relink_port(
        &mut self,
        link_id: Uuid,
        old: Option<PortRef>,
        new: Option<PortRef>,
    ) -> Result<(), CanvasError> {
        if let Some(old) = old {
            let still_attached = self.link(link_id)?.touches(&old);
            if !still_attached {
                if let Ok(port) = self.port_mut(&old) {
                    port.remove_link(link_id);
                }
            }
        }
        if let Some(new) = new {
            self.port_mut(&new)?.add_link(link_id);
        }
        self.emit(ModelEvent::LinkPortsChanged { link_id });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Zoom, offset, grid
    // -----------------------------------------------------------------------

    /// Zoom level in percent.
    pub fn zoom_level(&self) -> f64 {
        self.zoom
    }

    /// Zoom level divided by 100.
    pub fn zoom_factor(&self) -> f64 {
        self.zoom / 100.0
    }

    /// Set the zoom level, clamping to just above [`MIN_ZOOM_LEVEL`].
    /// Returns the value actually stored.
    pub fn set_zoom_level(&mut self, zoom: f64) -> f64 {
        let zoom = if zoom.is_nan() || zoom <= MIN_ZOOM_LEVEL {
            ZOOM_FLOOR
        } else {
            zoom.min(f64::MAX)
        };
        self.zoom = zoom;
        self.emit(ModelEvent::ZoomUpdated { zoom });
        zoom
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Point) {
        self.offset = offset;
        self.emit(ModelEvent::OffsetUpdated { offset });
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    pub fn set_grid_size(&mut self, grid_size: f64) {
        self.grid_size = grid_size;
        self.emit(ModelEvent::GridUpdated { grid_size });
    }

    /// Snap a single coordinate to the grid.
    pub fn grid_position(&self, value: f64) -> f64 {
        geometry::snap_to_grid(value, self.grid_size)
    }

    pub fn grid_point(&self, p: Point) -> Point {
        geometry::snap_point(p, self.grid_size)
    }

    /// Canvas-relative screen coordinates to world coordinates.
    pub fn to_world(&self, canvas: Point) -> Point {
        (canvas - self.offset) / self.zoom_factor()
    }

    /// World coordinates to canvas-relative screen coordinates.
    pub fn to_screen(&self, world: Point) -> Point {
        world * self.zoom_factor() + self.offset
    }

    // -----------------------------------------------------------------------
    // Selection & locking
    // -----------------------------------------------------------------------

    /// Deselect everything except `keep`.
    pub fn clear_selection(&mut self, keep: Option<&ModelRef>) {
        let mut changed = Vec::new();
        for node in self.nodes.values_mut() {
            let node_ref = ModelRef::Node(node.id);
            if node.selected && keep != Some(&node_ref) {
                node.selected = false;
                changed.push(node_ref);
            }
            for port_ref in node.port_refs() {
                let entity = ModelRef::Port(port_ref.clone());
                if keep == Some(&entity) {
                    continue;
                }
                if let Some(port) = node.port_mut(&port_ref.port_name) {
                    if port.selected {
                        port.selected = false;
                        changed.push(entity);
                    }
                }
            }
        }
        for link in self.links.values_mut() {
            let link_ref = ModelRef::Link(link.id());
            if link.selected && keep != Some(&link_ref) {
                link.selected = false;
                changed.push(link_ref);
            }
            for point in link.points_mut() {
                let point_ref = ModelRef::Point(point.id);
                if point.selected && keep != Some(&point_ref) {
                    point.selected = false;
                    changed.push(point_ref);
                }
            }
        }
        for entity in changed {
            self.emit(ModelEvent::SelectionChanged {
                entity,
                selected: false,
            });
        }
    }

    pub fn set_selected(&mut self, entity: &ModelRef, selected: bool) -> Result<(), CanvasError> {
        let flag = self.selected_flag_mut(entity)?;
        if *flag == selected {
            return Ok(());
        }
        *flag = selected;
        self.emit(ModelEvent::SelectionChanged {
            entity: entity.clone(),
            selected,
        });
        Ok(())
    }

    pub fn is_selected(&self, entity: &ModelRef) -> Result<bool, CanvasError> {
        Ok(match entity {
            ModelRef::Node(id) => self.node(*id)?.selected,
            ModelRef::Port(port) => self.port(port)?.selected,
            ModelRef::Link(id) => self.link(*id)?.selected,
            ModelRef::Point(id) => self.point(*id)?.selected,
        })
    }

    fn selected_flag_mut(&mut self, entity: &ModelRef) -> Result<&mut bool, CanvasError> {
        Ok(match entity {
            ModelRef::Node(id) => &mut self.node_mut(*id)?.selected,
            ModelRef::Port(port) => &mut self.port_mut(port)?.selected,
            ModelRef::Link(id) => &mut self.link_mut(*id)?.selected,
            ModelRef::Point(id) => &mut self.point_mut(*id)?.selected,
        })
    }

    /// Selected nodes, links and points, in model order.
    pub fn selected_items(&self) -> Vec<ModelRef> {
        let mut items: Vec<ModelRef> = self
            .nodes
            .values()
            .filter(|n| n.selected)
            .map(|n| ModelRef::Node(n.id))
            .collect();
        for link in self.links.values() {
            if link.selected {
                items.push(ModelRef::Link(link.id()));
            }
            items.extend(
                link.points()
                    .iter()
                    .filter(|p| p.selected)
                    .map(|p| ModelRef::Point(p.id)),
            );
        }
        items
    }

    /// Whether an entity rejects interaction. Ports inherit their node's
    /// lock and points their link's; everything inherits the diagram lock.
    /// Unknown entities count as locked.
    pub fn is_locked(&self, entity: &ModelRef) -> bool {
        if self.locked {
            return true;
        }
        match entity {
            ModelRef::Node(id) => self.nodes.get(id).is_none_or(|n| n.locked),
            ModelRef::Port(port) => match self.nodes.get(&port.node_id) {
                Some(node) => node.locked || node.port(&port.port_name).is_none_or(|p| p.locked),
                None => true,
            },
            ModelRef::Link(id) => self.links.get(id).is_none_or(|l| l.locked),
            ModelRef::Point(id) => self.link_of_point(*id).map_or(true, |l| l.locked),
        }
    }

    pub fn set_locked(&mut self, entity: &ModelRef, locked: bool) -> Result<(), CanvasError> {
        match entity {
            ModelRef::Node(id) => self.node_mut(*id)?.locked = locked,
            ModelRef::Port(port) => self.port_mut(port)?.locked = locked,
            ModelRef::Link(id) => self.link_mut(*id)?.locked = locked,
            ModelRef::Point(id) => {
                let link_id = self.link_of_point(*id)?.id();
                self.link_mut(link_id)?.locked = locked;
            }
        }
        Ok(())
    }

    /// Remove any entity. Ports are removed through their node only, so
    /// removing a port is a no-op.
    pub fn remove(&mut self, entity: &ModelRef) -> Result<(), CanvasError> {
        match entity {
            ModelRef::Node(id) => self.remove_node(*id).map(|_| ()),
            ModelRef::Link(id) => self.remove_link(*id).map(|_| ()),
            ModelRef::Point(id) => self.remove_point(*id),
            ModelRef::Port(_) => Ok(()),
        }
    }
}
