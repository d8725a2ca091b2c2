//! Ports: connection anchors owned by a node.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Point;

/// Direction of a port.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
    /// Accepts links in either direction.
    #[default]
    Any,
}

/// Identifies a specific port on a specific node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node_id: Uuid,
    pub port_name: String,
}

impl PortRef {
    pub fn new(node_id: Uuid, port_name: &str) -> Self {
        Self {
            node_id,
            port_name: port_name.to_string(),
        }
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node_id, self.port_name)
    }
}

#[derive(Clone, Debug)]
pub struct PortModel {
    pub name: String,
    pub direction: PortDirection,
    /// Upper bound on attached links; `None` means unbounded.
    pub max_links: Option<usize>,
    pub selected: bool,
    pub locked: bool,
    node_id: Uuid,
    position: Point,
    links: IndexSet<Uuid>,
}

impl PortModel {
    pub fn new(name: &str, direction: PortDirection) -> Self {
        Self {
            name: name.to_string(),
            direction,
            max_links: None,
            selected: false,
            locked: false,
            node_id: Uuid::nil(),
            position: Point::ZERO,
            links: IndexSet::new(),
        }
    }

    pub fn input(name: &str) -> Self {
        Self::new(name, PortDirection::Input)
    }

    pub fn output(name: &str) -> Self {
        Self::new(name, PortDirection::Output)
    }

    pub fn with_max_links(mut self, max_links: usize) -> Self {
        self.max_links = Some(max_links);
        self
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    /// The node this port belongs to.
    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    pub fn port_ref(&self) -> PortRef {
        PortRef::new(self.node_id, &self.name)
    }

    /// Current coordinates in world space.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Ids of the links terminating at this port.
    pub fn links(&self) -> &IndexSet<Uuid> {
        &self.links
    }

    pub fn has_link(&self, link_id: Uuid) -> bool {
        self.links.contains(&link_id)
    }

    pub(crate) fn attach_to(&mut self, node_id: Uuid) {
        self.node_id = node_id;
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub(crate) fn add_link(&mut self, link_id: Uuid) {
        self.links.insert(link_id);
    }

    pub(crate) fn remove_link(&mut self, link_id: Uuid) {
        self.links.shift_remove(&link_id);
    }
}
