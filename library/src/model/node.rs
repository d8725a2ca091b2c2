use indexmap::IndexMap;
use uuid::Uuid;

use super::port::{PortModel, PortRef};
use crate::geometry::Point;

/// A diagram node. Owns its ports for its whole lifetime.
#[derive(Clone, Debug)]
pub struct NodeModel {
    pub id: Uuid,
    /// Free-form type label (e.g. "default", "filter").
    pub node_type: String,
    pub position: Point,
    pub selected: bool,
    pub locked: bool,
    ports: IndexMap<String, PortModel>,
}

impl NodeModel {
    pub fn new(node_type: &str, position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            node_type: node_type.to_string(),
            position,
            selected: false,
            locked: false,
            ports: IndexMap::new(),
        }
    }

    /// Add a port, replacing any port with the same name.
    pub fn add_port(&mut self, mut port: PortModel) -> PortRef {
        port.attach_to(self.id);
        let port_ref = port.port_ref();
        self.ports.insert(port.name.clone(), port);
        port_ref
    }

    pub fn with_port(mut self, port: PortModel) -> Self {
        self.add_port(port);
        self
    }

    pub fn port(&self, name: &str) -> Option<&PortModel> {
        self.ports.get(name)
    }

    pub fn port_mut(&mut self, name: &str) -> Option<&mut PortModel> {
        self.ports.get_mut(name)
    }

    pub fn ports(&self) -> impl Iterator<Item = &PortModel> {
        self.ports.values()
    }

    pub fn port_refs(&self) -> Vec<PortRef> {
        self.ports.values().map(PortModel::port_ref).collect()
    }

    /// Every link attached to any of this node's ports, without repeats.
    pub fn link_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = Vec::new();
        for port in self.ports.values() {
            for id in port.links() {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_port_sets_back_reference() {
        let mut node = NodeModel::new("default", Point::new(10.0, 20.0));
        let port_ref = node.add_port(PortModel::output("out"));
        assert_eq!(port_ref.node_id, node.id);
        assert_eq!(node.port("out").map(|p| p.node_id()), Some(node.id));
        assert_eq!(node.port_refs(), vec![PortRef::new(node.id, "out")]);
    }

    #[test]
    fn test_link_ids_are_deduplicated() {
        let link = Uuid::new_v4();
        let mut node = NodeModel::new("default", Point::ZERO)
            .with_port(PortModel::input("in"))
            .with_port(PortModel::output("out"));
        node.port_mut("in").unwrap().add_link(link);
        node.port_mut("out").unwrap().add_link(link);
        assert_eq!(node.link_ids(), vec![link]);
    }
}
