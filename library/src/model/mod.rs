//! The diagram graph: nodes own ports, links own points, the diagram owns
//! both nodes and links.

pub mod diagram;
pub mod link;
pub mod node;
pub mod point;
pub mod port;

use uuid::Uuid;

pub use diagram::{DiagramModel, ListenerHandle, ModelEvent, DEFAULT_ZOOM_LEVEL, MIN_ZOOM_LEVEL};
pub use link::LinkModel;
pub use node::NodeModel;
pub use point::PointModel;
pub use port::{PortDirection, PortModel, PortRef};

/// Handle to any entity of a [`DiagramModel`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelRef {
    Node(Uuid),
    Port(PortRef),
    Link(Uuid),
    Point(Uuid),
}

impl ModelRef {
    /// Hit-testing precedence: port > point > link > node.
    pub fn hit_priority(&self) -> u8 {
        match self {
            ModelRef::Port(_) => 3,
            ModelRef::Point(_) => 2,
            ModelRef::Link(_) => 1,
            ModelRef::Node(_) => 0,
        }
    }

    /// Pick the most specific entity among overlapping candidates. Ties
    /// keep the first candidate.
    pub fn topmost<I>(candidates: I) -> Option<ModelRef>
    where
        I: IntoIterator<Item = ModelRef>,
    {
        let mut best: Option<ModelRef> = None;
        for candidate in candidates {
            let better = best
                .as_ref()
                .is_none_or(|b| candidate.hit_priority() > b.hit_priority());
            if better {
                best = Some(candidate);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topmost_prefers_ports_over_points_links_nodes() {
        let node = ModelRef::Node(Uuid::new_v4());
        let link = ModelRef::Link(Uuid::new_v4());
        let point = ModelRef::Point(Uuid::new_v4());
        let port = ModelRef::Port(PortRef::new(Uuid::new_v4(), "p"));

        assert_eq!(
            ModelRef::topmost([node.clone(), link.clone(), port.clone(), point.clone()]),
            Some(port)
        );
        assert_eq!(
            ModelRef::topmost([node.clone(), point.clone(), link.clone()]),
            Some(point)
        );
        assert_eq!(ModelRef::topmost([node.clone(), link.clone()]), Some(link));
        assert_eq!(ModelRef::topmost([node.clone()]), Some(node));
        assert_eq!(ModelRef::topmost(Vec::new()), None);
    }
}
