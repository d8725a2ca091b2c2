use uuid::Uuid;

use crate::geometry::Point;

/// A waypoint owned by a link.
#[derive(Clone, Debug)]
pub struct PointModel {
    pub id: Uuid,
    pub position: Point,
    pub selected: bool,
    link_id: Uuid,
}

impl PointModel {
    pub fn new(link_id: Uuid, position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            selected: false,
            link_id,
        }
    }

    /// The link owning this point.
    pub fn link_id(&self) -> Uuid {
        self.link_id
    }

    pub(crate) fn reparent(&mut self, link_id: Uuid) {
        self.link_id = link_id;
    }
}
