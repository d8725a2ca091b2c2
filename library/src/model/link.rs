use uuid::Uuid;

use super::point::PointModel;
use super::port::PortRef;
use crate::geometry::Point;

/// A path of waypoints between an optional source port and an optional
/// target port. The first and last points are the link's endpoints.
#[derive(Clone, Debug)]
pub struct LinkModel {
    pub selected: bool,
    pub locked: bool,
    id: Uuid,
    points: Vec<PointModel>,
    source: Option<PortRef>,
    target: Option<PortRef>,
}

impl Default for LinkModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkModel {
    /// A dangling link with two points at the origin.
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            selected: false,
            locked: false,
            id,
            points: vec![
                PointModel::new(id, Point::ZERO),
                PointModel::new(id, Point::ZERO),
            ],
            source: None,
            target: None,
        }
    }

    pub fn with_ports(mut self, source: Option<PortRef>, target: Option<PortRef>) -> Self {
        self.source = source;
        self.target = target;
        self
    }

    /// Replace all points with fresh ones at `positions`, in order.
    pub fn with_points(mut self, positions: &[Point]) -> Self {
        self.points = positions
            .iter()
            .map(|p| PointModel::new(self.id, *p))
            .collect();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> Option<&PortRef> {
        self.source.as_ref()
    }

    pub fn target(&self) -> Option<&PortRef> {
        self.target.as_ref()
    }

    /// Both ends resolve to a port.
    pub fn is_complete(&self) -> bool {
        self.source.is_some() && self.target.is_some()
    }

    /// Whether this link joins `a` and `b`, in either direction.
    pub fn connects(&self, a: &PortRef, b: &PortRef) -> bool {
        match (&self.source, &self.target) {
            (Some(s), Some(t)) => (s == a && t == b) || (s == b && t == a),
            _ => false,
        }
    }

    pub fn touches(&self, port: &PortRef) -> bool {
        self.source.as_ref() == Some(port) || self.target.as_ref() == Some(port)
    }

    pub fn points(&self) -> &[PointModel] {
        &self.points
    }

    pub fn positions(&self) -> impl Iterator<Item = Point> + '_ {
        self.points.iter().map(|p| p.position)
    }

    pub fn first_point(&self) -> Option<&PointModel> {
        self.points.first()
    }

    pub fn last_point(&self) -> Option<&PointModel> {
        self.points.last()
    }

    pub fn point(&self, point_id: Uuid) -> Option<&PointModel> {
        self.points.iter().find(|p| p.id == point_id)
    }

    pub fn point_mut(&mut self, point_id: Uuid) -> Option<&mut PointModel> {
        self.points.iter_mut().find(|p| p.id == point_id)
    }

    pub fn point_index(&self, point_id: Uuid) -> Option<usize> {
        self.points.iter().position(|p| p.id == point_id)
    }

    /// The port a point is attached to: the source for the first point, the
    /// target for the last one.
    pub fn port_for_point(&self, point_id: Uuid) -> Option<&PortRef> {
        let index = self.point_index(point_id)?;
        if index == 0 && self.source.is_some() {
            return self.source.as_ref();
        }
        if index + 1 == self.points.len() {
            return self.target.as_ref();
        }
        None
    }

    pub fn is_point_connected(&self, point_id: Uuid) -> bool {
        self.port_for_point(point_id).is_some()
    }

    /// The endpoint attached to `port`, if any.
    pub fn point_for_port(&self, port: &PortRef) -> Option<&PointModel> {
        if self.source.as_ref() == Some(port) {
            return self.first_point();
        }
        if self.target.as_ref() == Some(port) {
            return self.last_point();
        }
        None
    }

    /// Insert a new point at `index` (clamped to the end). Returns its id.
    pub fn add_point(&mut self, position: Point, index: usize) -> Uuid {
        let point = PointModel::new(self.id, position);
        let id = point.id;
        let index = index.min(self.points.len());
        self.points.insert(index, point);
        id
    }

    pub fn remove_point(&mut self, point_id: Uuid) -> Option<PointModel> {
        let index = self.point_index(point_id)?;
        Some(self.points.remove(index))
    }

    /// Drop every point preceding `point_id`. Returns false when the point
    /// is not on this link.
    pub fn remove_points_before(&mut self, point_id: Uuid) -> bool {
        match self.point_index(point_id) {
            Some(index) => {
                self.points.drain(..index);
                true
            }
            None => false,
        }
    }

    /// Drop every point following `point_id`.
    pub fn remove_points_after(&mut self, point_id: Uuid) -> bool {
        match self.point_index(point_id) {
            Some(index) => {
                self.points.truncate(index + 1);
                true
            }
            None => false,
        }
    }

    /// Keep only the two endpoints.
    pub fn remove_middle_points(&mut self) {
        if self.points.len() > 2 {
            let last = self.points.len() - 1;
            self.points.drain(1..last);
        }
    }

    pub(crate) fn set_target(&mut self, port: Option<PortRef>) {
        self.target = port;
    }

    /// Split off the points after `index`, leaving `..=index` in place.
    pub(crate) fn split_points_after(&mut self, index: usize) -> Vec<PointModel> {
        if index + 1 >= self.points.len() {
            return Vec::new();
        }
        self.points.split_off(index + 1)
    }

    /// A copy with fresh ids for the link and its points, no ports and no
    /// selection.
    pub(crate) fn detached_clone(&self) -> LinkModel {
        let mut clone = LinkModel {
            selected: false,
            locked: self.locked,
            id: Uuid::new_v4(),
            points: Vec::new(),
            source: None,
            target: None,
        };
        clone.points = self
            .points
            .iter()
            .map(|p| PointModel::new(clone.id, p.position))
            .collect();
        clone
    }

    pub(crate) fn adopt_points(&mut self, points: Vec<PointModel>) {
        for mut point in points {
            point.reparent(self.id);
            self.points.push(point);
        }
    }

    pub(crate) fn clear_points(&mut self) {
        self.points.clear();
    }

    pub(crate) fn points_mut(&mut self) -> &mut [PointModel] {
        &mut self.points
    }
}
