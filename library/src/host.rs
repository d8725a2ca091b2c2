//! Trait definitions for the collaborators the interaction core relies on.
//!
//! The rendering side of an application implements [`SceneGeometry`] and
//! [`CanvasHost`]; applications interested in gesture lifecycles implement
//! [`ActionObserver`].

use uuid::Uuid;

use crate::action::Action;
use crate::geometry::{Point, Rect};
use crate::model::{DiagramModel, ModelRef, PortRef};

/// Geometry that only the renderer knows.
pub trait SceneGeometry {
    /// The most specific interactive entity under a canvas-relative screen
    /// point (port > point > link > node), or `None` for empty canvas.
    fn element_at(&self, model: &DiagramModel, canvas_point: Point) -> Option<ModelRef>;

    /// Current world coordinates of a port's anchor. Called after the
    /// port's node has moved; `None` leaves the stored coordinates as is.
    fn port_position(&self, model: &DiagramModel, port: &PortRef) -> Option<Point>;
}

pub trait CanvasHost: SceneGeometry {
    /// The canvas area in absolute screen coordinates.
    fn viewport(&self) -> Rect;

    /// Schedule a redraw. May be called many times per gesture.
    fn request_repaint(&mut self);

    /// A link's geometry changed at the end of a gesture; renderers caching
    /// "already drawn" state for it should drop that entry.
    fn invalidate_link(&mut self, link_id: Uuid) {
        let _ = link_id;
    }
}

/// Gesture lifecycle hooks.
pub trait ActionObserver {
    /// Returning `false` keeps the action from being stored; whatever the
    /// pointer-down already changed stays applied.
    fn action_started(&mut self, action: &Action) -> bool {
        let _ = action;
        true
    }

    /// Fired on every pointer move while an action is active.
    fn action_updated(&mut self, action: &Action) {
        let _ = action;
    }

    fn action_stopped(&mut self, action: &Action) {
        let _ = action;
    }
}
