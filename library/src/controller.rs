//! Pointer, wheel and keyboard handling for a diagram canvas.
//!
//! The controller turns raw input events into [`Action`]s and model
//! mutations. It never draws: hit-testing, port anchors and repaint
//! scheduling go through the [`CanvasHost`] passed to every handler.

use indexmap::IndexSet;
use log::{debug, warn};
use uuid::Uuid;

use crate::action::{self, Action, MoveCanvasAction, MoveItemsAction, SelectingAction};
use crate::config::CanvasConfig;
use crate::error::CanvasError;
use crate::geometry::Point;
use crate::host::{ActionObserver, CanvasHost};
use crate::model::{DiagramModel, ModelRef, MIN_ZOOM_LEVEL};
use crate::protocol::{self, DefaultLinkPolicy, DropOutcome, LinkPolicy};

/// Divisor for ctrl-wheel events with fractional deltas (trackpad pinch).
const PINCH_DIVISOR: f64 = 3.0;
/// Divisor for regular wheel steps.
const WHEEL_DIVISOR: f64 = 60.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

/// A pointer event in absolute screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(position: Point) -> Self {
        Self {
            position,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }
}

/// Wheel input using the browser convention: positive `delta_y` scrolls
/// down, one wheel notch is usually 100-120 pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelEvent {
    pub position: Point,
    pub delta_y: f64,
    pub modifiers: Modifiers,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CanvasEvent {
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    DoubleClick(PointerEvent),
    Wheel(WheelEvent),
    KeyUp(KeyEvent),
}

/// Move/up routing that only exists for the duration of a gesture.
#[derive(Debug, Default)]
struct GestureListeners {
    attached: bool,
}

impl GestureListeners {
    fn attach(&mut self) {
        self.attached = true;
    }

    /// Returns whether the listeners were attached.
    fn detach(&mut self) -> bool {
        std::mem::replace(&mut self.attached, false)
    }
}

pub struct InteractionController {
    config: CanvasConfig,
    policy: Box<dyn LinkPolicy>,
    observer: Option<Box<dyn ActionObserver>>,
    action: Action,
    listeners: GestureListeners,
}

impl std::fmt::Debug for InteractionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionController")
            .field("config", &self.config)
            .field("action", &self.action)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl InteractionController {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            config,
            policy: Box::new(DefaultLinkPolicy),
            observer: None,
            action: Action::Idle,
            listeners: GestureListeners::default(),
        }
    }

    pub fn with_policy(mut self, policy: impl LinkPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn with_observer(mut self, observer: impl ActionObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn is_gesture_active(&self) -> bool {
        self.listeners.attached
    }

    pub fn handle(
        &mut self,
        model: &mut DiagramModel,
        host: &mut dyn CanvasHost,
        event: CanvasEvent,
    ) -> Result<(), CanvasError> {
        match event {
            CanvasEvent::PointerDown(e) => self.pointer_down(model, host, e),
            CanvasEvent::PointerMove(e) => self.pointer_move(model, host, e),
            CanvasEvent::PointerUp(e) => self.pointer_up(model, host, e),
            CanvasEvent::DoubleClick(e) => self.double_click(model, host, e),
            CanvasEvent::Wheel(e) => self.wheel(model, host, e),
            CanvasEvent::KeyUp(e) => self.key_up(model, host, e),
        }
    }

    pub fn pointer_down(
        &mut self,
        model: &mut DiagramModel,
        host: &mut dyn CanvasHost,
        event: PointerEvent,
    ) -> Result<(), CanvasError> {
        if !self.action.is_idle() || self.listeners.attached {
            warn!(
                "Pointer down during an unfinished {} gesture, resetting",
                self.action.name()
            );
            self.action = Action::Idle;
            self.listeners.detach();
        }

        self.sync_grid(model);
        let canvas_point = event.position - host.viewport().min;
        let action = match host.element_at(model, canvas_point) {
            None if event.modifiers.shift => {
                Some(Action::Selecting(SelectingAction::new(canvas_point)))
            }
            None => {
                model.clear_selection(None);
                Some(Action::MoveCanvas(MoveCanvasAction {
                    anchor: event.position,
                    initial_offset: model.offset(),
                }))
            }
            Some(ModelRef::Port(port)) => {
                if model.is_locked(&ModelRef::Port(port.clone())) {
                    model.clear_selection(None);
                    None
                } else {
                    if let Some(position) = host.port_position(model, &port) {
                        model.set_port_position(&port, position)?;
                    }
                    let link_id = protocol::create_link(model, &port)?;
                    let end = model
                        .link(link_id)?
                        .last_point()
                        .map(|p| p.id)
                        .ok_or(CanvasError::LinkNotFound(link_id))?;
                    model.clear_selection(None);
                    model.set_selected(&ModelRef::Point(end), true)?;
                    debug!("Dragging new link {} from {}", link_id, port);
                    Some(Action::MoveItems(MoveItemsAction::capture(
                        model,
                        event.position,
                    )))
                }
            }
            Some(entity) => {
                if !event.modifiers.shift && !model.is_selected(&entity)? {
                    model.clear_selection(Some(&entity));
                }
                model.set_selected(&entity, true)?;
                Some(Action::MoveItems(MoveItemsAction::capture(
                    model,
                    event.position,
                )))
            }
        };

        self.listeners.attach();
        if let Some(action) = action {
            self.start_action(action);
        }
        host.request_repaint();
        Ok(())
    }

    pub fn pointer_move(
        &mut self,
        model: &mut DiagramModel,
        host: &mut dyn CanvasHost,
        event: PointerEvent,
    ) -> Result<(), CanvasError> {
        if !self.listeners.attached {
            return Ok(());
        }
        let origin = host.viewport().min;
        match &mut self.action {
            Action::Idle => return Ok(()),
            Action::Selecting(selecting) => {
                action::update_selection(selecting, model, event.position - origin)?
            }
            Action::MoveItems(moving) => {
                action::move_items(moving, model, &*host, event.position)?
            }
            Action::MoveCanvas(panning) => action::move_canvas(
                panning,
                model,
                event.position,
                self.config.allow_canvas_translation,
            ),
        }
        if let Some(observer) = self.observer.as_mut() {
            observer.action_updated(&self.action);
        }
        host.request_repaint();
        Ok(())
    }

    pub fn pointer_up(
        &mut self,
        model: &mut DiagramModel,
        host: &mut dyn CanvasHost,
        event: PointerEvent,
    ) -> Result<(), CanvasError> {
        if !self.listeners.detach() {
            return Ok(());
        }
        let action = std::mem::take(&mut self.action);
        let result = match &action {
            Action::MoveItems(moving) => self.finish_move(model, host, moving, event),
            _ => Ok(()),
        };
        self.stop_action(&action);
        host.request_repaint();
        result
    }

    /// Abandon the current gesture without running any drop handling.
    /// Returns whether a gesture was in progress.
    pub fn cancel(&mut self) -> bool {
        let was_attached = self.listeners.detach();
        let action = std::mem::take(&mut self.action);
        if !action.is_idle() {
            debug!("Cancelled {}", action.name());
            self.stop_action(&action);
        }
        was_attached
    }

    /// Zoom around the cursor.
    pub fn wheel(
        &mut self,
        model: &mut DiagramModel,
        host: &mut dyn CanvasHost,
        event: WheelEvent,
    ) -> Result<(), CanvasError> {
        if !self.config.allow_canvas_zoom {
            return Ok(());
        }
        let mut delta = if self.config.inverse_zoom {
            -event.delta_y
        } else {
            event.delta_y
        };
        if event.modifiers.ctrl && delta % 1.0 != 0.0 {
            delta /= PINCH_DIVISOR;
        } else {
            delta /= WHEEL_DIVISOR;
        }

        let zoom = model.zoom_level() + delta;
        if zoom <= MIN_ZOOM_LEVEL {
            return Ok(());
        }
        let old_factor = model.zoom_factor();
        model.set_zoom_level(zoom);
        let new_factor = model.zoom_factor();

        // keep the world point under the cursor in place
        let viewport = host.viewport();
        let cursor = event.position - viewport.min;
        let offset = model.offset();
        let shift = |cursor: f64, offset: f64, size: f64| {
            if size <= 0.0 {
                return 0.0;
            }
            let size_diff = size * new_factor - size * old_factor;
            size_diff * ((cursor - offset) / old_factor / size)
        };
        model.set_offset(Point::new(
            offset.x - shift(cursor.x, offset.x, viewport.width()),
            offset.y - shift(cursor.y, offset.y, viewport.height()),
        ));
        host.request_repaint();
        Ok(())
    }

    /// Delete every unlocked selected item when a delete key is released.
    pub fn key_up(
        &mut self,
        model: &mut DiagramModel,
        host: &mut dyn CanvasHost,
        event: KeyEvent,
    ) -> Result<(), CanvasError> {
        if !self.config.is_delete_key(event.key_code) {
            return Ok(());
        }
        // Earlier removals may take later items with them; those read as locked.
        for entity in model.selected_items() {
            if model.is_locked(&entity) {
                continue;
            }
            model.remove(&entity)?;
        }
        host.request_repaint();
        Ok(())
    }

    /// Insert a waypoint into the link under the pointer and select it.
    pub fn double_click(
        &mut self,
        model: &mut DiagramModel,
        host: &mut dyn CanvasHost,
        event: PointerEvent,
    ) -> Result<(), CanvasError> {
        let canvas_point = event.position - host.viewport().min;
        let Some(ModelRef::Link(link_id)) = host.element_at(model, canvas_point) else {
            return Ok(());
        };
        if model.is_locked(&ModelRef::Link(link_id)) {
            return Ok(());
        }
        self.sync_grid(model);
        let world = model.grid_point(model.to_world(canvas_point));
        let Some(point_id) =
            protocol::insert_link_point(model, link_id, world, self.config.max_points_per_link)?
        else {
            debug!("Link {} is at its point limit", link_id);
            return Ok(());
        };
        model.clear_selection(None);
        model.set_selected(&ModelRef::Point(point_id), true)?;
        host.request_repaint();
        Ok(())
    }

    /// Snapping reads the model's grid; keep it on the configured size.
    fn sync_grid(&self, model: &mut DiagramModel) {
        if model.grid_size() != self.config.grid_size {
            self.config.apply_to(model);
        }
    }

    fn start_action(&mut self, action: Action) {
        let allowed = self
            .observer
            .as_mut()
            .is_none_or(|observer| observer.action_started(&action));
        if allowed {
            debug!("Started {}", action.name());
            self.action = action;
        } else {
            debug!("Observer vetoed {}", action.name());
        }
    }

    fn stop_action(&mut self, action: &Action) {
        let unmoved = matches!(action, Action::MoveItems(m) if !m.moved);
        if action.is_idle() || unmoved {
            return;
        }
        debug!("Stopped {}", action.name());
        if let Some(observer) = self.observer.as_mut() {
            observer.action_stopped(action);
        }
    }

    /// Drop handling for moved points, then loose and invalid link cleanup.
    fn finish_move(
        &self,
        model: &mut DiagramModel,
        host: &mut dyn CanvasHost,
        moving: &MoveItemsAction,
        event: PointerEvent,
    ) -> Result<(), CanvasError> {
        let canvas_point = event.position - host.viewport().min;
        let drop_port = match host.element_at(model, canvas_point) {
            Some(ModelRef::Port(port)) if !model.is_locked(&ModelRef::Port(port.clone())) => {
                Some(port)
            }
            _ => None,
        };

        let mut touched: IndexSet<Uuid> = IndexSet::new();
        for point_id in moving.point_ids() {
            // an earlier trim may have removed it
            let Ok(link) = model.link_of_point(point_id) else {
                continue;
            };
            let link_id = link.id();
            touched.insert(link_id);
            if link.is_point_connected(point_id) {
                continue;
            }
            let Some(port) = &drop_port else {
                continue;
            };
            let outcome = protocol::connect_dropped_point(model, link_id, point_id, port)?;
            debug!("Dropped point {} on {}: {:?}", point_id, port, outcome);
            if let DropOutcome::Split(new_id) = outcome {
                touched.insert(new_id);
            }
            host.invalidate_link(link_id);
        }

        if !self.config.allow_loose_links && moving.moved {
            for link_id in &touched {
                let loose = model.link(*link_id).is_ok_and(|l| !l.is_complete());
                if loose {
                    debug!("Removing loose link {}", link_id);
                    model.remove_link(*link_id)?;
                }
            }
        }

        for link_id in &touched {
            let Ok(link) = model.link(*link_id) else {
                continue;
            };
            let (Some(source), Some(target)) = (link.source().cloned(), link.target().cloned())
            else {
                continue;
            };
            if protocol::can_link_to_port(model, self.policy.as_ref(), &source, &target, Some(*link_id)) {
                model.sync_link_ends(*link_id)?;
            } else {
                debug!("Removing invalid link {} ({} -> {})", link_id, source, target);
                model.remove_link(*link_id)?;
            }
        }
        Ok(())
    }
}
