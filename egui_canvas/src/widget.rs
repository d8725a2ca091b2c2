//! The canvas widget: routes egui input into an [`InteractionController`].

use egui::{Pos2, Sense};
use log::debug;
use uuid::Uuid;

use diagram_canvas::controller::{CanvasEvent, InteractionController, PointerEvent};
use diagram_canvas::geometry::{Point, Rect};
use diagram_canvas::host::{CanvasHost, SceneGeometry};
use diagram_canvas::model::{DiagramModel, ListenerHandle, ModelRef, PortRef};
use diagram_canvas::{CanvasConfig, CanvasError};

use crate::input::{self, to_point};

// ---------------------------------------------------------------------------
// EguiHost
// ---------------------------------------------------------------------------

/// [`CanvasHost`] for one frame: hit-testing and port anchors come from the
/// application's renderer, repaints go to the egui context.
pub struct EguiHost<'a> {
    scene: &'a dyn SceneGeometry,
    canvas: egui::Rect,
    ctx: egui::Context,
    invalidated: Vec<Uuid>,
}

impl<'a> EguiHost<'a> {
    pub fn new(scene: &'a dyn SceneGeometry, canvas: egui::Rect, ctx: egui::Context) -> Self {
        Self {
            scene,
            canvas,
            ctx,
            invalidated: Vec::new(),
        }
    }

    pub fn take_invalidated(&mut self) -> Vec<Uuid> {
        std::mem::take(&mut self.invalidated)
    }
}

impl SceneGeometry for EguiHost<'_> {
    fn element_at(&self, model: &DiagramModel, canvas_point: Point) -> Option<ModelRef> {
        self.scene.element_at(model, canvas_point)
    }

    fn port_position(&self, model: &DiagramModel, port: &PortRef) -> Option<Point> {
        self.scene.port_position(model, port)
    }
}

impl CanvasHost for EguiHost<'_> {
    fn viewport(&self) -> Rect {
        Rect::from_two_points(to_point(self.canvas.min), to_point(self.canvas.max))
    }

    fn request_repaint(&mut self) {
        self.ctx.request_repaint();
    }

    fn invalidate_link(&mut self, link_id: Uuid) {
        self.invalidated.push(link_id);
    }
}

// ---------------------------------------------------------------------------
// DiagramCanvas
// ---------------------------------------------------------------------------

/// Owns the controller and the model subscription for one mounted canvas.
pub struct DiagramCanvas {
    controller: InteractionController,
    subscription: Option<ListenerHandle>,
    invalidated: Vec<Uuid>,
}

impl DiagramCanvas {
    pub fn new(config: CanvasConfig) -> Self {
        Self::with_controller(InteractionController::new(config))
    }

    pub fn with_controller(controller: InteractionController) -> Self {
        Self {
            controller,
            subscription: None,
            invalidated: Vec::new(),
        }
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Apply the config to `model` and repaint on every model change until
    /// [`unmount`](Self::unmount).
    pub fn mount(&mut self, model: &mut DiagramModel, ctx: &egui::Context) {
        if self.subscription.is_some() {
            return;
        }
        self.controller.config().apply_to(model);
        let ctx = ctx.clone();
        self.subscription = Some(model.subscribe(move |_| ctx.request_repaint()));
        debug!("Mounted canvas on diagram {}", model.id);
    }

    /// Drop the model subscription and any gesture still in progress.
    pub fn unmount(&mut self, model: &mut DiagramModel) {
        if self.controller.cancel() {
            debug!("Unmounted during a gesture");
        }
        if let Some(handle) = self.subscription.take() {
            model.unsubscribe(handle);
        }
    }

    /// Links whose drop handling changed them since the last call; the
    /// renderer drops its cached state for these.
    pub fn take_invalidated(&mut self) -> Vec<Uuid> {
        std::mem::take(&mut self.invalidated)
    }

    /// Allocate the remaining space of `ui` as the canvas and feed this
    /// frame's input to the controller. Drawing is left to the caller.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        model: &mut DiagramModel,
        scene: &dyn SceneGeometry,
    ) -> Result<egui::Response, CanvasError> {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let (events, latest_pos, escape) = ui.input(|i| {
            (
                i.events.clone(),
                i.pointer.latest_pos(),
                i.key_pressed(egui::Key::Escape),
            )
        });
        let wants_keyboard = ui.ctx().wants_keyboard_input();
        let mut host = EguiHost::new(scene, rect, ui.ctx().clone());

        if escape && self.controller.cancel() {
            host.request_repaint();
        }

        let mut pointer = latest_pos.unwrap_or(rect.center());
        for event in &events {
            if let egui::Event::PointerMoved(pos) = event {
                pointer = *pos;
            }
            let Some(canvas_event) = input::translate_event(event, pointer) else {
                continue;
            };
            if !self.accepts(&canvas_event, rect, response.hovered(), wants_keyboard) {
                continue;
            }
            self.controller.handle(model, &mut host, canvas_event)?;
        }

        if response.double_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let event = CanvasEvent::DoubleClick(PointerEvent::new(to_point(pos)));
                self.controller.handle(model, &mut host, event)?;
            }
        }

        self.invalidated.extend(host.take_invalidated());
        Ok(response)
    }

    /// Presses start only inside the canvas; moves and releases are taken
    /// from anywhere while a gesture is active.
    fn accepts(
        &self,
        event: &CanvasEvent,
        rect: egui::Rect,
        hovered: bool,
        wants_keyboard: bool,
    ) -> bool {
        let inside = |p: Point| rect.contains(Pos2::new(p.x as f32, p.y as f32));
        match event {
            CanvasEvent::PointerDown(e) | CanvasEvent::DoubleClick(e) => inside(e.position),
            CanvasEvent::PointerMove(_) | CanvasEvent::PointerUp(_) => {
                self.controller.is_gesture_active()
            }
            CanvasEvent::Wheel(_) => hovered,
            CanvasEvent::KeyUp(_) => !wants_keyboard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyScene;

    impl SceneGeometry for EmptyScene {
        fn element_at(&self, _model: &DiagramModel, _canvas_point: Point) -> Option<ModelRef> {
            None
        }

        fn port_position(&self, _model: &DiagramModel, _port: &PortRef) -> Option<Point> {
            None
        }
    }

    #[test]
    fn mount_applies_config_and_unmount_releases() {
        let ctx = egui::Context::default();
        let mut model = DiagramModel::new();
        let mut canvas = DiagramCanvas::new(CanvasConfig {
            grid_size: 20.0,
            ..CanvasConfig::default()
        });
        canvas.mount(&mut model, &ctx);
        assert!(canvas.is_mounted());
        assert_eq!(model.grid_size(), 20.0);

        canvas.unmount(&mut model);
        assert!(!canvas.is_mounted());
        // a second unmount is harmless
        canvas.unmount(&mut model);
    }

    #[test]
    fn host_reports_canvas_rect_and_collects_invalidations() {
        let scene = EmptyScene;
        let canvas = egui::Rect::from_min_max(Pos2::new(10.0, 20.0), Pos2::new(410.0, 320.0));
        let mut host = EguiHost::new(&scene, canvas, egui::Context::default());
        let viewport = host.viewport();
        assert_eq!(viewport.min, Point::new(10.0, 20.0));
        assert_eq!(viewport.width(), 400.0);
        assert_eq!(viewport.height(), 300.0);

        let id = Uuid::new_v4();
        host.invalidate_link(id);
        assert_eq!(host.take_invalidated(), vec![id]);
        assert!(host.take_invalidated().is_empty());
    }

    #[test]
    fn presses_outside_the_canvas_are_ignored() {
        let canvas = DiagramCanvas::new(CanvasConfig::default());
        let rect = egui::Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(100.0, 100.0));
        let inside = CanvasEvent::PointerDown(PointerEvent::new(Point::new(50.0, 50.0)));
        let outside = CanvasEvent::PointerDown(PointerEvent::new(Point::new(150.0, 50.0)));
        let moved = CanvasEvent::PointerMove(PointerEvent::new(Point::new(150.0, 50.0)));
        assert!(canvas.accepts(&inside, rect, false, false));
        assert!(!canvas.accepts(&outside, rect, true, false));
        // no gesture yet
        assert!(!canvas.accepts(&moved, rect, true, false));
    }
}
