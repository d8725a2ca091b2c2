//! Translation from egui input events to canvas events.

use diagram_canvas::controller::{CanvasEvent, KeyEvent, Modifiers, PointerEvent, WheelEvent};
use diagram_canvas::geometry::Point;
use egui::{Key, MouseWheelUnit, Pos2};

/// Pixels per wheel line, matching what browsers report for one notch.
const PIXELS_PER_LINE: f64 = 40.0;
const PIXELS_PER_PAGE: f64 = 800.0;
/// Wheel pixels per unit of pinch zoom factor.
const PINCH_SCALE: f64 = 100.0;

pub fn to_point(pos: Pos2) -> Point {
    Point::new(pos.x as f64, pos.y as f64)
}

pub fn to_modifiers(modifiers: &egui::Modifiers) -> Modifiers {
    Modifiers {
        shift: modifiers.shift,
        ctrl: modifiers.ctrl || modifiers.command,
    }
}

/// Convert one egui event. `pointer` is the latest known pointer position,
/// used for events that carry none (wheel, pinch).
///
/// Only the primary button drives gestures. Keys are reported on release.
pub fn translate_event(event: &egui::Event, pointer: Pos2) -> Option<CanvasEvent> {
    match event {
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers,
            ..
        } => {
            let pointer_event = PointerEvent {
                position: to_point(*pos),
                modifiers: to_modifiers(modifiers),
            };
            Some(if *pressed {
                CanvasEvent::PointerDown(pointer_event)
            } else {
                CanvasEvent::PointerUp(pointer_event)
            })
        }
        egui::Event::PointerMoved(pos) => Some(CanvasEvent::PointerMove(PointerEvent::new(
            to_point(*pos),
        ))),
        egui::Event::MouseWheel {
            unit,
            delta,
            modifiers,
            ..
        } => {
            let delta_y = wheel_pixels(*unit, delta.y as f64);
            if delta_y == 0.0 {
                return None;
            }
            Some(CanvasEvent::Wheel(WheelEvent {
                position: to_point(pointer),
                delta_y,
                modifiers: to_modifiers(modifiers),
            }))
        }
        egui::Event::Zoom(factor) => pinch_to_wheel(*factor as f64, pointer),
        egui::Event::Key {
            key,
            pressed: false,
            ..
        } => key_code(*key).map(|key_code| CanvasEvent::KeyUp(KeyEvent { key_code })),
        _ => None,
    }
}

/// egui reports wheel deltas with "scroll up" positive; the controller
/// expects browser-style pixels with "scroll down" positive.
pub fn wheel_pixels(unit: MouseWheelUnit, delta_y: f64) -> f64 {
    let pixels = match unit {
        MouseWheelUnit::Point => delta_y,
        MouseWheelUnit::Line => delta_y * PIXELS_PER_LINE,
        MouseWheelUnit::Page => delta_y * PIXELS_PER_PAGE,
    };
    -pixels
}

/// A pinch becomes a ctrl-wheel, the way browsers report trackpad pinches.
fn pinch_to_wheel(factor: f64, pointer: Pos2) -> Option<CanvasEvent> {
    if !factor.is_finite() || factor == 1.0 {
        return None;
    }
    Some(CanvasEvent::Wheel(WheelEvent {
        position: to_point(pointer),
        delta_y: (1.0 - factor) * PINCH_SCALE,
        modifiers: Modifiers {
            ctrl: true,
            shift: false,
        },
    }))
}

/// DOM-style key codes for the keys a canvas cares about.
pub fn key_code(key: Key) -> Option<u32> {
    let code = match key {
        Key::Backspace => 8,
        Key::Tab => 9,
        Key::Enter => 13,
        Key::Escape => 27,
        Key::Space => 32,
        Key::ArrowLeft => 37,
        Key::ArrowUp => 38,
        Key::ArrowRight => 39,
        Key::ArrowDown => 40,
        Key::Delete => 46,
        Key::A => 65,
        Key::C => 67,
        Key::V => 86,
        Key::X => 88,
        Key::Z => 90,
        _ => return None,
    };
    Some(code)
}
