//! Interaction core for node-link diagram canvases.
//!
//! [`model`] holds the graph (nodes, ports, links, points) together with
//! zoom, offset and selection. [`controller::InteractionController`] maps
//! pointer, wheel and key events onto that model through the gesture
//! actions in [`action`] and the connection rules in [`protocol`].
//! Rendering stays outside: a UI layer implements [`host::CanvasHost`].

pub mod action;
pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod host;
pub mod model;
pub mod protocol;

#[cfg(test)]
mod testing;

pub use action::Action;
pub use config::CanvasConfig;
pub use controller::{CanvasEvent, InteractionController, KeyEvent, Modifiers, PointerEvent, WheelEvent};
pub use error::CanvasError;
pub use geometry::{Point, Rect};
pub use host::{ActionObserver, CanvasHost, SceneGeometry};
pub use model::{DiagramModel, ModelEvent, ModelRef};
