//! egui front end for `diagram_canvas`.
//!
//! [`DiagramCanvas`] translates egui input into controller events. The
//! application keeps drawing the diagram itself and supplies hit-testing
//! through [`diagram_canvas::SceneGeometry`].

pub mod input;
pub mod widget;

pub use widget::{DiagramCanvas, EguiHost};
