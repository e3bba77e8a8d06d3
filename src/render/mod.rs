//! Rendering collaborator
//!
//! The engine draws entities as rectangles (plus optional hitbox outlines)
//! through the `Canvas` trait; it owns no other rendering logic.

pub mod canvas;
pub mod draw_rect;
pub mod window;

pub use canvas::{Canvas, DrawCall, HeadlessCanvas, View, WindowEvent};
pub use draw_rect::{closed_outline, DrawRect, RenderStates};
pub use window::MacroquadCanvas;
