//! Rendering/window collaborator
//!
//! The engine never talks to a window directly. It needs a target that can
//! be cleared, drawn into, presented, and polled for a couple of events.
//! The macroquad window implements this for the binary; `HeadlessCanvas`
//! records calls for tests.

use macroquad::color::Color;

use crate::math::Vec2;

use super::draw_rect::{DrawRect, RenderStates};

/// Window events the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowEvent {
    /// The user asked to close the window
    Closed,
    /// Cursor moved, in pixels
    MouseMoved(Vec2),
}

/// Camera: what view coordinate sits at the window's top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct View {
    pub offset: Vec2,
}

impl View {
    pub fn pixel_to_coords(&self, pixel: Vec2) -> Vec2 {
        pixel + self.offset
    }

    pub fn coords_to_pixel(&self, coords: Vec2) -> Vec2 {
        coords - self.offset
    }
}

pub trait Canvas {
    fn clear(&mut self, color: Color);

    fn draw_rect(&mut self, rect: &DrawRect, states: &RenderStates);

    /// Draw a line strip through `points` (world units).
    fn draw_outline(&mut self, points: &[Vec2], states: &RenderStates);

    /// Present the frame.
    fn display(&mut self);

    /// Events since the last poll.
    fn poll_events(&mut self) -> Vec<WindowEvent>;

    fn view(&self) -> View;

    fn set_view(&mut self, view: View);

    fn translate_view(&mut self, delta: Vec2) {
        let mut view = self.view();
        view.offset += delta;
        self.set_view(view);
    }

    fn map_pixel_to_coords(&self, pixel: Vec2) -> Vec2 {
        self.view().pixel_to_coords(pixel)
    }
}

// =============================================================================
// Headless
// =============================================================================

/// Something a `HeadlessCanvas` was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear(Color),
    Rect { position: Vec2, half_size: Vec2, states: RenderStates },
    Outline { points: Vec<Vec2>, states: RenderStates },
    Display,
}

/// Canvas that records calls instead of drawing.
#[derive(Debug, Default)]
pub struct HeadlessCanvas {
    calls: Vec<DrawCall>,
    pending: Vec<WindowEvent>,
    view: View,
    frames: u64,
}

impl HeadlessCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for the next poll.
    pub fn push_event(&mut self, event: WindowEvent) {
        self.pending.push(event);
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of presented frames.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Canvas for HeadlessCanvas {
    fn clear(&mut self, color: Color) {
        self.calls.push(DrawCall::Clear(color));
    }

    fn draw_rect(&mut self, rect: &DrawRect, states: &RenderStates) {
        self.calls.push(DrawCall::Rect {
            position: rect.position(),
            half_size: rect.half_size(),
            states: *states,
        });
    }

    fn draw_outline(&mut self, points: &[Vec2], states: &RenderStates) {
        self.calls.push(DrawCall::Outline {
            points: points.to_vec(),
            states: *states,
        });
    }

    fn display(&mut self) {
        self.frames += 1;
        self.calls.push(DrawCall::Display);
    }

    fn poll_events(&mut self) -> Vec<WindowEvent> {
        std::mem::take(&mut self.pending)
    }

    fn view(&self) -> View {
        self.view
    }

    fn set_view(&mut self, view: View) {
        self.view = view;
    }
}
