//! macroquad-backed canvas
//!
//! macroquad presents frames from the async main loop (`next_frame().await`),
//! so `display` only counts frames here. Closing the window is intercepted
//! with `prevent_quit` and surfaced as `WindowEvent::Closed`, which lets the
//! engine finish the frame it is in.

use macroquad::color::Color;
use macroquad::input::{is_quit_requested, mouse_position, prevent_quit};
use macroquad::shapes::{draw_line, draw_triangle};
use macroquad::window::clear_background;

use crate::math::Vec2;

use super::canvas::{Canvas, View, WindowEvent};
use super::draw_rect::{DrawRect, RenderStates};

const OUTLINE_THICKNESS: f32 = 1.0;

pub struct MacroquadCanvas {
    view: View,
    last_mouse: Vec2,
    frames: u64,
}

impl MacroquadCanvas {
    /// Must be called from inside the macroquad main.
    pub fn new() -> Self {
        prevent_quit();
        let (x, y) = mouse_position();
        Self {
            view: View::default(),
            last_mouse: Vec2::new(x, y),
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn to_screen(&self, world: Vec2, states: &RenderStates) -> Vec2 {
        self.view.coords_to_pixel(states.apply(world))
    }
}

impl Canvas for MacroquadCanvas {
    fn clear(&mut self, color: Color) {
        clear_background(color);
    }

    fn draw_rect(&mut self, rect: &DrawRect, states: &RenderStates) {
        let [a, b, c, d] = (*rect.vertices()).map(|v| self.to_screen(v, states));
        draw_triangle(a, b, c, states.color);
        draw_triangle(b, d, c, states.color);
    }

    fn draw_outline(&mut self, points: &[Vec2], states: &RenderStates) {
        for pair in points.windows(2) {
            let from = self.to_screen(pair[0], states);
            let to = self.to_screen(pair[1], states);
            draw_line(from.x, from.y, to.x, to.y, OUTLINE_THICKNESS, states.color);
        }
    }

    fn display(&mut self) {
        self.frames += 1;
    }

    fn poll_events(&mut self) -> Vec<WindowEvent> {
        let mut events = Vec::new();
        if is_quit_requested() {
            events.push(WindowEvent::Closed);
        }
        let (x, y) = mouse_position();
        let mouse = Vec2::new(x, y);
        if mouse != self.last_mouse {
            self.last_mouse = mouse;
            events.push(WindowEvent::MouseMoved(mouse));
        }
        events
    }

    fn view(&self) -> View {
        self.view
    }

    fn set_view(&mut self, view: View) {
        self.view = view;
    }
}
