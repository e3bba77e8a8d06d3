//! Rectangle drawable
//!
//! Every entity draws as an axis-aligned rectangle described by its centre
//! and half extents. The four corners come out in triangle-strip order
//! (top-left, top-right, bottom-left, bottom-right), so two triangles
//! `[0, 1, 2]` and `[1, 3, 2]` cover it.

use macroquad::color::{Color, RED, WHITE};

use crate::math::Vec2;

/// An entity's render-facing mirror.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRect {
    half_size: Vec2,
    position: Vec2,
    vertices: [Vec2; 4],
}

impl DrawRect {
    pub fn new(half_size: Vec2, position: Vec2) -> Self {
        let mut rect = Self {
            half_size,
            position,
            vertices: [Vec2::ZERO; 4],
        };
        rect.update_vertices();
        rect
    }

    fn update_vertices(&mut self) {
        let (p, h) = (self.position, self.half_size);
        self.vertices = [
            Vec2::new(p.x - h.x, p.y - h.y),
            Vec2::new(p.x + h.x, p.y - h.y),
            Vec2::new(p.x - h.x, p.y + h.y),
            Vec2::new(p.x + h.x, p.y + h.y),
        ];
    }

    pub fn set_half_size(&mut self, half_size: Vec2) {
        self.half_size = half_size;
        self.update_vertices();
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.update_vertices();
    }

    pub fn half_size(&self) -> Vec2 {
        self.half_size
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Corners in triangle-strip order, in world units.
    pub fn vertices(&self) -> &[Vec2; 4] {
        &self.vertices
    }
}

/// Per-entity transform and tint applied when drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStates {
    /// World units to view units
    pub scale: f32,
    pub color: Color,
}

impl RenderStates {
    pub fn scaled(scale: f32) -> Self {
        Self { scale, color: WHITE }
    }

    /// Same transform, red tint. Used for hitbox outlines.
    pub fn hitbox(&self) -> Self {
        Self { scale: self.scale, color: RED }
    }

    pub fn apply(&self, point: Vec2) -> Vec2 {
        point * self.scale
    }
}

impl Default for RenderStates {
    fn default() -> Self {
        Self::scaled(1.0)
    }
}

/// Close a polygon for line-strip drawing by repeating its first vertex.
pub fn closed_outline(vertices: &[Vec2], offset: Vec2) -> Vec<Vec2> {
    let mut points: Vec<Vec2> = vertices.iter().map(|v| *v + offset).collect();
    if let Some(first) = points.first().copied() {
        points.push(first);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertices_follow_position() {
        let mut rect = DrawRect::new(Vec2::new(2.0, 1.0), Vec2::new(10.0, 10.0));
        assert_eq!(rect.vertices()[0], Vec2::new(8.0, 9.0));
        assert_eq!(rect.vertices()[3], Vec2::new(12.0, 11.0));

        rect.set_position(Vec2::ZERO);
        assert_eq!(rect.vertices()[1], Vec2::new(2.0, -1.0));
        assert_eq!(rect.vertices()[2], Vec2::new(-2.0, 1.0));
    }

    #[test]
    fn test_half_size_update() {
        let mut rect = DrawRect::new(Vec2::ONE, Vec2::ZERO);
        rect.set_half_size(Vec2::new(3.0, 0.5));
        assert_eq!(rect.half_size(), Vec2::new(3.0, 0.5));
        assert_eq!(rect.vertices()[3], Vec2::new(3.0, 0.5));
    }

    #[test]
    fn test_closed_outline() {
        let tri = [Vec2::ZERO, Vec2::X, Vec2::Y];
        let outline = closed_outline(&tri, Vec2::new(1.0, 1.0));
        assert_eq!(outline.len(), 4);
        assert_eq!(outline[0], outline[3]);
        assert_eq!(outline[1], Vec2::new(2.0, 1.0));
        assert!(closed_outline(&[], Vec2::ZERO).is_empty());
    }

    #[test]
    fn test_render_states_scale() {
        let states = RenderStates::scaled(32.0);
        assert_eq!(states.apply(Vec2::new(1.0, 0.5)), Vec2::new(32.0, 16.0));
        assert_eq!(states.hitbox().color, RED);
    }
}
