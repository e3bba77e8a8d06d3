//! 2D vector helpers
//!
//! Gameplay code works in macroquad's `Vec2` everywhere. The physics world
//! speaks nalgebra, so the conversions live here and nowhere else.

pub use macroquad::math::Vec2;
use rapier2d::na::{Point2, Vector2};

pub fn vec2_to_na(v: Vec2) -> Vector2<f32> {
    Vector2::new(v.x, v.y)
}

pub fn na_to_vec2(v: &Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

pub fn vec2_to_point(v: Vec2) -> Point2<f32> {
    Point2::new(v.x, v.y)
}

/// Component-wise comparison with an absolute tolerance.
pub fn approx_eq(a: Vec2, b: Vec2, epsilon: f32) -> bool {
    (a.x - b.x).abs() <= epsilon && (a.y - b.y).abs() <= epsilon
}

/// Serde adapter writing a `Vec2` as `{ x, y }`.
///
/// Use with `#[serde(with = "crate::math::serde_vec2")]`.
pub mod serde_vec2 {
    use super::Vec2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Xy {
        x: f32,
        y: f32,
    }

    pub fn serialize<S: Serializer>(v: &Vec2, serializer: S) -> Result<S::Ok, S::Error> {
        Xy { x: v.x, y: v.y }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec2, D::Error> {
        let xy = Xy::deserialize(deserializer)?;
        Ok(Vec2::new(xy.x, xy.y))
    }
}
