//! Per-entity gravity ramp and velocity cap
//!
//! Dynamic bodies do not rely on the solver's constant gravity alone. Each
//! pre-step, an airborne body's accumulated gravity strength grows by a fixed
//! increment (up to a ceiling) and is added to its vertical velocity, so falls
//! accelerate the longer they last. Landing resets the strength to a single
//! increment, which keeps a resting body pressed into its support.

use crate::config::{GravityConfig, VelocityCapConfig};
use crate::math::Vec2;

/// Next accumulated gravity strength.
pub fn ramp_gravity(current: f32, grounded: bool, config: &GravityConfig) -> f32 {
    if grounded {
        config.increment
    } else {
        (current + config.increment).min(config.max)
    }
}

/// Apply the velocity cap to `next`, where `previous` is the velocity before
/// this tick's acceleration.
pub fn cap_velocity(previous: Vec2, next: Vec2, config: &VelocityCapConfig) -> Vec2 {
    if !config.enabled {
        return next;
    }
    Vec2::new(
        cap_component(previous.x, next.x, config.max_x, config.soft),
        cap_component(previous.y, next.y, config.max_y, config.soft),
    )
}

fn cap_component(previous: f32, next: f32, max: f32, soft: bool) -> f32 {
    // a soft cap lets an already-fast body keep its speed, but never gain more
    let limit = if soft { max.max(previous.abs()) } else { max };
    next.clamp(-limit, limit)
}
