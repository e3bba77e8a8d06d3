//! Physics bridge
//!
//! - `world`: the rapier world plus the body/binding lifecycle
//! - `binding`: per-body contact maps, gravity strength and grounded flag
//! - `listener`: the contact callback interface and the default grounding listener
//! - `gravity`: the per-tick gravity ramp and velocity cap
//!
//! The rapier callback adapter in `bridge` is private to this module.

pub mod binding;
mod bridge;
pub mod gravity;
pub mod listener;
pub mod world;

pub use binding::{ContactBinding, ContactBindings, ContactInfo};
pub use listener::{Contact, ContactListener, ContactScope, ContactSide, GroundingListener};
pub use world::{BodyHandles, PhysicsWorld};

pub use rapier2d::prelude::{ColliderHandle, RigidBodyHandle};
