//! Entities and their lifecycle
//!
//! Key concepts:
//! - `EntityRef`: generational handle, the only way to name an entity
//! - `EntityDef`: what to build (graphic-only or physical)
//! - `EntityRegistry`: the sole owner of live entities, run around each physics step
//! - `CommandQueue`: registry mutations requested while the registry is busy

pub mod def;
pub mod entity;
pub mod event;
pub mod registry;
pub mod storage;

pub use def::{BodyType, EntityDef, EntityKind, GraphicDef, PhysicalDef};
pub use entity::EntityRef;
pub use event::{Command, CommandQueue, EventQueue};
pub use registry::{CommandOutcome, Entity, EntityRegistry, FixtureShape, PhysicalPart};
