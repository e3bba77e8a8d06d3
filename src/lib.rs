//! scaffold2d: a thin 2D game-engine scaffold
//!
//! Entities live in a registry; physical ones own a rapier2d body whose
//! contacts are tracked per entity (who am I touching, am I standing on
//! something). Each tick the engine ramps gravity into body velocities,
//! steps the physics world, and copies positions back for drawing with
//! macroquad. Gameplay code hooks in through a chain of controllers.
//!
//! ```no_run
//! use scaffold2d::{Engine, EngineConfig, HeadlessCanvas, PhysicalDef, Vec2};
//!
//! let mut engine = Engine::builder(EngineConfig::default())
//!     .canvas(HeadlessCanvas::new())
//!     .build()?;
//! let ctx = engine.context_mut();
//! ctx.spawn(PhysicalDef::fixed(Vec2::new(5.0, 1.0), Vec2::new(8.0, 10.0)).with_box_fixture())?;
//! ctx.spawn(PhysicalDef::dynamic(Vec2::splat(0.5), Vec2::new(8.0, 0.0)).with_box_fixture())?;
//! while engine.is_running() {
//!     engine.update()?;
//!     engine.render()?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod game;
pub mod input;
pub mod level;
pub mod math;
pub mod physics;
pub mod render;

pub use config::{EngineConfig, FixtureMaterial};
pub use controller::{Controller, ControllerNode};
pub use engine::{Engine, EngineBuilder, EngineContext};
pub use error::{ConfigError, Diagnostic, Diagnostics, EngineError, LevelError};
pub use game::{BodyType, EntityDef, EntityRef, GraphicDef, PhysicalDef};
pub use input::{InputId, InputSource, MacroquadInput, ScriptedInput};
pub use level::{load_level, parse_level, save_level, Level, LevelDef};
pub use math::Vec2;
pub use physics::{ContactBinding, ContactInfo, ContactListener, GroundingListener, PhysicsWorld};
pub use render::{Canvas, HeadlessCanvas, MacroquadCanvas};
