//! Level files
//!
//! A level is a JSON document listing graphic and physical entities:
//!
//! ```json
//! {
//!   "graphicEntities": [ { "size": {"x": 1, "y": 1}, "position": {"x": 0, "y": 0} } ],
//!   "physicalEntities": [
//!     { "size": {"x": 5, "y": 1}, "position": {"x": 8, "y": 10}, "bodyType": "static",
//!       "hitboxes": [ [ {"x": -5, "y": -1}, {"x": 5, "y": -1}, {"x": 5, "y": 1}, {"x": -5, "y": 1} ] ] }
//!   ]
//! }
//! ```
//!
//! Both sections and `hitboxes` may be left out. Any malformed record rejects
//! the whole file with an error naming the record, e.g. `physicalEntities[2]`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::FixtureMaterial;
use crate::engine::EngineContext;
use crate::error::LevelError;
use crate::game::{BodyType, EntityDef, EntityRef, GraphicDef, PhysicalDef};
use crate::math::{serde_vec2, Vec2};

const GRAPHIC_SECTION: &str = "graphicEntities";
const PHYSICAL_SECTION: &str = "physicalEntities";

// =============================================================================
// File records
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Point {
    x: f32,
    y: f32,
}

impl From<Point> for Vec2 {
    fn from(p: Point) -> Self {
        Vec2::new(p.x, p.y)
    }
}

impl From<Vec2> for Point {
    fn from(v: Vec2) -> Self {
        Point { x: v.x, y: v.y }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct GraphicRecord {
    #[serde(with = "serde_vec2")]
    size: Vec2,
    #[serde(with = "serde_vec2")]
    position: Vec2,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PhysicalRecord {
    #[serde(with = "serde_vec2")]
    size: Vec2,
    #[serde(with = "serde_vec2")]
    position: Vec2,
    body_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    hitboxes: Vec<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    material: Option<FixtureMaterial>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LevelFile {
    graphic_entities: Vec<GraphicRecord>,
    physical_entities: Vec<PhysicalRecord>,
}

// =============================================================================
// Definitions
// =============================================================================

/// Everything needed to build a level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelDef {
    pub graphic: Vec<GraphicDef>,
    pub physical: Vec<PhysicalDef>,
}

impl LevelDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.graphic.len() + self.physical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Graphic definitions first, then physical ones, each in file order.
    pub fn entities(&self) -> impl Iterator<Item = EntityDef> + '_ {
        self.graphic
            .iter()
            .cloned()
            .map(EntityDef::from)
            .chain(self.physical.iter().cloned().map(EntityDef::from))
    }

    /// Check every definition, naming the first bad one.
    pub fn validate(&self) -> Result<(), LevelError> {
        for (i, def) in self.graphic.iter().enumerate() {
            EntityDef::Graphic(def.clone()).validate(&record_name(GRAPHIC_SECTION, i))?;
        }
        for (i, def) in self.physical.iter().enumerate() {
            EntityDef::Physical(def.clone()).validate(&record_name(PHYSICAL_SECTION, i))?;
        }
        Ok(())
    }

    fn to_file(&self) -> LevelFile {
        LevelFile {
            graphic_entities: self
                .graphic
                .iter()
                .map(|def| GraphicRecord {
                    size: def.size,
                    position: def.position,
                })
                .collect(),
            physical_entities: self
                .physical
                .iter()
                .map(|def| PhysicalRecord {
                    size: def.size,
                    position: def.position,
                    body_type: def.body_type.as_str().to_string(),
                    hitboxes: def
                        .fixtures
                        .iter()
                        .map(|vertices| vertices.iter().copied().map(Point::from).collect())
                        .collect(),
                    material: def.material,
                })
                .collect(),
        }
    }
}

fn record_name(section: &str, index: usize) -> String {
    format!("{}[{}]", section, index)
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse a level from JSON text.
pub fn parse_level(json: &str) -> Result<LevelDef, LevelError> {
    let root: Value = serde_json::from_str(json)?;
    let Value::Object(mut root) = root else {
        return Err(LevelError::malformed("level", "top level must be an object"));
    };

    let mut level = LevelDef::new();

    for (i, value) in section(&mut root, GRAPHIC_SECTION)?.into_iter().enumerate() {
        let record = record_name(GRAPHIC_SECTION, i);
        let parsed: GraphicRecord = serde_json::from_value(value)
            .map_err(|e| LevelError::malformed(&record, e.to_string()))?;
        let def = GraphicDef::new(parsed.size, parsed.position);
        EntityDef::Graphic(def.clone()).validate(&record)?;
        level.graphic.push(def);
    }

    for (i, value) in section(&mut root, PHYSICAL_SECTION)?.into_iter().enumerate() {
        let record = record_name(PHYSICAL_SECTION, i);
        let parsed: PhysicalRecord = serde_json::from_value(value)
            .map_err(|e| LevelError::malformed(&record, e.to_string()))?;
        let body_type = BodyType::parse(&parsed.body_type).ok_or_else(|| LevelError::UnknownBodyType {
            record: record.clone(),
            found: parsed.body_type.clone(),
        })?;

        let def = PhysicalDef {
            size: parsed.size,
            position: parsed.position,
            body_type,
            fixtures: parsed
                .hitboxes
                .into_iter()
                .map(|hitbox| hitbox.into_iter().map(Vec2::from).collect())
                .collect(),
            material: parsed.material,
        };
        EntityDef::Physical(def.clone()).validate(&record)?;
        level.physical.push(def);
    }

    Ok(level)
}

/// Take a section out of the root object. Missing means empty.
fn section(root: &mut serde_json::Map<String, Value>, name: &str) -> Result<Vec<Value>, LevelError> {
    match root.remove(name) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(LevelError::malformed(name, "must be an array")),
    }
}

/// Load and parse a level file.
pub fn load_level<P: AsRef<Path>>(path: P) -> Result<LevelDef, LevelError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let level = parse_level(&contents)?;
    log::info!(
        "loaded level {} ({} graphic, {} physical)",
        path.display(),
        level.graphic.len(),
        level.physical.len()
    );
    Ok(level)
}

/// Serialize a level to pretty-printed JSON.
pub fn level_to_json(level: &LevelDef) -> Result<String, LevelError> {
    Ok(serde_json::to_string_pretty(&level.to_file())?)
}

/// Write a level file. The result loads back to an equal `LevelDef`.
pub fn save_level<P: AsRef<Path>>(path: P, level: &LevelDef) -> Result<(), LevelError> {
    let path = path.as_ref();
    fs::write(path, level_to_json(level)?)?;
    log::info!("saved level {} ({} entities)", path.display(), level.len());
    Ok(())
}

// =============================================================================
// Live levels
// =============================================================================

/// Entities created from a `LevelDef`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Level {
    pub graphic: Vec<EntityRef>,
    pub physical: Vec<EntityRef>,
}

impl Level {
    /// Create every entity of `def`. Either all of them are created or none.
    pub fn spawn(def: &LevelDef, ctx: &mut EngineContext) -> Result<Level, LevelError> {
        def.validate()?;

        let mut level = Level::default();
        for graphic in &def.graphic {
            match ctx.spawn(graphic.clone()) {
                Ok(entity) => level.graphic.push(entity),
                Err(e) => {
                    level.despawn(ctx);
                    return Err(e);
                }
            }
        }
        for physical in &def.physical {
            match ctx.spawn(physical.clone()) {
                Ok(entity) => level.physical.push(entity),
                Err(e) => {
                    level.despawn(ctx);
                    return Err(e);
                }
            }
        }
        log::debug!("spawned level with {} entities", level.len());
        Ok(level)
    }

    /// Re-derive a level from every live entity, in registry order.
    pub fn capture(ctx: &EngineContext) -> LevelDef {
        let mut level = LevelDef::new();
        for (_, entity) in ctx.registry.iter() {
            match entity.to_def() {
                EntityDef::Graphic(def) => level.graphic.push(def),
                EntityDef::Physical(def) => level.physical.push(def),
            }
        }
        level
    }

    pub fn len(&self) -> usize {
        self.graphic.len() + self.physical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn refs(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.graphic.iter().chain(&self.physical).copied()
    }

    /// Remove every entity of this level that is still alive.
    pub fn despawn(&mut self, ctx: &mut EngineContext) {
        for entity in self.graphic.drain(..).chain(self.physical.drain(..)) {
            if ctx.registry.contains(entity) {
                ctx.despawn(entity);
            }
        }
    }
}
