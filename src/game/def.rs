//! Entity definitions
//!
//! A definition is everything needed to build an entity, and everything the
//! registry can re-derive from a live one. Levels are lists of these.

use serde::{Deserialize, Serialize};

use crate::config::FixtureMaterial;
use crate::error::LevelError;
use crate::math::{approx_eq, Vec2};

/// How the solver treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    /// Never moves
    Static,
    /// Moves only by the velocity it is given, ignores forces
    Kinematic,
    /// Fully simulated
    Dynamic,
}

impl BodyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyType::Static => "static",
            BodyType::Kinematic => "kinematic",
            BodyType::Dynamic => "dynamic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "static" => Some(BodyType::Static),
            "kinematic" => Some(BodyType::Kinematic),
            "dynamic" => Some(BodyType::Dynamic),
            _ => None,
        }
    }
}

/// Which variant an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    GraphicOnly,
    GraphicPhysical,
}

/// A drawable-only entity.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicDef {
    /// Half extents of the drawn rectangle
    pub size: Vec2,
    pub position: Vec2,
}

impl GraphicDef {
    pub fn new(size: Vec2, position: Vec2) -> Self {
        Self { size, position }
    }
}

/// A drawable entity backed by a rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalDef {
    /// Half extents of the drawn rectangle
    pub size: Vec2,
    pub position: Vec2,
    pub body_type: BodyType,
    /// One convex polygon per collider, in body-local coordinates
    pub fixtures: Vec<Vec<Vec2>>,
    /// Overrides the configured default material
    pub material: Option<FixtureMaterial>,
}

impl PhysicalDef {
    pub fn new(size: Vec2, position: Vec2, body_type: BodyType) -> Self {
        Self {
            size,
            position,
            body_type,
            fixtures: Vec::new(),
            material: None,
        }
    }

    pub fn dynamic(size: Vec2, position: Vec2) -> Self {
        Self::new(size, position, BodyType::Dynamic)
    }

    pub fn fixed(size: Vec2, position: Vec2) -> Self {
        Self::new(size, position, BodyType::Static)
    }

    pub fn kinematic(size: Vec2, position: Vec2) -> Self {
        Self::new(size, position, BodyType::Kinematic)
    }

    pub fn with_fixture(mut self, vertices: Vec<Vec2>) -> Self {
        self.fixtures.push(vertices);
        self
    }

    /// Add a rectangle hitbox matching the drawn size.
    pub fn with_box_fixture(self) -> Self {
        let h = self.size;
        self.with_fixture(vec![
            Vec2::new(-h.x, -h.y),
            Vec2::new(h.x, -h.y),
            Vec2::new(h.x, h.y),
            Vec2::new(-h.x, h.y),
        ])
    }

    pub fn with_material(mut self, material: FixtureMaterial) -> Self {
        self.material = Some(material);
        self
    }

    /// Equality up to a per-component tolerance. Material is compared exactly.
    pub fn approx_eq(&self, other: &PhysicalDef, epsilon: f32) -> bool {
        self.body_type == other.body_type
            && approx_eq(self.size, other.size, epsilon)
            && approx_eq(self.position, other.position, epsilon)
            && self.material == other.material
            && self.fixtures.len() == other.fixtures.len()
            && self.fixtures.iter().zip(&other.fixtures).all(|(a, b)| {
                a.len() == b.len() && a.iter().zip(b).all(|(p, q)| approx_eq(*p, *q, epsilon))
            })
    }
}

/// Either kind of definition.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityDef {
    Graphic(GraphicDef),
    Physical(PhysicalDef),
}

impl EntityDef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityDef::Graphic(_) => EntityKind::GraphicOnly,
            EntityDef::Physical(_) => EntityKind::GraphicPhysical,
        }
    }

    pub fn size(&self) -> Vec2 {
        match self {
            EntityDef::Graphic(def) => def.size,
            EntityDef::Physical(def) => def.size,
        }
    }

    pub fn position(&self) -> Vec2 {
        match self {
            EntityDef::Graphic(def) => def.position,
            EntityDef::Physical(def) => def.position,
        }
    }

    /// Check the definition can be built. `record` names it in errors.
    pub fn validate(&self, record: &str) -> Result<(), LevelError> {
        if !self.size().is_finite() || !self.position().is_finite() {
            return Err(LevelError::malformed(record, "size and position must be finite"));
        }
        if let EntityDef::Physical(def) = self {
            for (i, vertices) in def.fixtures.iter().enumerate() {
                validate_fixture(record, i, vertices)?;
            }
        }
        Ok(())
    }
}

impl From<GraphicDef> for EntityDef {
    fn from(def: GraphicDef) -> Self {
        EntityDef::Graphic(def)
    }
}

impl From<PhysicalDef> for EntityDef {
    fn from(def: PhysicalDef) -> Self {
        EntityDef::Physical(def)
    }
}

/// A hitbox must have at least three finite vertices that are not all on
/// one line, otherwise there is no convex hull to collide with.
fn validate_fixture(record: &str, fixture: usize, vertices: &[Vec2]) -> Result<(), LevelError> {
    if vertices.len() < 3 {
        return Err(LevelError::TooFewVertices {
            record: record.to_string(),
            fixture,
            count: vertices.len(),
        });
    }
    if vertices.iter().any(|v| !v.is_finite()) {
        return Err(LevelError::malformed(
            record,
            format!("hitbox {} has a non-finite vertex", fixture),
        ));
    }

    let origin = vertices[0];
    let Some(axis) = vertices
        .iter()
        .map(|v| *v - origin)
        .find(|d| d.length_squared() > f32::EPSILON)
    else {
        return Err(LevelError::DegenerateFixture { record: record.to_string(), fixture });
    };
    let spans_area = vertices
        .iter()
        .any(|v| axis.perp_dot(*v - origin).abs() > f32::EPSILON);
    if !spans_area {
        return Err(LevelError::DegenerateFixture { record: record.to_string(), fixture });
    }
    Ok(())
}
