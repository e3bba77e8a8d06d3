//! Entity registry
//!
//! The registry is the only owner of entities. It hands out `EntityRef`s,
//! keeps entities in creation order, and drives the two per-tick passes
//! around the physics step:
//! - `pre_step`: ramp gravity, apply it, clear `grounded`, push velocity
//! - `post_step`: pull position and velocity back from the body
//!
//! Physical entities own exactly one body; creating the entity creates the
//! body (and with it the contact binding), removing the entity destroys both.

use rapier2d::prelude::{ColliderHandle, RigidBodyHandle};

use crate::config::{FixtureMaterial, GravityConfig, VelocityCapConfig};
use crate::error::{Diagnostic, Diagnostics, LevelError};
use crate::math::Vec2;
use crate::physics::gravity::{cap_velocity, ramp_gravity};
use crate::physics::PhysicsWorld;
use crate::render::{closed_outline, Canvas, DrawRect, RenderStates};

use super::def::{BodyType, EntityDef, EntityKind, GraphicDef, PhysicalDef};
use super::entity::{EntityAllocator, EntityRef};
use super::event::{Command, CommandQueue};
use super::storage::SlotStorage;

/// One hitbox polygon, in body-local coordinates. Never changes after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureShape {
    vertices: Box<[Vec2]>,
}

impl FixtureShape {
    /// Polygon vertices relative to the body origin.
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }
}

/// The body-backed part of a physical entity.
#[derive(Debug, Clone)]
pub struct PhysicalPart {
    body: RigidBodyHandle,
    colliders: Vec<ColliderHandle>,
    body_type: BodyType,
    shapes: Vec<FixtureShape>,
    material: Option<FixtureMaterial>,
    /// Velocity accumulator, pushed to the body every pre-step
    velocity: Vec2,
}

impl PhysicalPart {
    /// Handle of the owned rigid body.
    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    /// One collider per hitbox, in definition order.
    pub fn colliders(&self) -> &[ColliderHandle] {
        &self.colliders
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Hitboxes as they were defined.
    pub fn shapes(&self) -> &[FixtureShape] {
        &self.shapes
    }

    /// Velocity as of the last post-step, plus whatever was set since.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Replace the velocity pushed to the body on the next pre-step.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    /// Set the horizontal component only.
    pub fn set_x_velocity(&mut self, x: f32) {
        self.velocity.x = x;
    }

    /// Set the vertical component only (negative is up).
    pub fn set_y_velocity(&mut self, y: f32) {
        self.velocity.y = y;
    }

    /// Add an impulse-like change to the velocity.
    pub fn add_velocity(&mut self, delta: Vec2) {
        self.velocity += delta;
    }
}

/// What one command flush did.
#[derive(Debug, Default)]
pub struct CommandOutcome {
    /// Entities created, in queue order
    pub spawned: Vec<EntityRef>,
    /// Spawns that failed to build
    pub rejected: Vec<LevelError>,
}

/// A live entity. Graphic-only entities have no physical part.
#[derive(Debug, Clone)]
pub struct Entity {
    size: Vec2,
    position: Vec2,
    render_states: RenderStates,
    drawable: DrawRect,
    physical: Option<PhysicalPart>,
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        if self.physical.is_some() {
            EntityKind::GraphicPhysical
        } else {
            EntityKind::GraphicOnly
        }
    }

    /// Half extents.
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// For physical entities this is the body position as of the last post-step.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Resize the drawn rectangle. Hitboxes keep their shape.
    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
        self.drawable.set_half_size(size);
    }

    /// Move the drawable. A physical entity's position is overwritten by
    /// its body at the next post-step.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.drawable.set_position(position);
    }

    pub fn render_states(&self) -> &RenderStates {
        &self.render_states
    }

    pub fn render_states_mut(&mut self) -> &mut RenderStates {
        &mut self.render_states
    }

    pub fn drawable(&self) -> &DrawRect {
        &self.drawable
    }

    /// `None` for graphic-only entities.
    pub fn physical(&self) -> Option<&PhysicalPart> {
        self.physical.as_ref()
    }

    pub fn physical_mut(&mut self) -> Option<&mut PhysicalPart> {
        self.physical.as_mut()
    }

    /// Shortcut for `physical().map(PhysicalPart::body)`.
    pub fn body(&self) -> Option<RigidBodyHandle> {
        self.physical.as_ref().map(|part| part.body)
    }

    /// Draw the rectangle, then the hitbox outlines when asked.
    pub fn render(&self, canvas: &mut dyn Canvas, show_hitboxes: bool) {
        canvas.draw_rect(&self.drawable, &self.render_states);
        if !show_hitboxes {
            return;
        }
        if let Some(part) = &self.physical {
            let states = self.render_states.hitbox();
            for shape in &part.shapes {
                canvas.draw_outline(&closed_outline(shape.vertices(), self.position), &states);
            }
        }
    }

    /// Re-derive the definition this entity could be rebuilt from.
    pub fn to_def(&self) -> EntityDef {
        match &self.physical {
            None => EntityDef::Graphic(GraphicDef::new(self.size, self.position)),
            Some(part) => EntityDef::Physical(PhysicalDef {
                size: self.size,
                position: self.position,
                body_type: part.body_type,
                fixtures: part.shapes.iter().map(|s| s.vertices.to_vec()).collect(),
                material: part.material,
            }),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

pub struct EntityRegistry {
    allocator: EntityAllocator,
    entities: SlotStorage<Entity>,
    /// Live references in creation order
    order: Vec<EntityRef>,
    render_scale: f32,
}

impl EntityRegistry {
    pub fn new(render_scale: f32) -> Self {
        Self {
            allocator: EntityAllocator::new(),
            entities: SlotStorage::new(),
            order: Vec::new(),
            render_scale,
        }
    }

    /// Build and register an entity. Physical definitions also get a body
    /// and contact binding. On error nothing is registered.
    pub fn create(&mut self, def: EntityDef, physics: &mut PhysicsWorld) -> Result<EntityRef, LevelError> {
        def.validate("entity definition")?;

        let entity = self.allocator.allocate();
        let (size, position) = (def.size(), def.position());

        let physical = match def {
            EntityDef::Graphic(_) => None,
            EntityDef::Physical(def) => match physics.create_body(entity, &def) {
                Ok(handles) => Some(PhysicalPart {
                    body: handles.body,
                    colliders: handles.colliders,
                    body_type: def.body_type,
                    shapes: def
                        .fixtures
                        .into_iter()
                        .map(|v| FixtureShape { vertices: v.into_boxed_slice() })
                        .collect(),
                    material: def.material,
                    velocity: Vec2::ZERO,
                }),
                Err(e) => {
                    self.allocator.free(entity);
                    return Err(e);
                }
            },
        };

        self.entities.insert(
            entity,
            Entity {
                size,
                position,
                render_states: RenderStates::scaled(self.render_scale),
                drawable: DrawRect::new(size, position),
                physical,
            },
        );
        self.order.push(entity);
        log::debug!("created entity {}", entity);
        Ok(entity)
    }

    /// Remove an entity, destroying its binding and body first.
    ///
    /// A reference that is not registered (already removed, or never valid)
    /// changes nothing, returns false and is reported as a diagnostic.
    pub fn remove(&mut self, entity: EntityRef, physics: &mut PhysicsWorld, diagnostics: &mut Diagnostics) -> bool {
        let Some(removed) = self.entities.remove(entity) else {
            diagnostics.report(Diagnostic::StaleEntity(entity));
            return false;
        };

        if let Some(part) = &removed.physical {
            physics.destroy_body(part.body);
        }
        self.order.retain(|e| *e != entity);
        self.allocator.free(entity);
        log::debug!("removed entity {}", entity);
        true
    }

    /// Remove every entity.
    pub fn clear(&mut self, physics: &mut PhysicsWorld) {
        for entity in std::mem::take(&mut self.order) {
            if let Some(part) = self.entities.get(entity).and_then(|e| e.physical.as_ref()) {
                physics.destroy_body(part.body);
            }
            self.entities.remove(entity);
            self.allocator.free(entity);
        }
        debug_assert_eq!(self.entities.count(), 0);
    }

    /// `None` for stale or unknown references.
    pub fn get(&self, entity: EntityRef) -> Option<&Entity> {
        self.entities.get(entity)
    }

    pub fn get_mut(&mut self, entity: EntityRef) -> Option<&mut Entity> {
        self.entities.get_mut(entity)
    }

    /// True while `entity` is registered and not stale.
    pub fn contains(&self, entity: EntityRef) -> bool {
        self.entities.contains(entity)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Live references in registry order.
    /// Live references in creation order.
    pub fn refs(&self) -> &[EntityRef] {
        &self.order
    }

    /// Entities in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityRef, &Entity)> {
        self.order
            .iter()
            .filter_map(|e| self.entities.get(*e).map(|entity| (*e, entity)))
    }

    /// `create(def)` on the result reproduces an equivalent entity.
    pub fn def_of(&self, entity: EntityRef) -> Option<EntityDef> {
        self.entities.get(entity).map(Entity::to_def)
    }

    // =========================================================================
    // Step passes
    // =========================================================================

    /// Runs before the physics step, over every entity in registry order.
    pub fn pre_step(&mut self, physics: &mut PhysicsWorld, gravity: &GravityConfig, cap: &VelocityCapConfig) {
        for entity in &self.order {
            let Some(part) = self.entities.get_mut(*entity).and_then(|e| e.physical.as_mut()) else {
                continue;
            };

            match part.body_type {
                BodyType::Static => {}
                BodyType::Kinematic => physics.set_linvel(part.body, part.velocity),
                BodyType::Dynamic => {
                    if let Some(binding) = physics.binding_mut(part.body) {
                        binding.gravity_strength =
                            ramp_gravity(binding.gravity_strength, binding.grounded, gravity);
                        let previous = part.velocity;
                        let accelerated = Vec2::new(previous.x, previous.y + binding.gravity_strength);
                        part.velocity = cap_velocity(previous, accelerated, cap);
                        // the coming step's pre-solve sets it again if still resting
                        binding.grounded = false;
                    }
                    physics.set_linvel(part.body, part.velocity);
                }
            }
        }
    }

    /// Runs after the physics step: the body is the source of truth.
    pub fn post_step(&mut self, physics: &PhysicsWorld) {
        for entity in &self.order {
            let Some(entity) = self.entities.get_mut(*entity) else {
                continue;
            };
            let Some(part) = entity.physical.as_mut() else {
                continue;
            };

            if let Some(velocity) = physics.body_velocity(part.body) {
                part.velocity = velocity;
            }
            if let Some(position) = physics.body_position(part.body) {
                entity.position = position;
                entity.drawable.set_position(position);
            }
        }
    }

    /// Apply deferred commands in queue order.
    ///
    /// A spawn that fails is a data error, not a reason to stop: every
    /// command is applied and the failures are handed back with the
    /// entities that were created.
    pub fn apply_commands(
        &mut self,
        commands: &mut CommandQueue,
        physics: &mut PhysicsWorld,
        diagnostics: &mut Diagnostics,
    ) -> CommandOutcome {
        let mut outcome = CommandOutcome::default();

        for command in commands.drain() {
            match command {
                Command::Spawn(def) => match self.create(def, physics) {
                    Ok(entity) => outcome.spawned.push(entity),
                    Err(e) => {
                        log::warn!("deferred spawn rejected: {}", e);
                        outcome.rejected.push(e);
                    }
                },
                Command::Despawn(entity) => {
                    self.remove(entity, physics, diagnostics);
                }
            }
        }
        outcome
    }

    /// Draw every entity in registry order.
    pub fn render(&self, canvas: &mut dyn Canvas, show_hitboxes: bool) {
        for (_, entity) in self.iter() {
            entity.render(canvas, show_hitboxes);
        }
    }
}
