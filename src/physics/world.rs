//! Physics world
//!
//! Wraps the rapier sets and pipeline behind the handful of operations the
//! engine needs, and owns the two side-tables that tie bodies to entities:
//! - `bindings`: body handle -> `ContactBinding`
//! - `collider_owners`: collider handle -> owning body and entity
//!
//! Both are written only by `create_body` and `destroy_body`, so a binding
//! exists exactly as long as its body.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use rapier2d::prelude::*;

use crate::config::{FixtureMaterial, PhysicsConfig};
use crate::error::LevelError;
use crate::game::def::{BodyType, PhysicalDef};
use crate::game::entity::EntityRef;
use crate::game::event::CommandQueue;
use crate::math::{na_to_vec2, vec2_to_na, vec2_to_point, Vec2};

use super::binding::{ContactBinding, ContactBindings};
use super::bridge::{ColliderOwner, RapierBridge};
use super::listener::{ContactListener, GroundingListener};

impl From<BodyType> for RigidBodyType {
    fn from(ty: BodyType) -> Self {
        match ty {
            BodyType::Static => RigidBodyType::Fixed,
            BodyType::Kinematic => RigidBodyType::KinematicVelocityBased,
            BodyType::Dynamic => RigidBodyType::Dynamic,
        }
    }
}

/// Handles created for one physical entity.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyHandles {
    pub body: RigidBodyHandle,
    /// One per hitbox, in definition order
    pub colliders: Vec<ColliderHandle>,
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    default_material: FixtureMaterial,
    bindings: ContactBindings,
    collider_owners: HashMap<ColliderHandle, ColliderOwner>,
    listener: Box<dyn ContactListener>,
    steps: u64,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig, default_material: FixtureMaterial) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: config.timestep,
            num_solver_iterations: NonZeroUsize::new(config.velocity_iterations)
                .unwrap_or(NonZeroUsize::MIN),
            num_internal_stabilization_iterations: config.position_iterations,
            ..IntegrationParameters::default()
        };

        Self {
            gravity: vec2_to_na(config.world_gravity),
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            default_material,
            bindings: ContactBindings::new(),
            collider_owners: HashMap::new(),
            listener: Box::new(GroundingListener),
            steps: 0,
        }
    }

    /// Replace the contact listener. Existing contact maps are kept.
    pub fn set_contact_listener(&mut self, listener: Box<dyn ContactListener>) {
        self.listener = listener;
    }

    /// Material used by hitboxes that do not carry their own.
    pub fn default_material(&self) -> FixtureMaterial {
        self.default_material
    }

    // =========================================================================
    // Body lifecycle
    // =========================================================================

    /// Build the body for `owner` and attach a fresh binding to it.
    ///
    /// Every hitbox is turned into a collider before anything is inserted,
    /// so a degenerate hitbox leaves the world untouched.
    pub fn create_body(&mut self, owner: EntityRef, def: &PhysicalDef) -> Result<BodyHandles, LevelError> {
        let material = def.material.unwrap_or(self.default_material);
        let mut builders = Vec::with_capacity(def.fixtures.len());
        for (i, vertices) in def.fixtures.iter().enumerate() {
            let points: Vec<Point<Real>> = vertices.iter().map(|v| vec2_to_point(*v)).collect();
            let builder = ColliderBuilder::convex_hull(&points).ok_or_else(|| {
                LevelError::DegenerateFixture {
                    record: format!("entity {}", owner),
                    fixture: i,
                }
            })?;
            builders.push(
                builder
                    .density(material.density)
                    .friction(material.friction)
                    .restitution(material.restitution)
                    .active_events(ActiveEvents::COLLISION_EVENTS | ActiveEvents::CONTACT_FORCE_EVENTS)
                    .active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS),
            );
        }

        let dynamic = def.body_type == BodyType::Dynamic;
        let mut body = RigidBodyBuilder::new(def.body_type.into())
            .translation(vec2_to_na(def.position));
        if dynamic {
            // velocity is pushed every tick, so sleeping would only fight the pre-step
            body = body.lock_rotations().ccd_enabled(true).can_sleep(false);
        }
        let body = self.bodies.insert(body);

        let colliders: Vec<ColliderHandle> = builders
            .into_iter()
            .map(|builder| {
                let handle = self.colliders.insert_with_parent(builder, body, &mut self.bodies);
                self.collider_owners.insert(handle, ColliderOwner { body, entity: owner });
                handle
            })
            .collect();

        self.bindings.attach(body, owner);
        log::debug!(
            "created {} body for {} with {} collider(s)",
            def.body_type.as_str(),
            owner,
            colliders.len()
        );
        Ok(BodyHandles { body, colliders })
    }

    /// Release the binding, then remove the body and its colliders.
    ///
    /// Returns false if the body was already gone.
    pub fn destroy_body(&mut self, body: RigidBodyHandle) -> bool {
        let binding = self.bindings.release(body);
        self.collider_owners.retain(|_, owner| owner.body != body);

        let removed = self
            .bodies
            .remove(
                body,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some();

        if let Some(binding) = binding {
            log::debug!("destroyed body of {}", binding.owner());
        }
        removed
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Advance one fixed timestep. Listener callbacks run synchronously in here.
    pub fn step(&mut self, commands: &mut CommandQueue) {
        let bridge = RapierBridge::new(
            &mut *self.listener,
            &mut self.bindings,
            commands,
            &self.collider_owners,
        );

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &bridge,
            &bridge,
        );
        self.steps += 1;
    }

    /// Number of completed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Seconds per step.
    pub fn timestep(&self) -> f32 {
        self.integration_parameters.dt
    }

    // =========================================================================
    // Body state
    // =========================================================================

    /// Body translation, `None` once the body is gone.
    pub fn body_position(&self, body: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(body).map(|rb| na_to_vec2(rb.translation()))
    }

    /// Body linear velocity in units per second.
    pub fn body_velocity(&self, body: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(body).map(|rb| na_to_vec2(rb.linvel()))
    }

    /// Overwrite the linear velocity and wake the body. Unknown handles are ignored.
    pub fn set_linvel(&mut self, body: RigidBodyHandle, velocity: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body) {
            rb.set_linvel(vec2_to_na(velocity), true);
        }
    }

    pub fn body_type(&self, body: RigidBodyHandle) -> Option<RigidBodyType> {
        self.bodies.get(body).map(|rb| rb.body_type())
    }

    /// Dynamic bodies never rotate.
    pub fn is_rotation_locked(&self, body: RigidBodyHandle) -> bool {
        self.bodies
            .get(body)
            .is_some_and(|rb| rb.locked_axes().contains(LockedAxes::ROTATION_LOCKED))
    }

    /// Colliders attached to `body` (0 for an unknown handle).
    pub fn collider_count(&self, body: RigidBodyHandle) -> usize {
        self.bodies.get(body).map_or(0, |rb| rb.colliders().len())
    }

    /// Bodies in the world, static ones included.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// The entity owning `collider`, from the side-table.
    pub fn collider_owner(&self, collider: ColliderHandle) -> Option<EntityRef> {
        self.collider_owners.get(&collider).map(|owner| owner.entity)
    }

    // =========================================================================
    // Bindings
    // =========================================================================

    /// Every live contact binding.
    pub fn bindings(&self) -> &ContactBindings {
        &self.bindings
    }

    /// Contact state for one body.
    pub fn binding(&self, body: RigidBodyHandle) -> Option<&ContactBinding> {
        self.bindings.get(body)
    }

    pub fn binding_mut(&mut self, body: RigidBodyHandle) -> Option<&mut ContactBinding> {
        self.bindings.get_mut(body)
    }
}
