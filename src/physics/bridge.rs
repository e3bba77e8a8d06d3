//! rapier callback adapter
//!
//! rapier reports contacts through two `&self` traits that must be
//! `Send + Sync`. The bridge holds mutable borrows of the listener and the
//! binding table behind a mutex for the duration of one step and translates
//! rapier's collider-level callbacks into entity-level `Contact`s.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rapier2d::prelude::*;

use crate::game::entity::EntityRef;
use crate::game::event::CommandQueue;
use crate::math::{na_to_vec2, Vec2};

use super::binding::ContactBindings;
use super::listener::{Contact, ContactListener, ContactScope, ContactSide};

/// Who a collider belongs to. Kept outside the collider set because a
/// removal is reported one step after the collider is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColliderOwner {
    pub body: RigidBodyHandle,
    pub entity: EntityRef,
}

struct BridgeState<'a> {
    listener: &'a mut (dyn ContactListener + 'static),
    bindings: &'a mut ContactBindings,
    commands: &'a mut CommandQueue,
    owners: &'a HashMap<ColliderHandle, ColliderOwner>,
}

impl BridgeState<'_> {
    fn side(&self, bodies: &RigidBodySet, collider: ColliderHandle) -> Option<ContactSide> {
        let owner = self.owners.get(&collider)?;
        let position = bodies
            .get(owner.body)
            .map(|rb| na_to_vec2(rb.translation()))
            .unwrap_or(Vec2::ZERO);
        Some(ContactSide {
            entity: owner.entity,
            body: owner.body,
            position,
        })
    }

    fn contact(
        &self,
        bodies: &RigidBodySet,
        collider1: ColliderHandle,
        collider2: ColliderHandle,
        normal: Vec2,
        impulse: f32,
    ) -> Contact {
        Contact {
            a: self.side(bodies, collider1),
            b: self.side(bodies, collider2),
            normal,
            impulse,
        }
    }

    fn scope(&mut self) -> (&mut (dyn ContactListener + 'static), ContactScope<'_>) {
        (
            &mut *self.listener,
            ContactScope {
                bindings: &mut *self.bindings,
                commands: &mut *self.commands,
            },
        )
    }
}

pub(crate) struct RapierBridge<'a> {
    state: Mutex<BridgeState<'a>>,
}

impl<'a> RapierBridge<'a> {
    pub fn new(
        listener: &'a mut (dyn ContactListener + 'static),
        bindings: &'a mut ContactBindings,
        commands: &'a mut CommandQueue,
        owners: &'a HashMap<ColliderHandle, ColliderOwner>,
    ) -> Self {
        Self {
            state: Mutex::new(BridgeState {
                listener,
                bindings,
                commands,
                owners,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BridgeState<'a>> {
        // a panicking listener already unwound the step; the state itself is plain data
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn deepest_normal(pair: &ContactPair) -> Vec2 {
    pair.find_deepest_contact()
        .map(|(manifold, _)| na_to_vec2(&manifold.data.normal))
        .unwrap_or(Vec2::ZERO)
}

impl PhysicsHooks for RapierBridge<'_> {
    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        // rapier also calls this for manifolds that are merely close
        if context.solver_contacts.is_empty() {
            return;
        }
        let mut state = self.lock();
        let contact = state.contact(
            context.bodies,
            context.collider1,
            context.collider2,
            na_to_vec2(context.normal),
            0.0,
        );
        let (listener, mut scope) = state.scope();
        listener.pre_solve(&mut scope, &contact);
    }
}

impl EventHandler for RapierBridge<'_> {
    fn handle_collision_event(
        &self,
        bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        contact_pair: Option<&ContactPair>,
    ) {
        let normal = contact_pair.map(deepest_normal).unwrap_or(Vec2::ZERO);
        let mut state = self.lock();
        let contact = state.contact(bodies, event.collider1(), event.collider2(), normal, 0.0);
        let (listener, mut scope) = state.scope();
        if event.started() {
            listener.begin_contact(&mut scope, &contact);
        } else {
            listener.end_contact(&mut scope, &contact);
        }
    }

    fn handle_contact_force_event(
        &self,
        dt: Real,
        bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        contact_pair: &ContactPair,
        total_force_magnitude: Real,
    ) {
        let mut state = self.lock();
        let contact = state.contact(
            bodies,
            contact_pair.collider1,
            contact_pair.collider2,
            deepest_normal(contact_pair),
            total_force_magnitude * dt,
        );
        let (listener, mut scope) = state.scope();
        listener.post_solve(&mut scope, &contact);
    }
}
