//! Per-body contact bookkeeping
//!
//! Every rigid body owned by an entity has exactly one `ContactBinding`,
//! stored here keyed by its body handle rather than smuggled through the
//! physics library's user-data slot. The binding is created with the body
//! and released with it; `PhysicsWorld` is the only thing that does either.

use std::collections::HashMap;

use rapier2d::prelude::RigidBodyHandle;

use crate::game::entity::EntityRef;
use crate::math::Vec2;

/// One live contact, as seen from the binding that stores it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInfo {
    /// Unit normal pointing from this binding's owner toward `collider`
    pub normal: Vec2,
    /// The entity on the other side of the contact
    pub collider: EntityRef,
}

/// A contact plus how many collider pairs currently keep it alive.
#[derive(Debug, Clone, Copy)]
struct TrackedContact {
    info: ContactInfo,
    pairs: u32,
}

/// Contact state for one body.
///
/// Contacts are keyed by the other entity, but the physics world reports
/// begin and end per pair of colliders. A body with several fixtures can
/// touch the same entity through more than one pair, so each entry counts
/// its live pairs and only disappears when the last one ends.
#[derive(Debug, Clone)]
pub struct ContactBinding {
    owner: EntityRef,
    contacts: HashMap<EntityRef, TrackedContact>,
    /// Accumulated downward pull, ramped by the pre-step
    pub gravity_strength: f32,
    /// Set during the step when the owner rests on something, cleared every pre-step
    pub grounded: bool,
}

impl ContactBinding {
    pub fn new(owner: EntityRef) -> Self {
        Self {
            owner,
            contacts: HashMap::new(),
            gravity_strength: 0.0,
            grounded: false,
        }
    }

    pub fn owner(&self) -> EntityRef {
        self.owner
    }

    /// Every entity this body touches, one entry each.
    pub fn contacts(&self) -> impl ExactSizeIterator<Item = &ContactInfo> + '_ {
        self.contacts.values().map(|tracked| &tracked.info)
    }

    /// Number of distinct entities touched.
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn contact_with(&self, other: EntityRef) -> Option<&ContactInfo> {
        self.contacts.get(&other).map(|tracked| &tracked.info)
    }

    pub fn is_touching(&self, other: EntityRef) -> bool {
        self.contacts.contains_key(&other)
    }

    /// Collider pairs currently touching `other` (0 when not touching).
    pub fn touching_pairs(&self, other: EntityRef) -> u32 {
        self.contacts.get(&other).map_or(0, |tracked| tracked.pairs)
    }

    /// Record one more touching collider pair with `other` and take its normal.
    pub fn insert_contact(&mut self, other: EntityRef, normal: Vec2) {
        let tracked = self.contacts.entry(other).or_insert(TrackedContact {
            info: ContactInfo { normal, collider: other },
            pairs: 0,
        });
        tracked.info.normal = normal;
        tracked.pairs += 1;
    }

    /// Drop one touching collider pair with `other`. Returns the contact once
    /// its last pair is gone, `None` while other pairs still touch.
    pub fn remove_contact(&mut self, other: EntityRef) -> Option<ContactInfo> {
        let tracked = self.contacts.get_mut(&other)?;
        tracked.pairs = tracked.pairs.saturating_sub(1);
        if tracked.pairs > 0 {
            return None;
        }
        self.contacts.remove(&other).map(|tracked| tracked.info)
    }

    /// Update the stored normal if a contact with `other` is recorded.
    pub fn refresh_normal(&mut self, other: EntityRef, normal: Vec2) {
        if let Some(tracked) = self.contacts.get_mut(&other) {
            tracked.info.normal = normal;
        }
    }
}

/// Side-table of every live binding.
#[derive(Debug, Default)]
pub struct ContactBindings {
    by_body: HashMap<RigidBodyHandle, ContactBinding>,
}

impl ContactBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a fresh binding to a newly created body.
    pub(crate) fn attach(&mut self, body: RigidBodyHandle, owner: EntityRef) {
        self.by_body.insert(body, ContactBinding::new(owner));
    }

    /// Release a body's binding and forget its owner in every other
    /// binding's contact map, so no map refers to a dead entity.
    pub(crate) fn release(&mut self, body: RigidBodyHandle) -> Option<ContactBinding> {
        let binding = self.by_body.remove(&body)?;
        for other in self.by_body.values_mut() {
            other.contacts.remove(&binding.owner);
        }
        Some(binding)
    }

    pub fn get(&self, body: RigidBodyHandle) -> Option<&ContactBinding> {
        self.by_body.get(&body)
    }

    pub fn get_mut(&mut self, body: RigidBodyHandle) -> Option<&mut ContactBinding> {
        self.by_body.get_mut(&body)
    }

    pub fn contains(&self, body: RigidBodyHandle) -> bool {
        self.by_body.contains_key(&body)
    }

    pub fn len(&self) -> usize {
        self.by_body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_body.is_empty()
    }
}
