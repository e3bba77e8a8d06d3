//! Contact listener
//!
//! The physics step reports four things about every contact pair:
//! - `begin_contact`: the pair started touching
//! - `end_contact`: the pair stopped touching (or one side was destroyed)
//! - `pre_solve`: the pair is touching and about to be resolved this step
//! - `post_solve`: the pair was resolved, with the impulse the solver applied
//!
//! A `ContactListener` turns those into per-body state. It only ever sees
//! the binding table and the command queue, never the registry, so it cannot
//! add or remove entities while the step is iterating. Removal requests go
//! through `ContactScope::commands`.

use rapier2d::prelude::RigidBodyHandle;

use crate::game::entity::EntityRef;
use crate::game::event::CommandQueue;
use crate::math::Vec2;

use super::binding::ContactBindings;

/// One participant in a contact pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSide {
    pub entity: EntityRef,
    pub body: RigidBodyHandle,
    /// Body position at callback time (zero if the body is already gone)
    pub position: Vec2,
}

/// A contact pair as delivered to the listener.
///
/// A side is `None` when its collider has no owning entity, which includes
/// colliders whose entity was destroyed before the pair was reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub a: Option<ContactSide>,
    pub b: Option<ContactSide>,
    /// World-space normal pointing from `a` toward `b`
    pub normal: Vec2,
    /// Total impulse magnitude applied by the solver. Only meaningful in `post_solve`.
    pub impulse: f32,
}

impl Contact {
    /// Both sides, if both have owners.
    pub fn sides(&self) -> Option<(ContactSide, ContactSide)> {
        Some((self.a?, self.b?))
    }
}

/// What a listener may touch during the step.
pub struct ContactScope<'a> {
    pub bindings: &'a mut ContactBindings,
    pub commands: &'a mut CommandQueue,
}

/// Receives contact callbacks synchronously from inside the physics step.
pub trait ContactListener: Send {
    fn begin_contact(&mut self, scope: &mut ContactScope<'_>, contact: &Contact);

    fn end_contact(&mut self, scope: &mut ContactScope<'_>, contact: &Contact);

    fn pre_solve(&mut self, scope: &mut ContactScope<'_>, contact: &Contact);

    /// Reserved for impulse-driven effects.
    fn post_solve(&mut self, _scope: &mut ContactScope<'_>, _contact: &Contact) {}
}

/// The default listener: keeps contact maps and grounded flags current.
///
/// Grounding compares vertical positions only. Whichever body is higher on
/// screen (strictly lower y) is marked grounded; equal heights ground
/// neither. Side and ceiling contacts can be misread as ground.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroundingListener;

impl ContactListener for GroundingListener {
    fn begin_contact(&mut self, scope: &mut ContactScope<'_>, contact: &Contact) {
        let Some((a, b)) = contact.sides() else {
            return;
        };
        if !scope.bindings.contains(a.body) || !scope.bindings.contains(b.body) {
            return;
        }

        if let Some(binding) = scope.bindings.get_mut(a.body) {
            binding.insert_contact(b.entity, contact.normal);
        }
        if let Some(binding) = scope.bindings.get_mut(b.body) {
            binding.insert_contact(a.entity, -contact.normal);
        }
        log::debug!("contact begin {} <-> {}", a.entity, b.entity);
    }

    fn end_contact(&mut self, scope: &mut ContactScope<'_>, contact: &Contact) {
        let Some((a, b)) = contact.sides() else {
            return;
        };

        if let Some(binding) = scope.bindings.get_mut(a.body) {
            binding.remove_contact(b.entity);
        }
        if let Some(binding) = scope.bindings.get_mut(b.body) {
            binding.remove_contact(a.entity);
        }
        log::debug!("contact end {} <-> {}", a.entity, b.entity);
    }

    fn pre_solve(&mut self, scope: &mut ContactScope<'_>, contact: &Contact) {
        let Some((a, b)) = contact.sides() else {
            return;
        };

        if let Some(binding) = scope.bindings.get_mut(a.body) {
            binding.refresh_normal(b.entity, contact.normal);
        }
        if let Some(binding) = scope.bindings.get_mut(b.body) {
            binding.refresh_normal(a.entity, -contact.normal);
        }

        // y grows downward
        let on_top = if a.position.y < b.position.y {
            Some(a.body)
        } else if b.position.y < a.position.y {
            Some(b.body)
        } else {
            None
        };
        if let Some(binding) = on_top.and_then(|body| scope.bindings.get_mut(body)) {
            binding.grounded = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        bindings: ContactBindings,
        commands: CommandQueue,
        a: ContactSide,
        b: ContactSide,
    }

    fn pair() -> Pair {
        let a = ContactSide {
            entity: EntityRef::new(0, 0),
            body: RigidBodyHandle::from_raw_parts(0, 0),
            position: Vec2::new(8.0, 8.5),
        };
        let b = ContactSide {
            entity: EntityRef::new(1, 0),
            body: RigidBodyHandle::from_raw_parts(1, 0),
            position: Vec2::new(8.0, 10.0),
        };
        let mut bindings = ContactBindings::new();
        bindings.attach(a.body, a.entity);
        bindings.attach(b.body, b.entity);
        Pair { bindings, commands: CommandQueue::new(), a, b }
    }

    fn contact(p: &Pair) -> Contact {
        Contact { a: Some(p.a), b: Some(p.b), normal: Vec2::new(0.0, 1.0), impulse: 0.0 }
    }

    #[test]
    fn test_begin_inserts_both_sides() {
        let mut p = pair();
        let c = contact(&p);
        let mut scope = ContactScope { bindings: &mut p.bindings, commands: &mut p.commands };
        GroundingListener.begin_contact(&mut scope, &c);

        let a = p.bindings.get(p.a.body).unwrap();
        let b = p.bindings.get(p.b.body).unwrap();
        assert_eq!(a.contact_with(p.b.entity).unwrap().normal, Vec2::new(0.0, 1.0));
        assert_eq!(b.contact_with(p.a.entity).unwrap().normal, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_end_then_begin_restores_one_entry() {
        let mut p = pair();
        let c = contact(&p);
        let mut scope = ContactScope { bindings: &mut p.bindings, commands: &mut p.commands };
        let mut listener = GroundingListener;

        listener.begin_contact(&mut scope, &c);
        listener.begin_contact(&mut scope, &c);
        listener.end_contact(&mut scope, &c);
        listener.begin_contact(&mut scope, &c);

        assert_eq!(p.bindings.get(p.a.body).unwrap().contact_count(), 1);
        assert_eq!(p.bindings.get(p.b.body).unwrap().contact_count(), 1);
    }

    #[test]
    fn test_one_fixture_leaving_keeps_the_contact() {
        let mut p = pair();
        let c = contact(&p);
        let mut scope = ContactScope { bindings: &mut p.bindings, commands: &mut p.commands };
        let mut listener = GroundingListener;

        // two collider pairs between the same entities
        listener.begin_contact(&mut scope, &c);
        listener.begin_contact(&mut scope, &c);
        listener.end_contact(&mut scope, &c);

        assert!(p.bindings.get(p.a.body).unwrap().is_touching(p.b.entity));
        assert!(p.bindings.get(p.b.body).unwrap().is_touching(p.a.entity));

        let mut scope = ContactScope { bindings: &mut p.bindings, commands: &mut p.commands };
        listener.end_contact(&mut scope, &c);
        assert!(!p.bindings.get(p.a.body).unwrap().is_touching(p.b.entity));
        assert!(!p.bindings.get(p.b.body).unwrap().is_touching(p.a.entity));
    }

    #[test]
    fn test_missing_side_is_noop() {
        let mut p = pair();
        let c = Contact { a: Some(p.a), b: None, normal: Vec2::Y, impulse: 0.0 };
        let mut scope = ContactScope { bindings: &mut p.bindings, commands: &mut p.commands };
        let mut listener = GroundingListener;

        listener.begin_contact(&mut scope, &c);
        listener.pre_solve(&mut scope, &c);
        listener.end_contact(&mut scope, &c);

        let a = p.bindings.get(p.a.body).unwrap();
        assert_eq!(a.contact_count(), 0);
        assert!(!a.grounded);
    }

    #[test]
    fn test_unbound_body_is_noop_on_begin() {
        let mut p = pair();
        p.bindings.release(p.b.body);
        let c = contact(&p);
        let mut scope = ContactScope { bindings: &mut p.bindings, commands: &mut p.commands };
        GroundingListener.begin_contact(&mut scope, &c);
        GroundingListener.end_contact(&mut scope, &c);

        assert_eq!(p.bindings.get(p.a.body).unwrap().contact_count(), 0);
    }

    #[test]
    fn test_pre_solve_grounds_upper_body() {
        let mut p = pair();
        let c = contact(&p);
        let mut scope = ContactScope { bindings: &mut p.bindings, commands: &mut p.commands };
        GroundingListener.pre_solve(&mut scope, &c);

        assert!(p.bindings.get(p.a.body).unwrap().grounded);
        assert!(!p.bindings.get(p.b.body).unwrap().grounded);
    }

    #[test]
    fn test_pre_solve_refreshes_normals() {
        let mut p = pair();
        let mut c = contact(&p);
        let mut scope = ContactScope { bindings: &mut p.bindings, commands: &mut p.commands };
        GroundingListener.begin_contact(&mut scope, &c);

        c.normal = Vec2::new(1.0, 0.0);
        GroundingListener.pre_solve(&mut scope, &c);

        let a = p.bindings.get(p.a.body).unwrap();
        assert_eq!(a.contact_with(p.b.entity).unwrap().normal, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_level_bodies_ground_neither() {
        let mut p = pair();
        p.b.position.y = p.a.position.y;
        let c = contact(&p);
        let mut scope = ContactScope { bindings: &mut p.bindings, commands: &mut p.commands };
        GroundingListener.pre_solve(&mut scope, &c);

        assert!(!p.bindings.get(p.a.body).unwrap().grounded);
        assert!(!p.bindings.get(p.b.body).unwrap().grounded);
    }
}
