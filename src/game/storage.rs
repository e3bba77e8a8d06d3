//! Sparse slot storage keyed by `EntityRef`
//!
//! A plain `Vec<Option<_>>` indexed by the reference's slot. Each occupied
//! slot remembers the generation it was inserted under, so a stale reference
//! to a reused slot reads as empty instead of aliasing the new occupant.

use super::entity::EntityRef;

pub struct SlotStorage<T> {
    data: Vec<Option<(u32, T)>>,
}

impl<T> SlotStorage<T> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    fn ensure_capacity(&mut self, index: usize) {
        if index >= self.data.len() {
            self.data.resize_with(index + 1, || None);
        }
    }

    /// Insert or replace the value for `entity`'s slot.
    pub fn insert(&mut self, entity: EntityRef, value: T) {
        let idx = entity.index() as usize;
        self.ensure_capacity(idx);
        self.data[idx] = Some((entity.generation(), value));
    }

    /// Remove the value only if the slot still belongs to `entity`.
    pub fn remove(&mut self, entity: EntityRef) -> Option<T> {
        if !self.contains(entity) {
            return None;
        }
        self.data[entity.index() as usize].take().map(|(_, value)| value)
    }

    pub fn get(&self, entity: EntityRef) -> Option<&T> {
        match self.data.get(entity.index() as usize)? {
            Some((generation, value)) if *generation == entity.generation() => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, entity: EntityRef) -> Option<&mut T> {
        match self.data.get_mut(entity.index() as usize)? {
            Some((generation, value)) if *generation == entity.generation() => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.get(entity).is_some()
    }

    /// Number of occupied slots.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|slot| slot.is_some()).count()
    }
}

impl<T> Default for SlotStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}
