//! Entity references with generational indices
//!
//! The registry owns every entity; everything else (contact maps, controllers,
//! level captures) holds an `EntityRef`. A reference carries the slot index
//! plus the slot's generation at allocation time:
//! - freeing a slot bumps its generation
//! - a reused slot therefore never matches references to its previous occupant
//!
//! That is what lets a contact map outlive the entity on the other side of it
//! without ever resolving to the wrong object.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Non-owning handle to an entity in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    index: u32,
    generation: u32,
}

impl EntityRef {
    /// Only the allocator mints references.
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Reference that never resolves.
    pub const NULL: EntityRef = EntityRef { index: u32::MAX, generation: 0 };

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX
    }
}

impl Default for EntityRef {
    fn default() -> Self {
        EntityRef::NULL
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "#null")
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

/// Hands out entity slots and tracks which references are still live.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    /// Freed slots, reused LIFO
    free_indices: Vec<u32>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> EntityRef {
        match self.free_indices.pop() {
            // generation was already bumped on free
            Some(index) => EntityRef::new(index, self.generations[index as usize]),
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                EntityRef::new(index, 0)
            }
        }
    }

    /// Returns false if the reference was already stale.
    pub fn free(&mut self, entity: EntityRef) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        let slot = &mut self.generations[entity.index as usize];
        *slot = slot.wrapping_add(1);
        self.free_indices.push(entity.index);
        true
    }

    pub fn is_alive(&self, entity: EntityRef) -> bool {
        if entity.is_null() {
            return false;
        }
        self.generations
            .get(entity.index as usize)
            .is_some_and(|&generation| generation == entity.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_free() {
        let mut alloc = EntityAllocator::new();

        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_ne!(a, b);
        assert!(alloc.is_alive(a));

        assert!(alloc.free(a));
        assert!(!alloc.is_alive(a));
        assert!(alloc.is_alive(b));
    }

    #[test]
    fn test_double_free_is_rejected() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        assert!(alloc.free(a));
        assert!(!alloc.free(a));
        // the slot is handed out once more, not twice
        let b = alloc.allocate();
        let c = alloc.allocate();
        assert_eq!(b.index(), a.index());
        assert_ne!(c.index(), a.index());
    }

    #[test]
    fn test_reused_slot_gets_new_generation() {
        let mut alloc = EntityAllocator::new();

        let first = alloc.allocate();
        alloc.free(first);
        let second = alloc.allocate();

        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        assert!(!alloc.is_alive(first));
        assert!(alloc.is_alive(second));
    }

    #[test]
    fn test_display_names_index_and_generation() {
        assert_eq!(EntityRef::new(7, 3).to_string(), "#7v3");
        assert_eq!(EntityRef::NULL.to_string(), "#null");
    }

    #[test]
    fn test_null_never_alive() {
        let alloc = EntityAllocator::new();
        assert!(!alloc.is_alive(EntityRef::NULL));
        assert!(EntityRef::default().is_null());
    }
}
