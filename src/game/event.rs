//! Queues for deferred work
//!
//! Nothing that runs inside the physics step may touch the registry. Contact
//! callbacks and other mid-iteration code push a `Command` instead, and the
//! step orchestrator applies the queue once iteration is over.

use super::def::EntityDef;
use super::entity::EntityRef;
use crate::error::LevelError;

/// A FIFO of values of one type, collected during a frame and drained later.
#[derive(Debug)]
pub struct EventQueue<T> {
    events: Vec<T>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self { events: Vec::with_capacity(8) }
    }

    pub fn send(&mut self, event: T) {
        self.events.push(event);
    }

    /// Iterate without clearing
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.events.iter()
    }

    /// Take everything, leaving the queue empty
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.events.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A registry mutation requested while the registry could not be borrowed.
#[derive(Debug, Clone)]
pub enum Command {
    Spawn(EntityDef),
    Despawn(EntityRef),
}

/// Deferred registry mutations, applied in the order they were queued.
#[derive(Debug, Default)]
pub struct CommandQueue {
    queue: EventQueue<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an entity for creation. The definition is validated now so a
    /// bad one is reported to the caller instead of at flush time.
    pub fn spawn(&mut self, def: EntityDef) -> Result<(), LevelError> {
        def.validate("queued spawn")?;
        self.queue.send(Command::Spawn(def));
        Ok(())
    }

    /// Queue a prebuilt command as is. Spawn definitions queued this way are
    /// only checked when the queue is applied, and a bad one is rejected then.
    pub fn push(&mut self, command: Command) {
        self.queue.send(command);
    }

    /// Queue an entity for removal.
    pub fn despawn(&mut self, entity: EntityRef) {
        self.queue.send(Command::Despawn(entity));
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Command> + '_ {
        self.queue.drain()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
