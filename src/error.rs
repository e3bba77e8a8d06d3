//! Error taxonomy
//!
//! Three distinct signals, never mixed:
//! - `EngineError`: fatal preconditions. The current update/render aborts.
//! - `LevelError` / `ConfigError`: data errors. The offending file or record
//!   is rejected with a message naming it.
//! - `Diagnostic`: recoverable lookup failures. The caller gets a safe
//!   default and the condition is queued here so tests can assert on it.

use thiserror::Error;

use crate::game::entity::EntityRef;
use crate::game::event::EventQueue;
use crate::input::InputId;

/// Unrecoverable precondition violations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("an engine instance is already running ({live} live) and multiple instances are disabled")]
    InstanceLimit { live: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Malformed level or entity definitions.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{record}: {reason}")]
    Malformed { record: String, reason: String },

    #[error("{record}: hitbox {fixture} needs at least 3 vertices, got {count}")]
    TooFewVertices { record: String, fixture: usize, count: usize },

    #[error("{record}: hitbox {fixture} does not enclose any area")]
    DegenerateFixture { record: String, fixture: usize },

    #[error("{record}: unknown body type {found:?} (expected static, dynamic or kinematic)")]
    UnknownBodyType { record: String, found: String },
}

impl LevelError {
    pub fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
        LevelError::Malformed {
            record: record.into(),
            reason: reason.into(),
        }
    }
}

/// Engine configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("serialize error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Recoverable diagnostics
// =============================================================================

/// A recoverable lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// Removal or lookup of an entity that is not in the registry
    /// (double removal or a stale reference).
    StaleEntity(EntityRef),
    /// Query for an input that was never registered.
    UnknownInput(InputId),
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::StaleEntity(entity) => write!(f, "entity {} is not in the registry", entity),
            Diagnostic::UnknownInput(id) => write!(f, "input {:?} was never registered", id),
        }
    }
}

/// Queue of recoverable conditions, drained by whoever cares.
#[derive(Debug, Default)]
pub struct Diagnostics {
    queue: EventQueue<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record a diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.queue.send(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.queue.iter()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Diagnostic> + '_ {
        self.queue.drain()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
