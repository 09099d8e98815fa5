//! Error types for the combat simulation.
//!
//! Per-tick failures never surface here: systems skip the affected entity
//! for that tick. These errors come from explicit API calls and from
//! loading static definitions.

use thiserror::Error;

use crate::ecs::EntityId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Entity lacks a component the operation needs.
    #[error("Entity {entity} has no {component} component")]
    MissingComponent {
        /// Entity that was addressed.
        entity: EntityId,
        /// Name of the missing component kind.
        component: &'static str,
    },

    /// Weapon id absent from the loaded definitions.
    #[error("Unknown weapon: {0}")]
    UnknownWeapon(String),

    /// Bomb kind absent from the loaded definitions.
    #[error("No definition for bomb kind: {0}")]
    UnknownBombKind(String),

    /// AI role absent from the loaded profiles.
    #[error("No AI profile for role: {0}")]
    UnknownAiRole(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// A definition parsed but violates its constraints.
    #[error("Invalid definition '{id}': {reason}")]
    InvalidDefinition {
        /// Offending definition id.
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Invalid simulation state.
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),
}
