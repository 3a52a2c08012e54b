//! Error Types
//!
//! One enum per concern. None of these ever escape the tick loop; they are
//! either reported to a control-surface caller or logged and turned into an
//! `Error` event.

use thiserror::Error;

/// Failure inside the simulation for a single entity.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("invariant violated for {character_id}: {detail}")]
    Invariant { character_id: String, detail: String },
}

/// Why a task could not be assigned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssignError {
    #[error("unknown task type: {0}")]
    UnknownTaskType(String),
    #[error("unknown character: {0}")]
    UnknownCharacter(String),
    #[error("character {0} is not idle")]
    NotIdle(String),
    #[error("need between {min} and {max} participants, got {got}")]
    ParticipantCount { min: usize, max: usize, got: usize },
    #[error("map has no reachable {0} zone")]
    NoZone(String),
    #[error("no eligible participants")]
    NoEligibleParticipants,
}

impl AssignError {
    /// True when a later attempt may succeed once characters free up
    pub fn is_transient(&self) -> bool {
        matches!(self, AssignError::NotIdle(_) | AssignError::NoEligibleParticipants)
    }
}

/// Why an injected event was rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InjectError {
    #[error("unknown event kind: {0}")]
    UnknownKind(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("unknown character: {0}")]
    UnknownCharacter(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("simulation is not running")]
    NotRunning,
}

/// Failure of the external dialogue/decision generator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("generation timed out")]
    Timeout,
    #[error("generator failed: {0}")]
    Failed(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A control call could not reach the simulation loop.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    #[error("simulation has stopped")]
    Stopped,
}

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failure building a simulation instance.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Map construction failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MapError {
    #[error("tile count {got} does not match {width}x{height}")]
    TileCount { width: i32, height: i32, got: usize },
    #[error("zone {0} lies outside the map")]
    ZoneOutOfBounds(String),
    #[error("duplicate zone id: {0}")]
    DuplicateZone(String),
}
