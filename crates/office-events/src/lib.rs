//! Shared wire types for the office simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! The authoritative simulation produces these values and every observer
//! consumes them, so both sides agree on one vocabulary.

pub mod event;
pub mod snapshot;
pub mod time;
pub mod types;

// Re-export time types
pub use time::{ParseTimeError, SimTime, DAY_START_HOUR, MINUTES_PER_TICK};

// Re-export shared vocabulary
pub use types::{BehaviorState, Direction, Gender, NeedKind, NeedLevel, Rgb, SimStatus, TileType, ZoneType};

// Re-export event types
pub use event::{ErrorScope, EventKind, SimEvent};

// Re-export snapshot types
pub use snapshot::{
    ActiveEventSnapshot, AppearanceSnapshot, CharacterSnapshot, DialogueLineSnapshot,
    EncounterSnapshot, MapSnapshot, NeedsSnapshot, PersonalitySnapshot, PointSnapshot,
    TaskSnapshot, TaskStatus, TickSnapshot, ZoneSnapshot,
};
