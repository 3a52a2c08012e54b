//! Office Simulation Engine Library
//!
//! A tile-based office where characters walk, work on tasks, chat and
//! look after their needs. The world advances in discrete ticks and reports
//! everything that happened as a stream of `office_events::SimEvent`s.

pub mod components;
pub mod config;
pub mod encounter;
pub mod error;
pub mod generation;
pub mod hub;
pub mod inject;
pub mod map;
pub mod outbox;
pub mod pathfinding;
pub mod runtime;
pub mod scheduler;
pub mod setup;
pub mod sim;
pub mod snapshot;
pub mod systems;

pub use components::{CharacterSpec, SimRng};
pub use config::SimConfig;
pub use error::{ControlError, GenerationError, InjectError, MapError, SetupError, SimError};
pub use generation::{CannedGenerator, DialogueGenerator, GenerationRequest};
pub use map::{SpatialMap, TilePos, Zone};
pub use runtime::{start, SimHandle};
pub use setup::{generate_roster, office_layout};
pub use sim::Simulation;
