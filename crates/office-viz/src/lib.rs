//! Viewer for the office simulation: observer state, motion interpolation,
//! sprites, dialogue bubbles and the Bevy front end.

pub mod animation;
pub mod bubbles;
pub mod config;
pub mod dialogue;
pub mod input;
pub mod interpolation;
pub mod live;
pub mod plugin;
pub mod render;
pub mod scene;
pub mod sprites;
pub mod state_cache;
pub mod viewer;

pub use config::ViewerConfig;
pub use plugin::OfficeVizPlugin;
pub use viewer::Viewer;
