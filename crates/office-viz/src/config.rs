//! Viewer settings.

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::bubbles::BubbleTimings;
use crate::interpolation::MotionParams;

/// Window, timing and bubble settings for one viewer
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window_width: f32,
    pub window_height: f32,
    /// Screen pixels per map tile
    pub tile_px: f32,
    /// Interpolation and render frames per second
    pub frame_rate: f64,
    pub motion: MotionParams,
    pub bubbles: BubbleTimings,
    pub max_bubbles: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_width: 1024.0,
            window_height: 720.0,
            tile_px: 28.0,
            frame_rate: 60.0,
            motion: MotionParams::default(),
            bubbles: BubbleTimings::default(),
            max_bubbles: 2,
        }
    }
}

impl ViewerConfig {
    pub fn frame_interval_secs(&self) -> f64 {
        1.0 / self.frame_rate.max(1.0)
    }

    /// Map tile coordinates to world space, with y growing downwards on the map
    pub fn tile_to_world(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.tile_px, -y * self.tile_px)
    }
}
