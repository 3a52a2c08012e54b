//! Motion Interpolation
//!
//! Each character has a displayed position that chases the authoritative one
//! at a constant per-frame speed, independent of the simulation tick rate.
//! Large corrections snap. Once close enough the display lands exactly on
//! the authoritative position and facing.

use office_events::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distances are in tiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionParams {
    /// Gaps larger than this snap in one frame
    pub teleport_threshold: f32,
    /// Distance covered per frame
    pub step: f32,
    /// Below this the display snaps to the target
    pub epsilon: f32,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            teleport_threshold: 6.0,
            step: 0.08,
            epsilon: 0.01,
        }
    }
}

/// Locally displayed motion for one character
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayedMotion {
    pub x: f32,
    pub y: f32,
    pub facing: Direction,
    /// True while the display is still catching up
    pub moving: bool,
}

impl DisplayedMotion {
    pub fn at(x: f32, y: f32, facing: Direction) -> Self {
        Self {
            x,
            y,
            facing,
            moving: false,
        }
    }

    /// Advances one frame toward `(tx, ty)`
    pub fn advance(&mut self, tx: f32, ty: f32, target_facing: Direction, params: &MotionParams) {
        let dx = tx - self.x;
        let dy = ty - self.y;
        let distance = (dx * dx + dy * dy).sqrt();

        if distance > params.teleport_threshold {
            *self = Self::at(tx, ty, target_facing);
            return;
        }
        if distance < params.epsilon {
            *self = Self::at(tx, ty, target_facing);
            return;
        }

        let travel = params.step.min(distance);
        self.x += dx / distance * travel;
        self.y += dy / distance * travel;
        if let Some(facing) = Direction::from_delta(dx, dy) {
            self.facing = facing;
        }
        self.moving = true;

        let rx = tx - self.x;
        let ry = ty - self.y;
        if (rx * rx + ry * ry).sqrt() < params.epsilon {
            *self = Self::at(tx, ty, target_facing);
        }
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        ((x - self.x).powi(2) + (y - self.y).powi(2)).sqrt()
    }
}

/// Displayed motion for every known character
#[derive(Debug, Default, Clone)]
pub struct Interpolator {
    entries: HashMap<String, DisplayedMotion>,
    pub params: MotionParams,
}

impl Interpolator {
    pub fn new(params: MotionParams) -> Self {
        Self {
            entries: HashMap::new(),
            params,
        }
    }

    /// One frame for one character. Unknown characters appear at the target.
    pub fn advance(&mut self, id: &str, tx: f32, ty: f32, facing: Direction) -> DisplayedMotion {
        let params = self.params;
        let motion = self
            .entries
            .entry(id.to_string())
            .or_insert_with(|| DisplayedMotion::at(tx, ty, facing));
        motion.advance(tx, ty, facing, &params);
        *motion
    }

    pub fn get(&self, id: &str) -> Option<&DisplayedMotion> {
        self.entries.get(id)
    }

    /// Drops characters no longer in the world
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|id, _| keep(id));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
