//! Character Components
//!
//! Identity, appearance and the mutable behavior state of one office worker.

use bevy_ecs::prelude::*;
use office_events::{
    AppearanceSnapshot, BehaviorState, Direction, Gender, NeedKind, NeedsSnapshot,
    PersonalitySnapshot, Rgb,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::map::TilePos;

/// Marker component identifying an entity as a character
#[derive(Component, Debug, Clone, Default)]
pub struct Character;

/// Unique identifier for a character
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub String);

/// Display name
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct CharacterName(pub String);

/// Sprite palette (skin, hair, shirt, trousers) and template variant
#[derive(Component, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appearance {
    pub palette: [Rgb; 4],
    pub gender: Gender,
}

impl Appearance {
    pub fn to_snapshot(&self) -> AppearanceSnapshot {
        AppearanceSnapshot {
            palette: self.palette,
            gender: self.gender,
        }
    }
}

/// Base personality, fixed at creation. Each trait is 0-100.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    pub openness: u8,
    pub conscientiousness: u8,
    pub extraversion: u8,
    pub agreeableness: u8,
    pub neuroticism: u8,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            openness: 50,
            conscientiousness: 50,
            extraversion: 50,
            agreeableness: 50,
            neuroticism: 50,
        }
    }
}

impl Personality {
    pub fn to_snapshot(&self) -> PersonalitySnapshot {
        PersonalitySnapshot {
            openness: self.openness,
            conscientiousness: self.conscientiousness,
            extraversion: self.extraversion,
            agreeableness: self.agreeableness,
            neuroticism: self.neuroticism,
        }
    }

    /// Extraversion scaled to 0.0-1.0, used to weight idle wandering
    pub fn sociability(&self) -> f64 {
        self.extraversion as f64 / 100.0
    }
}

/// Authoritative position in tile units
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_tile(tile: TilePos) -> Self {
        Self::new(tile.x as f32, tile.y as f32)
    }

    pub fn tile(&self) -> TilePos {
        TilePos::from_world(self.x, self.y)
    }
}

/// Facing direction
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Facing(pub Direction);

/// Current behavior state and when it was entered
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Behavior {
    pub state: BehaviorState,
    pub since_tick: u64,
    /// Tick at which a timed state (sitting) ends
    pub until_tick: Option<u64>,
}

impl Behavior {
    /// Moves to `to`. Returns the previous state when it actually changed.
    pub fn transition(&mut self, to: BehaviorState, tick: u64) -> Option<BehaviorState> {
        self.until_tick = None;
        if self.state == to {
            return None;
        }
        let from = self.state;
        self.state = to;
        self.since_tick = tick;
        Some(from)
    }
}

/// Mood, 0-100
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Mood(pub f32);

impl Default for Mood {
    fn default() -> Self {
        Self(50.0)
    }
}

impl Mood {
    /// Adds `delta`, clamping to 0-100. Returns the applied change.
    pub fn adjust(&mut self, delta: f32) -> f32 {
        let before = self.0;
        self.0 = (self.0 + delta).clamp(0.0, 100.0);
        self.0 - before
    }
}

/// Bodily needs, each 0-100; higher means more pressing
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Needs {
    pub bladder: f32,
    pub hunger: f32,
    pub thirst: f32,
}

impl Needs {
    pub fn get(&self, need: NeedKind) -> f32 {
        match need {
            NeedKind::Bladder => self.bladder,
            NeedKind::Hunger => self.hunger,
            NeedKind::Thirst => self.thirst,
        }
    }

    pub fn set(&mut self, need: NeedKind, value: f32) {
        let value = value.clamp(0.0, 100.0);
        match need {
            NeedKind::Bladder => self.bladder = value,
            NeedKind::Hunger => self.hunger = value,
            NeedKind::Thirst => self.thirst = value,
        }
    }

    /// Most pressing need at or above `threshold`. Ties go to the first in
    /// `NeedKind::all()` order.
    pub fn most_pressing(&self, threshold: f32) -> Option<NeedKind> {
        let mut best: Option<(NeedKind, f32)> = None;
        for need in NeedKind::all() {
            let value = self.get(need);
            if value < threshold {
                continue;
            }
            if best.map_or(true, |(_, v)| value > v) {
                best = Some((need, value));
            }
        }
        best.map(|(need, _)| need)
    }

    pub fn to_snapshot(&self) -> NeedsSnapshot {
        NeedsSnapshot {
            bladder: self.bladder,
            hunger: self.hunger,
            thirst: self.thirst,
        }
    }
}

/// Why a character is walking somewhere
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TravelPurpose {
    #[default]
    None,
    Wander,
    Rest,
    Need(NeedKind),
    Task(String),
    Evacuate,
}

/// Remaining route and its purpose
#[derive(Component, Debug, Clone, Default)]
pub struct Navigation {
    pub path: VecDeque<TilePos>,
    pub purpose: TravelPurpose,
}

impl Navigation {
    pub fn set_route(&mut self, steps: Vec<TilePos>, purpose: TravelPurpose) {
        self.path = steps.into();
        self.purpose = purpose;
    }

    pub fn clear(&mut self) {
        self.path.clear();
        self.purpose = TravelPurpose::None;
    }

    pub fn is_travelling(&self) -> bool {
        !self.path.is_empty()
    }
}

/// Task and encounter references
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    pub task: Option<String>,
    pub encounter: Option<String>,
}

/// Desk zone a character returns to to rest
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct HomeDesk(pub String);

/// Decision-generation bookkeeping
#[derive(Component, Debug, Clone, Default)]
pub struct DecisionClock {
    pub last_request_tick: Option<u64>,
    /// Outstanding request id; results for any other id are stale
    pub pending: Option<u64>,
}

/// Everything needed to spawn a character
#[derive(Debug, Clone)]
pub struct CharacterSpec {
    pub id: String,
    pub name: String,
    pub appearance: Appearance,
    pub personality: Personality,
    pub position: TilePos,
    pub home_desk: Option<String>,
    pub mood: f32,
    pub needs: Needs,
}

impl CharacterSpec {
    /// Minimal spec with neutral appearance, used by tests and tools
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: TilePos) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            appearance: Appearance {
                palette: [
                    Rgb(0xf1, 0xc2, 0x7d),
                    Rgb(0x3b, 0x2a, 0x1a),
                    Rgb(0x4a, 0x7a, 0xbf),
                    Rgb(0x33, 0x33, 0x44),
                ],
                gender: Gender::Neutral,
            },
            personality: Personality::default(),
            position,
            home_desk: None,
            mood: 50.0,
            needs: Needs::default(),
        }
    }

    pub fn with_mood(mut self, mood: f32) -> Self {
        self.mood = mood;
        self
    }

    pub fn with_needs(mut self, needs: Needs) -> Self {
        self.needs = needs;
        self
    }
}

/// Component bundle for spawning
#[derive(Bundle)]
pub struct CharacterBundle {
    pub marker: Character,
    pub id: CharacterId,
    pub name: CharacterName,
    pub appearance: Appearance,
    pub personality: Personality,
    pub position: Position,
    pub facing: Facing,
    pub behavior: Behavior,
    pub mood: Mood,
    pub needs: Needs,
    pub navigation: Navigation,
    pub assignment: Assignment,
    pub decisions: DecisionClock,
}

impl CharacterBundle {
    pub fn from_spec(spec: &CharacterSpec, tick: u64) -> Self {
        Self {
            marker: Character,
            id: CharacterId(spec.id.clone()),
            name: CharacterName(spec.name.clone()),
            appearance: spec.appearance.clone(),
            personality: spec.personality,
            position: Position::from_tile(spec.position),
            facing: Facing::default(),
            behavior: Behavior {
                state: BehaviorState::Idle,
                since_tick: tick,
                until_tick: None,
            },
            mood: Mood(spec.mood.clamp(0.0, 100.0)),
            needs: spec.needs,
            navigation: Navigation::default(),
            assignment: Assignment::default(),
            decisions: DecisionClock::default(),
        }
    }
}
