//! Snapshot Types
//!
//! Serialization structs for map and per-tick state.
//!
//! A `TickSnapshot` captures everything an observer needs to rebuild its
//! view from scratch; the map itself is sent once in `SimEvent::WorldInit`.

use serde::{Deserialize, Serialize};

use crate::{BehaviorState, Direction, Gender, NeedKind, Rgb, SimStatus, SimTime, TileType, ZoneType};

/// Integer tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointSnapshot {
    pub x: i32,
    pub y: i32,
}

impl PointSnapshot {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A named rectangular region of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub zone_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub capacity: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interaction_points: Vec<PointSnapshot>,
}

impl ZoneSnapshot {
    /// Checks if a tile lies inside the zone rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Center of the zone in tile coordinates.
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }
}

/// Static tile grid and zone list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub width: i32,
    pub height: i32,
    /// Row-major tiles, `width * height` entries.
    pub tiles: Vec<TileType>,
    #[serde(default)]
    pub zones: Vec<ZoneSnapshot>,
}

impl MapSnapshot {
    /// Tile at a coordinate, `None` if out of bounds.
    pub fn tile(&self, x: i32, y: i32) -> Option<TileType> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get((y * self.width + x) as usize).copied()
    }
}

/// Character appearance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppearanceSnapshot {
    /// Skin, hair, shirt, trousers.
    pub palette: [Rgb; 4],
    pub gender: Gender,
}

/// Base personality, each trait 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PersonalitySnapshot {
    pub openness: u8,
    pub conscientiousness: u8,
    pub extraversion: u8,
    pub agreeableness: u8,
    pub neuroticism: u8,
}

/// Need values, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NeedsSnapshot {
    pub bladder: f32,
    pub hunger: f32,
    pub thirst: f32,
}

impl NeedsSnapshot {
    pub fn get(&self, need: NeedKind) -> f32 {
        match need {
            NeedKind::Bladder => self.bladder,
            NeedKind::Hunger => self.hunger,
            NeedKind::Thirst => self.thirst,
        }
    }
}

/// Full character snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    pub character_id: String,
    pub name: String,
    pub appearance: AppearanceSnapshot,
    #[serde(default)]
    pub personality: PersonalitySnapshot,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub facing: Direction,
    pub state: BehaviorState,
    pub mood: f32,
    #[serde(default)]
    pub needs: NeedsSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<String>,
}

impl CharacterSnapshot {
    /// First word of the display name, used for labels.
    pub fn short_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// Lifecycle status of a task instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    InProgress,
    Completed,
    Interrupted,
    /// Dropped from the queue because it can never be assigned
    Cancelled,
}

/// Task instance snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub type_id: String,
    pub name: String,
    pub icon: String,
    pub participants: Vec<String>,
    pub progress: f32,
    pub status: TaskStatus,
    pub assigned_tick: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<ZoneType>,
}

/// One spoken line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLineSnapshot {
    pub encounter_id: String,
    pub speaker_id: String,
    pub speaker_name: String,
    pub text: String,
    pub tick: u64,
}

/// Encounter snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSnapshot {
    pub encounter_id: String,
    pub participants: Vec<String>,
    pub zone_id: String,
    pub start_tick: u64,
    #[serde(default)]
    pub lines: Vec<DialogueLineSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f32>,
}

/// An injected world event that is still in effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEventSnapshot {
    pub event_id: String,
    pub kind: String,
    pub description: String,
    pub started_tick: u64,
    pub ends_tick: u64,
}

/// Complete per-tick state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub tick: u64,
    pub sim_time: SimTime,
    #[serde(default)]
    pub status: SimStatus,
    pub characters: Vec<CharacterSnapshot>,
    #[serde(default)]
    pub tasks: Vec<TaskSnapshot>,
    #[serde(default)]
    pub encounters: Vec<EncounterSnapshot>,
    #[serde(default)]
    pub active_events: Vec<ActiveEventSnapshot>,
    #[serde(default)]
    pub dialogue_backlog: Vec<DialogueLineSnapshot>,
}

impl TickSnapshot {
    /// Looks up a character by id.
    pub fn character(&self, character_id: &str) -> Option<&CharacterSnapshot> {
        self.characters
            .iter()
            .find(|c| c.character_id == character_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> MapSnapshot {
        MapSnapshot {
            width: 3,
            height: 2,
            tiles: vec![
                TileType::Wall,
                TileType::Floor,
                TileType::Wall,
                TileType::Floor,
                TileType::Door,
                TileType::Floor,
            ],
            zones: vec![ZoneSnapshot {
                zone_id: "kitchen".into(),
                name: "Kitchen".into(),
                zone_type: ZoneType::Kitchen,
                x: 0,
                y: 1,
                width: 3,
                height: 1,
                capacity: 3,
                interaction_points: vec![],
            }],
        }
    }

    #[test]
    fn test_map_tile_lookup() {
        let map = sample_map();
        assert_eq!(map.tile(1, 0), Some(TileType::Floor));
        assert_eq!(map.tile(1, 1), Some(TileType::Door));
        assert_eq!(map.tile(3, 0), None);
        assert_eq!(map.tile(-1, 0), None);
    }

    #[test]
    fn test_zone_contains() {
        let map = sample_map();
        let zone = &map.zones[0];
        assert!(zone.contains(0, 1));
        assert!(zone.contains(2, 1));
        assert!(!zone.contains(1, 0));
        assert_eq!(zone.center(), (1.5, 1.5));
    }

    #[test]
    fn test_zone_type_field_renamed() {
        let json = serde_json::to_value(&sample_map().zones[0]).unwrap();
        assert_eq!(json["type"], "kitchen");
        assert!(json.get("interaction_points").is_none());
    }

    #[test]
    fn test_short_name() {
        let character = CharacterSnapshot {
            character_id: "c1".into(),
            name: "Dana Whitfield".into(),
            appearance: AppearanceSnapshot {
                palette: [Rgb(0, 0, 0); 4],
                gender: Gender::Female,
            },
            personality: PersonalitySnapshot::default(),
            x: 1.0,
            y: 1.0,
            facing: Direction::Down,
            state: BehaviorState::Idle,
            mood: 50.0,
            needs: NeedsSnapshot::default(),
            task_id: None,
            encounter_id: None,
        };
        assert_eq!(character.short_name(), "Dana");
    }
}
