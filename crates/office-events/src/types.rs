//! Shared Vocabulary
//!
//! Enums used by both the simulation and its observers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a single map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TileType {
    #[default]
    Floor,
    Wall,
    Desk,
    Door,
    Chair,
    Counter,
    Plant,
    Window,
}

impl TileType {
    /// Tiles a character can stand on.
    pub fn is_walkable(self) -> bool {
        matches!(self, TileType::Floor | TileType::Door)
    }

    /// Returns all tile variants.
    pub fn all() -> &'static [TileType] {
        &[
            TileType::Floor,
            TileType::Wall,
            TileType::Desk,
            TileType::Door,
            TileType::Chair,
            TileType::Counter,
            TileType::Plant,
            TileType::Window,
        ]
    }
}

/// Behavioral tag of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Desk,
    Breakroom,
    Kitchen,
    Meeting,
    Corridor,
    Entrance,
    Bathroom,
    WaterCooler,
}

impl ZoneType {
    /// The zone type that satisfies a need.
    pub fn for_need(need: NeedKind) -> Self {
        match need {
            NeedKind::Bladder => ZoneType::Bathroom,
            NeedKind::Hunger => ZoneType::Kitchen,
            NeedKind::Thirst => ZoneType::WaterCooler,
        }
    }

    /// The need this zone satisfies, if any.
    pub fn satisfies(self) -> Option<NeedKind> {
        match self {
            ZoneType::Bathroom => Some(NeedKind::Bladder),
            ZoneType::Kitchen => Some(NeedKind::Hunger),
            ZoneType::WaterCooler => Some(NeedKind::Thirst),
            _ => None,
        }
    }

    /// Zones characters drift towards when they have nothing to do.
    pub fn is_social(self) -> bool {
        matches!(
            self,
            ZoneType::Breakroom | ZoneType::Kitchen | ZoneType::WaterCooler | ZoneType::Corridor
        )
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ZoneType::Desk => "desk",
            ZoneType::Breakroom => "breakroom",
            ZoneType::Kitchen => "kitchen",
            ZoneType::Meeting => "meeting",
            ZoneType::Corridor => "corridor",
            ZoneType::Entrance => "entrance",
            ZoneType::Bathroom => "bathroom",
            ZoneType::WaterCooler => "water_cooler",
        };
        write!(f, "{}", s)
    }
}

/// Facing direction of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    /// Direction of travel along the dominant axis of `(dx, dy)`.
    ///
    /// Screen coordinates: +y points down. Ties favour the horizontal axis.
    /// Returns `None` for a zero vector.
    pub fn from_delta(dx: f32, dy: f32) -> Option<Self> {
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        if dx.abs() >= dy.abs() {
            Some(if dx > 0.0 { Direction::Right } else { Direction::Left })
        } else {
            Some(if dy > 0.0 { Direction::Down } else { Direction::Up })
        }
    }

    /// Direction facing the opposite way.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Behavior state of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorState {
    #[default]
    Idle,
    Walking,
    Talking,
    Sitting,
    Eating,
    Drinking,
    Bathroom,
    Working,
    /// Travelling to an assigned task.
    Busy,
}

impl BehaviorState {
    /// State a character enters while satisfying a need.
    pub fn for_need(need: NeedKind) -> Self {
        match need {
            NeedKind::Bladder => BehaviorState::Bathroom,
            NeedKind::Hunger => BehaviorState::Eating,
            NeedKind::Thirst => BehaviorState::Drinking,
        }
    }

    /// The need being satisfied in this state, if any.
    pub fn satisfying(self) -> Option<NeedKind> {
        match self {
            BehaviorState::Bathroom => Some(NeedKind::Bladder),
            BehaviorState::Eating => Some(NeedKind::Hunger),
            BehaviorState::Drinking => Some(NeedKind::Thirst),
            _ => None,
        }
    }

    /// States in which the character is following a path.
    pub fn is_moving(self) -> bool {
        matches!(self, BehaviorState::Walking | BehaviorState::Busy)
    }

    /// States that can be interrupted by a conversation.
    pub fn is_idle_enough(self) -> bool {
        matches!(
            self,
            BehaviorState::Idle | BehaviorState::Walking | BehaviorState::Sitting
        )
    }

    /// States tied to a task reference.
    pub fn requires_task(self) -> bool {
        matches!(self, BehaviorState::Working | BehaviorState::Busy)
    }

    /// Returns all behavior variants.
    pub fn all() -> &'static [BehaviorState] {
        &[
            BehaviorState::Idle,
            BehaviorState::Walking,
            BehaviorState::Talking,
            BehaviorState::Sitting,
            BehaviorState::Eating,
            BehaviorState::Drinking,
            BehaviorState::Bathroom,
            BehaviorState::Working,
            BehaviorState::Busy,
        ]
    }
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BehaviorState::Idle => "idle",
            BehaviorState::Walking => "walking",
            BehaviorState::Talking => "talking",
            BehaviorState::Sitting => "sitting",
            BehaviorState::Eating => "eating",
            BehaviorState::Drinking => "drinking",
            BehaviorState::Bathroom => "bathroom",
            BehaviorState::Working => "working",
            BehaviorState::Busy => "busy",
        };
        write!(f, "{}", s)
    }
}

/// One of the three bodily needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedKind {
    Bladder,
    Hunger,
    Thirst,
}

impl NeedKind {
    /// Returns all need variants in a stable order.
    pub fn all() -> [NeedKind; 3] {
        [NeedKind::Bladder, NeedKind::Hunger, NeedKind::Thirst]
    }
}

impl fmt::Display for NeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeedKind::Bladder => write!(f, "bladder"),
            NeedKind::Hunger => write!(f, "hunger"),
            NeedKind::Thirst => write!(f, "thirst"),
        }
    }
}

impl FromStr for NeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bladder" => Ok(NeedKind::Bladder),
            "hunger" => Ok(NeedKind::Hunger),
            "thirst" => Ok(NeedKind::Thirst),
            _ => Err(format!("unknown need: {}", s)),
        }
    }
}

/// Threshold band a need value just crossed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedLevel {
    /// Rose past the urgent threshold.
    Urgent,
    /// Rose past the critical threshold.
    Critical,
    /// Fell back to zero.
    Satisfied,
}

/// Lifecycle status of the simulation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimStatus {
    Running,
    Paused,
    #[default]
    Stopped,
}

/// Appearance gender tag; selects the sprite template variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    #[default]
    Neutral,
}

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parses `#rrggbb` or `rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Rgb(r, g, b))
    }

    /// Formats as `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walkable_set() {
        let walkable: Vec<_> = TileType::all()
            .iter()
            .filter(|t| t.is_walkable())
            .collect();
        assert_eq!(walkable, vec![&TileType::Floor, &TileType::Door]);
    }

    #[test]
    fn test_need_zone_mapping_is_consistent() {
        for need in NeedKind::all() {
            assert_eq!(ZoneType::for_need(need).satisfies(), Some(need));
            assert_eq!(BehaviorState::for_need(need).satisfying(), Some(need));
        }
    }

    #[test]
    fn test_direction_from_delta() {
        assert_eq!(Direction::from_delta(1.0, 0.2), Some(Direction::Right));
        assert_eq!(Direction::from_delta(-0.1, 0.0), Some(Direction::Left));
        assert_eq!(Direction::from_delta(0.3, -2.0), Some(Direction::Up));
        assert_eq!(Direction::from_delta(0.0, 0.5), Some(Direction::Down));
        assert_eq!(Direction::from_delta(0.0, 0.0), None);
    }

    #[test]
    fn test_rgb_hex() {
        assert_eq!(Rgb::from_hex("#ff8000"), Some(Rgb(255, 128, 0)));
        assert_eq!(Rgb(1, 2, 3).to_hex(), "#010203");
        assert_eq!(Rgb::from_hex("zz"), None);
    }

    #[test]
    fn test_behavior_state_serialization() {
        let json = serde_json::to_string(&BehaviorState::Working).unwrap();
        assert_eq!(json, "\"working\"");
        let zone: ZoneType = serde_json::from_str("\"water_cooler\"").unwrap();
        assert_eq!(zone, ZoneType::WaterCooler);
    }
}
