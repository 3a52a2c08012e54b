//! Render Planning
//!
//! Turns the cached world plus displayed motion into an ordered list of
//! things to draw. The static background (tile colors) is built once per
//! map. Characters are ordered by displayed y so lower ones paint on top.

use office_events::{BehaviorState, MapSnapshot, Rgb, TileType, ZoneType};

use crate::animation::{select_frame, FrameKey};
use crate::interpolation::Interpolator;
use crate::state_cache::ObserverState;

/// Longest name drawn under a sprite
pub const MAX_LABEL_CHARS: usize = 8;

pub fn tile_color(tile: TileType) -> Rgb {
    match tile {
        TileType::Floor => Rgb(0xd8, 0xcf, 0xc0),
        TileType::Wall => Rgb(0x4a, 0x4e, 0x5a),
        TileType::Desk => Rgb(0x8b, 0x5e, 0x3c),
        TileType::Door => Rgb(0xb9, 0x8a, 0x52),
        TileType::Chair => Rgb(0x5b, 0x6e, 0x8c),
        TileType::Counter => Rgb(0x9a, 0x9a, 0x9a),
        TileType::Plant => Rgb(0x3f, 0x8f, 0x4a),
        TileType::Window => Rgb(0x9c, 0xd3, 0xe8),
    }
}

pub fn zone_tint(zone: ZoneType) -> Rgb {
    match zone {
        ZoneType::Desk => Rgb(0xe0, 0xd6, 0xc2),
        ZoneType::Breakroom => Rgb(0xe8, 0xd0, 0xb0),
        ZoneType::Kitchen => Rgb(0xf0, 0xe6, 0xc8),
        ZoneType::Meeting => Rgb(0xc8, 0xd4, 0xe4),
        ZoneType::Corridor => Rgb(0xcc, 0xc4, 0xb8),
        ZoneType::Entrance => Rgb(0xd4, 0xcc, 0xe0),
        ZoneType::Bathroom => Rgb(0xc4, 0xe0, 0xe0),
        ZoneType::WaterCooler => Rgb(0xc0, 0xe4, 0xf0),
    }
}

/// RGBA8 background at one pixel per tile. Floor inside a zone takes the
/// zone's tint.
pub fn background_pixels(map: &MapSnapshot) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((map.width * map.height).max(0) as usize * 4);
    for y in 0..map.height {
        for x in 0..map.width {
            let tile = map.tile(x, y).unwrap_or(TileType::Wall);
            let color = match tile {
                TileType::Floor => map
                    .zones
                    .iter()
                    .find(|z| z.contains(x, y))
                    .map(|z| zone_tint(z.zone_type))
                    .unwrap_or_else(|| tile_color(tile)),
                other => tile_color(other),
            };
            pixels.extend_from_slice(&[color.0, color.1, color.2, 255]);
        }
    }
    pixels
}

/// Name as drawn under a sprite: first word, at most [`MAX_LABEL_CHARS`]
pub fn short_label(name: &str) -> String {
    let first = name.split_whitespace().next().unwrap_or(name);
    first.chars().take(MAX_LABEL_CHARS).collect()
}

/// Pulsing factor in 0.5..=1.0 for the selection outline
pub fn highlight_pulse(frame: u64) -> f32 {
    0.75 + 0.25 * (frame as f32 * 0.15).sin()
}

/// Vertical bob in tiles for the work indicator
pub fn indicator_bob(frame: u64) -> f32 {
    0.1 * (frame as f32 * 0.2).sin()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterDraw {
    pub character_id: String,
    /// Displayed position in tiles
    pub x: f32,
    pub y: f32,
    pub frame: FrameKey,
    pub label: String,
    pub selected: bool,
    pub working: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderPlan {
    /// Back to front
    pub characters: Vec<CharacterDraw>,
}

impl RenderPlan {
    pub fn selected(&self) -> Option<&CharacterDraw> {
        self.characters.iter().find(|c| c.selected)
    }
}

/// Builds the draw list for the current frame from displayed positions,
/// falling back to authoritative ones for characters not yet interpolated.
pub fn plan_frame(
    state: &ObserverState,
    motion: &Interpolator,
    selected: Option<&str>,
    frame: u64,
) -> RenderPlan {
    let mut characters: Vec<CharacterDraw> = state
        .characters()
        .iter()
        .map(|c| {
            let (x, y, facing) = match motion.get(&c.character_id) {
                Some(m) => (m.x, m.y, m.facing),
                None => (c.x, c.y, c.facing),
            };
            CharacterDraw {
                character_id: c.character_id.clone(),
                x,
                y,
                frame: select_frame(c.state, facing, frame),
                label: short_label(&c.name),
                selected: selected == Some(c.character_id.as_str()),
                working: c.state == BehaviorState::Working,
            }
        })
        .collect();
    characters.sort_by(|a, b| {
        a.y.total_cmp(&b.y)
            .then_with(|| a.character_id.cmp(&b.character_id))
    });
    RenderPlan { characters }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Pose;
    use office_events::{
        AppearanceSnapshot, CharacterSnapshot, Direction, Gender, SimEvent, SimStatus, SimTime,
        TickSnapshot, ZoneSnapshot,
    };

    fn character(id: &str, name: &str, y: f32, state: BehaviorState) -> CharacterSnapshot {
        CharacterSnapshot {
            character_id: id.into(),
            name: name.into(),
            appearance: AppearanceSnapshot {
                palette: [Rgb(1, 1, 1); 4],
                gender: Gender::Female,
            },
            personality: Default::default(),
            x: 2.0,
            y,
            facing: Direction::Down,
            state,
            mood: 50.0,
            needs: Default::default(),
            task_id: None,
            encounter_id: None,
        }
    }

    fn state_with(characters: Vec<CharacterSnapshot>) -> ObserverState {
        let mut state = ObserverState::default();
        state.apply(&SimEvent::TickState(TickSnapshot {
            tick: 1,
            sim_time: SimTime::from_tick(1),
            status: SimStatus::Running,
            characters,
            tasks: Vec::new(),
            encounters: Vec::new(),
            active_events: Vec::new(),
            dialogue_backlog: Vec::new(),
        }));
        state
    }

    #[test]
    fn test_characters_sorted_by_displayed_y() {
        let state = state_with(vec![
            character("c1", "Dana Whitfield", 5.0, BehaviorState::Idle),
            character("c2", "Jun Tanaka", 2.0, BehaviorState::Working),
            character("c3", "Priya Sato", 8.0, BehaviorState::Walking),
        ]);
        let mut motion = Interpolator::default();
        motion.advance("c3", 2.0, 1.0, Direction::Up);

        let plan = plan_frame(&state, &motion, Some("c1"), 0);
        let order: Vec<&str> = plan.characters.iter().map(|c| c.character_id.as_str()).collect();
        assert_eq!(order, vec!["c3", "c2", "c1"]);
        assert_eq!(plan.selected().map(|c| c.label.as_str()), Some("Dana"));
        assert!(plan.characters[1].working);
        assert_eq!(plan.characters[0].frame.facing, Direction::Up);
        assert_eq!(plan.characters[0].frame.pose, Pose::Gait(0));
    }

    #[test]
    fn test_short_label() {
        assert_eq!(short_label("Alexandria Moreau"), "Alexandr");
        assert_eq!(short_label("Kai"), "Kai");
    }

    #[test]
    fn test_background_tints_zone_floor() {
        let map = MapSnapshot {
            width: 2,
            height: 1,
            tiles: vec![TileType::Floor, TileType::Wall],
            zones: vec![ZoneSnapshot {
                zone_id: "kitchen".into(),
                name: "Kitchen".into(),
                zone_type: ZoneType::Kitchen,
                x: 0,
                y: 0,
                width: 1,
                height: 1,
                capacity: 2,
                interaction_points: Vec::new(),
            }],
        };
        let pixels = background_pixels(&map);
        let kitchen = zone_tint(ZoneType::Kitchen);
        let wall = tile_color(TileType::Wall);
        assert_eq!(&pixels[0..4], &[kitchen.0, kitchen.1, kitchen.2, 255]);
        assert_eq!(&pixels[4..8], &[wall.0, wall.1, wall.2, 255]);
    }

    #[test]
    fn test_pulses_stay_in_range() {
        for frame in 0..500 {
            let pulse = highlight_pulse(frame);
            assert!((0.5..=1.0).contains(&pulse));
            assert!(indicator_bob(frame).abs() <= 0.1);
        }
    }
}
