//! Character Sprites
//!
//! One shared pixel template, drawn with palette slots instead of colors.
//! A character's sprite sheet is the template recolored with its four
//! colors, built once per character and kept in a cache that is cleared
//! whenever a new simulation instance starts.

use office_events::{AppearanceSnapshot, Direction, Rgb};
use std::collections::HashMap;
use std::sync::Arc;

use crate::animation::{FrameKey, Pose};

pub const SPRITE_WIDTH: usize = 8;
pub const SPRITE_HEIGHT: usize = 12;

const SHOES: Rgb = Rgb(0x22, 0x22, 0x22);
const FEATURES: Rgb = Rgb(0x20, 0x18, 0x18);

// Slots: '.' transparent, 1 skin, 2 hair, 3 shirt, 4 trousers, 5 shoes, 6 features
const HEAD_DOWN: [&str; 6] = [
    "..2222..",
    ".222222.",
    ".211112.",
    ".161161.",
    ".111111.",
    "..1111..",
];
const HEAD_UP: [&str; 6] = [
    "..2222..",
    ".222222.",
    ".222222.",
    ".222222.",
    ".122221.",
    "..1111..",
];
const HEAD_LEFT: [&str; 6] = [
    "..2222..",
    ".222222.",
    ".111222.",
    ".611122.",
    ".111112.",
    "..1111..",
];
const BODY: [[&str; 3]; 2] = [
    [".333333.", "13333331", "13333331"],
    ["..3333..", ".333333.", "13333331"],
];
const LEGS_STAND: [&str; 3] = [".444444.", ".44..44.", ".55..55."];
const LEGS_GAIT: [[&str; 3]; 4] = [
    [".444444.", ".44..44.", ".55..55."],
    [".444444.", "44....4.", "55....5."],
    [".444444.", ".44..44.", ".55..55."],
    [".444444.", ".4....44", ".5....55"],
];

type SlotGrid = [[u8; SPRITE_WIDTH]; SPRITE_HEIGHT];

fn parse_rows(rows: &[&str], into: &mut SlotGrid, offset: usize) {
    for (r, row) in rows.iter().enumerate() {
        for (c, ch) in row.chars().take(SPRITE_WIDTH).enumerate() {
            into[offset + r][c] = ch.to_digit(10).unwrap_or(0) as u8;
        }
    }
}

/// Slot grid for one frame of the shared template
pub fn template(key: FrameKey) -> SlotGrid {
    let mut grid = [[0u8; SPRITE_WIDTH]; SPRITE_HEIGHT];
    let head = match key.facing {
        Direction::Down => &HEAD_DOWN,
        Direction::Up => &HEAD_UP,
        Direction::Left | Direction::Right => &HEAD_LEFT,
    };
    parse_rows(head, &mut grid, 0);

    let (body, legs) = match key.pose {
        Pose::Gait(i) => (&BODY[0], &LEGS_GAIT[i as usize % LEGS_GAIT.len()]),
        Pose::Breath(i) => (&BODY[i as usize % 2], &LEGS_STAND),
        Pose::Talk(_) => (&BODY[0], &LEGS_STAND),
    };
    parse_rows(body, &mut grid, 6);
    parse_rows(legs, &mut grid, 9);

    if key.pose == Pose::Talk(1) {
        match key.facing {
            Direction::Down => {
                grid[5][3] = 6;
                grid[5][4] = 6;
            }
            Direction::Left | Direction::Right => grid[5][2] = 6,
            Direction::Up => {}
        }
    }
    if key.facing == Direction::Right {
        for row in grid.iter_mut() {
            row.reverse();
        }
    }
    grid
}

/// RGBA8 pixels for every frame of one character
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    frames: HashMap<FrameKey, Vec<u8>>,
}

impl SpriteSheet {
    pub fn build(appearance: &AppearanceSnapshot) -> Self {
        let frames = FrameKey::all()
            .into_iter()
            .map(|key| (key, recolor(&template(key), &appearance.palette)))
            .collect();
        Self { frames }
    }

    pub fn frame(&self, key: FrameKey) -> Option<&[u8]> {
        self.frames.get(&key).map(|p| p.as_slice())
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

fn recolor(grid: &SlotGrid, palette: &[Rgb; 4]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(SPRITE_WIDTH * SPRITE_HEIGHT * 4);
    for row in grid {
        for &slot in row {
            let (color, alpha) = match slot {
                1..=4 => (palette[slot as usize - 1], 255),
                5 => (SHOES, 255),
                6 => (FEATURES, 255),
                _ => (Rgb(0, 0, 0), 0),
            };
            pixels.extend_from_slice(&[color.0, color.1, color.2, alpha]);
        }
    }
    pixels
}

/// Sprite sheets by character id
#[derive(Debug, Default)]
pub struct SpriteCache {
    sheets: HashMap<String, Arc<SpriteSheet>>,
}

impl SpriteCache {
    pub fn get_or_build(&mut self, character_id: &str, appearance: &AppearanceSnapshot) -> Arc<SpriteSheet> {
        self.sheets
            .entry(character_id.to_string())
            .or_insert_with(|| Arc::new(SpriteSheet::build(appearance)))
            .clone()
    }

    pub fn contains(&self, character_id: &str) -> bool {
        self.sheets.contains_key(character_id)
    }

    pub fn clear(&mut self) {
        self.sheets.clear();
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}
