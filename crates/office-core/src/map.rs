//! Spatial Map
//!
//! Static tile grid, named zones and the walkability predicate. Built once
//! per simulation instance and never mutated while ticking.

use bevy_ecs::prelude::*;
use office_events::{MapSnapshot, PointSnapshot, TileType, ZoneSnapshot, ZoneType};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::MapError;

/// Integer grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance
    pub fn manhattan(self, other: TilePos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Checks 4-adjacency
    pub fn is_adjacent(self, other: TilePos) -> bool {
        self.manhattan(other) == 1
    }

    /// Tile containing a fractional position
    pub fn from_world(x: f32, y: f32) -> Self {
        Self::new(x.round() as i32, y.round() as i32)
    }

    /// Neighbours in the fixed expansion order: up, right, down, left
    pub fn neighbors(self) -> [TilePos; 4] {
        [
            TilePos::new(self.x, self.y - 1),
            TilePos::new(self.x + 1, self.y),
            TilePos::new(self.x, self.y + 1),
            TilePos::new(self.x - 1, self.y),
        ]
    }
}

impl From<PointSnapshot> for TilePos {
    fn from(p: PointSnapshot) -> Self {
        TilePos::new(p.x, p.y)
    }
}

impl From<TilePos> for PointSnapshot {
    fn from(p: TilePos) -> Self {
        PointSnapshot::new(p.x, p.y)
    }
}

/// A named rectangular region with a behavioral tag
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub zone_type: ZoneType,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub capacity: u32,
    pub interaction_points: Vec<TilePos>,
}

impl Zone {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        zone_type: ZoneType,
        (x, y, width, height): (i32, i32, i32, i32),
        capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            zone_type,
            x,
            y,
            width,
            height,
            capacity,
            interaction_points: Vec::new(),
        }
    }

    /// Builder-style interaction points
    pub fn with_points(mut self, points: &[(i32, i32)]) -> Self {
        self.interaction_points = points.iter().map(|&(x, y)| TilePos::new(x, y)).collect();
        self
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        pos.x >= self.x
            && pos.x < self.x + self.width
            && pos.y >= self.y
            && pos.y < self.y + self.height
    }

    pub fn center(&self) -> TilePos {
        TilePos::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// All tiles covered by the rectangle, row by row
    pub fn tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| TilePos::new(x, y)))
    }

    pub fn to_snapshot(&self) -> ZoneSnapshot {
        ZoneSnapshot {
            zone_id: self.id.clone(),
            name: self.name.clone(),
            zone_type: self.zone_type,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            capacity: self.capacity,
            interaction_points: self.interaction_points.iter().map(|&p| p.into()).collect(),
        }
    }

    pub fn from_snapshot(snapshot: &ZoneSnapshot) -> Self {
        Self {
            id: snapshot.zone_id.clone(),
            name: snapshot.name.clone(),
            zone_type: snapshot.zone_type,
            x: snapshot.x,
            y: snapshot.y,
            width: snapshot.width,
            height: snapshot.height,
            capacity: snapshot.capacity,
            interaction_points: snapshot
                .interaction_points
                .iter()
                .map(|&p| p.into())
                .collect(),
        }
    }
}

/// Immutable office map resource
#[derive(Resource, Debug, Clone)]
pub struct SpatialMap {
    width: i32,
    height: i32,
    tiles: Vec<TileType>,
    zones: Vec<Zone>,
}

impl SpatialMap {
    /// Builds a map from row-major tiles. Zones are looked up in the order given.
    pub fn new(
        width: i32,
        height: i32,
        tiles: Vec<TileType>,
        zones: Vec<Zone>,
    ) -> Result<Self, MapError> {
        if width <= 0 || height <= 0 || tiles.len() != (width * height) as usize {
            return Err(MapError::TileCount {
                width,
                height,
                got: tiles.len(),
            });
        }
        let mut seen = HashSet::new();
        for zone in &zones {
            if !seen.insert(zone.id.clone()) {
                return Err(MapError::DuplicateZone(zone.id.clone()));
            }
            let in_bounds = zone.x >= 0
                && zone.y >= 0
                && zone.width > 0
                && zone.height > 0
                && zone.x + zone.width <= width
                && zone.y + zone.height <= height;
            if !in_bounds {
                return Err(MapError::ZoneOutOfBounds(zone.id.clone()));
            }
        }
        Ok(Self {
            width,
            height,
            tiles,
            zones,
        })
    }

    /// Parses rows of characters: `#` wall, `.` floor, `D` desk, `+` door,
    /// `c` chair, `=` counter, `p` plant, `w` window. Unknown characters are floor.
    pub fn from_ascii(rows: &[&str], zones: Vec<Zone>) -> Result<Self, MapError> {
        let height = rows.len() as i32;
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0) as i32;
        let mut tiles = Vec::with_capacity((width * height).max(0) as usize);
        for row in rows {
            for ch in row.chars() {
                tiles.push(match ch {
                    '#' => TileType::Wall,
                    'D' => TileType::Desk,
                    '+' => TileType::Door,
                    'c' => TileType::Chair,
                    '=' => TileType::Counter,
                    'p' => TileType::Plant,
                    'w' => TileType::Window,
                    _ => TileType::Floor,
                });
            }
        }
        Self::new(width, height, tiles, zones)
    }

    pub fn from_snapshot(snapshot: &MapSnapshot) -> Result<Self, MapError> {
        Self::new(
            snapshot.width,
            snapshot.height,
            snapshot.tiles.clone(),
            snapshot.zones.iter().map(Zone::from_snapshot).collect(),
        )
    }

    pub fn to_snapshot(&self) -> MapSnapshot {
        MapSnapshot {
            width: self.width,
            height: self.height,
            tiles: self.tiles.clone(),
            zones: self.zones.iter().map(Zone::to_snapshot).collect(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    pub fn tile(&self, pos: TilePos) -> Option<TileType> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.tiles.get((pos.y * self.width + pos.x) as usize).copied()
    }

    /// Bounds-checked walkability
    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.tile(pos).is_some_and(TileType::is_walkable)
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, zone_id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == zone_id)
    }

    /// First zone containing the tile, in declaration order
    pub fn zone_at(&self, pos: TilePos) -> Option<&Zone> {
        self.zones.iter().find(|z| z.contains(pos))
    }

    pub fn zones_of_type(&self, zone_type: ZoneType) -> impl Iterator<Item = &Zone> + '_ {
        self.zones.iter().filter(move |z| z.zone_type == zone_type)
    }

    /// Zone of the given type whose center is closest (Manhattan) to `from`.
    /// Ties keep declaration order.
    pub fn nearest_zone_of_type(&self, zone_type: ZoneType, from: TilePos) -> Option<&Zone> {
        self.zones_of_type(zone_type)
            .min_by_key(|z| z.center().manhattan(from))
    }

    /// Like [`Self::nearest_zone_of_type`] but skips zones whose `occupancy`
    /// has reached their capacity.
    pub fn nearest_open_zone_of_type(
        &self,
        zone_type: ZoneType,
        from: TilePos,
        occupancy: &HashMap<String, u32>,
    ) -> Option<&Zone> {
        self.zones_of_type(zone_type)
            .filter(|z| occupancy.get(&z.id).copied().unwrap_or(0) < z.capacity)
            .min_by_key(|z| z.center().manhattan(from))
    }

    /// Random standing spot in a zone. Interaction points win when the zone
    /// has any walkable ones; otherwise a walkable interior tile is sampled.
    pub fn random_position_in_zone<R: Rng + ?Sized>(
        &self,
        zone_id: &str,
        rng: &mut R,
    ) -> Option<TilePos> {
        let zone = self.zone(zone_id)?;
        let points: Vec<TilePos> = zone
            .interaction_points
            .iter()
            .copied()
            .filter(|&p| self.is_walkable(p))
            .collect();
        if let Some(&p) = points.choose(rng) {
            return Some(p);
        }
        let interior: Vec<TilePos> = zone.tiles().filter(|&p| self.is_walkable(p)).collect();
        interior.choose(rng).copied()
    }

    /// First walkable tile found by expanding square rings around `pos`,
    /// scanning each ring row by row. Radius 0 is `pos` itself.
    pub fn nearest_walkable(&self, pos: TilePos, max_radius: i32) -> Option<TilePos> {
        for radius in 0..=max_radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let candidate = TilePos::new(pos.x + dx, pos.y + dy);
                    if self.is_walkable(candidate) {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// Clamps a fractional position into the grid
    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x.clamp(0.0, (self.width - 1) as f32),
            y.clamp(0.0, (self.height - 1) as f32),
        )
    }

    /// Walkable tiles in the whole map
    pub fn walkable_tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| TilePos::new(x, y)))
            .filter(move |&p| self.is_walkable(p))
    }
}
