//! A* Pathfinding
//!
//! Search over the 4-connected tile grid with a Manhattan heuristic. The open
//! set is a `BinaryHeap` with reversed ordering on `(f_score, seq)`, where
//! `seq` is the insertion counter: among equal f-scores the entry pushed first
//! is expanded first. Neighbours are pushed up, right, down, left.
//!
//! Scores live in `Vec`s indexed by tile so the search is deterministic and
//! allocation is bounded by the grid area.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::map::{SpatialMap, TilePos};

/// Radius of the ring search used when the goal tile is not walkable
pub const GOAL_SUBSTITUTE_RADIUS: i32 = 5;

/// Expansion cap as a multiple of the grid area
pub const ITERATION_FACTOR: usize = 4;

/// Result of a path query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    /// Start already equals the (possibly substituted) goal
    Arrived,
    /// No route, no walkable substitute, or the search hit its cap
    Unreachable,
    /// Steps from start to goal, excluding start
    Path(Vec<TilePos>),
}

impl PathOutcome {
    /// Steps to take; empty for both `Arrived` and `Unreachable`
    pub fn into_steps(self) -> Vec<TilePos> {
        match self {
            PathOutcome::Path(steps) => steps,
            PathOutcome::Arrived | PathOutcome::Unreachable => Vec::new(),
        }
    }

    pub fn is_reachable(&self) -> bool {
        !matches!(self, PathOutcome::Unreachable)
    }

    /// Number of steps, `None` when unreachable
    pub fn step_count(&self) -> Option<usize> {
        match self {
            PathOutcome::Arrived => Some(0),
            PathOutcome::Unreachable => None,
            PathOutcome::Path(steps) => Some(steps.len()),
        }
    }

    /// Final tile of the route, if it moves at all
    pub fn destination(&self) -> Option<TilePos> {
        match self {
            PathOutcome::Path(steps) => steps.last().copied(),
            _ => None,
        }
    }
}

struct OpenEntry {
    pos: TilePos,
    f_score: u32,
    seq: u64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f_score == other.f_score && self.seq == other.seq
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest f_score, then earliest insertion.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Plans a route from `start` to `goal`.
///
/// An unwalkable goal is replaced by the nearest walkable tile within
/// [`GOAL_SUBSTITUTE_RADIUS`]. The start tile itself need not be walkable
/// (a character standing on a chair can still leave).
pub fn plan_path(map: &SpatialMap, start: TilePos, goal: TilePos) -> PathOutcome {
    let goal = if map.is_walkable(goal) {
        goal
    } else {
        match map.nearest_walkable(goal, GOAL_SUBSTITUTE_RADIUS) {
            Some(substitute) => substitute,
            None => return PathOutcome::Unreachable,
        }
    };
    if start == goal {
        return PathOutcome::Arrived;
    }
    if !map.in_bounds(start) {
        return PathOutcome::Unreachable;
    }

    let width = map.width() as usize;
    let area = width * map.height() as usize;
    let index = |p: TilePos| p.y as usize * width + p.x as usize;

    let mut g_score = vec![u32::MAX; area];
    let mut came_from: Vec<Option<TilePos>> = vec![None; area];
    let mut closed = vec![false; area];
    let mut open = BinaryHeap::new();
    let mut seq = 0u64;

    g_score[index(start)] = 0;
    open.push(OpenEntry {
        pos: start,
        f_score: start.manhattan(goal),
        seq,
    });

    let max_iterations = area * ITERATION_FACTOR;
    let mut iterations = 0usize;

    while let Some(current) = open.pop() {
        iterations += 1;
        if iterations > max_iterations {
            tracing::debug!(?start, ?goal, "path search exhausted iteration cap");
            return PathOutcome::Unreachable;
        }

        if current.pos == goal {
            return PathOutcome::Path(reconstruct_path(&came_from, index, start, goal));
        }

        let ci = index(current.pos);
        if closed[ci] {
            continue;
        }
        closed[ci] = true;
        let current_g = g_score[ci];

        for neighbor in current.pos.neighbors() {
            if !map.is_walkable(neighbor) {
                continue;
            }
            let ni = index(neighbor);
            if closed[ni] {
                continue;
            }
            let tentative_g = current_g + 1;
            if tentative_g < g_score[ni] {
                g_score[ni] = tentative_g;
                came_from[ni] = Some(current.pos);
                seq += 1;
                open.push(OpenEntry {
                    pos: neighbor,
                    f_score: tentative_g + neighbor.manhattan(goal),
                    seq,
                });
            }
        }
    }

    PathOutcome::Unreachable
}

fn reconstruct_path(
    came_from: &[Option<TilePos>],
    index: impl Fn(TilePos) -> usize,
    start: TilePos,
    goal: TilePos,
) -> Vec<TilePos> {
    let mut steps = vec![goal];
    let mut current = goal;
    while let Some(prev) = came_from[index(current)] {
        if prev == start {
            break;
        }
        steps.push(prev);
        current = prev;
    }
    steps.reverse();
    steps
}

/// List-returning wrapper: steps excluding the start, empty when already
/// there or unreachable. Use [`plan_path`] to tell those apart.
pub fn find_path(map: &SpatialMap, start: TilePos, goal: TilePos) -> Vec<TilePos> {
    plan_path(map, start, goal).into_steps()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Zone;

    fn open_room(width: usize, height: usize) -> SpatialMap {
        let mut rows = Vec::new();
        rows.push("#".repeat(width + 2));
        for _ in 0..height {
            rows.push(format!("#{}#", ".".repeat(width)));
        }
        rows.push("#".repeat(width + 2));
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        SpatialMap::from_ascii(&refs, Vec::<Zone>::new()).unwrap()
    }

    fn assert_valid_path(map: &SpatialMap, start: TilePos, path: &[TilePos]) {
        let mut prev = start;
        for &step in path {
            assert!(prev.is_adjacent(step), "{:?} -> {:?} not adjacent", prev, step);
            assert!(map.is_walkable(step), "{:?} not walkable", step);
            prev = step;
        }
    }

    #[test]
    fn test_same_tile_is_arrived() {
        let map = open_room(3, 3);
        let p = TilePos::new(2, 2);
        assert_eq!(plan_path(&map, p, p), PathOutcome::Arrived);
        assert!(find_path(&map, p, p).is_empty());
    }

    #[test]
    fn test_straight_line_is_shortest() {
        let map = open_room(6, 1);
        let path = find_path(&map, TilePos::new(1, 1), TilePos::new(6, 1));
        assert_eq!(path.len(), 5);
        assert_eq!(path.last(), Some(&TilePos::new(6, 1)));
        assert_valid_path(&map, TilePos::new(1, 1), &path);
    }

    #[test]
    fn test_routes_around_wall() {
        let map = SpatialMap::from_ascii(
            &[
                "#######",
                "#..#..#",
                "#..#..#",
                "#.....#",
                "#######",
            ],
            vec![],
        )
        .unwrap();
        let start = TilePos::new(1, 1);
        let goal = TilePos::new(5, 1);
        let path = find_path(&map, start, goal);
        assert_valid_path(&map, start, &path);
        assert_eq!(path.last(), Some(&goal));
        assert_eq!(path.len(), 8);
    }

    #[test]
    fn test_walled_in_goal_is_unreachable() {
        let map = SpatialMap::from_ascii(
            &[
                "#######",
                "#..#..#",
                "#..#..#",
                "#######",
            ],
            vec![],
        )
        .unwrap();
        let outcome = plan_path(&map, TilePos::new(1, 1), TilePos::new(5, 2));
        assert_eq!(outcome, PathOutcome::Unreachable);
        assert!(find_path(&map, TilePos::new(1, 1), TilePos::new(5, 2)).is_empty());
    }

    #[test]
    fn test_unwalkable_goal_is_substituted() {
        let map = SpatialMap::from_ascii(
            &[
                "#####",
                "#...#",
                "#.D.#",
                "#...#",
                "#####",
            ],
            vec![],
        )
        .unwrap();
        let start = TilePos::new(3, 3);
        let path = find_path(&map, start, TilePos::new(2, 2));
        assert!(!path.is_empty());
        let end = *path.last().unwrap();
        assert_eq!(Some(end), map.nearest_walkable(TilePos::new(2, 2), GOAL_SUBSTITUTE_RADIUS));
        assert_valid_path(&map, start, &path);
    }

    #[test]
    fn test_substitute_equal_to_start_is_arrived() {
        let map = SpatialMap::from_ascii(&["###", "#.#", "###"], vec![]).unwrap();
        assert_eq!(
            plan_path(&map, TilePos::new(1, 1), TilePos::new(0, 0)),
            PathOutcome::Arrived
        );
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let map = open_room(5, 5);
        let a = find_path(&map, TilePos::new(1, 1), TilePos::new(5, 5));
        let b = find_path(&map, TilePos::new(1, 1), TilePos::new(5, 5));
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn test_out_of_bounds_goal_without_walkable_ring() {
        let map = open_room(2, 2);
        assert_eq!(
            plan_path(&map, TilePos::new(1, 1), TilePos::new(40, 40)),
            PathOutcome::Unreachable
        );
    }
}
