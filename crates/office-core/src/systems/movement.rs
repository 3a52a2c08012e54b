//! Movement System
//!
//! Walks characters along their planned routes and decides what they do on
//! arrival.

use bevy_ecs::prelude::*;
use office_events::{BehaviorState, Direction, ZoneType};
use rand::Rng;

use crate::components::{
    Assignment, Behavior, CharacterId, Facing, Navigation, Position, SimClock, TravelPurpose,
};
use crate::config::SimConfig;
use crate::map::{SpatialMap, TilePos};
use crate::outbox::EventOutbox;
use crate::pathfinding::{plan_path, PathOutcome};

/// Plans a route to a random standing spot in a zone
pub fn route_to_zone<R: Rng + ?Sized>(
    map: &SpatialMap,
    rng: &mut R,
    from: TilePos,
    zone_id: &str,
) -> PathOutcome {
    match map.random_position_in_zone(zone_id, rng) {
        Some(target) => plan_path(map, from, target),
        None => PathOutcome::Unreachable,
    }
}

/// State a character settles into after reaching its destination
fn arrival_state(
    purpose: &TravelPurpose,
    map: &SpatialMap,
    tile: TilePos,
    assignment: &Assignment,
) -> BehaviorState {
    match purpose {
        TravelPurpose::Need(need) => {
            let in_zone = map
                .zone_at(tile)
                .is_some_and(|z| z.zone_type == ZoneType::for_need(*need));
            if in_zone {
                BehaviorState::for_need(*need)
            } else {
                BehaviorState::Idle
            }
        }
        TravelPurpose::Task(task_id) if assignment.task.as_deref() == Some(task_id.as_str()) => {
            BehaviorState::Working
        }
        TravelPurpose::Rest => BehaviorState::Sitting,
        _ => BehaviorState::Idle,
    }
}

/// System advancing characters along their paths
pub fn advance_movement(
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    map: Res<SpatialMap>,
    mut outbox: ResMut<EventOutbox>,
    mut query: Query<(
        &CharacterId,
        &mut Position,
        &mut Facing,
        &mut Behavior,
        &mut Navigation,
        &Assignment,
    )>,
) {
    let tick = clock.current_tick;
    let mut rows: Vec<_> = query.iter_mut().collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    for (id, mut position, mut facing, mut behavior, mut navigation, assignment) in rows {
        if !behavior.state.is_moving() || !navigation.is_travelling() {
            continue;
        }

        let mut current = position.tile();
        for _ in 0..config.movement.tiles_per_tick {
            let Some(next) = navigation.path.pop_front() else {
                break;
            };
            if !map.is_walkable(next) {
                tracing::warn!(character = %id.0, ?next, "route crosses unwalkable tile, dropping it");
                navigation.path.clear();
                break;
            }
            if let Some(dir) = Direction::from_delta((next.x - current.x) as f32, (next.y - current.y) as f32) {
                facing.0 = dir;
            }
            current = next;
        }

        if current != position.tile() {
            *position = Position::from_tile(current);
            outbox.moved(tick, &id.0, position.x, position.y, facing.0);
        }

        if navigation.path.is_empty() {
            let to = arrival_state(&navigation.purpose, &map, current, assignment);
            let rest = navigation.purpose == TravelPurpose::Rest;
            navigation.clear();
            if let Some(from) = behavior.transition(to, tick) {
                outbox.state_changed(tick, &id.0, from, to);
            }
            if rest {
                behavior.until_tick = Some(tick + config.movement.rest_duration_ticks);
            }
        }
    }
}
