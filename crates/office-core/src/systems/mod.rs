//! ECS Systems
//!
//! Per-tick rules, run in a fixed chain: needs, need relief, movement,
//! tasks, encounters, idle planning, invariant checks, world-event expiry.

pub mod encounters;
pub mod idle;
pub mod invariants;
pub mod movement;
pub mod needs;
pub mod tasks;

use bevy_ecs::prelude::*;
use office_events::BehaviorState;
use std::collections::HashMap;

use crate::components::{Behavior, CharacterId, Mood, SimClock};
use crate::outbox::EventOutbox;

pub use encounters::{advance_encounters, finish_encounter, start_encounter};
pub use idle::plan_idle;
pub use invariants::{check_character, enforce_invariants};
pub use movement::{advance_movement, route_to_zone};
pub use needs::{advance_needs, seek_need_relief};
pub use tasks::{advance_tasks, assign_task, interrupt_task};

/// Builds the per-tick schedule
pub fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            advance_needs,
            seek_need_relief,
            advance_movement,
            advance_tasks,
            advance_encounters,
            plan_idle,
            enforce_invariants,
            crate::inject::expire_world_events,
        )
            .chain(),
    );
    schedule
}

/// Maps character ids to entities
pub(crate) fn character_index(world: &mut World) -> HashMap<String, Entity> {
    let mut query = world.query::<(Entity, &CharacterId)>();
    query
        .iter(world)
        .map(|(entity, id)| (id.0.clone(), entity))
        .collect()
}

/// Character entities sorted by id
pub(crate) fn sorted_characters(world: &mut World) -> Vec<(String, Entity)> {
    let mut query = world.query::<(Entity, &CharacterId)>();
    let mut rows: Vec<(String, Entity)> = query
        .iter(world)
        .map(|(entity, id)| (id.0.clone(), entity))
        .collect();
    rows.sort();
    rows
}

fn character_id(world: &World, entity: Entity) -> String {
    world
        .get::<CharacterId>(entity)
        .map(|c| c.0.clone())
        .unwrap_or_default()
}

/// Transitions a character and emits `StateChanged` when the state changed
pub(crate) fn set_state(world: &mut World, entity: Entity, to: BehaviorState) {
    let tick = world.resource::<SimClock>().current_tick;
    let Some(mut behavior) = world.get_mut::<Behavior>(entity) else {
        return;
    };
    if let Some(from) = behavior.transition(to, tick) {
        let id = character_id(world, entity);
        world
            .resource_mut::<EventOutbox>()
            .state_changed(tick, &id, from, to);
    }
}

/// Adjusts mood and emits `MoodChanged` when the value moved
pub(crate) fn adjust_mood(world: &mut World, entity: Entity, delta: f32, reason: &str) {
    if delta == 0.0 {
        return;
    }
    let tick = world.resource::<SimClock>().current_tick;
    let Some(mut mood) = world.get_mut::<Mood>(entity) else {
        return;
    };
    let applied = mood.adjust(delta);
    let value = mood.0;
    if applied != 0.0 {
        let id = character_id(world, entity);
        world
            .resource_mut::<EventOutbox>()
            .mood_changed(tick, &id, value, applied, reason);
    }
}
