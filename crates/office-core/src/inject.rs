//! World Event Injection
//!
//! Externally triggered events: fire drills, coffee breaks, forced
//! conversations and direct need overrides. Accepted events are echoed on the
//! stream and stay listed in the snapshot until they expire.

use bevy_ecs::prelude::*;
use office_events::{ActiveEventSnapshot, BehaviorState, NeedKind, SimEvent, SimStatus, ZoneType};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::components::{
    Assignment, Behavior, Navigation, Needs, Position, SimClock, SimRng, TravelPurpose,
};
use crate::encounter::EncounterRegistry;
use crate::error::InjectError;
use crate::map::SpatialMap;
use crate::outbox::EventOutbox;
use crate::pathfinding::PathOutcome;
use crate::scheduler::TaskScheduler;
use crate::systems::{
    character_index, finish_encounter, interrupt_task, route_to_zone, set_state, sorted_characters,
    start_encounter,
};

const FIRE_DRILL_TICKS: u64 = 30;
const COFFEE_BREAK_TICKS: u64 = 20;

/// Zone id recorded for conversations started outside any zone
pub const OPEN_FLOOR: &str = "open_floor";

/// World events currently in effect
#[derive(Resource, Debug, Default)]
pub struct ActiveWorldEvents {
    next_seq: u64,
    events: Vec<ActiveEventSnapshot>,
}

impl ActiveWorldEvents {
    pub fn next_id(&mut self) -> String {
        self.next_seq += 1;
        format!("evt_{:04}", self.next_seq)
    }

    pub fn push(&mut self, event: ActiveEventSnapshot) {
        self.events.push(event);
    }

    pub fn active(&self) -> &[ActiveEventSnapshot] {
        &self.events
    }

    pub fn is_active(&self, kind: &str) -> bool {
        self.events.iter().any(|e| e.kind == kind)
    }

    /// Drops events whose window has closed
    pub fn expire(&mut self, tick: u64) {
        self.events.retain(|e| e.ends_tick > tick);
    }
}

/// System removing expired world events
pub fn expire_world_events(clock: Res<SimClock>, mut events: ResMut<ActiveWorldEvents>) {
    events.expire(clock.current_tick);
}

#[derive(Debug, Default, Deserialize)]
struct TimedPayload {
    duration_ticks: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ForceEncounterPayload {
    a: String,
    b: String,
}

#[derive(Debug, Deserialize)]
struct SetNeedPayload {
    character: String,
    need: NeedKind,
    value: f32,
}

fn parse_payload<T: DeserializeOwned + Default>(payload: &Value) -> Result<T, InjectError> {
    if payload.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(payload.clone()).map_err(|e| InjectError::MalformedPayload(e.to_string()))
}

fn parse_required<T: DeserializeOwned>(payload: &Value) -> Result<T, InjectError> {
    serde_json::from_value(payload.clone()).map_err(|e| InjectError::MalformedPayload(e.to_string()))
}

/// Applies an external event. Rejected events leave the world untouched.
pub fn inject_event(
    world: &mut World,
    kind: &str,
    payload: &Value,
) -> Result<ActiveEventSnapshot, InjectError> {
    if world.resource::<SimClock>().status == SimStatus::Stopped {
        return Err(InjectError::NotRunning);
    }

    let (duration, description) = match kind {
        "fire_drill" => {
            let timed: TimedPayload = parse_payload(payload)?;
            let description = fire_drill(world)?;
            (timed.duration_ticks.unwrap_or(FIRE_DRILL_TICKS), description)
        }
        "coffee_break" => {
            let timed: TimedPayload = parse_payload(payload)?;
            let description = coffee_break(world)?;
            (timed.duration_ticks.unwrap_or(COFFEE_BREAK_TICKS), description)
        }
        "force_encounter" => {
            let pair: ForceEncounterPayload = parse_required(payload)?;
            (1, force_encounter(world, &pair.a, &pair.b)?)
        }
        "set_need" => {
            let change: SetNeedPayload = parse_required(payload)?;
            (1, set_need(world, &change)?)
        }
        other => return Err(InjectError::UnknownKind(other.to_string())),
    };

    let tick = world.resource::<SimClock>().current_tick;
    let event = {
        let mut active = world.resource_mut::<ActiveWorldEvents>();
        let event = ActiveEventSnapshot {
            event_id: active.next_id(),
            kind: kind.to_string(),
            description,
            started_tick: tick,
            ends_tick: tick + duration.max(1),
        };
        active.push(event.clone());
        event
    };
    tracing::info!(event = %event.event_id, %kind, "world event injected");
    world.resource_mut::<EventOutbox>().push(SimEvent::EventInjected {
        tick,
        event: event.clone(),
    });
    Ok(event)
}

/// Sends a character towards a zone. Returns false when it could not move.
fn send_to_zone(world: &mut World, entity: Entity, zone_id: &str, purpose: TravelPurpose) -> bool {
    let Some(from) = world.get::<Position>(entity).map(|p| p.tile()) else {
        return false;
    };
    let outcome = world.resource_scope(|world, mut rng: Mut<SimRng>| {
        route_to_zone(world.resource::<SpatialMap>(), &mut rng.0, from, zone_id)
    });
    match outcome {
        PathOutcome::Path(steps) => {
            if let Some(mut navigation) = world.get_mut::<Navigation>(entity) {
                navigation.set_route(steps, purpose);
            }
            set_state(world, entity, BehaviorState::Walking);
            true
        }
        PathOutcome::Arrived => {
            if let Some(mut navigation) = world.get_mut::<Navigation>(entity) {
                navigation.clear();
            }
            set_state(world, entity, BehaviorState::Idle);
            true
        }
        PathOutcome::Unreachable => false,
    }
}

fn fire_drill(world: &mut World) -> Result<String, InjectError> {
    let entrance = world
        .resource::<SpatialMap>()
        .zones_of_type(ZoneType::Entrance)
        .next()
        .map(|z| z.id.clone())
        .ok_or_else(|| InjectError::Rejected("map has no entrance".to_string()))?;

    let encounters: Vec<String> = world
        .resource::<EncounterRegistry>()
        .active()
        .iter()
        .map(|e| e.id.clone())
        .collect();
    for encounter_id in encounters {
        finish_encounter(world, &encounter_id, 0.0, Some("fire_drill"));
    }
    let tasks: Vec<String> = world
        .resource::<TaskScheduler>()
        .active()
        .iter()
        .map(|t| t.task_id.clone())
        .collect();
    for task_id in tasks {
        interrupt_task(world, &task_id, "fire_drill");
    }

    let mut evacuating = 0;
    for (id, entity) in sorted_characters(world) {
        if send_to_zone(world, entity, &entrance, TravelPurpose::Evacuate) {
            evacuating += 1;
        } else {
            tracing::warn!(character = %id, "no route to the entrance");
        }
    }
    Ok(format!("Fire drill: {} heading to {}", evacuating, entrance))
}

fn coffee_break(world: &mut World) -> Result<String, InjectError> {
    let has_target = world
        .resource::<SpatialMap>()
        .zones()
        .iter()
        .any(|z| matches!(z.zone_type, ZoneType::Kitchen | ZoneType::Breakroom));
    if !has_target {
        return Err(InjectError::Rejected("map has no kitchen or breakroom".to_string()));
    }

    let mut joined = 0;
    for (_, entity) in sorted_characters(world) {
        let free = world.get::<Behavior>(entity).is_some_and(|b| b.state == BehaviorState::Idle)
            && world
                .get::<Assignment>(entity)
                .is_some_and(|a| a.task.is_none() && a.encounter.is_none());
        if !free {
            continue;
        }
        let Some(from) = world.get::<Position>(entity).map(|p| p.tile()) else {
            continue;
        };
        let target = {
            let map = world.resource::<SpatialMap>();
            [ZoneType::Kitchen, ZoneType::Breakroom]
                .into_iter()
                .filter_map(|t| map.nearest_zone_of_type(t, from))
                .min_by_key(|z| z.center().manhattan(from))
                .map(|z| z.id.clone())
        };
        if let Some(zone_id) = target {
            if send_to_zone(world, entity, &zone_id, TravelPurpose::Wander) {
                joined += 1;
            }
        }
    }
    Ok(format!("Coffee break: {} joined", joined))
}

fn force_encounter(world: &mut World, a: &str, b: &str) -> Result<String, InjectError> {
    if a == b {
        return Err(InjectError::Rejected("a character cannot talk to itself".to_string()));
    }
    let index = character_index(world);
    let mut pair = Vec::with_capacity(2);
    for id in [a, b] {
        let entity = *index
            .get(id)
            .ok_or_else(|| InjectError::UnknownCharacter(id.to_string()))?;
        if world.get::<Behavior>(entity).map(|b| b.state) == Some(BehaviorState::Talking) {
            return Err(InjectError::Rejected(format!("{} is already talking", id)));
        }
        pair.push(entity);
    }

    for &entity in &pair {
        let task = world.get::<Assignment>(entity).and_then(|a| a.task.clone());
        if let Some(task_id) = task {
            interrupt_task(world, &task_id, "force_encounter");
        }
        if let Some(mut assignment) = world.get_mut::<Assignment>(entity) {
            assignment.task = None;
        }
    }

    let zone_id = world
        .get::<Position>(pair[0])
        .and_then(|p| world.resource::<SpatialMap>().zone_at(p.tile()))
        .map(|z| z.id.clone())
        .unwrap_or_else(|| OPEN_FLOOR.to_string());
    let encounter_id = start_encounter(world, pair[0], pair[1], zone_id);
    Ok(format!("{} and {} pulled into {}", a, b, encounter_id))
}

fn set_need(world: &mut World, change: &SetNeedPayload) -> Result<String, InjectError> {
    if !change.value.is_finite() {
        return Err(InjectError::MalformedPayload("need value must be finite".to_string()));
    }
    let entity = character_index(world)
        .get(&change.character)
        .copied()
        .ok_or_else(|| InjectError::UnknownCharacter(change.character.clone()))?;
    let mut needs = world
        .get_mut::<Needs>(entity)
        .ok_or_else(|| InjectError::UnknownCharacter(change.character.clone()))?;
    needs.set(change.need, change.value);
    let value = needs.get(change.need);
    Ok(format!("{} {} set to {:.0}", change.character, change.need, value))
}
