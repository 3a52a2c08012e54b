//! Idle Behavior
//!
//! Characters with nothing to do occasionally wander to a social zone or
//! go sit at their desk. When decision generation is enabled they ask the
//! generator instead and act on its answer later.

use bevy_ecs::prelude::*;
use office_events::{BehaviorState, ZoneType};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::components::{
    Assignment, Behavior, CharacterId, CharacterName, DecisionClock, HomeDesk, Mood, Navigation,
    Personality, Position, SimClock, SimRng, TravelPurpose,
};
use crate::config::SimConfig;
use crate::generation::{CharacterContext, Decision, DecisionAction, GenerationKind};
use crate::map::{SpatialMap, TilePos};
use crate::outbox::{EventOutbox, GenerationQueue};
use crate::pathfinding::PathOutcome;

use super::movement::route_to_zone;

/// Picks the zone an idle character heads to. `Rest` goes to the home desk
/// (or the nearest breakroom); `Wander` picks a random social zone other
/// than the current one unless `preferred` names a known zone.
pub fn pick_destination<R: Rng + ?Sized>(
    map: &SpatialMap,
    rng: &mut R,
    from: TilePos,
    action: DecisionAction,
    home: Option<&str>,
    preferred: Option<&str>,
) -> Option<(String, TravelPurpose)> {
    if let Some(zone) = preferred.and_then(|id| map.zone(id)) {
        let purpose = match action {
            DecisionAction::Rest => TravelPurpose::Rest,
            _ => TravelPurpose::Wander,
        };
        return Some((zone.id.clone(), purpose));
    }
    match action {
        DecisionAction::Stay => None,
        DecisionAction::Rest => home
            .and_then(|id| map.zone(id))
            .or_else(|| map.nearest_zone_of_type(ZoneType::Breakroom, from))
            .map(|z| (z.id.clone(), TravelPurpose::Rest)),
        DecisionAction::Wander => {
            let current = map.zone_at(from).map(|z| z.id.as_str());
            let social: Vec<&str> = map
                .zones()
                .iter()
                .filter(|z| z.zone_type.is_social() && Some(z.id.as_str()) != current)
                .map(|z| z.id.as_str())
                .collect();
            social
                .choose(rng)
                .map(|id| (id.to_string(), TravelPurpose::Wander))
        }
    }
}

/// Applies a parsed decision to an idle character. Returns false when the
/// character does not move.
pub fn apply_decision(
    world: &mut World,
    entity: Entity,
    decision: &Decision,
) -> bool {
    let tick = world.resource::<SimClock>().current_tick;
    let Some(from) = world.get::<Position>(entity).map(|p| p.tile()) else {
        return false;
    };
    let home = world.get::<HomeDesk>(entity).map(|h| h.0.clone());

    let route = world.resource_scope(|world, mut rng: Mut<SimRng>| {
        let map = world.resource::<SpatialMap>();
        let (zone_id, purpose) = pick_destination(
            map,
            &mut rng.0,
            from,
            decision.action,
            home.as_deref(),
            decision.zone.as_deref(),
        )?;
        match route_to_zone(map, &mut rng.0, from, &zone_id) {
            PathOutcome::Path(steps) => Some((steps, purpose)),
            PathOutcome::Arrived if purpose == TravelPurpose::Rest => Some((Vec::new(), purpose)),
            _ => None,
        }
    });
    let Some((steps, purpose)) = route else {
        return false;
    };

    let rest = world.resource::<SimConfig>().movement.rest_duration_ticks;
    if steps.is_empty() {
        super::set_state(world, entity, BehaviorState::Sitting);
        if let Some(mut behavior) = world.get_mut::<Behavior>(entity) {
            behavior.until_tick = Some(tick + rest);
        }
        return true;
    }
    if let Some(mut navigation) = world.get_mut::<Navigation>(entity) {
        navigation.set_route(steps, purpose);
    }
    super::set_state(world, entity, BehaviorState::Walking);
    true
}

/// System planning what idle characters do next
#[allow(clippy::type_complexity)]
pub fn plan_idle(
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    map: Res<SpatialMap>,
    mut rng: ResMut<SimRng>,
    mut outbox: ResMut<EventOutbox>,
    mut generation: ResMut<GenerationQueue>,
    mut query: Query<(
        &CharacterId,
        &CharacterName,
        &Position,
        &mut Behavior,
        &mut Navigation,
        &Assignment,
        &Mood,
        &Personality,
        &mut DecisionClock,
        Option<&HomeDesk>,
    )>,
) {
    let tick = clock.current_tick;
    let mut rows: Vec<_> = query.iter_mut().collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    for (id, name, position, mut behavior, mut navigation, assignment, mood, personality, mut decisions, home) in rows {
        if behavior.state != BehaviorState::Idle
            || navigation.is_travelling()
            || assignment.task.is_some()
            || assignment.encounter.is_some()
        {
            continue;
        }
        let tile = position.tile();

        if config.generation.decisions_enabled {
            if decisions.pending.is_some() {
                continue;
            }
            let due = decisions
                .last_request_tick
                .map_or(true, |last| tick >= last + config.generation.decision_interval_ticks);
            if !due {
                continue;
            }
            let request_id = generation.submit(
                tick,
                GenerationKind::Decision {
                    character: CharacterContext {
                        character_id: id.0.clone(),
                        name: name.0.clone(),
                        mood: mood.0,
                        state: behavior.state,
                        personality: personality.to_snapshot(),
                        zone: map.zone_at(tile).map(|z| z.id.clone()),
                    },
                },
            );
            decisions.pending = Some(request_id);
            decisions.last_request_tick = Some(tick);
            continue;
        }

        let chance = (config.movement.wander_chance * (0.5 + personality.sociability())).clamp(0.0, 1.0);
        if !rng.0.gen_bool(chance) {
            continue;
        }
        let action = if home.is_some() && rng.0.gen_bool(0.4) {
            DecisionAction::Rest
        } else {
            DecisionAction::Wander
        };
        let Some((zone_id, purpose)) = pick_destination(
            &map,
            &mut rng.0,
            tile,
            action,
            home.map(|h| h.0.as_str()),
            None,
        ) else {
            continue;
        };
        if let PathOutcome::Path(steps) = route_to_zone(&map, &mut rng.0, tile, &zone_id) {
            tracing::debug!(character = %id.0, zone = %zone_id, ?purpose, "idle character sets off");
            navigation.set_route(steps, purpose);
            if let Some(from) = behavior.transition(BehaviorState::Walking, tick) {
                outbox.state_changed(tick, &id.0, from, BehaviorState::Walking);
            }
        }
    }
}
