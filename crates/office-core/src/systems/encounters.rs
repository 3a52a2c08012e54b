//! Encounter System
//!
//! Pairs up idle characters that share a zone, paces generated dialogue
//! one line at a time and closes conversations.

use bevy_ecs::prelude::*;
use office_events::{BehaviorState, DialogueLineSnapshot, Direction, ErrorScope, SimEvent};
use std::collections::{HashMap, VecDeque};

use crate::components::{
    Assignment, Behavior, CharacterId, CharacterName, Facing, Mood, Navigation, Needs, Personality,
    Position, SimClock, TravelPurpose,
};
use crate::config::SimConfig;
use crate::encounter::{Encounter, EncounterRegistry};
use crate::generation::{CharacterContext, GenerationKind};
use crate::map::SpatialMap;
use crate::outbox::{EventOutbox, GenerationQueue};

use super::{adjust_mood, character_index, set_state};

/// Generator-facing summary of a character
pub(crate) fn character_context(world: &World, entity: Entity) -> CharacterContext {
    let tile = world.get::<Position>(entity).map(|p| p.tile());
    CharacterContext {
        character_id: world.get::<CharacterId>(entity).map(|c| c.0.clone()).unwrap_or_default(),
        name: world.get::<CharacterName>(entity).map(|n| n.0.clone()).unwrap_or_default(),
        mood: world.get::<Mood>(entity).map(|m| m.0).unwrap_or_default(),
        state: world.get::<Behavior>(entity).map(|b| b.state).unwrap_or_default(),
        personality: world
            .get::<Personality>(entity)
            .map(|p| p.to_snapshot())
            .unwrap_or_default(),
        zone: tile.and_then(|t| {
            world
                .resource::<SpatialMap>()
                .zone_at(t)
                .map(|z| z.id.clone())
        }),
    }
}

/// Starts an encounter between two characters. Both stop whatever they were
/// walking to, turn to face each other and start talking; a dialogue
/// request is queued for the generator.
pub fn start_encounter(world: &mut World, a: Entity, b: Entity, zone_id: String) -> String {
    let tick = world.resource::<SimClock>().current_tick;
    let encounter_id = world.resource_mut::<EncounterRegistry>().next_id();

    let pos_a = world.get::<Position>(a).copied();
    let pos_b = world.get::<Position>(b).copied();
    for (me, other) in [(a, pos_b), (b, pos_a)] {
        if let Some(mut navigation) = world.get_mut::<Navigation>(me) {
            navigation.clear();
        }
        if let Some(mut assignment) = world.get_mut::<Assignment>(me) {
            assignment.encounter = Some(encounter_id.clone());
        }
        set_state(world, me, BehaviorState::Talking);

        let Some(mine) = world.get::<Position>(me).copied() else {
            continue;
        };
        let Some(dir) = other.and_then(|o| Direction::from_delta(o.x - mine.x, o.y - mine.y)) else {
            continue;
        };
        if let Some(mut facing) = world.get_mut::<Facing>(me) {
            if facing.0 == dir {
                continue;
            }
            facing.0 = dir;
        }
        let id = world.get::<CharacterId>(me).map(|c| c.0.clone()).unwrap_or_default();
        world
            .resource_mut::<EventOutbox>()
            .moved(tick, &id, mine.x, mine.y, dir);
    }

    let participants = [a, b].map(|e| {
        world
            .get::<CharacterId>(e)
            .map(|c| c.0.clone())
            .unwrap_or_default()
    });
    let zone_name = world
        .resource::<SpatialMap>()
        .zone(&zone_id)
        .map(|z| z.name.clone())
        .unwrap_or_else(|| zone_id.clone());
    let contexts = vec![character_context(world, a), character_context(world, b)];
    let request_id = world.resource_mut::<GenerationQueue>().submit(
        tick,
        GenerationKind::Dialogue {
            encounter_id: encounter_id.clone(),
            zone_name,
            participants: contexts,
        },
    );

    tracing::info!(encounter = %encounter_id, a = %participants[0], b = %participants[1], zone = %zone_id, "encounter started");
    world.resource_mut::<EventOutbox>().push(SimEvent::EncounterStarted {
        tick,
        encounter_id: encounter_id.clone(),
        participants: participants.to_vec(),
        zone_id: zone_id.clone(),
    });
    world.resource_mut::<EncounterRegistry>().begin(Encounter {
        id: encounter_id.clone(),
        participants,
        zone_id,
        start_tick: tick,
        lines: Vec::new(),
        pending_lines: VecDeque::new(),
        script_sentiment: None,
        next_line_tick: tick + 1,
        request_id: Some(request_id),
    });
    encounter_id
}

/// Ends an encounter: participants go idle, mood moves with the sentiment
/// and the pair's cooldown starts. Returns false for unknown ids.
pub fn finish_encounter(
    world: &mut World,
    encounter_id: &str,
    sentiment: f32,
    reason: Option<&str>,
) -> bool {
    let tick = world.resource::<SimClock>().current_tick;
    let Some(encounter) = world.resource_mut::<EncounterRegistry>().end(encounter_id, tick) else {
        return false;
    };
    let sentiment = if sentiment.is_finite() {
        sentiment.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let scale = world.resource::<SimConfig>().mood.encounter_sentiment_scale;
    let index = character_index(world);

    for participant in &encounter.participants {
        let Some(&entity) = index.get(participant) else {
            continue;
        };
        let owned = world
            .get::<Assignment>(entity)
            .is_some_and(|a| a.encounter.as_deref() == Some(encounter_id));
        if !owned {
            continue;
        }
        if let Some(mut assignment) = world.get_mut::<Assignment>(entity) {
            assignment.encounter = None;
        }
        if world.get::<Behavior>(entity).map(|b| b.state) == Some(BehaviorState::Talking) {
            set_state(world, entity, BehaviorState::Idle);
        }
        adjust_mood(world, entity, sentiment * scale, "encounter");
    }

    tracing::info!(encounter = %encounter_id, sentiment, reason = ?reason, "encounter ended");
    world.resource_mut::<EventOutbox>().push(SimEvent::EncounterEnded {
        tick,
        encounter_id: encounter_id.to_string(),
        participants: encounter.participants.to_vec(),
        sentiment,
        reason: reason.map(str::to_string),
    });
    true
}

fn participant_talking(world: &World, entity: Option<Entity>, encounter_id: &str) -> bool {
    let Some(entity) = entity else {
        return false;
    };
    let talking = world.get::<Behavior>(entity).map(|b| b.state) == Some(BehaviorState::Talking);
    let linked = world
        .get::<Assignment>(entity)
        .is_some_and(|a| a.encounter.as_deref() == Some(encounter_id));
    talking && linked
}

/// Releases the next line of an encounter, if one is due
fn release_line(world: &mut World, encounter_id: &str, index: &HashMap<String, Entity>) {
    let tick = world.resource::<SimClock>().current_tick;
    let interval = world.resource::<SimConfig>().encounters.line_interval_ticks.max(1);

    let (script_line, position, participants) = {
        let mut registry = world.resource_mut::<EncounterRegistry>();
        let Some(encounter) = registry.get_mut(encounter_id) else {
            return;
        };
        if tick < encounter.next_line_tick {
            return;
        }
        let Some(line) = encounter.pending_lines.pop_front() else {
            return;
        };
        encounter.next_line_tick = tick + interval;
        (line, encounter.lines.len(), encounter.participants.clone())
    };

    // Generators sometimes answer with display names or unknown speakers.
    let names: Vec<String> = participants
        .iter()
        .map(|p| {
            index
                .get(p)
                .and_then(|&e| world.get::<CharacterName>(e))
                .map(|n| n.0.clone())
                .unwrap_or_else(|| p.clone())
        })
        .collect();
    let speaker_slot = participants
        .iter()
        .position(|p| *p == script_line.speaker)
        .or_else(|| names.iter().position(|n| n.eq_ignore_ascii_case(&script_line.speaker)))
        .unwrap_or(position % 2);

    let snapshot = DialogueLineSnapshot {
        encounter_id: encounter_id.to_string(),
        speaker_id: participants[speaker_slot].clone(),
        speaker_name: names[speaker_slot].clone(),
        text: script_line.text.trim().to_string(),
        tick,
    };
    {
        let mut registry = world.resource_mut::<EncounterRegistry>();
        if let Some(encounter) = registry.get_mut(encounter_id) {
            encounter.lines.push(snapshot.clone());
        }
        registry.record_line(snapshot.clone());
    }
    world
        .resource_mut::<EventOutbox>()
        .push(SimEvent::DialogueLine(snapshot));
}

/// Idle-enough characters that may be pulled into a conversation, by id
fn encounter_candidates(world: &mut World, urgent: f32) -> Vec<(String, Entity, String)> {
    let mut query = world.query::<(
        Entity,
        &CharacterId,
        &Position,
        &Behavior,
        &Assignment,
        &Needs,
        &Navigation,
    )>();
    let map = world.resource::<SpatialMap>();
    let mut rows: Vec<(String, Entity, String)> = query
        .iter(world)
        .filter(|(_, _, _, behavior, assignment, needs, navigation)| {
            behavior.state.is_idle_enough()
                && assignment.task.is_none()
                && assignment.encounter.is_none()
                && needs.most_pressing(urgent).is_none()
                && !matches!(
                    navigation.purpose,
                    TravelPurpose::Need(_) | TravelPurpose::Evacuate
                )
        })
        .filter_map(|(entity, id, position, ..)| {
            map.zone_at(position.tile())
                .map(|zone| (id.0.clone(), entity, zone.id.clone()))
        })
        .collect();
    rows.sort();
    rows
}

/// Exclusive system: paces dialogue, closes finished or broken encounters
/// and starts new ones.
pub fn advance_encounters(world: &mut World) {
    let tick = world.resource::<SimClock>().current_tick;
    let (config, urgent) = {
        let config = world.resource::<SimConfig>();
        (config.encounters.clone(), config.needs.urgent_threshold)
    };
    let index = character_index(world);

    let active: Vec<(String, [String; 2])> = world
        .resource::<EncounterRegistry>()
        .active()
        .iter()
        .map(|e| (e.id.clone(), e.participants.clone()))
        .collect();

    for (encounter_id, participants) in active {
        let intact = participants
            .iter()
            .all(|p| participant_talking(world, index.get(p).copied(), &encounter_id));
        if !intact {
            finish_encounter(world, &encounter_id, 0.0, Some("interrupted"));
            continue;
        }

        release_line(world, &encounter_id, &index);

        let (exhausted, due, waiting_since) = {
            let registry = world.resource::<EncounterRegistry>();
            match registry.get(&encounter_id) {
                Some(e) => (
                    e.is_script_exhausted(),
                    tick >= e.next_line_tick,
                    (e.script_sentiment.is_none()).then_some(e.start_tick),
                ),
                None => continue,
            }
        };

        if exhausted && due {
            let sentiment = world
                .resource::<EncounterRegistry>()
                .get(&encounter_id)
                .and_then(|e| e.script_sentiment)
                .unwrap_or(0.0);
            finish_encounter(world, &encounter_id, sentiment, None);
        } else if let Some(start) = waiting_since {
            if tick >= start + config.timeout_ticks {
                tracing::warn!(encounter = %encounter_id, "dialogue generation timed out");
                finish_encounter(world, &encounter_id, 0.0, Some("timeout"));
                world.resource_mut::<EventOutbox>().error(
                    tick,
                    ErrorScope::Encounter,
                    "dialogue generation timed out",
                    Some(&encounter_id),
                );
            }
        }
    }

    let candidates = encounter_candidates(world, urgent);
    let mut used: Vec<Entity> = Vec::new();
    loop {
        {
            let registry = world.resource::<EncounterRegistry>();
            if !registry.has_capacity(&config)
                || !registry.rate_limit_elapsed(tick, &config)
            {
                break;
            }
        }
        let pair = {
            let registry = world.resource::<EncounterRegistry>();
            let free: Vec<&(String, Entity, String)> =
                candidates.iter().filter(|c| !used.contains(&c.1)).collect();
            free.iter().enumerate().find_map(|(i, a)| {
                free[i + 1..]
                    .iter()
                    .find(|b| {
                        b.2 == a.2 && registry.pair_ready(&a.0, &b.0, tick, &config)
                    })
                    .map(|b| (a.1, b.1, a.2.clone()))
            })
        };
        let Some((a, b, zone_id)) = pair else {
            break;
        };
        used.push(a);
        used.push(b);
        start_encounter(world, a, b, zone_id);
    }
}
