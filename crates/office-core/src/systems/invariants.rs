//! Invariant Checks
//!
//! Runs last in the tick. A character whose state disagrees with its task or
//! encounter references is a bug in some other system; in strict mode that
//! panics, otherwise the character is reported and reset to idle.

use bevy_ecs::prelude::*;
use office_events::{BehaviorState, ErrorScope};

use crate::components::{Assignment, Behavior, CharacterId, Navigation, Position, SimClock};
use crate::config::SimConfig;
use crate::encounter::EncounterRegistry;
use crate::error::SimError;
use crate::map::SpatialMap;
use crate::outbox::EventOutbox;
use crate::scheduler::TaskScheduler;

fn violation(character_id: &str, detail: impl Into<String>) -> SimError {
    SimError::Invariant {
        character_id: character_id.to_string(),
        detail: detail.into(),
    }
}

/// Checks one character against the task and encounter registries
pub fn check_character(
    character_id: &str,
    state: BehaviorState,
    position: &Position,
    assignment: &Assignment,
    map: &SpatialMap,
    tasks: &TaskScheduler,
    encounters: &EncounterRegistry,
) -> Result<(), SimError> {
    if !map.in_bounds(position.tile()) {
        return Err(violation(
            character_id,
            format!("position ({:.1}, {:.1}) is off the map", position.x, position.y),
        ));
    }

    match (&assignment.task, state.requires_task()) {
        (None, true) => return Err(violation(character_id, format!("{} without a task", state))),
        (Some(task_id), false) => {
            return Err(violation(
                character_id,
                format!("holds task {} while {}", task_id, state),
            ))
        }
        (Some(task_id), true) => {
            let owned = tasks
                .get(task_id)
                .is_some_and(|t| t.has_participant(character_id));
            if !owned {
                return Err(violation(
                    character_id,
                    format!("task {} is not active for this character", task_id),
                ));
            }
        }
        (None, false) => {}
    }

    let talking = state == BehaviorState::Talking;
    match (&assignment.encounter, talking) {
        (None, true) => Err(violation(character_id, "talking without an encounter")),
        (Some(encounter_id), false) => Err(violation(
            character_id,
            format!("holds encounter {} while {}", encounter_id, state),
        )),
        (Some(encounter_id), true) => {
            let active = encounters
                .get(encounter_id)
                .is_some_and(|e| e.has_participant(character_id));
            if active {
                Ok(())
            } else {
                Err(violation(
                    character_id,
                    format!("encounter {} is not active", encounter_id),
                ))
            }
        }
        (None, false) => Ok(()),
    }
}

/// System verifying every character after the other systems ran
pub fn enforce_invariants(
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    map: Res<SpatialMap>,
    tasks: Res<TaskScheduler>,
    encounters: Res<EncounterRegistry>,
    mut outbox: ResMut<EventOutbox>,
    mut query: Query<(
        &CharacterId,
        &mut Position,
        &mut Behavior,
        &mut Assignment,
        &mut Navigation,
    )>,
) {
    let tick = clock.current_tick;
    let mut rows: Vec<_> = query.iter_mut().collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    for (id, mut position, mut behavior, mut assignment, mut navigation) in rows {
        let Err(err) = check_character(
            &id.0,
            behavior.state,
            &position,
            &assignment,
            &map,
            &tasks,
            &encounters,
        ) else {
            continue;
        };

        if config.invariants.strict {
            panic!("tick {}: {}", tick, err);
        }
        tracing::warn!(tick, character = %id.0, error = %err, "resetting character to idle");
        outbox.error(tick, ErrorScope::Character, err.to_string(), Some(&id.0));

        if !map.in_bounds(position.tile()) {
            let (x, y) = map.clamp(position.x, position.y);
            *position = Position::new(x, y);
            if let Some(spot) = map.nearest_walkable(position.tile(), map.width().max(map.height())) {
                *position = Position::from_tile(spot);
            }
        }
        assignment.task = None;
        assignment.encounter = None;
        navigation.clear();
        if let Some(from) = behavior.transition(BehaviorState::Idle, tick) {
            outbox.state_changed(tick, &id.0, from, BehaviorState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{CharacterBundle, CharacterSpec};
    use crate::map::TilePos;
    use office_events::SimEvent;

    fn setup(strict: bool) -> (World, Entity) {
        let mut world = World::new();
        let mut config = SimConfig::default();
        config.invariants.strict = strict;
        world.insert_resource(SpatialMap::from_ascii(&["#####", "#...#", "#####"], vec![]).unwrap());
        world.insert_resource(config);
        world.insert_resource(SimClock::new(500));
        world.insert_resource(TaskScheduler::new(8));
        world.insert_resource(EncounterRegistry::new(8));
        world.insert_resource(EventOutbox::new());
        let spec = CharacterSpec::new("c1", "Dana", TilePos::new(1, 1));
        let entity = world.spawn(CharacterBundle::from_spec(&spec, 0)).id();
        (world, entity)
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(enforce_invariants);
        schedule.run(world);
    }

    #[test]
    fn test_consistent_character_passes() {
        let (world, _) = setup(true);
        let map = world.resource::<SpatialMap>();
        let ok = check_character(
            "c1",
            BehaviorState::Idle,
            &Position::new(1.0, 1.0),
            &Assignment::default(),
            map,
            world.resource::<TaskScheduler>(),
            world.resource::<EncounterRegistry>(),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_working_without_task_is_reported() {
        let (world, _) = setup(true);
        let err = check_character(
            "c1",
            BehaviorState::Working,
            &Position::new(1.0, 1.0),
            &Assignment::default(),
            world.resource::<SpatialMap>(),
            world.resource::<TaskScheduler>(),
            world.resource::<EncounterRegistry>(),
        )
        .unwrap_err();
        assert!(matches!(err, SimError::Invariant { .. }));
    }

    #[test]
    fn test_lenient_mode_resets_to_idle() {
        let (mut world, entity) = setup(false);
        world.get_mut::<Behavior>(entity).unwrap().transition(BehaviorState::Talking, 0);
        world.get_mut::<Assignment>(entity).unwrap().encounter = Some("enc_0404".into());
        run(&mut world);

        assert_eq!(world.get::<Behavior>(entity).unwrap().state, BehaviorState::Idle);
        assert_eq!(*world.get::<Assignment>(entity).unwrap(), Assignment::default());
        let events = world.resource_mut::<EventOutbox>().drain();
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::Error { scope: ErrorScope::Character, subject_id: Some(id), .. } if id == "c1"
        )));
    }

    #[test]
    #[should_panic(expected = "invariant violated")]
    fn test_strict_mode_panics() {
        let (mut world, entity) = setup(true);
        world.get_mut::<Behavior>(entity).unwrap().transition(BehaviorState::Busy, 0);
        run(&mut world);
    }
}
