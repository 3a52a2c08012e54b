//! Task System
//!
//! Assignment, progress, completion and interruption of work tasks.
//!
//! Auto-selection picks idle characters closest (by path length) to the
//! required zone, breaking ties by lowest mood and then by id, so the
//! least engaged people get work first.

use bevy_ecs::prelude::*;
use office_events::{BehaviorState, ErrorScope, SimEvent, TaskSnapshot, TaskStatus};
use std::collections::{HashMap, VecDeque};

use crate::components::{
    Assignment, Behavior, CharacterId, Mood, Navigation, Position, SimClock, SimRng, TravelPurpose,
};
use crate::config::{SimConfig, TaskTypeConfig};
use crate::error::AssignError;
use crate::map::{SpatialMap, TilePos};
use crate::outbox::EventOutbox;
use crate::pathfinding::{plan_path, PathOutcome};
use crate::scheduler::{QueuedTask, TaskInstance, TaskScheduler};

use super::{adjust_mood, character_index, set_state};

struct Candidate {
    entity: Entity,
    id: String,
    tile: TilePos,
    mood: f32,
    free: bool,
}

enum Plan {
    WorkHere,
    Travel(Vec<TilePos>),
}

fn gather_candidates(world: &mut World) -> Vec<Candidate> {
    let mut query = world.query::<(Entity, &CharacterId, &Position, &Behavior, &Assignment, &Mood)>();
    let mut candidates: Vec<Candidate> = query
        .iter(world)
        .map(|(entity, id, position, behavior, assignment, mood)| Candidate {
            entity,
            id: id.0.clone(),
            tile: position.tile(),
            mood: mood.0,
            free: behavior.state == BehaviorState::Idle
                && assignment.task.is_none()
                && assignment.encounter.is_none(),
        })
        .collect();
    candidates.sort_by(|a, b| a.id.cmp(&b.id));
    candidates
}

/// Path distance from a tile to a zone of the required type; 0 when already inside
fn distance_to_zone(map: &SpatialMap, def: &TaskTypeConfig, from: TilePos) -> Option<usize> {
    let Some(zone_type) = def.required_zone else {
        return Some(0);
    };
    let zone = map.nearest_zone_of_type(zone_type, from)?;
    if zone.contains(from) {
        return Some(0);
    }
    plan_path(map, from, zone.center()).step_count()
}

fn select_participants<'a>(
    map: &SpatialMap,
    def: &TaskTypeConfig,
    candidates: &'a [Candidate],
    explicit: Option<&[String]>,
) -> Result<Vec<&'a Candidate>, AssignError> {
    if let Some(ids) = explicit {
        let mut chosen: Vec<&Candidate> = Vec::new();
        for id in ids {
            if chosen.iter().any(|c| &c.id == id) {
                continue;
            }
            let candidate = candidates
                .iter()
                .find(|c| &c.id == id)
                .ok_or_else(|| AssignError::UnknownCharacter(id.clone()))?;
            if !candidate.free {
                return Err(AssignError::NotIdle(id.clone()));
            }
            chosen.push(candidate);
        }
        if chosen.is_empty()
            || chosen.len() < def.min_participants
            || chosen.len() > def.max_participants
        {
            return Err(AssignError::ParticipantCount {
                min: def.min_participants,
                max: def.max_participants,
                got: chosen.len(),
            });
        }
        return Ok(chosen);
    }

    let mut ranked: Vec<(usize, &Candidate)> = candidates
        .iter()
        .filter(|c| c.free)
        .filter_map(|c| distance_to_zone(map, def, c.tile).map(|d| (d, c)))
        .collect();
    ranked.sort_by(|(da, a), (db, b)| {
        da.cmp(db)
            .then_with(|| a.mood.total_cmp(&b.mood))
            .then_with(|| a.id.cmp(&b.id))
    });
    let chosen: Vec<&Candidate> = ranked
        .into_iter()
        .take(def.max_participants)
        .map(|(_, c)| c)
        .collect();
    if chosen.is_empty() || chosen.len() < def.min_participants {
        return Err(AssignError::NoEligibleParticipants);
    }
    Ok(chosen)
}

/// Assigns a task of `type_id`, optionally to explicit characters.
pub fn assign_task(
    world: &mut World,
    type_id: &str,
    explicit: Option<&[String]>,
) -> Result<TaskSnapshot, AssignError> {
    assign_with_id(world, None, type_id, explicit)
}

fn assign_with_id(
    world: &mut World,
    task_id: Option<String>,
    type_id: &str,
    explicit: Option<&[String]>,
) -> Result<TaskSnapshot, AssignError> {
    let def = world
        .resource::<SimConfig>()
        .task_type(type_id)
        .cloned()
        .ok_or_else(|| AssignError::UnknownTaskType(type_id.to_string()))?;
    let candidates = gather_candidates(world);

    let (participants, target_zone, plans) =
        world.resource_scope(|world, mut rng: Mut<SimRng>| {
            let map = world.resource::<SpatialMap>();
            let chosen = select_participants(map, &def, &candidates, explicit)?;

            let zone = match def.required_zone {
                Some(zone_type) => Some(
                    map.nearest_zone_of_type(zone_type, chosen[0].tile)
                        .ok_or_else(|| AssignError::NoZone(zone_type.to_string()))?,
                ),
                None => None,
            };

            let mut plans = Vec::with_capacity(chosen.len());
            for candidate in &chosen {
                let plan = match zone {
                    None => Plan::WorkHere,
                    Some(zone) if zone.contains(candidate.tile) => Plan::WorkHere,
                    Some(zone) => {
                        let target = map
                            .random_position_in_zone(&zone.id, &mut rng.0)
                            .unwrap_or_else(|| zone.center());
                        match plan_path(map, candidate.tile, target) {
                            PathOutcome::Path(steps) => Plan::Travel(steps),
                            PathOutcome::Arrived => Plan::WorkHere,
                            PathOutcome::Unreachable => {
                                return Err(AssignError::NoZone(zone.zone_type.to_string()));
                            }
                        }
                    }
                };
                plans.push((candidate.entity, candidate.id.clone(), plan));
            }
            let participants: Vec<String> = chosen.iter().map(|c| c.id.clone()).collect();
            Ok::<_, AssignError>((participants, zone.map(|z| z.id.clone()), plans))
        })?;

    let tick = world.resource::<SimClock>().current_tick;
    let task_id = task_id.unwrap_or_else(|| world.resource_mut::<TaskScheduler>().next_id());

    for (entity, _, plan) in plans {
        if let Some(mut assignment) = world.get_mut::<Assignment>(entity) {
            assignment.task = Some(task_id.clone());
        }
        match plan {
            Plan::WorkHere => {
                if let Some(mut navigation) = world.get_mut::<Navigation>(entity) {
                    navigation.clear();
                }
                set_state(world, entity, BehaviorState::Working);
            }
            Plan::Travel(steps) => {
                if let Some(mut navigation) = world.get_mut::<Navigation>(entity) {
                    navigation.set_route(steps, TravelPurpose::Task(task_id.clone()));
                }
                set_state(world, entity, BehaviorState::Busy);
            }
        }
        adjust_mood(world, entity, def.start_mood_delta, "task_assigned");
    }

    let task = TaskInstance::new(task_id, &def, participants, target_zone, tick);
    let snapshot = task.to_snapshot();
    tracing::info!(task = %snapshot.task_id, kind = %snapshot.type_id, participants = ?snapshot.participants, "task assigned");
    world.resource_mut::<TaskScheduler>().activate(task);
    world.resource_mut::<EventOutbox>().push(SimEvent::TaskAssigned {
        tick,
        task: snapshot.clone(),
    });
    Ok(snapshot)
}

fn try_queued(world: &mut World, queued: &QueuedTask) -> Result<TaskSnapshot, AssignError> {
    assign_with_id(
        world,
        Some(queued.task_id.clone()),
        &queued.type_id,
        queued.participants.as_deref(),
    )
}

/// Why a participant no longer counts as working on `task_id`
fn participant_problem(world: &World, entity: Option<Entity>, task_id: &str) -> Option<String> {
    let Some(entity) = entity else {
        return Some("left the office".to_string());
    };
    let state = world.get::<Behavior>(entity).map(|b| b.state)?;
    let on_task = world
        .get::<Assignment>(entity)
        .is_some_and(|a| a.task.as_deref() == Some(task_id));
    if on_task && state.requires_task() {
        return None;
    }
    Some(match state {
        BehaviorState::Talking => "was pulled into a conversation".to_string(),
        s if s.satisfying().is_some() => "left to take care of a need".to_string(),
        BehaviorState::Walking => "walked away".to_string(),
        other => format!("stopped working ({})", other),
    })
}

fn release_participant(world: &mut World, entity: Entity, task_id: &str) {
    let owned = world
        .get::<Assignment>(entity)
        .is_some_and(|a| a.task.as_deref() == Some(task_id));
    if !owned {
        return;
    }
    if let Some(mut assignment) = world.get_mut::<Assignment>(entity) {
        assignment.task = None;
    }
    if let Some(mut navigation) = world.get_mut::<Navigation>(entity) {
        navigation.clear();
    }
    set_state(world, entity, BehaviorState::Idle);
}

/// Interrupts an active task: participants still bound to it go idle, its
/// progress is discarded and `TaskInterrupted` is emitted.
pub fn interrupt_task(world: &mut World, task_id: &str, reason: &str) -> bool {
    let tick = world.resource::<SimClock>().current_tick;
    let Some(participants) = world
        .resource::<TaskScheduler>()
        .get(task_id)
        .map(|t| t.participants.clone())
    else {
        return false;
    };
    let index = character_index(world);
    for p in &participants {
        if let Some(&entity) = index.get(p) {
            release_participant(world, entity, task_id);
        }
    }
    let Some(task) = world
        .resource_mut::<TaskScheduler>()
        .finish(task_id, TaskStatus::Interrupted)
    else {
        return false;
    };
    tracing::info!(task = %task_id, %reason, "task interrupted");
    world.resource_mut::<EventOutbox>().push(SimEvent::TaskInterrupted {
        tick,
        task: task.to_snapshot(),
        reason: reason.to_string(),
    });
    true
}

/// Exclusive system: assigns queued tasks, then advances or closes active ones
pub fn advance_tasks(world: &mut World) {
    let tick = world.resource::<SimClock>().current_tick;

    let queue = world.resource_mut::<TaskScheduler>().take_queue();
    let mut remaining = VecDeque::new();
    for queued in queue {
        match try_queued(world, &queued) {
            Ok(_) => {}
            Err(e) if e.is_transient() => {
                tracing::debug!(task = %queued.task_id, error = %e, "queued task still waiting");
                remaining.push_back(queued);
            }
            Err(e) => {
                tracing::warn!(task = %queued.task_id, kind = %queued.type_id, error = %e, "dropping queued task");
                let task_id = queued.task_id.clone();
                world.resource_scope(|world, mut scheduler: Mut<TaskScheduler>| {
                    scheduler.cancel(queued, &world.resource::<SimConfig>().tasks.types);
                });
                world.resource_mut::<EventOutbox>().error(
                    tick,
                    ErrorScope::Task,
                    format!("queued task cannot be assigned: {}", e),
                    Some(&task_id),
                );
            }
        }
    }
    world.resource_mut::<TaskScheduler>().restore_queue(remaining);

    let index: HashMap<String, Entity> = character_index(world);
    let active: Vec<(String, Vec<String>)> = world
        .resource::<TaskScheduler>()
        .active()
        .iter()
        .map(|t| (t.task_id.clone(), t.participants.clone()))
        .collect();

    for (task_id, participants) in active {
        let problem = participants.iter().find_map(|p| {
            participant_problem(world, index.get(p).copied(), &task_id)
                .map(|why| format!("{} {}", p, why))
        });

        if let Some(reason) = problem {
            interrupt_task(world, &task_id, &reason);
            continue;
        }

        let all_working = participants.iter().all(|p| {
            index
                .get(p)
                .and_then(|&e| world.get::<Behavior>(e))
                .is_some_and(|b| b.state == BehaviorState::Working)
        });
        if !all_working {
            continue;
        }

        let done = {
            let mut scheduler = world.resource_mut::<TaskScheduler>();
            match scheduler.active_mut().iter_mut().find(|t| t.task_id == task_id) {
                Some(task) => {
                    task.worked_ticks += 1;
                    task.is_done()
                }
                None => false,
            }
        };
        if !done {
            continue;
        }

        let Some(task) = world
            .resource_mut::<TaskScheduler>()
            .finish(&task_id, TaskStatus::Completed)
        else {
            continue;
        };
        for p in &participants {
            if let Some(&entity) = index.get(p) {
                release_participant(world, entity, &task_id);
                adjust_mood(world, entity, task.completion_mood_bonus, "task_completed");
            }
        }
        tracing::info!(task = %task_id, "task completed");
        world.resource_mut::<EventOutbox>().push(SimEvent::TaskCompleted {
            tick,
            task: task.to_snapshot(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{CharacterBundle, CharacterSpec};
    use crate::map::Zone;
    use office_events::ZoneType;

    fn setup_world(characters: &[(&str, TilePos, f32)]) -> World {
        let mut world = World::new();
        let map = SpatialMap::from_ascii(
            &[
                "###########",
                "#...#.....#",
                "#...+.....#",
                "#...#.....#",
                "###########",
            ],
            vec![
                Zone::new("desk", "Desk", ZoneType::Desk, (1, 1, 3, 3), 2),
                Zone::new("meeting", "Meeting", ZoneType::Meeting, (5, 1, 5, 3), 6),
            ],
        )
        .unwrap();
        world.insert_resource(map);
        world.insert_resource(SimConfig::default());
        world.insert_resource(SimClock::new(500));
        world.insert_resource(SimRng::seeded(3));
        world.insert_resource(EventOutbox::new());
        world.insert_resource(TaskScheduler::new(8));
        for (id, pos, mood) in characters {
            let spec = CharacterSpec::new(*id, id.to_uppercase(), *pos).with_mood(*mood);
            world.spawn(CharacterBundle::from_spec(&spec, 0));
        }
        world
    }

    fn entity(world: &mut World, id: &str) -> Entity {
        character_index(world)[id]
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let mut world = setup_world(&[("c1", TilePos::new(1, 1), 50.0)]);
        assert_eq!(
            assign_task(&mut world, "juggling", None),
            Err(AssignError::UnknownTaskType("juggling".into()))
        );
    }

    #[test]
    fn test_auto_selection_prefers_nearest_then_lowest_mood() {
        let mut world = setup_world(&[
            ("c1", TilePos::new(1, 1), 40.0),
            ("c2", TilePos::new(6, 2), 70.0),
            ("c3", TilePos::new(7, 2), 20.0),
            ("c4", TilePos::new(8, 2), 60.0),
        ]);
        // standup: 2-6 participants in the meeting room
        let task = assign_task(&mut world, "standup", None).unwrap();
        assert_eq!(task.participants[..3], ["c3", "c4", "c2"]);
        assert_eq!(task.participants[3], "c1");

        let e = entity(&mut world, "c3");
        assert_eq!(world.get::<Behavior>(e).unwrap().state, BehaviorState::Working);
        let e = entity(&mut world, "c1");
        assert_eq!(world.get::<Behavior>(e).unwrap().state, BehaviorState::Busy);
        assert_eq!(world.get::<Assignment>(e).unwrap().task.as_deref(), Some(task.task_id.as_str()));
    }

    #[test]
    fn test_explicit_participants_validated() {
        let mut world = setup_world(&[
            ("c1", TilePos::new(1, 1), 50.0),
            ("c2", TilePos::new(2, 2), 50.0),
        ]);
        let only_one = vec!["c1".to_string()];
        assert!(matches!(
            assign_task(&mut world, "standup", Some(&only_one)),
            Err(AssignError::ParticipantCount { got: 1, .. })
        ));
        assert!(matches!(
            assign_task(&mut world, "phone_call", Some(&[])),
            Err(AssignError::ParticipantCount { got: 0, .. })
        ));
        let ghost = vec!["c1".to_string(), "c9".to_string()];
        assert_eq!(
            assign_task(&mut world, "standup", Some(&ghost)),
            Err(AssignError::UnknownCharacter("c9".into()))
        );

        let e = entity(&mut world, "c2");
        world.get_mut::<Behavior>(e).unwrap().transition(BehaviorState::Sitting, 0);
        let pair = vec!["c1".to_string(), "c2".to_string()];
        assert_eq!(
            assign_task(&mut world, "standup", Some(&pair)),
            Err(AssignError::NotIdle("c2".into()))
        );
    }

    #[test]
    fn test_no_eligible_participants() {
        let mut world = setup_world(&[("c1", TilePos::new(1, 1), 50.0)]);
        let e = entity(&mut world, "c1");
        world.get_mut::<Behavior>(e).unwrap().transition(BehaviorState::Talking, 0);
        assert_eq!(
            assign_task(&mut world, "report", None),
            Err(AssignError::NoEligibleParticipants)
        );
    }

    #[test]
    fn test_progress_and_completion() {
        let mut world = setup_world(&[("c1", TilePos::new(2, 2), 50.0)]);
        let task = assign_task(&mut world, "code_review", None).unwrap();
        let duration = SimConfig::default().task_type("code_review").unwrap().duration_ticks;
        let bonus = SimConfig::default().task_type("code_review").unwrap().completion_mood_bonus;
        world.resource_mut::<EventOutbox>().drain();

        let mut last = 0.0;
        for _ in 0..duration - 1 {
            world.resource_mut::<SimClock>().advance();
            advance_tasks(&mut world);
            let progress = world.resource::<TaskScheduler>().get(&task.task_id).unwrap().progress();
            assert!(progress > last && progress < 1.0);
            last = progress;
        }
        world.resource_mut::<SimClock>().advance();
        advance_tasks(&mut world);
        assert!(world.resource::<TaskScheduler>().get(&task.task_id).is_none());

        let e = entity(&mut world, "c1");
        assert_eq!(world.get::<Behavior>(e).unwrap().state, BehaviorState::Idle);
        assert_eq!(world.get::<Mood>(e).unwrap().0, 50.0 + bonus);
        let events = world.resource_mut::<EventOutbox>().drain();
        assert!(matches!(events.last(), Some(SimEvent::TaskCompleted { .. })));
    }

    #[test]
    fn test_interruption_releases_everyone() {
        let mut world = setup_world(&[
            ("c1", TilePos::new(6, 1), 50.0),
            ("c2", TilePos::new(7, 1), 50.0),
        ]);
        let task = assign_task(&mut world, "brainstorm", None).unwrap();
        world.resource_mut::<SimClock>().advance();
        advance_tasks(&mut world);

        let c1 = entity(&mut world, "c1");
        world.get_mut::<Assignment>(c1).unwrap().task = None;
        world.get_mut::<Behavior>(c1).unwrap().transition(BehaviorState::Talking, 1);
        world.resource_mut::<EventOutbox>().drain();

        world.resource_mut::<SimClock>().advance();
        advance_tasks(&mut world);
        let c2 = entity(&mut world, "c2");
        assert_eq!(world.get::<Behavior>(c2).unwrap().state, BehaviorState::Idle);
        assert!(world.get::<Assignment>(c2).unwrap().task.is_none());

        let archived: Vec<_> = world.resource::<TaskScheduler>().archive().cloned().collect();
        assert_eq!(archived[0].task_id, task.task_id);
        assert_eq!(archived[0].status, TaskStatus::Interrupted);
        assert_eq!(archived[0].progress(), 0.0);

        let events = world.resource_mut::<EventOutbox>().drain();
        let reason = events.iter().find_map(|e| match e {
            SimEvent::TaskInterrupted { reason, .. } => Some(reason.clone()),
            _ => None,
        });
        assert_eq!(reason.as_deref(), Some("c1 was pulled into a conversation"));
    }

    #[test]
    fn test_queued_task_waits_for_participants() {
        let mut world = setup_world(&[("c1", TilePos::new(2, 2), 50.0)]);
        let e = entity(&mut world, "c1");
        world.get_mut::<Behavior>(e).unwrap().transition(BehaviorState::Sitting, 0);
        let id = world.resource_mut::<TaskScheduler>().enqueue("report", None, 0);

        world.resource_mut::<SimClock>().advance();
        advance_tasks(&mut world);
        assert_eq!(world.resource::<TaskScheduler>().queued().count(), 1);

        world.get_mut::<Behavior>(e).unwrap().transition(BehaviorState::Idle, 1);
        world.resource_mut::<SimClock>().advance();
        advance_tasks(&mut world);
        assert_eq!(world.resource::<TaskScheduler>().queued().count(), 0);
        assert!(world.resource::<TaskScheduler>().get(&id).is_some());
    }

    #[test]
    fn test_unplaceable_queued_tasks_are_cancelled() {
        let mut world = setup_world(&[("c1", TilePos::new(2, 2), 50.0)]);
        let ghost = world
            .resource_mut::<TaskScheduler>()
            .enqueue("report", Some(vec!["ghost".into()]), 0);
        let too_few = world
            .resource_mut::<TaskScheduler>()
            .enqueue("standup", Some(vec!["c1".into()]), 0);
        let unknown = world.resource_mut::<TaskScheduler>().enqueue("juggling", None, 0);

        for _ in 0..5 {
            world.resource_mut::<SimClock>().advance();
            advance_tasks(&mut world);
        }

        let scheduler = world.resource::<TaskScheduler>();
        assert_eq!(scheduler.queued().count(), 0);
        let cancelled: Vec<&str> = scheduler
            .archive()
            .filter(|t| t.status == TaskStatus::Cancelled)
            .map(|t| t.task_id.as_str())
            .collect();
        assert_eq!(cancelled, vec![ghost.as_str(), too_few.as_str(), unknown.as_str()]);

        let events = world.resource_mut::<EventOutbox>().drain();
        let errors = events
            .iter()
            .filter(|e| matches!(e, SimEvent::Error { scope: ErrorScope::Task, .. }))
            .count();
        assert_eq!(errors, 3);
    }
}
