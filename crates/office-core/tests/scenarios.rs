//! End-to-end scenarios driven through `Simulation`.

use office_core::config::TaskTypeConfig;
use office_core::{CharacterSpec, SimConfig, Simulation, SpatialMap, TilePos, Zone};
use office_events::{BehaviorState, SimEvent, TaskStatus, ZoneType};

fn quiet_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.movement.wander_chance = 0.0;
    config.mood.drift_per_tick = 0.0;
    config.invariants.strict = true;
    config
}

fn small_room() -> SpatialMap {
    SpatialMap::from_ascii(
        &["#####", "#...#", "#...#", "#...#", "#####"],
        vec![Zone::new("room", "Room", ZoneType::Breakroom, (1, 1, 3, 3), 4)],
    )
    .unwrap()
}

#[test]
fn test_task_completes_after_its_duration() {
    let mut config = quiet_config();
    config.tasks.types.push(TaskTypeConfig {
        id: "filing".into(),
        name: "Filing".into(),
        icon: String::new(),
        required_zone: None,
        duration_ticks: 4,
        min_participants: 1,
        max_participants: 1,
        completion_mood_bonus: 5.0,
        start_mood_delta: 0.0,
    });
    let mut sim = Simulation::with_map(config, small_room()).unwrap();
    sim.add_character(&CharacterSpec::new("c1", "Dana", TilePos::new(2, 2)).with_mood(50.0));

    let task = sim.assign_task("filing", Some(&["c1".to_string()])).unwrap();
    assert_eq!(task.participants, vec!["c1".to_string()]);
    assert_eq!(sim.snapshot().characters[0].state, BehaviorState::Working);

    let mut completed_at = None;
    for _ in 0..6 {
        for event in sim.step() {
            if let SimEvent::TaskCompleted { tick, task } = event {
                assert_eq!(task.status, TaskStatus::Completed);
                completed_at = Some(tick);
            }
        }
    }
    assert_eq!(completed_at, Some(4));

    let snapshot = sim.snapshot();
    let dana = &snapshot.characters[0];
    assert_eq!(dana.state, BehaviorState::Idle);
    assert_eq!(dana.task_id, None);
    assert!((dana.mood - 55.0).abs() < 1e-3);
    let archived = snapshot.tasks.iter().find(|t| t.task_id == task.task_id).unwrap();
    assert_eq!(archived.status, TaskStatus::Completed);
}

#[test]
fn test_room_task_runs_four_ticks_then_completes() {
    let mut config = quiet_config();
    config.tasks.types.push(TaskTypeConfig {
        id: "tidy_up".into(),
        name: "Tidy up".into(),
        icon: String::new(),
        required_zone: Some(ZoneType::Breakroom),
        duration_ticks: 4,
        min_participants: 1,
        max_participants: 1,
        completion_mood_bonus: 6.0,
        start_mood_delta: 0.0,
    });
    let mut sim = Simulation::with_map(config, small_room()).unwrap();
    sim.add_character(&CharacterSpec::new("c1", "Dana", TilePos::new(1, 1)).with_mood(50.0));

    let task = sim.assign_task("tidy_up", None).unwrap();
    assert_eq!(task.participants, vec!["c1".to_string()]);
    assert_eq!(task.zone_type, Some(ZoneType::Breakroom));

    for tick in 1..=3u64 {
        sim.step();
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.characters[0].state, BehaviorState::Working, "tick {}", tick);
        let active = snapshot.tasks.iter().find(|t| t.task_id == task.task_id).unwrap();
        assert_eq!(active.status, TaskStatus::InProgress);
        assert!((active.progress - tick as f32 * 0.25).abs() < 1e-6);
    }

    let events = sim.step();
    assert!(events.iter().any(|e| matches!(
        e,
        SimEvent::TaskCompleted { tick: 4, task: done } if done.task_id == task.task_id
    )));
    let snapshot = sim.snapshot();
    let dana = &snapshot.characters[0];
    assert_eq!(dana.state, BehaviorState::Idle);
    assert!((dana.mood - 56.0).abs() < 1e-3);
    let archived = snapshot.tasks.iter().find(|t| t.task_id == task.task_id).unwrap();
    assert_eq!(archived.status, TaskStatus::Completed);
    assert_eq!(archived.progress, 1.0);
}

#[test]
fn test_impossible_queued_task_is_dropped() {
    let mut sim = Simulation::with_map(quiet_config(), small_room()).unwrap();
    sim.add_character(&CharacterSpec::new("c1", "Dana", TilePos::new(1, 1)));
    for i in 0..20 {
        sim.enqueue_task("phone_call", Some(vec![format!("ghost{}", i)]));
    }
    for _ in 0..10 {
        sim.step();
    }
    let snapshot = sim.snapshot();
    assert!(snapshot.tasks.iter().all(|t| t.status != TaskStatus::Queued));
    assert!(snapshot.tasks.iter().all(|t| t.status == TaskStatus::Cancelled));
}

#[test]
fn test_ended_encounter_respects_pair_cooldown() {
    let mut config = quiet_config();
    config.encounters.rate_limit_ticks = 0;
    config.encounters.pair_cooldown_ticks = 50;
    let mut sim = Simulation::with_map(config, small_room()).unwrap();
    sim.add_character(&CharacterSpec::new("c1", "Dana", TilePos::new(1, 1)));
    sim.add_character(&CharacterSpec::new("c2", "Jun", TilePos::new(2, 1)));

    let started: Vec<String> = sim
        .step()
        .into_iter()
        .filter_map(|e| match e {
            SimEvent::EncounterStarted { encounter_id, .. } => Some(encounter_id),
            _ => None,
        })
        .collect();
    assert_eq!(started.len(), 1);
    assert!(sim
        .snapshot()
        .characters
        .iter()
        .all(|c| c.state == BehaviorState::Talking));

    assert!(sim.end_encounter(&started[0], 0.5));
    assert!(!sim.end_encounter(&started[0], 0.5));
    sim.drain_events();

    for _ in 0..20 {
        let events = sim.step();
        assert!(!events
            .iter()
            .any(|e| matches!(e, SimEvent::EncounterStarted { .. })));
    }
    assert!(sim
        .snapshot()
        .characters
        .iter()
        .all(|c| c.state == BehaviorState::Idle));
}

#[test]
fn test_unknown_task_type_is_rejected() {
    let mut sim = Simulation::with_map(quiet_config(), small_room()).unwrap();
    sim.add_character(&CharacterSpec::new("c1", "Dana", TilePos::new(2, 2)));
    assert!(sim.assign_task("no_such_task", None).is_none());
    assert!(sim.drain_events().is_empty());
}
