//! Viewer-side tests driven by a real simulation.
//!
//! No window is opened: the `Viewer` resource is fed the event stream
//! directly, the same way the live plugin does once per frame.

use office_core::{CannedGenerator, SimConfig, Simulation};
use office_events::{DialogueLineSnapshot, SimEvent};
use office_viz::{Viewer, ViewerConfig};

fn simulation(seed: u64) -> Simulation {
    let mut config = SimConfig::default();
    config.clock.seed = seed;
    config.clock.character_count = 8;
    Simulation::new(config).unwrap()
}

fn step(sim: &mut Simulation) -> Vec<SimEvent> {
    let mut events = sim.step();
    for request in sim.drain_generation_requests() {
        let reply = CannedGenerator::respond(&request);
        sim.apply_generation(request.request_id, Ok(reply));
    }
    events.extend(sim.drain_events());
    events
}

fn line(speaker_id: &str, text: &str, tick: u64) -> SimEvent {
    SimEvent::DialogueLine(DialogueLineSnapshot {
        encounter_id: "e-test".into(),
        speaker_id: speaker_id.into(),
        speaker_name: "Test".into(),
        text: text.into(),
        tick,
    })
}

#[test]
fn test_displayed_positions_stay_near_authoritative() {
    let config = ViewerConfig::default();
    let threshold = config.motion.teleport_threshold;
    let mut sim = simulation(11);
    let mut viewer = Viewer::new(&config);
    viewer.ingest(&sim.world_init_event());
    assert!(viewer.needs_rebuild);

    for _ in 0..150 {
        for event in step(&mut sim) {
            viewer.ingest(&event);
        }
        for _ in 0..3 {
            viewer.advance_frame();
            for c in viewer.state.characters() {
                let shown = viewer.motion.get(&c.character_id).unwrap();
                assert!(
                    shown.distance_to(c.x, c.y) <= threshold,
                    "{} shown {:?} too far from ({}, {})",
                    c.character_id,
                    (shown.x, shown.y),
                    c.x,
                    c.y
                );
            }
        }
    }
    assert_eq!(viewer.state.tick(), 150);
    assert_eq!(viewer.motion.len(), viewer.state.characters().len());
}

#[test]
fn test_dialogue_line_becomes_bubble_at_speaker() {
    let mut sim = simulation(3);
    let mut viewer = Viewer::default();
    viewer.ingest(&sim.world_init_event());
    viewer.advance_frame();

    let speaker = viewer.state.characters()[0].clone();
    viewer.ingest(&line(&speaker.character_id, "Morning!", 1));
    viewer.ingest(&line("nobody", "Who said that?", 1));

    assert_eq!(viewer.bubbles.len(), 1);
    let bubble = viewer.bubbles.bubbles().next().unwrap();
    assert_eq!(bubble.speaker_id, speaker.character_id);
    assert_eq!(bubble.anchor, viewer.position_of(&speaker.character_id).unwrap());
}

#[test]
fn test_new_world_resets_observer() {
    let mut sim = simulation(5);
    let mut viewer = Viewer::default();
    viewer.ingest(&sim.world_init_event());
    for _ in 0..5 {
        for event in step(&mut sim) {
            viewer.ingest(&event);
        }
        viewer.advance_frame();
    }
    let first = viewer.state.characters()[0].clone();
    viewer.sprites.get_or_build(&first.character_id, &first.appearance);
    viewer.ingest(&line(&first.character_id, "Bye", 5));
    viewer.select_next();
    viewer.needs_rebuild = false;
    assert!(!viewer.sprites.is_empty());
    assert!(viewer.selected.is_some());

    let mut restarted = simulation(6);
    viewer.ingest(&restarted.world_init_event());

    assert!(viewer.needs_rebuild);
    assert!(viewer.sprites.is_empty());
    assert!(viewer.bubbles.is_empty());
    assert!(viewer.motion.is_empty());
    assert!(viewer.selected.is_none());
    assert_eq!(viewer.state.tick(), 0);
    assert_eq!(viewer.state.run_id.as_deref(), Some(restarted.run_id()));
}

#[test]
fn test_json_feed_matches_direct_feed() {
    let mut sim = simulation(9);
    let mut direct = Viewer::default();
    let mut wire = Viewer::default();

    let mut events = vec![sim.world_init_event()];
    for _ in 0..40 {
        events.extend(step(&mut sim));
    }
    for event in &events {
        direct.ingest(event);
        let json = serde_json::to_string(event).unwrap();
        let decoded: SimEvent = serde_json::from_str(&json).unwrap();
        wire.ingest(&decoded);
    }

    assert_eq!(direct.state.tick(), wire.state.tick());
    assert_eq!(direct.state.characters(), wire.state.characters());
    assert_eq!(direct.bubbles.len(), wire.bubbles.len());
}
