//! Snapshot Generation
//!
//! Builds the full tick snapshot carried by `TickState` and `WorldInit`.

use bevy_ecs::prelude::*;
use office_events::{CharacterSnapshot, TickSnapshot};

use crate::components::{
    Appearance, Assignment, Behavior, CharacterId, CharacterName, Facing, Mood, Needs, Personality,
    Position, SimClock,
};
use crate::config::SimConfig;
use crate::encounter::EncounterRegistry;
use crate::inject::ActiveWorldEvents;
use crate::scheduler::TaskScheduler;

/// Snapshot of every character, sorted by id
pub fn character_snapshots(world: &mut World) -> Vec<CharacterSnapshot> {
    let mut query = world.query::<(
        &CharacterId,
        &CharacterName,
        &Appearance,
        &Personality,
        &Position,
        &Facing,
        &Behavior,
        &Mood,
        &Needs,
        &Assignment,
    )>();
    let mut characters: Vec<CharacterSnapshot> = query
        .iter(world)
        .map(
            |(id, name, appearance, personality, position, facing, behavior, mood, needs, assignment)| {
                CharacterSnapshot {
                    character_id: id.0.clone(),
                    name: name.0.clone(),
                    appearance: appearance.to_snapshot(),
                    personality: personality.to_snapshot(),
                    x: position.x,
                    y: position.y,
                    facing: facing.0,
                    state: behavior.state,
                    mood: mood.0,
                    needs: needs.to_snapshot(),
                    task_id: assignment.task.clone(),
                    encounter_id: assignment.encounter.clone(),
                }
            },
        )
        .collect();
    characters.sort_by(|a, b| a.character_id.cmp(&b.character_id));
    characters
}

/// Generate a complete tick snapshot
pub fn build_snapshot(world: &mut World) -> TickSnapshot {
    let characters = character_snapshots(world);
    let clock = world.resource::<SimClock>();
    let tasks = world
        .resource::<TaskScheduler>()
        .snapshots(&world.resource::<SimConfig>().tasks.types);
    let registry = world.resource::<EncounterRegistry>();

    TickSnapshot {
        tick: clock.current_tick,
        sim_time: clock.sim_time(),
        status: clock.status,
        characters,
        tasks,
        encounters: registry.active().iter().map(|e| e.to_snapshot()).collect(),
        active_events: world.resource::<ActiveWorldEvents>().active().to_vec(),
        dialogue_backlog: registry.backlog().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{CharacterBundle, CharacterSpec};
    use crate::map::TilePos;

    #[test]
    fn test_snapshot_lists_characters_in_id_order() {
        let mut world = World::new();
        world.insert_resource(SimClock::new(500));
        world.insert_resource(SimConfig::default());
        world.insert_resource(TaskScheduler::new(4));
        world.insert_resource(EncounterRegistry::new(4));
        world.insert_resource(ActiveWorldEvents::default());
        for id in ["c3", "c1", "c2"] {
            let spec = CharacterSpec::new(id, "Sam", TilePos::new(2, 3));
            world.spawn(CharacterBundle::from_spec(&spec, 0));
        }
        world.resource_mut::<TaskScheduler>().enqueue("report", None, 0);

        let snapshot = build_snapshot(&mut world);
        let ids: Vec<&str> = snapshot.characters.iter().map(|c| c.character_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(snapshot.characters[0].x, 2.0);
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.tasks[0].name, "Quarterly report");
        assert!(snapshot.encounters.is_empty());
    }
}
