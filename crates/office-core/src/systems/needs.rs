//! Needs and Mood Systems
//!
//! Needs rise every tick outside a satisfying zone and fall inside one.
//! Characters with an urgent need abandon idle activities (and, once the
//! need turns critical, their work) to walk to the nearest matching zone.

use bevy_ecs::prelude::*;
use std::collections::HashMap;
use office_events::{BehaviorState, NeedKind, NeedLevel, SimEvent, ZoneType};

use crate::components::{
    Assignment, Behavior, CharacterId, Mood, Navigation, Needs, Position, SimClock, SimRng,
    TravelPurpose,
};
use crate::config::{NeedsConfig, SimConfig};
use crate::map::SpatialMap;
use crate::outbox::EventOutbox;
use crate::pathfinding::{plan_path, PathOutcome};

fn rise_rate(config: &NeedsConfig, need: NeedKind) -> f32 {
    match need {
        NeedKind::Bladder => config.bladder_rate,
        NeedKind::Hunger => config.hunger_rate,
        NeedKind::Thirst => config.thirst_rate,
    }
}

/// Threshold band a need entered when moving from `old` to `new`.
/// Critical wins when a single step crosses both thresholds.
pub fn crossed_level(old: f32, new: f32, config: &NeedsConfig) -> Option<NeedLevel> {
    if old < config.critical_threshold && new >= config.critical_threshold {
        Some(NeedLevel::Critical)
    } else if old < config.urgent_threshold && new >= config.urgent_threshold {
        Some(NeedLevel::Urgent)
    } else if old > 0.0 && new <= 0.0 {
        Some(NeedLevel::Satisfied)
    } else {
        None
    }
}

/// System advancing needs, timed rests and mood drift
pub fn advance_needs(
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    map: Res<SpatialMap>,
    mut outbox: ResMut<EventOutbox>,
    mut query: Query<(&CharacterId, &Position, &mut Behavior, &mut Needs, &mut Mood)>,
) {
    let tick = clock.current_tick;
    let mut rows: Vec<_> = query.iter_mut().collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    for (id, position, mut behavior, mut needs, mut mood) in rows {
        let satisfied_here = map
            .zone_at(position.tile())
            .and_then(|zone| zone.zone_type.satisfies());

        for need in NeedKind::all() {
            let old = needs.get(need);
            let new = if satisfied_here == Some(need) {
                old - config.needs.satisfy_rate
            } else {
                old + rise_rate(&config.needs, need)
            };
            needs.set(need, new);
            let new = needs.get(need);

            if let Some(level) = crossed_level(old, new, &config.needs) {
                outbox.push(SimEvent::NeedThreshold {
                    tick,
                    character_id: id.0.clone(),
                    need,
                    level,
                    value: new,
                });
            }

            if behavior.state.satisfying() == Some(need) && new <= 0.0 {
                if let Some(from) = behavior.transition(BehaviorState::Idle, tick) {
                    outbox.state_changed(tick, &id.0, from, BehaviorState::Idle);
                }
            }
        }

        if behavior.state == BehaviorState::Sitting
            && behavior.until_tick.is_some_and(|until| tick >= until)
        {
            if let Some(from) = behavior.transition(BehaviorState::Idle, tick) {
                outbox.state_changed(tick, &id.0, from, BehaviorState::Idle);
            }
        }

        let diff = config.mood.baseline - mood.0;
        let drift = diff.clamp(-config.mood.drift_per_tick, config.mood.drift_per_tick);
        mood.adjust(drift);
        if needs.most_pressing(config.needs.critical_threshold).is_some() {
            mood.adjust(-config.mood.critical_need_penalty);
        }
    }
}

/// Characters standing in each zone or walking to a spot inside it
fn zone_occupancy<'a>(
    map: &SpatialMap,
    characters: impl Iterator<Item = (&'a Position, &'a Navigation)>,
) -> HashMap<String, u32> {
    let mut occupancy = HashMap::new();
    for (position, navigation) in characters {
        let tile = navigation.path.back().copied().unwrap_or_else(|| position.tile());
        if let Some(zone) = map.zone_at(tile) {
            *occupancy.entry(zone.id.clone()).or_default() += 1;
        }
    }
    occupancy
}

/// System sending characters with urgent needs to relief
pub fn seek_need_relief(
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    map: Res<SpatialMap>,
    mut rng: ResMut<SimRng>,
    mut outbox: ResMut<EventOutbox>,
    mut query: Query<(
        &CharacterId,
        &Position,
        &mut Behavior,
        &Needs,
        &mut Navigation,
        &mut Assignment,
    )>,
) {
    let tick = clock.current_tick;
    let mut occupancy = zone_occupancy(&map, query.iter().map(|(_, p, _, _, n, _)| (p, n)));
    let mut rows: Vec<_> = query.iter_mut().collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    for (id, position, mut behavior, needs, mut navigation, mut assignment) in rows {
        let state = behavior.state;
        if state == BehaviorState::Talking || state.satisfying().is_some() {
            continue;
        }
        if matches!(
            navigation.purpose,
            TravelPurpose::Need(_) | TravelPurpose::Evacuate
        ) {
            continue;
        }
        let Some(need) = needs.most_pressing(config.needs.urgent_threshold) else {
            continue;
        };
        if state.requires_task() && needs.get(need) < config.needs.critical_threshold {
            continue;
        }

        let zone_type = ZoneType::for_need(need);
        let tile = position.tile();
        let satisfying = BehaviorState::for_need(need);
        let inside = map.zone_at(tile).is_some_and(|z| z.zone_type == zone_type);
        let open = map.nearest_open_zone_of_type(zone_type, tile, &occupancy);

        if !inside && open.is_none() && map.zones_of_type(zone_type).next().is_some() {
            // Every matching zone is full; retry next tick.
            tracing::trace!(character = %id.0, %zone_type, "need zones at capacity");
            continue;
        }
        if state.requires_task() {
            tracing::debug!(character = %id.0, %need, "critical need pulls character off task");
            assignment.task = None;
        }

        if inside {
            navigation.clear();
            if let Some(from) = behavior.transition(satisfying, tick) {
                outbox.state_changed(tick, &id.0, from, satisfying);
            }
            continue;
        }

        let Some(zone) = open else {
            tracing::debug!(character = %id.0, %zone_type, "no zone satisfies need");
            release_task_state(&mut behavior, &mut navigation, &mut outbox, &id.0, tick);
            continue;
        };
        let target = map
            .random_position_in_zone(&zone.id, &mut rng.0)
            .unwrap_or_else(|| zone.center());

        match plan_path(&map, tile, target) {
            PathOutcome::Path(steps) => {
                *occupancy.entry(zone.id.clone()).or_default() += 1;
                navigation.set_route(steps, TravelPurpose::Need(need));
                if let Some(from) = behavior.transition(BehaviorState::Walking, tick) {
                    outbox.state_changed(tick, &id.0, from, BehaviorState::Walking);
                }
            }
            PathOutcome::Arrived => {
                navigation.clear();
                if let Some(from) = behavior.transition(satisfying, tick) {
                    outbox.state_changed(tick, &id.0, from, satisfying);
                }
            }
            PathOutcome::Unreachable => {
                tracing::debug!(character = %id.0, zone = %zone.id, "need zone unreachable");
                release_task_state(&mut behavior, &mut navigation, &mut outbox, &id.0, tick);
            }
        }
    }
}

/// A character pulled off a task but unable to leave must not keep a
/// task-bound state without a task reference.
fn release_task_state(
    behavior: &mut Behavior,
    navigation: &mut Navigation,
    outbox: &mut EventOutbox,
    character_id: &str,
    tick: u64,
) {
    if behavior.state.requires_task() {
        navigation.clear();
        if let Some(from) = behavior.transition(BehaviorState::Idle, tick) {
            outbox.state_changed(tick, character_id, from, BehaviorState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{CharacterBundle, CharacterSpec};
    use crate::map::{TilePos, Zone};

    fn office_map(kitchen_capacity: u32) -> SpatialMap {
        SpatialMap::from_ascii(
            &[
                "#########",
                "#...#...#",
                "#...+...#",
                "#...#...#",
                "#########",
            ],
            vec![
                Zone::new("kitchen", "Kitchen", ZoneType::Kitchen, (5, 1, 3, 3), kitchen_capacity),
                Zone::new("office", "Office", ZoneType::Desk, (1, 1, 3, 3), 4),
            ],
        )
        .unwrap()
    }

    fn setup_world(position: TilePos, needs: Needs) -> (World, Entity) {
        let mut world = World::new();
        world.insert_resource(office_map(4));
        world.insert_resource(SimConfig::default());
        let mut clock = SimClock::new(500);
        clock.current_tick = 1;
        world.insert_resource(clock);
        world.insert_resource(SimRng::seeded(7));
        world.insert_resource(EventOutbox::new());
        let spec = CharacterSpec::new("c1", "Dana", position).with_needs(needs);
        let entity = world.spawn(CharacterBundle::from_spec(&spec, 0)).id();
        (world, entity)
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems((advance_needs, seek_need_relief).chain());
        schedule.run(world);
    }

    #[test]
    fn test_needs_rise_outside_satisfying_zone() {
        let (mut world, entity) = setup_world(TilePos::new(1, 1), Needs::default());
        let rate = SimConfig::default().needs.hunger_rate;
        for _ in 0..5 {
            let before = *world.get::<Needs>(entity).unwrap();
            run(&mut world);
            let after = *world.get::<Needs>(entity).unwrap();
            for need in NeedKind::all() {
                assert!(after.get(need) >= before.get(need));
            }
        }
        let hunger = world.get::<Needs>(entity).unwrap().hunger;
        assert!((hunger - rate * 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_hunger_falls_in_kitchen_and_character_idles_at_zero() {
        let needs = Needs {
            hunger: 10.0,
            ..Default::default()
        };
        let (mut world, entity) = setup_world(TilePos::new(6, 2), needs);
        world
            .get_mut::<Behavior>(entity)
            .unwrap()
            .transition(BehaviorState::Eating, 0);

        run(&mut world);
        assert_eq!(world.get::<Needs>(entity).unwrap().hunger, 2.0);
        assert_eq!(world.get::<Behavior>(entity).unwrap().state, BehaviorState::Eating);

        run(&mut world);
        assert_eq!(world.get::<Needs>(entity).unwrap().hunger, 0.0);
        assert_eq!(world.get::<Behavior>(entity).unwrap().state, BehaviorState::Idle);

        let events = world.resource_mut::<EventOutbox>().drain();
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::NeedThreshold { level: NeedLevel::Satisfied, need: NeedKind::Hunger, .. }
        )));
    }

    #[test]
    fn test_urgent_need_sends_character_to_zone() {
        let needs = Needs {
            hunger: 59.9,
            ..Default::default()
        };
        let (mut world, entity) = setup_world(TilePos::new(1, 2), needs);
        run(&mut world);

        assert_eq!(world.get::<Behavior>(entity).unwrap().state, BehaviorState::Walking);
        let navigation = world.get::<Navigation>(entity).unwrap();
        assert_eq!(navigation.purpose, TravelPurpose::Need(NeedKind::Hunger));
        let goal = *navigation.path.back().unwrap();
        assert!(goal.x >= 5);

        let events = world.resource_mut::<EventOutbox>().drain();
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::NeedThreshold { level: NeedLevel::Urgent, .. }
        )));
    }

    #[test]
    fn test_urgent_need_does_not_preempt_work_until_critical() {
        let needs = Needs {
            thirst: 70.0,
            ..Default::default()
        };
        let (mut world, entity) = setup_world(TilePos::new(1, 2), needs);
        world.get_mut::<Behavior>(entity).unwrap().transition(BehaviorState::Working, 0);
        world.get_mut::<Assignment>(entity).unwrap().task = Some("task_0001".into());

        run(&mut world);
        assert_eq!(world.get::<Behavior>(entity).unwrap().state, BehaviorState::Working);

        world.get_mut::<Needs>(entity).unwrap().thirst = 90.0;
        run(&mut world);
        // No water cooler on this map: the character is released from work.
        assert_eq!(world.get::<Assignment>(entity).unwrap().task, None);
        assert_eq!(world.get::<Behavior>(entity).unwrap().state, BehaviorState::Idle);
    }

    #[test]
    fn test_full_zone_is_not_chosen() {
        let hungry = Needs {
            hunger: 70.0,
            ..Default::default()
        };
        let (mut world, first) = setup_world(TilePos::new(1, 2), hungry);
        world.insert_resource(office_map(1));
        let spec = CharacterSpec::new("c2", "Eli", TilePos::new(1, 1)).with_needs(hungry);
        let second = world.spawn(CharacterBundle::from_spec(&spec, 1)).id();

        run(&mut world);
        let navigation = world.get::<Navigation>(first).unwrap();
        assert_eq!(navigation.purpose, TravelPurpose::Need(NeedKind::Hunger));
        assert!(world.get::<Navigation>(second).unwrap().path.is_empty());
        assert_eq!(world.get::<Behavior>(second).unwrap().state, BehaviorState::Idle);

        // The seat frees up once the first character gives up the trip.
        world.get_mut::<Navigation>(first).unwrap().clear();
        world.get_mut::<Needs>(first).unwrap().hunger = 0.0;
        run(&mut world);
        let navigation = world.get::<Navigation>(second).unwrap();
        assert_eq!(navigation.purpose, TravelPurpose::Need(NeedKind::Hunger));
        assert!(navigation.path.back().unwrap().x >= 5);
    }

    #[test]
    fn test_crossed_level() {
        let config = NeedsConfig::default();
        assert_eq!(crossed_level(59.0, 60.0, &config), Some(NeedLevel::Urgent));
        assert_eq!(crossed_level(50.0, 90.0, &config), Some(NeedLevel::Critical));
        assert_eq!(crossed_level(3.0, 0.0, &config), Some(NeedLevel::Satisfied));
        assert_eq!(crossed_level(0.0, 0.0, &config), None);
        assert_eq!(crossed_level(61.0, 62.0, &config), None);
    }
}
