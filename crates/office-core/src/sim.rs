//! Simulation Context
//!
//! Owns one ECS world and its tick schedule. Several simulations can live
//! side by side; nothing here is global. Everything observable leaves
//! through `step` and the control operations as `SimEvent`s.

use bevy_ecs::prelude::*;
use office_events::{
    ActiveEventSnapshot, BehaviorState, ErrorScope, SimEvent, SimStatus, TaskSnapshot, TickSnapshot,
};
use rand::Rng;
use serde_json::Value;

use crate::components::{
    Assignment, Behavior, CharacterBundle, CharacterId, CharacterSpec, DecisionClock, HomeDesk,
    Navigation, SimClock, SimRng,
};
use crate::config::SimConfig;
use crate::encounter::EncounterRegistry;
use crate::error::{AssignError, GenerationError, InjectError, SetupError};
use crate::generation::{Decision, DialogueScript, GenerationRequest};
use crate::inject::{self, ActiveWorldEvents};
use crate::map::SpatialMap;
use crate::outbox::{EventOutbox, GenerationQueue};
use crate::scheduler::TaskScheduler;
use crate::setup::{generate_roster, office_layout};
use crate::snapshot::build_snapshot;
use crate::systems::{self, idle::apply_decision};

/// One running office simulation
pub struct Simulation {
    world: World,
    schedule: Schedule,
    run_id: String,
}

impl Simulation {
    /// Default office with a seeded roster of `clock.character_count` people
    pub fn new(config: SimConfig) -> Result<Self, SetupError> {
        let map = office_layout()?;
        let count = config.clock.character_count;
        let mut sim = Self::with_map(config, map)?;
        let roster = {
            let world = &mut sim.world;
            world.resource_scope(|world, mut rng: Mut<SimRng>| {
                generate_roster(world.resource::<SpatialMap>(), count, &mut rng.0)
            })
        };
        for spec in &roster {
            sim.add_character(spec);
        }
        tracing::info!(run_id = %sim.run_id, characters = roster.len(), "simulation created");
        Ok(sim)
    }

    /// Empty simulation on a custom map, already running. The config is
    /// validated first.
    pub fn with_map(config: SimConfig, map: SpatialMap) -> Result<Self, SetupError> {
        config.validate()?;
        let mut rng = SimRng::seeded(config.clock.seed);
        let run_id = uuid::Builder::from_random_bytes(rng.0.gen()).into_uuid().to_string();

        let mut world = World::new();
        let mut clock = SimClock::new(config.clock.tick_interval_ms);
        clock.status = SimStatus::Running;
        world.insert_resource(clock);
        world.insert_resource(rng);
        world.insert_resource(TaskScheduler::new(config.tasks.archive_size));
        world.insert_resource(EncounterRegistry::new(config.encounters.backlog_size));
        world.insert_resource(EventOutbox::new());
        world.insert_resource(GenerationQueue::default());
        world.insert_resource(ActiveWorldEvents::default());
        world.insert_resource(map);
        world.insert_resource(config);

        Ok(Self {
            world,
            schedule: systems::build_schedule(),
            run_id,
        })
    }

    /// Spawns a character, clamped onto the nearest walkable tile
    pub fn add_character(&mut self, spec: &CharacterSpec) -> Entity {
        let tick = self.tick();
        let mut spec = spec.clone();
        let map = self.world.resource::<SpatialMap>();
        if !map.is_walkable(spec.position) {
            if let Some(spot) = map.nearest_walkable(spec.position, map.width().max(map.height())) {
                tracing::warn!(character = %spec.id, from = ?spec.position, to = ?spot, "moved spawn onto floor");
                spec.position = spot;
            }
        }
        let mut entity = self.world.spawn(CharacterBundle::from_spec(&spec, tick));
        if let Some(desk) = &spec.home_desk {
            entity.insert(HomeDesk(desk.clone()));
        }
        entity.id()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn tick(&self) -> u64 {
        self.world.resource::<SimClock>().current_tick
    }

    pub fn status(&self) -> SimStatus {
        self.world.resource::<SimClock>().status
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.world.resource::<SimClock>().tick_interval_ms
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn map(&self) -> &SpatialMap {
        self.world.resource::<SpatialMap>()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access for tools and tests
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn snapshot(&mut self) -> TickSnapshot {
        build_snapshot(&mut self.world)
    }

    /// Full state for an observer attaching now
    pub fn world_init_event(&mut self) -> SimEvent {
        SimEvent::WorldInit {
            run_id: self.run_id.clone(),
            map: self.map().to_snapshot(),
            snapshot: self.snapshot(),
        }
    }

    /// Advances one tick and returns everything it emitted, ending with the
    /// tick snapshot. A stopped simulation does not advance.
    pub fn step(&mut self) -> Vec<SimEvent> {
        if self.status() == SimStatus::Stopped {
            return Vec::new();
        }
        self.world.resource_mut::<SimClock>().advance();
        self.schedule.run(&mut self.world);

        let snapshot = self.snapshot();
        let mut outbox = self.world.resource_mut::<EventOutbox>();
        outbox.push(SimEvent::TickState(snapshot));
        outbox.drain()
    }

    /// Events emitted by control operations since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.world.resource_mut::<EventOutbox>().drain()
    }

    /// Generation requests raised since the last drain
    pub fn drain_generation_requests(&mut self) -> Vec<GenerationRequest> {
        self.world.resource_mut::<GenerationQueue>().drain()
    }

    /// Assigns a task now. `None` when nobody eligible could take it.
    pub fn assign_task(&mut self, type_id: &str, character_ids: Option<&[String]>) -> Option<TaskSnapshot> {
        match self.try_assign_task(type_id, character_ids) {
            Ok(task) => Some(task),
            Err(err) => {
                tracing::info!(%type_id, error = %err, "task not assigned");
                None
            }
        }
    }

    pub fn try_assign_task(
        &mut self,
        type_id: &str,
        character_ids: Option<&[String]>,
    ) -> Result<TaskSnapshot, AssignError> {
        systems::assign_task(&mut self.world, type_id, character_ids)
    }

    /// Queues a task for the scheduler to place on a later tick
    pub fn enqueue_task(&mut self, type_id: &str, participants: Option<Vec<String>>) -> String {
        let tick = self.tick();
        self.world
            .resource_mut::<TaskScheduler>()
            .enqueue(type_id, participants, tick)
    }

    pub fn inject_event(&mut self, kind: &str, payload: &Value) -> Result<ActiveEventSnapshot, InjectError> {
        inject::inject_event(&mut self.world, kind, payload)
    }

    /// Ends an active encounter with the given sentiment
    pub fn end_encounter(&mut self, encounter_id: &str, sentiment: f32) -> bool {
        systems::finish_encounter(&mut self.world, encounter_id, sentiment, None)
    }

    pub fn set_status(&mut self, status: SimStatus) {
        let (tick, interval) = {
            let mut clock = self.world.resource_mut::<SimClock>();
            if clock.status == status {
                return;
            }
            clock.status = status;
            (clock.current_tick, clock.tick_interval_ms)
        };
        tracing::info!(tick, ?status, "simulation status changed");
        self.world.resource_mut::<EventOutbox>().push(SimEvent::Status {
            tick,
            status,
            tick_interval_ms: Some(interval),
        });
    }

    /// Changes the tick cadence without touching the counter
    pub fn set_tick_interval(&mut self, tick_interval_ms: u64) {
        let tick_interval_ms = tick_interval_ms.max(1);
        let (tick, status) = {
            let mut clock = self.world.resource_mut::<SimClock>();
            clock.tick_interval_ms = tick_interval_ms;
            (clock.current_tick, clock.status)
        };
        self.world.resource_mut::<EventOutbox>().push(SimEvent::Status {
            tick,
            status,
            tick_interval_ms: Some(tick_interval_ms),
        });
    }

    /// Stops the simulation. Queued tasks and outstanding generation
    /// requests are dropped so late results find nothing to apply to.
    pub fn stop(&mut self) {
        self.world.resource_mut::<TaskScheduler>().clear_queue();
        self.world.resource_mut::<GenerationQueue>().clear();
        self.world.resource_mut::<EncounterRegistry>().cancel_requests();
        let mut query = self.world.query::<&mut DecisionClock>();
        for mut decisions in query.iter_mut(&mut self.world) {
            decisions.pending = None;
        }
        self.set_status(SimStatus::Stopped);
    }

    /// Applies a generator result. Results for requests that are no longer
    /// outstanding are dropped.
    pub fn apply_generation(&mut self, request_id: u64, result: Result<String, GenerationError>) {
        if self.status() == SimStatus::Stopped {
            tracing::debug!(request_id, "dropping generation result after stop");
            return;
        }

        let encounter_id = self
            .world
            .resource::<EncounterRegistry>()
            .by_request(request_id)
            .map(|e| e.id.clone());
        if let Some(encounter_id) = encounter_id {
            self.apply_dialogue(&encounter_id, result);
            return;
        }

        let mut query = self.world.query::<(Entity, &CharacterId, &DecisionClock)>();
        let owner = query
            .iter(&self.world)
            .find(|(_, _, d)| d.pending == Some(request_id))
            .map(|(entity, id, _)| (entity, id.0.clone()));
        match owner {
            Some((entity, character_id)) => self.apply_decision_result(entity, &character_id, result),
            None => tracing::debug!(request_id, "stale generation result"),
        }
    }

    fn apply_dialogue(&mut self, encounter_id: &str, result: Result<String, GenerationError>) {
        let parsed = result.and_then(|raw| DialogueScript::parse(&raw));
        match parsed {
            Ok(script) => {
                let mut registry = self.world.resource_mut::<EncounterRegistry>();
                if let Some(encounter) = registry.get_mut(encounter_id) {
                    encounter.pending_lines = script.lines.into();
                    encounter.script_sentiment = Some(script.sentiment);
                    encounter.request_id = None;
                }
            }
            Err(err) => {
                let tick = self.tick();
                tracing::warn!(encounter = %encounter_id, error = %err, "dialogue generation failed");
                systems::finish_encounter(&mut self.world, encounter_id, 0.0, Some("generation_failed"));
                self.world.resource_mut::<EventOutbox>().error(
                    tick,
                    ErrorScope::Generation,
                    err.to_string(),
                    Some(encounter_id),
                );
            }
        }
    }

    fn apply_decision_result(
        &mut self,
        entity: Entity,
        character_id: &str,
        result: Result<String, GenerationError>,
    ) {
        if let Some(mut decisions) = self.world.get_mut::<DecisionClock>(entity) {
            decisions.pending = None;
        }
        let decision = match result.and_then(|raw| Decision::parse(&raw)) {
            Ok(decision) => decision,
            Err(err) => {
                let tick = self.tick();
                tracing::warn!(character = %character_id, error = %err, "decision generation failed");
                self.world.resource_mut::<EventOutbox>().error(
                    tick,
                    ErrorScope::Generation,
                    err.to_string(),
                    Some(character_id),
                );
                return;
            }
        };

        let still_idle = self
            .world
            .get::<Behavior>(entity)
            .is_some_and(|b| b.state == BehaviorState::Idle)
            && self
                .world
                .get::<Assignment>(entity)
                .is_some_and(|a| a.task.is_none() && a.encounter.is_none())
            && self
                .world
                .get::<Navigation>(entity)
                .is_some_and(|n| !n.is_travelling());
        if !still_idle {
            tracing::debug!(character = %character_id, "character moved on before its decision arrived");
            return;
        }
        apply_decision(&mut self.world, entity, &decision);
    }
}
