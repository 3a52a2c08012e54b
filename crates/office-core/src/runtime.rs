//! Simulation Runtime
//!
//! Drives a `Simulation` from a single tokio task. Ticks are paced by a
//! one-shot deadline re-armed after each tick, so ticks never overlap.
//! Control requests arrive over a command channel and generator calls run
//! as spawned tasks whose results come back into the same loop.

use office_events::{ActiveEventSnapshot, SimEvent, SimStatus, TaskSnapshot, TickSnapshot};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};

use crate::config::SimConfig;
use crate::error::{ControlError, GenerationError, InjectError, SetupError};
use crate::generation::DialogueGenerator;
use crate::hub::EventHub;
use crate::sim::Simulation;

const COMMAND_QUEUE: usize = 64;

enum Command {
    Subscribe(oneshot::Sender<mpsc::Receiver<SimEvent>>),
    Pause(oneshot::Sender<()>),
    Resume(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
    SetTickInterval(u64, oneshot::Sender<()>),
    AssignTask {
        type_id: String,
        character_ids: Option<Vec<String>>,
        reply: oneshot::Sender<Option<TaskSnapshot>>,
    },
    EnqueueTask {
        type_id: String,
        participants: Option<Vec<String>>,
        reply: oneshot::Sender<String>,
    },
    InjectEvent {
        kind: String,
        payload: Value,
        reply: oneshot::Sender<Result<ActiveEventSnapshot, InjectError>>,
    },
    Snapshot(oneshot::Sender<TickSnapshot>),
}

/// Cloneable control surface for a running simulation. Every call fails
/// with `ControlError::Stopped` once the simulation has been stopped.
#[derive(Clone)]
pub struct SimHandle {
    commands: mpsc::Sender<Command>,
}

impl SimHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ControlError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| ControlError::Stopped)?;
        rx.await.map_err(|_| ControlError::Stopped)
    }

    /// Attaches an observer. The first event received is a fresh `WorldInit`.
    pub async fn subscribe(&self) -> Result<mpsc::Receiver<SimEvent>, ControlError> {
        self.request(Command::Subscribe).await
    }

    pub async fn pause(&self) -> Result<(), ControlError> {
        self.request(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<(), ControlError> {
        self.request(Command::Resume).await
    }

    /// Halts the tick timer, drops outstanding generator calls and closes
    /// every observer stream after the final `Status` event.
    pub async fn stop(&self) -> Result<(), ControlError> {
        self.request(Command::Stop).await
    }

    pub async fn set_tick_interval(&self, tick_interval_ms: u64) -> Result<(), ControlError> {
        self.request(|reply| Command::SetTickInterval(tick_interval_ms, reply))
            .await
    }

    pub async fn assign_task(
        &self,
        type_id: &str,
        character_ids: Option<Vec<String>>,
    ) -> Result<Option<TaskSnapshot>, ControlError> {
        let type_id = type_id.to_string();
        self.request(|reply| Command::AssignTask {
            type_id,
            character_ids,
            reply,
        })
        .await
    }

    pub async fn enqueue_task(
        &self,
        type_id: &str,
        participants: Option<Vec<String>>,
    ) -> Result<String, ControlError> {
        let type_id = type_id.to_string();
        self.request(|reply| Command::EnqueueTask {
            type_id,
            participants,
            reply,
        })
        .await
    }

    pub async fn inject_event(
        &self,
        kind: &str,
        payload: Value,
    ) -> Result<Result<ActiveEventSnapshot, InjectError>, ControlError> {
        let kind = kind.to_string();
        self.request(|reply| Command::InjectEvent {
            kind,
            payload,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<TickSnapshot, ControlError> {
        self.request(Command::Snapshot).await
    }
}

/// Starts the default office simulation on the current tokio runtime.
/// Returns the control handle and the initial `WorldInit` event.
pub fn start(
    config: SimConfig,
    generator: Arc<dyn DialogueGenerator>,
) -> Result<(SimHandle, SimEvent), SetupError> {
    let sim = Simulation::new(config)?;
    Ok(spawn(sim, generator))
}

/// Runs an already constructed simulation
pub fn spawn(mut sim: Simulation, generator: Arc<dyn DialogueGenerator>) -> (SimHandle, SimEvent) {
    let init = sim.world_init_event();
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
    let runner = Runner {
        timeout: Duration::from_millis(sim.config().generation.timeout_ms),
        sim,
        generator,
        hub: EventHub::default(),
        generation: JoinSet::new(),
        next_tick: None,
    };
    tokio::spawn(runner.run(rx));
    (SimHandle { commands: tx }, init)
}

struct Runner {
    sim: Simulation,
    generator: Arc<dyn DialogueGenerator>,
    hub: EventHub,
    generation: JoinSet<(u64, Result<String, GenerationError>)>,
    timeout: Duration,
    next_tick: Option<Instant>,
}

impl Runner {
    fn interval(&self) -> Duration {
        Duration::from_millis(self.sim.tick_interval_ms())
    }

    fn arm(&mut self) {
        self.next_tick = (self.sim.status() == SimStatus::Running)
            .then(|| Instant::now() + self.interval());
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        tracing::info!(run_id = %self.sim.run_id(), "simulation loop started");
        self.arm();
        loop {
            let deadline = self.next_tick.unwrap_or_else(Instant::now);
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    if !self.handle(command) {
                        break;
                    }
                }
                Some(joined) = self.generation.join_next() => {
                    match joined {
                        Ok((request_id, result)) => {
                            self.sim.apply_generation(request_id, result);
                            self.flush();
                        }
                        Err(err) => tracing::warn!(error = %err, "generation task failed"),
                    }
                }
                _ = sleep_until(deadline), if self.next_tick.is_some() => {
                    let events = self.sim.step();
                    self.hub.publish_all(&events);
                    self.dispatch_generation();
                    self.arm();
                }
            }
        }
        self.generation.abort_all();
        tracing::info!(tick = self.sim.tick(), "simulation loop finished");
    }

    /// Publishes events raised outside a tick and starts generator calls
    fn flush(&mut self) {
        let events = self.sim.drain_events();
        self.hub.publish_all(&events);
        self.dispatch_generation();
    }

    fn dispatch_generation(&mut self) {
        for request in self.sim.drain_generation_requests() {
            let request_id = request.request_id;
            let pending = self.generator.generate(request);
            let timeout = self.timeout;
            self.generation.spawn(async move {
                let result = match tokio::time::timeout(timeout, pending).await {
                    Ok(result) => result,
                    Err(_) => Err(GenerationError::Timeout),
                };
                (request_id, result)
            });
        }
    }

    /// Applies one command. Returns false when the loop should exit.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Subscribe(reply) => {
                let init = self.sim.world_init_event();
                let _ = reply.send(self.hub.subscribe(Some(init)));
            }
            Command::Pause(reply) => {
                if self.sim.status() == SimStatus::Running {
                    self.sim.set_status(SimStatus::Paused);
                    self.next_tick = None;
                }
                self.flush();
                let _ = reply.send(());
            }
            Command::Resume(reply) => {
                if self.sim.status() == SimStatus::Paused {
                    self.sim.set_status(SimStatus::Running);
                    self.arm();
                }
                self.flush();
                let _ = reply.send(());
            }
            Command::Stop(reply) => {
                self.next_tick = None;
                self.generation.abort_all();
                self.sim.stop();
                self.flush();
                let _ = reply.send(());
                return false;
            }
            Command::SetTickInterval(ms, reply) => {
                self.sim.set_tick_interval(ms);
                self.arm();
                self.flush();
                let _ = reply.send(());
            }
            Command::AssignTask {
                type_id,
                character_ids,
                reply,
            } => {
                let task = self.sim.assign_task(&type_id, character_ids.as_deref());
                self.flush();
                let _ = reply.send(task);
            }
            Command::EnqueueTask {
                type_id,
                participants,
                reply,
            } => {
                let _ = reply.send(self.sim.enqueue_task(&type_id, participants));
            }
            Command::InjectEvent {
                kind,
                payload,
                reply,
            } => {
                let result = self.sim.inject_event(&kind, &payload);
                self.flush();
                let _ = reply.send(result);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.sim.snapshot());
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::CannedGenerator;

    fn fast_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.clock.tick_interval_ms = 5;
        config
    }

    #[tokio::test]
    async fn test_ticks_reach_observers() {
        let (handle, init) = start(fast_config(), Arc::new(CannedGenerator)).unwrap();
        assert!(matches!(init, SimEvent::WorldInit { .. }));

        let mut rx = handle.subscribe().await.unwrap();
        assert!(matches!(rx.recv().await, Some(SimEvent::WorldInit { .. })));
        let mut ticks = Vec::new();
        while ticks.len() < 3 {
            if let Some(SimEvent::TickState(snapshot)) = rx.recv().await {
                ticks.push(snapshot.tick);
            }
        }
        assert!(ticks.windows(2).all(|w| w[1] == w[0] + 1));
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_pause_keeps_tick_counter() {
        let (handle, _) = start(fast_config(), Arc::new(CannedGenerator)).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.pause().await.unwrap();
        let paused_at = handle.snapshot().await.unwrap().tick;
        tokio::time::sleep(Duration::from_millis(30)).await;
        let still = handle.snapshot().await.unwrap();
        assert_eq!(still.tick, paused_at);
        assert_eq!(still.status, SimStatus::Paused);

        handle.resume().await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(handle.snapshot().await.unwrap().tick > paused_at);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_closes_streams_and_handle() {
        let (handle, _) = start(fast_config(), Arc::new(CannedGenerator)).unwrap();
        let mut rx = handle.subscribe().await.unwrap();
        handle.stop().await.unwrap();

        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        assert!(matches!(
            last,
            Some(SimEvent::Status { status: SimStatus::Stopped, .. })
        ));
        assert!(matches!(handle.snapshot().await, Err(ControlError::Stopped)));
    }

    #[tokio::test]
    async fn test_assign_task_through_handle() {
        let mut config = fast_config();
        config.clock.tick_interval_ms = 60_000;
        let (handle, _) = start(config, Arc::new(CannedGenerator)).unwrap();
        let task = handle.assign_task("phone_call", None).await.unwrap();
        assert!(task.is_some());
        let missing = handle.assign_task("no_such_task", None).await.unwrap();
        assert!(missing.is_none());
        handle.stop().await.unwrap();
    }
}
