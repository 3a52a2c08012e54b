//! Live simulation feed.
//!
//! The authoritative simulation runs on a small tokio runtime owned by the
//! viewer. Events come back over the observer channel and are drained into
//! the `Viewer` once per frame; controls are fired at the handle without
//! waiting for the reply.

use bevy::prelude::*;
use office_core::{CannedGenerator, SimConfig, SimHandle};
use office_events::SimEvent;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::viewer::Viewer;

/// Plugin that owns the simulation and feeds its events to the viewer.
pub struct LivePlugin;

impl Plugin for LivePlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<LaunchSettings>() {
            app.init_resource::<LaunchSettings>();
        }
        app.add_systems(Startup, start_simulation)
            .add_systems(PreUpdate, pump_events);
    }
}

/// Simulation settings used for (re)starts
#[derive(Resource, Clone, Default)]
pub struct LaunchSettings {
    pub sim: SimConfig,
}

/// Control requests the viewer can make
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    Pause,
    Resume,
    SetTickInterval(u64),
    Stop,
}

/// Running simulation and its event stream.
#[derive(Resource)]
pub struct LiveSim {
    runtime: Runtime,
    handle: Option<SimHandle>,
    /// Observer channel (wrapped for thread safety).
    events: Option<Mutex<mpsc::Receiver<SimEvent>>>,
    /// Set when the feed ended or could not start.
    pub last_error: Option<String>,
}

impl LiveSim {
    pub fn new() -> Result<Self, String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("office-sim")
            .enable_all()
            .build()
            .map_err(|e| format!("could not start runtime: {}", e))?;
        Ok(Self {
            runtime,
            handle: None,
            events: None,
            last_error: None,
        })
    }

    /// Starts a fresh simulation, stopping the current one first.
    pub fn launch(&mut self, config: SimConfig) -> Result<(), String> {
        self.send(Control::Stop);
        let (handle, events) = self.runtime.block_on(async move {
            let (handle, _init) =
                office_core::start(config, Arc::new(CannedGenerator)).map_err(|e| e.to_string())?;
            let events = handle.subscribe().await.map_err(|e| e.to_string())?;
            Ok::<_, String>((handle, events))
        })?;
        self.handle = Some(handle);
        self.events = Some(Mutex::new(events));
        self.last_error = None;
        Ok(())
    }

    /// Fires a control request without waiting for it.
    pub fn send(&self, control: Control) {
        let Some(handle) = self.handle.clone() else {
            return;
        };
        self.runtime.spawn(async move {
            let result = match control {
                Control::Pause => handle.pause().await,
                Control::Resume => handle.resume().await,
                Control::SetTickInterval(ms) => handle.set_tick_interval(ms).await,
                Control::Stop => handle.stop().await,
            };
            if let Err(e) = result {
                tracing::debug!(?control, error = %e, "control request not applied");
            }
        });
    }

    /// Everything received since the last call
    pub fn drain(&mut self) -> Vec<SimEvent> {
        let mut drained = Vec::new();
        let mut closed = false;
        if let Some(events) = &self.events {
            let Ok(mut rx) = events.lock() else {
                return drained;
            };
            loop {
                match rx.try_recv() {
                    Ok(event) => drained.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        closed = true;
                        break;
                    }
                }
            }
        }
        if closed {
            tracing::info!("simulation feed closed");
            self.events = None;
            self.last_error = Some("simulation feed closed".to_string());
        }
        drained
    }
}

fn start_simulation(mut commands: Commands, settings: Res<LaunchSettings>) {
    let mut live = match LiveSim::new() {
        Ok(live) => live,
        Err(e) => {
            tracing::error!("{}", e);
            return;
        }
    };
    if let Err(e) = live.launch(settings.sim.clone()) {
        tracing::error!("Failed to start simulation: {}", e);
        live.last_error = Some(e);
    }
    commands.insert_resource(live);
}

fn pump_events(live: Option<ResMut<LiveSim>>, mut viewer: ResMut<Viewer>) {
    let Some(mut live) = live else {
        return;
    };
    for event in live.drain() {
        viewer.ingest(&event);
    }
}
