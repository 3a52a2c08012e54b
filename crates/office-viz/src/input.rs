//! Keyboard controls.
//!
//! Tab cycles the selection, Escape clears it, Space pauses or resumes,
//! `+`/`-` change the tick speed and R restarts with the next seed.

use bevy::prelude::*;
use office_events::SimStatus;

use crate::live::{Control, LaunchSettings, LiveSim};
use crate::viewer::Viewer;

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (selection_input, control_input));
    }
}

const MIN_TICK_MS: u64 = 25;
const MAX_TICK_MS: u64 = 5_000;

/// Interval after one speed step; faster halves, slower doubles
pub fn step_interval(current_ms: u64, faster: bool) -> u64 {
    let next = if faster {
        current_ms / 2
    } else {
        current_ms.saturating_mul(2)
    };
    next.clamp(MIN_TICK_MS, MAX_TICK_MS)
}

fn selection_input(keys: Res<ButtonInput<KeyCode>>, mut viewer: ResMut<Viewer>) {
    if keys.just_pressed(KeyCode::Tab) {
        viewer.select_next();
    }
    if keys.just_pressed(KeyCode::Escape) {
        viewer.clear_selection();
    }
}

fn control_input(
    keys: Res<ButtonInput<KeyCode>>,
    viewer: Res<Viewer>,
    live: Option<ResMut<LiveSim>>,
    mut settings: ResMut<LaunchSettings>,
) {
    let Some(mut live) = live else {
        return;
    };

    if keys.just_pressed(KeyCode::Space) {
        match viewer.state.status {
            SimStatus::Running => live.send(Control::Pause),
            SimStatus::Paused => live.send(Control::Resume),
            SimStatus::Stopped => {}
        }
    }

    let faster = keys.any_just_pressed([KeyCode::Equal, KeyCode::NumpadAdd]);
    let slower = keys.any_just_pressed([KeyCode::Minus, KeyCode::NumpadSubtract]);
    if faster != slower {
        let current = viewer
            .state
            .tick_interval_ms
            .unwrap_or(settings.sim.clock.tick_interval_ms);
        let next = step_interval(current, faster);
        if next != current {
            tracing::info!(from = current, to = next, "changing tick interval");
            live.send(Control::SetTickInterval(next));
        }
    }

    if keys.just_pressed(KeyCode::KeyR) {
        settings.sim.clock.seed = settings.sim.clock.seed.wrapping_add(1);
        tracing::info!(seed = settings.sim.clock.seed, "restarting simulation");
        if let Err(e) = live.launch(settings.sim.clone()) {
            tracing::error!("Failed to restart simulation: {}", e);
            live.last_error = Some(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_interval_clamps() {
        assert_eq!(step_interval(200, true), 100);
        assert_eq!(step_interval(200, false), 400);
        assert_eq!(step_interval(30, true), MIN_TICK_MS);
        assert_eq!(step_interval(4_000, false), MAX_TICK_MS);
    }
}
