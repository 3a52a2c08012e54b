//! World Clock
//!
//! Global tick counter, run status and the seeded RNG.

use bevy_ecs::prelude::*;
use office_events::{SimStatus, SimTime};
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Global simulation clock
#[derive(Resource, Debug, Clone)]
pub struct SimClock {
    pub current_tick: u64,
    pub status: SimStatus,
    pub tick_interval_ms: u64,
}

impl SimClock {
    pub fn new(tick_interval_ms: u64) -> Self {
        Self {
            current_tick: 0,
            status: SimStatus::Stopped,
            tick_interval_ms,
        }
    }

    pub fn advance(&mut self) {
        self.current_tick += 1;
    }

    pub fn sim_time(&self) -> SimTime {
        SimTime::from_tick(self.current_tick)
    }
}

/// Seeded random number generator resource
#[derive(Resource)]
pub struct SimRng(pub SmallRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advance_keeps_interval() {
        let mut clock = SimClock::new(250);
        clock.advance();
        clock.advance();
        assert_eq!(clock.current_tick, 2);
        assert_eq!(clock.tick_interval_ms, 250);
        assert_eq!(clock.sim_time().to_string(), "day_1.09:02");
    }
}
