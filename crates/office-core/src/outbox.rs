//! Outbound Queues
//!
//! Systems never call observers directly. They push onto the event outbox
//! and the generation queue, and the simulation drains both after each tick.

use bevy_ecs::prelude::*;
use office_events::{BehaviorState, Direction, ErrorScope, SimEvent};

use crate::generation::{GenerationKind, GenerationRequest};

/// Events emitted during the current tick, in emission order
#[derive(Resource, Default)]
pub struct EventOutbox {
    events: Vec<SimEvent>,
}

impl EventOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }

    pub fn state_changed(
        &mut self,
        tick: u64,
        character_id: &str,
        from: BehaviorState,
        to: BehaviorState,
    ) {
        self.push(SimEvent::StateChanged {
            tick,
            character_id: character_id.to_string(),
            from,
            to,
        });
    }

    pub fn moved(&mut self, tick: u64, character_id: &str, x: f32, y: f32, facing: Direction) {
        self.push(SimEvent::CharacterMoved {
            tick,
            character_id: character_id.to_string(),
            x,
            y,
            facing,
        });
    }

    pub fn mood_changed(&mut self, tick: u64, character_id: &str, mood: f32, delta: f32, reason: &str) {
        self.push(SimEvent::MoodChanged {
            tick,
            character_id: character_id.to_string(),
            mood,
            delta,
            reason: reason.to_string(),
        });
    }

    pub fn error(
        &mut self,
        tick: u64,
        scope: ErrorScope,
        message: impl Into<String>,
        subject_id: Option<&str>,
    ) {
        self.push(SimEvent::Error {
            tick,
            scope,
            message: message.into(),
            subject_id: subject_id.map(str::to_string),
        });
    }
}

/// Generation requests raised during the current tick
#[derive(Resource, Default)]
pub struct GenerationQueue {
    next_id: u64,
    requests: Vec<GenerationRequest>,
}

impl GenerationQueue {
    /// Queues a request and returns its id
    pub fn submit(&mut self, tick: u64, kind: GenerationKind) -> u64 {
        self.next_id += 1;
        let request_id = self.next_id;
        self.requests.push(GenerationRequest {
            request_id,
            tick,
            kind,
        });
        request_id
    }

    pub fn drain(&mut self) -> Vec<GenerationRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
