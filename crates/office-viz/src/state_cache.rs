//! Observer State Cache
//!
//! Local copy of the world built purely from the event stream. `WorldInit`
//! resets everything; `TickState` replaces the character list; the
//! fine-grained events patch it between ticks.

use office_events::{
    CharacterSnapshot, DialogueLineSnapshot, MapSnapshot, SimEvent, SimStatus, TickSnapshot,
};

/// What applying one event changed
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Applied {
    /// A new simulation instance started; per-instance caches must go
    pub reset: bool,
    pub line: Option<DialogueLineSnapshot>,
}

#[derive(Debug, Default, Clone)]
pub struct ObserverState {
    pub run_id: Option<String>,
    pub map: Option<MapSnapshot>,
    pub snapshot: Option<TickSnapshot>,
    pub status: SimStatus,
    pub tick_interval_ms: Option<u64>,
    /// Last error message, shown in the status line
    pub last_error: Option<String>,
}

impl ObserverState {
    pub fn apply(&mut self, event: &SimEvent) -> Applied {
        let mut applied = Applied::default();
        match event {
            SimEvent::WorldInit {
                run_id,
                map,
                snapshot,
            } => {
                *self = Self {
                    run_id: Some(run_id.clone()),
                    map: Some(map.clone()),
                    status: snapshot.status,
                    snapshot: Some(snapshot.clone()),
                    tick_interval_ms: self.tick_interval_ms,
                    last_error: None,
                };
                applied.reset = true;
            }
            SimEvent::TickState(snapshot) => {
                self.status = snapshot.status;
                self.snapshot = Some(snapshot.clone());
            }
            SimEvent::CharacterMoved {
                character_id,
                x,
                y,
                facing,
                ..
            } => {
                if let Some(c) = self.character_mut(character_id) {
                    c.x = *x;
                    c.y = *y;
                    c.facing = *facing;
                }
            }
            SimEvent::StateChanged {
                character_id, to, ..
            } => {
                if let Some(c) = self.character_mut(character_id) {
                    c.state = *to;
                }
            }
            SimEvent::MoodChanged {
                character_id, mood, ..
            } => {
                if let Some(c) = self.character_mut(character_id) {
                    c.mood = *mood;
                }
            }
            SimEvent::DialogueLine(line) => {
                applied.line = Some(line.clone());
            }
            SimEvent::Status {
                status,
                tick_interval_ms,
                ..
            } => {
                self.status = *status;
                if tick_interval_ms.is_some() {
                    self.tick_interval_ms = *tick_interval_ms;
                }
            }
            SimEvent::Error { message, .. } => {
                self.last_error = Some(message.clone());
            }
            _ => {}
        }
        applied
    }

    pub fn tick(&self) -> u64 {
        self.snapshot.as_ref().map(|s| s.tick).unwrap_or(0)
    }

    pub fn characters(&self) -> &[CharacterSnapshot] {
        self.snapshot
            .as_ref()
            .map(|s| s.characters.as_slice())
            .unwrap_or(&[])
    }

    pub fn character(&self, id: &str) -> Option<&CharacterSnapshot> {
        self.snapshot.as_ref().and_then(|s| s.character(id))
    }

    fn character_mut(&mut self, id: &str) -> Option<&mut CharacterSnapshot> {
        self.snapshot
            .as_mut()?
            .characters
            .iter_mut()
            .find(|c| c.character_id == id)
    }

    /// Id of the character after `current` in id order, wrapping around
    pub fn next_character(&self, current: Option<&str>) -> Option<String> {
        let mut ids: Vec<&str> = self
            .characters()
            .iter()
            .map(|c| c.character_id.as_str())
            .collect();
        ids.sort_unstable();
        let next = match current.and_then(|id| ids.iter().position(|&c| c == id)) {
            Some(i) => ids.get(i + 1).or_else(|| ids.first()),
            None => ids.first(),
        };
        next.map(|id| id.to_string())
    }
}
