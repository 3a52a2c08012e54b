//! Event Types
//!
//! The tagged event stream emitted by the simulation clock.
//!
//! Events for one tick arrive in emission order: movement and state changes,
//! need threshold crossings, task lifecycle, encounter lifecycle and
//! dialogue, then the closing `TickState` snapshot.

use serde::{Deserialize, Serialize};

use crate::snapshot::{
    ActiveEventSnapshot, DialogueLineSnapshot, MapSnapshot, TaskSnapshot, TickSnapshot,
};
use crate::{BehaviorState, Direction, NeedKind, NeedLevel, SimStatus};

/// Component an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    Character,
    Task,
    Encounter,
    Generation,
    Control,
}

/// Discriminant-only view of `SimEvent`, handy for filtering and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    WorldInit,
    TickState,
    CharacterMoved,
    StateChanged,
    NeedThreshold,
    MoodChanged,
    TaskAssigned,
    TaskCompleted,
    TaskInterrupted,
    EncounterStarted,
    EncounterEnded,
    DialogueLine,
    EventInjected,
    Status,
    Error,
}

/// One entry in the simulation event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    /// Sent when a simulation instance starts; observers reset all state.
    WorldInit {
        run_id: String,
        map: MapSnapshot,
        snapshot: TickSnapshot,
    },
    /// Full state at the end of a tick.
    TickState(TickSnapshot),
    /// Authoritative position assignment.
    CharacterMoved {
        tick: u64,
        character_id: String,
        x: f32,
        y: f32,
        facing: Direction,
    },
    StateChanged {
        tick: u64,
        character_id: String,
        from: BehaviorState,
        to: BehaviorState,
    },
    NeedThreshold {
        tick: u64,
        character_id: String,
        need: NeedKind,
        level: NeedLevel,
        value: f32,
    },
    MoodChanged {
        tick: u64,
        character_id: String,
        mood: f32,
        delta: f32,
        reason: String,
    },
    TaskAssigned {
        tick: u64,
        task: TaskSnapshot,
    },
    TaskCompleted {
        tick: u64,
        task: TaskSnapshot,
    },
    TaskInterrupted {
        tick: u64,
        task: TaskSnapshot,
        reason: String,
    },
    EncounterStarted {
        tick: u64,
        encounter_id: String,
        participants: Vec<String>,
        zone_id: String,
    },
    EncounterEnded {
        tick: u64,
        encounter_id: String,
        participants: Vec<String>,
        sentiment: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    DialogueLine(DialogueLineSnapshot),
    EventInjected {
        tick: u64,
        event: ActiveEventSnapshot,
    },
    Status {
        tick: u64,
        status: SimStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tick_interval_ms: Option<u64>,
    },
    Error {
        tick: u64,
        scope: ErrorScope,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject_id: Option<String>,
    },
}

impl SimEvent {
    /// Returns the discriminant of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            SimEvent::WorldInit { .. } => EventKind::WorldInit,
            SimEvent::TickState(_) => EventKind::TickState,
            SimEvent::CharacterMoved { .. } => EventKind::CharacterMoved,
            SimEvent::StateChanged { .. } => EventKind::StateChanged,
            SimEvent::NeedThreshold { .. } => EventKind::NeedThreshold,
            SimEvent::MoodChanged { .. } => EventKind::MoodChanged,
            SimEvent::TaskAssigned { .. } => EventKind::TaskAssigned,
            SimEvent::TaskCompleted { .. } => EventKind::TaskCompleted,
            SimEvent::TaskInterrupted { .. } => EventKind::TaskInterrupted,
            SimEvent::EncounterStarted { .. } => EventKind::EncounterStarted,
            SimEvent::EncounterEnded { .. } => EventKind::EncounterEnded,
            SimEvent::DialogueLine(_) => EventKind::DialogueLine,
            SimEvent::EventInjected { .. } => EventKind::EventInjected,
            SimEvent::Status { .. } => EventKind::Status,
            SimEvent::Error { .. } => EventKind::Error,
        }
    }

    /// Tick the event belongs to.
    pub fn tick(&self) -> u64 {
        match self {
            SimEvent::WorldInit { snapshot, .. } => snapshot.tick,
            SimEvent::TickState(snapshot) => snapshot.tick,
            SimEvent::DialogueLine(line) => line.tick,
            SimEvent::CharacterMoved { tick, .. }
            | SimEvent::StateChanged { tick, .. }
            | SimEvent::NeedThreshold { tick, .. }
            | SimEvent::MoodChanged { tick, .. }
            | SimEvent::TaskAssigned { tick, .. }
            | SimEvent::TaskCompleted { tick, .. }
            | SimEvent::TaskInterrupted { tick, .. }
            | SimEvent::EncounterStarted { tick, .. }
            | SimEvent::EncounterEnded { tick, .. }
            | SimEvent::EventInjected { tick, .. }
            | SimEvent::Status { tick, .. }
            | SimEvent::Error { tick, .. } => *tick,
        }
    }

    /// Checks if the event concerns a specific character.
    pub fn involves_character(&self, character_id: &str) -> bool {
        match self {
            SimEvent::CharacterMoved { character_id: id, .. }
            | SimEvent::StateChanged { character_id: id, .. }
            | SimEvent::NeedThreshold { character_id: id, .. }
            | SimEvent::MoodChanged { character_id: id, .. } => id == character_id,
            SimEvent::TaskAssigned { task, .. }
            | SimEvent::TaskCompleted { task, .. }
            | SimEvent::TaskInterrupted { task, .. } => {
                task.participants.iter().any(|p| p == character_id)
            }
            SimEvent::EncounterStarted { participants, .. }
            | SimEvent::EncounterEnded { participants, .. } => {
                participants.iter().any(|p| p == character_id)
            }
            SimEvent::DialogueLine(line) => line.speaker_id == character_id,
            SimEvent::Error { subject_id, .. } => subject_id.as_deref() == Some(character_id),
            SimEvent::WorldInit { .. }
            | SimEvent::TickState(_)
            | SimEvent::EventInjected { .. }
            | SimEvent::Status { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskStatus;

    fn sample_task() -> TaskSnapshot {
        TaskSnapshot {
            task_id: "task_1".into(),
            type_id: "report".into(),
            name: "Quarterly report".into(),
            icon: "📊".into(),
            participants: vec!["c1".into(), "c2".into()],
            progress: 0.5,
            status: TaskStatus::InProgress,
            assigned_tick: 3,
            zone_type: None,
        }
    }

    #[test]
    fn test_event_tagging() {
        let event = SimEvent::StateChanged {
            tick: 7,
            character_id: "c1".into(),
            from: BehaviorState::Idle,
            to: BehaviorState::Walking,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["from"], "idle");
        assert_eq!(json["to"], "walking");

        let parsed: SimEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_newtype_variant_tagging() {
        let line = SimEvent::DialogueLine(DialogueLineSnapshot {
            encounter_id: "enc_1".into(),
            speaker_id: "c1".into(),
            speaker_name: "Dana".into(),
            text: "Morning!".into(),
            tick: 12,
        });
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["type"], "dialogue_line");
        assert_eq!(json["speaker_id"], "c1");
        assert_eq!(line.tick(), 12);
    }

    #[test]
    fn test_involves_character() {
        let assigned = SimEvent::TaskAssigned {
            tick: 3,
            task: sample_task(),
        };
        assert!(assigned.involves_character("c2"));
        assert!(!assigned.involves_character("c3"));
        assert_eq!(assigned.kind(), EventKind::TaskAssigned);

        let error = SimEvent::Error {
            tick: 4,
            scope: ErrorScope::Character,
            message: "stuck".into(),
            subject_id: Some("c3".into()),
        };
        assert!(error.involves_character("c3"));
    }

    #[test]
    fn test_status_event_optional_interval() {
        let json = r#"{"type":"status","tick":0,"status":"paused"}"#;
        let event: SimEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            SimEvent::Status {
                tick: 0,
                status: SimStatus::Paused,
                tick_interval_ms: None,
            }
        );
    }
}
