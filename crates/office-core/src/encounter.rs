//! Encounter Registry
//!
//! Active two-party conversations, the global rate limit, per-pair
//! cooldowns and the bounded dialogue backlog.

use bevy_ecs::prelude::*;
use office_events::{DialogueLineSnapshot, EncounterSnapshot};
use std::collections::{HashMap, VecDeque};

use crate::config::EncounterConfig;
use crate::generation::ScriptLine;

/// One conversation in progress
#[derive(Debug, Clone, PartialEq)]
pub struct Encounter {
    pub id: String,
    pub participants: [String; 2],
    pub zone_id: String,
    pub start_tick: u64,
    /// Lines already spoken
    pub lines: Vec<DialogueLineSnapshot>,
    /// Lines received from the generator but not yet released
    pub pending_lines: VecDeque<ScriptLine>,
    /// Final sentiment from the generator, set once dialogue arrives
    pub script_sentiment: Option<f32>,
    /// Earliest tick for the next line (or for closing after the last one)
    pub next_line_tick: u64,
    /// Outstanding generation request; any other id is stale
    pub request_id: Option<u64>,
}

impl Encounter {
    pub fn has_participant(&self, character_id: &str) -> bool {
        self.participants.iter().any(|p| p == character_id)
    }

    /// Dialogue arrived and every line has been released
    pub fn is_script_exhausted(&self) -> bool {
        self.script_sentiment.is_some() && self.pending_lines.is_empty()
    }

    pub fn to_snapshot(&self) -> EncounterSnapshot {
        EncounterSnapshot {
            encounter_id: self.id.clone(),
            participants: self.participants.to_vec(),
            zone_id: self.zone_id.clone(),
            start_tick: self.start_tick,
            lines: self.lines.clone(),
            sentiment: self.script_sentiment,
        }
    }
}

/// Order-independent key for a pair of characters
pub fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Encounter registry resource
#[derive(Resource, Debug)]
pub struct EncounterRegistry {
    active: Vec<Encounter>,
    last_started_tick: Option<u64>,
    /// Tick each pair's most recent encounter ended
    last_ended: HashMap<(String, String), u64>,
    backlog: VecDeque<DialogueLineSnapshot>,
    backlog_size: usize,
    next_seq: u64,
}

impl EncounterRegistry {
    pub fn new(backlog_size: usize) -> Self {
        Self {
            active: Vec::new(),
            last_started_tick: None,
            last_ended: HashMap::new(),
            backlog: VecDeque::new(),
            backlog_size,
            next_seq: 1,
        }
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("enc_{:04}", self.next_seq);
        self.next_seq += 1;
        id
    }

    /// Global rate limit: at most one start per `rate_limit_ticks`
    pub fn rate_limit_elapsed(&self, tick: u64, config: &EncounterConfig) -> bool {
        self.last_started_tick
            .map_or(true, |last| tick >= last + config.rate_limit_ticks)
    }

    /// Pair cooldown measured from when their last encounter ended
    pub fn pair_ready(&self, a: &str, b: &str, tick: u64, config: &EncounterConfig) -> bool {
        self.last_ended
            .get(&pair_key(a, b))
            .map_or(true, |&ended| tick >= ended + config.pair_cooldown_ticks)
    }

    pub fn has_capacity(&self, config: &EncounterConfig) -> bool {
        self.active.len() < config.max_concurrent
    }

    pub fn begin(&mut self, encounter: Encounter) {
        self.last_started_tick = Some(encounter.start_tick);
        self.active.push(encounter);
    }

    pub fn active(&self) -> &[Encounter] {
        &self.active
    }

    pub fn get(&self, encounter_id: &str) -> Option<&Encounter> {
        self.active.iter().find(|e| e.id == encounter_id)
    }

    pub fn get_mut(&mut self, encounter_id: &str) -> Option<&mut Encounter> {
        self.active.iter_mut().find(|e| e.id == encounter_id)
    }

    /// Finds the encounter waiting on a generation request
    pub fn by_request(&self, request_id: u64) -> Option<&Encounter> {
        self.active.iter().find(|e| e.request_id == Some(request_id))
    }

    /// Removes an encounter and starts the pair's cooldown
    pub fn end(&mut self, encounter_id: &str, tick: u64) -> Option<Encounter> {
        let index = self.active.iter().position(|e| e.id == encounter_id)?;
        let encounter = self.active.remove(index);
        let [a, b] = &encounter.participants;
        self.last_ended.insert(pair_key(a, b), tick);
        Some(encounter)
    }

    pub fn record_line(&mut self, line: DialogueLineSnapshot) {
        if self.backlog_size == 0 {
            return;
        }
        if self.backlog.len() == self.backlog_size {
            self.backlog.pop_front();
        }
        self.backlog.push_back(line);
    }

    pub fn backlog(&self) -> impl Iterator<Item = &DialogueLineSnapshot> {
        self.backlog.iter()
    }

    /// Forgets outstanding generation requests
    pub fn cancel_requests(&mut self) {
        for encounter in &mut self.active {
            encounter.request_id = None;
        }
    }
}
