//! Dialogue Bubbles
//!
//! Every spoken line becomes a bubble that types itself out one character
//! at a time, stays up for a reading period, then fades away. Only a few
//! bubbles may be up at once: when one too many arrives the oldest starts
//! fading straight away.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// All durations in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleTimings {
    pub typing_interval_ms: f32,
    pub reading_ms: f32,
    pub fade_ms: f32,
    /// Cadence of the bubble clock
    pub tick_ms: f32,
}

impl Default for BubbleTimings {
    fn default() -> Self {
        Self {
            typing_interval_ms: 30.0,
            reading_ms: 2500.0,
            fade_ms: 400.0,
            tick_ms: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubblePhase {
    Typing,
    Reading,
    Fading,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub id: u64,
    pub speaker_id: String,
    text: Vec<char>,
    pub revealed: usize,
    pub phase: BubblePhase,
    /// Time spent in the current phase
    elapsed_ms: f32,
    /// Screen anchor, in tile coordinates
    pub anchor: (f32, f32),
}

impl Bubble {
    /// The part of the text typed so far
    pub fn visible_text(&self) -> String {
        self.text[..self.revealed.min(self.text.len())].iter().collect()
    }

    pub fn full_len(&self) -> usize {
        self.text.len()
    }

    pub fn opacity(&self, timings: &BubbleTimings) -> f32 {
        match self.phase {
            BubblePhase::Typing | BubblePhase::Reading => 1.0,
            BubblePhase::Fading if timings.fade_ms <= 0.0 => 0.0,
            BubblePhase::Fading => (1.0 - self.elapsed_ms / timings.fade_ms).clamp(0.0, 1.0),
        }
    }

    fn begin_fading(&mut self) {
        if self.phase != BubblePhase::Fading {
            self.phase = BubblePhase::Fading;
            self.elapsed_ms = 0.0;
        }
    }

    /// Advances by `dt_ms`. Returns false once fully faded.
    fn advance(&mut self, dt_ms: f32, timings: &BubbleTimings) -> bool {
        self.elapsed_ms += dt_ms;
        if self.phase == BubblePhase::Typing {
            let revealed = if timings.typing_interval_ms <= 0.0 {
                self.text.len()
            } else {
                (self.elapsed_ms / timings.typing_interval_ms) as usize
            };
            self.revealed = revealed.min(self.text.len());
            if self.revealed == self.text.len() {
                let typing_time = self.text.len() as f32 * timings.typing_interval_ms.max(0.0);
                self.phase = BubblePhase::Reading;
                self.elapsed_ms = (self.elapsed_ms - typing_time).max(0.0);
            }
        }
        if self.phase == BubblePhase::Reading && self.elapsed_ms >= timings.reading_ms {
            let over = self.elapsed_ms - timings.reading_ms;
            self.phase = BubblePhase::Fading;
            self.elapsed_ms = over;
        }
        !(self.phase == BubblePhase::Fading && self.elapsed_ms >= timings.fade_ms)
    }
}

/// Bubble state owned by one observer
#[derive(Debug, Clone)]
pub struct BubbleManager {
    bubbles: VecDeque<Bubble>,
    timings: BubbleTimings,
    max_visible: usize,
    next_id: u64,
}

impl BubbleManager {
    pub fn new(timings: BubbleTimings, max_visible: usize) -> Self {
        Self {
            bubbles: VecDeque::new(),
            timings,
            max_visible: max_visible.max(1),
            next_id: 0,
        }
    }

    pub fn timings(&self) -> &BubbleTimings {
        &self.timings
    }

    /// Adds a bubble for a line. Lines from speakers without a known
    /// position are dropped and `None` is returned.
    pub fn push(&mut self, speaker_id: &str, text: &str, anchor: Option<(f32, f32)>) -> Option<u64> {
        let Some(anchor) = anchor else {
            tracing::debug!(speaker = %speaker_id, "no position for speaker, dropping line");
            return None;
        };
        self.next_id += 1;
        let text: Vec<char> = text.chars().collect();
        let phase = if text.is_empty() {
            BubblePhase::Reading
        } else {
            BubblePhase::Typing
        };
        self.bubbles.push_back(Bubble {
            id: self.next_id,
            speaker_id: speaker_id.to_string(),
            text,
            revealed: 0,
            phase,
            elapsed_ms: 0.0,
            anchor,
        });

        let mut active = self.active_count();
        for bubble in self.bubbles.iter_mut() {
            if active <= self.max_visible {
                break;
            }
            if bubble.phase != BubblePhase::Fading {
                bubble.begin_fading();
                active -= 1;
            }
        }
        Some(self.next_id)
    }

    /// Advances every bubble and removes the ones that finished fading
    pub fn tick(&mut self, dt_ms: f32) {
        let timings = self.timings;
        self.bubbles.retain_mut(|b| b.advance(dt_ms, &timings));
    }

    /// Moves the bubbles of one speaker to follow them
    pub fn set_anchor(&mut self, speaker_id: &str, anchor: (f32, f32)) {
        for bubble in self.bubbles.iter_mut().filter(|b| b.speaker_id == speaker_id) {
            bubble.anchor = anchor;
        }
    }

    /// Bubbles not yet fading
    pub fn active_count(&self) -> usize {
        self.bubbles
            .iter()
            .filter(|b| b.phase != BubblePhase::Fading)
            .count()
    }

    pub fn bubbles(&self) -> impl Iterator<Item = &Bubble> {
        self.bubbles.iter()
    }

    pub fn get(&self, id: u64) -> Option<&Bubble> {
        self.bubbles.iter().find(|b| b.id == id)
    }

    pub fn clear(&mut self) {
        self.bubbles.clear();
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }
}

impl Default for BubbleManager {
    fn default() -> Self {
        Self::new(BubbleTimings::default(), 2)
    }
}
