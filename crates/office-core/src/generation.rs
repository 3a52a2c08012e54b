//! Dialogue and Decision Generation
//!
//! The content of conversations and idle decisions comes from an external
//! generator. The simulation only raises requests, parses the raw JSON that
//! comes back and discards results it no longer cares about.
//!
//! Expected payloads:
//!
//! ```text
//! dialogue: {"lines": [{"speaker": "c1", "text": "..."}], "sentiment": 0.4}
//! decision: {"action": "wander" | "rest" | "stay", "zone": "kitchen"}
//! ```
//!
//! Responses may be wrapped in prose or code fences; the outermost `{...}`
//! block is parsed.

use office_events::{BehaviorState, PersonalitySnapshot};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

use crate::error::GenerationError;

/// What the generator is asked to produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationKind {
    Dialogue {
        encounter_id: String,
        zone_name: String,
        participants: Vec<CharacterContext>,
    },
    Decision {
        character: CharacterContext,
    },
}

/// Character summary handed to the generator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CharacterContext {
    pub character_id: String,
    pub name: String,
    pub mood: f32,
    pub state: BehaviorState,
    pub personality: PersonalitySnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

/// One outstanding request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub request_id: u64,
    pub tick: u64,
    #[serde(flatten)]
    pub kind: GenerationKind,
}

pub type GenerationFuture = Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send>>;

/// External text generator
pub trait DialogueGenerator: Send + Sync {
    fn generate(&self, request: GenerationRequest) -> GenerationFuture;
}

/// Parsed dialogue line
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptLine {
    pub speaker: String,
    pub text: String,
}

/// Parsed encounter dialogue
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DialogueScript {
    pub lines: Vec<ScriptLine>,
    #[serde(default)]
    pub sentiment: f32,
}

impl DialogueScript {
    /// Parses a dialogue payload. Lines with blank text are dropped, the
    /// sentiment is clamped to -1..1, and a script with no lines is an error.
    pub fn parse(raw: &str) -> Result<Self, GenerationError> {
        let json = extract_json_block(raw)
            .ok_or_else(|| GenerationError::Malformed("no json object in response".into()))?;
        let mut script: DialogueScript = serde_json::from_str(json)
            .map_err(|e| GenerationError::Malformed(format!("json parse failed: {}", e)))?;
        script.lines.retain(|l| !l.text.trim().is_empty());
        if script.lines.is_empty() {
            return Err(GenerationError::Malformed("dialogue has no lines".into()));
        }
        script.sentiment = if script.sentiment.is_finite() {
            script.sentiment.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        Ok(script)
    }
}

/// What an idle character chose to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Wander,
    Rest,
    Stay,
}

/// Parsed idle decision
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    #[serde(default)]
    pub zone: Option<String>,
}

impl Decision {
    pub fn parse(raw: &str) -> Result<Self, GenerationError> {
        let json = extract_json_block(raw)
            .ok_or_else(|| GenerationError::Malformed("no json object in response".into()))?;
        serde_json::from_str(json)
            .map_err(|e| GenerationError::Malformed(format!("json parse failed: {}", e)))
    }
}

fn extract_json_block(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    raw.get(start..=end)
}

const OPENERS: &[&str] = &[
    "Did you see the email about the printer?",
    "Morning! Coffee's fresh, by the way.",
    "Are you going to the stand-up later?",
    "I finally fixed that flaky test.",
    "Is it just me or is it cold in here?",
    "Any plans for the weekend?",
];

const REPLIES: &[&str] = &[
    "Ha, tell me about it.",
    "Not yet, I've been buried all morning.",
    "Nice, that's been bugging everyone.",
    "I'll be there, unfortunately.",
    "Honestly, I could use a break.",
    "Same as always, nothing exciting.",
];

/// Offline generator with canned lines. Output depends only on the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedGenerator;

impl CannedGenerator {
    pub fn respond(request: &GenerationRequest) -> String {
        let n = request.request_id as usize;
        match &request.kind {
            GenerationKind::Dialogue { participants, .. } => {
                let mut lines = Vec::new();
                if let [a, b, ..] = participants.as_slice() {
                    lines.push(serde_json::json!({
                        "speaker": a.character_id,
                        "text": OPENERS[n % OPENERS.len()],
                    }));
                    lines.push(serde_json::json!({
                        "speaker": b.character_id,
                        "text": REPLIES[n % REPLIES.len()],
                    }));
                }
                let mean_mood = if participants.is_empty() {
                    50.0
                } else {
                    participants.iter().map(|p| p.mood).sum::<f32>() / participants.len() as f32
                };
                let sentiment = ((mean_mood - 50.0) / 50.0).clamp(-1.0, 1.0) * 0.5;
                serde_json::json!({ "lines": lines, "sentiment": sentiment }).to_string()
            }
            GenerationKind::Decision { .. } => {
                let action = ["wander", "rest", "stay"][n % 3];
                serde_json::json!({ "action": action }).to_string()
            }
        }
    }
}

impl DialogueGenerator for CannedGenerator {
    fn generate(&self, request: GenerationRequest) -> GenerationFuture {
        Box::pin(async move { Ok(CannedGenerator::respond(&request)) })
    }
}
