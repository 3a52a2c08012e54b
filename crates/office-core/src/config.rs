//! Configuration System
//!
//! Loads tuning parameters from a TOML file. Every section carries
//! `#[serde(default)]`, so a file only needs the values it overrides.

use bevy_ecs::prelude::*;
use office_events::ZoneType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Default tuning file path
pub const DEFAULT_CONFIG_PATH: &str = "office.toml";

/// Top-level configuration structure
#[derive(Resource, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimConfig {
    pub clock: ClockConfig,
    pub needs: NeedsConfig,
    pub mood: MoodConfig,
    pub encounters: EncounterConfig,
    pub movement: MovementConfig,
    pub generation: GenerationConfig,
    pub tasks: TaskCatalogConfig,
    pub invariants: InvariantConfig,
}

/// Tick cadence and world seeding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub tick_interval_ms: u64,
    pub seed: u64,
    pub character_count: usize,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            seed: 42,
            character_count: 8,
        }
    }
}

/// Need rise/fall rates and thresholds, all on the 0-100 scale
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedsConfig {
    pub bladder_rate: f32,
    pub hunger_rate: f32,
    pub thirst_rate: f32,
    /// Decrease per tick while inside a satisfying zone
    pub satisfy_rate: f32,
    /// Idle characters go looking for relief above this
    pub urgent_threshold: f32,
    /// Work is abandoned above this
    pub critical_threshold: f32,
}

impl Default for NeedsConfig {
    fn default() -> Self {
        Self {
            bladder_rate: 0.35,
            hunger_rate: 0.2,
            thirst_rate: 0.3,
            satisfy_rate: 8.0,
            urgent_threshold: 60.0,
            critical_threshold: 85.0,
        }
    }
}

/// Mood drift and perturbation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    pub baseline: f32,
    /// Maximum movement toward the baseline per tick
    pub drift_per_tick: f32,
    /// Extra drop per tick while any need is critical
    pub critical_need_penalty: f32,
    /// Mood change per unit of encounter sentiment (-1..1)
    pub encounter_sentiment_scale: f32,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            baseline: 50.0,
            drift_per_tick: 0.05,
            critical_need_penalty: 0.2,
            encounter_sentiment_scale: 10.0,
        }
    }
}

/// Encounter eligibility and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Minimum ticks between two encounter starts
    pub rate_limit_ticks: u64,
    /// Ticks after a pair's encounter ends before they may meet again
    pub pair_cooldown_ticks: u64,
    pub max_concurrent: usize,
    /// Encounters without dialogue after this many ticks are closed
    pub timeout_ticks: u64,
    /// Ticks between released dialogue lines
    pub line_interval_ticks: u64,
    /// Number of recent lines kept for late observers
    pub backlog_size: usize,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            rate_limit_ticks: 20,
            pair_cooldown_ticks: 200,
            max_concurrent: 2,
            timeout_ticks: 60,
            line_interval_ticks: 3,
            backlog_size: 50,
        }
    }
}

/// Movement and idle behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub tiles_per_tick: usize,
    /// Chance per tick that an idle character wanders off
    pub wander_chance: f64,
    /// Ticks spent sitting after reaching a rest spot
    pub rest_duration_ticks: u64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            tiles_per_tick: 1,
            wander_chance: 0.02,
            rest_duration_ticks: 30,
        }
    }
}

/// External generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub timeout_ms: u64,
    /// Ask the generator what idle characters should do
    pub decisions_enabled: bool,
    /// Minimum ticks between decision requests per character
    pub decision_interval_ticks: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            decisions_enabled: false,
            decision_interval_ticks: 120,
        }
    }
}

/// Handling of character state inconsistencies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvariantConfig {
    /// Panic on a violation instead of forcing the character idle
    pub strict: bool,
}

impl Default for InvariantConfig {
    fn default() -> Self {
        Self {
            strict: cfg!(debug_assertions),
        }
    }
}

/// Definition of a kind of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTypeConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub required_zone: Option<ZoneType>,
    pub duration_ticks: u32,
    #[serde(default = "default_min_participants")]
    pub min_participants: usize,
    #[serde(default = "default_max_participants")]
    pub max_participants: usize,
    /// Mood change applied to each participant on completion
    #[serde(default)]
    pub completion_mood_bonus: f32,
    /// Mood change applied to each participant on assignment
    #[serde(default)]
    pub start_mood_delta: f32,
}

fn default_min_participants() -> usize {
    1
}

fn default_max_participants() -> usize {
    1
}

/// The task catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskCatalogConfig {
    pub types: Vec<TaskTypeConfig>,
    /// Finished tasks kept for inspection
    pub archive_size: usize,
}

impl Default for TaskCatalogConfig {
    fn default() -> Self {
        Self {
            types: default_task_types(),
            archive_size: 32,
        }
    }
}

fn task_type(
    id: &str,
    name: &str,
    icon: &str,
    required_zone: Option<ZoneType>,
    duration_ticks: u32,
    participants: (usize, usize),
    completion_mood_bonus: f32,
    start_mood_delta: f32,
) -> TaskTypeConfig {
    TaskTypeConfig {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        required_zone,
        duration_ticks,
        min_participants: participants.0,
        max_participants: participants.1,
        completion_mood_bonus,
        start_mood_delta,
    }
}

/// Built-in catalog used when the config file does not list any types
pub fn default_task_types() -> Vec<TaskTypeConfig> {
    vec![
        task_type("code_review", "Code review", "🔍", Some(ZoneType::Desk), 20, (1, 2), 4.0, 0.0),
        task_type("report", "Quarterly report", "📊", Some(ZoneType::Desk), 40, (1, 1), 8.0, -2.0),
        task_type("standup", "Stand-up", "🗣", Some(ZoneType::Meeting), 15, (2, 6), 3.0, -1.0),
        task_type("brainstorm", "Brainstorm", "💡", Some(ZoneType::Meeting), 25, (2, 4), 6.0, 0.0),
        task_type("restock", "Restock kitchen", "🥫", Some(ZoneType::Kitchen), 10, (1, 1), 2.0, 0.0),
        task_type("phone_call", "Client call", "📞", None, 8, (1, 1), 1.0, -1.0),
    ]
}

impl SimConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default path, or use defaults if not found
    pub fn load_or_default() -> Self {
        Self::load(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| {
            tracing::warn!("Could not load {}: {}. Using defaults.", DEFAULT_CONFIG_PATH, e);
            Self::default()
        })
    }

    /// Serialize back to TOML (used by `--print-default-config`)
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Rejects values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        if self.needs.urgent_threshold > self.needs.critical_threshold {
            return Err(ConfigError::Invalid(
                "urgent_threshold must not exceed critical_threshold".into(),
            ));
        }
        if self.movement.tiles_per_tick == 0 {
            return Err(ConfigError::Invalid("tiles_per_tick must be positive".into()));
        }
        for task in &self.tasks.types {
            if task.duration_ticks == 0 {
                return Err(ConfigError::Invalid(format!(
                    "task type {} has zero duration",
                    task.id
                )));
            }
            if task.min_participants == 0 || task.min_participants > task.max_participants {
                return Err(ConfigError::Invalid(format!(
                    "task type {} has invalid participant bounds",
                    task.id
                )));
            }
        }
        Ok(())
    }

    /// Looks up a task type by id.
    pub fn task_type(&self, type_id: &str) -> Option<&TaskTypeConfig> {
        self.tasks.types.iter().find(|t| t.id == type_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.clock.tick_interval_ms, 500);
        assert!(config.needs.urgent_threshold < config.needs.critical_threshold);
        assert!(config.task_type("standup").is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = SimConfig::from_toml_str(
            r#"
            [clock]
            seed = 7

            [encounters]
            pair_cooldown_ticks = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.clock.seed, 7);
        assert_eq!(config.clock.tick_interval_ms, 500);
        assert_eq!(config.encounters.pair_cooldown_ticks, 5);
        assert_eq!(config.encounters.max_concurrent, 2);
        assert!(!config.tasks.types.is_empty());
    }

    #[test]
    fn test_custom_task_catalog() {
        let config = SimConfig::from_toml_str(
            r#"
            [[tasks.types]]
            id = "filing"
            name = "Filing"
            required_zone = "desk"
            duration_ticks = 4
            completion_mood_bonus = 5.0
            "#,
        )
        .unwrap();
        assert_eq!(config.tasks.types.len(), 1);
        let filing = config.task_type("filing").unwrap();
        assert_eq!(filing.required_zone, Some(ZoneType::Desk));
        assert_eq!(filing.min_participants, 1);
        assert_eq!(filing.max_participants, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = SimConfig::from_toml_str(
            r#"
            [needs]
            urgent_threshold = 90.0
            critical_threshold = 80.0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[movement]\ntiles_per_tick = 2").unwrap();
        let config = SimConfig::load(file.path()).unwrap();
        assert_eq!(config.movement.tiles_per_tick, 2);
    }

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let text = SimConfig::default().to_toml().unwrap();
        let parsed = SimConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.tasks.types, SimConfig::default().tasks.types);
    }
}
