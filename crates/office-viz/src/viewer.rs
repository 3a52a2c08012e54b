//! Per-observer view state.
//!
//! Everything one viewer owns: the cached world, displayed motion, sprite
//! sheets, bubbles, the selection and the frame counter. Nothing here is
//! shared with the simulation or with other viewers.

use bevy::prelude::Resource;
use office_events::SimEvent;

use crate::bubbles::BubbleManager;
use crate::config::ViewerConfig;
use crate::interpolation::Interpolator;
use crate::render::{plan_frame, RenderPlan};
use crate::sprites::SpriteCache;
use crate::state_cache::ObserverState;

#[derive(Resource, Debug)]
pub struct Viewer {
    pub state: ObserverState,
    pub motion: Interpolator,
    pub sprites: SpriteCache,
    pub bubbles: BubbleManager,
    pub selected: Option<String>,
    pub frame: u64,
    /// Set when a new world arrived and the scene must be rebuilt
    pub needs_rebuild: bool,
}

impl Viewer {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            state: ObserverState::default(),
            motion: Interpolator::new(config.motion),
            sprites: SpriteCache::default(),
            bubbles: BubbleManager::new(config.bubbles, config.max_bubbles),
            selected: None,
            frame: 0,
            needs_rebuild: false,
        }
    }

    /// Applies one event from the stream
    pub fn ingest(&mut self, event: &SimEvent) {
        let applied = self.state.apply(event);
        if applied.reset {
            tracing::info!(run_id = ?self.state.run_id, "new simulation instance");
            self.motion.clear();
            self.sprites.clear();
            self.bubbles.clear();
            self.selected = None;
            self.needs_rebuild = true;
        }
        if let Some(line) = applied.line {
            let anchor = self.position_of(&line.speaker_id);
            self.bubbles.push(&line.speaker_id, &line.text, anchor);
        }
        if let SimEvent::TickState(_) = event {
            let state = &self.state;
            self.motion
                .retain(|id| state.character(id).is_some());
        }
    }

    /// Latest known position: displayed if interpolated, else authoritative
    pub fn position_of(&self, character_id: &str) -> Option<(f32, f32)> {
        self.motion
            .get(character_id)
            .map(|m| (m.x, m.y))
            .or_else(|| self.state.character(character_id).map(|c| (c.x, c.y)))
    }

    /// One interpolation frame for every character
    pub fn advance_frame(&mut self) {
        self.frame += 1;
        let targets: Vec<_> = self
            .state
            .characters()
            .iter()
            .map(|c| (c.character_id.clone(), c.x, c.y, c.facing))
            .collect();
        for (id, x, y, facing) in targets {
            let shown = self.motion.advance(&id, x, y, facing);
            self.bubbles.set_anchor(&id, (shown.x, shown.y));
        }
    }

    pub fn plan(&self) -> RenderPlan {
        plan_frame(&self.state, &self.motion, self.selected.as_deref(), self.frame)
    }

    /// Tab: next character in id order
    pub fn select_next(&mut self) {
        self.selected = self.state.next_character(self.selected.as_deref());
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(&ViewerConfig::default())
    }
}
