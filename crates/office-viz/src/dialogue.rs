//! Bubble clock and bubble text entities.

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::config::ViewerConfig;
use crate::viewer::Viewer;

pub struct DialoguePlugin;

impl Plugin for DialoguePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_bubble_clock)
            .add_systems(Update, (tick_bubbles, sync_bubbles).chain());
    }
}

const BUBBLE_Z: f32 = 50.0;
const BUBBLE_WRAP_TILES: f32 = 7.0;

/// Fixed-cadence clock driving typing and fading
#[derive(Resource)]
struct BubbleClock(Timer);

#[derive(Component)]
struct BubbleText {
    id: u64,
}

fn setup_bubble_clock(mut commands: Commands, config: Res<ViewerConfig>) {
    let secs = (config.bubbles.tick_ms / 1000.0).max(0.001);
    commands.insert_resource(BubbleClock(Timer::from_seconds(secs, TimerMode::Repeating)));
}

fn tick_bubbles(time: Res<Time>, clock: Option<ResMut<BubbleClock>>, mut viewer: ResMut<Viewer>) {
    let Some(mut clock) = clock else {
        return;
    };
    clock.0.tick(time.delta());
    let step_ms = clock.0.duration().as_secs_f32() * 1000.0;
    for _ in 0..clock.0.times_finished_this_tick() {
        viewer.bubbles.tick(step_ms);
    }
}

fn sync_bubbles(
    mut commands: Commands,
    config: Res<ViewerConfig>,
    viewer: Res<Viewer>,
    mut texts: Query<(Entity, &BubbleText, &mut Text, &mut Transform)>,
) {
    let timings = *viewer.bubbles.timings();
    let px = config.tile_px;
    let live: HashSet<u64> = viewer.bubbles.bubbles().map(|b| b.id).collect();

    let mut existing: HashMap<u64, Entity> = HashMap::new();
    for (entity, bubble, _, _) in texts.iter() {
        if live.contains(&bubble.id) {
            existing.insert(bubble.id, entity);
        } else {
            commands.entity(entity).despawn_recursive();
        }
    }

    for (stack, bubble) in viewer.bubbles.bubbles().enumerate() {
        let (x, y) = config.tile_to_world(bubble.anchor.0, bubble.anchor.1);
        let position = Vec3::new(x, y + px * 1.6, BUBBLE_Z + stack as f32 * 0.01);
        let color = Color::srgba(0.05, 0.05, 0.08, bubble.opacity(&timings));
        let shown = bubble.visible_text();

        match existing.get(&bubble.id).and_then(|&e| texts.get_mut(e).ok()) {
            Some((_, _, mut text, mut transform)) => {
                transform.translation = position;
                let section = &mut text.sections[0];
                if section.value != shown {
                    section.value = shown;
                }
                section.style.color = color;
            }
            None => {
                commands.spawn((
                    Text2dBundle {
                        text: Text::from_section(
                            shown,
                            TextStyle {
                                font_size: 12.0,
                                color,
                                ..default()
                            },
                        )
                        .with_justify(JustifyText::Center),
                        text_anchor: bevy::sprite::Anchor::BottomCenter,
                        text_2d_bounds: bevy::text::Text2dBounds {
                            size: Vec2::new(px * BUBBLE_WRAP_TILES, f32::INFINITY),
                        },
                        transform: Transform::from_translation(position),
                        ..default()
                    },
                    BubbleText { id: bubble.id },
                ));
            }
        }
    }
}
