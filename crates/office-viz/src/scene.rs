//! Scene rendering: background, character sprites, overlays, status line.

use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use std::collections::{HashMap, HashSet};

use crate::animation::FrameKey;
use crate::config::ViewerConfig;
use crate::live::LiveSim;
use crate::render::{background_pixels, highlight_pulse, indicator_bob};
use crate::sprites::{SPRITE_HEIGHT, SPRITE_WIDTH};
use crate::viewer::Viewer;

/// Plugin for map and character rendering.
pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FrameImages>()
            .add_systems(Startup, setup_scene)
            .add_systems(FixedUpdate, advance_motion)
            .add_systems(
                Update,
                (
                    rebuild_scene,
                    sync_characters,
                    draw_overlays,
                    update_status_line,
                )
                    .chain(),
            );
    }
}

const CHARACTER_Z: f32 = 10.0;
const LABEL_Z: f32 = 40.0;

/// Uploaded sprite frames by character and frame key
#[derive(Resource, Default)]
pub struct FrameImages {
    map: HashMap<(String, FrameKey), Handle<Image>>,
}

#[derive(Component)]
struct SceneBackground;

#[derive(Component)]
struct CharacterSprite {
    character_id: String,
}

#[derive(Component)]
struct NameLabel {
    character_id: String,
}

#[derive(Component)]
struct StatusLine;

fn rgba_image(width: u32, height: u32, pixels: Vec<u8>) -> Image {
    Image::new(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        pixels,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    )
}

fn setup_scene(mut commands: Commands) {
    commands.spawn(Camera2dBundle::default());
    commands.spawn((
        TextBundle::from_section(
            "Waiting for simulation...",
            TextStyle {
                font_size: 16.0,
                color: Color::WHITE,
                ..default()
            },
        )
        .with_style(Style {
            position_type: PositionType::Absolute,
            top: Val::Px(8.0),
            left: Val::Px(8.0),
            ..default()
        }),
        StatusLine,
    ));
}

fn advance_motion(mut viewer: ResMut<Viewer>) {
    viewer.advance_frame();
}

/// Rebuilds the static background and drops per-instance entities when a
/// new world arrives.
#[allow(clippy::too_many_arguments)]
fn rebuild_scene(
    mut commands: Commands,
    config: Res<ViewerConfig>,
    mut viewer: ResMut<Viewer>,
    mut images: ResMut<Assets<Image>>,
    mut frames: ResMut<FrameImages>,
    stale: Query<Entity, Or<(With<SceneBackground>, With<CharacterSprite>, With<NameLabel>)>>,
    mut camera: Query<&mut Transform, With<Camera2d>>,
) {
    if !viewer.needs_rebuild {
        return;
    }
    viewer.needs_rebuild = false;

    for entity in stale.iter() {
        commands.entity(entity).despawn_recursive();
    }
    for (_, handle) in frames.map.drain() {
        images.remove(&handle);
    }

    let Some(map) = viewer.state.map.clone() else {
        return;
    };
    let px = config.tile_px;
    let center = Vec2::new(
        (map.width - 1) as f32 * px / 2.0,
        -((map.height - 1) as f32) * px / 2.0,
    );
    let background = images.add(rgba_image(
        map.width.max(1) as u32,
        map.height.max(1) as u32,
        background_pixels(&map),
    ));
    commands.spawn((
        SpriteBundle {
            texture: background,
            sprite: Sprite {
                custom_size: Some(Vec2::new(map.width as f32 * px, map.height as f32 * px)),
                ..default()
            },
            transform: Transform::from_xyz(center.x, center.y, 0.0),
            ..default()
        },
        SceneBackground,
    ));

    for zone in &map.zones {
        let (x, y) = config.tile_to_world(zone.x as f32 - 0.4, zone.y as f32 - 0.3);
        commands.spawn((
            Text2dBundle {
                text: Text::from_section(
                    zone.name.clone(),
                    TextStyle {
                        font_size: 11.0,
                        color: Color::srgba(0.2, 0.2, 0.25, 0.8),
                        ..default()
                    },
                ),
                text_anchor: bevy::sprite::Anchor::TopLeft,
                transform: Transform::from_xyz(x, y, 1.0),
                ..default()
            },
            SceneBackground,
        ));
    }

    if let Ok(mut transform) = camera.get_single_mut() {
        transform.translation.x = center.x;
        transform.translation.y = center.y;
    }
    tracing::info!(width = map.width, height = map.height, zones = map.zones.len(), "scene rebuilt");
}

/// Spawns, moves and re-frames character sprites from the render plan.
#[allow(clippy::too_many_arguments)]
fn sync_characters(
    mut commands: Commands,
    config: Res<ViewerConfig>,
    mut viewer: ResMut<Viewer>,
    mut images: ResMut<Assets<Image>>,
    mut frames: ResMut<FrameImages>,
    mut sprites: Query<(Entity, &CharacterSprite, &mut Transform, &mut Handle<Image>), Without<NameLabel>>,
    mut labels: Query<(Entity, &NameLabel, &mut Transform, &mut Text), Without<CharacterSprite>>,
) {
    let plan = viewer.plan();
    let px = config.tile_px;
    let size = Vec2::new(px * 0.8, px * 0.8 * SPRITE_HEIGHT as f32 / SPRITE_WIDTH as f32);
    let present: HashSet<&str> = plan.characters.iter().map(|c| c.character_id.as_str()).collect();

    let mut sprite_entities: HashMap<String, Entity> = HashMap::new();
    for (entity, sprite, _, _) in sprites.iter() {
        if present.contains(sprite.character_id.as_str()) {
            sprite_entities.insert(sprite.character_id.clone(), entity);
        } else {
            commands.entity(entity).despawn_recursive();
        }
    }
    let mut label_entities: HashMap<String, Entity> = HashMap::new();
    for (entity, label, _, _) in labels.iter() {
        if present.contains(label.character_id.as_str()) {
            label_entities.insert(label.character_id.clone(), entity);
        } else {
            commands.entity(entity).despawn_recursive();
        }
    }

    for (order, draw) in plan.characters.iter().enumerate() {
        let key = (draw.character_id.clone(), draw.frame);
        let handle = match frames.map.get(&key) {
            Some(handle) => handle.clone(),
            None => {
                let Some(appearance) = viewer
                    .state
                    .character(&draw.character_id)
                    .map(|c| c.appearance.clone())
                else {
                    continue;
                };
                let sheet = viewer.sprites.get_or_build(&draw.character_id, &appearance);
                let Some(pixels) = sheet.frame(draw.frame) else {
                    continue;
                };
                let handle = images.add(rgba_image(
                    SPRITE_WIDTH as u32,
                    SPRITE_HEIGHT as u32,
                    pixels.to_vec(),
                ));
                frames.map.insert(key, handle.clone());
                handle
            }
        };

        let (x, y) = config.tile_to_world(draw.x, draw.y);
        let z = CHARACTER_Z + order as f32 * 0.01;
        let body = Vec3::new(x, y + size.y * 0.3, z);
        match sprite_entities.get(&draw.character_id).and_then(|&e| sprites.get_mut(e).ok()) {
            Some((_, _, mut transform, mut texture)) => {
                transform.translation = body;
                if *texture != handle {
                    *texture = handle;
                }
            }
            None => {
                commands.spawn((
                    SpriteBundle {
                        texture: handle,
                        sprite: Sprite {
                            custom_size: Some(size),
                            ..default()
                        },
                        transform: Transform::from_translation(body),
                        ..default()
                    },
                    CharacterSprite {
                        character_id: draw.character_id.clone(),
                    },
                ));
            }
        }

        let label_pos = Vec3::new(x, y - px * 0.45, LABEL_Z);
        match label_entities.get(&draw.character_id).and_then(|&e| labels.get_mut(e).ok()) {
            Some((_, _, mut transform, mut text)) => {
                transform.translation = label_pos;
                if text.sections[0].value != draw.label {
                    text.sections[0].value = draw.label.clone();
                }
            }
            None => {
                commands.spawn((
                    Text2dBundle {
                        text: Text::from_section(
                            draw.label.clone(),
                            TextStyle {
                                font_size: 10.0,
                                color: Color::srgb(0.1, 0.1, 0.12),
                                ..default()
                            },
                        ),
                        transform: Transform::from_translation(label_pos),
                        ..default()
                    },
                    NameLabel {
                        character_id: draw.character_id.clone(),
                    },
                ));
            }
        }
    }
}

/// Selection outline and work indicators.
fn draw_overlays(mut gizmos: Gizmos, config: Res<ViewerConfig>, viewer: Res<Viewer>) {
    let px = config.tile_px;
    let plan = viewer.plan();
    for draw in &plan.characters {
        let (x, y) = config.tile_to_world(draw.x, draw.y);
        if draw.selected {
            let pulse = highlight_pulse(viewer.frame);
            gizmos.rect_2d(
                Vec2::new(x, y + px * 0.25),
                0.0,
                Vec2::new(px * pulse + px * 0.3, px * 1.4 * pulse + px * 0.2),
                Color::srgba(1.0, 0.85, 0.2, pulse),
            );
        }
        if draw.working {
            let bob = indicator_bob(viewer.frame) * px;
            gizmos.circle_2d(
                Vec2::new(x, y + px * 1.05 + bob),
                px * 0.12,
                Color::srgb(0.2, 0.75, 0.35),
            );
        }
    }
}

fn update_status_line(
    viewer: Res<Viewer>,
    live: Option<Res<LiveSim>>,
    mut text: Query<&mut Text, With<StatusLine>>,
) {
    let Ok(mut text) = text.get_single_mut() else {
        return;
    };
    let state = &viewer.state;
    let mut line = match &state.snapshot {
        Some(snapshot) => format!(
            "Tick {}  {}  {:?}  {}ms/tick  {} people",
            snapshot.tick,
            snapshot.sim_time,
            state.status,
            state.tick_interval_ms.map(|ms| ms.to_string()).unwrap_or_else(|| "-".into()),
            snapshot.characters.len(),
        ),
        None => "Waiting for simulation...".to_string(),
    };
    if let Some(c) = viewer.selected.as_deref().and_then(|id| state.character(id)) {
        line.push_str(&format!(
            "\n{}: {} (mood {:.0}, bladder {:.0} hunger {:.0} thirst {:.0})",
            c.name, c.state, c.mood, c.needs.bladder, c.needs.hunger, c.needs.thirst
        ));
        if let Some(task) = &c.task_id {
            line.push_str(&format!(" on {}", task));
        }
    }
    if let Some(snapshot) = &state.snapshot {
        for event in &snapshot.active_events {
            line.push_str(&format!("\n! {}", event.description));
        }
    }
    if let Some(err) = live.as_ref().and_then(|l| l.last_error.clone()).or_else(|| state.last_error.clone()) {
        line.push_str(&format!("\nerror: {}", err));
    }
    if text.sections[0].value != line {
        text.sections[0].value = line;
    }
}
