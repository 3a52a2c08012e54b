//! Main viewer plugin that ties all systems together.

use bevy::prelude::*;

use crate::config::ViewerConfig;
use crate::dialogue::DialoguePlugin;
use crate::input::InputPlugin;
use crate::live::LivePlugin;
use crate::scene::ScenePlugin;
use crate::viewer::Viewer;

/// Main plugin for the office viewer.
///
/// Sets up the window from the `ViewerConfig` resource (inserted before the
/// plugin, or the default), fixes the interpolation rate to the configured
/// frame rate and adds the sub-plugins.
pub struct OfficeVizPlugin;

impl Plugin for OfficeVizPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<ViewerConfig>()
            .cloned()
            .unwrap_or_default();

        app.add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Office Simulation".into(),
                        resolution: (config.window_width, config.window_height).into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(ImagePlugin::default_nearest()),
        )
        .insert_resource(ClearColor(Color::srgb_u8(0x2b, 0x2d, 0x33)))
        .insert_resource(Time::<Fixed>::from_seconds(config.frame_interval_secs()))
        .insert_resource(Viewer::new(&config))
        .insert_resource(config)
        .add_plugins((LivePlugin, ScenePlugin, DialoguePlugin, InputPlugin));
    }
}
