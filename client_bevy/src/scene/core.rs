use bevy::camera::visibility::RenderLayers;
use bevy::camera::ClearColorConfig;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::constants::{color_from_hex, Colors, BACKDROP_LAYER};
use crate::coord::Viewport;
use crate::projection::CameraRig;
use crate::shared::connection::ServerConnection;
use crate::shared::session::Session;

/// Per-frame order: drain the relay, apply local input, follow the window,
/// then reconcile the scene. Rendering runs after all of them.
#[derive(SystemSet, Debug, Hash, Eq, PartialEq, Clone)]
pub(crate) enum UpdateSet {
    Network,
    Input,
    Viewport,
    Scene,
}

pub struct CorePlugin {
    pub ws_url: String,
}

#[derive(Component)]
pub(crate) struct MainCamera;

#[derive(Component)]
pub(crate) struct BackdropCamera;

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ServerConnection::new(self.ws_url.clone()))
            .init_resource::<Session>()
            .init_resource::<CameraRig>()
            .insert_resource(ClearColor(color_from_hex(Colors::CLEAR)))
            .configure_sets(
                Update,
                (
                    UpdateSet::Network,
                    UpdateSet::Input,
                    UpdateSet::Viewport,
                    UpdateSet::Scene,
                )
                    .chain(),
            )
            .add_systems(Startup, setup_cameras)
            .add_systems(Update, fit_rig_to_window.in_set(UpdateSet::Viewport));
    }
}

fn setup_cameras(mut commands: Commands, rig: Res<CameraRig>) {
    let projection = Projection::Perspective(PerspectiveProjection {
        fov: rig.fov_y,
        aspect_ratio: rig.aspect,
        near: rig.near,
        far: rig.far,
        ..default()
    });

    // Backdrop pass: draws the skybox and clears the target.
    commands.spawn((
        Camera3d::default(),
        Camera {
            order: 0,
            ..default()
        },
        projection.clone(),
        Transform::IDENTITY,
        Msaa::Off,
        RenderLayers::layer(BACKDROP_LAYER),
        BackdropCamera,
    ));

    // Bubble pass, drawn over the backdrop without clearing.
    commands.spawn((
        Camera3d::default(),
        Camera {
            order: 1,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        projection,
        Transform::from_translation(rig.position),
        Msaa::Off,
        MainCamera,
    ));

    commands.spawn((
        DirectionalLight {
            color: color_from_hex(Colors::KEY_LIGHT),
            illuminance: 8_000.0,
            ..default()
        },
        Transform::from_xyz(1.0, 2.0, 3.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Keep the rig's aspect ratio in step with the window. A change moves every
/// bubble, so the session is marked dirty.
fn fit_rig_to_window(
    q_window: Query<&Window, With<PrimaryWindow>>,
    mut rig: ResMut<CameraRig>,
    mut session: ResMut<Session>,
) {
    let Ok(window) = q_window.single() else {
        return;
    };

    let viewport = Viewport::new(window.width(), window.height());
    if viewport.is_empty() {
        return;
    }

    let aspect = viewport.aspect();
    if (rig.aspect - aspect).abs() > 1e-4 {
        rig.aspect = aspect;
        session.mark_dirty();
    }
}
