use bevy::asset::{LoadState, RenderAssetUsages};
use bevy::core_pipeline::Skybox;
use bevy::light::EnvironmentMapLight;
use bevy::prelude::*;
use bevy::render::render_resource::{
    Extent3d, TextureDimension, TextureViewDescriptor, TextureViewDimension,
};
use thiserror::Error;

use crate::constants::{ENV_MAP_INTENSITY, SKYBOX_BRIGHTNESS, SKYBOX_DIR, SKYBOX_FORMAT};

use super::core::{BackdropCamera, MainCamera};

/// Cube-map backdrop. The same cube is drawn behind everything by the
/// backdrop camera and reflected by the bubbles through the main camera's
/// environment light.
pub struct BackdropPlugin;

/// Cube faces in layer order: +X, -X, +Y, -Y, +Z, -Z.
const FACE_NAMES: [&str; 6] = ["posx", "negx", "posy", "negy", "posz", "negz"];

#[derive(Debug, Error, PartialEq)]
pub(crate) enum CubeMapError {
    #[error("expected 6 cube faces, got {0}")]
    FaceCount(usize),
    #[error("cube face is {width}x{height}, faces must be square")]
    NotSquare { width: u32, height: u32 },
    #[error("cube face {0} differs in size or format from face 0")]
    Mismatch(usize),
    #[error("cube face {0} has no pixel data")]
    NoData(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CubeMapState {
    Loading,
    Attached,
    Failed,
}

#[derive(Resource)]
struct CubeMapFaces {
    faces: Vec<Handle<Image>>,
    state: CubeMapState,
}

impl Plugin for BackdropPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_cube_faces)
            .add_systems(Update, attach_cube_map);
    }
}

fn face_path(name: &str) -> String {
    format!("{SKYBOX_DIR}/{name}.{SKYBOX_FORMAT}")
}

fn load_cube_faces(mut commands: Commands, asset_server: Res<AssetServer>) {
    let faces = FACE_NAMES
        .iter()
        .map(|name| asset_server.load(face_path(name)))
        .collect();
    commands.insert_resource(CubeMapFaces {
        faces,
        state: CubeMapState::Loading,
    });
}

/// Stack six square faces of one size and format into a cube texture.
pub(crate) fn stack_faces(faces: &[&Image]) -> Result<Image, CubeMapError> {
    if faces.len() != FACE_NAMES.len() {
        return Err(CubeMapError::FaceCount(faces.len()));
    }

    let first = faces[0];
    let (size, format) = (first.width(), first.texture_descriptor.format);
    if first.height() != size {
        return Err(CubeMapError::NotSquare {
            width: size,
            height: first.height(),
        });
    }

    let mut data = Vec::new();
    for (i, face) in faces.iter().enumerate() {
        if face.width() != size || face.height() != size || face.texture_descriptor.format != format
        {
            return Err(CubeMapError::Mismatch(i));
        }
        let bytes = face.data.as_ref().ok_or(CubeMapError::NoData(i))?;
        data.extend_from_slice(bytes);
    }

    let mut cube = Image::new(
        Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: FACE_NAMES.len() as u32,
        },
        TextureDimension::D2,
        data,
        format,
        RenderAssetUsages::default(),
    );
    cube.texture_view_descriptor = Some(TextureViewDescriptor {
        dimension: Some(TextureViewDimension::Cube),
        ..default()
    });
    Ok(cube)
}

/// Once every face is in, build the cube and hand it to both cameras.
fn attach_cube_map(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut images: ResMut<Assets<Image>>,
    mut pending: ResMut<CubeMapFaces>,
    q_backdrop: Query<Entity, With<BackdropCamera>>,
    q_main: Query<Entity, With<MainCamera>>,
) {
    if pending.state != CubeMapState::Loading {
        return;
    }

    if let Some(failed) = pending
        .faces
        .iter()
        .find(|h| matches!(asset_server.load_state(h.id()), LoadState::Failed(_)))
    {
        warn!(
            "Skybox face {:?} failed to load; drawing without backdrop",
            asset_server.get_path(failed.id())
        );
        pending.state = CubeMapState::Failed;
        return;
    }

    let Some(faces) = pending
        .faces
        .iter()
        .map(|h| images.get(h))
        .collect::<Option<Vec<&Image>>>()
    else {
        return;
    };

    let cube = match stack_faces(&faces) {
        Ok(cube) => cube,
        Err(e) => {
            warn!("Skybox cube map rejected: {}", e);
            pending.state = CubeMapState::Failed;
            return;
        }
    };
    let cube = images.add(cube);

    for entity in &q_backdrop {
        commands.entity(entity).insert(Skybox {
            image: cube.clone(),
            brightness: SKYBOX_BRIGHTNESS,
            ..default()
        });
    }
    for entity in &q_main {
        commands.entity(entity).insert(EnvironmentMapLight {
            diffuse_map: cube.clone(),
            specular_map: cube.clone(),
            intensity: ENV_MAP_INTENSITY,
            ..default()
        });
    }

    info!("Skybox cube map attached");
    pending.state = CubeMapState::Attached;
}
