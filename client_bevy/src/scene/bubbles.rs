use std::collections::{BTreeMap, HashMap};

use bevy::prelude::*;

use crate::constants::{
    color_from_hex, Colors, BUBBLE_ALPHA, BUBBLE_RADIUS, BUBBLE_SCALE, BUBBLE_SECTORS,
    BUBBLE_STACKS,
};
use crate::projection::CameraRig;
use crate::shared::protocol::{UserId, UserState};
use crate::shared::session::Session;

use super::UpdateSet;

pub struct BubblesPlugin;

/// One sphere per user, tagged with the user's id.
#[derive(Component, Debug)]
pub(crate) struct Bubble {
    pub(crate) user_id: UserId,
}

/// Geometry and material shared by every bubble.
#[derive(Resource)]
pub(crate) struct BubbleAssets {
    pub(crate) mesh: Handle<Mesh>,
    pub(crate) material: Handle<StandardMaterial>,
}

/// Live bubble entities by user id.
#[derive(Resource, Default, Debug)]
pub(crate) struct BubbleRegistry {
    entities: HashMap<UserId, Entity>,
}

/// What a reconcile pass has to do to make the registry match the users.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ReconcilePlan {
    pub(crate) spawn: Vec<UserId>,
    pub(crate) despawn: Vec<(UserId, Entity)>,
}

impl BubbleRegistry {
    pub(crate) fn plan<V>(&self, users: &BTreeMap<UserId, V>) -> ReconcilePlan {
        let spawn = users
            .keys()
            .filter(|id| !self.entities.contains_key(*id))
            .cloned()
            .collect();
        let mut despawn: Vec<(UserId, Entity)> = self
            .entities
            .iter()
            .filter(|(id, _)| !users.contains_key(*id))
            .map(|(id, e)| (id.clone(), *e))
            .collect();
        despawn.sort_by(|a, b| a.0.cmp(&b.0));
        ReconcilePlan { spawn, despawn }
    }

    pub(crate) fn insert(&mut self, id: UserId, entity: Entity) {
        self.entities.insert(id, entity);
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Entity> {
        self.entities.remove(id)
    }

    pub(crate) fn get(&self, id: &str) -> Option<Entity> {
        self.entities.get(id).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.entities.len()
    }
}

impl Plugin for BubblesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BubbleRegistry>()
            .add_systems(Startup, setup_bubble_assets)
            .add_systems(Update, sync_bubbles_system.in_set(UpdateSet::Scene));
    }
}

fn setup_bubble_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mesh = meshes.add(
        Sphere::new(BUBBLE_RADIUS)
            .mesh()
            .uv(BUBBLE_SECTORS, BUBBLE_STACKS),
    );
    let material = materials.add(StandardMaterial {
        base_color: color_from_hex(Colors::BUBBLE).with_alpha(BUBBLE_ALPHA),
        metallic: 0.0,
        perceptual_roughness: 0.05,
        reflectance: 1.0,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });
    commands.insert_resource(BubbleAssets { mesh, material });
}

fn bubble_xy(rig: &CameraRig, user: &UserState) -> Option<Vec2> {
    rig.reproject(Vec2::new(user.x as f32, user.y as f32))
        .map(|p| p.truncate())
}

/// Update step. Runs only when the session is dirty: despawn bubbles of users
/// that are gone, spawn bubbles for new users, then place every bubble under
/// its user's pointer. Depth is never touched.
pub(crate) fn sync_bubbles_system(
    mut commands: Commands,
    mut session: ResMut<Session>,
    mut registry: ResMut<BubbleRegistry>,
    assets: Res<BubbleAssets>,
    rig: Res<CameraRig>,
    mut q_bubbles: Query<(&Bubble, &mut Transform)>,
) {
    if !session.take_dirty() {
        return;
    }

    let plan = registry.plan(session.users());

    for (id, entity) in plan.despawn {
        registry.remove(&id);
        if let Ok(mut entity_commands) = commands.get_entity(entity) {
            entity_commands.despawn();
        }
    }

    for id in plan.spawn {
        let Some(user) = session.user(&id) else {
            continue;
        };
        let xy = bubble_xy(&rig, user).unwrap_or(Vec2::ZERO);
        let entity = commands
            .spawn((
                Bubble {
                    user_id: id.clone(),
                },
                Name::new(id.clone()),
                Mesh3d(assets.mesh.clone()),
                MeshMaterial3d(assets.material.clone()),
                Transform::from_xyz(xy.x, xy.y, 0.0).with_scale(Vec3::splat(BUBBLE_SCALE)),
            ))
            .id();
        registry.insert(id, entity);
    }

    // Bubbles spawned above are not queryable until commands apply; they
    // were placed at spawn.
    for (bubble, mut transform) in &mut q_bubbles {
        let Some(user) = session.user(&bubble.user_id) else {
            continue;
        };
        if let Some(xy) = bubble_xy(&rig, user) {
            transform.translation.x = xy.x;
            transform.translation.y = xy.y;
        }
    }
}
