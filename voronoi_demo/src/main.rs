mod diagram;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use diagram::{compute_diagram, line_mesh, BoundingBox, Site};

const SITES: [Site; 3] = [
    Site::new(100.0, 200.0),
    Site::new(50.0, 250.0),
    Site::new(50.0, 100.0),
];

const LINE_COLOR: u32 = 0xfff3ff;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Voronoi".to_string(),
                ..default()
            }),
            ..default()
        }))
        .add_systems(Startup, (setup_camera, spawn_diagram))
        .run();
}

fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: 50f32.to_radians(),
            near: 1.0,
            far: 1000.0,
            ..default()
        }),
        Transform::from_xyz(0.0, 150.0, 500.0),
        children![(
            PointLight {
                color: Color::WHITE,
                intensity: 800_000.0,
                range: 1000.0,
                ..default()
            },
            Transform::default(),
        )],
    ));
}

fn spawn_diagram(
    mut commands: Commands,
    q_window: Query<&Window, With<PrimaryWindow>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Ok(window) = q_window.single() else {
        warn!("No primary window; skipping diagram");
        return;
    };
    let bbox = BoundingBox::from_size(f64::from(window.width()), f64::from(window.height()));

    let diagram = match compute_diagram(&SITES, bbox) {
        Ok(d) => d,
        Err(e) => {
            error!("Voronoi diagram failed: {}", e);
            return;
        }
    };
    info!(
        "Voronoi diagram: {} vertices, {} edges",
        diagram.vertices.len(),
        diagram.edges.len()
    );

    commands.spawn((
        Name::new("voronoi"),
        Mesh3d(meshes.add(line_mesh(&diagram))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb_u8(
                (LINE_COLOR >> 16) as u8,
                (LINE_COLOR >> 8) as u8,
                LINE_COLOR as u8,
            ),
            unlit: true,
            ..default()
        })),
        Transform::default(),
    ));
}
