pub const WINDOW_WIDTH: u32 = 1280;
pub const WINDOW_HEIGHT: u32 = 800;

pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:9001/ws";

/// Vertical field of view of both cameras, in degrees.
pub const CAMERA_FOV_DEG: f32 = 60.0;
pub const CAMERA_NEAR: f32 = 1.0;
pub const CAMERA_FAR: f32 = 100_000.0;
/// Distance of the main camera from the bubble plane (z = 0).
pub const CAMERA_DISTANCE: f32 = 2000.0;

pub const BUBBLE_RADIUS: f32 = 100.0;
pub const BUBBLE_SECTORS: u32 = 32;
pub const BUBBLE_STACKS: u32 = 16;
pub const BUBBLE_SCALE: f32 = 3.0;
pub const BUBBLE_ALPHA: f32 = 0.55;

/// Directory under `assets/` holding the six skybox faces.
pub const SKYBOX_DIR: &str = "img/bubbles";
pub const SKYBOX_FORMAT: &str = "jpg";
/// Skybox luminance, in cd/m².
pub const SKYBOX_BRIGHTNESS: f32 = 1000.0;
/// Strength of the cube map reflected by the bubbles.
pub const ENV_MAP_INTENSITY: f32 = 1500.0;
/// Render layer of the backdrop camera. Nothing is spawned on it; the pass
/// only draws the skybox.
pub const BACKDROP_LAYER: usize = 1;

#[derive(Clone, Copy)]
pub struct Colors;

impl Colors {
    pub const CLEAR: u32 = 0x000000;
    pub const BUBBLE: u32 = 0xdff4ff;
    pub const KEY_LIGHT: u32 = 0xffffff;
}

pub fn color_from_hex(rgb: u32) -> bevy::prelude::Color {
    let r = ((rgb >> 16) & 0xff) as f32 / 255.0;
    let g = ((rgb >> 8) & 0xff) as f32 / 255.0;
    let b = (rgb & 0xff) as f32 / 255.0;
    bevy::prelude::Color::srgb(r, g, b)
}
