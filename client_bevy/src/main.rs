mod constants;
mod coord;
mod projection;
mod scene;
mod shared;

use bevy::prelude::*;
use bevy::window::{PresentMode, WindowResolution};

use constants::{DEFAULT_WS_URL, WINDOW_HEIGHT, WINDOW_WIDTH};
use scene::{BackdropPlugin, BubblesPlugin, CorePlugin, InputPlugin, NetworkPlugin};

fn main() {
    let ws_url = ws_url_from_env();

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Bubbles".to_string(),
                resolution: WindowResolution::new(WINDOW_WIDTH, WINDOW_HEIGHT),
                present_mode: PresentMode::AutoVsync,
                resizable: true,
                ..default()
            }),
            ..default()
        }))
        .add_plugins(CorePlugin { ws_url })
        .add_plugins(BackdropPlugin)
        .add_plugins(BubblesPlugin)
        .add_plugins(InputPlugin)
        .add_plugins(NetworkPlugin)
        .run();
}

fn ws_url_from_env() -> String {
    match std::env::var("BUBBLES_WS_URL") {
        Ok(raw) => checked_ws_url(&raw).unwrap_or_else(|| {
            // Logging is not up yet.
            eprintln!("BUBBLES_WS_URL={raw:?} is not a ws:// or wss:// URL, using {DEFAULT_WS_URL}");
            DEFAULT_WS_URL.to_string()
        }),
        Err(_) => DEFAULT_WS_URL.to_string(),
    }
}

fn checked_ws_url(raw: &str) -> Option<String> {
    let url = url::Url::parse(raw.trim()).ok()?;
    matches!(url.scheme(), "ws" | "wss").then(|| url.to_string())
}
