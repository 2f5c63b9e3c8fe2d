use bevy::input::touch::{TouchInput, TouchPhase};
use bevy::prelude::*;
use bevy::window::CursorMoved;

use crate::coord::{px_to_ndc, PxPos, Viewport};
use crate::shared::connection::ServerConnection;
use crate::shared::session::Session;

use super::UpdateSet;

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, pointer_input_system.in_set(UpdateSet::Input));
    }
}

/// NDC under `position` in `window`, or `None` while the window has no area.
fn window_ndc(window: &Window, position: Vec2) -> Option<Vec2> {
    let viewport = Viewport::new(window.width(), window.height());
    if viewport.is_empty() {
        return None;
    }
    Some(px_to_ndc(PxPos::new(position.x, position.y), viewport))
}

/// Mouse and touch drags feed the same path. Every event sends one update.
fn pointer_input_system(
    mut cursor: MessageReader<CursorMoved>,
    mut touches: MessageReader<TouchInput>,
    q_windows: Query<&Window>,
    mut session: ResMut<Session>,
    conn: Res<ServerConnection>,
) {
    let moves = cursor.read().map(|e| (e.window, e.position)).chain(
        touches
            .read()
            .filter(|t| matches!(t.phase, TouchPhase::Started | TouchPhase::Moved))
            .map(|t| (t.window, t.position)),
    );

    for (window, position) in moves {
        let Ok(window) = q_windows.get(window) else {
            continue;
        };
        let Some(ndc) = window_ndc(window, position) else {
            continue;
        };
        if let Some(msg) = session.pointer_moved(ndc) {
            conn.send(msg);
        }
    }
}
