use bevy::prelude::Vec2;

/// Pixel coordinates in window space (origin top-left, Y-down).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PxPos {
    pub x: f32,
    pub y: f32,
}

impl PxPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Viewport size in the same units as [`PxPos`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

/// Convert window pixels (Y-down) to normalized device coordinates in
/// `[-1, 1]` (Y-up).
pub fn px_to_ndc(px: PxPos, viewport: Viewport) -> Vec2 {
    Vec2::new(
        (px.x / viewport.width) * 2.0 - 1.0,
        1.0 - 2.0 * (px.y / viewport.height),
    )
}

/// Convert normalized device coordinates back to window pixels.
pub fn ndc_to_px(ndc: Vec2, viewport: Viewport) -> PxPos {
    PxPos {
        x: (ndc.x + 1.0) * 0.5 * viewport.width,
        y: (1.0 - ndc.y) * 0.5 * viewport.height,
    }
}
