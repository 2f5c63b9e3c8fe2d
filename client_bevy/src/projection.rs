use bevy::prelude::{Mat4, Resource, Vec2, Vec3};

use crate::constants::{
    CAMERA_DISTANCE, CAMERA_FAR, CAMERA_FOV_DEG, CAMERA_NEAR, WINDOW_HEIGHT, WINDOW_WIDTH,
};

/// NDC depth used when unprojecting a pointer. Any depth inside the frustum
/// gives the same ray; this one sits between the near and far planes.
const UNPROJECT_DEPTH: f32 = 0.5;

/// Parameters of the main camera, shared by the render camera and by the
/// pointer reprojection so both agree on where a bubble lands.
///
/// The camera looks down -Z from `position` with no rotation.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub aspect: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            fov_y: CAMERA_FOV_DEG.to_radians(),
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            position: Vec3::new(0.0, 0.0, CAMERA_DISTANCE),
            aspect: WINDOW_WIDTH as f32 / WINDOW_HEIGHT as f32,
        }
    }
}

impl CameraRig {
    /// OpenGL-convention projection (NDC depth in `[-1, 1]`).
    pub fn clip_from_view(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn world_from_view(&self) -> Mat4 {
        Mat4::from_translation(self.position)
    }

    /// Map a point in normalized device coordinates back to world space.
    pub fn unproject(&self, ndc: Vec3) -> Vec3 {
        let world_from_clip = self.world_from_view() * self.clip_from_view().inverse();
        world_from_clip.project_point3(ndc)
    }

    /// World position under `ndc` on the plane through the origin that faces
    /// the camera. Only x and y are meaningful to callers; z is 0.
    ///
    /// Returns `None` if the ray never meets the plane.
    pub fn reproject(&self, ndc: Vec2) -> Option<Vec3> {
        let target = self.unproject(ndc.extend(UNPROJECT_DEPTH));
        let dir = (target - self.position).normalize_or_zero();
        if dir.z.abs() < 1e-6 {
            return None;
        }
        let t = -self.position.z / dir.z;
        let hit = self.position + dir * t;
        hit.is_finite().then_some(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig(aspect: f32) -> CameraRig {
        CameraRig {
            aspect,
            ..Default::default()
        }
    }

    fn assert_close(a: Vec3, e: Vec3, eps: f32) {
        assert!((a - e).length() < eps, "{:?} != {:?}", a, e);
    }

    #[test]
    fn center_maps_to_origin() {
        let hit = rig(4.0 / 3.0).reproject(Vec2::ZERO).unwrap();
        assert_close(hit, Vec3::ZERO, 1e-2);
    }

    #[test]
    fn edges_match_frustum_width_at_plane() {
        let aspect = 800.0 / 600.0;
        let r = rig(aspect);
        let half_h = CAMERA_DISTANCE * (r.fov_y * 0.5).tan();
        let half_w = half_h * aspect;

        let right = r.reproject(Vec2::new(1.0, 0.0)).unwrap();
        assert_close(right, Vec3::new(half_w, 0.0, 0.0), 0.5);

        let top_left = r.reproject(Vec2::new(-1.0, 1.0)).unwrap();
        assert_close(top_left, Vec3::new(-half_w, half_h, 0.0), 0.5);
    }

    #[test]
    fn hit_lies_on_plane() {
        let r = rig(16.0 / 9.0);
        for ndc in [Vec2::new(0.3, -0.7), Vec2::new(-0.9, 0.9), Vec2::new(0.0, 1.0)] {
            let hit = r.reproject(ndc).unwrap();
            assert!(hit.z.abs() < 1e-2, "z = {}", hit.z);
        }
    }

    #[test]
    fn wider_field_of_view_spreads_bubbles() {
        let narrow = rig(1.0);
        let wide = CameraRig {
            fov_y: 90f32.to_radians(),
            ..narrow
        };
        let ndc = Vec2::new(0.5, 0.5);
        let a = narrow.reproject(ndc).unwrap();
        let b = wide.reproject(ndc).unwrap();
        assert!(b.x > a.x && b.y > a.y);
    }

    #[test]
    fn reprojection_is_continuous() {
        let r = rig(4.0 / 3.0);
        let step = 1e-3;
        let mut prev = r.reproject(Vec2::new(-1.0, -1.0)).unwrap();
        let mut t = -1.0 + step;
        while t <= 1.0 {
            let cur = r.reproject(Vec2::new(t, t)).unwrap();
            // One NDC step spans a few world units at this distance.
            assert!((cur - prev).length() < 10.0, "jump at {}", t);
            prev = cur;
            t += step;
        }
    }

    #[test]
    fn camera_on_plane_hits_itself() {
        let r = CameraRig {
            position: Vec3::ZERO,
            ..rig(1.0)
        };
        assert_close(r.reproject(Vec2::new(0.5, 0.5)).unwrap(), Vec3::ZERO, 1e-6);
    }
}
