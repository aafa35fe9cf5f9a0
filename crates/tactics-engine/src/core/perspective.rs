//! Fixed-tilt perspective projection.
//!
//! Flat screen points are rotated about the horizontal axis through the
//! viewport centre and divided by depth, which fakes a camera looking down
//! at the board. Board tiles and upright entities use different tilts.

use glam::Vec2;

use crate::api::config::{RenderConfig, BOARD_X_ROTATION, ENTITY_X_ROTATION, FOV_DEGREES};

/// Smallest depth a projected point may have.
pub const MIN_DEPTH: f32 = 1.0;

/// Camera distance for a viewport height and vertical field of view.
pub fn compute_zeye(viewport_height: f32, fov_degrees: f32) -> f32 {
    (viewport_height * 0.5) / (fov_degrees.to_radians() * 0.5).tan()
}

/// Projection parameters for one plane at one viewport size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveConfig {
    /// Distance from the eye to the screen plane.
    pub zeye: f32,
    /// Viewport centre in pixels.
    pub center: Vec2,
    /// Tilt in degrees.
    pub rotation: f32,
    sin: f32,
    cos: f32,
}

impl PerspectiveConfig {
    pub fn new(width: f32, height: f32, fov_degrees: f32, rotation: f32) -> Self {
        let (sin, cos) = rotation.to_radians().sin_cos();
        Self {
            zeye: compute_zeye(height, fov_degrees),
            center: Vec2::new(width * 0.5, height * 0.5),
            rotation,
            sin,
            cos,
        }
    }

    /// Configuration for the flat board plane.
    pub fn board(config: &RenderConfig) -> Self {
        Self::new(config.width(), config.height(), FOV_DEGREES, BOARD_X_ROTATION)
    }

    /// Configuration for upright entity billboards.
    pub fn entity(config: &RenderConfig) -> Self {
        Self::new(config.width(), config.height(), FOV_DEGREES, ENTITY_X_ROTATION)
    }

    /// Project a flat screen point lifted `z` pixels out of the plane.
    pub fn project(&self, point: Vec2, z: f32) -> Vec2 {
        let rel = point - self.center;
        let rotated_y = rel.y * self.cos - z * self.sin;
        let rotated_z = rel.y * self.sin + z * self.cos;
        let depth = (self.zeye - rotated_z).max(MIN_DEPTH);
        let scale = self.zeye / depth;
        Vec2::new(rel.x * scale, rotated_y * scale) + self.center
    }

    /// Inverse of [`project`](Self::project) for points on the `z = 0` plane.
    pub fn unproject(&self, point: Vec2) -> Vec2 {
        let py = point.y - self.center.y;
        let px = point.x - self.center.x;
        let rel_y = py * self.zeye / (self.zeye * self.cos + py * self.sin);
        let depth = self.zeye - rel_y * self.sin;
        let rel_x = px * depth / self.zeye;
        Vec2::new(rel_x, rel_y) + self.center
    }

    /// Project the four corners of an axis-aligned rect, clockwise from top-left.
    pub fn project_rect(&self, origin: Vec2, size: Vec2) -> [Vec2; 4] {
        [
            self.project(origin, 0.0),
            self.project(origin + Vec2::new(size.x, 0.0), 0.0),
            self.project(origin + size, 0.0),
            self.project(origin + Vec2::new(0.0, size.y), 0.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-2
    }

    #[test]
    fn zeye_for_60_degree_fov() {
        let zeye = compute_zeye(720.0, 60.0);
        assert!((zeye - 623.538).abs() < 1e-2, "zeye was {}", zeye);
    }

    #[test]
    fn centre_is_fixed_point() {
        let cfg = PerspectiveConfig::board(&RenderConfig::default());
        let c = Vec2::new(640.0, 360.0);
        assert!(approx(cfg.project(c, 0.0), c));
        assert!(approx(cfg.unproject(c), c));
    }

    #[test]
    fn far_rows_shrink_toward_centre() {
        let cfg = PerspectiveConfig::board(&RenderConfig::default());
        let top = cfg.project(Vec2::new(100.0, 100.0), 0.0);
        let bottom = cfg.project(Vec2::new(100.0, 620.0), 0.0);
        // Rows above centre recede, so they are pulled further in than rows below.
        assert!(top.x > 100.0);
        assert!(bottom.x < 100.0);
    }

    #[test]
    fn unproject_inverts_project() {
        let cfg = PerspectiveConfig::board(&RenderConfig::default());
        for &(x, y) in &[(0.0, 0.0), (1280.0, 720.0), (217.0, 512.5), (900.0, 40.0)] {
            let p = Vec2::new(x, y);
            let back = cfg.unproject(cfg.project(p, 0.0));
            assert!(approx(back, p), "{:?} came back as {:?}", p, back);
        }
    }

    #[test]
    fn entity_plane_tilts_more_than_board() {
        let config = RenderConfig::default();
        let board = PerspectiveConfig::board(&config);
        let entity = PerspectiveConfig::entity(&config);
        let p = Vec2::new(640.0, 100.0);
        let dy_board = board.project(p, 0.0).y - p.y;
        let dy_entity = entity.project(p, 0.0).y - p.y;
        assert!(dy_entity.abs() > dy_board.abs());
    }

    #[test]
    fn depth_is_clamped_behind_camera() {
        let cfg = PerspectiveConfig::board(&RenderConfig::default());
        let p = cfg.project(Vec2::new(700.0, 360.0), 10_000.0);
        assert!(p.x.is_finite() && p.y.is_finite());
    }

    #[test]
    fn rect_corners_keep_winding() {
        let cfg = PerspectiveConfig::board(&RenderConfig::default());
        let corners = cfg.project_rect(Vec2::new(200.0, 200.0), Vec2::new(95.0, 95.0));
        assert!(corners[1].x > corners[0].x);
        assert!(corners[2].y > corners[1].y);
        assert!(corners[3].x < corners[2].x);
    }
}
