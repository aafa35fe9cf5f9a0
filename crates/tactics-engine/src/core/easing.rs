//! The easing curve for unit movement between cells.

use glam::Vec2;

/// Quadratic ease-in-out of `t`, clamped to `[0, 1]`. Maps 0 to 0 and 1 to 1.
#[inline]
pub fn quad_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

#[inline]
pub fn lerp_vec2(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}

/// Interpolate between two points along [`quad_in_out`].
#[inline]
pub fn ease_vec2(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    lerp_vec2(a, b, quad_in_out(t))
}
