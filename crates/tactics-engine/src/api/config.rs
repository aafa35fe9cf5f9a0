//! Engine and viewport configuration.
//!
//! Both structs carry the engine's stock constants in their `Default` impls;
//! games override individual fields with struct update syntax.

/// Base tile size in pixels before UI scaling.
pub const TILE_SIZE: f32 = 95.0;
/// Horizontal nudge applied to the board origin, in pixels.
pub const TILE_OFFSET_X: f32 = 0.0;
/// Vertical nudge applied to the board origin, in pixels.
pub const TILE_OFFSET_Y: f32 = 10.0;

/// Vertical field of view of the pseudo-3D camera, in degrees.
pub const FOV_DEGREES: f32 = 60.0;
/// Tilt applied to the flat board plane, in degrees.
pub const BOARD_X_ROTATION: f32 = 16.0;
/// Tilt applied to upright entity billboards, in degrees.
pub const ENTITY_X_ROTATION: f32 = 26.0;

/// Viewport size and UI scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    /// Window width in pixels.
    pub window_w: u32,
    /// Window height in pixels.
    pub window_h: u32,
    /// UI scale multiplier (1.0 at 1280x720).
    pub scale: f32,
}

impl RenderConfig {
    pub fn new(window_w: u32, window_h: u32) -> Self {
        Self {
            window_w,
            window_h,
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Scaled tile size, truncated to whole pixels.
    pub fn tile_size(&self) -> f32 {
        (TILE_SIZE * self.scale).trunc()
    }

    pub fn width(&self) -> f32 {
        self.window_w as f32
    }

    pub fn height(&self) -> f32 {
        self.window_h as f32
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_w: 1280,
            window_h: 720,
            scale: 1.0,
        }
    }
}

/// Timing constants for units, FX and the frame loop.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed simulation step in seconds (default: 1/60).
    pub fixed_dt: f32,
    /// Multiplier applied to the per-tile run animation duration.
    pub move_duration_modifier: f32,
    /// Fraction of one tile's duration trimmed from every move.
    pub move_correction: f32,
    /// Spawn fade-in duration in seconds.
    pub spawn_fade: f32,
    /// Shadow fade-in duration in seconds.
    pub shadow_fade: f32,
    /// Dissolve duration after the death animation, in seconds.
    pub dissolve_duration: f32,
    /// Frame delay used when an FX sprite has no timing entry.
    pub default_frame_delay: f32,
    /// Maximum number of lights uploaded per frame (default: 32).
    pub max_lights: usize,
    /// Seed for dissolve pattern variation.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            move_duration_modifier: 1.0,
            move_correction: 0.2,
            spawn_fade: 0.35,
            shadow_fade: 0.3,
            dissolve_duration: 1.0,
            default_frame_delay: 0.08,
            max_lights: 32,
            seed: 42,
        }
    }
}
