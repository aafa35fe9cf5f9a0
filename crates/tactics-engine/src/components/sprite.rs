use glam::{Vec2, Vec3};

use crate::api::types::FrameRect;
use crate::components::layer::RenderLayer;

/// Identifies which spritesheet texture a draw samples.
/// Assigned by the asset cache in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AtlasId(pub u32);

/// How a draw combines with the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BlendMode {
    /// Standard sprite blending (src-alpha, one-minus-src-alpha).
    #[default]
    Alpha,
    /// Light accumulation (src-alpha, one).
    Additive,
    /// Ambient and shadow darkening (dst-color, zero).
    Multiply,
    /// Opaque copy between passes (one, zero).
    Replace,
}

/// One sprite quad requested for this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDraw {
    pub atlas: AtlasId,
    /// Source rectangle in spritesheet pixels.
    pub frame: FrameRect,
    /// Size of the whole spritesheet in pixels, for UV normalisation.
    pub sheet_size: Vec2,
    /// Top-left corner of the destination quad in screen pixels.
    pub position: Vec2,
    /// Destination quad size in screen pixels.
    pub size: Vec2,
    pub flip_x: bool,
    /// Opacity, 0.0 to 1.0.
    pub alpha: f32,
    /// Dissolve progress, 0.0 (intact) to 1.0 (gone).
    pub dissolve: f32,
    /// Per-sprite dissolve pattern seed.
    pub seed: f32,
    /// Colour the sampled texels are multiplied by.
    pub tint: Vec3,
    pub blend: BlendMode,
    pub layer: RenderLayer,
    /// Ordering within the layer; larger draws later.
    pub z: f32,
}

impl SpriteDraw {
    pub fn new(atlas: AtlasId, frame: FrameRect, sheet_size: Vec2, position: Vec2, size: Vec2) -> Self {
        Self {
            atlas,
            frame,
            sheet_size,
            position,
            size,
            flip_x: false,
            alpha: 1.0,
            dissolve: 0.0,
            seed: 0.0,
            tint: Vec3::ONE,
            blend: BlendMode::Alpha,
            layer: RenderLayer::Units,
            z: position.y + size.y,
        }
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_layer(mut self, layer: RenderLayer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_z(mut self, z: f32) -> Self {
        self.z = z;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_flip(mut self, flip_x: bool) -> Self {
        self.flip_x = flip_x;
        self
    }

    pub fn with_tint(mut self, tint: Vec3) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_dissolve(mut self, dissolve: f32, seed: f32) -> Self {
        self.dissolve = dissolve;
        self.seed = seed;
        self
    }

    /// Source rectangle normalised to `[0, 1]` UVs as (u, v, w, h).
    pub fn uv_rect(&self) -> [f32; 4] {
        if self.sheet_size.x <= 0.0 || self.sheet_size.y <= 0.0 {
            return [0.0, 0.0, 1.0, 1.0];
        }
        [
            self.frame.x as f32 / self.sheet_size.x,
            self.frame.y as f32 / self.sheet_size.y,
            self.frame.w as f32 / self.sheet_size.x,
            self.frame.h as f32 / self.sheet_size.y,
        ]
    }
}
