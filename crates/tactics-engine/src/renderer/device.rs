//! The GPU seam.
//!
//! The engine never talks to a graphics API directly. A backend implements
//! [`GpuDevice`] for resource lifetime and [`CommandEncoder`] for one frame's
//! commands; [`crate::renderer::headless`] provides recording doubles.

use std::fmt;

use glam::Vec2;

use crate::api::error::Result;
use crate::components::sprite::{AtlasId, BlendMode};
use crate::renderer::instance::SpriteInstance;

/// Colour formats a pass can be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// Universally supported render-target format.
    #[default]
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba16Float,
}

/// Opaque handle to a device texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Opaque handle to a device sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerId(pub u64);

/// A texture usable both as a colour target and for sampling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Resource creation and release.
///
/// Methods take `&self` so one device can be shared by every pass that owns
/// resources on it.
pub trait GpuDevice {
    fn create_texture(&self, desc: &TextureDesc) -> Result<TextureId>;

    /// Linear filtering, clamp to edge.
    fn create_sampler(&self) -> Result<SamplerId>;

    fn release_texture(&self, texture: TextureId);

    fn release_sampler(&self, sampler: SamplerId);
}

impl fmt::Debug for dyn GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GpuDevice")
    }
}

/// What happens to a target's previous contents when a pass begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp {
    Clear([f32; 4]),
    Load,
}

impl LoadOp {
    /// Transparent black.
    pub const CLEAR: LoadOp = LoadOp::Clear([0.0, 0.0, 0.0, 0.0]);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// Covers a whole `width` x `height` target.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Records one frame's commands.
///
/// Callers go through [`crate::renderer::context::RenderContext`], which
/// guarantees at most one open pass and a full viewport on every begin.
pub trait CommandEncoder {
    fn begin_render_pass(&mut self, target: TextureId, width: u32, height: u32, load: LoadOp);

    fn end_render_pass(&mut self);

    fn set_viewport(&mut self, viewport: Viewport);

    fn set_scissor(&mut self, scissor: ScissorRect);

    fn set_blend_mode(&mut self, blend: BlendMode);

    fn draw_sprites(&mut self, atlas: AtlasId, instances: &[SpriteInstance]);

    /// Write `count` packed lights into the lighting uniform. Issued outside
    /// any render pass.
    fn upload_lights(&mut self, lights: &[u8], count: usize);

    /// Draw a full-target quad sampling `source`.
    fn draw_fullscreen(&mut self, source: TextureId);

    /// Draw `source` stretched over a screen-space quad.
    fn draw_texture(&mut self, source: TextureId, position: Vec2, size: Vec2);
}
