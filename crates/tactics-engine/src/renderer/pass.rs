//! Off-screen render targets.

use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::api::error::{EngineError, Result};
use crate::renderer::device::{GpuDevice, SamplerId, TextureDesc, TextureFormat, TextureId};

/// A sampleable colour target owned by one pass.
///
/// Created at `floor(size * scale)` clamped to at least 1x1. The texture and
/// sampler are released when the pass is dropped, so replacing a pass in a
/// slot frees the old one.
pub struct RenderPass {
    name: String,
    texture: TextureId,
    sampler: SamplerId,
    width: u32,
    height: u32,
    scale: f32,
    format: TextureFormat,
    device: Rc<dyn GpuDevice>,
}

impl RenderPass {
    pub fn create(
        device: Rc<dyn GpuDevice>,
        name: impl Into<String>,
        width: u32,
        height: u32,
        scale: f32,
        format: TextureFormat,
    ) -> Result<Self> {
        let name = name.into();
        let (w, h) = scaled_size(width, height, scale);
        let desc = TextureDesc {
            label: name.clone(),
            width: w,
            height: h,
            format,
        };

        let texture = device
            .create_texture(&desc)
            .map_err(|e| pass_error(&name, w, h, e))?;
        let sampler = match device.create_sampler() {
            Ok(sampler) => sampler,
            Err(e) => {
                device.release_texture(texture);
                return Err(pass_error(&name, w, h, e));
            }
        };

        debug!("render pass '{}' created: {}x{} (scale {:.2})", name, w, h, scale);
        Ok(Self {
            name,
            texture,
            sampler,
            width: w,
            height: h,
            scale,
            format,
            device,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn sampler(&self) -> SamplerId {
        self.sampler
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Whether `width` x `height` content fits without recreating.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.width >= width && self.height >= height
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        self.device.release_sampler(self.sampler);
        self.device.release_texture(self.texture);
    }
}

impl fmt::Debug for RenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPass")
            .field("name", &self.name)
            .field("texture", &self.texture)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("scale", &self.scale)
            .field("format", &self.format)
            .finish()
    }
}

/// Pixel size of a pass at `scale`, never below 1x1.
pub fn scaled_size(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let w = (width as f32 * scale) as u32;
    let h = (height as f32 * scale) as u32;
    (w.max(1), h.max(1))
}

fn pass_error(name: &str, width: u32, height: u32, cause: EngineError) -> EngineError {
    EngineError::PassCreation {
        name: name.to_owned(),
        width,
        height,
        reason: cause.to_string(),
    }
}
