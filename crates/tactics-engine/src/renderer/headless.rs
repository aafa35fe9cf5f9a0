//! Recording test doubles for the GPU seam.

use std::cell::{Cell, RefCell};

use glam::Vec2;

use crate::api::error::{EngineError, Result};
use crate::components::sprite::{AtlasId, BlendMode};
use crate::renderer::device::{
    CommandEncoder, GpuDevice, LoadOp, SamplerId, ScissorRect, TextureDesc, TextureId, Viewport,
};
use crate::renderer::instance::SpriteInstance;

/// A device that allocates ids and counts every call.
///
/// `fail_after(n)` makes every texture creation after the next `n` fail,
/// simulating resource exhaustion.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: Cell<u64>,
    textures_created: Cell<usize>,
    textures_released: Cell<usize>,
    samplers_created: Cell<usize>,
    samplers_released: Cell<usize>,
    remaining_before_failure: Cell<Option<usize>>,
    created: RefCell<Vec<TextureDesc>>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_after(&self, successful_creations: usize) {
        self.remaining_before_failure.set(Some(successful_creations));
    }

    pub fn never_fail(&self) {
        self.remaining_before_failure.set(None);
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created.get()
    }

    pub fn textures_released(&self) -> usize {
        self.textures_released.get()
    }

    pub fn samplers_created(&self) -> usize {
        self.samplers_created.get()
    }

    pub fn samplers_released(&self) -> usize {
        self.samplers_released.get()
    }

    /// Textures created minus textures released.
    pub fn live_textures(&self) -> usize {
        self.textures_created.get() - self.textures_released.get()
    }

    /// Descriptor of every texture ever created, in order.
    pub fn created(&self) -> Vec<TextureDesc> {
        self.created.borrow().clone()
    }

    fn next(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_texture(&self, desc: &TextureDesc) -> Result<TextureId> {
        if let Some(remaining) = self.remaining_before_failure.get() {
            if remaining == 0 {
                return Err(EngineError::Device(format!(
                    "out of texture memory creating '{}'",
                    desc.label
                )));
            }
            self.remaining_before_failure.set(Some(remaining - 1));
        }
        self.textures_created.set(self.textures_created.get() + 1);
        self.created.borrow_mut().push(desc.clone());
        Ok(TextureId(self.next()))
    }

    fn create_sampler(&self) -> Result<SamplerId> {
        self.samplers_created.set(self.samplers_created.get() + 1);
        Ok(SamplerId(self.next()))
    }

    fn release_texture(&self, _texture: TextureId) {
        self.textures_released.set(self.textures_released.get() + 1);
    }

    fn release_sampler(&self, _sampler: SamplerId) {
        self.samplers_released.set(self.samplers_released.get() + 1);
    }
}

/// One recorded encoder call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginPass {
        target: TextureId,
        width: u32,
        height: u32,
        load: LoadOp,
    },
    EndPass,
    Viewport(Viewport),
    Scissor(ScissorRect),
    Blend(BlendMode),
    Sprites {
        atlas: AtlasId,
        instances: Vec<SpriteInstance>,
    },
    Lights {
        count: usize,
        bytes: Vec<u8>,
    },
    Fullscreen(TextureId),
    Texture {
        source: TextureId,
        position: Vec2,
        size: Vec2,
    },
}

/// An encoder that records every command.
#[derive(Debug, Default)]
pub struct RecordingEncoder {
    pub commands: Vec<Command>,
}

impl RecordingEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begins(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::BeginPass { .. }))
            .count()
    }

    pub fn ends(&self) -> usize {
        self.commands.iter().filter(|c| **c == Command::EndPass).count()
    }

    /// Every sprite instance drawn, in order.
    pub fn sprite_instances(&self) -> Vec<SpriteInstance> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Sprites { instances, .. } => Some(instances.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Targets of every begun pass, in order.
    pub fn targets(&self) -> Vec<TextureId> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::BeginPass { target, .. } => Some(*target),
                _ => None,
            })
            .collect()
    }
}

impl CommandEncoder for RecordingEncoder {
    fn begin_render_pass(&mut self, target: TextureId, width: u32, height: u32, load: LoadOp) {
        self.commands.push(Command::BeginPass {
            target,
            width,
            height,
            load,
        });
    }

    fn end_render_pass(&mut self) {
        self.commands.push(Command::EndPass);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(Command::Viewport(viewport));
    }

    fn set_scissor(&mut self, scissor: ScissorRect) {
        self.commands.push(Command::Scissor(scissor));
    }

    fn set_blend_mode(&mut self, blend: BlendMode) {
        self.commands.push(Command::Blend(blend));
    }

    fn draw_sprites(&mut self, atlas: AtlasId, instances: &[SpriteInstance]) {
        self.commands.push(Command::Sprites {
            atlas,
            instances: instances.to_vec(),
        });
    }

    fn upload_lights(&mut self, lights: &[u8], count: usize) {
        self.commands.push(Command::Lights {
            count,
            bytes: lights.to_vec(),
        });
    }

    fn draw_fullscreen(&mut self, source: TextureId) {
        self.commands.push(Command::Fullscreen(source));
    }

    fn draw_texture(&mut self, source: TextureId, position: Vec2, size: Vec2) {
        self.commands.push(Command::Texture {
            source,
            position,
            size,
        });
    }
}
