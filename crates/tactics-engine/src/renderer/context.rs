//! Pass-transition protocol for one frame's command stream.
//!
//! At most one pass is open at a time. Beginning a pass ends the open one,
//! ending with nothing open does nothing, and every begin resets viewport
//! and scissor to the new target's own size. Dropping the context closes any
//! open pass.

use glam::Vec2;
use log::warn;

use crate::components::sprite::{AtlasId, BlendMode};
use crate::renderer::device::{CommandEncoder, LoadOp, ScissorRect, TextureId, Viewport};
use crate::renderer::instance::{SpriteBuffer, SpriteInstance};
use crate::renderer::pass::RenderPass;
use crate::systems::lighting::LightBatch;

/// The target of the open pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTarget {
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
}

pub struct RenderContext<'a, E: CommandEncoder + ?Sized> {
    encoder: &'a mut E,
    active: Option<ActiveTarget>,
    blend: Option<BlendMode>,
}

impl<'a, E: CommandEncoder + ?Sized> RenderContext<'a, E> {
    pub fn new(encoder: &'a mut E) -> Self {
        Self {
            encoder,
            active: None,
            blend: None,
        }
    }

    /// Begin drawing into an off-screen pass, ending any open pass first.
    pub fn begin_pass(&mut self, pass: &RenderPass, load: LoadOp) {
        self.begin_target(pass.texture(), pass.width(), pass.height(), load);
    }

    /// Begin drawing into the swapchain image.
    pub fn begin_swapchain(&mut self, texture: TextureId, width: u32, height: u32, load: LoadOp) {
        self.begin_target(texture, width, height, load);
    }

    /// End the open pass and begin `pass`.
    pub fn transition_to(&mut self, pass: &RenderPass, load: LoadOp) {
        self.end_pass();
        self.begin_pass(pass, load);
    }

    /// End the open pass. Does nothing when no pass is open.
    pub fn end_pass(&mut self) {
        if self.active.take().is_some() {
            self.encoder.end_render_pass();
            self.blend = None;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_target(&self) -> Option<ActiveTarget> {
        self.active
    }

    /// Select a blend mode; redundant changes are not re-encoded.
    pub fn set_blend_mode(&mut self, blend: BlendMode) {
        if self.blend != Some(blend) {
            self.encoder.set_blend_mode(blend);
            self.blend = Some(blend);
        }
    }

    /// Upload the frame's packed lights. Ends any open pass first.
    pub fn upload_lights(&mut self, batch: &LightBatch) {
        self.end_pass();
        self.encoder.upload_lights(batch.as_bytes(), batch.count());
    }

    /// Draw every batch of `buffer` into the open pass.
    /// Returns `false` without drawing when no pass is open.
    pub fn draw_sprites(&mut self, buffer: &SpriteBuffer) -> bool {
        if !self.is_active() {
            warn!("draw_sprites outside a render pass ignored");
            return false;
        }
        for batch in &buffer.batches {
            if batch.is_empty() {
                continue;
            }
            self.set_blend_mode(batch.blend);
            self.encoder.draw_sprites(batch.atlas, buffer.instances_for(batch));
        }
        true
    }

    /// Draw one atlas run with the current blend mode.
    pub fn draw_instances(&mut self, atlas: AtlasId, instances: &[SpriteInstance]) -> bool {
        if !self.is_active() {
            warn!("draw_instances outside a render pass ignored");
            return false;
        }
        self.encoder.draw_sprites(atlas, instances);
        true
    }

    /// Composite `source` over the whole open target.
    pub fn draw_fullscreen(&mut self, source: TextureId, blend: BlendMode) -> bool {
        if !self.is_active() {
            warn!("draw_fullscreen outside a render pass ignored");
            return false;
        }
        self.set_blend_mode(blend);
        self.encoder.draw_fullscreen(source);
        true
    }

    /// Composite `source` over a screen-space quad of the open target.
    pub fn draw_texture(&mut self, source: TextureId, position: Vec2, size: Vec2, blend: BlendMode) -> bool {
        if !self.is_active() {
            warn!("draw_texture outside a render pass ignored");
            return false;
        }
        self.set_blend_mode(blend);
        self.encoder.draw_texture(source, position, size);
        true
    }

    fn begin_target(&mut self, texture: TextureId, width: u32, height: u32, load: LoadOp) {
        self.end_pass();
        self.encoder.begin_render_pass(texture, width, height, load);
        self.encoder.set_viewport(Viewport::full(width, height));
        self.encoder.set_scissor(ScissorRect::full(width, height));
        self.active = Some(ActiveTarget {
            texture,
            width,
            height,
        });
    }
}

impl<E: CommandEncoder + ?Sized> Drop for RenderContext<'_, E> {
    fn drop(&mut self) {
        self.end_pass();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::api::types::FrameRect;
    use crate::components::sprite::SpriteDraw;
    use crate::renderer::device::TextureFormat;
    use crate::renderer::headless::{Command, HeadlessDevice, RecordingEncoder};
    use crate::systems::lighting::{Light, LightingManager};
    use glam::Vec3;

    fn pass(device: &Rc<HeadlessDevice>, name: &str, w: u32, h: u32) -> RenderPass {
        RenderPass::create(device.clone(), name, w, h, 1.0, TextureFormat::Rgba8Unorm).unwrap()
    }

    #[test]
    fn beginning_a_pass_ends_the_open_one() {
        let device = Rc::new(HeadlessDevice::new());
        let big = pass(&device, "screen", 1280, 720);
        let small = pass(&device, "bloom", 640, 360);
        let mut encoder = RecordingEncoder::new();
        {
            let mut ctx = RenderContext::new(&mut encoder);
            ctx.begin_pass(&big, LoadOp::CLEAR);
            ctx.begin_pass(&small, LoadOp::Load);
            assert_eq!(ctx.active_target().map(|t| t.width), Some(640));
        }
        assert_eq!(encoder.begins(), 2);
        assert_eq!(encoder.ends(), 2);
        assert_eq!(encoder.targets(), vec![big.texture(), small.texture()]);
        assert_eq!(encoder.commands[3], Command::EndPass);
    }

    #[test]
    fn every_begin_sets_the_targets_own_viewport() {
        let device = Rc::new(HeadlessDevice::new());
        let big = pass(&device, "screen", 1280, 720);
        let small = pass(&device, "bloom", 640, 360);
        let mut encoder = RecordingEncoder::new();
        {
            let mut ctx = RenderContext::new(&mut encoder);
            ctx.begin_pass(&big, LoadOp::CLEAR);
            ctx.transition_to(&small, LoadOp::CLEAR);
        }
        let viewports: Vec<Viewport> = encoder
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::Viewport(v) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(viewports, vec![Viewport::full(1280, 720), Viewport::full(640, 360)]);
        assert!(encoder.commands.contains(&Command::Scissor(ScissorRect::full(640, 360))));
    }

    #[test]
    fn end_without_open_pass_is_a_no_op() {
        let mut encoder = RecordingEncoder::new();
        {
            let mut ctx = RenderContext::new(&mut encoder);
            ctx.end_pass();
            ctx.begin_swapchain(TextureId(99), 800, 600, LoadOp::Clear([0.0, 0.0, 0.0, 1.0]));
            ctx.end_pass();
            ctx.end_pass();
            assert!(!ctx.is_active());
        }
        assert_eq!(encoder.ends(), 1);
    }

    #[test]
    fn draws_need_an_open_pass_and_skip_redundant_blends() {
        let mut buffer = SpriteBuffer::new();
        let draw = SpriteDraw::new(
            AtlasId(2),
            FrameRect::new(0, 0, 10, 10),
            Vec2::splat(100.0),
            Vec2::ZERO,
            Vec2::splat(10.0),
        );
        buffer.push(&draw);
        buffer.push(&draw.with_blend(BlendMode::Additive));

        let mut encoder = RecordingEncoder::new();
        {
            let mut ctx = RenderContext::new(&mut encoder);
            assert!(!ctx.draw_sprites(&buffer));
            ctx.begin_swapchain(TextureId(1), 10, 10, LoadOp::CLEAR);
            ctx.set_blend_mode(BlendMode::Alpha);
            assert!(ctx.draw_sprites(&buffer));
            assert!(ctx.draw_fullscreen(TextureId(7), BlendMode::Additive));
        }
        let blends: Vec<_> = encoder
            .commands
            .iter()
            .filter(|c| matches!(c, Command::Blend(_)))
            .collect();
        assert_eq!(blends, [&Command::Blend(BlendMode::Alpha), &Command::Blend(BlendMode::Additive)]);
        let sprite_runs: Vec<(AtlasId, usize)> = encoder
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::Sprites { atlas, instances } => Some((*atlas, instances.len())),
                _ => None,
            })
            .collect();
        assert_eq!(sprite_runs, [(AtlasId(2), 1), (AtlasId(2), 1)]);
        assert!(encoder.commands.contains(&Command::Fullscreen(TextureId(7))));
    }

    #[test]
    fn light_upload_closes_the_open_pass() {
        let mut lighting = LightingManager::new();
        lighting.add(Light::point(Vec2::ZERO, Vec3::X, 1.0));
        let batch = lighting.prepare_batch().clone();

        let mut encoder = RecordingEncoder::new();
        {
            let mut ctx = RenderContext::new(&mut encoder);
            ctx.begin_swapchain(TextureId(1), 10, 10, LoadOp::CLEAR);
            ctx.upload_lights(&batch);
            assert!(!ctx.is_active());
        }
        assert_eq!(encoder.ends(), 1);
        assert_eq!(
            encoder.commands.last(),
            Some(&Command::Lights {
                count: 1,
                bytes: batch.as_bytes().to_vec(),
            })
        );
    }
}
