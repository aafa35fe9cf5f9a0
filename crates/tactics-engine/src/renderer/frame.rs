//! One frame through the pass graph.
//!
//! Stages run in a fixed order: per-sprite shadows, per-sprite lights, the
//! lit surface, bloom highpass, blur, bloom composite, tone curve and finally
//! the swapchain. [`StageOrder`] rejects any stage that would run before one
//! it depends on.

use glam::Vec2;
use log::warn;

use crate::components::layer::RenderLayer;
use crate::components::sprite::{BlendMode, SpriteDraw};
use crate::renderer::context::RenderContext;
use crate::renderer::device::{CommandEncoder, LoadOp, TextureId};
use crate::renderer::instance::SpriteBuffer;
use crate::renderer::pass_manager::{PassManager, PassType};
use crate::systems::lighting::LightBatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameStage {
    SpriteShadows,
    SpriteLights,
    Surface,
    Highpass,
    Blur,
    BloomComposite,
    ToneCurve,
    Present,
}

/// Tracks the last stage run and refuses to go backwards or repeat.
#[derive(Debug, Clone, Default)]
pub struct StageOrder {
    last: Option<FrameStage>,
    completed: Vec<FrameStage>,
}

impl StageOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `stage`. Returns `false` and records nothing if it is not
    /// strictly after the previous stage.
    pub fn enter(&mut self, stage: FrameStage) -> bool {
        if self.last.is_some_and(|last| stage <= last) {
            warn!("frame stage {:?} out of order after {:?}", stage, self.last);
            return false;
        }
        self.last = Some(stage);
        self.completed.push(stage);
        true
    }

    pub fn completed(&self) -> &[FrameStage] {
        &self.completed
    }
}

/// The swapchain image for this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainTarget {
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
}

/// Everything drawn this frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// Sorted and batched sprites (see `systems::render`).
    pub sprites: &'a SpriteBuffer,
    /// Sprites rendered through their own shadow pass.
    pub shadows: &'a [SpriteDraw],
    /// Sprites that receive dynamic light through their own light pass.
    pub lit: &'a [SpriteDraw],
    /// Packed dynamic lights, uploaded before the first pass.
    pub lights: &'a LightBatch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    pub bloom: bool,
    pub clear_color: [f32; 4],
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            bloom: true,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// What a frame did.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub stages: Vec<FrameStage>,
    pub shadow_passes: usize,
    pub light_passes: usize,
    /// Per-sprite passes that could not be allocated; those sprites were
    /// drawn without their extra contribution.
    pub skipped_sprite_passes: usize,
}

/// A per-sprite pass rendered this frame and where to composite it.
struct SpriteLayer {
    texture: TextureId,
    position: Vec2,
    size: Vec2,
}

/// Run the frame's pass graph.
pub fn render_frame<E: CommandEncoder + ?Sized>(
    passes: &mut PassManager,
    encoder: &mut E,
    input: FrameInput<'_>,
    settings: &FrameSettings,
    swapchain: SwapchainTarget,
) -> FrameStats {
    let mut order = StageOrder::new();
    let mut stats = FrameStats::default();
    passes.reset_sprite_pass_pools();
    let mut ctx = RenderContext::new(encoder);
    ctx.upload_lights(input.lights);

    order.enter(FrameStage::SpriteShadows);
    let shadows = render_sprite_passes(passes, &mut ctx, input.shadows, BlendMode::Replace, true, &mut stats);

    order.enter(FrameStage::SpriteLights);
    let lights = render_sprite_passes(passes, &mut ctx, input.lit, BlendMode::Additive, false, &mut stats);

    order.enter(FrameStage::Surface);
    ctx.begin_pass(passes.get(PassType::SurfaceA), LoadOp::Clear(settings.clear_color));
    let (ground, rest) = split_at_layer(input.sprites, RenderLayer::Shadows);
    draw_batches(&mut ctx, input.sprites, ground);
    for layer in &shadows {
        ctx.draw_texture(layer.texture, layer.position, layer.size, BlendMode::Multiply);
    }
    draw_batches(&mut ctx, input.sprites, rest);
    for layer in &lights {
        ctx.draw_texture(layer.texture, layer.position, layer.size, BlendMode::Additive);
    }

    let mut graded_source = passes.get(PassType::SurfaceA).texture();
    if settings.bloom {
        order.enter(FrameStage::Highpass);
        ctx.begin_pass(passes.get(PassType::Highpass), LoadOp::CLEAR);
        ctx.draw_fullscreen(passes.get(PassType::SurfaceA).texture(), BlendMode::Replace);

        order.enter(FrameStage::Blur);
        ctx.begin_pass(passes.get(PassType::Blur), LoadOp::CLEAR);
        ctx.draw_fullscreen(passes.get(PassType::Highpass).texture(), BlendMode::Replace);

        order.enter(FrameStage::BloomComposite);
        ctx.begin_pass(passes.get(PassType::BloomCompositeA), LoadOp::CLEAR);
        ctx.draw_fullscreen(passes.get(PassType::SurfaceA).texture(), BlendMode::Replace);
        ctx.draw_fullscreen(passes.get(PassType::Blur).texture(), BlendMode::Additive);
        graded_source = passes.get(PassType::BloomCompositeA).texture();
    }

    order.enter(FrameStage::ToneCurve);
    ctx.begin_pass(passes.get(PassType::ToneCurve), LoadOp::CLEAR);
    ctx.draw_fullscreen(graded_source, BlendMode::Replace);

    order.enter(FrameStage::Present);
    ctx.begin_swapchain(swapchain.texture, swapchain.width, swapchain.height, LoadOp::Clear(settings.clear_color));
    ctx.draw_fullscreen(passes.get(PassType::ToneCurve).texture(), BlendMode::Replace);
    ctx.end_pass();

    stats.stages = order.completed().to_vec();
    stats
}

fn render_sprite_passes<E: CommandEncoder + ?Sized>(
    passes: &mut PassManager,
    ctx: &mut RenderContext<'_, E>,
    draws: &[SpriteDraw],
    blend: BlendMode,
    shadow: bool,
    stats: &mut FrameStats,
) -> Vec<SpriteLayer> {
    let mut layers = Vec::with_capacity(draws.len());
    let mut local = SpriteBuffer::new();
    for draw in draws {
        let width = draw.size.x.ceil().max(1.0) as u32;
        let height = draw.size.y.ceil().max(1.0) as u32;
        let pass = if shadow {
            passes.acquire_sprite_shadow_pass(width, height)
        } else {
            passes.acquire_sprite_light_pass(width, height)
        };
        let Some(pass) = pass else {
            stats.skipped_sprite_passes += 1;
            continue;
        };

        local.clear();
        local.push(&SpriteDraw {
            position: Vec2::ZERO,
            blend,
            ..*draw
        });
        ctx.begin_pass(pass, LoadOp::CLEAR);
        ctx.draw_sprites(&local);
        layers.push(SpriteLayer {
            texture: pass.texture(),
            position: draw.position,
            size: Vec2::new(pass.width() as f32, pass.height() as f32),
        });
        if shadow {
            stats.shadow_passes += 1;
        } else {
            stats.light_passes += 1;
        }
    }
    ctx.end_pass();
    layers
}

/// Batch index ranges: layers up to and including `last_ground`, then the rest.
fn split_at_layer(buffer: &SpriteBuffer, last_ground: RenderLayer) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
    let split = buffer
        .batches
        .iter()
        .position(|b| b.layer > last_ground)
        .unwrap_or(buffer.batches.len());
    (0..split, split..buffer.batches.len())
}

fn draw_batches<E: CommandEncoder + ?Sized>(
    ctx: &mut RenderContext<'_, E>,
    buffer: &SpriteBuffer,
    range: std::ops::Range<usize>,
) {
    for batch in &buffer.batches[range] {
        if batch.is_empty() {
            continue;
        }
        ctx.set_blend_mode(batch.blend);
        ctx.draw_instances(batch.atlas, buffer.instances_for(batch));
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::api::types::FrameRect;
    use crate::components::sprite::AtlasId;
    use crate::renderer::device::TextureFormat;
    use crate::renderer::headless::{Command, HeadlessDevice, RecordingEncoder};
    use crate::systems::lighting::{Light, LightingManager};
    use crate::systems::render::build_sprite_buffer;
    use glam::Vec3;

    fn sprite(layer: RenderLayer, x: f32) -> SpriteDraw {
        SpriteDraw::new(
            AtlasId(0),
            FrameRect::new(0, 0, 100, 100),
            Vec2::splat(1000.0),
            Vec2::new(x, 100.0),
            Vec2::new(99.5, 100.0),
        )
        .with_layer(layer)
    }

    fn setup() -> (Rc<HeadlessDevice>, PassManager) {
        let device = Rc::new(HeadlessDevice::new());
        let passes = PassManager::new(device.clone(), 320, 180, TextureFormat::Bgra8Unorm).unwrap();
        (device, passes)
    }

    const SWAPCHAIN: SwapchainTarget = SwapchainTarget {
        texture: TextureId(10_000),
        width: 320,
        height: 180,
    };

    #[test]
    fn stage_order_rejects_regressions() {
        let mut order = StageOrder::new();
        assert!(order.enter(FrameStage::SpriteShadows));
        assert!(order.enter(FrameStage::Highpass));
        assert!(!order.enter(FrameStage::Surface));
        assert!(!order.enter(FrameStage::Highpass));
        assert!(order.enter(FrameStage::Present));
        assert_eq!(
            order.completed(),
            [FrameStage::SpriteShadows, FrameStage::Highpass, FrameStage::Present]
        );
    }

    #[test]
    fn full_frame_runs_every_stage_in_order() {
        let (_device, mut passes) = setup();
        let mut buffer = SpriteBuffer::new();
        build_sprite_buffer(vec![sprite(RenderLayer::Units, 0.0), sprite(RenderLayer::Board, 0.0)], &mut buffer);
        let shadows = [sprite(RenderLayer::Shadows, 0.0), sprite(RenderLayer::Shadows, 50.0)];
        let lit = [sprite(RenderLayer::Units, 0.0)];
        let lights = LightBatch::default();
        let input = FrameInput {
            sprites: &buffer,
            shadows: &shadows,
            lit: &lit,
            lights: &lights,
        };

        let mut encoder = RecordingEncoder::new();
        let stats = render_frame(&mut passes, &mut encoder, input, &FrameSettings::default(), SWAPCHAIN);

        assert_eq!(
            stats.stages,
            [
                FrameStage::SpriteShadows,
                FrameStage::SpriteLights,
                FrameStage::Surface,
                FrameStage::Highpass,
                FrameStage::Blur,
                FrameStage::BloomComposite,
                FrameStage::ToneCurve,
                FrameStage::Present,
            ]
        );
        assert_eq!((stats.shadow_passes, stats.light_passes), (2, 1));
        assert_eq!(encoder.begins(), encoder.ends());

        let targets = encoder.targets();
        let surface = passes.get(PassType::SurfaceA).texture();
        let highpass = passes.get(PassType::Highpass).texture();
        let tone = passes.get(PassType::ToneCurve).texture();
        let at = |t: TextureId| targets.iter().position(|&x| x == t).unwrap();
        assert!(at(surface) < at(highpass));
        assert!(at(highpass) < at(tone));
        assert_eq!(targets.last(), Some(&SWAPCHAIN.texture));

        // Per-sprite passes round the width up.
        assert!(encoder.commands.iter().any(|c| matches!(
            c,
            Command::BeginPass { width: 100, height: 100, .. }
        )));
    }

    #[test]
    fn shadows_composite_between_ground_and_units() {
        let (_device, mut passes) = setup();
        let mut buffer = SpriteBuffer::new();
        build_sprite_buffer(
            vec![sprite(RenderLayer::Board, 0.0), sprite(RenderLayer::Units, 0.0).with_blend(BlendMode::Additive)],
            &mut buffer,
        );
        let shadows = [sprite(RenderLayer::Shadows, 0.0)];
        let lights = LightBatch::default();
        let input = FrameInput {
            sprites: &buffer,
            shadows: &shadows,
            lit: &[],
            lights: &lights,
        };
        let mut encoder = RecordingEncoder::new();
        render_frame(&mut passes, &mut encoder, input, &FrameSettings::default(), SWAPCHAIN);

        let surface = passes.get(PassType::SurfaceA).texture();
        let start = encoder
            .commands
            .iter()
            .position(|c| matches!(c, Command::BeginPass { target, .. } if *target == surface))
            .unwrap();
        let kinds: Vec<&str> = encoder.commands[start..]
            .iter()
            .take_while(|c| **c != Command::EndPass)
            .filter_map(|c| match c {
                Command::Sprites { .. } => Some("sprites"),
                Command::Texture { .. } => Some("shadow"),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, ["sprites", "shadow", "sprites"]);
    }

    #[test]
    fn bloom_can_be_disabled() {
        let (_device, mut passes) = setup();
        let buffer = SpriteBuffer::new();
        let lights = LightBatch::default();
        let input = FrameInput {
            sprites: &buffer,
            shadows: &[],
            lit: &[],
            lights: &lights,
        };
        let settings = FrameSettings {
            bloom: false,
            ..Default::default()
        };
        let mut encoder = RecordingEncoder::new();
        let stats = render_frame(&mut passes, &mut encoder, input, &settings, SWAPCHAIN);
        assert!(!stats.stages.contains(&FrameStage::Highpass));
        let surface = passes.get(PassType::SurfaceA).texture();
        assert!(encoder.commands.contains(&Command::Fullscreen(surface)));
    }

    #[test]
    fn pool_exhaustion_skips_sprite_passes() {
        let (device, mut passes) = setup();
        let buffer = SpriteBuffer::new();
        let shadows = [sprite(RenderLayer::Shadows, 0.0), sprite(RenderLayer::Shadows, 10.0)];
        let lights = LightBatch::default();
        let input = FrameInput {
            sprites: &buffer,
            shadows: &shadows,
            lit: &[],
            lights: &lights,
        };
        device.fail_after(1);
        let mut encoder = RecordingEncoder::new();
        let stats = render_frame(&mut passes, &mut encoder, input, &FrameSettings::default(), SWAPCHAIN);
        assert_eq!(stats.shadow_passes, 1);
        assert_eq!(stats.skipped_sprite_passes, 1);
        assert_eq!(stats.stages.last(), Some(&FrameStage::Present));
    }

    #[test]
    fn second_frame_reuses_pooled_passes() {
        let (device, mut passes) = setup();
        let buffer = SpriteBuffer::new();
        let shadows = [sprite(RenderLayer::Shadows, 0.0)];
        let lit = [sprite(RenderLayer::Units, 0.0)];
        let lights = LightBatch::default();
        let input = FrameInput {
            sprites: &buffer,
            shadows: &shadows,
            lit: &lit,
            lights: &lights,
        };
        let mut encoder = RecordingEncoder::new();
        render_frame(&mut passes, &mut encoder, input, &FrameSettings::default(), SWAPCHAIN);
        let created = device.textures_created();
        render_frame(&mut passes, &mut encoder, input, &FrameSettings::default(), SWAPCHAIN);
        assert_eq!(device.textures_created(), created);
    }

    #[test]
    fn lights_upload_before_the_first_pass() {
        let (_device, mut passes) = setup();
        let buffer = SpriteBuffer::new();
        let lit = [sprite(RenderLayer::Units, 0.0).with_tint(Vec3::new(1.0, 0.5, 0.0))];
        let mut lighting = LightingManager::new();
        lighting.add(Light::point(Vec2::new(50.0, 150.0), Vec3::new(1.0, 0.5, 0.0), 1.0));
        lighting.add(Light::directional(Vec3::ONE, 0.2));
        let lights = lighting.prepare_batch().clone();
        let input = FrameInput {
            sprites: &buffer,
            shadows: &[],
            lit: &lit,
            lights: &lights,
        };
        let mut encoder = RecordingEncoder::new();
        render_frame(&mut passes, &mut encoder, input, &FrameSettings::default(), SWAPCHAIN);

        let upload = encoder
            .commands
            .iter()
            .position(|c| matches!(c, Command::Lights { count: 2, .. }))
            .unwrap();
        let first_begin = encoder
            .commands
            .iter()
            .position(|c| matches!(c, Command::BeginPass { .. }))
            .unwrap();
        assert!(upload < first_begin);

        // The lit sprite's pass samples with its light colour.
        let tints: Vec<[f32; 3]> = encoder.sprite_instances().iter().map(|i| i.tint).collect();
        assert_eq!(tints, [[1.0, 0.5, 0.0]]);
    }
}
