use bytemuck::{Pod, Zeroable};

use crate::components::layer::RenderLayer;
use crate::components::sprite::{AtlasId, BlendMode, SpriteDraw};

/// Per-instance sprite data uploaded to the GPU: 16 floats = 64 bytes stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    /// Top-left of the destination quad in screen pixels.
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    /// Source UVs (u, v, width, height). A flipped sprite has negative width
    /// with `u` at the right edge.
    pub uv: [f32; 4],
    pub alpha: f32,
    pub dissolve: f32,
    pub seed: f32,
    pub z: f32,
    /// Multiplied into the sampled colour.
    pub tint: [f32; 3],
    pub _pad0: f32,
}

impl SpriteInstance {
    pub const FLOATS: usize = 16;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;
}

impl From<&SpriteDraw> for SpriteInstance {
    fn from(draw: &SpriteDraw) -> Self {
        let [u, v, uw, vh] = draw.uv_rect();
        let uv = if draw.flip_x {
            [u + uw, v, -uw, vh]
        } else {
            [u, v, uw, vh]
        };
        Self {
            x: draw.position.x,
            y: draw.position.y,
            w: draw.size.x,
            h: draw.size.y,
            uv,
            alpha: draw.alpha,
            dissolve: draw.dissolve,
            seed: draw.seed,
            z: draw.z,
            tint: draw.tint.to_array(),
            _pad0: 0.0,
        }
    }
}

/// A run of instances drawn with one atlas and one blend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteBatch {
    pub layer: RenderLayer,
    pub blend: BlendMode,
    pub atlas: AtlasId,
    /// Start index in the instance array.
    pub start: u32,
    /// End index (exclusive).
    pub end: u32,
}

impl SpriteBatch {
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Instances for one frame plus the batches that slice them.
#[derive(Debug, Clone)]
pub struct SpriteBuffer {
    pub instances: Vec<SpriteInstance>,
    pub batches: Vec<SpriteBatch>,
}

impl SpriteBuffer {
    pub fn new() -> Self {
        Self {
            instances: Vec::with_capacity(512),
            batches: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.instances.clear();
        self.batches.clear();
    }

    /// Append an instance, extending the last batch when its state matches.
    pub fn push(&mut self, draw: &SpriteDraw) {
        let idx = self.instances.len() as u32;
        self.instances.push(SpriteInstance::from(draw));
        match self.batches.last_mut() {
            Some(batch)
                if batch.layer == draw.layer && batch.blend == draw.blend && batch.atlas == draw.atlas =>
            {
                batch.end = idx + 1;
            }
            _ => self.batches.push(SpriteBatch {
                layer: draw.layer,
                blend: draw.blend,
                atlas: draw.atlas,
                start: idx,
                end: idx + 1,
            }),
        }
    }

    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }

    pub fn instances_for(&self, batch: &SpriteBatch) -> &[SpriteInstance] {
        &self.instances[batch.start as usize..batch.end as usize]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

impl Default for SpriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::FrameRect;
    use glam::{Vec2, Vec3};

    fn draw(atlas: u32, blend: BlendMode) -> SpriteDraw {
        SpriteDraw::new(
            AtlasId(atlas),
            FrameRect::new(50, 0, 50, 100),
            Vec2::new(200.0, 100.0),
            Vec2::new(10.0, 20.0),
            Vec2::new(50.0, 100.0),
        )
        .with_blend(blend)
    }

    #[test]
    fn instance_layout() {
        assert_eq!(std::mem::size_of::<SpriteInstance>(), SpriteInstance::STRIDE_BYTES);
    }

    #[test]
    fn flip_mirrors_uvs() {
        let plain = SpriteInstance::from(&draw(0, BlendMode::Alpha));
        assert_eq!(plain.uv, [0.25, 0.0, 0.25, 1.0]);
        let flipped = SpriteInstance::from(&draw(0, BlendMode::Alpha).with_flip(true));
        assert_eq!(flipped.uv, [0.5, 0.0, -0.25, 1.0]);
        assert_eq!(flipped.x, plain.x);
    }

    #[test]
    fn tint_is_carried_into_instance() {
        let plain = SpriteInstance::from(&draw(0, BlendMode::Alpha));
        assert_eq!(plain.tint, [1.0, 1.0, 1.0]);
        let warm = SpriteInstance::from(&draw(0, BlendMode::Additive).with_tint(Vec3::new(0.8, 0.4, 0.0)));
        assert_eq!(warm.tint, [0.8, 0.4, 0.0]);
    }

    #[test]
    fn consecutive_matching_draws_share_a_batch() {
        let mut buffer = SpriteBuffer::new();
        buffer.push(&draw(0, BlendMode::Alpha));
        buffer.push(&draw(0, BlendMode::Alpha));
        buffer.push(&draw(1, BlendMode::Alpha));
        buffer.push(&draw(1, BlendMode::Additive));
        buffer.push(&draw(1, BlendMode::Additive));
        assert_eq!(buffer.instance_count(), 5);
        let lens: Vec<usize> = buffer.batches.iter().map(SpriteBatch::len).collect();
        assert_eq!(lens, [2, 1, 2]);
        assert_eq!(buffer.instances_for(&buffer.batches[2]).len(), 2);
        assert_eq!(buffer.as_bytes().len(), 5 * SpriteInstance::STRIDE_BYTES);

        buffer.clear();
        assert!(buffer.batches.is_empty());
    }
}
