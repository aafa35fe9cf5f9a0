//! The named pass set and the per-sprite pass pools.

use std::rc::Rc;

use log::{debug, error, info, warn};

use crate::api::error::Result;
use crate::renderer::device::{GpuDevice, TextureFormat};
use crate::renderer::pass::RenderPass;

/// Persistent full-screen passes, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassType {
    /// Cached screen contents.
    Cache,
    Screen,
    BlurComposite,
    /// Surface double buffer.
    SurfaceA,
    SurfaceB,
    /// Packed depth.
    Depth,
    /// Bloom extraction.
    Highpass,
    Blur,
    Bloom,
    BloomCompositeA,
    BloomCompositeB,
    RadialBlur,
    ToneCurve,
    GradientColorMap,
}

impl PassType {
    pub const COUNT: usize = 14;

    pub const ALL: [PassType; Self::COUNT] = [
        PassType::Cache,
        PassType::Screen,
        PassType::BlurComposite,
        PassType::SurfaceA,
        PassType::SurfaceB,
        PassType::Depth,
        PassType::Highpass,
        PassType::Blur,
        PassType::Bloom,
        PassType::BloomCompositeA,
        PassType::BloomCompositeB,
        PassType::RadialBlur,
        PassType::ToneCurve,
        PassType::GradientColorMap,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            PassType::Cache => "cache",
            PassType::Screen => "screen",
            PassType::BlurComposite => "blurComposite",
            PassType::SurfaceA => "surfaceA",
            PassType::SurfaceB => "surfaceB",
            PassType::Depth => "depth",
            PassType::Highpass => "highpass",
            PassType::Blur => "blur",
            PassType::Bloom => "bloom",
            PassType::BloomCompositeA => "bloomCompositeA",
            PassType::BloomCompositeB => "bloomCompositeB",
            PassType::RadialBlur => "radialBlur",
            PassType::ToneCurve => "toneCurve",
            PassType::GradientColorMap => "gradientColorMap",
        }
    }

    /// Size relative to the screen. Bloom passes run at half resolution.
    pub fn scale(self) -> f32 {
        match self {
            PassType::Highpass
            | PassType::Blur
            | PassType::Bloom
            | PassType::BloomCompositeA
            | PassType::BloomCompositeB => 0.5,
            _ => 1.0,
        }
    }

    /// Passes drawn with the sprite pipeline share the swapchain format;
    /// fullscreen post-processing passes use RGBA8.
    pub fn uses_swapchain_format(self) -> bool {
        matches!(
            self,
            PassType::Cache
                | PassType::Screen
                | PassType::BlurComposite
                | PassType::SurfaceA
                | PassType::SurfaceB
        )
    }
}

/// Format of dynamically pooled per-sprite passes.
const POOL_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// Reusable per-sprite passes. The cursor rewinds every frame; passes persist.
#[derive(Debug)]
struct PassPool {
    prefix: &'static str,
    passes: Vec<RenderPass>,
    cursor: usize,
}

impl PassPool {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            passes: Vec::new(),
            cursor: 0,
        }
    }

    /// Next pooled pass at least `width` x `height`.
    ///
    /// A slot that is too small is recreated at the requested size; the old
    /// pass is kept if that fails. Failures are logged and return `None`.
    fn acquire(&mut self, device: &Rc<dyn GpuDevice>, width: u32, height: u32) -> Option<&RenderPass> {
        if self.cursor < self.passes.len() {
            let slot = self.cursor;
            self.cursor += 1;
            if self.passes[slot].fits(width, height) {
                return Some(&self.passes[slot]);
            }
            let name = format!("{}_{}", self.prefix, slot);
            return match RenderPass::create(Rc::clone(device), name, width, height, 1.0, POOL_FORMAT) {
                Ok(pass) => {
                    self.passes[slot] = pass;
                    Some(&self.passes[slot])
                }
                Err(e) => {
                    warn!("skipping per-sprite pass: {}", e);
                    None
                }
            };
        }

        let name = format!("{}_{}", self.prefix, self.passes.len());
        match RenderPass::create(Rc::clone(device), name, width, height, 1.0, POOL_FORMAT) {
            Ok(pass) => {
                self.passes.push(pass);
                self.cursor += 1;
                self.passes.last()
            }
            Err(e) => {
                warn!("skipping per-sprite pass: {}", e);
                None
            }
        }
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn clear(&mut self) {
        self.passes.clear();
        self.cursor = 0;
    }
}

/// Owns every off-screen pass for one device.
#[derive(Debug)]
pub struct PassManager {
    device: Rc<dyn GpuDevice>,
    passes: Vec<RenderPass>,
    width: u32,
    height: u32,
    swapchain_format: TextureFormat,
    shadow_pool: PassPool,
    light_pool: PassPool,
}

impl PassManager {
    /// Create the full named pass set. Any failure is fatal.
    pub fn new(device: Rc<dyn GpuDevice>, width: u32, height: u32, swapchain_format: TextureFormat) -> Result<Self> {
        let passes = create_named_passes(&device, width, height, swapchain_format)?;
        info!(
            "created {} render passes at {}x{} ({:?} swapchain)",
            passes.len(),
            width,
            height,
            swapchain_format
        );
        Ok(Self {
            device,
            passes,
            width,
            height,
            swapchain_format,
            shadow_pool: PassPool::new("spriteShadow"),
            light_pool: PassPool::new("spriteLight"),
        })
    }

    /// Recreate every named pass at the new size and empty both pools.
    ///
    /// On failure the previous pass set stays in place and the error is
    /// returned.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        self.passes = create_named_passes(&self.device, width, height, self.swapchain_format)?;
        self.width = width;
        self.height = height;
        self.shadow_pool.clear();
        self.light_pool.clear();
        debug!("render passes resized to {}x{}", width, height);
        Ok(())
    }

    pub fn get(&self, pass: PassType) -> &RenderPass {
        &self.passes[pass.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (PassType, &RenderPass)> {
        PassType::ALL.into_iter().zip(self.passes.iter())
    }

    pub fn acquire_sprite_shadow_pass(&mut self, width: u32, height: u32) -> Option<&RenderPass> {
        self.shadow_pool.acquire(&self.device, width, height)
    }

    pub fn acquire_sprite_light_pass(&mut self, width: u32, height: u32) -> Option<&RenderPass> {
        self.light_pool.acquire(&self.device, width, height)
    }

    /// Rewind both pools. Call once per frame before any acquire.
    pub fn reset_sprite_pass_pools(&mut self) {
        self.shadow_pool.reset();
        self.light_pool.reset();
    }

    pub fn shadow_pool_len(&self) -> usize {
        self.shadow_pool.passes.len()
    }

    pub fn light_pool_len(&self) -> usize {
        self.light_pool.passes.len()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn swapchain_format(&self) -> TextureFormat {
        self.swapchain_format
    }
}

fn create_named_passes(
    device: &Rc<dyn GpuDevice>,
    width: u32,
    height: u32,
    swapchain_format: TextureFormat,
) -> Result<Vec<RenderPass>> {
    PassType::ALL
        .iter()
        .map(|&ty| {
            let format = if ty.uses_swapchain_format() {
                swapchain_format
            } else {
                TextureFormat::Rgba8Unorm
            };
            RenderPass::create(Rc::clone(device), ty.name(), width, height, ty.scale(), format).map_err(|e| {
                error!("{}", e);
                e
            })
        })
        .collect()
}
