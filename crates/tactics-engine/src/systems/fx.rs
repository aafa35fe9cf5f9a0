//! Sprite effects spawned on units and projectiles flying between them.

use std::rc::Rc;

use glam::Vec2;
use log::{debug, warn};

use crate::api::types::FactionId;
use crate::assets::cache::{AssetCache, FxAsset};
use crate::components::layer::RenderLayer;
use crate::components::player::AnimationPlayer;
use crate::components::sprite::SpriteDraw;
use crate::systems::fx_resolver::FxCompositionResolver;

/// Depth step between the sprites of one composition, so later sprites draw
/// over earlier ones at the same position.
const Z_STAGGER: f32 = 0.1;

/// One live effect sprite.
#[derive(Debug, Clone)]
pub struct FxSprite {
    asset: Rc<FxAsset>,
    player: AnimationPlayer,
    position: Vec2,
    start: Vec2,
    target: Vec2,
    elapsed: f32,
    /// Seconds to reach `target`. Zero for effects that stay put.
    travel_duration: f32,
    projectile: bool,
    finished: bool,
    z: f32,
}

impl FxSprite {
    fn new(asset: Rc<FxAsset>, position: Vec2, frame_delay: f32, z: f32) -> Self {
        let mut player = AnimationPlayer::new(Rc::clone(&asset.animations));
        player.play(&asset.animation, false);
        player.set_frame_delay(frame_delay);
        Self {
            asset,
            player,
            position,
            start: position,
            target: position,
            elapsed: 0.0,
            travel_duration: 0.0,
            projectile: false,
            finished: false,
            z,
        }
    }

    fn update(&mut self, dt: f32) {
        if self.finished {
            return;
        }
        self.elapsed += dt;
        self.player.update(dt);

        if self.projectile {
            let t = if self.travel_duration > 0.0 {
                (self.elapsed / self.travel_duration).min(1.0)
            } else {
                1.0
            };
            self.position = self.start.lerp(self.target, t);
            if t >= 1.0 {
                self.finished = true;
            }
        } else if self.player.is_finished() || self.player.current_frame().is_none() {
            self.finished = true;
        }
    }

    /// Seconds until this sprite completes.
    fn remaining(&self) -> f32 {
        let remaining = if self.projectile {
            self.travel_duration - self.elapsed
        } else {
            self.player.total_duration() - self.player.elapsed()
        };
        remaining.max(0.0)
    }

    pub fn rsx(&self) -> &str {
        &self.asset.rsx
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn z(&self) -> f32 {
        self.z
    }

    pub fn is_projectile(&self) -> bool {
        self.projectile
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn player(&self) -> &AnimationPlayer {
        &self.player
    }

    /// Draw centred on the current position, `scale` applied to frame size.
    pub fn sprite(&self, scale: f32) -> Option<SpriteDraw> {
        let frame = self.player.current_frame()?;
        let size = frame.rect.size() * scale;
        Some(
            SpriteDraw::new(
                self.asset.atlas,
                frame.rect,
                self.asset.sheet_size,
                self.position - size * 0.5,
                size,
            )
            .with_blend(self.asset.blend)
            .with_layer(RenderLayer::Fx)
            .with_z(self.z),
        )
    }
}

/// Owns every active effect sprite and the composition resolver.
#[derive(Debug, Clone, Default)]
pub struct FxSystem {
    resolver: FxCompositionResolver,
    active: Vec<FxSprite>,
}

impl FxSystem {
    pub fn new(resolver: FxCompositionResolver) -> Self {
        Self {
            resolver,
            active: Vec::new(),
        }
    }

    pub fn resolver(&self) -> &FxCompositionResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut FxCompositionResolver {
        &mut self.resolver
    }

    /// Spawn the composition resolved for a unit at `position`.
    ///
    /// Returns the number of sprites spawned. Sprites whose asset is missing
    /// are skipped; an unresolved request spawns nothing.
    pub fn spawn_unit_fx(
        &mut self,
        assets: &mut AssetCache,
        unit_id: &str,
        faction: FactionId,
        fx_type: &str,
        position: Vec2,
    ) -> usize {
        let Some(composition) = self.resolver.resolve(unit_id, faction, fx_type) else {
            debug!("no {} composition for '{}' (faction {})", fx_type, unit_id, faction.0);
            return 0;
        };
        let sprites = composition.sprites.clone();

        let mut spawned = 0;
        for rsx in &sprites {
            let Some(asset) = assets.fx(rsx) else {
                warn!("skipping FX sprite '{}' in {} for '{}'", rsx, fx_type, unit_id);
                continue;
            };
            let delay = self.resolver.get_frame_delay(rsx);
            let z = position.y + Z_STAGGER * spawned as f32;
            self.active.push(FxSprite::new(asset, position, delay, z));
            spawned += 1;
        }
        spawned
    }

    /// Launch a sprite from `start` to `target` at `speed` pixels per second.
    ///
    /// The projectile completes on arrival. Returns `false` for a missing
    /// asset or a non-positive speed.
    pub fn spawn_projectile(
        &mut self,
        assets: &mut AssetCache,
        rsx: &str,
        start: Vec2,
        target: Vec2,
        speed: f32,
    ) -> bool {
        if !(speed > 0.0) {
            warn!("projectile '{}' rejected: speed {} is not positive", rsx, speed);
            return false;
        }
        let Some(asset) = assets.fx(rsx) else {
            return false;
        };
        let delay = self.resolver.get_frame_delay(rsx);
        let mut fx = FxSprite::new(asset, start, delay, start.y);
        fx.target = target;
        fx.travel_duration = start.distance(target) / speed;
        fx.projectile = true;
        self.active.push(fx);
        true
    }

    /// Advance every sprite, then drop the ones that completed.
    pub fn update(&mut self, dt: f32) {
        for fx in &mut self.active {
            fx.update(dt);
        }
        self.active.retain(|fx| !fx.finished);
    }

    /// Draw commands for every live sprite.
    pub fn sprites(&self, scale: f32) -> impl Iterator<Item = SpriteDraw> + '_ {
        self.active.iter().filter_map(move |fx| fx.sprite(scale))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FxSprite> {
        self.active.iter()
    }

    pub fn has_active_fx(&self) -> bool {
        !self.active.is_empty()
    }

    /// Seconds until the longest-running active sprite completes.
    pub fn max_remaining_duration(&self) -> f32 {
        self.active.iter().map(FxSprite::remaining).fold(0.0, f32::max)
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
