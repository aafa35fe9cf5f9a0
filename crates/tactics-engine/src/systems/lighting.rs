//! Scene lighting: ambient colour, dynamic point and directional lights,
//! and the time-of-day sun used for shadow casting.
//!
//! Dynamic lights persist until removed. Each frame `update` advances
//! flicker, then `prepare_batch` packs the first [`MAX_LIGHTS`] lights for
//! upload.

use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use log::{debug, info};

/// Most lights a single GPU batch can carry.
pub const MAX_LIGHTS: usize = 32;
/// Default ambient level, rgb(89, 89, 89).
pub const DEFAULT_AMBIENT: f32 = 89.0 / 255.0;
/// Three tiles.
pub const DEFAULT_LIGHT_RADIUS: f32 = 285.0;
pub const DEFAULT_FALLOFF: f32 = 2.0;
pub const DEFAULT_SHADOW_INTENSITY: f32 = 0.15;
/// Radius of the sun light, far enough that its rays are near parallel.
pub const SUN_RADIUS: f32 = 95_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightType {
    /// Radial falloff from a position.
    #[default]
    Point,
    /// Uniform everywhere; position is ignored.
    Directional,
}

/// A scene light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightType,
    pub position: Vec2,
    /// Height above the ground, used for shadow length.
    pub height: f32,
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
    pub falloff: f32,
    pub casts_shadows: bool,
    pub shadow_intensity: f32,
    /// 0 disables flicker.
    pub flicker_amount: f32,
    /// Flicker cycles per second.
    pub flicker_speed: f32,
    flicker_phase: f32,
    effective_intensity: f32,
}

impl Light {
    pub fn point(position: Vec2, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightType::Point,
            position,
            height: 0.0,
            color,
            intensity,
            radius: DEFAULT_LIGHT_RADIUS,
            falloff: DEFAULT_FALLOFF,
            casts_shadows: true,
            shadow_intensity: DEFAULT_SHADOW_INTENSITY,
            flicker_amount: 0.0,
            flicker_speed: 1.0,
            flicker_phase: 0.0,
            effective_intensity: intensity,
        }
    }

    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightType::Directional,
            ..Self::point(Vec2::ZERO, color, intensity)
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_falloff(mut self, falloff: f32) -> Self {
        self.falloff = falloff;
        self
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn with_shadows(mut self, casts_shadows: bool, shadow_intensity: f32) -> Self {
        self.casts_shadows = casts_shadows;
        self.shadow_intensity = shadow_intensity;
        self
    }

    pub fn with_flicker(mut self, amount: f32, speed: f32) -> Self {
        self.flicker_amount = amount;
        self.flicker_speed = speed;
        self
    }

    /// Advance flicker and recompute the effective intensity.
    pub fn update(&mut self, dt: f32) {
        if self.flicker_amount > 0.0 {
            self.flicker_phase += dt * self.flicker_speed;
            let flicker = (self.flicker_phase * TAU).sin() * 0.5 + 0.5;
            self.effective_intensity = self.intensity * (1.0 - self.flicker_amount * flicker);
        } else {
            self.effective_intensity = self.intensity;
        }
    }

    pub fn effective_intensity(&self) -> f32 {
        self.effective_intensity
    }

    /// Scalar strength of this light at `point`.
    ///
    /// Directional lights return their effective intensity regardless of
    /// distance.
    pub fn attenuation(&self, point: Vec2) -> f32 {
        match self.kind {
            LightType::Directional => self.effective_intensity,
            LightType::Point => {
                if self.radius <= 0.0 {
                    return 0.0;
                }
                let ratio = point.distance(self.position) / self.radius;
                (1.0 - ratio.powf(self.falloff)).max(0.0) * self.effective_intensity
            }
        }
    }

    pub fn contribution(&self, point: Vec2) -> Vec3 {
        self.color * self.attenuation(point)
    }

    /// Whether the light reaches any part of the rectangle `[min, max]`.
    pub fn reaches(&self, min: Vec2, max: Vec2) -> bool {
        match self.kind {
            LightType::Directional => true,
            LightType::Point => {
                let closest = self.position.clamp(min, max);
                closest.distance_squared(self.position) < self.radius * self.radius
            }
        }
    }
}

/// Per-light upload layout: 8 floats / 32 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    pub position: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl GpuLight {
    pub const FLOATS: usize = 8;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;
}

impl From<&Light> for GpuLight {
    fn from(light: &Light) -> Self {
        Self {
            position: [light.position.x, light.position.y, light.height],
            radius: light.radius,
            color: light.color.to_array(),
            intensity: light.effective_intensity,
        }
    }
}

/// Lights packed for one frame's lighting pass.
#[derive(Debug, Clone, Default)]
pub struct LightBatch {
    lights: Vec<GpuLight>,
    capacity: usize,
}

impl LightBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_LIGHTS);
        Self {
            lights: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }

    /// Append a light. Returns `false` once the batch is full.
    pub fn push(&mut self, light: &Light) -> bool {
        if self.lights.len() >= self.capacity {
            return false;
        }
        self.lights.push(GpuLight::from(light));
        true
    }

    pub fn count(&self) -> usize {
        self.lights.len()
    }

    pub fn lights(&self) -> &[GpuLight] {
        &self.lights
    }

    /// Raw bytes for buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.lights)
    }
}

/// A named time of day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingPreset {
    pub name: &'static str,
    /// Hour, 0 to 24.
    pub time_of_day: f32,
    pub shadow_intensity: f32,
}

pub const LIGHTING_PRESETS: [LightingPreset; 10] = [
    LightingPreset { name: "Dawn", time_of_day: 6.5, shadow_intensity: 0.50 },
    LightingPreset { name: "Morning", time_of_day: 9.0, shadow_intensity: 0.75 },
    LightingPreset { name: "Noon", time_of_day: 12.0, shadow_intensity: 1.00 },
    LightingPreset { name: "Afternoon", time_of_day: 15.0, shadow_intensity: 0.85 },
    LightingPreset { name: "Golden Hour", time_of_day: 17.0, shadow_intensity: 0.70 },
    LightingPreset { name: "Dusk", time_of_day: 18.5, shadow_intensity: 0.55 },
    LightingPreset { name: "Evening", time_of_day: 20.0, shadow_intensity: 0.40 },
    LightingPreset { name: "Night", time_of_day: 23.0, shadow_intensity: 0.30 },
    LightingPreset { name: "Pre-Dawn", time_of_day: 5.0, shadow_intensity: 0.35 },
    LightingPreset { name: "Zenith", time_of_day: 12.0, shadow_intensity: 1.10 },
];

/// Sun position for an hour of the day.
///
/// The sun orbits the screen centre at 3.5 window heights: 6h is due right,
/// 12h straight up, 18h due left.
pub fn sun_position_from_time(hour: f32, window_w: u32, window_h: u32) -> Vec2 {
    let hour = hour.rem_euclid(24.0);
    let angle = ((hour - 6.0) / 12.0) * PI;
    let orbit = window_h as f32 * 3.5;
    Vec2::new(
        window_w as f32 * 0.5 + angle.cos() * orbit,
        window_h as f32 * 0.5 - angle.sin() * orbit,
    )
}

/// Ambient colour, dynamic lights and the scene sun.
#[derive(Debug, Clone)]
pub struct LightingManager {
    lights: Vec<Light>,
    ambient: Vec3,
    scene_light: Option<Light>,
    shadow_intensity: f32,
    current_preset: Option<usize>,
    batch: LightBatch,
}

impl LightingManager {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LIGHTS)
    }

    /// `max_lights` caps the GPU batch, never above [`MAX_LIGHTS`].
    pub fn with_capacity(max_lights: usize) -> Self {
        Self {
            lights: Vec::new(),
            ambient: Vec3::splat(DEFAULT_AMBIENT),
            scene_light: None,
            shadow_intensity: 1.0,
            current_preset: None,
            batch: LightBatch::with_capacity(max_lights),
        }
    }

    /// Add a light, returning its index.
    pub fn add(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    /// Remove the light at `idx`. Later lights shift down by one.
    pub fn remove(&mut self, idx: usize) -> Option<Light> {
        (idx < self.lights.len()).then(|| self.lights.remove(idx))
    }

    pub fn get(&self, idx: usize) -> Option<&Light> {
        self.lights.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Light> {
        self.lights.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter()
    }

    /// Remove every dynamic light. Ambient and the scene light are kept.
    pub fn clear(&mut self) {
        self.lights.clear();
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn update(&mut self, dt: f32) {
        for light in &mut self.lights {
            light.update(dt);
        }
    }

    pub fn set_ambient(&mut self, ambient: Vec3) {
        self.ambient = ambient;
    }

    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    /// Total light at `point`: ambient plus every light, clamped to [0, 1].
    pub fn light_at(&self, point: Vec2) -> Vec3 {
        self.lights
            .iter()
            .fold(self.ambient, |acc, light| acc + light.contribution(point))
            .clamp(Vec3::ZERO, Vec3::ONE)
    }

    /// Light added on top of ambient at `point`, after clamping.
    pub fn dynamic_light_at(&self, point: Vec2) -> Vec3 {
        (self.light_at(point) - self.ambient.clamp(Vec3::ZERO, Vec3::ONE)).max(Vec3::ZERO)
    }

    /// Shadow opacity factor at `point`: the sun's attenuation there times
    /// the preset shadow strength, clamped to [0, 1]. Without a sun only the
    /// shadow strength applies.
    pub fn shadow_strength(&self, point: Vec2) -> f32 {
        let sun = self.scene_light.as_ref().map_or(1.0, |sun| sun.attenuation(point));
        (sun * self.shadow_intensity).clamp(0.0, 1.0)
    }

    /// Indices of the lights reaching the rectangle at `origin` of `size`.
    pub fn lights_in_region(&self, origin: Vec2, size: Vec2) -> Vec<usize> {
        let max = origin + size;
        self.lights
            .iter()
            .enumerate()
            .filter(|(_, light)| light.reaches(origin, max))
            .map(|(i, _)| i)
            .collect()
    }

    /// Pack lights for upload. Lights past the batch capacity are dropped.
    pub fn prepare_batch(&mut self) -> &LightBatch {
        self.batch.clear();
        for light in &self.lights {
            if !self.batch.push(light) {
                debug!("light batch full, {} lights dropped", self.lights.len() - self.batch.count());
                break;
            }
        }
        &self.batch
    }

    pub fn batch(&self) -> &LightBatch {
        &self.batch
    }

    /// Move the sun to the preset's hour and set the global shadow strength.
    /// Returns `false` for an out-of-range index.
    pub fn apply_preset(&mut self, idx: usize, window_w: u32, window_h: u32) -> bool {
        let Some(preset) = LIGHTING_PRESETS.get(idx) else {
            return false;
        };
        let sun = sun_position_from_time(preset.time_of_day, window_w, window_h);
        self.scene_light = Some(Light::point(sun, Vec3::ONE, 1.0).with_radius(SUN_RADIUS));
        self.shadow_intensity = preset.shadow_intensity;
        self.current_preset = Some(idx);
        info!(
            "lighting preset {} ({:.1}h): sun ({:.0}, {:.0}), shadow intensity {:.2}",
            preset.name, preset.time_of_day, sun.x, sun.y, preset.shadow_intensity
        );
        true
    }

    pub fn scene_light(&self) -> Option<&Light> {
        self.scene_light.as_ref()
    }

    pub fn shadow_intensity(&self) -> f32 {
        self.shadow_intensity
    }

    pub fn current_preset(&self) -> Option<&'static LightingPreset> {
        self.current_preset.and_then(|idx| LIGHTING_PRESETS.get(idx))
    }
}

impl Default for LightingManager {
    fn default() -> Self {
        Self::new()
    }
}
