//! Board units and their lifecycle state machine.
//!
//! A unit is polled once per simulation step through [`Unit::update`]. Every
//! timed behaviour (spawn fade, movement, attack impact, death, dissolve) is
//! an explicit timer advanced by `dt`. Units never remove themselves: once
//! [`Unit::is_dead`] reports true the owning roster drains them.

use std::rc::Rc;

use glam::Vec2;
use log::{debug, warn};

use crate::api::config::EngineConfig;
use crate::api::error::{EngineError, Result};
use crate::api::types::{BoardPos, FactionId};
use crate::assets::timing::UnitTiming;
use crate::components::animation::AnimationSet;
use crate::components::layer::RenderLayer;
use crate::components::player::AnimationPlayer;
use crate::components::sprite::{AtlasId, BlendMode, SpriteDraw};
use crate::core::board::BoardLayout;
use crate::core::easing::ease_vec2;

/// Idle animation names, in order of preference.
pub const IDLE_ANIMATIONS: [&str; 2] = ["breathing", "idle"];
/// Movement animation names, in order of preference.
pub const MOVE_ANIMATIONS: [&str; 2] = ["run", "walk"];
pub const ATTACK_ANIMATION: &str = "attack";
pub const HIT_ANIMATION: &str = "hit";
pub const DEATH_ANIMATION: &str = "death";

/// Peak shadow opacity (200 of 255).
pub const SHADOW_OPACITY: f32 = 200.0 / 255.0;
/// Pixels of transparent padding below a unit's feet in its frames.
pub const DEFAULT_SHADOW_OFFSET: f32 = 40.0;

/// Total time to walk `tiles` cells when one pass of the run cycle takes
/// `per_tile` seconds.
pub fn move_duration(per_tile: f32, tiles: u32, correction: f32) -> f32 {
    per_tile * (tiles + 1) as f32 - correction * per_tile
}

/// Lifecycle state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitState {
    /// Fading in after being placed on the board.
    #[default]
    Spawning,
    Idle,
    Moving,
    Attacking,
    /// Flinching from non-lethal damage.
    Hit,
    /// Playing the death animation.
    Dying,
    /// Fading out after death.
    Dissolving,
    /// Finished dissolving; waiting to be drained.
    Dead,
}

/// Combat stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    pub hp: i32,
    pub attack: i32,
    pub range: i32,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            hp: 10,
            attack: 2,
            range: 1,
        }
    }
}

/// Everything needed to place a unit type on the board.
#[derive(Debug, Clone)]
pub struct UnitDescriptor {
    /// Asset folder name, e.g. `f1_general`.
    pub unit_id: String,
    pub faction: FactionId,
    pub atlas: AtlasId,
    /// Spritesheet size in pixels.
    pub sheet_size: Vec2,
    pub animations: Rc<AnimationSet>,
    pub timing: UnitTiming,
    pub stats: UnitStats,
    pub shadow_offset: f32,
}

impl UnitDescriptor {
    pub fn new(unit_id: impl Into<String>, animations: Rc<AnimationSet>) -> Self {
        Self {
            unit_id: unit_id.into(),
            faction: FactionId::NEUTRAL,
            atlas: AtlasId::default(),
            sheet_size: Vec2::ZERO,
            animations,
            timing: UnitTiming::default(),
            stats: UnitStats::default(),
            shadow_offset: DEFAULT_SHADOW_OFFSET,
        }
    }

    pub fn with_faction(mut self, faction: FactionId) -> Self {
        self.faction = faction;
        self
    }

    pub fn with_atlas(mut self, atlas: AtlasId, sheet_size: Vec2) -> Self {
        self.atlas = atlas;
        self.sheet_size = sheet_size;
        self
    }

    pub fn with_timing(mut self, timing: UnitTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_stats(mut self, stats: UnitStats) -> Self {
        self.stats = stats;
        self
    }

    /// Reject units with nothing to play at rest, or whose damage delay
    /// could never fire during the attack animation.
    pub fn validate(&self) -> Result<()> {
        if !IDLE_ANIMATIONS.iter().any(|name| self.animations.contains(name)) {
            return Err(EngineError::MissingAnimation {
                unit: self.unit_id.clone(),
                animation: IDLE_ANIMATIONS[1].to_owned(),
            });
        }
        if let Some(attack) = self.animations.get(ATTACK_ANIMATION) {
            let duration = attack.duration();
            if self.timing.attack_damage_delay > duration {
                return Err(EngineError::InvalidTiming {
                    unit: self.unit_id.clone(),
                    damage_delay: self.timing.attack_damage_delay,
                    attack_duration: duration,
                });
            }
        }
        Ok(())
    }
}

/// Damage owed by an attacker whose attack reached its impact time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    /// Roster index of the unit being hit.
    pub target: usize,
    pub amount: i32,
}

#[derive(Debug, Clone, Copy)]
struct Movement {
    target: BoardPos,
    from: Vec2,
    to: Vec2,
    elapsed: f32,
    duration: f32,
}

#[derive(Debug, Clone, Copy)]
struct Attack {
    target: usize,
    elapsed: f32,
    duration: f32,
    damage_dealt: bool,
}

/// Fade and movement constants copied out of [`EngineConfig`].
#[derive(Debug, Clone, Copy)]
struct Tuning {
    spawn_fade: f32,
    shadow_fade: f32,
    dissolve_duration: f32,
    move_modifier: f32,
    move_correction: f32,
}

impl From<&EngineConfig> for Tuning {
    fn from(config: &EngineConfig) -> Self {
        Self {
            spawn_fade: config.spawn_fade,
            shadow_fade: config.shadow_fade,
            dissolve_duration: config.dissolve_duration,
            move_modifier: config.move_duration_modifier,
            move_correction: config.move_correction,
        }
    }
}

/// A unit standing on the board.
#[derive(Debug, Clone)]
pub struct Unit {
    unit_id: String,
    faction: FactionId,
    atlas: AtlasId,
    sheet_size: Vec2,
    shadow_offset: f32,
    timing: UnitTiming,
    tuning: Tuning,
    animations: Rc<AnimationSet>,
    player: AnimationPlayer,

    state: UnitState,
    board_pos: BoardPos,
    screen_pos: Vec2,

    hp: i32,
    max_hp: i32,
    attack_power: i32,
    attack_range: i32,

    flip_x: bool,
    stored_flip: Option<bool>,
    opacity: f32,
    shadow_opacity: f32,

    spawn_elapsed: f32,
    movement: Option<Movement>,
    attack: Option<Attack>,
    pending_strike: Option<Strike>,
    death_elapsed: f32,
    death_duration: f32,
    dissolve_elapsed: f32,
    /// Opacity when the dissolve began.
    dissolve_from: f32,
    dissolve_seed: f32,
    death_complete: bool,
}

impl Unit {
    /// Build a unit from its descriptor. It starts invisible, in `Spawning`,
    /// playing its idle animation.
    ///
    /// Returns `None` if the descriptor fails [`UnitDescriptor::validate`].
    pub fn load(descriptor: &UnitDescriptor, config: &EngineConfig, dissolve_seed: f32) -> Option<Self> {
        if let Err(e) = descriptor.validate() {
            warn!("refusing to load unit: {}", e);
            return None;
        }

        let stats = descriptor.stats;
        let mut unit = Self {
            unit_id: descriptor.unit_id.clone(),
            faction: descriptor.faction,
            atlas: descriptor.atlas,
            sheet_size: descriptor.sheet_size,
            shadow_offset: descriptor.shadow_offset,
            timing: descriptor.timing,
            tuning: Tuning::from(config),
            animations: Rc::clone(&descriptor.animations),
            player: AnimationPlayer::new(Rc::clone(&descriptor.animations)),
            state: UnitState::Spawning,
            board_pos: BoardPos::default(),
            screen_pos: Vec2::ZERO,
            hp: stats.hp,
            max_hp: stats.hp,
            attack_power: stats.attack,
            attack_range: stats.range,
            flip_x: false,
            stored_flip: None,
            opacity: 0.0,
            shadow_opacity: 0.0,
            spawn_elapsed: 0.0,
            movement: None,
            attack: None,
            pending_strike: None,
            death_elapsed: 0.0,
            death_duration: 0.0,
            dissolve_elapsed: 0.0,
            dissolve_from: 1.0,
            dissolve_seed,
            death_complete: false,
        };
        unit.play_idle();
        Some(unit)
    }

    /// Place the unit on a cell and snap its screen position there.
    /// Off-board cells are rejected.
    pub fn set_board_position(&mut self, pos: BoardPos, layout: &BoardLayout) -> bool {
        if !pos.is_valid() {
            return false;
        }
        self.board_pos = pos;
        self.screen_pos = layout.board_to_screen_perspective(pos);
        true
    }

    /// Play a named animation, logging if the unit has none by that name.
    pub fn play_animation(&mut self, name: &str, looping: bool) -> bool {
        let played = self.player.play(name, looping);
        if !played {
            warn!("unit '{}' has no '{}' animation", self.unit_id, name);
        }
        played
    }

    fn play_idle(&mut self) -> bool {
        IDLE_ANIMATIONS.iter().any(|name| self.player.play(name, true))
    }

    /// Advance every timer by `dt` seconds.
    pub fn update(&mut self, dt: f32, layout: &BoardLayout) {
        if self.state == UnitState::Dead {
            return;
        }
        self.player.update(dt);
        self.update_fade_in(dt);

        match self.state {
            UnitState::Moving => self.update_movement(dt, layout),
            UnitState::Attacking => self.update_attack(dt),
            UnitState::Hit => {
                if !self.player.is_playing() {
                    self.state = UnitState::Idle;
                    self.play_idle();
                }
            }
            UnitState::Dying => {
                self.death_elapsed += dt;
                if self.death_elapsed >= self.death_duration {
                    self.start_dissolve();
                }
            }
            UnitState::Dissolving => {
                self.dissolve_elapsed += dt;
                self.opacity = self.dissolve_from * (1.0 - self.dissolve_progress());
                if self.dissolve_elapsed >= self.tuning.dissolve_duration {
                    self.opacity = 0.0;
                    self.death_complete = true;
                    self.state = UnitState::Dead;
                    debug!("unit '{}' dissolved", self.unit_id);
                }
            }
            UnitState::Spawning | UnitState::Idle | UnitState::Dead => {}
        }
    }

    fn update_fade_in(&mut self, dt: f32) {
        if self.state == UnitState::Dissolving {
            return;
        }
        let Tuning { spawn_fade, shadow_fade, .. } = self.tuning;
        if self.spawn_elapsed >= spawn_fade.max(shadow_fade) {
            return;
        }
        self.spawn_elapsed += dt;
        self.opacity = ramp(self.spawn_elapsed, spawn_fade);
        self.shadow_opacity = ramp(self.spawn_elapsed, shadow_fade) * SHADOW_OPACITY;
        if self.state == UnitState::Spawning && self.spawn_elapsed >= spawn_fade {
            self.state = UnitState::Idle;
        }
    }

    fn update_movement(&mut self, dt: f32, layout: &BoardLayout) {
        let Some(movement) = self.movement.as_mut() else {
            self.state = UnitState::Idle;
            return;
        };
        movement.elapsed += dt;
        if movement.elapsed < movement.duration {
            let t = movement.elapsed / movement.duration;
            self.screen_pos = ease_vec2(movement.from, movement.to, t);
            return;
        }

        let target = movement.target;
        self.movement = None;
        self.board_pos = target;
        self.screen_pos = layout.board_to_screen_perspective(target);
        self.state = UnitState::Idle;
        self.play_idle();
    }

    fn update_attack(&mut self, dt: f32) {
        let Some(attack) = self.attack.as_mut() else {
            self.state = UnitState::Idle;
            return;
        };
        attack.elapsed += dt;
        if !attack.damage_dealt && attack.elapsed >= self.timing.attack_damage_delay {
            attack.damage_dealt = true;
            self.pending_strike = Some(Strike {
                target: attack.target,
                amount: self.attack_power,
            });
        }
        if attack.elapsed >= attack.duration {
            self.attack = None;
            self.state = UnitState::Idle;
            self.restore_facing();
            self.play_idle();
        }
    }

    /// Walk to `target`. Rejected if the unit is busy, the target is off the
    /// board, the unit is already there, or it has no run/walk animation.
    pub fn start_move(&mut self, target: BoardPos, layout: &BoardLayout) -> bool {
        if !matches!(self.state, UnitState::Idle | UnitState::Spawning) {
            return false;
        }
        if !target.is_valid() || target == self.board_pos {
            return false;
        }
        let Some(run) = MOVE_ANIMATIONS.iter().find_map(|name| self.animations.get(name)) else {
            warn!("unit '{}' has no run or walk animation", self.unit_id);
            return false;
        };

        let per_tile = run.duration() * self.tuning.move_modifier;
        let tiles = self.board_pos.manhattan(target);
        let duration = move_duration(per_tile, tiles, self.tuning.move_correction);
        let run_name = run.name.clone();

        self.face_position(target);
        self.movement = Some(Movement {
            target,
            from: self.screen_pos,
            to: layout.board_to_screen_perspective(target),
            elapsed: 0.0,
            duration,
        });
        self.state = UnitState::Moving;
        self.player.play(&run_name, true);
        true
    }

    /// Attack the unit at roster index `target`.
    ///
    /// Damage becomes available from [`take_strike`](Self::take_strike) once
    /// the attack has run for the unit's damage delay.
    pub fn start_attack(&mut self, target: usize) -> bool {
        if !self.can_act() {
            return false;
        }
        let Some(duration) = self.animations.get(ATTACK_ANIMATION).map(|a| a.duration()) else {
            warn!("unit '{}' has no attack animation", self.unit_id);
            return false;
        };
        self.attack = Some(Attack {
            target,
            elapsed: 0.0,
            duration,
            damage_dealt: false,
        });
        self.state = UnitState::Attacking;
        self.player.play(ATTACK_ANIMATION, false);
        debug!("unit '{}' attacks #{} over {:.2}s", self.unit_id, target, duration);
        true
    }

    /// Collect damage owed by this unit's current attack. Yields at most one
    /// strike per attack.
    pub fn take_strike(&mut self) -> Option<Strike> {
        self.pending_strike.take()
    }

    /// Point the current attack at a new roster index after compaction, or
    /// cancel its damage if the target is gone.
    pub(crate) fn retarget_attack(&mut self, target: Option<usize>) {
        let Some(attack) = self.attack.as_mut() else {
            return;
        };
        match target {
            Some(idx) => {
                attack.target = idx;
                if let Some(strike) = self.pending_strike.as_mut() {
                    strike.target = idx;
                }
            }
            None => {
                attack.damage_dealt = true;
                self.pending_strike = None;
            }
        }
    }

    /// Apply damage. Returns `true` if this call killed the unit.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if self.hp <= 0 {
            return false;
        }
        self.hp = (self.hp - amount.max(0)).max(0);
        if self.hp == 0 {
            self.start_death();
            return true;
        }
        if self.state == UnitState::Idle && self.animations.contains(HIT_ANIMATION) {
            self.state = UnitState::Hit;
            self.player.play(HIT_ANIMATION, false);
        }
        false
    }

    fn start_death(&mut self) {
        self.movement = None;
        self.attack = None;
        self.death_elapsed = 0.0;
        match self.animations.get(DEATH_ANIMATION).map(|a| a.duration()) {
            Some(duration) => {
                self.death_duration = duration;
                self.state = UnitState::Dying;
                self.player.play(DEATH_ANIMATION, false);
            }
            None => {
                self.death_duration = 0.0;
                self.start_dissolve();
            }
        }
    }

    fn start_dissolve(&mut self) {
        self.state = UnitState::Dissolving;
        self.dissolve_elapsed = 0.0;
        self.dissolve_from = self.opacity;
        self.player.hold_last_frame();
        debug!("unit '{}' dissolving over {:.2}s", self.unit_id, self.tuning.dissolve_duration);
    }

    /// Turn to face a cell. Same-column cells keep the current facing.
    pub fn face_position(&mut self, target: BoardPos) {
        if target.x < self.board_pos.x {
            self.flip_x = true;
        } else if target.x > self.board_pos.x {
            self.flip_x = false;
        }
    }

    pub fn store_facing(&mut self) {
        self.stored_flip = Some(self.flip_x);
    }

    pub fn restore_facing(&mut self) {
        if let Some(flip) = self.stored_flip.take() {
            self.flip_x = flip;
        }
    }

    pub fn set_flip(&mut self, flip_x: bool) {
        self.flip_x = flip_x;
    }

    /// Sprite for this frame, or `None` when there is nothing to draw.
    pub fn sprite(&self, layout: &BoardLayout) -> Option<SpriteDraw> {
        if self.death_complete {
            return None;
        }
        let frame = self.player.current_frame()?;
        let scale = layout.config.scale;
        let size = frame.rect.size() * scale;
        let top_left = Vec2::new(
            self.screen_pos.x - size.x * 0.5,
            self.screen_pos.y - (frame.rect.h as f32 - self.shadow_offset) * scale,
        );
        let dissolve = if self.state == UnitState::Dissolving {
            self.dissolve_progress()
        } else {
            0.0
        };
        Some(
            SpriteDraw::new(self.atlas, frame.rect, self.sheet_size, top_left, size)
                .with_flip(self.flip_x)
                .with_alpha(self.opacity)
                .with_dissolve(dissolve, self.dissolve_seed)
                .with_z(self.screen_pos.y),
        )
    }

    /// Ground shadow: the current frame drawn as a darkening silhouette.
    pub fn shadow_sprite(&self, layout: &BoardLayout) -> Option<SpriteDraw> {
        let alpha = self.shadow_opacity * self.opacity;
        if alpha <= 0.0 {
            return None;
        }
        self.sprite(layout).map(|draw| {
            draw.with_alpha(alpha)
                .with_dissolve(0.0, self.dissolve_seed)
                .with_blend(BlendMode::Multiply)
                .with_layer(RenderLayer::Shadows)
        })
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn faction(&self) -> FactionId {
        self.faction
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn board_pos(&self) -> BoardPos {
        self.board_pos
    }

    pub fn screen_pos(&self) -> Vec2 {
        self.screen_pos
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp <= 0 {
            0.0
        } else {
            self.hp as f32 / self.max_hp as f32
        }
    }

    pub fn attack_power(&self) -> i32 {
        self.attack_power
    }

    pub fn attack_range(&self) -> i32 {
        self.attack_range
    }

    pub fn attack_target(&self) -> Option<usize> {
        self.attack.map(|a| a.target)
    }

    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn shadow_opacity(&self) -> f32 {
        self.shadow_opacity
    }

    pub fn dissolve_seed(&self) -> f32 {
        self.dissolve_seed
    }

    /// Dissolve completion, 0.0 to 1.0.
    pub fn dissolve_progress(&self) -> f32 {
        if self.tuning.dissolve_duration <= 0.0 {
            return 1.0;
        }
        (self.dissolve_elapsed / self.tuning.dissolve_duration).min(1.0)
    }

    pub fn player(&self) -> &AnimationPlayer {
        &self.player
    }

    /// Seconds the current move will take, if moving.
    pub fn move_time(&self) -> Option<f32> {
        self.movement.map(|m| m.duration)
    }

    /// Cell this unit is walking to, if it is moving.
    pub fn move_target(&self) -> Option<BoardPos> {
        self.movement.map(|m| m.target)
    }

    /// Finished dissolving; the roster may drop this unit.
    pub fn is_dead(&self) -> bool {
        self.death_complete
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn is_moving(&self) -> bool {
        self.state == UnitState::Moving
    }

    pub fn is_attacking(&self) -> bool {
        self.state == UnitState::Attacking
    }

    /// Only idle units accept orders.
    pub fn can_act(&self) -> bool {
        self.state == UnitState::Idle
    }
}

fn ramp(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        1.0
    } else {
        (elapsed / duration).min(1.0)
    }
}
