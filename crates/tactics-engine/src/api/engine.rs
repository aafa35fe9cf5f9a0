//! The engine context: every system for one board, advanced together.

use glam::Vec3;
use log::{debug, info};

use crate::api::config::{EngineConfig, RenderConfig};
use crate::api::types::{BoardPos, CombatEvent};
use crate::assets::cache::AssetCache;
use crate::components::sprite::SpriteDraw;
use crate::components::unit::Unit;
use crate::core::board::BoardLayout;
use crate::core::clock::FrameClock;
use crate::core::rng::Rng;
use crate::core::roster::Roster;
use crate::renderer::device::CommandEncoder;
use crate::renderer::frame::{render_frame, FrameInput, FrameSettings, FrameStats, SwapchainTarget};
use crate::renderer::instance::SpriteBuffer;
use crate::renderer::pass_manager::PassManager;
use crate::systems::fx::FxSystem;
use crate::systems::fx_resolver::{
    FxCompositionResolver, UNIT_ATTACKED_FX, UNIT_DAMAGED_FX, UNIT_DIED_FX, UNIT_SPAWN_FX,
};
use crate::systems::lighting::LightingManager;
use crate::systems::render::build_sprite_buffer;

/// Dissolve seeds are drawn from `[0, DISSOLVE_SEED_RANGE)`.
const DISSOLVE_SEED_RANGE: f32 = 100.0;

/// Mutable access to every engine system, passed to game logic.
pub struct EngineContext {
    pub config: EngineConfig,
    pub roster: Roster,
    pub fx: FxSystem,
    pub lighting: LightingManager,
    pub assets: AssetCache,
    layout: BoardLayout,
    clock: FrameClock,
    rng: Rng,
    events: Vec<CombatEvent>,
    sprites: SpriteBuffer,
}

impl EngineContext {
    pub fn new(config: EngineConfig, render: RenderConfig, assets: AssetCache, resolver: FxCompositionResolver) -> Self {
        Self {
            roster: Roster::new(),
            fx: FxSystem::new(resolver),
            lighting: LightingManager::with_capacity(config.max_lights),
            assets,
            layout: BoardLayout::new(render),
            clock: FrameClock::new(config.fixed_dt),
            rng: Rng::new(config.seed),
            events: Vec::new(),
            sprites: SpriteBuffer::new(),
            config,
        }
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Load a unit onto an empty cell and play its spawn effect.
    ///
    /// Returns the unit's roster index, or `None` if the cell is off the
    /// board, occupied or reserved by a walking unit, or the unit's assets
    /// are missing or invalid.
    pub fn spawn_unit(&mut self, unit_id: &str, pos: BoardPos) -> Option<usize> {
        if !pos.is_valid() || self.roster.is_occupied(pos) {
            return None;
        }
        let descriptor = self.assets.unit(unit_id)?;
        let seed = self.rng.next_range(DISSOLVE_SEED_RANGE);
        let mut unit = Unit::load(&descriptor, &self.config, seed)?;
        unit.set_board_position(pos, &self.layout);

        self.fx.spawn_unit_fx(
            &mut self.assets,
            unit_id,
            unit.faction(),
            UNIT_SPAWN_FX,
            unit.screen_pos(),
        );
        let idx = self.roster.spawn(unit);
        debug!("spawned '{}' at ({}, {}) as #{}", unit_id, pos.x, pos.y, idx);
        Some(idx)
    }

    /// Order a unit to walk to an empty cell.
    pub fn move_unit(&mut self, idx: usize, target: BoardPos) -> bool {
        self.roster.start_move(idx, target, &self.layout)
    }

    /// Order an attack and play the attacker's attack effect.
    pub fn attack(&mut self, attacker: usize, target: usize) -> bool {
        if !self.roster.start_attack(attacker, target) {
            return false;
        }
        if let Some(unit) = self.roster.get(attacker) {
            self.fx.spawn_unit_fx(
                &mut self.assets,
                unit.unit_id(),
                unit.faction(),
                UNIT_ATTACKED_FX,
                unit.screen_pos(),
            );
        }
        true
    }

    /// Feed one display frame's delta and run the fixed steps it releases.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        let steps = self.clock.advance(frame_dt);
        let step = self.clock.step();
        for _ in 0..steps {
            self.update(step);
        }
        steps
    }

    /// One simulation step.
    ///
    /// Units advance first. Strikes that came due are then applied as
    /// damage, and only after that are hit and death effects spawned. Effects
    /// and lights advance next, and dead units are removed last.
    pub fn update(&mut self, dt: f32) {
        self.roster.update(dt, &self.layout);

        for (attacker, strike) in self.roster.collect_strikes() {
            let Some(target) = self.roster.get_mut(strike.target) else {
                continue;
            };
            if !target.is_alive() {
                continue;
            }
            let killed = target.take_damage(strike.amount);
            let position = target.screen_pos();
            let unit_id = target.unit_id().to_owned();
            let faction = target.faction();

            self.events.push(CombatEvent::Damaged {
                attacker,
                target: strike.target,
                amount: strike.amount,
                position,
            });
            self.fx
                .spawn_unit_fx(&mut self.assets, &unit_id, faction, UNIT_DAMAGED_FX, position);
            if killed {
                self.events.push(CombatEvent::Killed {
                    target: strike.target,
                    position,
                });
                self.fx
                    .spawn_unit_fx(&mut self.assets, &unit_id, faction, UNIT_DIED_FX, position);
            }
        }

        self.fx.update(dt);
        self.lighting.update(dt);
        self.roster.remove_dead();
    }

    /// Rebuild the board layout for a new viewport. Units that are not
    /// walking snap to their cell's new screen position.
    pub fn resize(&mut self, render: RenderConfig) {
        self.layout = BoardLayout::new(render);
        for unit in self.roster.iter_mut() {
            if !unit.is_moving() {
                unit.set_board_position(unit.board_pos(), &self.layout);
            }
        }
        info!("board layout rebuilt for {}x{}", render.window_w, render.window_h);
    }

    /// Drop every unit, effect and dynamic light.
    pub fn reset(&mut self) {
        self.roster.clear();
        self.fx.clear();
        self.lighting.clear();
        self.events.clear();
        info!("engine reset");
    }

    /// Combat events produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    /// Whether any unit is mid-action or any effect is still playing.
    pub fn is_busy(&self) -> bool {
        self.fx.has_active_fx() || self.roster.iter().any(|u| u.is_moving() || u.is_attacking())
    }

    /// Unit and effect sprites for this frame, unsorted. Units are tinted
    /// by the ambient light; effects draw at full colour.
    pub fn sprite_draws(&self) -> Vec<SpriteDraw> {
        let ambient = self.lighting.ambient().clamp(Vec3::ZERO, Vec3::ONE);
        self.roster
            .iter()
            .filter_map(|u| u.sprite(&self.layout))
            .map(|draw| draw.with_tint(ambient))
            .chain(self.fx.sprites(self.layout.config.scale))
            .collect()
    }

    /// Unit ground shadows, each rendered through its own pass. Opacity is
    /// scaled by the sun's reach and the preset shadow strength at the unit.
    pub fn shadow_draws(&self) -> Vec<SpriteDraw> {
        self.roster
            .iter()
            .filter_map(|u| {
                let strength = self.lighting.shadow_strength(u.screen_pos());
                let draw = u.shadow_sprite(&self.layout)?;
                let alpha = draw.alpha * strength;
                (alpha > 0.0).then(|| draw.with_alpha(alpha))
            })
            .collect()
    }

    /// Unit sprites touched by at least one dynamic light, tinted by the
    /// light reaching the unit on top of ambient.
    pub fn lit_draws(&self) -> Vec<SpriteDraw> {
        self.roster
            .iter()
            .filter_map(|u| {
                let draw = u.sprite(&self.layout)?;
                if self.lighting.lights_in_region(draw.position, draw.size).is_empty() {
                    return None;
                }
                let tint = self.lighting.dynamic_light_at(u.screen_pos());
                (tint.max_element() > 0.0).then(|| draw.with_tint(tint))
            })
            .collect()
    }

    /// Draw the frame through the pass graph.
    pub fn render<E: CommandEncoder + ?Sized>(
        &mut self,
        passes: &mut PassManager,
        encoder: &mut E,
        settings: &FrameSettings,
        swapchain: SwapchainTarget,
    ) -> FrameStats {
        self.lighting.prepare_batch();
        let draws = self.sprite_draws();
        let shadows = self.shadow_draws();
        let lit = self.lit_draws();
        build_sprite_buffer(draws, &mut self.sprites);
        let input = FrameInput {
            sprites: &self.sprites,
            shadows: &shadows,
            lit: &lit,
            lights: self.lighting.batch(),
        };
        render_frame(passes, encoder, input, settings, swapchain)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use glam::Vec2;

    use super::*;
    use crate::components::unit::UnitState;
    use crate::renderer::device::{TextureFormat, TextureId};
    use crate::renderer::frame::FrameStage;
    use crate::renderer::headless::{Command, HeadlessDevice, RecordingEncoder};
    use crate::systems::fx_resolver::FxComposition;
    use crate::systems::lighting::Light;

    const MANIFEST: &str = r#"{
        "units": {
            "f1_general": {
                "spritesheet": "units/f1_general.png", "width": 1000, "height": 500,
                "faction": 1, "hp": 25, "attack": 5,
                "animations": "breathing\t10\t0,0,0,100,100,1,100,0,100,100\nrun\t10\t0,0,100,100,100,1,100,100,100,100\nattack\t10\t0,0,200,100,100,1,100,200,100,100,2,200,200,100,100,3,300,200,100,100,4,400,200,100,100,5,500,200,100,100"
            },
            "f2_tank": {
                "spritesheet": "units/f2_tank.png", "width": 400, "height": 300,
                "faction": 2, "hp": 5, "attack": 1,
                "animations": "idle\t10\t0,0,0,100,100\nhit\t10\t0,0,100,100,100\ndeath\t10\t0,0,200,100,100,1,100,200,100,100,2,200,200,100,100,3,300,200,100,100"
            }
        },
        "fx": {
            "fx_smoke": {
                "spritesheet": "fx/fx_smoke.png", "width": 200, "height": 100,
                "animations": "smoke\t10\t0,0,0,100,100,1,100,0,100,100"
            }
        },
        "rsx": {
            "fxSmoke": { "folder": "fx_smoke", "animation": "smoke" }
        }
    }"#;

    const TIMING: &str = "folder\tcard_id\tattack_damage_delay\nf1_general\t1\t0.4\n";

    fn smoke() -> FxComposition {
        FxComposition {
            sprites: vec!["fxSmoke".into()],
            ..Default::default()
        }
    }

    fn engine() -> EngineContext {
        let assets = AssetCache::from_json(MANIFEST, Some(TIMING)).unwrap();
        let mut resolver = FxCompositionResolver::new(0.1);
        resolver.insert("Factions.UnitSpawnFX", smoke());
        resolver.insert("Unknown.UnitDamagedFX", smoke());
        resolver.insert("Unknown.UnitDiedFX", smoke());
        EngineContext::new(EngineConfig::default(), RenderConfig::default(), assets, resolver)
    }

    /// Step until every unit finished fading in.
    fn settle(ctx: &mut EngineContext) {
        ctx.update(0.5);
    }

    #[test]
    fn spawn_rejects_bad_cells_and_unknown_units() {
        let mut ctx = engine();
        assert!(ctx.spawn_unit("f1_general", BoardPos::new(9, 0)).is_none());
        assert!(ctx.spawn_unit("nobody", BoardPos::new(1, 1)).is_none());
        assert_eq!(ctx.spawn_unit("f1_general", BoardPos::new(1, 1)), Some(0));
        assert!(ctx.spawn_unit("f2_tank", BoardPos::new(1, 1)).is_none());
        assert_eq!(ctx.roster.len(), 1);
        assert_eq!(ctx.fx.len(), 1);
    }

    #[test]
    fn spawn_rejects_a_cell_a_unit_is_walking_to() {
        let mut ctx = engine();
        let idx = ctx.spawn_unit("f1_general", BoardPos::new(0, 0)).unwrap();
        settle(&mut ctx);
        assert!(ctx.move_unit(idx, BoardPos::new(3, 0)));
        assert!(ctx.spawn_unit("f2_tank", BoardPos::new(3, 0)).is_none());
        // The cell it is leaving stays held until it arrives.
        assert!(ctx.spawn_unit("f2_tank", BoardPos::new(0, 0)).is_none());
        assert_eq!(ctx.roster.len(), 1);
    }

    #[test]
    fn move_lands_exactly_on_target() {
        let mut ctx = engine();
        let idx = ctx.spawn_unit("f1_general", BoardPos::new(2, 2)).unwrap();
        assert!(ctx.move_unit(idx, BoardPos::new(4, 2)));

        let unit = ctx.roster.get(idx).unwrap();
        // run is 0.2s per tile: 0.2 * 3 - 0.2 * 0.2.
        let duration = unit.move_time().unwrap();
        assert!((duration - 0.56).abs() < 1e-5);

        ctx.update(duration);
        let unit = ctx.roster.get(idx).unwrap();
        let expected = ctx.layout().board_to_screen_perspective(BoardPos::new(4, 2));
        assert_eq!(unit.board_pos(), BoardPos::new(4, 2));
        assert_eq!(unit.screen_pos(), expected);
        assert_eq!(unit.state(), UnitState::Idle);
        assert!(ctx.roster.has_moved(idx));
    }

    #[test]
    fn lethal_damage_runs_the_death_sequence() {
        let mut ctx = engine();
        let idx = ctx.spawn_unit("f2_tank", BoardPos::new(5, 1)).unwrap();
        settle(&mut ctx);

        let tank = ctx.roster.get_mut(idx).unwrap();
        assert!(tank.take_damage(5));
        assert_eq!(tank.state(), UnitState::Dying);

        // death is 4 frames at 10 fps.
        ctx.update(0.45);
        assert_eq!(ctx.roster.get(idx).map(Unit::state), Some(UnitState::Dissolving));

        ctx.update(0.5);
        assert!(ctx.roster.get(idx).is_some_and(|u| !u.is_dead()));

        ctx.update(0.5);
        assert!(ctx.roster.is_empty());
    }

    #[test]
    fn strike_applies_damage_then_spawns_fx() {
        let mut ctx = engine();
        let general = ctx.spawn_unit("f1_general", BoardPos::new(2, 2)).unwrap();
        let tank = ctx.spawn_unit("f2_tank", BoardPos::new(3, 2)).unwrap();
        settle(&mut ctx);
        ctx.fx.clear();

        assert!(ctx.attack(general, tank));
        assert!(!ctx.attack(general, tank));
        ctx.update(0.35);
        assert!(ctx.drain_events().is_empty());

        ctx.update(0.1);
        let tank_pos = ctx.roster.get(tank).unwrap().screen_pos();
        assert_eq!(
            ctx.drain_events(),
            [
                CombatEvent::Damaged {
                    attacker: general,
                    target: tank,
                    amount: 5,
                    position: tank_pos,
                },
                CombatEvent::Killed {
                    target: tank,
                    position: tank_pos,
                },
            ]
        );
        // Damaged and died compositions both spawned.
        assert_eq!(ctx.fx.len(), 2);
        assert_eq!(ctx.roster.get(tank).map(Unit::hp), Some(0));

        // Strike fires once per attack.
        ctx.update(0.2);
        assert!(ctx.drain_events().is_empty());
    }

    #[test]
    fn dead_units_are_compacted_after_events() {
        let mut ctx = engine();
        let tank = ctx.spawn_unit("f2_tank", BoardPos::new(0, 0)).unwrap();
        let general = ctx.spawn_unit("f1_general", BoardPos::new(1, 0)).unwrap();
        settle(&mut ctx);
        ctx.roster.select(general);

        ctx.roster.get_mut(tank).unwrap().take_damage(99);
        ctx.update(0.45);
        ctx.update(1.0);
        assert_eq!(ctx.roster.len(), 1);
        assert_eq!(ctx.roster.selected(), Some(0));
        assert_eq!(ctx.roster.get(0).map(Unit::unit_id), Some("f1_general"));
    }

    #[test]
    fn advance_runs_fixed_steps() {
        let mut ctx = engine();
        ctx.spawn_unit("f1_general", BoardPos::new(0, 0));
        assert_eq!(ctx.advance(0.04), 2);
        assert_eq!(ctx.clock().frame(), 1);
    }

    #[test]
    fn busy_until_effects_and_actions_finish() {
        let mut ctx = engine();
        ctx.spawn_unit("f1_general", BoardPos::new(0, 0));
        assert!(ctx.is_busy());
        ctx.update(0.3);
        assert!(!ctx.is_busy());
    }

    #[test]
    fn resize_snaps_units_to_the_new_layout() {
        let mut ctx = engine();
        let idx = ctx.spawn_unit("f1_general", BoardPos::new(3, 3)).unwrap();
        let big = RenderConfig::new(1920, 1080).with_scale(1.5);
        ctx.resize(big);
        let expected = BoardLayout::new(big).board_to_screen_perspective(BoardPos::new(3, 3));
        assert_eq!(ctx.roster.get(idx).unwrap().screen_pos(), expected);
    }

    #[test]
    fn reset_clears_everything() {
        let mut ctx = engine();
        ctx.spawn_unit("f1_general", BoardPos::new(0, 0));
        ctx.lighting.add(Light::point(Vec2::ZERO, Vec3::ONE, 1.0));
        ctx.reset();
        assert!(ctx.roster.is_empty());
        assert!(!ctx.fx.has_active_fx());
        assert!(ctx.lighting.is_empty());
    }

    fn swapchain() -> SwapchainTarget {
        SwapchainTarget {
            texture: TextureId(1 << 40),
            width: 1280,
            height: 720,
        }
    }

    /// Render one unit under a single light of `color` placed at its feet.
    fn render_lit(color: Vec3, intensity: f32) -> Vec<Command> {
        let mut ctx = engine();
        let idx = ctx.spawn_unit("f1_general", BoardPos::new(4, 2)).unwrap();
        settle(&mut ctx);
        let pos = ctx.roster.get(idx).unwrap().screen_pos();
        ctx.lighting.add(Light::point(pos, color, intensity));

        let device = Rc::new(HeadlessDevice::new());
        let mut passes = PassManager::new(device, 1280, 720, TextureFormat::Bgra8Unorm).unwrap();
        let mut encoder = RecordingEncoder::new();
        ctx.render(&mut passes, &mut encoder, &FrameSettings::default(), swapchain());
        encoder.commands
    }

    #[test]
    fn light_colour_reaches_the_command_stream() {
        let red = render_lit(Vec3::X, 1.0);
        let blue = render_lit(Vec3::Z, 0.05);
        assert_ne!(red, blue);

        let tints = |commands: &[Command]| -> Vec<[f32; 3]> {
            commands
                .iter()
                .filter_map(|c| match c {
                    Command::Sprites { instances, .. } => Some(instances.iter().map(|i| i.tint)),
                    _ => None,
                })
                .flatten()
                .collect()
        };
        assert!(tints(&red).iter().any(|t| t[0] > 0.6 && t[1] == 0.0 && t[2] == 0.0));
        assert!(tints(&blue)
            .iter()
            .any(|t| t[0] == 0.0 && t[1] == 0.0 && (t[2] - 0.05).abs() < 1e-4));

        // Both frames upload their one light before drawing.
        assert!(matches!(red.first(), Some(Command::Lights { count: 1, .. })));
        assert!(matches!(blue.first(), Some(Command::Lights { count: 1, .. })));
    }

    #[test]
    fn units_are_tinted_by_ambient() {
        let mut ctx = engine();
        ctx.spawn_unit("f1_general", BoardPos::new(1, 1));
        settle(&mut ctx);
        ctx.lighting.set_ambient(Vec3::new(0.2, 0.3, 0.4));
        let draws = ctx.sprite_draws();
        assert_eq!(draws[0].tint, Vec3::new(0.2, 0.3, 0.4));
        // No dynamic light, nothing lit.
        assert!(ctx.lit_draws().is_empty());
    }

    #[test]
    fn shadows_follow_the_time_of_day() {
        let mut ctx = engine();
        let idx = ctx.spawn_unit("f1_general", BoardPos::new(4, 2)).unwrap();
        settle(&mut ctx);
        let unit = ctx.roster.get(idx).unwrap();
        let base = unit.shadow_sprite(ctx.layout()).unwrap().alpha;
        let pos = unit.screen_pos();
        assert!((ctx.shadow_draws()[0].alpha - base).abs() < 1e-6);

        // Night: shadows at 30% strength.
        assert!(ctx.lighting.apply_preset(7, 1280, 720));
        let night = ctx.shadow_draws()[0].alpha;
        assert!((night - base * ctx.lighting.shadow_strength(pos)).abs() < 1e-6);
        assert!((night - base * 0.30).abs() < 1e-2);
    }

    #[test]
    fn renders_units_shadows_and_lights() {
        let mut ctx = engine();
        let idx = ctx.spawn_unit("f1_general", BoardPos::new(4, 2)).unwrap();
        settle(&mut ctx);
        let pos = ctx.roster.get(idx).unwrap().screen_pos();
        ctx.lighting.add(Light::point(pos, Vec3::ONE, 1.0));

        let device = Rc::new(HeadlessDevice::new());
        let mut passes = PassManager::new(device, 1280, 720, TextureFormat::Bgra8Unorm).unwrap();
        let mut encoder = RecordingEncoder::new();
        let stats = ctx.render(&mut passes, &mut encoder, &FrameSettings::default(), swapchain());
        assert_eq!(stats.shadow_passes, 1);
        assert_eq!(stats.light_passes, 1);
        assert_eq!(stats.stages.last(), Some(&FrameStage::Present));
        assert_eq!(ctx.lighting.batch().count(), 1);
    }
}
