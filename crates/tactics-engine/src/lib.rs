pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod renderer;
pub mod assets;

// Re-export key types at crate root for convenience
pub use api::config::{EngineConfig, RenderConfig};
pub use api::engine::EngineContext;
pub use api::error::{EngineError, Result};
pub use api::types::{BoardPos, CombatEvent, FactionId, FrameRect};
pub use assets::cache::{AssetCache, FxAsset};
pub use assets::manifest::AssetManifest;
pub use assets::timing::TimingTable;
pub use components::animation::{Animation, AnimationFrame, AnimationSet};
pub use components::layer::RenderLayer;
pub use components::player::{AnimationPlayer, PlaybackState};
pub use components::sprite::{AtlasId, BlendMode, SpriteDraw};
pub use components::unit::{Unit, UnitDescriptor, UnitState};
pub use core::board::BoardLayout;
pub use core::clock::FrameClock;
pub use core::perspective::PerspectiveConfig;
pub use core::roster::Roster;
pub use renderer::instance::{SpriteBuffer, SpriteInstance};
pub use renderer::pass_manager::{PassManager, PassType};
pub use systems::fx::{FxSprite, FxSystem};
pub use systems::fx_resolver::{FxComposition, FxCompositionResolver};
pub use systems::lighting::{Light, LightType, LightingManager, LIGHTING_PRESETS};
