//! Effect composition lookup.
//!
//! An effect request names a unit, its faction and an effect type such as
//! `UnitSpawnFX`. Compositions are registered under dotted keys at several
//! levels of specificity and the most specific registered key wins.

use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::api::error::Result;
use crate::api::types::FactionId;

/// Played when a unit appears on the board.
pub const UNIT_SPAWN_FX: &str = "UnitSpawnFX";
/// Played on the attacker when it starts an attack.
pub const UNIT_ATTACKED_FX: &str = "UnitAttackedFX";
/// Played on the target after damage lands.
pub const UNIT_DAMAGED_FX: &str = "UnitDamagedFX";
/// Played where a unit was killed.
pub const UNIT_DIED_FX: &str = "UnitDiedFX";

/// Sprites, particles and sounds making up one effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FxComposition {
    #[serde(default)]
    pub fx_type: String,
    #[serde(default)]
    pub parent: String,
    /// Sprite identifiers (RSX names), in draw order.
    #[serde(default)]
    pub sprites: Vec<String>,
    #[serde(default)]
    pub particles: Vec<String>,
    #[serde(default)]
    pub sounds: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TimingEntry {
    #[serde(rename = "frameDelay")]
    frame_delay: Option<f32>,
}

/// Candidate keys for a request, most specific first.
///
/// 1. `FX.Cards.<unit>.<type>` when the unit id is non-empty
/// 2. `Factions.<type>`
/// 3. `Faction<n>.<type>` for playable factions, or `Neutral.<type>` for faction 0
/// 4. `Unknown.<type>`
pub fn candidate_keys(unit_id: &str, faction: FactionId, fx_type: &str) -> Vec<String> {
    let mut keys = Vec::with_capacity(4);
    if !unit_id.is_empty() {
        keys.push(format!("FX.Cards.{}.{}", unit_id, fx_type));
    }
    keys.push(format!("Factions.{}", fx_type));
    if faction.is_playable() {
        keys.push(format!("Faction{}.{}", faction.0, fx_type));
    } else if faction.is_neutral() {
        keys.push(format!("Neutral.{}", fx_type));
    }
    keys.push(format!("Unknown.{}", fx_type));
    keys
}

type ResolutionCache = HashMap<String, HashMap<String, HashMap<FactionId, Option<usize>>>>;

/// Resolves effect requests to compositions and holds FX frame timing.
#[derive(Debug, Clone)]
pub struct FxCompositionResolver {
    compositions: Vec<FxComposition>,
    by_key: HashMap<String, usize>,
    frame_delays: HashMap<String, f32>,
    default_frame_delay: f32,
    /// fx_type -> unit_id -> faction -> resolved composition.
    cache: ResolutionCache,
}

impl FxCompositionResolver {
    pub fn new(default_frame_delay: f32) -> Self {
        Self {
            compositions: Vec::new(),
            by_key: HashMap::new(),
            frame_delays: HashMap::new(),
            default_frame_delay,
            cache: HashMap::new(),
        }
    }

    /// Load from the compositions and timing JSON documents.
    ///
    /// Only dotted top-level keys are compositions; other keys are grouping
    /// metadata and are ignored. Entries that fail to deserialize are skipped
    /// with a warning. A document that is not a JSON object is an error.
    pub fn from_json(compositions: &str, timing: Option<&str>, default_frame_delay: f32) -> Result<Self> {
        let mut resolver = Self::new(default_frame_delay);

        let table: HashMap<String, serde_json::Value> = serde_json::from_str(compositions)?;
        for (key, value) in table {
            if !key.contains('.') {
                continue;
            }
            match serde_json::from_value::<FxComposition>(value) {
                Ok(composition) => resolver.insert(key, composition),
                Err(e) => warn!("skipping FX composition '{}': {}", key, e),
            }
        }

        if let Some(timing) = timing {
            let table: HashMap<String, TimingEntry> = serde_json::from_str(timing)?;
            for (name, entry) in table {
                resolver.set_frame_delay(name, entry.frame_delay.unwrap_or(default_frame_delay));
            }
        }

        info!(
            "loaded {} FX compositions and {} FX timings",
            resolver.compositions.len(),
            resolver.frame_delays.len()
        );
        Ok(resolver)
    }

    /// Register a composition. Clears cached resolutions.
    pub fn insert(&mut self, key: impl Into<String>, composition: FxComposition) {
        let key = key.into();
        match self.by_key.get(&key) {
            Some(&idx) => self.compositions[idx] = composition,
            None => {
                self.by_key.insert(key, self.compositions.len());
                self.compositions.push(composition);
            }
        }
        self.cache.clear();
    }

    pub fn set_frame_delay(&mut self, fx_identifier: impl Into<String>, delay: f32) {
        self.frame_delays.insert(fx_identifier.into(), delay);
    }

    pub fn get(&self, key: &str) -> Option<&FxComposition> {
        self.by_key.get(key).map(|&idx| &self.compositions[idx])
    }

    /// Most specific composition for a request, or `None` if no level matches.
    pub fn resolve(&mut self, unit_id: &str, faction: FactionId, fx_type: &str) -> Option<&FxComposition> {
        let cached = self
            .cache
            .get(fx_type)
            .and_then(|units| units.get(unit_id))
            .and_then(|factions| factions.get(&faction))
            .copied();

        let idx = match cached {
            Some(idx) => idx,
            None => {
                let idx = candidate_keys(unit_id, faction, fx_type)
                    .iter()
                    .find_map(|key| self.by_key.get(key).copied());
                self.cache
                    .entry(fx_type.to_owned())
                    .or_default()
                    .entry(unit_id.to_owned())
                    .or_default()
                    .insert(faction, idx);
                idx
            }
        };
        idx.map(|idx| &self.compositions[idx])
    }

    /// Frame delay for an FX sprite's own animation, keyed by its RSX name.
    pub fn get_frame_delay(&self, fx_identifier: &str) -> f32 {
        self.frame_delays
            .get(fx_identifier)
            .copied()
            .unwrap_or(self.default_frame_delay)
    }

    pub fn len(&self) -> usize {
        self.compositions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compositions.is_empty()
    }

    /// Number of distinct requests resolved so far.
    pub fn cached_requests(&self) -> usize {
        self.cache
            .values()
            .flat_map(|units| units.values())
            .map(|factions| factions.len())
            .sum()
    }
}

impl Default for FxCompositionResolver {
    fn default() -> Self {
        Self::new(crate::api::config::EngineConfig::default().default_frame_delay)
    }
}
