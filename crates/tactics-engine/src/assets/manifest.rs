use std::collections::HashMap;
use serde::{Deserialize, Serialize};

use crate::api::error::Result;

/// Asset manifest describing unit and FX spritesheets.
/// Loaded from a JSON file at runtime; texture upload happens elsewhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetManifest {
    /// Unit spritesheets keyed by folder name (e.g. `f1_general`).
    #[serde(default)]
    pub units: HashMap<String, UnitAsset>,
    /// FX spritesheets keyed by folder name.
    #[serde(default)]
    pub fx: HashMap<String, SheetAsset>,
    /// RSX sprite identifiers: name → FX folder and animation.
    #[serde(default)]
    pub rsx: HashMap<String, RsxEntry>,
}

/// A spritesheet and its animation table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetAsset {
    /// Relative path to the PNG.
    pub spritesheet: String,
    /// Sheet width in pixels.
    pub width: u32,
    /// Sheet height in pixels.
    pub height: u32,
    /// Animation table in the tab-separated line format.
    #[serde(default)]
    pub animations: String,
}

/// A unit type: its sheet plus base stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitAsset {
    #[serde(flatten)]
    pub sheet: SheetAsset,
    #[serde(default)]
    pub faction: u8,
    #[serde(default = "default_hp")]
    pub hp: i32,
    #[serde(default = "default_attack")]
    pub attack: i32,
    #[serde(default = "default_range")]
    pub range: i32,
    /// Transparent padding under the feet, in sheet pixels.
    #[serde(default = "default_shadow_offset")]
    pub shadow_offset: f32,
}

/// Where an RSX sprite identifier lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsxEntry {
    /// Key into [`AssetManifest::fx`].
    pub folder: String,
    /// Animation name inside that sheet.
    pub animation: String,
    /// Composite with additive blending (glows, flashes).
    #[serde(default)]
    pub additive: bool,
}

fn default_hp() -> i32 {
    10
}

fn default_attack() -> i32 {
    2
}

fn default_range() -> i32 {
    1
}

fn default_shadow_offset() -> f32 {
    40.0
}

impl AssetManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
