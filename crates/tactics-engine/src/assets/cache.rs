//! Lazily built unit descriptors and FX sprite assets.
//!
//! Spritesheets are parsed on first request and shared through `Rc`, so every
//! unit or effect instance built from the same folder reuses one
//! [`AnimationSet`]. Lookups that miss log a warning and return `None`.

use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec2;
use log::warn;

use crate::api::error::Result;
use crate::api::types::FactionId;
use crate::assets::manifest::{AssetManifest, SheetAsset};
use crate::assets::timing::TimingTable;
use crate::components::animation::AnimationSet;
use crate::components::sprite::{AtlasId, BlendMode};
use crate::components::unit::{UnitDescriptor, UnitStats};

/// A resolved FX sprite: which sheet, which animation, how to blend it.
#[derive(Debug, Clone)]
pub struct FxAsset {
    pub rsx: String,
    pub atlas: AtlasId,
    pub sheet_size: Vec2,
    pub animations: Rc<AnimationSet>,
    pub animation: String,
    pub blend: BlendMode,
}

/// Asset lookup built from an [`AssetManifest`].
pub struct AssetCache {
    manifest: AssetManifest,
    timing: TimingTable,
    atlas_paths: Vec<String>,
    atlas_ids: HashMap<String, AtlasId>,
    sheets: HashMap<String, Rc<AnimationSet>>,
    units: HashMap<String, Rc<UnitDescriptor>>,
    fx: HashMap<String, Rc<FxAsset>>,
}

impl AssetCache {
    pub fn new(manifest: AssetManifest, timing: TimingTable) -> Self {
        Self {
            manifest,
            timing,
            atlas_paths: Vec::new(),
            atlas_ids: HashMap::new(),
            sheets: HashMap::new(),
            units: HashMap::new(),
            fx: HashMap::new(),
        }
    }

    /// Build from the manifest JSON and an optional unit timing table.
    pub fn from_json(manifest: &str, timing: Option<&str>) -> Result<Self> {
        let manifest = AssetManifest::from_json(manifest)?;
        let timing = timing.map(TimingTable::parse).unwrap_or_default();
        Ok(Self::new(manifest, timing))
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn timing(&self) -> &TimingTable {
        &self.timing
    }

    /// Descriptor for a unit folder, built on first request.
    pub fn unit(&mut self, unit_id: &str) -> Option<Rc<UnitDescriptor>> {
        if let Some(desc) = self.units.get(unit_id) {
            return Some(Rc::clone(desc));
        }
        let Some(asset) = self.manifest.units.get(unit_id).cloned() else {
            warn!("unknown unit '{}'", unit_id);
            return None;
        };

        let key = format!("units/{}", unit_id);
        let animations = self.sheet(&key, &asset.sheet);
        let atlas = self.atlas_for(&asset.sheet.spritesheet);
        let desc = UnitDescriptor::new(unit_id, animations)
            .with_faction(FactionId(asset.faction))
            .with_atlas(atlas, sheet_size(&asset.sheet))
            .with_timing(self.timing.get(unit_id))
            .with_stats(UnitStats {
                hp: asset.hp,
                attack: asset.attack,
                range: asset.range,
            });
        let desc = Rc::new(UnitDescriptor {
            shadow_offset: asset.shadow_offset,
            ..desc
        });
        self.units.insert(unit_id.to_owned(), Rc::clone(&desc));
        Some(desc)
    }

    /// FX asset for an RSX sprite identifier, built on first request.
    ///
    /// Falls back to the sheet's first animation when the named one is absent.
    /// A sheet with no animations at all is treated as missing.
    pub fn fx(&mut self, rsx: &str) -> Option<Rc<FxAsset>> {
        if let Some(asset) = self.fx.get(rsx) {
            return Some(Rc::clone(asset));
        }
        let Some(entry) = self.manifest.rsx.get(rsx).cloned() else {
            warn!("unknown FX sprite '{}'", rsx);
            return None;
        };
        let Some(sheet) = self.manifest.fx.get(&entry.folder).cloned() else {
            warn!("FX sprite '{}' names missing folder '{}'", rsx, entry.folder);
            return None;
        };

        let animations = self.sheet(&format!("fx/{}", entry.folder), &sheet);
        let animation = if animations.contains(&entry.animation) {
            entry.animation
        } else if let Some(first) = animations.first() {
            warn!(
                "FX sprite '{}' has no animation '{}', using '{}'",
                rsx, entry.animation, first.name
            );
            first.name.clone()
        } else {
            warn!("FX folder '{}' has no animations", entry.folder);
            return None;
        };

        let asset = Rc::new(FxAsset {
            rsx: rsx.to_owned(),
            atlas: self.atlas_for(&sheet.spritesheet),
            sheet_size: sheet_size(&sheet),
            animations,
            animation,
            blend: if entry.additive {
                BlendMode::Additive
            } else {
                BlendMode::Alpha
            },
        });
        self.fx.insert(rsx.to_owned(), Rc::clone(&asset));
        Some(asset)
    }

    /// Image path for an atlas id handed out by this cache.
    pub fn atlas_path(&self, atlas: AtlasId) -> Option<&str> {
        self.atlas_paths.get(atlas.0 as usize).map(String::as_str)
    }

    /// Every atlas referenced so far, in id order, for texture upload.
    pub fn atlases(&self) -> impl Iterator<Item = (AtlasId, &str)> {
        self.atlas_paths
            .iter()
            .enumerate()
            .map(|(i, path)| (AtlasId(i as u32), path.as_str()))
    }

    /// Drop built assets. The manifest and timing table are kept; atlas ids
    /// stay stable.
    pub fn clear(&mut self) {
        self.sheets.clear();
        self.units.clear();
        self.fx.clear();
    }

    fn sheet(&mut self, key: &str, asset: &SheetAsset) -> Rc<AnimationSet> {
        Rc::clone(
            self.sheets
                .entry(key.to_owned())
                .or_insert_with(|| Rc::new(AnimationSet::parse(&asset.animations))),
        )
    }

    fn atlas_for(&mut self, path: &str) -> AtlasId {
        if let Some(&id) = self.atlas_ids.get(path) {
            return id;
        }
        let id = AtlasId(self.atlas_paths.len() as u32);
        self.atlas_paths.push(path.to_owned());
        self.atlas_ids.insert(path.to_owned(), id);
        id
    }
}

fn sheet_size(sheet: &SheetAsset) -> Vec2 {
    Vec2::new(sheet.width as f32, sheet.height as f32)
}
