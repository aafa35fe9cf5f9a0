//! Frame tables for sprite animations.
//!
//! An [`AnimationSet`] is parsed once per spritesheet and shared behind an
//! `Rc` by every unit or FX instance that draws from it.

use std::collections::HashMap;

use log::{info, warn};

use crate::api::types::FrameRect;

/// One frame of an animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    /// Sequence index from the source data.
    pub index: u32,
    /// Source rectangle in the spritesheet.
    pub rect: FrameRect,
}

/// A named, immutable frame sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    /// Playback rate in frames per second.
    pub fps: f32,
    pub frames: Vec<AnimationFrame>,
}

impl Animation {
    pub fn new(name: impl Into<String>, fps: f32, frames: Vec<AnimationFrame>) -> Self {
        Self {
            name: name.into(),
            fps,
            frames,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Seconds per frame at the authored rate.
    pub fn frame_delay(&self) -> f32 {
        1.0 / self.fps
    }

    /// `frame_count / fps`.
    pub fn duration(&self) -> f32 {
        self.frames.len() as f32 / self.fps
    }
}

/// Every animation cut from one spritesheet, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationSet {
    animations: Vec<Animation>,
    by_name: HashMap<String, usize>,
}

impl AnimationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an animation, replacing any previous one with the same name.
    pub fn insert(&mut self, animation: Animation) {
        match self.by_name.get(&animation.name) {
            Some(&idx) => self.animations[idx] = animation,
            None => {
                self.by_name.insert(animation.name.clone(), self.animations.len());
                self.animations.push(animation);
            }
        }
    }

    pub fn with(mut self, animation: Animation) -> Self {
        self.insert(animation);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Animation> {
        self.by_name.get(name).map(|&idx| &self.animations[idx])
    }

    /// Position of a named animation, stable for the life of the set.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn at(&self, idx: usize) -> Option<&Animation> {
        self.animations.get(idx)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// First animation in source order; FX sheets usually hold exactly one.
    pub fn first(&self) -> Option<&Animation> {
        self.animations.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Animation> {
        self.animations.iter()
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// Parse the line format `name<TAB>fps<TAB>idx,x,y,w,h,...`.
    ///
    /// Malformed lines are skipped with a warning; parsing continues.
    pub fn parse(source: &str) -> Self {
        let mut set = Self::new();
        for (line_no, line) in source.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok(animation) => set.insert(animation),
                Err(reason) => warn!("animation line {}: {}", line_no + 1, reason),
            }
        }
        info!("loaded {} animations", set.len());
        set
    }
}

fn parse_line(line: &str) -> Result<Animation, String> {
    let mut fields = line.splitn(3, '\t');
    let name = fields.next().unwrap_or_default();
    let (Some(fps), Some(frame_data)) = (fields.next(), fields.next()) else {
        return Err(format!("'{}' is missing tab-separated fields", name));
    };
    let fps: f32 = fps
        .trim()
        .parse()
        .map_err(|_| format!("'{}' has unparseable fps '{}'", name, fps))?;
    if !(fps > 0.0) {
        return Err(format!("'{}' has non-positive fps {}", name, fps));
    }

    let values = frame_data
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("'{}' has an unparseable frame value: {}", name, e))?;
    if values.len() % 5 != 0 {
        return Err(format!(
            "'{}' frame data is not divisible by 5 (got {} values)",
            name,
            values.len()
        ));
    }

    let frames = values
        .chunks_exact(5)
        .map(|v| AnimationFrame {
            index: v[0],
            rect: FrameRect::new(v[1], v[2], v[3], v[4]),
        })
        .collect();
    Ok(Animation::new(name, fps, frames))
}
