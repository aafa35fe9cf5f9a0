//! Time-driven frame selection over a shared [`AnimationSet`].

use std::rc::Rc;

use crate::components::animation::{Animation, AnimationFrame, AnimationSet};

/// Playback state of an [`AnimationPlayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    /// One-shot playback reached its last frame. Never set while looping.
    Finished,
}

/// Plays one animation at a time from a shared atlas.
///
/// The frame is derived from total elapsed time rather than stepped, so large
/// or uneven `dt` values land on the same frame as many small ones.
#[derive(Debug, Clone, Default)]
pub struct AnimationPlayer {
    atlas: Option<Rc<AnimationSet>>,
    current: Option<usize>,
    frame_index: usize,
    elapsed: f32,
    frame_delay: f32,
    looping: bool,
    state: PlaybackState,
}

impl AnimationPlayer {
    pub fn new(atlas: Rc<AnimationSet>) -> Self {
        Self {
            atlas: Some(atlas),
            ..Default::default()
        }
    }

    /// Bind a different atlas. Playback stops.
    pub fn set_atlas(&mut self, atlas: Rc<AnimationSet>) {
        *self = Self::new(atlas);
    }

    pub fn atlas(&self) -> Option<&Rc<AnimationSet>> {
        self.atlas.as_ref()
    }

    /// Start a named animation from frame 0.
    ///
    /// Returns `false` and leaves playback untouched if the atlas has no such
    /// animation.
    pub fn play(&mut self, name: &str, looping: bool) -> bool {
        let Some(atlas) = &self.atlas else {
            return false;
        };
        let Some(idx) = atlas.position(name) else {
            return false;
        };
        let Some(animation) = atlas.at(idx) else {
            return false;
        };
        self.frame_delay = animation.frame_delay();
        self.current = Some(idx);
        self.frame_index = 0;
        self.elapsed = 0.0;
        self.looping = looping;
        self.state = PlaybackState::Playing;
        true
    }

    /// Advance playback by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let count = match self.animation() {
            Some(animation) if !animation.frames.is_empty() => animation.frame_count(),
            _ => return,
        };

        self.elapsed += dt;
        let target = (self.elapsed / self.frame_delay).floor() as usize;
        if self.looping {
            self.frame_index = target % count;
        } else if target >= count {
            self.frame_index = count - 1;
            self.state = PlaybackState::Finished;
        } else {
            self.frame_index = target;
        }
    }

    /// Stop playback on the current frame.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
    }

    /// Override the per-frame delay, e.g. from an FX timing table.
    pub fn set_frame_delay(&mut self, delay: f32) {
        if delay > 0.0 {
            self.frame_delay = delay;
        }
    }

    /// Turn looping playback into one-shot playback of the current cycle so
    /// the last frame holds instead of wrapping.
    pub fn hold_last_frame(&mut self) {
        if !self.looping {
            return;
        }
        self.looping = false;
        let total = self.total_duration();
        if total > 0.0 {
            self.elapsed %= total;
        }
    }

    pub fn animation(&self) -> Option<&Animation> {
        let atlas = self.atlas.as_ref()?;
        atlas.at(self.current?)
    }

    pub fn animation_name(&self) -> Option<&str> {
        self.animation().map(|a| a.name.as_str())
    }

    /// Frame to draw, or `None` when nothing is bound.
    pub fn current_frame(&self) -> Option<&AnimationFrame> {
        self.animation()?.frames.get(self.frame_index)
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn frame_delay(&self) -> f32 {
        self.frame_delay
    }

    /// Length of one pass through the current animation at the active delay.
    pub fn total_duration(&self) -> f32 {
        self.animation()
            .map(|a| a.frame_count() as f32 * self.frame_delay)
            .unwrap_or(0.0)
    }

    /// Normalised position in the current pass, 0.0 to 1.0.
    pub fn progress(&self) -> f32 {
        let total = self.total_duration();
        if total <= 0.0 {
            return 0.0;
        }
        if self.looping {
            (self.elapsed % total) / total
        } else {
            (self.elapsed / total).min(1.0)
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_finished(&self) -> bool {
        self.state == PlaybackState::Finished
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }
}
