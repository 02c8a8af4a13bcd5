//! Bridge playback volume.

use volbridge_common::config::{DEFAULT_INITIAL_VOLUME, DEFAULT_VOLUME_STEPS};

/// A volume key the bridge reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKey {
    Up,
    Down,
    Mute,
}

/// Authoritative bridge volume.
///
/// `level` is the stored level; the level actually applied to playback is
/// [`effective_level`](Self::effective_level), which is 0 while muted.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeState {
    level: f32,
    muted: bool,
    previous_level_before_mute: f32,
    step: f32,
}

impl VolumeState {
    /// Create a volume state at `level` with `steps` key presses between
    /// silence and full volume.
    pub fn new(level: f32, steps: u32) -> Self {
        let level = clamp_level(level);
        Self {
            level,
            muted: false,
            previous_level_before_mute: level,
            step: 1.0 / steps.max(1) as f32,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn previous_level_before_mute(&self) -> f32 {
        self.previous_level_before_mute
    }

    /// Level to apply to the playback path.
    pub fn effective_level(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }

    /// Apply a volume key press.
    pub fn apply(&mut self, key: VolumeKey) {
        match key {
            VolumeKey::Up => self.step_by(self.step),
            VolumeKey::Down => self.step_by(-self.step),
            VolumeKey::Mute => self.toggle_mute(),
        }
    }

    fn step_by(&mut self, delta: f32) {
        if self.muted {
            self.muted = false;
            self.level = self.previous_level_before_mute;
        }
        self.level = clamp_level(self.level + delta);
    }

    /// Toggle between silence and the last non-zero level.
    ///
    /// Muting an already silent bridge does nothing.
    pub fn toggle_mute(&mut self) {
        if self.muted {
            self.muted = false;
            self.level = self.previous_level_before_mute;
        } else if self.level > 0.0 {
            self.previous_level_before_mute = self.level;
            self.muted = true;
        }
    }
}

impl Default for VolumeState {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_VOLUME, DEFAULT_VOLUME_STEPS)
    }
}

fn clamp_level(level: f32) -> f32 {
    if level.is_finite() {
        level.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
