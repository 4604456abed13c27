//! Volume control
//!
//! The UI hands over a 0-100 perceptual value; the graph's master gain is
//! that value divided by 100. Mute zeroes the gain but keeps the level.

/// Volume level with mute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volume {
    /// Volume level (0-100)
    level: u8,

    /// Mute state (preserves volume level)
    muted: bool,
}

impl Volume {
    /// Create a volume at `level` (clamped to 100)
    pub fn new(level: u8) -> Self {
        Self {
            level: level.min(100),
            muted: false,
        }
    }

    /// Set volume level (0-100)
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(100);
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn mute(&mut self) {
        self.muted = true;
    }

    pub fn unmute(&mut self) {
        self.muted = false;
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Master gain for this volume (0.0 when muted)
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            f32::from(self.level) / 100.0
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(80)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_clamped() {
        let mut vol = Volume::new(150);
        assert_eq!(vol.level(), 100);
        vol.set_level(250);
        assert_eq!(vol.level(), 100);
    }

    #[test]
    fn gain_is_linear() {
        assert_eq!(Volume::new(0).gain(), 0.0);
        assert_eq!(Volume::new(50).gain(), 0.5);
        assert_eq!(Volume::new(100).gain(), 1.0);
    }

    #[test]
    fn mute_preserves_level() {
        let mut vol = Volume::new(65);
        vol.mute();
        assert_eq!(vol.gain(), 0.0);
        assert_eq!(vol.level(), 65);

        vol.toggle_mute();
        assert!(!vol.is_muted());
        assert_eq!(vol.gain(), 0.65);
    }
}
