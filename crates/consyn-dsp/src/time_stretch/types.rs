//! Time-stretch parameters.

use serde::{Deserialize, Serialize};

use consyn_core::{Error, Result};

/// Phase-vocoder time-stretch parameters
///
/// ## Range Limits
///
/// - `factor`: 0.25 - 4.0 when set explicitly (quarter speed to 4x speed)
/// - `winsize`: power of two, at least 64
/// - `overlap`: 1 to `winsize`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeStretchParams {
    /// Speed factor (2.0 = half the length, 0.5 = twice the length).
    /// `None` derives it per unit so the output fits the target.
    pub factor: Option<f32>,

    /// Analysis window in samples
    pub winsize: usize,

    /// Windows per window length; the hop is `winsize / overlap`
    pub overlap: usize,
}

impl TimeStretchParams {
    /// Minimum explicit factor (4x longer)
    pub const MIN_STRETCH: f32 = 0.25;
    /// Maximum explicit factor (4x shorter)
    pub const MAX_STRETCH: f32 = 4.0;
    /// Smallest analysis window
    pub const MIN_WINSIZE: usize = 64;

    /// Fit-to-target parameters with a 1024-sample window and 4x overlap.
    pub fn new() -> Self {
        Self {
            factor: None,
            winsize: 1024,
            overlap: 4,
        }
    }

    pub fn factor(mut self, factor: f32) -> Self {
        self.factor = Some(factor.clamp(Self::MIN_STRETCH, Self::MAX_STRETCH));
        self
    }

    pub fn winsize(mut self, winsize: usize) -> Self {
        self.winsize = winsize.max(Self::MIN_WINSIZE).next_power_of_two();
        self.overlap = self.overlap.min(self.winsize);
        self
    }

    pub fn overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap.clamp(1, self.winsize);
        self
    }

    /// Samples between consecutive synthesis frames.
    pub fn hop_size(&self) -> usize {
        (self.winsize / self.overlap.max(1)).max(1)
    }

    /// Whether the output length follows the target unit.
    pub fn fits_target(&self) -> bool {
        self.factor.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(factor) = self.factor {
            if !(factor.is_finite() && factor > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "time stretch factor must be positive, got {}",
                    factor
                )));
            }
        }
        if self.winsize < Self::MIN_WINSIZE {
            return Err(Error::InvalidConfig(format!(
                "time stretch winsize must be >= {}, got {}",
                Self::MIN_WINSIZE,
                self.winsize
            )));
        }
        if self.overlap == 0 || self.overlap > self.winsize {
            return Err(Error::InvalidConfig(format!(
                "time stretch overlap must be in 1..={}, got {}",
                self.winsize, self.overlap
            )));
        }
        Ok(())
    }
}

impl Default for TimeStretchParams {
    fn default() -> Self {
        Self::new()
    }
}
