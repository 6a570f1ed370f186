//! Boundary detectors used by the segmentation engine.
//!
//! A detector watches consecutive blocks of one channel and reports the slice
//! boundaries found in them. Positions are counted from the first sample the
//! detector observed.

use consyn_core::{Error, Result};

/// Capability shared by every slicing strategy.
pub trait BoundaryDetector {
    /// Feed the next block of samples. Returns every boundary found so far and
    /// not yet reported, in increasing order. A block may hold any number of
    /// boundaries.
    fn observe(&mut self, samples: &[f32]) -> Vec<usize>;
}

/// Places a boundary at every multiple of a fixed size, however the input
/// is split into blocks.
#[derive(Debug, Clone)]
pub struct RegularDetector {
    size: usize,
    observed: usize,
}

impl RegularDetector {
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            observed: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl BoundaryDetector for RegularDetector {
    fn observe(&mut self, samples: &[f32]) -> Vec<usize> {
        let before = self.observed;
        self.observed += samples.len();

        let first = (before / self.size + 1) * self.size;
        (first..=self.observed).step_by(self.size).collect()
    }
}

/// Regular slicing at a musical interval of a tempo.
#[derive(Debug, Clone)]
pub struct BeatDetector {
    bpm: f64,
    interval: f64,
    inner: RegularDetector,
}

impl BeatDetector {
    /// Create a detector for `bpm` beats per minute, slicing every `interval`
    /// of a bar (`"1/16"`, `"1/4"`, `"0.5"`).
    pub fn new(bpm: f64, interval: &str, samplerate: u32) -> Result<Self> {
        if !(bpm.is_finite() && bpm > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "bpm must be positive, got {}",
                bpm
            )));
        }
        let interval = parse_interval(interval)?;
        let size = window_size(bpm, interval, samplerate);
        if size == 0 {
            return Err(Error::InvalidConfig(format!(
                "beat interval {} at {} bpm is shorter than one sample",
                interval, bpm
            )));
        }

        tracing::debug!(bpm, interval, size, "beat detector window");

        Ok(Self {
            bpm,
            interval,
            inner: RegularDetector::new(size),
        })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Interval as a fraction of a bar.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Slice length in samples.
    pub fn window(&self) -> usize {
        self.inner.size()
    }
}

impl BoundaryDetector for BeatDetector {
    fn observe(&mut self, samples: &[f32]) -> Vec<usize> {
        self.inner.observe(samples)
    }
}

/// Samples per slice for a tempo and a bar fraction, assuming four beats a bar.
pub fn window_size(bpm: f64, interval: f64, samplerate: u32) -> usize {
    let seconds = 60.0 / bpm * 4.0 * interval;
    (seconds * samplerate as f64).round() as usize
}

/// Parse `"a/b"` or a decimal fraction of a bar.
pub fn parse_interval(text: &str) -> Result<f64> {
    let text = text.trim();
    let invalid = || Error::InvalidConfig(format!("invalid beat interval '{}'", text));

    let value = match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().map_err(|_| invalid())?;
            let den: f64 = den.trim().parse().map_err(|_| invalid())?;
            if den == 0.0 {
                return Err(invalid());
            }
            num / den
        }
        None => text.parse().map_err(|_| invalid())?,
    };

    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(invalid())
    }
}
