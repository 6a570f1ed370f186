//! Streaming onset detection.
//!
//! Frames of `winsize` samples are taken every `hopsize` samples across the
//! observed stream, reduced to one detection value each, and peak-picked
//! against an adaptive threshold computed over the recent past. A peak is
//! confirmed one frame late (it must exceed the frame after it), so a
//! reported onset always lies inside samples already observed.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use consyn_core::{Error, Result};

use crate::detector::BoundaryDetector;

/// Number of past detection values used for the adaptive threshold
const HISTORY_LEN: usize = 16;

/// Onset detection function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Spectral flux (default, good for most audio)
    #[default]
    SpectralFlux,
    /// High-frequency content (good for percussive material)
    HighFrequencyContent,
    /// Energy-based (simple, fast)
    Energy,
    /// Complex domain (magnitude and phase deviation)
    ComplexDomain,
}

/// Settings for [`OnsetDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetConfig {
    /// Analysis window in samples (rounded up to a power of two)
    pub winsize: usize,
    /// Samples between analysis frames
    pub hopsize: usize,
    /// Peak-picking threshold (0.0 - 1.0, higher = fewer onsets)
    pub threshold: f32,
    /// Frames quieter than this level never carry an onset
    pub silence_db: f32,
    /// Minimum gap between two onsets in milliseconds
    pub min_gap_ms: f32,
    pub method: DetectionMethod,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            winsize: 1024,
            hopsize: 512,
            threshold: 0.3,
            silence_db: -90.0,
            min_gap_ms: 50.0,
            method: DetectionMethod::SpectralFlux,
        }
    }
}

impl OnsetConfig {
    pub fn validate(&self) -> Result<()> {
        if self.winsize == 0 {
            return Err(Error::InvalidConfig("onset winsize must be > 0".into()));
        }
        if self.hopsize == 0 || self.hopsize > self.winsize {
            return Err(Error::InvalidConfig(format!(
                "onset hopsize must be in 1..={}, got {}",
                self.winsize, self.hopsize
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::InvalidConfig(format!(
                "onset threshold must be within 0.0 - 1.0, got {}",
                self.threshold
            )));
        }
        if self.min_gap_ms < 0.0 {
            return Err(Error::InvalidConfig("onset min_gap_ms must be >= 0".into()));
        }
        Ok(())
    }
}

/// Previous frame, kept until the next one confirms or rejects it as a peak.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    position: usize,
    value: f32,
    audible: bool,
}

/// Onset detector fed block by block.
pub struct OnsetDetector {
    sample_rate: u32,
    fft_size: usize,
    hop_size: usize,
    threshold: f32,
    silence_db: f32,
    min_gap: usize,
    method: DetectionMethod,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    prev_magnitudes: Vec<f32>,
    prev_phases: Vec<f32>,
    prev_prev_phases: Vec<f32>,
    /// Samples not yet consumed by a full frame; `pending[0]` sits at `frame_position`
    pending: Vec<f32>,
    frame_position: usize,
    history: VecDeque<f32>,
    before_candidate: f32,
    candidate: Option<Candidate>,
    last_onset: Option<usize>,
}

impl OnsetDetector {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_config(sample_rate, &OnsetConfig::default())
    }

    /// Create from validated settings.
    pub fn with_config(sample_rate: u32, config: &OnsetConfig) -> Self {
        let fft_size = config.winsize.max(2).next_power_of_two();
        let hop_size = config.hopsize.clamp(1, fft_size);
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let bins = fft_size / 2;

        Self {
            sample_rate,
            fft_size,
            hop_size,
            threshold: config.threshold.clamp(0.0, 1.0),
            silence_db: config.silence_db,
            min_gap: (config.min_gap_ms.max(0.0) / 1000.0 * sample_rate as f32) as usize,
            method: config.method,
            fft,
            window: create_hann_window(fft_size),
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            prev_magnitudes: vec![0.0; bins],
            prev_phases: vec![0.0; bins],
            prev_prev_phases: vec![0.0; bins],
            pending: Vec::with_capacity(fft_size * 2),
            frame_position: 0,
            history: VecDeque::with_capacity(HISTORY_LEN),
            before_candidate: 0.0,
            candidate: None,
            last_onset: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn method(&self) -> DetectionMethod {
        self.method
    }

    /// Forget everything observed so far.
    pub fn reset(&mut self) {
        self.prev_magnitudes.fill(0.0);
        self.prev_phases.fill(0.0);
        self.prev_prev_phases.fill(0.0);
        self.pending.clear();
        self.frame_position = 0;
        self.history.clear();
        self.before_candidate = 0.0;
        self.candidate = None;
        self.last_onset = None;
    }

    /// Most recent onset, if any.
    pub fn last_onset(&self) -> Option<usize> {
        self.last_onset
    }

    /// Run every complete frame currently buffered. Returns the onsets
    /// confirmed along the way.
    fn process_frames(&mut self) -> Vec<usize> {
        let mut found = Vec::new();

        while self.pending.len() >= self.fft_size {
            let position = self.frame_position;
            let value = self.detection_value();
            let audible = level_db(&self.pending[..self.fft_size]) > self.silence_db;

            if let Some(onset) = self.pick_peak(value) {
                found.push(onset);
            }
            self.candidate = Some(Candidate {
                position,
                value,
                audible,
            });

            self.pending.drain(..self.hop_size);
            self.frame_position += self.hop_size;
        }

        found
    }

    /// Decide whether the held candidate is an onset, given the frame after it.
    fn pick_peak(&mut self, next_value: f32) -> Option<usize> {
        let candidate = self.candidate?;
        let threshold = self.adaptive_threshold();

        let is_peak = candidate.audible
            && candidate.value > self.before_candidate
            && candidate.value > next_value
            && candidate.value > threshold;

        let spaced = match self.last_onset {
            Some(last) => candidate.position >= last + self.min_gap,
            None => true,
        };

        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(candidate.value);
        self.before_candidate = candidate.value;

        if is_peak && spaced {
            tracing::trace!(
                position = candidate.position,
                value = candidate.value,
                threshold,
                "onset"
            );
            self.last_onset = Some(candidate.position);
            Some(candidate.position)
        } else {
            None
        }
    }

    /// `mean + std * threshold * 3` over the recent detection values.
    fn adaptive_threshold(&self) -> f32 {
        if self.history.is_empty() {
            return 0.0;
        }
        let len = self.history.len() as f32;
        let (sum, sum_sq) = self
            .history
            .iter()
            .fold((0.0f32, 0.0f32), |(s, sq), &v| (s + v, sq + v * v));
        let mean = sum / len;
        let variance = (sum_sq / len - mean * mean).max(0.0);
        mean + variance.sqrt() * self.threshold * 3.0
    }

    fn detection_value(&mut self) -> f32 {
        match self.method {
            DetectionMethod::Energy => {
                let energy: f32 = self.pending[..self.fft_size].iter().map(|s| s * s).sum();
                energy.sqrt()
            }
            DetectionMethod::SpectralFlux => {
                self.analyze_frame();
                let bins = self.fft_size / 2;
                let mut flux = 0.0;
                for i in 0..bins {
                    let mag = self.scratch[i].norm();
                    let diff = mag - self.prev_magnitudes[i];
                    if diff > 0.0 {
                        flux += diff;
                    }
                    self.prev_magnitudes[i] = mag;
                }
                flux
            }
            DetectionMethod::HighFrequencyContent => {
                self.analyze_frame();
                let hfc: f32 = self.scratch[..self.fft_size / 2]
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (i + 1) as f32 * c.norm_sqr())
                    .sum();
                hfc.sqrt()
            }
            DetectionMethod::ComplexDomain => {
                self.analyze_frame();
                let bins = self.fft_size / 2;
                let mut deviation = 0.0;
                for i in 0..bins {
                    let current = self.scratch[i];
                    let predicted_phase = 2.0 * self.prev_phases[i] - self.prev_prev_phases[i];
                    let predicted = Complex::from_polar(self.prev_magnitudes[i], predicted_phase);
                    deviation += (current - predicted).norm();

                    self.prev_prev_phases[i] = self.prev_phases[i];
                    self.prev_phases[i] = current.arg();
                    self.prev_magnitudes[i] = current.norm();
                }
                deviation
            }
        }
    }

    /// Window the head of `pending` into `scratch` and transform it in place.
    fn analyze_frame(&mut self) {
        for ((out, &s), &w) in self
            .scratch
            .iter_mut()
            .zip(&self.pending[..self.fft_size])
            .zip(&self.window)
        {
            *out = Complex::new(s * w, 0.0);
        }
        self.fft.process(&mut self.scratch);
    }
}

impl BoundaryDetector for OnsetDetector {
    fn observe(&mut self, samples: &[f32]) -> Vec<usize> {
        self.pending.extend_from_slice(samples);
        self.process_frames()
    }
}

/// Create Hann window
pub(crate) fn create_hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            let angle = 2.0 * PI * i as f32 / (size - 1) as f32;
            0.5 * (1.0 - angle.cos())
        })
        .collect()
}

/// RMS level of a frame in dB (negative infinity for digital silence).
fn level_db(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return f32::NEG_INFINITY;
    }
    let mean_square = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
    10.0 * mean_square.log10()
}
