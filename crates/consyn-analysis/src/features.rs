//! Feature extraction.
//!
//! [`SpectralExtractor`] frames a unit, computes a set of spectral and
//! temporal descriptors per frame and averages them over the unit, followed
//! by log energies in mel-spaced bands.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use consyn_core::{FeatureVector, DEFAULT_FEATURE_SLOTS};

use crate::onset::create_hann_window;

/// Per-frame descriptors, in slot order.
pub const SPECTRAL_DESCRIPTORS: [&str; 13] = [
    "energy",
    "hfc",
    "centroid",
    "spread",
    "skewness",
    "kurtosis",
    "slope",
    "decrease",
    "rolloff",
    "flatness",
    "flux",
    "zcr",
    "rms",
];

/// Default number of mel bands appended after the descriptors
const DEFAULT_BANDS: usize = 13;

/// Fraction of spectral energy below the rolloff frequency
const ROLLOFF_FRACTION: f32 = 0.95;

/// Turns a unit's samples into a feature vector.
pub trait FeatureExtractor {
    /// Describe `samples`; `None` when there is nothing to describe.
    fn extract(&mut self, samples: &[f32], samplerate: u32) -> Option<FeatureVector>;

    /// Number of slots every returned vector holds.
    fn slot_count(&self) -> usize;
}

/// Spectral descriptor extractor.
pub struct SpectralExtractor {
    winsize: usize,
    hopsize: usize,
    bands: usize,
    max_slots: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl SpectralExtractor {
    pub fn new(winsize: usize, hopsize: usize) -> Self {
        Self::with_bands(winsize, hopsize, DEFAULT_BANDS)
    }

    pub fn with_bands(winsize: usize, hopsize: usize, bands: usize) -> Self {
        let winsize = winsize.max(2).next_power_of_two();
        Self {
            winsize,
            hopsize: hopsize.clamp(1, winsize),
            bands,
            max_slots: DEFAULT_FEATURE_SLOTS.max(SPECTRAL_DESCRIPTORS.len() + bands),
            fft: FftPlanner::new().plan_fft_forward(winsize),
            window: create_hann_window(winsize),
        }
    }

    /// Cap the vectors at `max_slots`; band slots beyond it are dropped.
    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = max_slots;
        self
    }

    pub fn winsize(&self) -> usize {
        self.winsize
    }

    pub fn hopsize(&self) -> usize {
        self.hopsize
    }

    fn labels(&self) -> impl Iterator<Item = String> + '_ {
        SPECTRAL_DESCRIPTORS
            .iter()
            .map(|s| s.to_string())
            .chain((0..self.bands).map(|b| format!("band_{}", b)))
            .take(self.max_slots)
    }

    fn magnitudes(&self, frame: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = frame
            .iter()
            .zip(self.window.iter())
            .map(|(s, w)| Complex::new(s * w, 0.0))
            .collect();
        buffer.resize(self.winsize, Complex::new(0.0, 0.0));
        self.fft.process(&mut buffer);

        buffer[..self.winsize / 2 + 1].iter().map(|c| c.norm()).collect()
    }

    /// Descriptors of one frame followed by its band energies.
    fn describe(&self, frame: &[f32], magnitudes: &[f32], previous: &[f32], samplerate: u32) -> Vec<f32> {
        let bin_hz = samplerate as f32 / self.winsize as f32;
        let power: Vec<f32> = magnitudes.iter().map(|m| m * m).collect();
        let total_mag: f32 = magnitudes.iter().sum();
        let total_power: f32 = power.iter().sum();
        let n = magnitudes.len() as f32;

        let energy = total_power / self.winsize as f32;
        let hfc: f32 = power.iter().enumerate().map(|(k, p)| k as f32 * p).sum();

        let (centroid, spread, skewness, kurtosis) = if total_mag > 0.0 {
            let moment = |order: i32, center: f32| -> f32 {
                magnitudes
                    .iter()
                    .enumerate()
                    .map(|(k, m)| (k as f32 * bin_hz - center).powi(order) * m)
                    .sum::<f32>()
                    / total_mag
            };
            let centroid = moment(1, 0.0);
            let spread = moment(2, centroid).sqrt();
            if spread > 0.0 {
                (
                    centroid,
                    spread,
                    moment(3, centroid) / spread.powi(3),
                    moment(4, centroid) / spread.powi(4),
                )
            } else {
                (centroid, 0.0, 0.0, 0.0)
            }
        } else {
            (0.0, 0.0, 0.0, 0.0)
        };

        let slope = if total_mag > 0.0 {
            let freqs: Vec<f32> = (0..magnitudes.len()).map(|k| k as f32 * bin_hz).collect();
            let sum_f: f32 = freqs.iter().sum();
            let sum_ff: f32 = freqs.iter().map(|f| f * f).sum();
            let sum_fm: f32 = freqs.iter().zip(magnitudes).map(|(f, m)| f * m).sum();
            let denom = n * sum_ff - sum_f * sum_f;
            if denom != 0.0 {
                (n * sum_fm - sum_f * total_mag) / denom / total_mag
            } else {
                0.0
            }
        } else {
            0.0
        };

        let tail: f32 = magnitudes[1..].iter().sum();
        let decrease = if tail > 0.0 {
            magnitudes[1..]
                .iter()
                .enumerate()
                .map(|(i, m)| (m - magnitudes[0]) / (i + 1) as f32)
                .sum::<f32>()
                / tail
        } else {
            0.0
        };

        let rolloff = if total_power > 0.0 {
            let limit = total_power * ROLLOFF_FRACTION;
            let mut cumulative = 0.0;
            let bin = power
                .iter()
                .position(|p| {
                    cumulative += p;
                    cumulative >= limit
                })
                .unwrap_or(power.len() - 1);
            bin as f32 * bin_hz
        } else {
            0.0
        };

        let flatness = if total_power > 0.0 {
            let log_mean = power.iter().map(|p| (p + 1e-10).ln()).sum::<f32>() / n;
            log_mean.exp() / (total_power / n)
        } else {
            0.0
        };

        let flux: f32 = magnitudes
            .iter()
            .zip(previous)
            .map(|(m, p)| (m - p).max(0.0))
            .sum();

        let crossings = frame
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        let zcr = crossings as f32 / frame.len().max(1) as f32;

        let rms = (frame.iter().map(|s| s * s).sum::<f32>() / frame.len().max(1) as f32).sqrt();

        let mut values = vec![
            energy, hfc, centroid, spread, skewness, kurtosis, slope, decrease, rolloff, flatness,
            flux, zcr, rms,
        ];
        values.extend(self.band_energies(&power, samplerate));
        values
    }

    /// Log power in mel-spaced rectangular bands from 0 Hz to Nyquist.
    fn band_energies(&self, power: &[f32], samplerate: u32) -> Vec<f32> {
        if self.bands == 0 {
            return Vec::new();
        }
        let nyquist = samplerate as f32 / 2.0;
        let max_mel = hz_to_mel(nyquist);
        let bins = power.len();

        (0..self.bands)
            .map(|b| {
                let lo = mel_to_hz(max_mel * b as f32 / self.bands as f32);
                let hi = mel_to_hz(max_mel * (b + 1) as f32 / self.bands as f32);
                let lo_bin = ((lo / nyquist) * (bins - 1) as f32).floor() as usize;
                let hi_bin = (((hi / nyquist) * (bins - 1) as f32).ceil() as usize).clamp(lo_bin + 1, bins);
                let sum: f32 = power[lo_bin.min(bins - 1)..hi_bin].iter().sum();
                (sum + 1e-10).log10()
            })
            .collect()
    }
}

impl Default for SpectralExtractor {
    fn default() -> Self {
        Self::new(1024, 512)
    }
}

impl FeatureExtractor for SpectralExtractor {
    fn extract(&mut self, samples: &[f32], samplerate: u32) -> Option<FeatureVector> {
        if samples.is_empty() || samplerate == 0 {
            return None;
        }

        let mut sums = vec![0.0f32; SPECTRAL_DESCRIPTORS.len() + self.bands];
        let mut previous = vec![0.0f32; self.winsize / 2 + 1];
        let mut frames = 0usize;

        // The last frame is zero-padded by `magnitudes`.
        let mut start = 0;
        while start < samples.len() {
            let end = (start + self.winsize).min(samples.len());
            let frame = &samples[start..end];
            let magnitudes = self.magnitudes(frame);

            for (sum, value) in sums.iter_mut().zip(self.describe(frame, &magnitudes, &previous, samplerate)) {
                *sum += if value.is_finite() { value } else { 0.0 };
            }
            previous = magnitudes;
            frames += 1;
            start += self.hopsize;
        }

        let frames = frames as f32;
        let pairs = self.labels().zip(sums.into_iter().map(|s| s / frames));
        FeatureVector::from_pairs(pairs, self.max_slots).ok()
    }

    fn slot_count(&self) -> usize {
        (SPECTRAL_DESCRIPTORS.len() + self.bands).min(self.max_slots)
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}
