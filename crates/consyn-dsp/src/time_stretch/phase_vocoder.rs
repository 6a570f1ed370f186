//! Offline phase vocoder.
//!
//! ## Algorithm Overview
//!
//! 1. **Analysis**: two Hann-windowed frames one hop apart are read at the
//!    analysis position, which advances by `hop * factor` per frame
//! 2. **Phase accumulation**: the phase difference between the two frames is
//!    added to a running phase per bin
//! 3. **Synthesis**: the second frame's magnitudes with the running phase are
//!    inverse transformed, windowed and overlap-added at the synthesis
//!    position, which advances by `hop`
//! 4. **Normalization**: the output is rescaled to the input's peak

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use consyn_core::{Error, Result};

/// Phase vocoder with pre-planned transforms.
pub struct PhaseVocoder {
    winsize: usize,
    hop: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    current: Vec<Complex<f32>>,
    next: Vec<Complex<f32>>,
    phase: Vec<f32>,
}

impl PhaseVocoder {
    pub fn new(winsize: usize, overlap: usize) -> Self {
        let winsize = winsize.max(2);
        let hop = (winsize / overlap.max(1)).max(1);
        let mut planner = FftPlanner::new();

        Self {
            winsize,
            hop,
            window: Self::create_hann_window(winsize),
            forward: planner.plan_fft_forward(winsize),
            inverse: planner.plan_fft_inverse(winsize),
            current: vec![Complex::new(0.0, 0.0); winsize],
            next: vec![Complex::new(0.0, 0.0); winsize],
            phase: vec![0.0; winsize],
        }
    }

    /// Create a symmetric Hann window of the specified size
    fn create_hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (size - 1) as f32).cos()))
            .collect()
    }

    pub fn winsize(&self) -> usize {
        self.winsize
    }

    pub fn hop_size(&self) -> usize {
        self.hop
    }

    /// Inputs shorter than this produce no analysis frames.
    pub fn min_input_len(&self) -> usize {
        self.winsize + self.hop + 1
    }

    /// Output length for an input of `len` samples at `factor`.
    pub fn output_len(&self, len: usize, factor: f32) -> usize {
        (len as f64 / factor as f64 + self.winsize as f64) as usize
    }

    /// Change the duration of `input` by `1 / factor` without changing its
    /// pitch. A factor of exactly 1 returns the input unchanged.
    pub fn stretch(&mut self, input: &[f32], factor: f32) -> Result<Vec<f32>> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "stretch factor must be positive, got {}",
                factor
            )));
        }
        if factor == 1.0 {
            return Ok(input.to_vec());
        }

        let duration = input.len();
        let mut output = vec![0.0f32; self.output_len(duration, factor)];
        self.phase.fill(0.0);

        let limit = duration as f64 - (self.winsize + self.hop) as f64;
        let advance = self.hop as f64 * factor as f64;
        let scale = 1.0 / self.winsize as f32;
        let mut synthesis = 0usize;
        let mut analysis = 0.0f64;

        while analysis < limit && synthesis < output.len() {
            let position = analysis as usize;
            load_frame(&mut self.current, &input[position..], &self.window);
            load_frame(&mut self.next, &input[position + self.hop..], &self.window);
            self.forward.process(&mut self.current);
            self.forward.process(&mut self.next);

            for ((phase, current), next) in self
                .phase
                .iter_mut()
                .zip(&self.current)
                .zip(self.next.iter_mut())
            {
                *phase = wrap_phase(*phase + next.arg() - current.arg());
                *next = Complex::from_polar(next.norm(), *phase);
            }

            self.inverse.process(&mut self.next);

            let end = (synthesis + self.winsize).min(output.len());
            for (i, out) in output[synthesis..end].iter_mut().enumerate() {
                *out += self.next[i].re * scale * self.window[i];
            }

            synthesis += self.hop;
            analysis += advance;
        }

        normalize_peak(&mut output, peak(input));
        Ok(output)
    }
}

/// Window the first `dst.len()` samples of `src` into `dst`.
fn load_frame(dst: &mut [Complex<f32>], src: &[f32], window: &[f32]) {
    for ((out, &s), &w) in dst.iter_mut().zip(src).zip(window) {
        *out = Complex::new(s * w, 0.0);
    }
}

/// Wrap phase to [-PI, PI]
#[inline]
fn wrap_phase(phase: f32) -> f32 {
    let mut p = phase;
    while p > PI {
        p -= 2.0 * PI;
    }
    while p < -PI {
        p += 2.0 * PI;
    }
    p
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

/// Rescale so the peak absolute value becomes `target`; silent output is left alone.
fn normalize_peak(samples: &mut [f32], target: f32) {
    let current = peak(samples);
    if current == 0.0 {
        return;
    }
    let gain = target / current;
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}
