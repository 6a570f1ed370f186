//! Time-stretching of selected units.
//!
//! Changes a unit's duration without changing its pitch, using an offline
//! phase vocoder.
//!
//! # Example
//!
//! ```rust
//! use consyn_dsp::PhaseVocoder;
//!
//! let input: Vec<f32> = (0..8192).map(|i| (i as f32 * 0.05).sin()).collect();
//! let mut vocoder = PhaseVocoder::new(1024, 4);
//!
//! // Twice as fast: about half the length, same pitch
//! let output = vocoder.stretch(&input, 2.0).unwrap();
//! assert!(output.len() < input.len());
//! ```

mod phase_vocoder;
mod types;

pub use phase_vocoder::PhaseVocoder;
pub use types::TimeStretchParams;

use consyn_core::{Result, SynthesisContext};

use crate::pipeline::{LengthEffect, Resynthesizer};

/// Resynthesis stage wrapping [`PhaseVocoder`].
///
/// Without an explicit factor the factor is `selected / target` duration, so
/// the stretched unit matches the target slot; the vocoder's window of slack
/// is then cut or padded to the exact length.
pub struct TimeStretch {
    params: TimeStretchParams,
    vocoder: PhaseVocoder,
}

impl TimeStretch {
    pub fn new(params: TimeStretchParams) -> Self {
        Self {
            vocoder: PhaseVocoder::new(params.winsize, params.overlap),
            params,
        }
    }

    pub fn params(&self) -> &TimeStretchParams {
        &self.params
    }
}

impl Default for TimeStretch {
    fn default() -> Self {
        Self::new(TimeStretchParams::default())
    }
}

impl Resynthesizer for TimeStretch {
    fn process(&mut self, mut ctx: SynthesisContext) -> Result<SynthesisContext> {
        let target = ctx.target.duration;

        let factor = match self.params.factor {
            Some(factor) => factor,
            None if ctx.fits_target() => return Ok(ctx),
            None if ctx.samples.is_empty() || target == 0 => {
                ctx.samples.resize(target, 0.0);
                return Ok(ctx);
            }
            None => ctx.samples.len() as f32 / target as f32,
        };

        if ctx.samples.len() < self.vocoder.min_input_len() {
            tracing::trace!(
                unit = %ctx.selected.id,
                len = ctx.samples.len(),
                "unit too short to stretch"
            );
        } else {
            ctx.samples = self.vocoder.stretch(&ctx.samples, factor)?;
        }

        if self.params.fits_target() {
            ctx.samples.resize(target, 0.0);
        }
        Ok(ctx)
    }

    fn length_effect(&self) -> LengthEffect {
        if self.params.fits_target() {
            LengthEffect::Conforms
        } else {
            LengthEffect::Changes
        }
    }

    fn name(&self) -> &'static str {
        "time_stretch"
    }
}
