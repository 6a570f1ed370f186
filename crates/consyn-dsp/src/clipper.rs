//! Duration conforming by zero-padding or truncation.

use consyn_core::{Result, SynthesisContext};

use crate::pipeline::{LengthEffect, Resynthesizer};

/// Fits samples to the target's duration: short input is padded with
/// silence, long input is cut.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationClipper;

impl DurationClipper {
    pub fn new() -> Self {
        Self
    }

    /// Zero-filled buffer of `length` samples holding the front of `samples`.
    pub fn clip(samples: &[f32], length: usize) -> Vec<f32> {
        let mut out = vec![0.0; length];
        let copied = samples.len().min(length);
        out[..copied].copy_from_slice(&samples[..copied]);
        out
    }
}

impl Resynthesizer for DurationClipper {
    fn process(&mut self, mut ctx: SynthesisContext) -> Result<SynthesisContext> {
        if !ctx.fits_target() {
            ctx.samples = Self::clip(&ctx.samples, ctx.target.duration);
        }
        Ok(ctx)
    }

    fn length_effect(&self) -> LengthEffect {
        LengthEffect::Conforms
    }

    fn name(&self) -> &'static str {
        "clip"
    }
}
