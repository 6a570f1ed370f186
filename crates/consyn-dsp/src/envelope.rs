//! Linear fade-in / fade-out.

use consyn_core::{Result, SynthesisContext};

use crate::pipeline::{LengthEffect, Resynthesizer};

/// Fade length used when nothing else is configured.
pub const DEFAULT_FADE: usize = 30;

/// Applies a linear fade at both ends of a unit.
///
/// Each ramp spans `fade` samples, but never more than half the unit, so the
/// ramps cannot overlap. When `fade` covers the whole unit the unit gets a
/// single ramp from 1 down to 0 instead.
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    fade: usize,
}

impl Envelope {
    pub fn new(fade: usize) -> Self {
        Self { fade }
    }

    pub fn fade(&self) -> usize {
        self.fade
    }

    pub fn apply(&self, samples: &mut [f32]) {
        let len = samples.len();
        if len == 0 {
            return;
        }

        if self.fade >= len {
            let last = (len - 1).max(1) as f32;
            for (i, sample) in samples.iter_mut().enumerate() {
                *sample *= 1.0 - i as f32 / last;
            }
            return;
        }

        let n = self.fade.min(len / 2);
        if n == 0 {
            return;
        }
        let n_f = n as f32;
        for (i, sample) in samples[..n].iter_mut().enumerate() {
            *sample *= i as f32 / n_f;
        }
        for (k, sample) in samples[len - n..].iter_mut().enumerate() {
            *sample *= (n - 1 - k) as f32 / n_f;
        }
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(DEFAULT_FADE)
    }
}

impl Resynthesizer for Envelope {
    fn process(&mut self, mut ctx: SynthesisContext) -> Result<SynthesisContext> {
        self.apply(&mut ctx.samples);
        Ok(ctx)
    }

    fn length_effect(&self) -> LengthEffect {
        LengthEffect::Preserves
    }

    fn name(&self) -> &'static str {
        "envelope"
    }
}
