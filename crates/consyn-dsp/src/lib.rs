//! # Consyn DSP
//!
//! Resynthesis: reshaping a selected unit's samples so they can replace a
//! target unit.
//!
//! - [`DurationClipper`]: pad or truncate to the target length
//! - [`Envelope`]: linear fades against clicks at unit boundaries
//! - [`TimeStretch`]: offline phase vocoder, pitch preserved
//! - [`ResynthesisPipeline`]: ordered stages with a guaranteed exact fit

pub mod clipper;
pub mod envelope;
pub mod pipeline;
pub mod time_stretch;

pub use clipper::DurationClipper;
pub use envelope::{Envelope, DEFAULT_FADE};
pub use pipeline::{LengthEffect, ResynthesisConfig, ResynthesisPipeline, Resynthesizer, StageConfig};
pub use time_stretch::{PhaseVocoder, TimeStretch, TimeStretchParams};
