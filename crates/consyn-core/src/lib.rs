//! Core data model shared by every Consyn subsystem.
//!
//! # Primary API
//!
//! - [`AudioBlock`]: a run of samples from one channel at an absolute position
//! - [`Unit`] / [`MediaFile`]: the catalogued slices of a recording
//! - [`FeatureVector`]: labelled acoustic fingerprint of a unit
//! - [`SynthesisContext`]: a target unit travelling with its replacement samples
//! - [`Stage`]: lazy sequence transform implemented by every pipeline step
//!
//! All sample data is mono `f32` per channel; multi-channel material is carried
//! as interleaved streams of per-channel blocks.

pub mod error;
pub mod features;
pub mod stage;
pub mod types;

pub use error::{Error, Result};
pub use features::{FeatureVector, DEFAULT_FEATURE_SLOTS};
pub use stage::{Chain, Stage};
pub use types::{AudioBlock, MediaFile, MediaFileId, SynthesisContext, Unit, UnitId};
