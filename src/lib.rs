//! # Consyn - Concatenative Audio Synthesis
//!
//! Rebuilds a target recording out of short units taken from other recordings.
//!
//! ## Architecture
//!
//! Consyn is an umbrella crate that coordinates:
//! - **consyn-core** - Data model (blocks, units, feature vectors) and the `Stage` trait
//! - **consyn-sampler** - Audio sources, block streaming, bounded open-file cache
//! - **consyn-analysis** - Boundary detection, segmentation, feature extraction
//! - **consyn-catalog** - Unit catalog, nearest/random selection, k-means clustering
//! - **consyn-dsp** - Resynthesis stages (clip, envelope, phase-vocoder time stretch)
//! - **consyn-export** - Output assembly and WAV writing
//!
//! Ingest runs `source -> segmentation -> feature extraction -> catalog`;
//! synthesis runs `target units -> selection -> unit read -> resynthesis ->
//! assembly -> sink`. Every step is a lazy [`Stage`] pulled by the next one.
//!
//! ## Quick Start
//!
//! ```ignore
//! use consyn::prelude::*;
//!
//! let mut engine = ConsynEngine::builder()
//!     .config(ConsynConfig::load("consyn.json")?)
//!     .build()?;
//!
//! let target = engine.ingest("speech.wav")?;
//! let corpus = engine.ingest("strings.wav")?;
//!
//! engine.mosaic(target.id, &[corpus.id], "speech_strings.wav")?;
//! ```

pub use consyn_analysis as analysis;
pub use consyn_catalog as catalog;
pub use consyn_core as core;
pub use consyn_dsp as dsp;
pub use consyn_export as export;
pub use consyn_sampler as sampler;

// Data model
pub use consyn_core::{
    AudioBlock, FeatureVector, MediaFile, MediaFileId, Stage, SynthesisContext, Unit, UnitId,
};

// Segmentation and features
pub use consyn_analysis::{
    BoundaryDetector, DetectionMethod, FeatureExtractor, OnsetConfig, SegmentationConfig,
    Segmenter, SlicerKind, SpectralExtractor,
};

// Catalog and selection
pub use consyn_catalog::{
    Catalog, ClusterConfig, ClusterReport, MemoryCatalog, NearestSelector, RandomSelector,
    Selection, Selector, UnitFilter,
};

// Resynthesis
pub use consyn_dsp::{
    DurationClipper, Envelope, LengthEffect, ResynthesisConfig, ResynthesisPipeline,
    Resynthesizer, StageConfig, TimeStretch, TimeStretchParams,
};

// Sources
pub use consyn_sampler::{AudioSource, FrameReader, MemorySource, SourceCache, WavSource};

// Output
pub use consyn_export::{
    Assembler, BitDepth, CompletedOutput, ExportError, MemorySink, SampleSink, WavSink,
};

mod builder;
mod config;
mod engine;
mod error;
mod loader;

pub use builder::ConsynEngineBuilder;
pub use config::{ConsynConfig, SelectionMode};
pub use engine::ConsynEngine;
pub use error::{Error, Result};
pub use loader::UnitLoader;

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{ConsynConfig, ConsynEngine, ConsynEngineBuilder, SelectionMode};

    // Essential types
    pub use crate::core::{FeatureVector, MediaFile, MediaFileId, Stage, Unit, UnitId};

    // Configuration
    pub use crate::analysis::{SegmentationConfig, SlicerKind};
    pub use crate::dsp::{ResynthesisConfig, StageConfig, TimeStretchParams};

    // Catalog and output
    pub use crate::catalog::{Catalog, MemoryCatalog, UnitFilter};
    pub use crate::export::{BitDepth, WavSink};

    pub use crate::{Error, Result};
}
