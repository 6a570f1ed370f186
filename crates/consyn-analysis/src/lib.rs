//! # Consyn Analysis
//!
//! Turns a stream of audio blocks into catalogued units and describes them.
//!
//! This crate provides:
//! - **Boundary detection**: onset (spectral flux, HFC, energy, complex domain),
//!   fixed-length and musical-interval detectors behind one trait
//! - **Segmentation**: the per-channel slicing state machine
//! - **Feature extraction**: the extractor capability and a built-in spectral
//!   descriptor extractor
//!
//! All functions operate on raw `&[f32]` sample buffers.
//!
//! ## Example
//!
//! ```rust
//! use consyn_analysis::{SegmentationConfig, Segmenter, SlicerKind};
//! use consyn_core::{AudioBlock, Stage};
//!
//! let config = SegmentationConfig {
//!     slicer: SlicerKind::Regular { size: 256 },
//!     min_slice_size: 0,
//! };
//! let mut segmenter = Segmenter::new(config);
//!
//! let blocks = (0..4).map(|i| Ok(AudioBlock::new(vec![0.0; 128], 0, i * 128, 44100)));
//! let units: Vec<_> = segmenter.transform(blocks).collect::<Result<_, _>>().unwrap();
//! assert_eq!(units.len(), 2);
//! ```

pub mod detector;
pub mod features;
pub mod onset;
pub mod segmentation;

pub use detector::{BeatDetector, BoundaryDetector, RegularDetector};
pub use features::{FeatureExtractor, SpectralExtractor, SPECTRAL_DESCRIPTORS};
pub use onset::{DetectionMethod, OnsetConfig, OnsetDetector};
pub use segmentation::{SegmentationConfig, Segmenter, SliceBuffer, SlicerKind};
