//! # Consyn Sampler
//!
//! Reads audio for the synthesis pipeline.
//!
//! - [`AudioSource`]: random-access multichannel reader, with a WAV
//!   implementation ([`WavSource`]) and an in-memory one ([`MemorySource`])
//! - [`FrameReader`]: streams a source as fixed-size per-channel blocks
//! - [`SourceCache`]: bounded least-recently-used pool of open sources
//! - [`read_unit`]: fetches the samples of one catalogued unit

pub mod cache;
pub mod reader;
pub mod source;

pub use cache::{CacheStats, SourceCache, DEFAULT_MAX_OPEN_FILES};
pub use reader::{read_unit, FrameReader};
pub use source::{AudioSource, MemorySource, WavSource};
