//! # Consyn Export
//!
//! The end of the synthesis pipeline:
//! - **Assembly**: resynthesized units are written into per-output buffers,
//!   each released once when its last unit arrives
//! - **Sinks**: finished buffers go to WAV files (hound) or memory
//!
//! ## Note
//!
//! This crate is typically not used directly. `ConsynEngine::mosaic` in the
//! `consyn` crate wires assembly and the sink into a complete run.

pub mod assembly;
pub mod error;
pub mod sink;

pub use assembly::{Assembler, CompletedOutput, OutputAssembly};
pub use error::{ExportError, Result};
pub use sink::{BitDepth, MemorySink, SampleSink, WavSink};
