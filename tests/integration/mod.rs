//! Integration test modules for Consyn
//!
//! - ingest: recordings into catalogued units
//! - synthesis: target units back into audio
//! - clustering: k-means over ingested material

pub mod clustering;
pub mod ingest;
pub mod synthesis;
