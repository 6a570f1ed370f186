//! # Consyn Catalog
//!
//! Where units and their features live between ingest and synthesis.
//!
//! - [`Catalog`]: storage capability, including the nearest-unit query that
//!   selection pushes down to the store
//! - [`MemoryCatalog`]: in-memory catalog with JSON persistence
//! - [`NearestSelector`] / [`RandomSelector`]: unit selection, run as a
//!   pipeline stage through [`Selection`]
//! - [`cluster`]: k-means over the catalogued feature vectors

pub mod catalog;
pub mod cluster;
pub mod selection;

pub use catalog::{Catalog, MemoryCatalog, UnitFilter};
pub use cluster::{cluster, ClusterConfig, ClusterReport};
pub use selection::{NearestSelector, RandomSelector, Selection, Selector};
