//! Card catalog collaborators
//!
//! Implementations of the pipeline's `CardLookup` contract: an HTTP
//! client for a hosted card database and an in-memory catalog loaded
//! from JSON for offline runs and tests.

pub mod http;
pub mod memory;

pub use http::{CatalogConfig, HttpCardCatalog};
pub use memory::MemoryCatalog;
