//! Core pipeline for cardsnap
//!
//! This crate provides the data structures and processing logic for
//! turning a photographed trading card into a ranked list of catalog
//! candidates: capture -> preprocess -> extract -> normalize -> match.

pub mod capture;
pub mod coordinator;
pub mod error;
pub mod extract;
pub mod lookup;
pub mod matcher;
pub mod normalize;
pub mod ocr;
pub mod preprocess;
pub mod types;

pub use error::{LookupError, ScanError};
pub use types::*;
