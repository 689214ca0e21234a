//! Thora primitive types.
//!
//! # Modules
//!
//! - [`header`]: Block header and its RLP encoding

pub mod header;

pub use header::{Header, EMPTY_OMMER_ROOT_HASH};
