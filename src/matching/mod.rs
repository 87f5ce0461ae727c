//! # Matching Subsystem
//!
//! The filter index and the document-to-room matching engine.

pub mod engine;
pub mod index;

pub use engine::match_document;
pub use index::{FilterIndex, PredicateEntry};
