//! # Filter Compiler
//!
//! Parses filter expressions into a canonical, indexable predicate set.
//!
//! A filter is compiled once per room: the expression tree is parsed,
//! canonicalized (so semantically-equal filters collapse to one room id),
//! and decomposed into deduplicatable leaf predicates that the matching
//! index can bucket by field.

pub mod ast;
pub mod compile;
pub mod errors;
pub mod geo;

pub use ast::{FilterExpression, RangeBounds};
pub use compile::{compile, room_id, CompiledFilter, CompiledPredicate, PredicateKey};
pub use errors::{FilterError, FilterResult};
pub use geo::{BoundingBox, GeoPoint};
