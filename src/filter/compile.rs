//! # Filter Compiler
//!
//! Turns a parsed filter expression into a canonical, indexable predicate
//! set. Room ids and predicate keys are Sha256 over the canonical form, so
//! structurally-equal filters and leaves deduplicate globally.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::ast::FilterExpression;
use super::errors::{FilterError, FilterResult};
use crate::config::EngineConfig;
use crate::types::{Document, Namespace, RoomId};

/// Canonical key of one compiled predicate
pub type PredicateKey = String;

/// One compiled leaf condition, shared across rooms when identical.
///
/// `field` is the root segment of the leaf's dot-path, used for index
/// bucketing; it is `None` for namespace-wide predicates (negated leaves and
/// `missing`, whose absence-of-field semantics cannot be decided from a
/// field-value delta alone).
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    /// Deduplication key
    pub key: PredicateKey,
    /// Index bucket, `None` for the namespace-wide bucket
    pub field: Option<String>,
    /// Operator signature (operator name + canonical operand)
    pub signature: String,
    /// Whether the leaf sits under an odd number of negations
    pub negated: bool,
    leaf: FilterExpression,
}

impl CompiledPredicate {
    /// Evaluate the predicate against a document
    pub fn evaluate(&self, doc: &Document<'_>) -> bool {
        self.leaf.evaluate(doc) != self.negated
    }
}

/// A compiled filter: room id, retained AST, and its predicate set
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    /// Deterministic room id for this (namespace, filter) pair
    pub room_id: RoomId,
    /// Namespace the filter is scoped to
    pub namespace: Namespace,
    /// The parsed expression tree, evaluated on candidate documents
    pub filter: Arc<FilterExpression>,
    /// Deduplicated leaf predicates
    pub predicates: Vec<CompiledPredicate>,
}

/// Compile a raw JSON filter for a namespace.
///
/// Fails with a `FilterError` on malformed input; see the module error
/// taxonomy. Succeeding twice on semantically-equal filters yields the same
/// room id.
pub fn compile(
    namespace: &Namespace,
    raw: &serde_json::Value,
    config: &EngineConfig,
) -> FilterResult<CompiledFilter> {
    let filter = FilterExpression::parse(raw, config.max_filter_depth)?;

    let conditions = filter.condition_count();
    if conditions > config.max_conditions {
        return Err(FilterError::TooManyConditions(config.max_conditions));
    }

    let room_id = room_id(namespace, &filter);

    let mut predicates: Vec<CompiledPredicate> = Vec::new();
    collect_predicates(&filter, false, namespace, &mut predicates);
    predicates.sort_by(|a, b| a.key.cmp(&b.key));
    predicates.dedup_by(|a, b| a.key == b.key);

    Ok(CompiledFilter {
        room_id,
        namespace: namespace.clone(),
        filter: Arc::new(filter),
        predicates,
    })
}

/// Deterministic room id: Sha256 over namespace and canonical filter form
pub fn room_id(namespace: &Namespace, filter: &FilterExpression) -> RoomId {
    let mut hasher = Sha256::new();
    hasher.update(namespace.index.as_bytes());
    hasher.update([0]);
    hasher.update(namespace.collection.as_bytes());
    hasher.update([0]);
    hasher.update(filter.canonical().as_bytes());
    hex(&hasher.finalize())
}

fn collect_predicates(
    expr: &FilterExpression,
    negated: bool,
    namespace: &Namespace,
    out: &mut Vec<CompiledPredicate>,
) {
    match expr {
        FilterExpression::And(children) | FilterExpression::Or(children) => {
            for child in children {
                collect_predicates(child, negated, namespace, out);
            }
        }
        FilterExpression::Bool {
            must,
            must_not,
            should,
        } => {
            for child in must.iter().chain(should) {
                collect_predicates(child, negated, namespace, out);
            }
            for child in must_not {
                collect_predicates(child, !negated, namespace, out);
            }
        }
        FilterExpression::Not(child) => {
            collect_predicates(child, !negated, namespace, out);
        }
        leaf => out.push(compile_leaf(leaf, negated, namespace)),
    }
}

fn compile_leaf(
    leaf: &FilterExpression,
    negated: bool,
    namespace: &Namespace,
) -> CompiledPredicate {
    let signature = leaf.canonical();

    let mut hasher = Sha256::new();
    hasher.update(namespace.index.as_bytes());
    hasher.update([0]);
    hasher.update(namespace.collection.as_bytes());
    hasher.update([0]);
    hasher.update(signature.as_bytes());
    hasher.update([0, u8::from(negated)]);
    let key = hex(&hasher.finalize());

    CompiledPredicate {
        key,
        field: bucket_field(leaf, negated),
        signature,
        negated,
        leaf: leaf.clone(),
    }
}

/// Index bucket for a leaf: the root segment of its dot-path, or `None` for
/// namespace-wide predicates.
fn bucket_field(leaf: &FilterExpression, negated: bool) -> Option<String> {
    if negated {
        return None;
    }
    let path = match leaf {
        FilterExpression::Term { field, .. }
        | FilterExpression::Terms { field, .. }
        | FilterExpression::Range { field, .. }
        | FilterExpression::Exists { field }
        | FilterExpression::GeoBoundingBox { field, .. }
        | FilterExpression::GeoDistance { field, .. }
        | FilterExpression::GeoDistanceRange { field, .. }
        | FilterExpression::GeoPolygon { field, .. } => field,
        FilterExpression::Ids { .. } => "_id",
        // Absence cannot be observed from present fields
        FilterExpression::Missing { .. } => return None,
        // Composites never reach compile_leaf
        _ => return None,
    };
    Some(root_segment(path).to_string())
}

fn root_segment(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
