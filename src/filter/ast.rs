//! # Filter Expression AST
//!
//! Parses JSON filter literals into an immutable expression tree, produces
//! the canonical form used for room-id hashing, and evaluates expressions
//! against documents.
//!
//! Canonicalization sorts the children of commutative composites (`and`,
//! `or`, `bool` clause lists) so that semantically-equal filters written in
//! any order collapse to the same canonical form.

use serde_json::Value;

use super::errors::{FilterError, FilterResult};
use super::geo::{parse_distance, point_in_polygon, BoundingBox, GeoPoint};
use crate::types::Document;

/// Numeric bounds of a `range` filter. `gte`/`lte` inclusive, `gt`/`lt`
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangeBounds {
    /// Greater-than-or-equal bound
    pub gte: Option<f64>,
    /// Greater-than bound
    pub gt: Option<f64>,
    /// Less-than-or-equal bound
    pub lte: Option<f64>,
    /// Less-than bound
    pub lt: Option<f64>,
}

impl RangeBounds {
    /// Whether a numeric value satisfies every present bound
    pub fn contains(&self, value: f64) -> bool {
        if let Some(b) = self.gte {
            if value < b {
                return false;
            }
        }
        if let Some(b) = self.gt {
            if value <= b {
                return false;
            }
        }
        if let Some(b) = self.lte {
            if value > b {
                return false;
            }
        }
        if let Some(b) = self.lt {
            if value >= b {
                return false;
            }
        }
        true
    }
}

/// One node of a filter expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    /// Field equals value
    Term { field: String, value: Value },
    /// Field equals one of the values
    Terms { field: String, values: Vec<Value> },
    /// Numeric field within bounds
    Range { field: String, bounds: RangeBounds },
    /// Field is present and non-null
    Exists { field: String },
    /// Field is absent or null
    Missing { field: String },
    /// Geo point inside a lat/lon box
    GeoBoundingBox { field: String, bbox: BoundingBox },
    /// Geo point within a distance of a center
    GeoDistance {
        field: String,
        point: GeoPoint,
        distance_m: f64,
    },
    /// Geo point within a distance band around a center
    GeoDistanceRange {
        field: String,
        point: GeoPoint,
        from_m: f64,
        to_m: f64,
    },
    /// Geo point inside a polygon
    GeoPolygon { field: String, points: Vec<GeoPoint> },
    /// Document id is one of the values
    Ids { values: Vec<Value> },
    /// Boolean combination of clauses
    Bool {
        must: Vec<FilterExpression>,
        must_not: Vec<FilterExpression>,
        should: Vec<FilterExpression>,
    },
    /// All children match
    And(Vec<FilterExpression>),
    /// Any child matches
    Or(Vec<FilterExpression>),
    /// Child does not match
    Not(Box<FilterExpression>),
}

impl FilterExpression {
    /// Parse a JSON filter literal into an expression tree.
    ///
    /// An object with several operator keys is an implicit `and` over them.
    pub fn parse(value: &Value, max_depth: usize) -> FilterResult<Self> {
        Self::parse_node(value, 0, max_depth)
    }

    fn parse_node(value: &Value, depth: usize, max_depth: usize) -> FilterResult<Self> {
        if depth >= max_depth {
            return Err(FilterError::TooDeep(max_depth));
        }

        let obj = match value {
            Value::Object(obj) => obj,
            _ => return Err(FilterError::Empty),
        };
        if obj.is_empty() {
            return Err(FilterError::Empty);
        }

        if obj.len() > 1 {
            let children = obj
                .iter()
                .map(|(key, operand)| Self::parse_operator(key, operand, depth, max_depth))
                .collect::<FilterResult<Vec<_>>>()?;
            return Ok(FilterExpression::And(children));
        }

        let (key, operand) = obj.iter().next().expect("checked non-empty");
        Self::parse_operator(key, operand, depth, max_depth)
    }

    fn parse_operator(
        key: &str,
        operand: &Value,
        depth: usize,
        max_depth: usize,
    ) -> FilterResult<Self> {
        match key {
            "term" => {
                let (field, value) = single_pair("term", operand)?;
                Ok(FilterExpression::Term {
                    field,
                    value: value.clone(),
                })
            }
            "terms" => {
                let (field, value) = single_pair("terms", operand)?;
                let values = value
                    .as_array()
                    .ok_or(FilterError::NotAnArray("terms"))?
                    .clone();
                Ok(FilterExpression::Terms { field, values })
            }
            "range" => {
                let (field, value) = single_pair("range", operand)?;
                Ok(FilterExpression::Range {
                    field,
                    bounds: parse_bounds(value)?,
                })
            }
            "exists" => Ok(FilterExpression::Exists {
                field: field_name("exists", operand)?,
            }),
            "missing" => Ok(FilterExpression::Missing {
                field: field_name("missing", operand)?,
            }),
            "ids" => {
                let obj = operand.as_object().ok_or(FilterError::Malformed {
                    operator: "ids",
                    reason: "expected an object with a values array".to_string(),
                })?;
                let values = obj
                    .get("values")
                    .ok_or(FilterError::MissingAttribute {
                        operator: "ids",
                        attribute: "values",
                    })?
                    .as_array()
                    .ok_or(FilterError::NotAnArray("ids"))?
                    .clone();
                Ok(FilterExpression::Ids { values })
            }
            "geoBoundingBox" => {
                let (field, value) = single_pair("geoBoundingBox", operand)?;
                Ok(FilterExpression::GeoBoundingBox {
                    field,
                    bbox: parse_bbox(value)?,
                })
            }
            "geoDistance" => {
                let (field, point, extras) =
                    geo_operand("geoDistance", operand, &["distance"])?;
                let distance_m = parse_distance(extras[0])?;
                Ok(FilterExpression::GeoDistance {
                    field,
                    point,
                    distance_m,
                })
            }
            "geoDistanceRange" => {
                let (field, point, extras) =
                    geo_operand("geoDistanceRange", operand, &["from", "to"])?;
                let from_m = parse_distance(extras[0])?;
                let to_m = parse_distance(extras[1])?;
                if from_m > to_m {
                    return Err(FilterError::InvalidDistance(format!(
                        "from {from_m} beyond to {to_m}"
                    )));
                }
                Ok(FilterExpression::GeoDistanceRange {
                    field,
                    point,
                    from_m,
                    to_m,
                })
            }
            "geoPolygon" => {
                let (field, value) = single_pair("geoPolygon", operand)?;
                let raw_points = match value {
                    Value::Array(items) => items,
                    Value::Object(obj) => obj
                        .get("points")
                        .and_then(Value::as_array)
                        .ok_or(FilterError::MissingAttribute {
                            operator: "geoPolygon",
                            attribute: "points",
                        })?,
                    _ => {
                        return Err(FilterError::Malformed {
                            operator: "geoPolygon",
                            reason: "expected a points array".to_string(),
                        })
                    }
                };
                if raw_points.len() < 3 {
                    return Err(FilterError::Malformed {
                        operator: "geoPolygon",
                        reason: "a polygon needs at least 3 points".to_string(),
                    });
                }
                let points = raw_points
                    .iter()
                    .map(GeoPoint::parse)
                    .collect::<FilterResult<Vec<_>>>()?;
                Ok(FilterExpression::GeoPolygon { field, points })
            }
            "bool" => Self::parse_bool(operand, depth, max_depth),
            "and" | "or" => {
                let items = operand.as_array().ok_or(FilterError::NotAnArray(
                    if key == "and" { "and" } else { "or" },
                ))?;
                if items.is_empty() {
                    return Err(FilterError::Empty);
                }
                let children = items
                    .iter()
                    .map(|item| Self::parse_node(item, depth + 1, max_depth))
                    .collect::<FilterResult<Vec<_>>>()?;
                if key == "and" {
                    Ok(FilterExpression::And(children))
                } else {
                    Ok(FilterExpression::Or(children))
                }
            }
            "not" => {
                let child = Self::parse_node(operand, depth + 1, max_depth)?;
                Ok(FilterExpression::Not(Box::new(child)))
            }
            other => Err(FilterError::UnknownOperator(other.to_string())),
        }
    }

    fn parse_bool(operand: &Value, depth: usize, max_depth: usize) -> FilterResult<Self> {
        let obj = operand.as_object().ok_or(FilterError::Malformed {
            operator: "bool",
            reason: "expected an object of clause lists".to_string(),
        })?;

        let mut must = Vec::new();
        let mut must_not = Vec::new();
        let mut should = Vec::new();

        for (key, value) in obj {
            let target = match key.as_str() {
                "must" => &mut must,
                "mustNot" | "must_not" => &mut must_not,
                "should" => &mut should,
                other => {
                    return Err(FilterError::Malformed {
                        operator: "bool",
                        reason: format!("unknown clause {other}"),
                    })
                }
            };
            let items = value.as_array().ok_or(FilterError::NotAnArray("bool"))?;
            for item in items {
                target.push(Self::parse_node(item, depth + 1, max_depth)?);
            }
        }

        if must.is_empty() && must_not.is_empty() && should.is_empty() {
            return Err(FilterError::Empty);
        }

        Ok(FilterExpression::Bool {
            must,
            must_not,
            should,
        })
    }

    /// Whether this node is a leaf condition
    pub fn is_leaf(&self) -> bool {
        !matches!(
            self,
            FilterExpression::Bool { .. }
                | FilterExpression::And(_)
                | FilterExpression::Or(_)
                | FilterExpression::Not(_)
        )
    }

    /// Number of leaf conditions under this node
    pub fn condition_count(&self) -> usize {
        match self {
            FilterExpression::And(children) | FilterExpression::Or(children) => {
                children.iter().map(Self::condition_count).sum()
            }
            FilterExpression::Bool {
                must,
                must_not,
                should,
            } => must
                .iter()
                .chain(must_not)
                .chain(should)
                .map(Self::condition_count)
                .sum(),
            FilterExpression::Not(child) => child.condition_count(),
            _ => 1,
        }
    }

    /// Canonical textual form, identical for semantically-equal filters.
    ///
    /// Children of commutative composites are sorted by their own canonical
    /// form; value lists are sorted and deduplicated.
    pub fn canonical(&self) -> String {
        match self {
            FilterExpression::Term { field, value } => {
                format!("term:{field}:{}", canonical_value(value))
            }
            FilterExpression::Terms { field, values } => {
                format!("terms:{field}:[{}]", canonical_values(values))
            }
            FilterExpression::Range { field, bounds } => format!(
                "range:{field}:gt={:?},gte={:?},lt={:?},lte={:?}",
                bounds.gt, bounds.gte, bounds.lt, bounds.lte
            ),
            FilterExpression::Exists { field } => format!("exists:{field}"),
            FilterExpression::Missing { field } => format!("missing:{field}"),
            FilterExpression::GeoBoundingBox { field, bbox } => format!(
                "geoBoundingBox:{field}:{},{},{},{}",
                bbox.top, bbox.left, bbox.bottom, bbox.right
            ),
            FilterExpression::GeoDistance {
                field,
                point,
                distance_m,
            } => format!(
                "geoDistance:{field}:{},{}:{distance_m}",
                point.lat, point.lon
            ),
            FilterExpression::GeoDistanceRange {
                field,
                point,
                from_m,
                to_m,
            } => format!(
                "geoDistanceRange:{field}:{},{}:{from_m}:{to_m}",
                point.lat, point.lon
            ),
            FilterExpression::GeoPolygon { field, points } => {
                let coords: Vec<String> = points
                    .iter()
                    .map(|p| format!("{},{}", p.lat, p.lon))
                    .collect();
                format!("geoPolygon:{field}:[{}]", coords.join(";"))
            }
            FilterExpression::Ids { values } => {
                format!("ids:[{}]", canonical_values(values))
            }
            FilterExpression::Bool {
                must,
                must_not,
                should,
            } => format!(
                "bool(must({}),mustNot({}),should({}))",
                sorted_canonicals(must),
                sorted_canonicals(must_not),
                sorted_canonicals(should)
            ),
            FilterExpression::And(children) => {
                format!("and({})", sorted_canonicals(children))
            }
            FilterExpression::Or(children) => {
                format!("or({})", sorted_canonicals(children))
            }
            FilterExpression::Not(child) => format!("not({})", child.canonical()),
        }
    }

    /// Evaluate the expression against a document.
    ///
    /// An absent field never matches, except through `missing` (and negation).
    pub fn evaluate(&self, doc: &Document<'_>) -> bool {
        match self {
            FilterExpression::Term { field, value } => match resolve(doc, field) {
                Resolved::Value(actual) => values_equal(actual, value),
                Resolved::Id(id) => value.as_str() == Some(id),
                Resolved::Absent => false,
            },
            FilterExpression::Terms { field, values } => match resolve(doc, field) {
                Resolved::Value(actual) => values.iter().any(|v| values_equal(actual, v)),
                Resolved::Id(id) => values.iter().any(|v| v.as_str() == Some(id)),
                Resolved::Absent => false,
            },
            FilterExpression::Range { field, bounds } => doc
                .field(field)
                .and_then(Value::as_f64)
                .map(|value| bounds.contains(value))
                .unwrap_or(false),
            FilterExpression::Exists { field } => {
                !matches!(resolve(doc, field), Resolved::Absent)
            }
            FilterExpression::Missing { field } => {
                matches!(resolve(doc, field), Resolved::Absent)
            }
            FilterExpression::GeoBoundingBox { field, bbox } => doc
                .field(field)
                .and_then(|v| GeoPoint::parse(v).ok())
                .map(|p| bbox.contains(&p))
                .unwrap_or(false),
            FilterExpression::GeoDistance {
                field,
                point,
                distance_m,
            } => doc
                .field(field)
                .and_then(|v| GeoPoint::parse(v).ok())
                .map(|p| point.distance_m(&p) <= *distance_m)
                .unwrap_or(false),
            FilterExpression::GeoDistanceRange {
                field,
                point,
                from_m,
                to_m,
            } => doc
                .field(field)
                .and_then(|v| GeoPoint::parse(v).ok())
                .map(|p| {
                    let d = point.distance_m(&p);
                    d >= *from_m && d <= *to_m
                })
                .unwrap_or(false),
            FilterExpression::GeoPolygon { field, points } => doc
                .field(field)
                .and_then(|v| GeoPoint::parse(v).ok())
                .map(|p| point_in_polygon(&p, points))
                .unwrap_or(false),
            FilterExpression::Ids { values } => {
                values.iter().any(|v| v.as_str() == Some(doc.id))
            }
            FilterExpression::Bool {
                must,
                must_not,
                should,
            } => {
                must.iter().all(|c| c.evaluate(doc))
                    && !must_not.iter().any(|c| c.evaluate(doc))
                    && (should.is_empty() || should.iter().any(|c| c.evaluate(doc)))
            }
            FilterExpression::And(children) => children.iter().all(|c| c.evaluate(doc)),
            FilterExpression::Or(children) => children.iter().any(|c| c.evaluate(doc)),
            FilterExpression::Not(child) => !child.evaluate(doc),
        }
    }
}

enum Resolved<'a> {
    Value(&'a Value),
    Id(&'a str),
    Absent,
}

fn resolve<'a>(doc: &Document<'a>, field: &str) -> Resolved<'a> {
    if field == "_id" {
        return Resolved::Id(doc.id);
    }
    match doc.field(field) {
        Some(value) => Resolved::Value(value),
        None => Resolved::Absent,
    }
}

/// JSON equality with numeric coercion: `1` equals `1.0`
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn canonical_value(value: &Value) -> String {
    // serde_json's default map is sorted, so this is key-order independent
    value.to_string()
}

fn canonical_values(values: &[Value]) -> String {
    let mut parts: Vec<String> = values.iter().map(canonical_value).collect();
    parts.sort();
    parts.dedup();
    parts.join(",")
}

fn sorted_canonicals(children: &[FilterExpression]) -> String {
    let mut parts: Vec<String> = children.iter().map(FilterExpression::canonical).collect();
    parts.sort();
    parts.join(",")
}

fn single_pair<'a>(
    operator: &'static str,
    operand: &'a Value,
) -> FilterResult<(String, &'a Value)> {
    let obj = operand.as_object().ok_or(FilterError::Malformed {
        operator,
        reason: "expected a field/value object".to_string(),
    })?;
    let mut entries = obj.iter();
    let (field, value) = entries.next().ok_or(FilterError::MissingAttribute {
        operator,
        attribute: "field",
    })?;
    if entries.next().is_some() {
        return Err(FilterError::Malformed {
            operator,
            reason: "expected exactly one field".to_string(),
        });
    }
    Ok((field.clone(), value))
}

fn field_name(operator: &'static str, operand: &Value) -> FilterResult<String> {
    match operand {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Object(obj) => obj
            .get("field")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(FilterError::MissingAttribute {
                operator,
                attribute: "field",
            }),
        _ => Err(FilterError::MissingAttribute {
            operator,
            attribute: "field",
        }),
    }
}

fn parse_bounds(value: &Value) -> FilterResult<RangeBounds> {
    let obj = value
        .as_object()
        .ok_or_else(|| FilterError::InvalidRange("expected a bounds object".to_string()))?;
    if obj.is_empty() {
        return Err(FilterError::InvalidRange("no bounds given".to_string()));
    }

    let mut bounds = RangeBounds::default();
    for (key, bound) in obj {
        let number = bound
            .as_f64()
            .ok_or_else(|| FilterError::InvalidRange(format!("{key} is not numeric")))?;
        match key.as_str() {
            "gte" => bounds.gte = Some(number),
            "gt" => bounds.gt = Some(number),
            "lte" => bounds.lte = Some(number),
            "lt" => bounds.lt = Some(number),
            other => {
                return Err(FilterError::InvalidRange(format!(
                    "unknown bound {other}"
                )))
            }
        }
    }
    Ok(bounds)
}

fn parse_bbox(value: &Value) -> FilterResult<BoundingBox> {
    let obj = value.as_object().ok_or_else(|| {
        FilterError::InvalidGeoCoordinate("expected a box object".to_string())
    })?;
    let side = |name: &'static str| -> FilterResult<f64> {
        obj.get(name)
            .and_then(Value::as_f64)
            .ok_or(FilterError::MissingAttribute {
                operator: "geoBoundingBox",
                attribute: name,
            })
    };
    BoundingBox::new(side("top")?, side("left")?, side("bottom")?, side("right")?)
}

/// Extract `(field, point, extra values)` from a geo operand: the operand
/// must carry each key in `extras` plus exactly one field key holding the
/// center point.
fn geo_operand<'a>(
    operator: &'static str,
    operand: &'a Value,
    extras: &[&'static str],
) -> FilterResult<(String, GeoPoint, Vec<&'a Value>)> {
    let obj = operand.as_object().ok_or(FilterError::Malformed {
        operator,
        reason: "expected an object".to_string(),
    })?;

    let mut extra_values = Vec::with_capacity(extras.len());
    for name in extras {
        extra_values.push(obj.get(*name).ok_or(FilterError::MissingAttribute {
            operator,
            attribute: name,
        })?);
    }

    let mut field_entries = obj.iter().filter(|(k, _)| !extras.contains(&k.as_str()));
    let (field, raw_point) = field_entries.next().ok_or(FilterError::MissingAttribute {
        operator,
        attribute: "field",
    })?;
    if field_entries.next().is_some() {
        return Err(FilterError::Malformed {
            operator,
            reason: "expected exactly one field".to_string(),
        });
    }

    Ok((field.clone(), GeoPoint::parse(raw_point)?, extra_values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEPTH: usize = 32;

    fn parse(value: Value) -> FilterExpression {
        FilterExpression::parse(&value, DEPTH).unwrap()
    }

    #[test]
    fn test_parse_term() {
        let expr = parse(json!({"term": {"city": "NYC"}}));
        assert_eq!(
            expr,
            FilterExpression::Term {
                field: "city".to_string(),
                value: json!("NYC"),
            }
        );
    }

    #[test]
    fn test_parse_unknown_operator() {
        let err = FilterExpression::parse(&json!({"foobar": {"field": "x"}}), DEPTH)
            .unwrap_err();
        assert_eq!(err, FilterError::UnknownOperator("foobar".to_string()));
    }

    #[test]
    fn test_parse_empty_filter() {
        assert_eq!(
            FilterExpression::parse(&json!({}), DEPTH).unwrap_err(),
            FilterError::Empty
        );
        assert_eq!(
            FilterExpression::parse(&json!(null), DEPTH).unwrap_err(),
            FilterError::Empty
        );
    }

    #[test]
    fn test_parse_terms_requires_array() {
        let err = FilterExpression::parse(&json!({"terms": {"city": "NYC"}}), DEPTH)
            .unwrap_err();
        assert_eq!(err, FilterError::NotAnArray("terms"));
    }

    #[test]
    fn test_parse_exists_shapes() {
        let a = parse(json!({"exists": {"field": "city"}}));
        let b = parse(json!({"exists": "city"}));
        assert_eq!(a, b);

        let err =
            FilterExpression::parse(&json!({"exists": {}}), DEPTH).unwrap_err();
        assert!(matches!(err, FilterError::MissingAttribute { .. }));
    }

    #[test]
    fn test_parse_range_rejects_unknown_bound() {
        let err = FilterExpression::parse(
            &json!({"range": {"age": {"between": 10}}}),
            DEPTH,
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::InvalidRange(_)));
    }

    #[test]
    fn test_parse_depth_limit() {
        let mut filter = json!({"term": {"x": 1}});
        for _ in 0..5 {
            filter = json!({"not": filter});
        }
        let err = FilterExpression::parse(&filter, 3).unwrap_err();
        assert_eq!(err, FilterError::TooDeep(3));
    }

    #[test]
    fn test_multi_key_object_is_and() {
        let expr = parse(json!({
            "term": {"city": "NYC"},
            "range": {"age": {"gte": 21}}
        }));
        assert!(matches!(expr, FilterExpression::And(ref c) if c.len() == 2));
    }

    #[test]
    fn test_canonical_is_order_independent() {
        let a = parse(json!({"and": [
            {"term": {"city": "NYC"}},
            {"range": {"age": {"gte": 21}}}
        ]}));
        let b = parse(json!({"and": [
            {"range": {"age": {"gte": 21}}},
            {"term": {"city": "NYC"}}
        ]}));
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn test_canonical_distinguishes_operators() {
        let a = parse(json!({"term": {"city": "NYC"}}));
        let b = parse(json!({"terms": {"city": ["NYC"]}}));
        assert_ne!(a.canonical(), b.canonical());
    }

    #[test]
    fn test_term_evaluation() {
        let expr = parse(json!({"term": {"city": "NYC"}}));
        let nyc = json!({"city": "NYC"});
        let la = json!({"city": "LA"});
        let none = json!({"country": "US"});

        assert!(expr.evaluate(&Document::new("1", &nyc)));
        assert!(!expr.evaluate(&Document::new("1", &la)));
        assert!(!expr.evaluate(&Document::new("1", &none)));
    }

    #[test]
    fn test_term_numeric_coercion() {
        let expr = parse(json!({"term": {"count": 1}}));
        let body = json!({"count": 1.0});
        assert!(expr.evaluate(&Document::new("1", &body)));
    }

    #[test]
    fn test_term_on_document_id() {
        let expr = parse(json!({"term": {"_id": "doc-7"}}));
        let body = json!({});
        assert!(expr.evaluate(&Document::new("doc-7", &body)));
        assert!(!expr.evaluate(&Document::new("doc-8", &body)));
    }

    #[test]
    fn test_range_boundaries() {
        let gte = parse(json!({"range": {"age": {"gte": 10}}}));
        let gt = parse(json!({"range": {"age": {"gt": 10}}}));
        let body = json!({"age": 10});
        let doc = Document::new("1", &body);

        assert!(gte.evaluate(&doc));
        assert!(!gt.evaluate(&doc));
    }

    #[test]
    fn test_missing_matches_absent_field() {
        let missing = parse(json!({"missing": {"field": "tag"}}));
        let exists = parse(json!({"exists": {"field": "tag"}}));
        let absent = json!({"city": "NYC"});
        let present = json!({"tag": "a"});

        assert!(missing.evaluate(&Document::new("1", &absent)));
        assert!(!missing.evaluate(&Document::new("1", &present)));
        assert!(!exists.evaluate(&Document::new("1", &absent)));
        assert!(exists.evaluate(&Document::new("1", &present)));
    }

    #[test]
    fn test_nested_path_evaluation() {
        let expr = parse(json!({"term": {"address.city": "NYC"}}));
        let body = json!({"address": {"city": "NYC"}});
        assert!(expr.evaluate(&Document::new("1", &body)));
    }

    #[test]
    fn test_bool_evaluation() {
        let expr = parse(json!({"bool": {
            "must": [{"term": {"city": "NYC"}}],
            "mustNot": [{"term": {"banned": true}}],
            "should": [{"range": {"age": {"gte": 18}}}, {"exists": "guardian"}]
        }}));

        let adult = json!({"city": "NYC", "age": 30});
        let minor = json!({"city": "NYC", "age": 12, "guardian": "yes"});
        let banned = json!({"city": "NYC", "age": 30, "banned": true});
        let lost = json!({"city": "NYC", "age": 12});

        assert!(expr.evaluate(&Document::new("1", &adult)));
        assert!(expr.evaluate(&Document::new("1", &minor)));
        assert!(!expr.evaluate(&Document::new("1", &banned)));
        assert!(!expr.evaluate(&Document::new("1", &lost)));
    }

    #[test]
    fn test_not_evaluation() {
        let expr = parse(json!({"not": {"term": {"city": "NYC"}}}));
        let la = json!({"city": "LA"});
        let nyc = json!({"city": "NYC"});
        let empty = json!({});

        assert!(expr.evaluate(&Document::new("1", &la)));
        assert!(!expr.evaluate(&Document::new("1", &nyc)));
        assert!(expr.evaluate(&Document::new("1", &empty)));
    }

    #[test]
    fn test_geo_distance_evaluation() {
        let expr = parse(json!({"geoDistance": {
            "position": {"lat": 48.8566, "lon": 2.3522},
            "distance": "400 km"
        }}));
        let london = json!({"position": {"lat": 51.5074, "lon": -0.1278}});
        let moscow = json!({"position": {"lat": 55.7558, "lon": 37.6173}});

        assert!(expr.evaluate(&Document::new("1", &london)));
        assert!(!expr.evaluate(&Document::new("1", &moscow)));
    }

    #[test]
    fn test_ids_evaluation() {
        let expr = parse(json!({"ids": {"values": ["a", "b"]}}));
        let body = json!({});
        assert!(expr.evaluate(&Document::new("a", &body)));
        assert!(!expr.evaluate(&Document::new("c", &body)));
    }

    #[test]
    fn test_condition_count() {
        let expr = parse(json!({"bool": {
            "must": [{"term": {"a": 1}}, {"term": {"b": 2}}],
            "should": [{"not": {"term": {"c": 3}}}]
        }}));
        assert_eq!(expr.condition_count(), 3);
    }
}
