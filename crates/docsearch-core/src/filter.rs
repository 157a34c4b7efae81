//! Filter expression compiler.
//!
//! Turns a structural description of a filter into the textual grammar the
//! search endpoint accepts in its `filter` parameter.
//!
//! ```
//! use docsearch_core::filter;
//! use serde_json::json;
//!
//! let expr = filter::build(&json!({
//!     "and": [
//!         {"or": [{"genres": "horror"}, {"genres": "comedy"}]},
//!         {"not": {"director": "Jordan Peele"}}
//!     ]
//! }))
//! .unwrap();
//!
//! assert_eq!(
//!     expr,
//!     "(genres = horror OR genres = comedy) AND NOT (director = 'Jordan Peele')"
//! );
//! ```
//!
//! # Input shapes
//!
//! - scalars compile to their formatted value
//! - arrays are an implicit `AND` of their elements
//! - objects keyed by `and`, `or` or `not` are logical connectives
//! - `{"attr": value}` is an equality test, `{"attr": null}` an `IS NULL`
//!   test and `{"attr": [..]}` a membership test
//! - `{"attr": {"gte": 1, "lt": 5}}` applies per-attribute operators
//! - objects with several attributes are an implicit `AND`, in key order

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while compiling a filter. No partial output is ever
/// returned alongside one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The input could not be represented as a filter structure.
    #[error("unsupported filter type `{type_name}`: {reason}")]
    UnsupportedType {
        type_name: &'static str,
        reason: String,
    },

    /// A per-attribute operator key is not recognized.
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    /// A logical connective key is not recognized.
    #[error("unknown logical operator `{0}`")]
    UnknownLogicalOperator(String),

    /// An operator was given a value of the wrong shape.
    #[error("invalid operand for `{operator}`: {reason}")]
    InvalidOperand {
        operator: Operator,
        reason: String,
    },

    /// An attribute was mapped to an empty operator object.
    #[error("no operators given for attribute `{attribute}`")]
    EmptyCondition { attribute: String },
}

/// Per-attribute comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    To,
    Exists,
    In,
    Contains,
    StartsWith,
    IsEmpty,
    IsNull,
}

impl Operator {
    pub const ALL: [Operator; 13] = [
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::To,
        Self::Exists,
        Self::In,
        Self::Contains,
        Self::StartsWith,
        Self::IsEmpty,
        Self::IsNull,
    ];

    /// Key used in filter descriptions.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::To => "to",
            Self::Exists => "exists",
            Self::In => "in",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::IsEmpty => "is_empty",
            Self::IsNull => "is_null",
        }
    }

    /// Keyword emitted in the compiled expression.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::To => "TO",
            Self::Exists => "EXISTS",
            Self::In => "IN",
            Self::Contains => "CONTAINS",
            Self::StartsWith => "STARTS WITH",
            Self::IsEmpty => "IS EMPTY",
            Self::IsNull => "IS NULL",
        }
    }

    fn compile(&self, attribute: &str, value: &Value) -> Result<String, FilterError> {
        let expr = match self {
            Self::Eq | Self::Ne | Self::Gt | Self::Gte | Self::Lt | Self::Lte => {
                format!("{attribute} {} {}", self.symbol(), format_value(value))
            }
            Self::To => {
                let (low, high) = match value {
                    Value::Array(items) => match (items.first(), items.last()) {
                        (Some(low), Some(high)) => (low, high),
                        _ => {
                            return Err(FilterError::InvalidOperand {
                                operator: *self,
                                reason: "expected a [low, high] pair, got an empty array".into(),
                            })
                        }
                    },
                    other => {
                        return Err(FilterError::InvalidOperand {
                            operator: *self,
                            reason: format!("expected a [low, high] pair, got {other}"),
                        })
                    }
                };
                format!("{attribute} {} TO {}", format_value(low), format_value(high))
            }
            Self::Exists => negatable(attribute, value, "EXISTS", "NOT EXISTS"),
            Self::IsEmpty => negatable(attribute, value, "IS EMPTY", "IS NOT EMPTY"),
            Self::IsNull => negatable(attribute, value, "IS NULL", "IS NOT NULL"),
            Self::In => match value {
                Value::Array(_) => format!("{attribute} IN {}", format_value(value)),
                single => format!("{attribute} IN [{}]", format_value(single)),
            },
            Self::Contains | Self::StartsWith => {
                format!("{attribute} {} {}", self.symbol(), format_value(value))
            }
        };
        Ok(expr)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.key() == s)
            .ok_or_else(|| FilterError::UnknownOperator(s.to_string()))
    }
}

/// Logical connectives. They take priority over attribute keys when present
/// in an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl LogicalOperator {
    /// Checked in this order when several connectives share one object.
    pub const ALL: [LogicalOperator; 3] = [Self::And, Self::Or, Self::Not];

    pub fn key(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for LogicalOperator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.key() == s)
            .ok_or_else(|| FilterError::UnknownLogicalOperator(s.to_string()))
    }
}

/// Compile any serializable filter description.
///
/// Values that cannot be represented as JSON (maps with non-string keys,
/// types whose `Serialize` impl refuses) are rejected with
/// [`FilterError::UnsupportedType`].
pub fn build<T: Serialize + ?Sized>(filter: &T) -> Result<String, FilterError> {
    let value = serde_json::to_value(filter).map_err(|e| FilterError::UnsupportedType {
        type_name: std::any::type_name::<T>(),
        reason: e.to_string(),
    })?;
    build_value(&value)
}

/// Compile a filter description already held as JSON.
pub fn build_value(filter: &Value) -> Result<String, FilterError> {
    match filter {
        Value::Object(map) => build_object(map),
        Value::Array(items) => join(items.iter().map(build_value), " AND "),
        scalar => Ok(format_value(scalar)),
    }
}

fn build_object(map: &Map<String, Value>) -> Result<String, FilterError> {
    if let Some((op, operand)) = LogicalOperator::ALL
        .into_iter()
        .find_map(|op| map.get(op.key()).map(|operand| (op, operand)))
    {
        return build_logical(op, operand);
    }

    if let (1, Some((attribute, condition))) = (map.len(), map.iter().next()) {
        return build_attribute(attribute, condition);
    }

    join(
        map.iter()
            .map(|(attribute, condition)| build_attribute(attribute, condition)),
        " AND ",
    )
}

fn build_logical(op: LogicalOperator, operand: &Value) -> Result<String, FilterError> {
    match op {
        LogicalOperator::Not => Ok(format!("NOT ({})", build_value(operand)?)),
        LogicalOperator::And | LogicalOperator::Or => {
            let operands = match operand {
                Value::Array(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            let separator = format!(" {} ", op.keyword());
            join(
                operands
                    .iter()
                    .map(|item| build_value(item).map(parenthesize_compound)),
                &separator,
            )
        }
    }
}

fn build_attribute(attribute: &str, condition: &Value) -> Result<String, FilterError> {
    match condition {
        Value::Object(operators) => build_operators(attribute, operators),
        Value::Null => Ok(format!("{attribute} IS NULL")),
        Value::Array(_) => Ok(format!("{attribute} IN {}", format_value(condition))),
        value => Ok(format!("{attribute} = {}", format_value(value))),
    }
}

fn build_operators(attribute: &str, operators: &Map<String, Value>) -> Result<String, FilterError> {
    let mut parts = operators
        .iter()
        .map(|(key, value)| key.parse::<Operator>()?.compile(attribute, value))
        .collect::<Result<Vec<_>, _>>()?;

    match parts.len() {
        0 => Err(FilterError::EmptyCondition {
            attribute: attribute.to_string(),
        }),
        1 => Ok(parts.remove(0)),
        _ => Ok(parts
            .into_iter()
            .map(parenthesize_compound)
            .collect::<Vec<_>>()
            .join(" AND ")),
    }
}

fn negatable(attribute: &str, value: &Value, positive: &str, negative: &str) -> String {
    if is_truthy(value) {
        format!("{attribute} {positive}")
    } else {
        format!("{attribute} {negative}")
    }
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn join<I>(parts: I, separator: &str) -> Result<String, FilterError>
where
    I: Iterator<Item = Result<String, FilterError>>,
{
    Ok(parts.collect::<Result<Vec<_>, _>>()?.join(separator))
}

fn parenthesize_compound(expr: String) -> String {
    if is_compound(&expr) {
        format!("({expr})")
    } else {
        expr
    }
}

/// Returns true if `expr` has to be parenthesized when embedded as an
/// operand of another connective.
///
/// This is a textual check, not a structural one: attribute names or quoted
/// values that contain a trigger keyword also count as compound.
pub fn is_compound(expr: &str) -> bool {
    static COMPOUND: OnceLock<Regex> = OnceLock::new();
    COMPOUND
        .get_or_init(|| {
            Regex::new(
                r" (?:AND|OR) |\s(?:IN|CONTAINS|STARTS WITH|IS EMPTY|IS NULL|NOT EXISTS|IS NOT EMPTY|IS NOT NULL)(?:\s|$)",
            )
            .expect("compound expression pattern is valid")
        })
        .is_match(expr)
}

/// Format a value as it appears on the right-hand side of a comparison.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format_string(s),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn format_string(s: &str) -> String {
    if needs_quoting(s) {
        format!("'{}'", s.replace('\'', "\\'"))
    } else {
        s.to_string()
    }
}

fn needs_quoting(s: &str) -> bool {
    if s.contains(' ') {
        return true;
    }
    let upper = s.to_uppercase();
    Operator::ALL.iter().any(|op| op.symbol() == upper)
        || LogicalOperator::ALL
            .iter()
            .any(|op| op.keyword().eq_ignore_ascii_case(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    fn compile(filter: Value) -> String {
        build(&filter).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(compile(json!("horror")), "horror");
        assert_eq!(compile(json!("science fiction")), "'science fiction'");
        assert_eq!(compile(json!(42)), "42");
        assert_eq!(compile(json!(4.5)), "4.5");
        assert_eq!(compile(json!(true)), "true");
        assert_eq!(compile(json!(false)), "false");
        assert_eq!(compile(Value::Null), "null");
    }

    #[test]
    fn test_simple_equality() {
        assert_eq!(compile(json!({"genres": "horror"})), "genres = horror");
    }

    #[test]
    fn test_not() {
        assert_eq!(
            compile(json!({"not": {"genres": "horror"}})),
            "NOT (genres = horror)"
        );
    }

    #[test]
    fn test_or() {
        assert_eq!(
            compile(json!({"or": [{"genres": "horror"}, {"genres": "comedy"}]})),
            "genres = horror OR genres = comedy"
        );
    }

    #[test]
    fn test_nested_connectives_are_parenthesized() {
        let filter = json!({
            "and": [
                {"or": [{"g": "horror"}, {"g": "comedy"}]},
                {"not": {"d": "Jordan Peele"}}
            ]
        });
        assert_eq!(
            compile(filter),
            "(g = horror OR g = comedy) AND NOT (d = 'Jordan Peele')"
        );
    }

    #[test]
    fn test_explicit_and_matches_implicit_and() {
        let explicit = compile(json!({"and": [{"g": "h"}, {"d": "p q"}]}));
        let implicit = compile(json!({"g": "h", "d": "p q"}));
        assert_eq!(explicit, "g = h AND d = 'p q'");
        assert_eq!(explicit, implicit);
    }

    #[test]
    fn test_array_is_implicit_and() {
        assert_eq!(
            compile(json!([{"a": 1}, {"b": 2}, "c"])),
            "a = 1 AND b = 2 AND c"
        );
    }

    #[test]
    fn test_and_coerces_single_operand() {
        assert_eq!(compile(json!({"and": {"a": 1}})), "a = 1");
        assert_eq!(compile(json!({"or": {"a": [1, 2]}})), "(a IN [1, 2])");
    }

    #[test]
    fn test_logical_key_takes_priority() {
        assert_eq!(
            compile(json!({"rating": 3, "or": [{"a": 1}, {"b": 2}]})),
            "a = 1 OR b = 2"
        );
        assert_eq!(
            compile(json!({"not": {"a": 1}, "and": [{"b": 2}]})),
            "b = 2"
        );
    }

    #[test]
    fn test_attribute_shorthands() {
        assert_eq!(compile(json!({"poster": null})), "poster IS NULL");
        assert_eq!(
            compile(json!({"genres": ["horror", "sci fi"]})),
            "genres IN [horror, 'sci fi']"
        );
        assert_eq!(compile(json!({"year": 1999})), "year = 1999");
        assert_eq!(compile(json!({"adult": false})), "adult = false");
    }

    #[test]
    fn test_operator_table() {
        let cases = [
            (json!({"eq": "x"}), "a = x"),
            (json!({"ne": "x"}), "a != x"),
            (json!({"gt": 1}), "a > 1"),
            (json!({"gte": 1}), "a >= 1"),
            (json!({"lt": 1}), "a < 1"),
            (json!({"lte": 1}), "a <= 1"),
            (json!({"to": [1, 10]}), "a 1 TO 10"),
            (json!({"exists": true}), "a EXISTS"),
            (json!({"exists": false}), "a NOT EXISTS"),
            (json!({"in": ["x", "y"]}), "a IN [x, y]"),
            (json!({"contains": "kit"}), "a CONTAINS kit"),
            (json!({"starts_with": "ki"}), "a STARTS WITH ki"),
            (json!({"is_empty": true}), "a IS EMPTY"),
            (json!({"is_empty": false}), "a IS NOT EMPTY"),
            (json!({"is_null": true}), "a IS NULL"),
            (json!({"is_null": null}), "a IS NOT NULL"),
        ];

        for (condition, expected) in cases {
            assert_eq!(compile(json!({ "a": condition })), expected);
        }
    }

    #[test]
    fn test_truthiness_of_negatable_operators() {
        assert_eq!(compile(json!({"a": {"exists": 0}})), "a EXISTS");
        assert_eq!(compile(json!({"a": {"exists": ""}})), "a EXISTS");
        assert_eq!(compile(json!({"a": {"exists": null}})), "a NOT EXISTS");
    }

    #[test]
    fn test_to_uses_first_and_last() {
        assert_eq!(compile(json!({"a": {"to": [1, 5, 10]}})), "a 1 TO 10");
        assert!(matches!(
            build(&json!({"a": {"to": []}})),
            Err(FilterError::InvalidOperand { operator: Operator::To, .. })
        ));
        assert!(matches!(
            build(&json!({"a": {"to": 3}})),
            Err(FilterError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn test_multiple_operators_wrap_compound_parts() {
        assert_eq!(
            compile(json!({"rating": {"gte": 3, "lt": 5}})),
            "rating >= 3 AND rating < 5"
        );
        assert_eq!(
            compile(json!({"genres": {"in": ["a", "b"], "exists": true}})),
            "(genres IN [a, b]) AND genres EXISTS"
        );
        assert_eq!(
            compile(json!({"poster": {"is_null": false, "ne": "x"}})),
            "(poster IS NOT NULL) AND poster != x"
        );
    }

    #[test]
    fn test_single_operator_is_not_wrapped() {
        assert_eq!(
            compile(json!({"genres": {"in": ["a", "b"]}})),
            "genres IN [a, b]"
        );
    }

    #[test]
    fn test_membership_operands_wrapped_in_connectives() {
        assert_eq!(
            compile(json!({"and": [{"genres": ["a", "b"]}, {"year": 2000}]})),
            "(genres IN [a, b]) AND year = 2000"
        );
    }

    #[test]
    fn test_unknown_operator() {
        let err = build(&json!({"a": {"between": [1, 2]}})).unwrap_err();
        assert_eq!(err, FilterError::UnknownOperator("between".into()));
        assert!(err.to_string().contains("unknown operator"));
    }

    #[test]
    fn test_unknown_operator_produces_no_partial_output() {
        assert!(build(&json!({"a": {"eq": 1, "nope": 2}})).is_err());
    }

    #[test]
    fn test_unsupported_type() {
        let mut opaque = HashMap::new();
        opaque.insert(vec![1u8, 2], "value");

        let err = build(&opaque).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedType { .. }));
        assert!(err.to_string().contains("unsupported filter type"));
    }

    #[test]
    fn test_empty_condition() {
        assert_eq!(
            build(&json!({"a": {}})).unwrap_err(),
            FilterError::EmptyCondition {
                attribute: "a".into()
            }
        );
    }

    #[test]
    fn test_logical_operator_parse() {
        assert_eq!("or".parse::<LogicalOperator>().unwrap(), LogicalOperator::Or);
        assert_eq!(
            "xor".parse::<LogicalOperator>().unwrap_err(),
            FilterError::UnknownLogicalOperator("xor".into())
        );
        assert!("AND".parse::<LogicalOperator>().is_err());
    }

    #[test]
    fn test_format_value_quotes_spaces() {
        for s in ["a b", "Jordan Peele", "it's here", " lead", "trail ", "o'brien s"] {
            let expected = format!("'{}'", s.replace('\'', "\\'"));
            assert_eq!(format_value(&json!(s)), expected);
        }
    }

    #[test]
    fn test_format_value_quotes_keywords() {
        assert_eq!(format_value(&json!("to")), "'to'");
        assert_eq!(format_value(&json!("exists")), "'exists'");
        assert_eq!(format_value(&json!("In")), "'In'");
        assert_eq!(format_value(&json!("=")), "'='");
        assert_eq!(format_value(&json!("and")), "'and'");
        assert_eq!(format_value(&json!("Not")), "'Not'");
        assert_eq!(format_value(&json!("or")), "'or'");
        assert_eq!(format_value(&json!("android")), "android");
        assert_eq!(format_value(&json!("o'brien")), "o'brien");
    }

    #[test]
    fn test_format_value_arrays_and_literals() {
        assert_eq!(
            format_value(&json!(["a", 1, true, null, ["b c"]])),
            "[a, 1, true, null, ['b c']]"
        );
        assert_eq!(format_value(&json!([])), "[]");
        assert_eq!(format_value(&json!(-3)), "-3");
    }

    #[test]
    fn test_is_compound() {
        assert!(is_compound("a = 1 AND b = 2"));
        assert!(is_compound("a = 1 OR b = 2"));
        assert!(is_compound("genres IN [a, b]"));
        assert!(is_compound("title CONTAINS kit"));
        assert!(is_compound("title STARTS WITH ki"));
        assert!(is_compound("tags IS EMPTY"));
        assert!(is_compound("tags IS NOT EMPTY"));
        assert!(is_compound("poster IS NULL"));
        assert!(is_compound("poster IS NOT NULL"));
        assert!(is_compound("poster NOT EXISTS"));

        assert!(!is_compound("poster EXISTS"));
        assert!(!is_compound("genres = horror"));
        assert!(!is_compound("a 1 TO 10"));
        assert!(!is_compound("NOT (a = 1)"));
        assert!(!is_compound("INDEX = 1"));
    }

    #[test]
    fn test_serializable_input() {
        #[derive(Serialize)]
        struct ByYear {
            year: u16,
        }

        assert_eq!(build(&ByYear { year: 1984 }).unwrap(), "year = 1984");
        assert_eq!(build("horror").unwrap(), "horror");
    }
}
