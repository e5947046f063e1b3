//! Condition language used by stage transitions.
//!
//! A condition map pairs variable keys with expected values. Every entry must hold. An expected
//! value is one of:
//!
//! * `null`: the key must be absent,
//! * an object: a set of operators (`$eq`, `$ne`/`$not`, `$in`, `$exists`, `$regex`, `$gt`,
//!   `$gte`, `$lt`, `$lte`) that must all hold,
//! * a `$`-prefixed string: another variable whose value becomes the expected value,
//! * any other literal: numeric equality for two numbers, otherwise case-insensitive equality
//!   of the string forms.
//!
//! Anomalies (unknown operators, bad regular expressions, non-numeric comparison operands) make
//! the entry false and are logged; they never abort evaluation.

use crate::core::workflow::scope::{
    is_reference, ScopedVariableResolver, VariableScopes, VARIABLE_MARKER,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Default bound on chained `$reference` expected values.
pub const DEFAULT_MAX_REFERENCE_DEPTH: usize = 16;

/// Comparison operator recognised inside an operator map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    In,
    Exists,
    Regex,
    Gt,
    Gte,
    Lt,
    Lte,
    Unknown(String),
}

impl Operator {
    pub fn parse(key: &str) -> Operator {
        match key {
            "$eq" => Operator::Eq,
            "$ne" | "$not" => Operator::Ne,
            "$in" => Operator::In,
            "$exists" => Operator::Exists,
            "$regex" => Operator::Regex,
            "$gt" => Operator::Gt,
            "$gte" => Operator::Gte,
            "$lt" => Operator::Lt,
            "$lte" => Operator::Lte,
            other => Operator::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::In => "$in",
            Operator::Exists => "$exists",
            Operator::Regex => "$regex",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::Unknown(raw) => raw.as_str(),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Right-hand side of a condition entry after compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    Null,
    Reference(String),
    Operators(Vec<(Operator, Value)>),
    Literal(Value),
}

impl Expected {
    pub fn compile(value: &Value) -> Expected {
        match value {
            Value::Null => Expected::Null,
            Value::Object(ops) => Expected::Operators(
                ops.iter()
                    .map(|(key, operand)| (Operator::parse(key), operand.clone()))
                    .collect(),
            ),
            Value::String(text) if text.starts_with(VARIABLE_MARKER) => {
                Expected::Reference(text.clone())
            }
            literal => Expected::Literal(literal.clone()),
        }
    }
}

/// Configuration problems detectable without runtime data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionProblem {
    #[error("unknown operator '{operator}' in condition '{key}'")]
    UnknownOperator { key: String, operator: String },
    #[error("invalid regular expression '{pattern}' in condition '{key}': {reason}")]
    InvalidRegex {
        key: String,
        pattern: String,
        reason: String,
    },
}

/// A condition map compiled once, evaluated many times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionSet {
    entries: Vec<(String, Expected)>,
}

impl ConditionSet {
    pub fn compile(conditions: &Map<String, Value>) -> Self {
        ConditionSet {
            entries: conditions
                .iter()
                .map(|(key, expected)| (key.clone(), Expected::compile(expected)))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(String, Expected)] {
        &self.entries
    }

    /// Unknown operators and literal regular expressions that do not compile.
    pub fn problems(&self) -> Vec<ConditionProblem> {
        let mut problems = Vec::new();
        for (key, expected) in &self.entries {
            let Expected::Operators(ops) = expected else {
                continue;
            };
            for (operator, operand) in ops {
                match operator {
                    Operator::Unknown(raw) => problems.push(ConditionProblem::UnknownOperator {
                        key: key.clone(),
                        operator: raw.clone(),
                    }),
                    Operator::Regex if !is_reference(operand) => {
                        let pattern = string_form(operand);
                        if let Err(err) = Regex::new(&pattern) {
                            problems.push(ConditionProblem::InvalidRegex {
                                key: key.clone(),
                                pattern: pattern.into_owned(),
                                reason: err.to_string(),
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
        problems
    }
}

/// Evaluates condition maps against a set of variable scopes.
#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    max_reference_depth: usize,
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REFERENCE_DEPTH)
    }
}

impl ConditionEvaluator {
    pub fn new(max_reference_depth: usize) -> Self {
        Self {
            max_reference_depth,
        }
    }

    /// Evaluate a raw condition map. An empty map never matches.
    pub fn evaluate(&self, conditions: &Map<String, Value>, scopes: &VariableScopes<'_>) -> bool {
        self.evaluate_compiled(&ConditionSet::compile(conditions), scopes)
    }

    /// Evaluate a compiled condition set. An empty set never matches.
    pub fn evaluate_compiled(&self, conditions: &ConditionSet, scopes: &VariableScopes<'_>) -> bool {
        if conditions.is_empty() {
            return false;
        }
        for (key, expected) in conditions.entries() {
            let actual = ScopedVariableResolver::resolve_key(key, scopes);
            if !self.compare(actual, expected, scopes, 0) {
                debug!(
                    key = %key,
                    actual = ?actual,
                    expected = ?expected,
                    "condition failed"
                );
                return false;
            }
        }
        true
    }

    fn compare(
        &self,
        actual: Option<&Value>,
        expected: &Expected,
        scopes: &VariableScopes<'_>,
        depth: usize,
    ) -> bool {
        match expected {
            Expected::Null => actual.is_none(),
            Expected::Operators(ops) => ops
                .iter()
                .all(|(operator, operand)| self.apply_operator(actual, operator, operand, scopes)),
            Expected::Reference(reference) => {
                if depth >= self.max_reference_depth {
                    warn!(
                        reference = %reference,
                        limit = self.max_reference_depth,
                        "reference chain too deep, treating condition as false"
                    );
                    return false;
                }
                let next = match ScopedVariableResolver::resolve_key(reference, scopes) {
                    Some(resolved) => Expected::compile(resolved),
                    None => Expected::Null,
                };
                self.compare(actual, &next, scopes, depth + 1)
            }
            Expected::Literal(literal) => actual.is_some_and(|value| loose_eq(value, literal)),
        }
    }

    fn apply_operator(
        &self,
        actual: Option<&Value>,
        operator: &Operator,
        operand: &Value,
        scopes: &VariableScopes<'_>,
    ) -> bool {
        let operand: Cow<'_, Value> = if is_reference(operand) {
            Cow::Owned(ScopedVariableResolver::resolve(operand, scopes))
        } else {
            Cow::Borrowed(operand)
        };
        let operand = Some(operand.as_ref()).filter(|value| !value.is_null());

        match operator {
            Operator::Eq => match (actual, operand) {
                (None, None) => true,
                (Some(left), Some(right)) => loose_eq(left, right),
                _ => false,
            },
            Operator::Ne => match (actual, operand) {
                (_, None) => actual.is_some(),
                (None, Some(_)) => true,
                (Some(left), Some(right)) => !loose_eq(left, right),
            },
            Operator::In => {
                let Some(left) = actual else {
                    return false;
                };
                let needle = string_form(left).to_lowercase();
                in_candidates(operand)
                    .iter()
                    .any(|candidate| candidate.to_lowercase() == needle)
            }
            Operator::Exists => is_truthy(operand) == actual.is_some(),
            Operator::Regex => {
                let (Some(left), Some(pattern)) = (actual, operand) else {
                    return false;
                };
                let pattern = string_form(pattern);
                match Regex::new(&pattern) {
                    Ok(regex) => regex.is_match(&string_form(left)),
                    Err(err) => {
                        warn!(pattern = %pattern, error = %err, "invalid $regex operand");
                        false
                    }
                }
            }
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                let (Some(left), Some(right)) = (actual.and_then(as_f64), operand.and_then(as_f64))
                else {
                    debug!(operator = %operator, "non-numeric comparison operand");
                    return false;
                };
                match operator {
                    Operator::Gt => left > right,
                    Operator::Gte => left >= right,
                    Operator::Lt => left < right,
                    _ => left <= right,
                }
            }
            Operator::Unknown(raw) => {
                warn!(operator = %raw, "unknown operator in condition");
                false
            }
        }
    }
}

/// String rendering used for case-insensitive comparison: strings verbatim, everything else as
/// compact JSON.
pub fn string_form(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(text) => Cow::Borrowed(text.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Numeric equality when both sides are numbers, otherwise case-insensitive string equality.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    if let (Value::Number(l), Value::Number(r)) = (left, right) {
        return match (l.as_f64(), r.as_f64()) {
            (Some(l), Some(r)) => l == r,
            _ => false,
        };
    }
    string_form(left).to_lowercase() == string_form(right).to_lowercase()
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn is_truthy(operand: Option<&Value>) -> bool {
    match operand {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn in_candidates(operand: Option<&Value>) -> Vec<Cow<'_, str>> {
    match operand {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(string_form)
            .collect(),
        Some(Value::String(text)) if text.contains(',') => {
            text.split(',').map(|part| Cow::Borrowed(part.trim())).collect()
        }
        Some(other) => vec![string_form(other)],
    }
}
