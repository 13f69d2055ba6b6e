//! Filter queries understood by the in-memory store.
//!
//! Supported forms are `*` (every document) and `*[cond && cond ...]` where
//! each condition is `path == value` or `path != value`. Values are JSON
//! literals, single-quoted strings or `$param` references. A path that
//! resolves to nothing compares as `null`.

use serde_json::{Map, Value as JsonValue};

use super::apply::select;
use super::StoreError;
use crate::path::PathAddress;

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Literal(JsonValue),
    Param(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Condition {
    path: PathAddress,
    negated: bool,
    operand: Operand,
}

/// A parsed filter query.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Parse a query string.
    pub fn parse(query: &str) -> Result<Self, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidQuery(format!("{reason}: '{query}'"));
        let rest = query
            .trim()
            .strip_prefix('*')
            .ok_or_else(|| invalid("query must start with '*'"))?
            .trim();
        if rest.is_empty() {
            return Ok(Self {
                conditions: Vec::new(),
            });
        }
        let body = rest
            .strip_prefix('[')
            .and_then(|r| r.strip_suffix(']'))
            .ok_or_else(|| invalid("expected a single '[...]' filter"))?;

        let conditions = split_outside_quotes(body, "&&")
            .into_iter()
            .map(|raw| parse_condition(raw).map_err(|reason| invalid(&reason)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { conditions })
    }

    /// Whether `doc` satisfies every condition. Fails on an unbound
    /// parameter.
    pub fn matches(
        &self,
        doc: &JsonValue,
        params: &Map<String, JsonValue>,
    ) -> Result<bool, StoreError> {
        for condition in &self.conditions {
            let expected = match &condition.operand {
                Operand::Literal(value) => value,
                Operand::Param(name) => params.get(name).ok_or_else(|| {
                    StoreError::InvalidQuery(format!("parameter ${name} is not bound"))
                })?,
            };
            let found = select(doc, condition.path.segments());
            let equal = if found.is_empty() {
                expected.is_null()
            } else {
                found.iter().any(|value| loosely_equal(value, expected))
            };
            if equal == condition.negated {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn parse_condition(raw: &str) -> Result<Condition, String> {
    let (lhs, rhs, negated) = ["==", "!="]
        .iter()
        .find_map(|op| {
            split_outside_quotes(raw, op)
                .split_first()
                .filter(|(_, rest)| rest.len() == 1)
                .map(|(lhs, rest)| (*lhs, rest[0], *op == "!="))
        })
        .ok_or_else(|| format!("condition '{}' is not 'path == value'", raw.trim()))?;

    let path = PathAddress::parse(lhs.trim()).map_err(|e| e.to_string())?;
    let rhs = rhs.trim();
    let operand = if let Some(name) = rhs.strip_prefix('$') {
        if name.is_empty() {
            return Err("empty parameter name".to_string());
        }
        Operand::Param(name.to_string())
    } else if let Some(inner) = rhs.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        Operand::Literal(JsonValue::String(inner.replace("\\'", "'")))
    } else {
        let value: JsonValue =
            serde_json::from_str(rhs).map_err(|_| format!("'{rhs}' is not a literal"))?;
        if value.is_array() || value.is_object() {
            return Err(format!("'{rhs}' is not a scalar literal"));
        }
        Operand::Literal(value)
    };
    Ok(Condition {
        path,
        negated,
        operand,
    })
}

/// Split on `sep` wherever it occurs outside quotes and brackets.
fn split_outside_quotes<'a>(input: &'a str, sep: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 && i >= start && input[i..].starts_with(sep) => {
                parts.push(&input[start..i]);
                start = i + sep.len();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn loosely_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}
