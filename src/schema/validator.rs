//! Compiled validators.
//!
//! A [`Validator`] checks a JSON value and returns its coerced form. Named
//! types are reached through [`Validator::Named`] handles that index into the
//! compiled type table, which is how cyclic schemas stay finite: a handle is
//! handed out before the type it points at has finished building.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};

use crate::path::{format_segments, PathSegment};

static ASSET_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(image|file|asset)-[A-Za-z0-9]+(-\d+x\d+)?(-[a-z0-9]+)?$")
        .expect("asset reference pattern is valid")
});

/// A value did not match its declared type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value at '{}': expected {expected}, found {actual}", self.path_string())]
pub struct ValidationError {
    /// Location of the offending value, relative to the validated root.
    pub path: Vec<PathSegment>,
    /// Description of the expected shape.
    pub expected: String,
    /// Description of what was found.
    pub actual: String,
}

impl ValidationError {
    /// Error at the validated root.
    pub fn new(expected: impl Into<String>, actual: &JsonValue) -> Self {
        Self {
            path: Vec::new(),
            expected: expected.into(),
            actual: describe_value(actual),
        }
    }

    /// A required attribute is absent.
    pub fn missing(attribute: &str, expected: impl Into<String>) -> Self {
        Self {
            path: vec![PathSegment::property(attribute)],
            expected: expected.into(),
            actual: "nothing".to_string(),
        }
    }

    /// Prefix the error path with `segment`.
    pub fn within(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }

    /// The error path as a string; the root renders as `(root)`.
    pub fn path_string(&self) -> String {
        if self.path.is_empty() {
            "(root)".to_string()
        } else {
            format_segments(&self.path)
        }
    }
}

/// Short description of a JSON value for error messages.
pub fn describe_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(_) => "boolean".to_string(),
        JsonValue::Number(_) => "number".to_string(),
        JsonValue::String(s) if s.chars().count() > 32 => {
            let head: String = s.chars().take(32).collect();
            format!("string \"{head}…\"")
        }
        JsonValue::String(s) => format!("string \"{s}\""),
        JsonValue::Array(items) => format!("array of {} items", items.len()),
        JsonValue::Object(map) => match map.get("_type").and_then(|t| t.as_str()) {
            Some(t) => format!("object of type '{t}'"),
            None => "object".to_string(),
        },
    }
}

/// Strip draft and release qualifiers from a document id.
///
/// `drafts.abc` and `versions.spring.abc` both normalize to `abc`.
pub fn normalize_document_id(id: &str) -> &str {
    if let Some(rest) = id.strip_prefix("drafts.") {
        return rest;
    }
    if let Some(rest) = id.strip_prefix("versions.") {
        if let Some((_, published)) = rest.split_once('.') {
            return published;
        }
    }
    id
}

/// A compiled checker for one type.
#[derive(Debug, Clone)]
pub enum Validator {
    /// Accepts any value.
    Any,
    /// String, including `text` and `url`.
    String,
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// RFC 3339 timestamp string.
    Datetime,
    /// `YYYY-MM-DD` string.
    Date,
    /// `{_ref, _type: "reference"}`. Field references normalize `_ref`.
    Reference {
        /// Strip draft/release qualifiers from `_ref`.
        normalize: bool,
    },
    /// Image or file with an `asset` reference.
    Asset {
        /// `image` or `file`.
        kind: &'static str,
    },
    /// `{current, _type: "slug"}`.
    Slug,
    /// Rich-text block.
    Block,
    /// Object or document with known fields.
    Object(ObjectValidator),
    /// Array of one or more member types.
    Array(Vec<ArrayMember>),
    /// Handle to a named type in the compiled table.
    Named {
        /// Type name, for error messages.
        name: String,
        /// Index into the type table.
        slot: usize,
    },
}

/// Field set of an object or document type.
#[derive(Debug, Clone)]
pub struct ObjectValidator {
    /// Expected `_type`, if the object type is named.
    pub type_name: Option<String>,
    /// Documents additionally carry identity attributes.
    pub document: bool,
    /// Known fields in declaration order.
    pub fields: Vec<(String, Validator)>,
}

/// One alternative of an array.
#[derive(Debug, Clone)]
pub struct ArrayMember {
    /// The `_type` elements of this member carry.
    pub name: String,
    /// Element validator.
    pub validator: Validator,
}

/// State of one validation call.
///
/// Union arrays try alternatives in turn, and mutually recursive unions would
/// otherwise re-check the same subtree once per path through the alternatives.
/// Outcomes of named types are kept per `(slot, node address)`; every node
/// borrows from the same root for the whole call, so addresses are stable.
struct Checker<'t> {
    table: &'t [Validator],
    outcomes: HashMap<(usize, usize), Result<JsonValue, ValidationError>>,
}

impl<'t> Checker<'t> {
    fn new(table: &'t [Validator]) -> Self {
        Self {
            table,
            outcomes: HashMap::new(),
        }
    }

    fn named(
        &mut self,
        name: &str,
        slot: usize,
        value: &JsonValue,
    ) -> Result<JsonValue, ValidationError> {
        let key = (slot, value as *const JsonValue as usize);
        if let Some(outcome) = self.outcomes.get(&key) {
            return outcome.clone();
        }
        let table = self.table;
        let outcome = match table.get(slot) {
            Some(validator) => validator.check(value, self),
            None => Err(ValidationError::new(
                format!("value of unresolved type '{name}'"),
                value,
            )),
        };
        self.outcomes.insert(key, outcome.clone());
        outcome
    }
}

impl Validator {
    /// Check `value`, returning its coerced form. `table` resolves
    /// [`Validator::Named`] handles.
    pub fn validate(
        &self,
        value: &JsonValue,
        table: &[Validator],
    ) -> Result<JsonValue, ValidationError> {
        self.check(value, &mut Checker::new(table))
    }

    fn check(&self, value: &JsonValue, cx: &mut Checker<'_>) -> Result<JsonValue, ValidationError> {
        match self {
            Validator::Any => Ok(value.clone()),
            Validator::String => expect(value.is_string(), "string", value),
            Validator::Number => expect(value.is_number(), "number", value),
            Validator::Boolean => expect(value.is_boolean(), "boolean", value),
            Validator::Datetime => {
                let ok = value
                    .as_str()
                    .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok());
                expect(ok, "RFC 3339 datetime string", value)
            }
            Validator::Date => {
                let ok = value
                    .as_str()
                    .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok());
                expect(ok, "date string (YYYY-MM-DD)", value)
            }
            Validator::Reference { normalize } => validate_reference(value, *normalize),
            Validator::Asset { kind } => validate_asset(value, kind),
            Validator::Slug => validate_slug(value),
            Validator::Block => validate_block(value),
            Validator::Object(object) => object.check(value, cx),
            Validator::Array(members) => check_array(members, value, cx),
            Validator::Named { name, slot } => cx.named(name, *slot, value),
        }
    }
}

fn expect(ok: bool, expected: &str, value: &JsonValue) -> Result<JsonValue, ValidationError> {
    if ok {
        Ok(value.clone())
    } else {
        Err(ValidationError::new(expected, value))
    }
}

fn as_object<'a>(
    value: &'a JsonValue,
    expected: &str,
) -> Result<&'a Map<String, JsonValue>, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::new(expected, value))
}

/// `_type` must equal `literal` when present.
fn check_type_literal(map: &Map<String, JsonValue>, literal: &str) -> Result<(), ValidationError> {
    match map.get("_type") {
        None | Some(JsonValue::Null) => Ok(()),
        Some(JsonValue::String(t)) if t == literal => Ok(()),
        Some(other) => {
            Err(ValidationError::new(format!("\"{literal}\""), other)
                .within(PathSegment::property("_type")))
        }
    }
}

fn required_string<'a>(
    map: &'a Map<String, JsonValue>,
    attribute: &str,
) -> Result<&'a str, ValidationError> {
    match map.get(attribute) {
        Some(JsonValue::String(s)) if !s.is_empty() => Ok(s),
        Some(other) => Err(ValidationError::new("non-empty string", other)
            .within(PathSegment::property(attribute))),
        None => Err(ValidationError::missing(attribute, "non-empty string")),
    }
}

fn validate_reference(value: &JsonValue, normalize: bool) -> Result<JsonValue, ValidationError> {
    let map = as_object(value, "reference object {_ref, _type: \"reference\"}")?;
    check_type_literal(map, "reference")?;
    let target = required_string(map, "_ref")?;

    let mut out = map.clone();
    if normalize {
        let published = normalize_document_id(target);
        if published != target {
            out.insert("_ref".to_string(), JsonValue::String(published.to_string()));
        }
    }
    Ok(JsonValue::Object(out))
}

fn validate_asset(value: &JsonValue, kind: &str) -> Result<JsonValue, ValidationError> {
    let map = as_object(value, &format!("{kind} object with an asset reference"))?;
    check_type_literal(map, kind)?;

    let asset = match map.get("asset") {
        Some(asset) => asset,
        None => return Err(ValidationError::missing("asset", "asset reference")),
    };
    let within_asset = |e: ValidationError| e.within(PathSegment::property("asset"));
    let asset_map = as_object(asset, "asset reference").map_err(within_asset)?;
    let target = required_string(asset_map, "_ref").map_err(within_asset)?;
    if !ASSET_REF.is_match(target) {
        return Err(ValidationError::new(
            "asset id like 'image-<id>-<width>x<height>-<format>'",
            &JsonValue::String(target.to_string()),
        )
        .within(PathSegment::property("_ref"))
        .within(PathSegment::property("asset")));
    }
    Ok(value.clone())
}

fn validate_slug(value: &JsonValue) -> Result<JsonValue, ValidationError> {
    let map = as_object(value, "slug object {current, _type: \"slug\"}")?;
    check_type_literal(map, "slug")?;
    match map.get("current") {
        Some(JsonValue::String(_)) => Ok(value.clone()),
        Some(other) => {
            Err(ValidationError::new("string", other).within(PathSegment::property("current")))
        }
        None => Err(ValidationError::missing("current", "string")),
    }
}

fn validate_block(value: &JsonValue) -> Result<JsonValue, ValidationError> {
    let map = as_object(value, "rich-text block")?;
    check_type_literal(map, "block")?;

    for (attribute, validator) in [("style", Validator::String), ("listItem", Validator::String)] {
        if let Some(v) = map.get(attribute).filter(|v| !v.is_null()) {
            validator
                .validate(v, &[])
                .map_err(|e| e.within(PathSegment::property(attribute)))?;
        }
    }
    if let Some(level) = map.get("level").filter(|v| !v.is_null()) {
        if !level.is_number() {
            return Err(
                ValidationError::new("number", level).within(PathSegment::property("level"))
            );
        }
    }
    // Mark definitions are schema-extensible; only the container is checked.
    if let Some(defs) = map.get("markDefs").filter(|v| !v.is_null()) {
        if !defs.is_array() {
            return Err(
                ValidationError::new("array", defs).within(PathSegment::property("markDefs"))
            );
        }
    }

    let children = match map.get("children") {
        Some(JsonValue::Array(children)) => children,
        Some(other) => {
            return Err(ValidationError::new("array of spans", other)
                .within(PathSegment::property("children")))
        }
        None => return Err(ValidationError::missing("children", "array of spans")),
    };
    for (i, child) in children.iter().enumerate() {
        validate_span(child).map_err(|e| {
            e.within(element_segment(child, i))
                .within(PathSegment::property("children"))
        })?;
    }
    Ok(value.clone())
}

fn validate_span(child: &JsonValue) -> Result<(), ValidationError> {
    let map = as_object(child, "span object")?;
    // Inline objects embedded in a block are not spans.
    if map.get("_type").and_then(|t| t.as_str()).is_some_and(|t| t != "span") {
        return Ok(());
    }
    match map.get("text") {
        Some(JsonValue::String(_)) => {}
        Some(other) => {
            return Err(
                ValidationError::new("string", other).within(PathSegment::property("text"))
            )
        }
        None => return Err(ValidationError::missing("text", "string")),
    }
    if let Some(marks) = map.get("marks").filter(|v| !v.is_null()) {
        let ok = marks
            .as_array()
            .is_some_and(|m| m.iter().all(|mark| mark.is_string()));
        if !ok {
            return Err(ValidationError::new("array of mark names", marks)
                .within(PathSegment::property("marks")));
        }
    }
    Ok(())
}

/// Error segment for an array element: its `_key` when it has one.
fn element_segment(element: &JsonValue, index: usize) -> PathSegment {
    match element.get("_key").and_then(|k| k.as_str()) {
        Some(key) => PathSegment::key(key),
        None => PathSegment::Index(index as i64),
    }
}

fn check_array(
    members: &[ArrayMember],
    value: &JsonValue,
    cx: &mut Checker<'_>,
) -> Result<JsonValue, ValidationError> {
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::new("array", value))?;

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let coerced = check_member(members, item, cx)
            .map_err(|e| e.within(element_segment(item, i)))?;
        out.push(coerced);
    }
    Ok(JsonValue::Array(out))
}

fn check_member(
    members: &[ArrayMember],
    item: &JsonValue,
    cx: &mut Checker<'_>,
) -> Result<JsonValue, ValidationError> {
    if let [only] = members {
        return only.validator.check(item, cx);
    }

    // An element naming one of the alternatives is held to that alternative.
    if let Some(t) = item.get("_type").and_then(|t| t.as_str()) {
        if let Some(member) = members.iter().find(|m| m.name == t) {
            return member.validator.check(item, cx);
        }
    }

    for member in members {
        if let Ok(coerced) = member.validator.check(item, cx) {
            return Ok(coerced);
        }
    }
    let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
    Err(ValidationError::new(
        format!("one of [{}]", names.join(", ")),
        item,
    ))
}

impl ObjectValidator {
    fn check(&self, value: &JsonValue, cx: &mut Checker<'_>) -> Result<JsonValue, ValidationError> {
        let expected = match &self.type_name {
            Some(name) if self.document => format!("document of type '{name}'"),
            Some(name) => format!("object of type '{name}'"),
            None => "object".to_string(),
        };
        let map = as_object(value, &expected)?;

        if self.document {
            self.validate_identity(map)?;
        } else if let Some(name) = &self.type_name {
            check_type_literal(map, name)?;
        }

        let mut out = map.clone();
        for (field, validator) in &self.fields {
            let Some(v) = map.get(field) else { continue };
            if v.is_null() {
                continue;
            }
            let coerced = validator
                .check(v, cx)
                .map_err(|e| e.within(PathSegment::property(field.as_str())))?;
            out.insert(field.clone(), coerced);
        }
        Ok(JsonValue::Object(out))
    }

    fn validate_identity(&self, map: &Map<String, JsonValue>) -> Result<(), ValidationError> {
        let name = self.type_name.as_deref().unwrap_or_default();
        match map.get("_type") {
            Some(JsonValue::String(t)) if t == name => {}
            Some(other) => {
                return Err(ValidationError::new(format!("\"{name}\""), other)
                    .within(PathSegment::property("_type")))
            }
            None => return Err(ValidationError::missing("_type", format!("\"{name}\""))),
        }

        let identity = [
            ("_id", Validator::String),
            ("_rev", Validator::String),
            ("_createdAt", Validator::Datetime),
            ("_updatedAt", Validator::Datetime),
        ];
        for (attribute, validator) in identity {
            if let Some(v) = map.get(attribute).filter(|v| !v.is_null()) {
                validator
                    .validate(v, &[])
                    .map_err(|e| e.within(PathSegment::property(attribute)))?;
            }
        }
        Ok(())
    }
}
