//! Applying patch operations to a document value.

use serde_json::{Map, Number, Value as JsonValue};

use super::dmp::apply_patch_text;
use crate::patch::{InsertOperation, InsertPosition, PatchOperation};
use crate::path::{PathAddress, PathSegment};

/// Apply `operations` to `doc` in order. On error `doc` may be partially
/// modified; callers work on a copy.
pub fn apply_patch(doc: &mut JsonValue, operations: &[PatchOperation]) -> Result<(), String> {
    for operation in operations {
        match operation {
            PatchOperation::Set(values) => {
                for (path, value) in values.iter() {
                    set_at(doc, path.segments(), value.clone())
                        .map_err(|e| format!("set {path}: {e}"))?;
                }
            }
            PatchOperation::SetIfMissing(values) => {
                for (path, value) in values.iter() {
                    if get(doc, path.segments()).is_none() {
                        set_at(doc, path.segments(), value.clone())
                            .map_err(|e| format!("setIfMissing {path}: {e}"))?;
                    }
                }
            }
            PatchOperation::Unset(paths) => {
                for path in paths {
                    unset_at(doc, path);
                }
            }
            PatchOperation::Inc(values) => {
                for (path, amount) in values.iter() {
                    add_at(doc, path, amount, 1.0).map_err(|e| format!("inc {path}: {e}"))?;
                }
            }
            PatchOperation::Dec(values) => {
                for (path, amount) in values.iter() {
                    add_at(doc, path, amount, -1.0).map_err(|e| format!("dec {path}: {e}"))?;
                }
            }
            PatchOperation::Insert(insert) => {
                insert_at(doc, insert).map_err(|e| format!("insert {}: {e}", insert.selector))?
            }
            PatchOperation::DiffMatchPatch(values) => {
                for (path, patch) in values.iter() {
                    text_patch_at(doc, path, patch)
                        .map_err(|e| format!("diffMatchPatch {path}: {e}"))?;
                }
            }
        }
    }
    Ok(())
}

/// Resolve an array position; negative positions count from the end.
fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let resolved = if index < 0 {
        len as i64 + index
    } else {
        index
    };
    (0..len as i64).contains(&resolved).then_some(resolved as usize)
}

fn element_index(items: &[JsonValue], segment: &PathSegment) -> Option<usize> {
    match segment {
        PathSegment::Index(i) => resolve_index(items.len(), *i),
        PathSegment::KeyMatch(key) => items
            .iter()
            .position(|item| item.get("_key").and_then(JsonValue::as_str) == Some(key)),
        _ => None,
    }
}

fn get<'a>(value: &'a JsonValue, segments: &[PathSegment]) -> Option<&'a JsonValue> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value);
    };
    let child = match (head, value) {
        (PathSegment::Property(name), JsonValue::Object(map)) => map.get(name)?,
        (_, JsonValue::Array(items)) => &items[element_index(items, head)?],
        _ => return None,
    };
    get(child, rest)
}

fn get_mut<'a>(value: &'a mut JsonValue, segments: &[PathSegment]) -> Option<&'a mut JsonValue> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value);
    };
    let child = match (head, value) {
        (PathSegment::Property(name), JsonValue::Object(map)) => map.get_mut(name)?,
        (_, JsonValue::Array(items)) => {
            let i = element_index(items, head)?;
            &mut items[i]
        }
        _ => return None,
    };
    get_mut(child, rest)
}

/// Write `value` at `segments`, creating intermediate objects for missing
/// properties. Array elements must already exist.
fn set_at(
    target: &mut JsonValue,
    segments: &[PathSegment],
    value: JsonValue,
) -> Result<(), String> {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return Ok(());
    };
    match head {
        PathSegment::Property(name) => {
            if target.is_null() {
                *target = JsonValue::Object(Map::new());
            }
            let map = target
                .as_object_mut()
                .ok_or_else(|| format!("cannot set '{name}' on a non-object"))?;
            let child = map.entry(name.clone()).or_insert(JsonValue::Null);
            set_at(child, rest, value)
        }
        PathSegment::Index(_) | PathSegment::KeyMatch(_) => {
            let items = target
                .as_array_mut()
                .ok_or_else(|| "cannot select an element of a non-array".to_string())?;
            let i = element_index(items, head)
                .ok_or_else(|| "array element does not exist".to_string())?;
            set_at(&mut items[i], rest, value)
        }
        PathSegment::IndexRange(..) => Err("index ranges cannot be written".to_string()),
    }
}

fn unset_at(doc: &mut JsonValue, path: &PathAddress) {
    let parent_segments = &path.segments()[..path.len() - 1];
    let Some(parent) = get_mut(doc, parent_segments) else {
        return;
    };
    match (path.last(), parent) {
        (PathSegment::Property(name), JsonValue::Object(map)) => {
            map.remove(name);
        }
        (segment, JsonValue::Array(items)) => {
            if let Some(i) = element_index(items, segment) {
                items.remove(i);
            }
        }
        _ => {}
    }
}

fn add_at(
    doc: &mut JsonValue,
    path: &PathAddress,
    amount: &JsonValue,
    sign: f64,
) -> Result<(), String> {
    let Some(target) = get_mut(doc, path.segments()) else {
        return Ok(());
    };
    let current = match target {
        JsonValue::Number(n) => n.clone(),
        other => return Err(format!("target is {}, not a number", kind_of(other))),
    };
    let amount = match amount {
        JsonValue::Number(n) => n,
        _ => return Err("amount must be a number".to_string()),
    };

    let integral = current
        .as_i64()
        .zip(amount.as_i64())
        .and_then(|(a, b)| if sign < 0.0 { a.checked_sub(b) } else { a.checked_add(b) });
    *target = match integral {
        Some(sum) => JsonValue::Number(sum.into()),
        None => {
            let sum = current.as_f64().unwrap_or(0.0) + sign * amount.as_f64().unwrap_or(0.0);
            Number::from_f64(sum)
                .map(JsonValue::Number)
                .ok_or_else(|| "result is not a finite number".to_string())?
        }
    };
    Ok(())
}

fn insert_at(doc: &mut JsonValue, insert: &InsertOperation) -> Result<(), String> {
    let selector = &insert.selector;
    let array_segments = &selector.segments()[..selector.len() - 1];
    let items = get_mut(doc, array_segments)
        .and_then(JsonValue::as_array_mut)
        .ok_or_else(|| "no array at the selector".to_string())?;

    let anchor = match element_index(items, selector.last()) {
        Some(i) => i,
        // Positional inserts into an empty array land at the start.
        None if items.is_empty() && matches!(selector.last(), PathSegment::Index(0 | -1)) => {
            if insert.position == InsertPosition::Replace {
                return Err("nothing to replace in an empty array".to_string());
            }
            items.splice(0..0, insert.items.iter().cloned());
            return Ok(());
        }
        None => return Err("selected element does not exist".to_string()),
    };

    let range = match insert.position {
        InsertPosition::Before => anchor..anchor,
        InsertPosition::After => anchor + 1..anchor + 1,
        InsertPosition::Replace => anchor..anchor + 1,
    };
    items.splice(range, insert.items.iter().cloned());
    Ok(())
}

fn text_patch_at(doc: &mut JsonValue, path: &PathAddress, patch: &JsonValue) -> Result<(), String> {
    let patch = patch
        .as_str()
        .ok_or_else(|| "patch must be a string".to_string())?;
    let target = get_mut(doc, path.segments()).ok_or_else(|| "no value at path".to_string())?;
    let text = target
        .as_str()
        .ok_or_else(|| format!("target is {}, not a string", kind_of(target)))?;
    *target = JsonValue::String(apply_patch_text(text, patch)?);
    Ok(())
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// Values at `path` for reads; ranges may select several elements.
pub(crate) fn select<'a>(value: &'a JsonValue, segments: &[PathSegment]) -> Vec<&'a JsonValue> {
    let Some((head, rest)) = segments.split_first() else {
        return vec![value];
    };
    match (head, value) {
        (PathSegment::IndexRange(from, to), JsonValue::Array(items)) => {
            let len = items.len() as i64;
            let clamp = |bound: i64| (if bound < 0 { len + bound } else { bound }).clamp(0, len);
            let start = from.map_or(0, clamp) as usize;
            let end = to.map_or(len, clamp) as usize;
            items
                .get(start..end.max(start))
                .unwrap_or_default()
                .iter()
                .flat_map(|item| select(item, rest))
                .collect()
        }
        (PathSegment::IndexRange(..), _) => Vec::new(),
        _ => get(value, std::slice::from_ref(head))
            .map(|child| select(child, rest))
            .unwrap_or_default(),
    }
}
