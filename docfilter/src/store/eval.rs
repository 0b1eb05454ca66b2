//! Query-language evaluation over in-memory documents.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use super::StoreError;
use super::geometry::{contains_point, haversine_distance, planar_distance, point_of};
use crate::Document;

static NULL: Value = Value::Null;

const REGEX_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(32).unwrap();

// One predicate is evaluated against every document, so its pattern is
// compiled once per thread rather than once per row.
thread_local! {
    static REGEX_CACHE: RefCell<LruCache<(String, String), Regex>> =
        RefCell::new(LruCache::new(REGEX_CACHE_SIZE));
}

fn invalid(message: impl Into<String>) -> StoreError {
    StoreError::InvalidPipeline(message.into())
}

/// Values at a dotted path. Arrays of objects are walked element-wise and a
/// numeric segment indexes into an array.
pub(super) fn resolve<'a>(document: &'a Document, path: &str) -> Vec<&'a Value> {
    let mut out = Vec::new();
    let (head, rest) = path.split_once('.').unwrap_or((path, ""));
    if let Some(value) = document.get(head) {
        let segments: Vec<&str> = rest.split('.').filter(|s| !s.is_empty()).collect();
        descend(value, &segments, &mut out);
    }
    out
}

fn descend<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Object(object) => {
            if let Some(next) = object.get(*head) {
                descend(next, rest, out);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                if let Some(item) = items.get(index) {
                    descend(item, rest, out);
                }
            } else {
                for item in items.iter().filter(|item| item.is_object()) {
                    descend(item, segments, out);
                }
            }
        }
        _ => {}
    }
}

const fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order across JSON values: null < numbers < strings < objects < arrays < booleans.
pub(super) fn compare(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b)
            .map(|(x, y)| compare(x, y))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Value::Object(a), Value::Object(b)) => a
            .iter()
            .zip(b)
            .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| compare(va, vb)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        _ => rank(left).cmp(&rank(right)),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => true,
    }
}

/// Each value plus, for arrays, their elements.
fn expand<'a>(values: &[&'a Value]) -> Vec<&'a Value> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        out.push(*value);
        if let Value::Array(items) = value {
            out.extend(items.iter());
        }
    }
    out
}

fn operator_object(value: &Value) -> Option<&Document> {
    value
        .as_object()
        .filter(|object| !object.is_empty() && object.keys().all(|key| key.starts_with('$')))
}

fn equals_any(values: &[&Value], target: &Value) -> bool {
    if values.is_empty() {
        return target.is_null();
    }
    expand(values)
        .into_iter()
        .any(|candidate| compare(candidate, target).is_eq())
}

fn compares(values: &[&Value], target: &Value, accept: fn(Ordering) -> bool) -> bool {
    expand(values)
        .into_iter()
        .any(|candidate| rank(candidate) == rank(target) && accept(compare(candidate, target)))
}

fn in_array(values: &[&Value], operand: &Value) -> Result<bool, StoreError> {
    let items = operand
        .as_array()
        .ok_or_else(|| invalid("$in/$nin need an array"))?;
    Ok(items.iter().any(|item| equals_any(values, item)))
}

/// Compile `pattern` with `$options` flags, reusing a cached build.
fn build_regex(pattern: &str, options: &str) -> Result<Regex, StoreError> {
    let key = (pattern.to_string(), options.to_string());
    if let Some(regex) = REGEX_CACHE.with(|cache| cache.borrow_mut().get(&key).cloned()) {
        return Ok(regex);
    }
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .ignore_whitespace(options.contains('x'))
        .build()
        .map_err(|e| StoreError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
    REGEX_CACHE.with(|cache| cache.borrow_mut().put(key, regex.clone()));
    Ok(regex)
}

fn regex_matches(values: &[&Value], operand: &Value, options: &str) -> Result<bool, StoreError> {
    let pattern = operand.as_str().ok_or_else(|| StoreError::InvalidPattern {
        pattern: operand.to_string(),
        reason: "pattern must be a string".to_string(),
    })?;
    let regex = build_regex(pattern, options)?;
    Ok(expand(values)
        .into_iter()
        .filter_map(Value::as_str)
        .any(|text| regex.is_match(text)))
}

fn geo_intersects(values: &[&Value], operand: &Value) -> Result<bool, StoreError> {
    let (lng, lat) = operand
        .get("$geometry")
        .and_then(point_of)
        .ok_or_else(|| StoreError::UnsupportedOperator("$geoIntersects without a Point".to_string()))?;
    Ok(values.iter().any(|geometry| contains_point(geometry, lng, lat)))
}

fn operator_matches(
    values: &[&Value],
    operator: &str,
    operand: &Value,
    siblings: &Document,
) -> Result<bool, StoreError> {
    Ok(match operator {
        "$eq" => equals_any(values, operand),
        "$ne" => !equals_any(values, operand),
        "$gt" => compares(values, operand, Ordering::is_gt),
        "$gte" => compares(values, operand, Ordering::is_ge),
        "$lt" => compares(values, operand, Ordering::is_lt),
        "$lte" => compares(values, operand, Ordering::is_le),
        "$in" => in_array(values, operand)?,
        "$nin" => !in_array(values, operand)?,
        "$not" => !field_matches(values, operand)?,
        "$regex" => {
            let options = siblings
                .get("$options")
                .and_then(Value::as_str)
                .unwrap_or_default();
            regex_matches(values, operand, options)?
        }
        "$options" => true,
        "$exists" => values.is_empty() != truthy(operand),
        "$geoIntersects" => geo_intersects(values, operand)?,
        other => return Err(StoreError::UnsupportedOperator(other.to_string())),
    })
}

fn field_matches(values: &[&Value], condition: &Value) -> Result<bool, StoreError> {
    let Some(operators) = operator_object(condition) else {
        return Ok(equals_any(values, condition));
    };
    for (operator, operand) in operators {
        if !operator_matches(values, operator, operand, operators)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn branches(condition: &Value) -> Result<Vec<&Document>, StoreError> {
    condition
        .as_array()
        .ok_or_else(|| invalid("logical operators need an array"))?
        .iter()
        .map(|branch| {
            branch
                .as_object()
                .ok_or_else(|| invalid("logical operator branches must be objects"))
        })
        .collect()
}

fn any_branch(document: &Document, condition: &Value) -> Result<bool, StoreError> {
    for branch in branches(condition)? {
        if matches(document, branch)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Whether `document` satisfies `predicate`.
pub(super) fn matches(document: &Document, predicate: &Document) -> Result<bool, StoreError> {
    for (key, condition) in predicate {
        let satisfied = match key.as_str() {
            "$and" => {
                let mut all = true;
                for branch in branches(condition)? {
                    if !matches(document, branch)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => any_branch(document, condition)?,
            "$nor" => !any_branch(document, condition)?,
            other if other.starts_with('$') => {
                return Err(StoreError::UnsupportedOperator(other.to_string()));
            }
            path => field_matches(&resolve(document, path), condition)?,
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn stage_object<'a>(kind: &str, body: &'a Value) -> Result<&'a Document, StoreError> {
    body.as_object()
        .ok_or_else(|| invalid(format!("{kind} expects an object")))
}

fn stage_count(kind: &str, body: &Value) -> Result<usize, StoreError> {
    body.as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(format!("{kind} expects a non-negative integer")))
}

fn filter(documents: Vec<Document>, predicate: &Document) -> Result<Vec<Document>, StoreError> {
    let mut kept = Vec::with_capacity(documents.len());
    for document in documents {
        if matches(&document, predicate)? {
            kept.push(document);
        }
    }
    Ok(kept)
}

fn geo_near(
    documents: Vec<Document>,
    body: &Document,
    default_key: Option<&str>,
) -> Result<Vec<Document>, StoreError> {
    let (lng, lat) = body
        .get("near")
        .and_then(point_of)
        .ok_or_else(|| invalid("$geoNear needs a `near` point"))?;
    let distance_field = body
        .get("distanceField")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("$geoNear needs a `distanceField`"))?;
    let max_distance = body
        .get("maxDistance")
        .and_then(Value::as_f64)
        .unwrap_or(f64::INFINITY);
    let min_distance = body
        .get("minDistance")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let spherical = body
        .get("spherical")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let key = body
        .get("key")
        .and_then(Value::as_str)
        .or(default_key)
        .ok_or_else(|| invalid("$geoNear needs a geo index or a `key`"))?;
    let empty = Document::new();
    let query = match body.get("query") {
        None => &empty,
        Some(query) => stage_object("$geoNear query", query)?,
    };

    let mut located = Vec::new();
    for mut document in documents {
        let Some((x, y)) = resolve(&document, key).into_iter().find_map(point_of) else {
            continue;
        };
        let distance = if spherical {
            haversine_distance(lat, lng, y, x)
        } else {
            planar_distance(lat, lng, y, x)
        };
        if distance > max_distance || distance < min_distance || !matches(&document, query)? {
            continue;
        }
        document.insert(distance_field.to_string(), Value::from(distance));
        located.push((distance, document));
    }
    located.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(located.into_iter().map(|(_, document)| document).collect())
}

fn expression(document: &Document, expression: &Value) -> Option<Value> {
    match expression {
        Value::String(path) if path.starts_with('$') => {
            resolve(document, &path[1..]).first().map(|value| (*value).clone())
        }
        literal => Some(literal.clone()),
    }
}

fn accumulate(target: &mut Document, name: &str, accumulator: &str, value: Option<Value>) {
    match accumulator {
        "$first" => {
            if !target.contains_key(name) {
                target.insert(name.to_string(), value.unwrap_or(Value::Null));
            }
        }
        "$addToSet" | "$push" => {
            let entry = target
                .entry(name.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let (Value::Array(items), Some(value)) = (entry, value) {
                if accumulator == "$push" || !items.iter().any(|item| compare(item, &value).is_eq()) {
                    items.push(value);
                }
            }
        }
        "$sum" => {
            let add = value.as_ref().and_then(Value::as_f64).unwrap_or(0.0);
            let entry = target
                .entry(name.to_string())
                .or_insert_with(|| Value::from(0.0));
            let current = entry.as_f64().unwrap_or(0.0);
            *entry = Value::from(current + add);
        }
        _ => {}
    }
}

/// Groups in first-seen order.
fn group(documents: &[Document], body: &Document) -> Result<Vec<Document>, StoreError> {
    let id = body
        .get("_id")
        .ok_or_else(|| invalid("$group needs an `_id`"))?;

    let mut columns = Vec::with_capacity(body.len());
    for (name, spec) in body.iter().filter(|(name, _)| name.as_str() != "_id") {
        let Some((accumulator, path)) = spec
            .as_object()
            .filter(|object| object.len() == 1)
            .and_then(|object| object.iter().next())
        else {
            return Err(invalid(format!("$group column `{name}` needs one accumulator")));
        };
        if !matches!(accumulator.as_str(), "$first" | "$addToSet" | "$push" | "$sum") {
            return Err(StoreError::UnsupportedOperator(accumulator.clone()));
        }
        columns.push((name.as_str(), accumulator.as_str(), path));
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Document> = Vec::new();
    for document in documents {
        let key = expression(document, id).unwrap_or(Value::Null);
        let slot = *index.entry(key.to_string()).or_insert_with(|| {
            let mut fresh = Document::new();
            fresh.insert("_id".to_string(), key.clone());
            groups.push(fresh);
            groups.len() - 1
        });
        for (name, accumulator, path) in &columns {
            accumulate(&mut groups[slot], name, accumulator, expression(document, path));
        }
    }
    Ok(groups)
}

fn sort(mut documents: Vec<Document>, body: &Document) -> Result<Vec<Document>, StoreError> {
    let mut keys = Vec::with_capacity(body.len());
    for (field, direction) in body {
        let descending = match direction.as_i64() {
            Some(1) => false,
            Some(-1) => true,
            _ => return Err(invalid(format!("$sort direction for `{field}` must be 1 or -1"))),
        };
        keys.push((field.as_str(), descending));
    }

    documents.sort_by(|a, b| {
        for (field, descending) in &keys {
            let left = resolve(a, field).first().copied().unwrap_or(&NULL);
            let right = resolve(b, field).first().copied().unwrap_or(&NULL);
            let ordering = compare(left, right);
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering.is_ne() {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(documents)
}

fn project(documents: Vec<Document>, body: &Document) -> Result<Vec<Document>, StoreError> {
    if body.values().all(|flag| !truthy(flag)) {
        return Ok(documents
            .into_iter()
            .map(|mut document| {
                for field in body.keys() {
                    remove_path(&mut document, field);
                }
                document
            })
            .collect());
    }

    let keep_id = body.get("_id").is_none_or(truthy);
    let mut shaped = Vec::with_capacity(documents.len());
    for document in documents {
        let mut kept = Document::new();
        if keep_id {
            if let Some(id) = document.get("_id") {
                kept.insert("_id".to_string(), id.clone());
            }
        }
        for (field, flag) in body.iter().filter(|(field, flag)| *field != "_id" && truthy(flag)) {
            if let Some(value) = resolve(&document, field).first() {
                set_path(&mut kept, field, (*value).clone())?;
            }
        }
        shaped.push(kept);
    }
    Ok(shaped)
}

/// Run `pipeline` over `documents`. `$geoNear` is accepted only as the first stage.
pub(super) fn run(
    mut documents: Vec<Document>,
    pipeline: &[Document],
    geo_key: Option<&str>,
) -> Result<Vec<Document>, StoreError> {
    for (position, stage) in pipeline.iter().enumerate() {
        let mut entries = stage.iter();
        let (Some((kind, body)), None) = (entries.next(), entries.next()) else {
            return Err(invalid(format!("stage {position} must have exactly one key")));
        };
        documents = match kind.as_str() {
            "$match" => filter(documents, stage_object(kind, body)?)?,
            "$geoNear" if position == 0 => geo_near(documents, stage_object(kind, body)?, geo_key)?,
            "$geoNear" => {
                return Err(invalid(format!(
                    "$geoNear is only valid as the first stage, found at {position}"
                )));
            }
            "$group" => group(&documents, stage_object(kind, body)?)?,
            "$sort" => sort(documents, stage_object(kind, body)?)?,
            "$skip" => {
                let n = stage_count(kind, body)?;
                documents.into_iter().skip(n).collect()
            }
            "$limit" => {
                let n = stage_count(kind, body)?;
                documents.into_iter().take(n).collect()
            }
            "$project" => project(documents, stage_object(kind, body)?)?,
            other => return Err(StoreError::UnsupportedOperator(other.to_string())),
        };
    }
    Ok(documents)
}

/// Set a dotted path, creating intermediate objects. Returns the previous value.
pub(super) fn set_path(
    document: &mut Document,
    path: &str,
    value: Value,
) -> Result<Option<Value>, StoreError> {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    let mut current = document;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        current = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Document::new()))
            .as_object_mut()
            .ok_or_else(|| {
                StoreError::InvalidMutation(format!("cannot set `{path}`: `{segment}` is not an object"))
            })?;
    }
    Ok(current.insert(leaf.to_string(), value))
}

pub(super) fn remove_path(document: &mut Document, path: &str) -> Option<Value> {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    let mut current = document;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        current = current.get_mut(segment)?.as_object_mut()?;
    }
    current.remove(leaf)
}

fn validate_mutation(mutation: &Document) -> Result<(), StoreError> {
    if mutation.is_empty() {
        return Err(StoreError::InvalidMutation("empty mutation".to_string()));
    }
    for (operator, fields) in mutation {
        if !matches!(operator.as_str(), "$set" | "$unset" | "$rename") {
            return Err(StoreError::InvalidMutation(format!(
                "unsupported update operator {operator}"
            )));
        }
        if !fields.is_object() {
            return Err(StoreError::InvalidMutation(format!("{operator} expects an object")));
        }
    }
    if let Some(renames) = mutation.get("$rename").and_then(Value::as_object) {
        if let Some((from, _)) = renames.iter().find(|(_, to)| !to.is_string()) {
            return Err(StoreError::InvalidMutation(format!(
                "$rename target for `{from}` must be a string"
            )));
        }
    }
    Ok(())
}

/// Apply `$set`, `$unset` and `$rename`. Returns whether anything changed.
pub(super) fn apply_mutation(document: &mut Document, mutation: &Document) -> Result<bool, StoreError> {
    validate_mutation(mutation)?;
    let mut modified = false;
    for (operator, fields) in mutation {
        let Some(fields) = fields.as_object() else {
            continue;
        };
        match operator.as_str() {
            "$set" => {
                for (path, value) in fields {
                    let previous = set_path(document, path, value.clone())?;
                    modified |= previous.as_ref() != Some(value);
                }
            }
            "$unset" => {
                for path in fields.keys() {
                    modified |= remove_path(document, path).is_some();
                }
            }
            "$rename" => {
                for (from, to) in fields {
                    let Some(to) = to.as_str() else { continue };
                    if let Some(value) = remove_path(document, from) {
                        set_path(document, to, value)?;
                        modified = true;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(modified)
}

/// Starting document for an upsert: the predicate's plain equality fields.
pub(super) fn upsert_seed(predicate: &Document) -> Result<Document, StoreError> {
    let mut seed = Document::new();
    for (path, value) in predicate {
        if !path.starts_with('$') && operator_object(value).is_none() {
            set_path(&mut seed, path, value.clone())?;
        }
    }
    Ok(seed)
}
