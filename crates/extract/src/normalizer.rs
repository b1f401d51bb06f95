//! Turns a raw model completion into a complete [`ExtractionRecord`].

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

use crate::schema::{CONTACT_INFO, CONTACT_KEYS, ExtractionRecord, FIELDS, NOT_SPECIFIED};

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?si)^```\s*(?:json\b)?\s*(.*?)\s*(?:```)?\s*$").expect("valid fence pattern")
});

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("model output is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),
    #[error("model output is JSON but not an object (got {0})")]
    NotObject(&'static str),
}

/// Remove a surrounding triple-backtick fence and optional `json` tag.
///
/// Text that does not start with a fence is only trimmed.
pub fn strip_code_fence(completion: &str) -> &str {
    let trimmed = completion.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    CODE_FENCE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |body| body.as_str())
}

/// Parse a completion and back-fill every missing schema field.
pub fn parse_completion(completion: &str) -> Result<ExtractionRecord, ParseError> {
    let body = strip_code_fence(completion);
    let value: Value = serde_json::from_str(body)?;

    match value {
        Value::Object(map) => Ok(normalize(map)),
        other => Err(ParseError::NotObject(json_kind(&other))),
    }
}

/// Schema fields first in schema order, then extras in model order.
pub fn normalize(parsed: Map<String, Value>) -> ExtractionRecord {
    let mut record = Map::with_capacity(parsed.len().max(FIELDS.len()));

    for field in FIELDS {
        let value = parsed.get(field).cloned();
        let value = if field == CONTACT_INFO {
            normalize_contact(value)
        } else {
            normalize_field(value)
        };
        record.insert(field.to_string(), value);
    }

    // Keys that were not asked for pass through untouched
    record.extend(
        parsed
            .into_iter()
            .filter(|(key, _)| !FIELDS.contains(&key.as_str())),
    );

    ExtractionRecord::from_map(record)
}

fn normalize_field(value: Option<Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::from(NOT_SPECIFIED),
        Some(Value::Number(n)) => Value::from(n.to_string()),
        Some(Value::Bool(b)) => Value::from(b.to_string()),
        Some(other) => other,
    }
}

fn normalize_contact(value: Option<Value>) -> Value {
    let contact = match value {
        Some(Value::Object(map)) => map,
        Some(Value::String(text)) if !text.trim().is_empty() && text.trim() != NOT_SPECIFIED => {
            let mut map = Map::new();
            map.insert("Name".to_string(), Value::from(text));
            map
        }
        _ => Map::new(),
    };

    let mut normalized = Map::with_capacity(contact.len().max(CONTACT_KEYS.len()));
    for key in CONTACT_KEYS {
        normalized.insert(key.to_string(), normalize_field(contact.get(key).cloned()));
    }
    normalized.extend(
        contact
            .into_iter()
            .filter(|(key, _)| !CONTACT_KEYS.contains(&key.as_str())),
    );

    Value::Object(normalized)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
