//! Built-in evaluator for query-transform requests.
//!
//! Supports the path subset of the jq language:
//!
//! | filter          | meaning                                   |
//! |-----------------|-------------------------------------------|
//! | `.`             | the input itself                          |
//! | `.name`         | object field                              |
//! | `."any name"`   | object field with a quoted name           |
//! | `.[2]`, `.[-1]` | array element, negative counts from the end |
//! | `.[]`           | every array element or object value       |
//! | `a \| b`        | feed every result of `a` into `b`         |
//!
//! Segments chain (`.items[].name`). Missing fields and out-of-range
//! indexes yield `null`, and any path applied to `null` is `null`.
//!
//! Results are pretty-printed with a two-space indent and sorted object
//! keys. Integral numbers print without a fraction (`1.0` prints as `1`).
//! `<`, `>`, `&`, U+2028 and U+2029 are escaped as `\uXXXX` so output can be
//! embedded in HTML.

use crate::dispatcher::{QueryEvaluator, SendError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SEGMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:\.?\[\s*(-?\d+)?\s*\]|\.([A-Za-z_][A-Za-z0-9_]*)|\."((?:[^"\\]|\\.)*)")"#)
        .expect("Failed to compile path segment regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(i64),
    Iterate,
}

/// Query evaluator for `.`-paths and `|` pipelines.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathEvaluator;

impl QueryEvaluator for PathEvaluator {
    fn evaluate(&self, filter: &str, input: &Value) -> Result<Vec<String>, SendError> {
        let stages = parse(filter)?;
        let mut values = vec![input.clone()];
        for stage in &stages {
            for segment in stage {
                let mut next = Vec::with_capacity(values.len());
                for value in values {
                    apply(segment, value, &mut next)?;
                }
                values = next;
            }
        }
        values.into_iter().map(render).collect()
    }
}

fn render(mut value: Value) -> Result<String, SendError> {
    normalize_numbers(&mut value);
    let text = serde_json::to_string_pretty(&value)
        .map_err(|e| SendError::new("encode result").with_source(e))?;
    Ok(escape_html(&text))
}

/// Rewrites floats with no fractional part as integers.
fn normalize_numbers(value: &mut Value) {
    match value {
        Value::Number(number) if number.is_f64() => {
            let Some(float) = number.as_f64() else { return };
            let in_range = float >= i64::MIN as f64 && float < i64::MAX as f64;
            let negative_zero = float == 0.0 && float.is_sign_negative();
            if float.fract() == 0.0 && in_range && !negative_zero {
                *number = (float as i64).into();
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_numbers),
        Value::Object(map) => map.values_mut().for_each(normalize_numbers),
        _ => {}
    }
}

/// Escapes characters that JSON allows raw but HTML-safe encoders do not.
/// They can only occur inside string literals of the encoded text.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

fn parse(filter: &str) -> Result<Vec<Vec<Segment>>, SendError> {
    split_pipes(filter)
        .into_iter()
        .map(|stage| parse_stage(stage.trim()))
        .collect()
}

/// Splits on `|` outside quoted field names.
fn split_pipes(filter: &str) -> Vec<&str> {
    let mut stages = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in filter.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '|' if !quoted => {
                stages.push(&filter[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    stages.push(&filter[start..]);
    stages
}

fn parse_stage(stage: &str) -> Result<Vec<Segment>, SendError> {
    if stage.is_empty() || stage == "." {
        return Ok(Vec::new());
    }
    if !stage.starts_with('.') {
        return Err(SendError::new(format!(
            "unsupported filter {:?}: paths must start with '.'",
            stage
        )));
    }

    let mut segments = Vec::new();
    let mut rest = stage;
    while !rest.is_empty() {
        let caps = SEGMENT_REGEX.captures(rest).ok_or_else(|| {
            SendError::new(format!("unsupported filter {:?} at {:?}", stage, rest))
        })?;
        let segment = if let Some(field) = caps.get(2) {
            Segment::Field(field.as_str().to_string())
        } else if let Some(quoted) = caps.get(3) {
            let name: String = serde_json::from_str(&format!("\"{}\"", quoted.as_str()))
                .map_err(|e| SendError::new("invalid quoted field name").with_source(e))?;
            Segment::Field(name)
        } else if let Some(index) = caps.get(1) {
            let index = index
                .as_str()
                .parse()
                .map_err(|e| SendError::new("invalid array index").with_source(e))?;
            Segment::Index(index)
        } else {
            Segment::Iterate
        };
        segments.push(segment);
        rest = &rest[caps[0].len()..];
    }
    Ok(segments)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn apply(segment: &Segment, value: Value, out: &mut Vec<Value>) -> Result<(), SendError> {
    match (segment, value) {
        (Segment::Field(name), Value::Object(mut map)) => {
            out.push(map.remove(name).unwrap_or(Value::Null));
        }
        (Segment::Index(index), Value::Array(mut items)) => {
            let len = items.len() as i64;
            let at = if *index < 0 { len + index } else { *index };
            if (0..len).contains(&at) {
                out.push(items.swap_remove(at as usize));
            } else {
                out.push(Value::Null);
            }
        }
        (Segment::Field(_) | Segment::Index(_), Value::Null) => out.push(Value::Null),
        (Segment::Iterate, Value::Array(items)) => out.extend(items),
        (Segment::Iterate, Value::Object(map)) => out.extend(map.into_iter().map(|(_, v)| v)),
        (Segment::Field(name), other) => {
            return Err(SendError::new(format!(
                "cannot index {} with \"{}\"",
                type_name(&other),
                name
            )))
        }
        (Segment::Index(_), other) => {
            return Err(SendError::new(format!(
                "cannot index {} with number",
                type_name(&other)
            )))
        }
        (Segment::Iterate, other) => {
            return Err(SendError::new(format!(
                "cannot iterate over {}",
                type_name(&other)
            )))
        }
    }
    Ok(())
}
