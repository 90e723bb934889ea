//! Structured Response Parsing
//!
//! Generation providers answer in free-form text even when asked for JSON.
//! Parsing tries, in order:
//! - a fenced ```json block
//! - any fenced ``` block
//! - the whole (trimmed) text
//! - the first balanced JSON object/array embedded in prose
//!
//! Anything else is a [`SeoError::MalformedResponse`].

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::types::{Result, SeoError};

static JSON_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid fence regex"));

static ANY_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)\s*```").expect("valid fence regex"));

/// Extract a JSON value from a provider reply
pub fn extract_json(content: &str) -> Result<Value> {
    let trimmed = content.trim().trim_start_matches('\u{feff}');
    if trimmed.is_empty() {
        return Err(SeoError::malformed("empty response", content));
    }

    for candidate in candidates(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return Ok(value);
        }
    }

    if let Some(embedded) = balanced_json(trimmed)
        && let Ok(value) = serde_json::from_str::<Value>(embedded)
    {
        debug!("JSON extracted from surrounding prose");
        return Ok(value);
    }

    Err(SeoError::malformed("no valid JSON found in response", content))
}

/// Extract and deserialize a structured payload into `T`
pub fn parse_structured<T: DeserializeOwned>(content: &str) -> Result<T> {
    let value = extract_json(content)?;
    serde_json::from_value(value)
        .map_err(|e| SeoError::malformed(format!("unexpected JSON shape: {}", e), content))
}

fn candidates(text: &str) -> Vec<&str> {
    let mut out = Vec::with_capacity(3);
    if let Some(m) = JSON_FENCE_RE.captures(text).and_then(|c| c.get(1)) {
        out.push(m.as_str());
    }
    if let Some(m) = ANY_FENCE_RE.captures(text).and_then(|c| c.get(1)) {
        out.push(m.as_str());
    }
    out.push(text);
    out
}

/// First balanced `{...}` or `[...]` span, string-literal aware
fn balanced_json(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in s[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
