//! Tolerant recovery of JSON objects from model replies.
//!
//! Models asked for "only JSON" still wrap replies in code fences, add a
//! sentence of narrative, leave trailing commas, or emit JavaScript-style
//! object literals. [`recover_object`] runs an ordered pipeline of repairs,
//! least destructive first, and parses after each step:
//!
//! | Step | Repair |
//! |------|--------|
//! | 1 | [`strip_code_fences`] |
//! | 2 | [`slice_outer_object`] |
//! | 3 | [`remove_trailing_commas`] |
//! | 4 | [`quote_bare_keys`] |
//! | 5 | [`replace_single_quotes`] |
//!
//! Steps 3–5 accumulate on the same candidate. When nothing parses the caller
//! gets [`AppError::MalformedModelOutput`] with the (truncated) raw reply.
//!
//! Step 4 copies quoted literals through untouched. Step 5 is plain text
//! surgery: an apostrophe inside a double-quoted value is indistinguishable
//! from a delimiter once it runs, which is why it comes last.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{truncate_for_diagnostics, AppError};

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));

static BARE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([{,\s])(\w+)\s*:").expect("valid regex"));

static SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']*)'").expect("valid regex"));

/// Remove a leading ```` ``` ```` / ```` ```json ```` fence and a trailing
/// ```` ``` ````, then trim.
pub fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // Drop an info string such as `json` up to the end of the fence line.
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
        s = rest.strip_prefix('\n').unwrap_or(rest);
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Slice from the first `{` to the last `}`, discarding surrounding prose.
pub fn slice_outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Drop commas that directly precede `}` or `]`.
pub fn remove_trailing_commas(text: &str) -> String {
    TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

/// Quote identifier keys written without quotes (`{name: 1}`).
///
/// Text inside `"..."` or `'...'` literals is copied unchanged, so values
/// such as `"see http://x"` or `'at 10:30'` keep their colons.
pub fn quote_bare_keys(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut plain_start = 0;
    let mut chars = text.char_indices();

    while let Some((start, quote)) = chars.next() {
        if quote != '"' && quote != '\'' {
            continue;
        }
        out.push_str(&BARE_KEY.replace_all(&text[plain_start..start], "$1\"$2\":"));

        let mut end = text.len();
        let mut escaped = false;
        for (i, c) in chars.by_ref() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                end = i + c.len_utf8();
                break;
            }
        }
        out.push_str(&text[start..end]);
        plain_start = end;
    }

    out.push_str(&BARE_KEY.replace_all(&text[plain_start..], "$1\"$2\":"));
    out
}

/// Turn `'single quoted'` literals into `"double quoted"` ones.
///
/// Embedded quotes are not escaped.
pub fn replace_single_quotes(text: &str) -> String {
    SINGLE_QUOTED.replace_all(text, "\"$1\"").into_owned()
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Recover a JSON object from a model reply.
pub fn recover_object(text: &str) -> Result<Map<String, Value>, AppError> {
    let stripped = strip_code_fences(text);
    if let Some(map) = parse_object(stripped) {
        return Ok(map);
    }

    let sliced = slice_outer_object(stripped).unwrap_or(stripped);
    if sliced.len() != stripped.len() {
        if let Some(map) = parse_object(sliced) {
            tracing::debug!("recovered model JSON after trimming surrounding text");
            return Ok(map);
        }
    }

    let repairs: [(&str, fn(&str) -> String); 3] = [
        ("trailing commas", remove_trailing_commas),
        ("bare keys", quote_bare_keys),
        ("single quotes", replace_single_quotes),
    ];

    let mut candidate = sliced.to_string();
    for (name, repair) in repairs {
        candidate = repair(&candidate);
        if let Some(map) = parse_object(&candidate) {
            tracing::debug!(repair = name, "recovered model JSON");
            return Ok(map);
        }
    }

    tracing::warn!(chars = text.len(), "model reply could not be parsed as JSON");
    Err(AppError::MalformedModelOutput {
        raw: truncate_for_diagnostics(text),
    })
}

/// Recover a JSON object and deserialize it into `T`.
pub fn recover<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, AppError> {
    let map = recover_object(text)?;
    serde_json::from_value(Value::Object(map)).map_err(|_| AppError::MalformedModelOutput {
        raw: truncate_for_diagnostics(text),
    })
}
