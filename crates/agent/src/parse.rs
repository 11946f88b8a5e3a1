//! Structured output parsing for LLM decisions.
//!
//! Models wrap JSON in code fences, prefix it with prose, or trail it with
//! explanations. We scan for balanced `{...}` spans and deserialize the first
//! one that fits the target type.

use docuroute_core::error::DecisionError;
use serde::de::DeserializeOwned;

/// Balanced top-level `{...}` spans in `text`, in order of appearance.
///
/// String literals are respected, so braces inside quoted values don't count.
pub fn json_object_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        let Some(s) = start else {
            if c == '{' {
                start = Some(i);
                depth = 1;
            }
            continue;
        };

        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[s..=i]);
                    start = None;
                }
            }
            _ => {}
        }
    }
    spans
}

/// Deserialize the first JSON object in `raw` that parses as `T`.
pub fn parse_structured<T: DeserializeOwned>(
    raw: &str,
    expected: &'static str,
) -> Result<T, DecisionError> {
    let spans = json_object_spans(raw);
    if spans.is_empty() {
        return Err(DecisionError::MalformedOutput {
            expected,
            reason: "no JSON object found".into(),
            raw: raw.to_string(),
        });
    }

    let mut last_error = String::new();
    for span in spans {
        match serde_json::from_str::<T>(span) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(DecisionError::MalformedOutput {
        expected,
        reason: last_error,
        raw: raw.to_string(),
    })
}
