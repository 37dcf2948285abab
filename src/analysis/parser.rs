use serde_json::Value;
use tracing::debug;

use crate::error::AnalysisError;

/// Top-level sections of which at least one must be present.
const REQUIRED_SECTIONS: &[(&str, &str)] = &[
    ("word_analysis", "wordAnalysis"),
    ("sentence_analysis", "sentenceAnalysis"),
];

/// Pull the analysis object out of a raw completion.
///
/// Accepts bare JSON, JSON surrounded by prose or code fences, and JSON cut off
/// mid-way (missing closers are appended). Anything else, including valid JSON
/// that carries neither `word_analysis` nor `sentence_analysis`, is a
/// [`AnalysisError::SchemaMismatch`].
pub fn parse_model_response(raw: &str) -> Result<Value, AnalysisError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::schema_mismatch("empty response"));
    }

    let value = extract_json_object(trimmed)
        .ok_or_else(|| AnalysisError::schema_mismatch("no JSON object found in response"))?;

    let Some(object) = value.as_object() else {
        return Err(AnalysisError::schema_mismatch("response JSON is not an object"));
    };

    let has_section = REQUIRED_SECTIONS
        .iter()
        .any(|(snake, camel)| object.contains_key(*snake) || object.contains_key(*camel));
    if !has_section {
        return Err(AnalysisError::schema_mismatch(
            "response has neither word_analysis nor sentence_analysis",
        ));
    }

    Ok(value)
}

fn extract_json_object(text: &str) -> Option<Value> {
    if text.starts_with('{') && text.ends_with('}') {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    if let Some(end) = text.rfind('}') {
        if end > start {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Some(value);
            }
        }
    }

    // Truncated output: everything from the first brace, with closers restored.
    let truncated = strip_trailing_fence(&text[start..]);
    let scan = scan_truncated(truncated);
    debug!("Attempting truncated JSON repair ({} chars)", truncated.len());
    serde_json::from_str::<Value>(&close_open_value(truncated, &scan))
        .or_else(|_| serde_json::from_str::<Value>(&roll_back_to_boundary(truncated, &scan)))
        .ok()
}

fn strip_trailing_fence(text: &str) -> &str {
    let trimmed = text.trim_end();
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim_end()
}

/// Where a cut-off document stands when the text runs out.
struct TruncationScan {
    /// Closers for the containers still open, innermost last.
    open: Vec<char>,
    in_string: bool,
    escape_pending: bool,
    /// Last byte offset at which cutting leaves only complete members, with
    /// the closers open at that point.
    boundary: Option<(usize, Vec<char>)>,
}

fn scan_truncated(json: &str) -> TruncationScan {
    let mut scan = TruncationScan {
        open: Vec::new(),
        in_string: false,
        escape_pending: false,
        boundary: None,
    };

    for (i, ch) in json.char_indices() {
        if scan.escape_pending {
            scan.escape_pending = false;
            continue;
        }
        if scan.in_string {
            match ch {
                '\\' => scan.escape_pending = true,
                '"' => scan.in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => scan.in_string = true,
            '{' | '[' => {
                scan.open.push(if ch == '{' { '}' } else { ']' });
                scan.boundary = Some((i + 1, scan.open.clone()));
            }
            '}' | ']' => {
                scan.open.pop();
                if !scan.open.is_empty() {
                    scan.boundary = Some((i + 1, scan.open.clone()));
                }
            }
            // Everything before a separating comma is a complete member.
            ',' => scan.boundary = Some((i, scan.open.clone())),
            _ => {}
        }
    }
    scan
}

/// Finish the value the text was cut in: close an unterminated string and
/// append missing `]`/`}` in nesting order. A dangling `,` is dropped and a
/// dangling `:` gets `null`.
fn close_open_value(json: &str, scan: &TruncationScan) -> String {
    let mut repaired = json.to_string();
    if scan.escape_pending {
        repaired.pop();
    }
    if scan.in_string {
        repaired.push('"');
    }

    let tail = repaired.trim_end();
    if tail.ends_with(',') {
        let cut = tail.len() - 1;
        repaired.truncate(cut);
    } else if tail.ends_with(':') {
        let cut = tail.len();
        repaired.truncate(cut);
        repaired.push_str(" null");
    }

    repaired.extend(scan.open.iter().rev());
    repaired
}

/// Drop the incomplete member (a half-written key, a key without its value, a
/// partial literal) and close what was open before it.
fn roll_back_to_boundary(json: &str, scan: &TruncationScan) -> String {
    match &scan.boundary {
        Some((cut, open)) => {
            let mut repaired = json[..*cut].to_string();
            repaired.extend(open.iter().rev());
            repaired
        }
        None => json.to_string(),
    }
}
