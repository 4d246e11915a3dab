//! Freshroute - produce logistics order reporting backend.
//!
//! Reconstructs a multi-stage fulfillment record (collection, packaging,
//! delivery routing, final pricing) from the loosely-structured stage blobs
//! the admin backend stores per order, cross-references it against the
//! driver/labour/rate master data, and renders the result as a PDF, a styled
//! spreadsheet, or a plain-text screen report.

pub mod api;
pub mod costing;
pub mod document;
pub mod export;
pub mod history;
pub mod labour;
pub mod logging;
pub mod report;
pub mod routes;
pub mod stage;

/// Sentinel route for delivery lines whose driver cannot be resolved.
pub const UNASSIGNED_DRIVER: &str = "Unassigned";

// ---------------------------------------------------------------------------
// Ordered-alias JSON accessors
//
// Upstream stage producers are inconsistent about field names (camelCase,
// snake_case, renamed fields across app versions), so every read goes through
// an ordered alias list. First key that yields a usable value wins.
// ---------------------------------------------------------------------------

pub(crate) fn value_str(v: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = v.get(*key).and_then(|x| x.as_str()) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

pub(crate) fn value_f64(v: &serde_json::Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        match v.get(*key) {
            Some(x) if x.is_number() => return x.as_f64(),
            Some(serde_json::Value::String(s)) => {
                if let Some(n) = parse_loose_f64(s) {
                    return Some(n);
                }
            }
            _ => {}
        }
    }
    None
}

pub(crate) fn value_i64(v: &serde_json::Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        match v.get(*key) {
            Some(x) if x.is_number() => return x.as_i64(),
            Some(serde_json::Value::String(s)) => {
                if let Ok(n) = s.trim().parse::<i64>() {
                    return Some(n);
                }
            }
            _ => {}
        }
    }
    None
}

/// Raw id field (number or string) rendered as a trimmed string, for loose
/// driver-id comparison.
pub(crate) fn value_id(v: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match v.get(*key) {
            Some(x) if x.is_number() => return Some(x.to_string()),
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                return Some(s.trim().to_string());
            }
            _ => {}
        }
    }
    None
}

/// parseFloat-style leading-number scan: accepts `"48"`, `"48.5 "`, `"48kg"`.
/// Returns `None` when no leading numeric prefix exists.
pub(crate) fn parse_loose_f64(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in trimmed.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '-' | '+' if i == 0 => end = i + 1,
            '.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }
    trimmed[..end].parse::<f64>().ok()
}

/// Strip every non-numeric character then parse, defaulting to `0.0`.
/// Handles unit-suffixed weights like `"120kg"` or `"120 KG"`. Collection
/// stops at a second dot so version-ish strings keep their leading number.
pub(crate) fn numeric_part(s: &str) -> f64 {
    let mut cleaned = String::new();
    let mut seen_dot = false;
    for c in s.chars() {
        match c {
            '0'..='9' => cleaned.push(c),
            '.' if !seen_dot => {
                seen_dot = true;
                cleaned.push(c);
            }
            '.' => break,
            _ => {}
        }
    }
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Loose id equality: trimmed-string match, or numeric equality when both
/// sides parse as numbers (so `7` matches `"7"` and `"7.0"`).
pub(crate) fn ids_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
