//! Per-field parsers for externally supplied, loosely-typed input, and the
//! read-side enrichment of a stored row with its resolved plan.
//!
//! Every function here is pure and total: bad input comes back as a sentinel
//! (`None`, [`TextPatch::Omit`], or a fallback value), never a panic or an
//! error type. The service layer decides which sentinels are client errors.
//!
//! Numeric parsers accept both JSON numbers and numeric strings, because the
//! browser form submits whatever the input element held.

use serde::Serialize;
use serde_json::Value;

use padron_db::models::Client;

use crate::catalog::{PlanCatalog, PlanInfo};

// ---------------------------------------------------------------------------
// Identifier and delta
// ---------------------------------------------------------------------------

/// Parse a client id from a raw path segment or CLI argument.
///
/// Only values mapping to a positive integer are accepted.
pub fn parse_client_id(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok().filter(|id| *id > 0)
}

/// Parse the hours increment for the register-hour operation.
///
/// Absent, null, or empty input defaults to 1. Anything else must be an
/// integer between 1 and 24; the upper bound keeps a single client action
/// from corrupting the usage counter.
pub fn parse_hours_delta(raw: Option<&Value>) -> Option<i32> {
    let Some(value) = raw else {
        return Some(1);
    };
    match numeric(value) {
        Numeric::Empty => Some(1),
        Numeric::Value(n) if n.fract() == 0.0 && (1.0..=24.0).contains(&n) => Some(n as i32),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Optional text
// ---------------------------------------------------------------------------

/// Three-state result for an optional text field on a partial update.
///
/// `Omit` leaves the column untouched, `Clear` writes NULL, `Set` writes the
/// trimmed value. An explicit JSON null and an empty-after-trim string both
/// mean `Clear`; an absent key means `Omit`. Conflating the two would make
/// it impossible to clear a field without also overwriting every other one.
#[derive(Debug, Clone, PartialEq)]
pub enum TextPatch {
    Omit,
    Clear,
    Set(String),
}

/// Parse an optional text field with update semantics.
///
/// Non-string, non-null input is treated as omitted.
pub fn optional_text(raw: Option<&Value>) -> TextPatch {
    match raw {
        None => TextPatch::Omit,
        Some(Value::Null) => TextPatch::Clear,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                TextPatch::Clear
            } else {
                TextPatch::Set(trimmed.to_owned())
            }
        }
        Some(_) => TextPatch::Omit,
    }
}

/// Parse an optional text field with create semantics: absent, null, empty,
/// and non-string input all collapse to `None` (stored as NULL).
pub fn text_or_none(raw: Option<&Value>) -> Option<String> {
    match optional_text(raw) {
        TextPatch::Set(s) => Some(s),
        TextPatch::Omit | TextPatch::Clear => None,
    }
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

enum Numeric {
    /// Null or empty-string input: the caller picks the default.
    Empty,
    Value(f64),
    Invalid,
}

fn numeric(value: &Value) -> Numeric {
    match value {
        Value::Null => Numeric::Empty,
        Value::Number(n) => n.as_f64().map_or(Numeric::Invalid, Numeric::Value),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Numeric::Empty
            } else {
                trimmed.parse::<f64>().map_or(Numeric::Invalid, Numeric::Value)
            }
        }
        _ => Numeric::Invalid,
    }
}

/// Tolerant non-negative amount parse for the create path.
///
/// Absent, null, empty, malformed, or negative input falls back to
/// `fallback` instead of erroring, so a garbled decimal string from the form
/// does not block creating the record.
pub fn lenient_amount(raw: Option<&Value>, fallback: f64) -> f64 {
    let Some(value) = raw else {
        return fallback;
    };
    match numeric(value) {
        Numeric::Value(n) if n.is_finite() && n >= 0.0 => n,
        _ => fallback,
    }
}

/// Tolerant non-negative integer parse for the create path. Truncates.
pub fn lenient_int(raw: Option<&Value>, fallback: i32) -> i32 {
    let Some(value) = raw else {
        return fallback;
    };
    match numeric(value) {
        Numeric::Value(n) if n.is_finite() && n >= 0.0 => n.trunc() as i32,
        _ => fallback,
    }
}

/// Strict non-negative amount parse for the update path.
///
/// Null and empty-string input coerce to 0 (explicitly clearing the balance);
/// anything else must be a finite number >= 0 or the whole update fails.
pub fn strict_amount(value: &Value) -> Option<f64> {
    match numeric(value) {
        Numeric::Empty => Some(0.0),
        Numeric::Value(n) if n.is_finite() && n >= 0.0 => Some(n),
        _ => None,
    }
}

/// Strict non-negative integer parse for the update path. Truncates.
pub fn strict_int(value: &Value) -> Option<i32> {
    match numeric(value) {
        Numeric::Empty => Some(0),
        Numeric::Value(n) if n.is_finite() && n >= 0.0 => Some(n.trunc() as i32),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Read-side enrichment
// ---------------------------------------------------------------------------

/// A stored client plus its resolved plan. Computed on every read, never
/// persisted.
///
/// `plan_info` is `None` when the row's plan id is no longer in the catalog
/// (a legacy plan); readers must treat that as zero included hours rather
/// than an error.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedClient {
    #[serde(flatten)]
    pub client: Client,
    #[serde(rename = "planInfo")]
    pub plan_info: Option<PlanInfo>,
}

/// Attach the catalog entry for the client's plan, if any.
pub fn enrich(client: Client, catalog: &PlanCatalog) -> EnrichedClient {
    let plan_info = catalog.get(&client.plan).cloned();
    EnrichedClient { client, plan_info }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
