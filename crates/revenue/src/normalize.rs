//! Cell-level normalization shared by both aggregators: numeric coercion and
//! customer identity resolution.
//!
//! Both functions degrade silently. Ledgers routinely contain placeholder
//! text, blank cells and decorated names; none of that is an error here.

use std::sync::OnceLock;

use regex::Regex;

/// Coerce a raw numeric cell to `f64`.
///
/// The cell must be an optional single leading `-` followed by digits and `.`
/// characters, with at least one digit, and must parse to a finite value.
/// Anything else ("N/A", "", " 42", "1,000", "1e5", "1.2.3") is `0.0`.
pub fn coerce_amount(raw: &str) -> f64 {
    let unsigned = raw.strip_prefix('-').unwrap_or(raw);

    let mut saw_digit = false;
    for c in unsigned.chars() {
        match c {
            '.' => {}
            d if d.is_ascii_digit() => saw_digit = true,
            _ => return 0.0,
        }
    }
    if !saw_digit {
        return 0.0;
    }

    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// True when an identity cell carries no usable name.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn bracket_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<(.+?)>").expect("static identity pattern"))
}

/// Extract the canonical name embedded as `"prefix <Name> suffix"`.
///
/// Returns the first non-greedy `<...>` match, trimmed. `None` when the
/// string carries no bracket decoration.
pub fn bracket_identity(raw: &str) -> Option<&str> {
    bracket_pattern()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Resolve the grouping identity of a non-recurring line item.
///
/// Precedence: explicit canonical identity, then bracket extraction, then the
/// raw display string. Blank results are `None` and the row is dropped.
pub fn resolve_identity(raw: &str, canonical: Option<&str>) -> Option<String> {
    if let Some(explicit) = canonical.map(str::trim).filter(|c| !c.is_empty()) {
        return Some(explicit.to_string());
    }

    let resolved = bracket_identity(raw).unwrap_or(raw);
    if is_blank(resolved) {
        None
    } else {
        Some(resolved.to_string())
    }
}
