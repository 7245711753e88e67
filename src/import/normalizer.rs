//! Field normalization for uploaded rows.
//!
//! Turns the free-text values found in user spreadsheets into the catalog's
//! canonical vocabulary. Everything here is pure.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::models::game::COMPLETED_STATUS;

/// Shorthand → canonical platform name. Keys are lowercase.
/// Canonical names follow the provider's own platform taxonomy.
static PLATFORM_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ps1", "PlayStation"),
        ("psx", "PlayStation"),
        ("ps2", "PlayStation 2"),
        ("ps3", "PlayStation 3"),
        ("ps4", "PlayStation 4"),
        ("ps5", "PlayStation 5"),
        ("psp", "PSP"),
        ("vita", "PS Vita"),
        ("psvita", "PS Vita"),
        ("x360", "Xbox 360"),
        ("xbox360", "Xbox 360"),
        ("xb1", "Xbox One"),
        ("xbone", "Xbox One"),
        ("xone", "Xbox One"),
        ("xsx", "Xbox Series S/X"),
        ("xss", "Xbox Series S/X"),
        ("series x", "Xbox Series S/X"),
        ("switch", "Nintendo Switch"),
        ("ns", "Nintendo Switch"),
        ("3ds", "Nintendo 3DS"),
        ("wiiu", "Wii U"),
        ("pc", "PC"),
        ("windows", "PC"),
        ("mac", "macOS"),
        ("macos", "macOS"),
        ("linux", "Linux"),
        ("ios", "iOS"),
        ("android", "Android"),
    ])
});

/// Values of the `completed` column that mean the game is finished
const COMPLETED_LABELS: [&str; 10] = [
    "completed", "complete", "finished", "beaten", "done", "true", "yes", "y", "1", "x",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

fn alias(token: &str) -> Option<&'static str> {
    PLATFORM_ALIASES
        .get(token.trim().to_lowercase().as_str())
        .copied()
}

/// Push `value` unless an entry with the same name (ignoring case) is present.
fn push_unique(out: &mut Vec<String>, value: &str) {
    if !out.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        out.push(value.to_string());
    }
}

/// Expand a combined shorthand such as `PS4/PS5`. Only applies when every
/// part is a known alias, so canonical names like `Xbox Series S/X` survive.
fn expand_combined(token: &str) -> Option<Vec<&'static str>> {
    if !token.contains('/') {
        return None;
    }
    token.split('/').map(alias).collect()
}

/// Map a comma-separated platform field to canonical platform names.
///
/// Output is deduplicated and keeps first-insertion order; unknown tokens pass
/// through unchanged and blank tokens are dropped.
pub fn normalize_platforms(raw: &str) -> Vec<String> {
    let mut platforms = Vec::new();

    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if let Some(canonical) = alias(token) {
            push_unique(&mut platforms, canonical);
        } else if let Some(expanded) = expand_combined(token) {
            for canonical in expanded {
                push_unique(&mut platforms, canonical);
            }
        } else {
            push_unique(&mut platforms, token);
        }
    }

    platforms
}

/// Split a comma-separated list field (genres, publishers, media types).
pub fn split_list(raw: &str) -> Vec<String> {
    let mut values = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        push_unique(&mut values, token);
    }
    values
}

/// Canonical status label for the `completed` column.
pub fn normalize_status(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if COMPLETED_LABELS.contains(&raw.to_lowercase().as_str()) {
        return Some(COMPLETED_STATUS.to_string());
    }
    Some(raw.to_string())
}

pub fn is_completed_status(label: &str) -> bool {
    normalize_status(label).as_deref() == Some(COMPLETED_STATUS)
}

/// Parse a release date. A bare year maps to January 1st.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    {
        return Some(date);
    }
    if raw.len() == 4 {
        return raw
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1));
    }
    None
}

/// Parse a 0-100 review score. Decimal values are rounded.
pub fn parse_score(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    let score = raw
        .parse::<i32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i32))?;
    (0..=100).contains(&score).then_some(score)
}
