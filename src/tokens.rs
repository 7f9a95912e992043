//! Design-token grammar.
//!
//! Accepted families:
//! - `spacing.N` (N >= 1)
//! - `colors.<family>.<variant>` (`color.` also accepted as the prefix)
//! - `typography.<font|size>.<size>`
//! - `radius.<size>`
//! - `shadow.<size>` / `shadows.<size>`

use once_cell::sync::Lazy;
use regex::Regex;

/// Prefixes that mark a string as an intended token reference.
pub const TOKEN_PREFIXES: [&str; 3] = ["spacing", "color", "typography"];

static TOKEN_GRAMMAR: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^spacing\.[1-9][0-9]*$",
        r"^colors?\.(brand|success|warning|error|text|background|border)\.(primary|secondary)$",
        r"^typography\.(font|size)\.(xs|sm|md|lg|xl|2xl|body|heading|mono)$",
        r"^radius\.(sm|md|lg|xl)$",
        r"^shadows?\.(sm|md|lg)$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("token grammar pattern is valid"))
    .collect()
});

/// A dotted string starting with one of the token prefixes.
pub fn looks_like_token(value: &str) -> bool {
    value.contains('.') && TOKEN_PREFIXES.iter().any(|prefix| value.starts_with(prefix))
}

pub fn is_valid_token(value: &str) -> bool {
    TOKEN_GRAMMAR.iter().any(|pattern| pattern.is_match(value))
}
