//! Environment variable readers used when building the startup config.

use std::env;

/// Read a variable, falling back to `default` when unset or empty.
pub fn var_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Read an optional variable; unset and blank both yield `None`.
pub fn var_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Feature toggles are on for `1`, `true` or `yes`; anything else is off.
pub fn flag(key: &str) -> bool {
    env::var(key).map(|v| parse_flag(&v)).unwrap_or(false)
}

pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Comma separated list; empty entries are dropped.
pub fn list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|raw| parse_list(&raw))
        .unwrap_or_default()
}

pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse a port, ignoring surrounding whitespace. Invalid values fall back.
pub fn port(key: &str, default: u16) -> u16 {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
