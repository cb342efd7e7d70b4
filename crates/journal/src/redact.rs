// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mandatory redaction applied to every journal write.
//!
//! Secret-named fields are replaced, absolute paths are relativized to the
//! project root, and oversized strings are truncated with a marker flag.

use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

/// Field names whose values are always replaced.
const SECRET_PATTERN: &str = r"(?i)\b(api[-_]?key|token|secret|password|authorization|cookie)\b";

/// Replacement for secret values.
pub const REDACTED: &str = "<redacted>";

/// Strings longer than this are truncated and flagged.
pub const MAX_STRING_LEN: usize = 4_096;

// The pattern is a compile-time constant.
#[allow(clippy::unwrap_used)]
fn secret_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SECRET_PATTERN).unwrap())
}

/// True when a field name matches the secret pattern.
pub fn is_secret_field(name: &str) -> bool {
    secret_re().is_match(name)
}

/// Redact a JSON value in place.
pub fn redact_value(value: &mut Value, project_root: &Path) {
    match value {
        Value::Object(map) => {
            let mut truncated_any = false;
            for (key, field) in map.iter_mut() {
                if is_secret_field(key) {
                    *field = Value::String(REDACTED.to_string());
                    continue;
                }
                match field {
                    Value::String(s) => {
                        if truncate_in_place(s) {
                            truncated_any = true;
                        }
                        *s = relativize(s, project_root);
                    }
                    nested => redact_value(nested, project_root),
                }
            }
            if truncated_any {
                map.insert("truncated".to_string(), Value::Bool(true));
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact_value(item, project_root);
            }
        }
        Value::String(s) => {
            truncate_in_place(s);
            *s = relativize(s, project_root);
        }
        _ => {}
    }
}

/// Relativize an absolute path under the project root; other strings pass
/// through untouched.
fn relativize(s: &str, project_root: &Path) -> String {
    let root = project_root.to_string_lossy();
    if root.is_empty() {
        return s.to_string();
    }
    match s.strip_prefix(root.as_ref()) {
        Some(rest) => {
            let rest = rest.trim_start_matches('/');
            if rest.is_empty() {
                ".".to_string()
            } else {
                rest.to_string()
            }
        }
        None => s.to_string(),
    }
}

fn truncate_in_place(s: &mut String) -> bool {
    if s.len() <= MAX_STRING_LEN {
        return false;
    }
    let mut cut = MAX_STRING_LEN;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    true
}

/// Keep only artifact paths that resolve inside one of the whitelisted
/// directories. Everything else is dropped.
pub fn filter_artifacts(paths: Vec<String>, whitelist: &[&Path]) -> Vec<String> {
    paths
        .into_iter()
        .filter(|p| {
            let candidate = Path::new(p);
            whitelist.iter().any(|root| candidate.starts_with(root))
        })
        .collect()
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
