// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation of decision-trace entries against the v1 shape.
//!
//! The typed structs in `sheratan-core` are the schema; this module checks
//! a JSON value against that shape and reports every violation path so
//! bad entries can be routed to the breach log instead of poisoning the
//! main stream.

use serde_json::{Map, Value};
use sheratan_core::TRACE_SCHEMA_VERSION;

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

const INTENTS: &[&str] = &["dispatch_job", "route_llm_call", "recover_failure"];
const ACTION_TYPES: &[&str] = &[
    "ROUTE", "EXECUTE", "RETRY", "REWRITE", "FALLBACK", "QUARANTINE", "SKIP", "ABORT",
];
const MODES: &[&str] = &["simulate", "execute"];
const RESULT_STATUSES: &[&str] = &["pending", "success", "failed", "skipped", "aborted"];

/// Validate a candidate entry. Empty vec means the entry is schema-valid.
pub fn validate(value: &Value) -> Vec<Violation> {
    let mut v = Vec::new();

    let Some(obj) = value.as_object() else {
        return vec![Violation::new("$", "entry must be a JSON object")];
    };

    match obj.get("schema_version").and_then(Value::as_u64) {
        Some(n) if n == TRACE_SCHEMA_VERSION as u64 => {}
        Some(n) => v.push(Violation::new(
            "schema_version",
            format!("unsupported version {n}, expected {TRACE_SCHEMA_VERSION}"),
        )),
        None => v.push(Violation::new("schema_version", "missing or not an integer")),
    }

    check_u64(obj, "timestamp_ms", &mut v);
    check_str(obj, "trace_id", &mut v);
    check_str(obj, "node_id", &mut v);
    check_str(obj, "build_id", &mut v);
    check_u64(obj, "depth", &mut v);
    check_enum(obj, "intent", "intent", INTENTS, &mut v);

    match obj.get("action").and_then(Value::as_object) {
        Some(action) => {
            check_str_at(action, "action_id", "action.action_id", &mut v);
            check_enum(action, "type", "action.type", ACTION_TYPES, &mut v);
            check_enum(action, "mode", "action.mode", MODES, &mut v);
            if action.get("select_score").and_then(Value::as_f64).is_none() {
                v.push(Violation::new("action.select_score", "missing or not a number"));
            }
            if action.get("risk_gate").and_then(Value::as_bool).is_none() {
                v.push(Violation::new("action.risk_gate", "missing or not a boolean"));
            }
        }
        None => v.push(Violation::new("action", "missing or not an object")),
    }

    match obj.get("result").and_then(Value::as_object) {
        Some(result) => {
            check_enum(result, "status", "result.status", RESULT_STATUSES, &mut v);
            if result.get("score").and_then(Value::as_f64).is_none() {
                v.push(Violation::new("result.score", "missing or not a number"));
            }
        }
        None => v.push(Violation::new("result", "missing or not an object")),
    }

    v
}

fn check_str(obj: &Map<String, Value>, key: &str, v: &mut Vec<Violation>) {
    check_str_at(obj, key, key, v);
}

fn check_str_at(obj: &Map<String, Value>, key: &str, path: &str, v: &mut Vec<Violation>) {
    match obj.get(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => {}
        Some(_) => v.push(Violation::new(path, "must be non-empty")),
        None => v.push(Violation::new(path, "missing or not a string")),
    }
}

fn check_u64(obj: &Map<String, Value>, key: &str, v: &mut Vec<Violation>) {
    if obj.get(key).and_then(Value::as_u64).is_none() {
        v.push(Violation::new(key, "missing or not a non-negative integer"));
    }
}

fn check_enum(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    allowed: &[&str],
    v: &mut Vec<Violation>,
) {
    match obj.get(key).and_then(Value::as_str) {
        Some(s) if allowed.contains(&s) => {}
        Some(s) => v.push(Violation::new(path, format!("unknown value '{s}'"))),
        None => v.push(Violation::new(path, "missing or not a string")),
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
