// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generate_yields_unique_ids() {
    let a = JobId::generate();
    let b = JobId::generate();
    assert_ne!(a, b);
    assert_eq!(a.as_str().len(), 36);
}

#[test]
fn id_round_trips_through_serde() {
    let id = MissionId::new("m-1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"m-1\"");
    let back: MissionId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn short_truncates() {
    assert_eq!(short("abcdef", 4), "abcd");
    assert_eq!(short("ab", 4), "ab");
}
