// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::Deserialize;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Rec {
    n: u32,
    tag: String,
}

fn rec(n: u32) -> Rec {
    Rec { n, tag: format!("r{n}") }
}

const TIMEOUT: Duration = Duration::from_millis(200);

#[test]
fn append_and_read_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");

    append_locked(&path, &rec(1), TIMEOUT).unwrap();
    append_locked(&path, &rec(2), TIMEOUT).unwrap();

    let all: Vec<Rec> = read_all(&path).unwrap();
    assert_eq!(all, vec![rec(1), rec(2)]);
    assert_eq!(last_valid::<Rec>(&path).unwrap(), Some(rec(2)));
}

#[test]
fn read_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let all: Vec<Rec> = read_all(&dir.path().join("absent.jsonl")).unwrap();
    assert!(all.is_empty());
}

#[test]
fn corrupt_tail_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    append_locked(&path, &rec(1), TIMEOUT).unwrap();

    // Simulate a torn write
    let mut f = OpenOptions::new().append(true).open(&path).unwrap();
    f.write_all(b"{\"n\": 2, \"ta").unwrap();

    let all: Vec<Rec> = read_all(&path).unwrap();
    assert_eq!(all, vec![rec(1)]);
}

#[test]
fn tail_lines_returns_only_complete_trailing_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    for n in 0..50 {
        append_locked(&path, &rec(n), TIMEOUT).unwrap();
    }

    let all_lines = tail_lines(&path, u64::MAX).unwrap();
    assert_eq!(all_lines.len(), 50);

    let tail = tail_lines(&path, 100).unwrap();
    assert!(tail.len() < 10);
    // The newest line is intact and parseable
    let last: Rec = serde_json::from_str(tail.last().unwrap()).unwrap();
    assert_eq!(last, rec(49));
}
