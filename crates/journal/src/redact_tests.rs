// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    api_key_snake  = { "api_key", true },
    api_key_dash   = { "api-key", true },
    apikey         = { "apikey", true },
    token          = { "token", true },
    token_dashed   = { "session-token", true },
    secret_upper   = { "SECRET", true },
    password       = { "PASSWORD", true },
    authorization  = { "authorization", true },
    cookie         = { "cookie", true },
    plain          = { "payload", false },
    tokenizer      = { "tokenizer", false },
)]
fn secret_field_detection(name: &str, secret: bool) {
    assert_eq!(is_secret_field(name), secret);
}

#[test]
fn secret_values_are_replaced_recursively() {
    let mut value = serde_json::json!({
        "params": {
            "api_key": "sk-12345",
            "nested": { "Authorization": "Bearer xyz" },
            "prompt": "hello"
        }
    });
    redact_value(&mut value, Path::new("/project"));
    assert_eq!(value["params"]["api_key"], REDACTED);
    assert_eq!(value["params"]["nested"]["Authorization"], REDACTED);
    assert_eq!(value["params"]["prompt"], "hello");
}

#[test]
fn absolute_paths_are_relativized() {
    let mut value = serde_json::json!({
        "path": "/project/data/store/jobs/j.json",
        "outside": "/etc/passwd"
    });
    redact_value(&mut value, Path::new("/project"));
    assert_eq!(value["path"], "data/store/jobs/j.json");
    assert_eq!(value["outside"], "/etc/passwd");
}

#[test]
fn oversized_strings_are_truncated_and_flagged() {
    let big = "x".repeat(MAX_STRING_LEN + 100);
    let mut value = serde_json::json!({ "blob": big });
    redact_value(&mut value, Path::new(""));
    assert_eq!(value["blob"].as_str().unwrap().len(), MAX_STRING_LEN);
    assert_eq!(value["truncated"], true);
}

#[test]
fn artifact_whitelist_drops_outsiders() {
    let kept = filter_artifacts(
        vec![
            "/project/artifacts/report.txt".to_string(),
            "/tmp/evil".to_string(),
        ],
        &[Path::new("/project/artifacts")],
    );
    assert_eq!(kept, vec!["/project/artifacts/report.txt".to_string()]);
}
