// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: rapid manual transitions through the HTTP API never corrupt
//! the snapshot or the transition log.

use super::prelude::*;
use sheratan_core::{SystemSnapshot, Transition};

#[tokio::test]
async fn rapid_api_transitions_keep_state_files_consistent() {
    let mesh = Mesh::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = sheratan_daemon::http::router(std::sync::Arc::clone(&mesh.ctx));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/system/state/transition");
    let snapshot_path = mesh.dir.path().join("runtime/system_state.json");

    let mut accepted = 0u32;
    for i in 0..20 {
        let target = if i % 2 == 0 { "DEGRADED" } else { "OPERATIONAL" };
        let response = client
            .post(&url)
            .json(&serde_json::json!({
                "state": target,
                "reason": format!("flip {i}"),
                "actor": "spec",
            }))
            .send()
            .await
            .unwrap();
        match response.status().as_u16() {
            200 => accepted += 1,
            // Same-state transitions are refused by the matrix.
            409 => {
                let body: serde_json::Value = response.json().await.unwrap();
                assert_eq!(body["ok"], false);
                assert!(body["error"].as_str().unwrap().contains("INVALID_TRANSITION"));
            }
            other => panic!("unexpected status {other}"),
        }

        // The snapshot is valid JSON at every observation point.
        let snapshot: SystemSnapshot =
            serde_json::from_slice(&std::fs::read(&snapshot_path).unwrap()).unwrap();
        assert!(matches!(
            snapshot.state,
            SystemState::Operational | SystemState::Degraded
        ));
    }

    // Alternating from OPERATIONAL, every flip is legal.
    assert_eq!(accepted, 20);

    // Every accepted transition appears exactly once, with a unique id.
    let log: Vec<Transition> =
        sheratan_store::read_all(&mesh.dir.path().join("logs/state_transitions.jsonl")).unwrap();
    // One extra line from the fixture's startup transition.
    assert_eq!(log.len() as u32, accepted + 1);
    let mut ids: Vec<&str> = log.iter().map(|t| t.event_id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), log.len());
    for t in &log {
        assert!(t.from.can_transition(t.to));
    }

    // History endpoint returns newest first.
    let history: Vec<Transition> = client
        .get(format!("http://{addr}/api/system/state/history?limit=5"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 5);
    assert!(history[0].at_ms >= history[4].at_ms);
}
