// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sheratan_core::{JobBuilder, JobKind};

fn client() -> BridgeClient {
    BridgeClient::new("http://bridge:9100/", Duration::from_secs(5))
}

fn unified(ok: bool) -> UnifiedResult {
    UnifiedResult {
        job_id: "job-1".to_string(),
        ok,
        execution_time_ms: 120,
        llm_backend: Some("chatgpt".to_string()),
        answer: None,
        action: None,
        error: None,
    }
}

#[test]
fn selfloop_answer_passes_through_unparsed() {
    let job = JobBuilder::default().kind(JobKind::Selfloop).build();
    let mut job = job;
    job.payload.response_format = Some(sheratan_core::ResponseFormat::SelfloopMarkdown);

    let mut reply = unified(true);
    reply.answer = Some("## A\nraw markdown, not parsed here".to_string());

    match client().map_result(&job, reply).unwrap() {
        ResultAction::SelfloopResult { markdown } => {
            assert!(markdown.contains("not parsed here"));
        }
        other => panic!("unexpected action: {other:?}"),
    }
}

#[test]
fn structured_action_wins_over_answer() {
    let job = JobBuilder::default().kind(JobKind::AgentPlan).build();
    let mut reply = unified(true);
    reply.answer = Some("ignored".to_string());
    reply.action = Some(serde_json::json!({
        "action": "create_followup_jobs",
        "new_jobs": [{"kind": "read_file", "params": {"path": "README.md"}}],
    }));

    match client().map_result(&job, reply).unwrap() {
        ResultAction::CreateFollowupJobs { new_jobs } => {
            assert_eq!(new_jobs.len(), 1);
            assert_eq!(new_jobs[0].kind, JobKind::ReadFile);
        }
        other => panic!("unexpected action: {other:?}"),
    }
}

#[test]
fn invalid_lcp_action_is_a_bridge_error() {
    let job = JobBuilder::default().kind(JobKind::AgentPlan).build();
    let mut reply = unified(true);
    reply.action = Some(serde_json::json!({"action": "summon_demons"}));

    assert!(matches!(client().map_result(&job, reply), Err(ExecError::Bridge(_))));
}

#[test]
fn plain_answer_degrades_to_analysis_result() {
    let job = JobBuilder::default().kind(JobKind::LlmCall).build();
    let mut reply = unified(true);
    reply.answer = Some("the plan is simple".to_string());

    match client().map_result(&job, reply).unwrap() {
        ResultAction::AnalysisResult { summary, data } => {
            assert_eq!(summary, "the plan is simple");
            assert_eq!(data["llm_backend"], "chatgpt");
        }
        other => panic!("unexpected action: {other:?}"),
    }
}

#[test]
fn bridge_failure_and_empty_reply_are_errors() {
    let job = JobBuilder::default().kind(JobKind::LlmCall).build();
    let mut failed = unified(false);
    failed.error = Some("browser session lost".to_string());
    match client().map_result(&job, failed) {
        Err(ExecError::Bridge(message)) => assert!(message.contains("browser session")),
        other => panic!("unexpected: {other:?}"),
    }

    assert!(matches!(client().map_result(&job, unified(true)), Err(ExecError::Bridge(_))));
}
