// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-loop Markdown protocol: the A/B/C/D section convention and the
//! iteration state threaded through planner loops.
//!
//! Workers return the Markdown unparsed; only the core calls into here.

use serde::{Deserialize, Serialize};

/// Parsed A/B/C/D sections. Missing sections are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelfloopSections {
    /// Section A: situation
    pub situation: String,
    /// Section B: next step
    pub next_step: String,
    /// Section C: execution
    pub execution: String,
    /// Section D: open questions
    pub open_questions: String,
}

/// Parse a self-loop Markdown response into its sections.
///
/// A section starts at a line whose heading letter is A–D: `## A`, `### B:
/// Next step`, `A)`, `**C**`, etc. Content before the first marker and
/// unknown sections are ignored.
pub fn parse_sections(markdown: &str) -> SelfloopSections {
    let mut sections = SelfloopSections::default();
    let mut current: Option<char> = None;
    let mut buf = String::new();

    let mut flush = |letter: Option<char>, buf: &mut String| {
        let text = buf.trim().to_string();
        buf.clear();
        match letter {
            Some('A') => sections.situation = text,
            Some('B') => sections.next_step = text,
            Some('C') => sections.execution = text,
            Some('D') => sections.open_questions = text,
            _ => {}
        }
    };

    for line in markdown.lines() {
        if let Some(letter) = section_marker(line) {
            flush(current, &mut buf);
            current = Some(letter);
        } else if current.is_some() {
            buf.push_str(line);
            buf.push('\n');
        }
    }
    flush(current, &mut buf);

    sections
}

/// Returns the section letter when a line is a section marker.
fn section_marker(line: &str) -> Option<char> {
    let stripped = line
        .trim_start()
        .trim_start_matches(['#', '*'])
        .trim_start();
    let mut chars = stripped.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if !('A'..='D').contains(&letter) {
        return None;
    }
    // Letter must stand alone: end of line or a separator follows.
    match chars.next() {
        None => Some(letter),
        Some(c) if c.is_whitespace() || matches!(c, ')' | ':' | '.' | '-' | '*') => Some(letter),
        Some('\u{2014}') => Some(letter),
        _ => None,
    }
}

/// State carried from one planner iteration to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    pub goal: String,
    /// 1-based iteration of the job being (or about to be) executed.
    pub iteration: u32,
    pub max_iterations: u32,
    /// Section-A summaries of completed iterations, oldest first.
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub open_questions: String,
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl LoopState {
    pub fn new(goal: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            goal: goal.into(),
            iteration: 1,
            max_iterations,
            history: Vec::new(),
            open_questions: String::new(),
            constraints: Vec::new(),
        }
    }

    /// Fold a completed iteration's sections into the next loop state.
    ///
    /// Returns `None` when the loop is finished: either the iteration bound
    /// is reached or section D came back empty.
    pub fn advance(&self, sections: &SelfloopSections) -> Option<LoopState> {
        if self.iteration >= self.max_iterations {
            return None;
        }
        if sections.open_questions.trim().is_empty() {
            return None;
        }
        let mut next = self.clone();
        next.iteration += 1;
        next.history.push(sections.situation.clone());
        next.open_questions = sections.open_questions.clone();
        Some(next)
    }
}

#[cfg(test)]
#[path = "selfloop_tests.rs"]
mod tests;
