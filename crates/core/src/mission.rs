// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission: the top of the mission → task → job hierarchy.

use crate::id::MissionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A user-supplied goal. Immutable after creation except for `metadata`;
/// removed only by explicit purge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at_ms: u64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Mission {
    pub fn new(id: MissionId, title: impl Into<String>, created_at_ms: u64) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            created_at_ms,
            metadata: HashMap::new(),
        }
    }
}
