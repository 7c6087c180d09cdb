// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A milestone groups deployments under a named goal.
///
/// Created with `complete = false`. The false→true edge on `complete` is the
/// trigger for the archival workflow; deployments reference the milestone by
/// its `milestone` name, not by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: i64,
    pub milestone: String,
    pub goal: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub target_version: Option<String>,
    pub complete: bool,
}

/// Full-replace payload for creating or updating a [`Milestone`]. Updates are
/// PUT-style: fields absent here are not preserved from the previous state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMilestone {
    pub milestone: String,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub target_version: Option<String>,
    #[serde(default)]
    pub complete: bool,
}

impl Milestone {
    pub fn from_draft(id: i64, draft: &NewMilestone) -> Self {
        Self {
            id,
            milestone: draft.milestone.clone(),
            goal: draft.goal.clone(),
            target_date: draft.target_date,
            target_version: draft.target_version.clone(),
            complete: draft.complete,
        }
    }
}
