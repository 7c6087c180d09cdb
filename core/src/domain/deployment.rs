// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A deployment event: an (app, version) pair shipped under a milestone.
///
/// References are by name on purpose — `app`, `version`, and `milestone` are
/// the join keys the archival workflow filters on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: i64,
    pub app: String,
    pub version: String,
    pub milestone: String,
    pub dtt_deploy: DateTime<Utc>,
    pub git_tag: Option<String>,
    pub docker_tag: Option<String>,
    pub change_log: Option<String>,
}

/// Full-replace payload for creating or updating a [`Deployment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeployment {
    pub app: String,
    pub version: String,
    pub milestone: String,
    pub dtt_deploy: DateTime<Utc>,
    #[serde(default)]
    pub git_tag: Option<String>,
    #[serde(default)]
    pub docker_tag: Option<String>,
    #[serde(default)]
    pub change_log: Option<String>,
}

impl Deployment {
    pub fn from_draft(id: i64, draft: &NewDeployment) -> Self {
        Self {
            id,
            app: draft.app.clone(),
            version: draft.version.clone(),
            milestone: draft.milestone.clone(),
            dtt_deploy: draft.dtt_deploy,
            git_tag: draft.git_tag.clone(),
            docker_tag: draft.docker_tag.clone(),
            change_log: draft.change_log.clone(),
        }
    }
}
