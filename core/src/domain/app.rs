// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};

/// A tracked application. Identity is the unique `app` name; versions,
/// deployments, and changes all reference it by that name rather than by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub id: i64,
    pub app: String,
    pub description: Option<String>,
    pub tech_stack: Option<String>,
    pub github_repo: Option<String>,
    pub docker_repo: Option<String>,
}

/// Full-replace payload for creating or updating an [`App`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApp {
    pub app: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tech_stack: Option<String>,
    #[serde(default)]
    pub github_repo: Option<String>,
    #[serde(default)]
    pub docker_repo: Option<String>,
}

impl App {
    pub fn from_draft(id: i64, draft: &NewApp) -> Self {
        Self {
            id,
            app: draft.app.clone(),
            description: draft.description.clone(),
            tech_stack: draft.tech_stack.clone(),
            github_repo: draft.github_repo.clone(),
            docker_repo: draft.docker_repo.clone(),
        }
    }
}
