// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A released version of an app.
///
/// At most one version per app carries `current = true`. The rule is enforced
/// when a version is created (`VersionService::create`) and cleared again by
/// the archival workflow when a milestone covering the version completes; it
/// is not re-checked on plain updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: i64,
    pub app: String,
    pub version: String,
    pub current: bool,
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
    pub dt_started: Option<NaiveDate>,
    pub description: Option<String>,
}

/// Full-replace payload for creating or updating a [`Version`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVersion {
    pub app: String,
    pub version: String,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub major: i32,
    #[serde(default)]
    pub minor: i32,
    #[serde(default)]
    pub patch: i32,
    #[serde(default)]
    pub dt_started: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Version {
    pub fn from_draft(id: i64, draft: &NewVersion) -> Self {
        Self {
            id,
            app: draft.app.clone(),
            version: draft.version.clone(),
            current: draft.current,
            major: draft.major,
            minor: draft.minor,
            patch: draft.patch,
            dt_started: draft.dt_started,
            description: draft.description.clone(),
        }
    }
}
