// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed category set for a change record. Lowercase on the wire and in the
/// store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeCategory {
    Tweak,
    Bug,
    Feature,
    Refactoring,
    Breaking,
}

impl ChangeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeCategory::Tweak => "tweak",
            ChangeCategory::Bug => "bug",
            ChangeCategory::Feature => "feature",
            ChangeCategory::Refactoring => "refactoring",
            ChangeCategory::Breaking => "breaking",
        }
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tweak" => Ok(ChangeCategory::Tweak),
            "bug" => Ok(ChangeCategory::Bug),
            "feature" => Ok(ChangeCategory::Feature),
            "refactoring" => Ok(ChangeCategory::Refactoring),
            "breaking" => Ok(ChangeCategory::Breaking),
            other => Err(format!("unknown change category: {}", other)),
        }
    }
}

/// An individual change belonging to an (app, version) pair.
///
/// `archived` starts false and flips true exactly once, when a milestone whose
/// deployments cover the pair completes. `archived_at` is set in the same
/// statement and stays null until then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    pub id: i64,
    pub app: String,
    pub version: String,
    pub dtt_change: DateTime<Utc>,
    pub change_title: String,
    pub change_desc: String,
    pub category: ChangeCategory,
    pub dev: Option<String>,
    pub image_url: Option<String>,
    pub archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
}

/// Full-replace payload for creating or updating a [`Change`]. Archival state
/// is owned by the workflow, so the payload never carries it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChange {
    pub app: String,
    pub version: String,
    pub dtt_change: DateTime<Utc>,
    pub change_title: String,
    pub change_desc: String,
    pub category: ChangeCategory,
    #[serde(default)]
    pub dev: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Change {
    pub fn from_draft(id: i64, draft: &NewChange) -> Self {
        Self {
            id,
            app: draft.app.clone(),
            version: draft.version.clone(),
            dtt_change: draft.dtt_change,
            change_title: draft.change_title.clone(),
            change_desc: draft.change_desc.clone(),
            category: draft.category,
            dev: draft.dev.clone(),
            image_url: draft.image_url.clone(),
            archived: false,
            archived_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for cat in [
            ChangeCategory::Tweak,
            ChangeCategory::Bug,
            ChangeCategory::Feature,
            ChangeCategory::Refactoring,
            ChangeCategory::Breaking,
        ] {
            assert_eq!(cat.as_str().parse::<ChangeCategory>().unwrap(), cat);
        }
    }

    #[test]
    fn category_rejects_unknown_values() {
        assert!("hotfix".parse::<ChangeCategory>().is_err());
    }

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_string(&ChangeCategory::Breaking).unwrap();
        assert_eq!(json, "\"breaking\"");
    }
}
