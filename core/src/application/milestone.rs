// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Milestone-Completion Archival Workflow
//!
//! The one place in the system with cross-entity rules. When an update flips a
//! milestone's `complete` flag from false to true, every un-archived change
//! belonging to the (app, version) pairs deployed under that milestone is
//! archived with a shared timestamp, and the `current` flag on the matching
//! versions is cleared.
//!
//! The trigger is edge-based: re-submitting `complete = true` on an already
//! complete milestone does nothing. Archival runs before the milestone's own
//! state is persisted and joins by the milestone *name* carried in the update
//! payload, since deployments reference milestones by name.
//!
//! The two bulk phases (archive changes, clear current flags) are not wrapped
//! in a store-level transaction: each statement is individually atomic and
//! idempotent, so a failed request converges when the caller resubmits it.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::domain::milestone::{Milestone, NewMilestone};
use crate::domain::repository::{
    ChangeRepository, DeploymentRepository, MilestoneRepository, RepositoryError,
    VersionRepository,
};

#[derive(Clone)]
pub struct MilestoneService {
    milestones: Arc<dyn MilestoneRepository>,
    deployments: Arc<dyn DeploymentRepository>,
    changes: Arc<dyn ChangeRepository>,
    versions: Arc<dyn VersionRepository>,
}

impl MilestoneService {
    pub fn new(
        milestones: Arc<dyn MilestoneRepository>,
        deployments: Arc<dyn DeploymentRepository>,
        changes: Arc<dyn ChangeRepository>,
        versions: Arc<dyn VersionRepository>,
    ) -> Self {
        Self {
            milestones,
            deployments,
            changes,
            versions,
        }
    }

    /// Full-replace update of a milestone. Returns `Ok(None)` when the id does
    /// not exist; in that case nothing is mutated and no archival runs.
    pub async fn update_milestone(
        &self,
        id: i64,
        update: &NewMilestone,
    ) -> Result<Option<Milestone>, RepositoryError> {
        let existing = match self.milestones.find_by_id(id).await? {
            Some(m) => m,
            None => return Ok(None),
        };

        let was_complete = existing.complete;
        let should_archive = !was_complete && update.complete;

        if should_archive {
            // Join by the name the update carries: deployments reference the
            // milestone by name, and a rename in the same request wins.
            let archived = self.archive_changes_for_milestone(&update.milestone).await?;
            info!(
                milestone = %update.milestone,
                archived,
                "milestone completed, archived outstanding changes"
            );
        }

        self.milestones.update(id, update).await
    }

    /// Archive every un-archived change under the milestone's deployments and
    /// clear the `current` flag on the affected versions. Returns the total
    /// number of changes archived.
    pub async fn archive_changes_for_milestone(
        &self,
        milestone: &str,
    ) -> Result<u64, RepositoryError> {
        let pairs = self.deployments.distinct_app_version_pairs(milestone).await?;
        if pairs.is_empty() {
            return Ok(0);
        }

        // One timestamp for the whole invocation, so everything archived by
        // this completion event can later be grouped by `archived_at`.
        let archived_at = Utc::now();
        let mut total_archived = 0u64;
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for (app, version) in pairs {
            total_archived += self
                .changes
                .archive_unarchived(&app, &version, archived_at)
                .await?;
            seen.insert((app, version));
        }

        // Current flags are cleared after all changes are archived, once per
        // distinct pair no matter how many deployments mapped to it.
        for (app, version) in &seen {
            self.versions.clear_current(app, version).await?;
        }

        debug!(
            milestone,
            pairs = seen.len(),
            total_archived,
            "archival pass finished"
        );
        Ok(total_archived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change::{ChangeCategory, NewChange};
    use crate::domain::deployment::NewDeployment;
    use crate::domain::repository::ChangeFilter;
    use crate::domain::version::NewVersion;
    use crate::infrastructure::repositories::{
        InMemoryChangeRepository, InMemoryDeploymentRepository, InMemoryMilestoneRepository,
        InMemoryVersionRepository,
    };

    struct Fixture {
        milestones: Arc<InMemoryMilestoneRepository>,
        deployments: Arc<InMemoryDeploymentRepository>,
        changes: Arc<InMemoryChangeRepository>,
        versions: Arc<InMemoryVersionRepository>,
        service: MilestoneService,
    }

    fn fixture() -> Fixture {
        let milestones = Arc::new(InMemoryMilestoneRepository::new());
        let deployments = Arc::new(InMemoryDeploymentRepository::new());
        let changes = Arc::new(InMemoryChangeRepository::new());
        let versions = Arc::new(InMemoryVersionRepository::new());
        let service = MilestoneService::new(
            milestones.clone(),
            deployments.clone(),
            changes.clone(),
            versions.clone(),
        );
        Fixture {
            milestones,
            deployments,
            changes,
            versions,
            service,
        }
    }

    fn milestone_draft(name: &str, complete: bool) -> NewMilestone {
        NewMilestone {
            milestone: name.to_string(),
            goal: Some("ship it".to_string()),
            target_date: None,
            target_version: Some("2.1".to_string()),
            complete,
        }
    }

    fn deployment_draft(app: &str, version: &str, milestone: &str) -> NewDeployment {
        NewDeployment {
            app: app.to_string(),
            version: version.to_string(),
            milestone: milestone.to_string(),
            dtt_deploy: Utc::now(),
            git_tag: None,
            docker_tag: None,
            change_log: None,
        }
    }

    fn change_draft(app: &str, version: &str, title: &str) -> NewChange {
        NewChange {
            app: app.to_string(),
            version: version.to_string(),
            dtt_change: Utc::now(),
            change_title: title.to_string(),
            change_desc: "details".to_string(),
            category: ChangeCategory::Feature,
            dev: None,
            image_url: None,
        }
    }

    fn version_draft(app: &str, version: &str, current: bool) -> NewVersion {
        NewVersion {
            app: app.to_string(),
            version: version.to_string(),
            current,
            major: 0,
            minor: 1,
            patch: 0,
            dt_started: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn completing_a_milestone_archives_outstanding_changes() {
        // One deployment, two live changes plus one already archived.
        let f = fixture();
        let m = f
            .milestones
            .create(&milestone_draft("M1", false))
            .await
            .unwrap();
        f.deployments
            .create(&deployment_draft("Checkout", "2.1", "M1"))
            .await
            .unwrap();
        f.versions
            .create(&version_draft("Checkout", "2.1", true))
            .await
            .unwrap();
        // One change already archived before completion, two still live.
        f.changes
            .create(&change_draft("Checkout", "2.1", "old change"))
            .await
            .unwrap();
        let pre_archive = Utc::now();
        f.changes
            .archive_unarchived("Checkout", "2.1", pre_archive)
            .await
            .unwrap();
        f.changes
            .create(&change_draft("Checkout", "2.1", "add wallet"))
            .await
            .unwrap();
        f.changes
            .create(&change_draft("Checkout", "2.1", "fix totals"))
            .await
            .unwrap();

        let updated = f
            .service
            .update_milestone(m.id, &milestone_draft("M1", true))
            .await
            .unwrap()
            .expect("milestone exists");
        assert!(updated.complete);

        let archived = f
            .changes
            .list(
                &ChangeFilter {
                    archived: Some(true),
                    ..Default::default()
                },
                0,
                100,
            )
            .await
            .unwrap();
        assert_eq!(archived.len(), 3);

        // The two changes archived by the completion share one timestamp, and
        // the pre-archived one keeps its original stamp.
        let stamps: HashSet<_> = archived
            .iter()
            .filter(|c| c.change_title != "old change")
            .map(|c| c.archived_at.unwrap())
            .collect();
        assert_eq!(stamps.len(), 1);
        assert!(!stamps.contains(&pre_archive));

        // Current flag on the deployed version is cleared.
        assert!(f.versions.find_current("Checkout").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn archive_count_matches_live_changes_only() {
        let f = fixture();
        f.deployments
            .create(&deployment_draft("Checkout", "2.1", "M1"))
            .await
            .unwrap();
        f.changes
            .create(&change_draft("Checkout", "2.1", "one"))
            .await
            .unwrap();
        f.changes
            .create(&change_draft("Checkout", "2.1", "two"))
            .await
            .unwrap();
        f.changes
            .archive_unarchived("Checkout", "2.1", Utc::now())
            .await
            .unwrap();
        f.changes
            .create(&change_draft("Checkout", "2.1", "three"))
            .await
            .unwrap();

        let count = f
            .service
            .archive_changes_for_milestone("M1")
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn milestone_without_deployments_archives_nothing() {
        let f = fixture();
        let m = f
            .milestones
            .create(&milestone_draft("M2", false))
            .await
            .unwrap();
        f.versions
            .create(&version_draft("Checkout", "2.1", true))
            .await
            .unwrap();
        f.changes
            .create(&change_draft("Checkout", "2.1", "untouched"))
            .await
            .unwrap();

        let count = f
            .service
            .archive_changes_for_milestone("M2")
            .await
            .unwrap();
        assert_eq!(count, 0);

        f.service
            .update_milestone(m.id, &milestone_draft("M2", true))
            .await
            .unwrap()
            .unwrap();

        let live = f
            .changes
            .list(
                &ChangeFilter {
                    archived: Some(false),
                    ..Default::default()
                },
                0,
                100,
            )
            .await
            .unwrap();
        assert_eq!(live.len(), 1);
        assert!(f.versions.find_current("Checkout").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn repeated_completion_does_not_rearchive() {
        // true -> true is not an edge.
        let f = fixture();
        let m = f
            .milestones
            .create(&milestone_draft("M3", false))
            .await
            .unwrap();
        f.deployments
            .create(&deployment_draft("Checkout", "2.1", "M3"))
            .await
            .unwrap();
        f.changes
            .create(&change_draft("Checkout", "2.1", "first"))
            .await
            .unwrap();

        f.service
            .update_milestone(m.id, &milestone_draft("M3", true))
            .await
            .unwrap()
            .unwrap();

        // New change lands after completion; a repeated complete=true update
        // must leave it alone.
        f.changes
            .create(&change_draft("Checkout", "2.1", "late"))
            .await
            .unwrap();
        let again = f
            .service
            .update_milestone(m.id, &milestone_draft("M3", true))
            .await
            .unwrap()
            .unwrap();
        assert!(again.complete);

        let live = f
            .changes
            .list(
                &ChangeFilter {
                    archived: Some(false),
                    ..Default::default()
                },
                0,
                100,
            )
            .await
            .unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].change_title, "late");
    }

    #[tokio::test]
    async fn unknown_milestone_returns_none_and_mutates_nothing() {
        let f = fixture();
        f.deployments
            .create(&deployment_draft("Checkout", "2.1", "M9"))
            .await
            .unwrap();
        f.versions
            .create(&version_draft("Checkout", "2.1", true))
            .await
            .unwrap();
        f.changes
            .create(&change_draft("Checkout", "2.1", "live"))
            .await
            .unwrap();

        let result = f
            .service
            .update_milestone(404, &milestone_draft("M9", true))
            .await
            .unwrap();
        assert!(result.is_none());

        let live = f
            .changes
            .list(
                &ChangeFilter {
                    archived: Some(false),
                    ..Default::default()
                },
                0,
                100,
            )
            .await
            .unwrap();
        assert_eq!(live.len(), 1);
        assert!(f.versions.find_current("Checkout").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_deployments_collapse_to_one_pair() {
        // Dedup invariant: N deployments sharing (app, version) neither
        // multiply the count nor clear the flag more than once.
        let f = fixture();
        for _ in 0..3 {
            f.deployments
                .create(&deployment_draft("Checkout", "2.1", "M4"))
                .await
                .unwrap();
        }
        f.versions
            .create(&version_draft("Checkout", "2.1", true))
            .await
            .unwrap();
        f.changes
            .create(&change_draft("Checkout", "2.1", "only"))
            .await
            .unwrap();

        let count = f
            .service
            .archive_changes_for_milestone("M4")
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert!(f.versions.find_current("Checkout").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn archival_is_isolated_to_deployed_pairs() {
        let f = fixture();
        f.deployments
            .create(&deployment_draft("X", "1.0", "M5"))
            .await
            .unwrap();
        f.versions.create(&version_draft("X", "1.0", true)).await.unwrap();
        f.versions.create(&version_draft("X", "2.0", false)).await.unwrap();
        f.versions.create(&version_draft("Y", "1.0", true)).await.unwrap();
        f.changes.create(&change_draft("X", "1.0", "hit")).await.unwrap();
        f.changes.create(&change_draft("X", "2.0", "miss")).await.unwrap();
        f.changes.create(&change_draft("Y", "1.0", "miss")).await.unwrap();

        let count = f
            .service
            .archive_changes_for_milestone("M5")
            .await
            .unwrap();
        assert_eq!(count, 1);

        let live = f
            .changes
            .list(
                &ChangeFilter {
                    archived: Some(false),
                    ..Default::default()
                },
                0,
                100,
            )
            .await
            .unwrap();
        let titles: HashSet<_> = live.iter().map(|c| c.change_title.as_str()).collect();
        assert_eq!(titles, HashSet::from(["miss"]));
        assert_eq!(live.len(), 2);
        assert!(f.versions.find_current("Y").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_applies_full_replace() {
        let f = fixture();
        let m = f
            .milestones
            .create(&milestone_draft("M6", false))
            .await
            .unwrap();
        assert_eq!(m.goal.as_deref(), Some("ship it"));

        let bare = NewMilestone {
            milestone: "M6".to_string(),
            goal: None,
            target_date: None,
            target_version: None,
            complete: false,
        };
        let updated = f
            .service
            .update_milestone(m.id, &bare)
            .await
            .unwrap()
            .unwrap();
        // PUT semantics: fields absent from the payload are not preserved.
        assert!(updated.goal.is_none());
        assert!(updated.target_version.is_none());
    }

    #[tokio::test]
    async fn rename_and_complete_in_one_update_joins_on_new_name() {
        let f = fixture();
        let m = f
            .milestones
            .create(&milestone_draft("old-name", false))
            .await
            .unwrap();
        f.deployments
            .create(&deployment_draft("Checkout", "2.1", "new-name"))
            .await
            .unwrap();
        f.changes
            .create(&change_draft("Checkout", "2.1", "renamed"))
            .await
            .unwrap();

        f.service
            .update_milestone(m.id, &milestone_draft("new-name", true))
            .await
            .unwrap()
            .unwrap();

        let archived = f
            .changes
            .list(
                &ChangeFilter {
                    archived: Some(true),
                    ..Default::default()
                },
                0,
                100,
            )
            .await
            .unwrap();
        assert_eq!(archived.len(), 1);
    }
}
