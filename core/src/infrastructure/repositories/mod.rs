// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the persistence gateway contracts defined
//! in `crate::domain::repository`.
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! Production implementations backed by PostgreSQL via `sqlx`:
//! `PostgresAppRepository`, `PostgresVersionRepository`,
//! `PostgresDeploymentRepository`, `PostgresChangeRepository`,
//! `PostgresMilestoneRepository`.
//!
//! ## In-Memory Repositories
//!
//! Thread-safe HashMap-backed implementations for testing and development.
//! They mirror the SQL semantics exactly, including the bulk-mutation row
//! counts the archival workflow depends on.

pub mod postgres_app;
pub mod postgres_change;
pub mod postgres_deployment;
pub mod postgres_milestone;
pub mod postgres_version;

pub use postgres_app::PostgresAppRepository;
pub use postgres_change::PostgresChangeRepository;
pub use postgres_deployment::PostgresDeploymentRepository;
pub use postgres_milestone::PostgresMilestoneRepository;
pub use postgres_version::PostgresVersionRepository;

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::app::{App, NewApp};
use crate::domain::change::{Change, NewChange};
use crate::domain::deployment::{Deployment, NewDeployment};
use crate::domain::milestone::{Milestone, NewMilestone};
use crate::domain::repository::{
    AppRepository, ChangeFilter, ChangeRepository, DeploymentRepository, MilestoneRepository,
    RepositoryError, VersionRepository,
};
use crate::domain::version::{NewVersion, Version};

fn page<T: Clone>(rows: &BTreeMap<i64, T>, skip: i64, limit: i64) -> Vec<T> {
    rows.values()
        .skip(skip.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

#[derive(Clone)]
pub struct InMemoryAppRepository {
    rows: Arc<RwLock<BTreeMap<i64, App>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryAppRepository {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryAppRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppRepository for InMemoryAppRepository {
    async fn create(&self, draft: &NewApp) -> Result<App, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let app = App::from_draft(id, draft);
        self.rows.write().unwrap().insert(id, app.clone());
        Ok(app)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<App>, RepositoryError> {
        Ok(self.rows.read().unwrap().get(&id).cloned())
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<App>, RepositoryError> {
        Ok(page(&self.rows.read().unwrap(), skip, limit))
    }

    async fn update(&self, id: i64, draft: &NewApp) -> Result<Option<App>, RepositoryError> {
        let mut rows = self.rows.write().unwrap();
        if !rows.contains_key(&id) {
            return Ok(None);
        }
        let app = App::from_draft(id, draft);
        rows.insert(id, app.clone());
        Ok(Some(app))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.rows.write().unwrap().remove(&id).is_some())
    }
}

#[derive(Clone)]
pub struct InMemoryVersionRepository {
    rows: Arc<RwLock<BTreeMap<i64, Version>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryVersionRepository {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryVersionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VersionRepository for InMemoryVersionRepository {
    async fn create(&self, draft: &NewVersion) -> Result<Version, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let version = Version::from_draft(id, draft);
        self.rows.write().unwrap().insert(id, version.clone());
        Ok(version)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Version>, RepositoryError> {
        Ok(self.rows.read().unwrap().get(&id).cloned())
    }

    async fn find_current(&self, app: &str) -> Result<Option<Version>, RepositoryError> {
        Ok(self
            .rows
            .read()
            .unwrap()
            .values()
            .find(|v| v.app == app && v.current)
            .cloned())
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Version>, RepositoryError> {
        Ok(page(&self.rows.read().unwrap(), skip, limit))
    }

    async fn update(
        &self,
        id: i64,
        draft: &NewVersion,
    ) -> Result<Option<Version>, RepositoryError> {
        let mut rows = self.rows.write().unwrap();
        if !rows.contains_key(&id) {
            return Ok(None);
        }
        let version = Version::from_draft(id, draft);
        rows.insert(id, version.clone());
        Ok(Some(version))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.rows.write().unwrap().remove(&id).is_some())
    }

    async fn clear_current(&self, app: &str, version: &str) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().unwrap();
        for row in rows.values_mut() {
            if row.app == app && row.version == version && row.current {
                row.current = false;
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct InMemoryDeploymentRepository {
    rows: Arc<RwLock<BTreeMap<i64, Deployment>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryDeploymentRepository {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryDeploymentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeploymentRepository for InMemoryDeploymentRepository {
    async fn create(&self, draft: &NewDeployment) -> Result<Deployment, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let deployment = Deployment::from_draft(id, draft);
        self.rows.write().unwrap().insert(id, deployment.clone());
        Ok(deployment)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Deployment>, RepositoryError> {
        Ok(self.rows.read().unwrap().get(&id).cloned())
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Deployment>, RepositoryError> {
        Ok(page(&self.rows.read().unwrap(), skip, limit))
    }

    async fn update(
        &self,
        id: i64,
        draft: &NewDeployment,
    ) -> Result<Option<Deployment>, RepositoryError> {
        let mut rows = self.rows.write().unwrap();
        if !rows.contains_key(&id) {
            return Ok(None);
        }
        let deployment = Deployment::from_draft(id, draft);
        rows.insert(id, deployment.clone());
        Ok(Some(deployment))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.rows.write().unwrap().remove(&id).is_some())
    }

    async fn distinct_app_version_pairs(
        &self,
        milestone: &str,
    ) -> Result<Vec<(String, String)>, RepositoryError> {
        let rows = self.rows.read().unwrap();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut pairs = Vec::new();
        for row in rows.values() {
            if row.milestone == milestone {
                let pair = (row.app.clone(), row.version.clone());
                if seen.insert(pair.clone()) {
                    pairs.push(pair);
                }
            }
        }
        Ok(pairs)
    }
}

#[derive(Clone)]
pub struct InMemoryChangeRepository {
    rows: Arc<RwLock<BTreeMap<i64, Change>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryChangeRepository {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryChangeRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChangeRepository for InMemoryChangeRepository {
    async fn create(&self, draft: &NewChange) -> Result<Change, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let change = Change::from_draft(id, draft);
        self.rows.write().unwrap().insert(id, change.clone());
        Ok(change)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Change>, RepositoryError> {
        Ok(self.rows.read().unwrap().get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &ChangeFilter,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Change>, RepositoryError> {
        let rows = self.rows.read().unwrap();
        Ok(rows
            .values()
            .filter(|c| filter.app.as_deref().is_none_or(|a| c.app == a))
            .filter(|c| filter.version.as_deref().is_none_or(|v| c.version == v))
            .filter(|c| filter.archived.is_none_or(|a| c.archived == a))
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: i64,
        draft: &NewChange,
    ) -> Result<Option<Change>, RepositoryError> {
        let mut rows = self.rows.write().unwrap();
        let Some(existing) = rows.get(&id) else {
            return Ok(None);
        };
        // Archival state is workflow-owned and survives payload replaces.
        let mut change = Change::from_draft(id, draft);
        change.archived = existing.archived;
        change.archived_at = existing.archived_at;
        rows.insert(id, change.clone());
        Ok(Some(change))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.rows.write().unwrap().remove(&id).is_some())
    }

    async fn archive_unarchived(
        &self,
        app: &str,
        version: &str,
        archived_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.write().unwrap();
        let mut count = 0u64;
        for row in rows.values_mut() {
            if row.app == app && row.version == version && !row.archived {
                row.archived = true;
                row.archived_at = Some(archived_at);
                count += 1;
            }
        }
        Ok(count)
    }
}

#[derive(Clone)]
pub struct InMemoryMilestoneRepository {
    rows: Arc<RwLock<BTreeMap<i64, Milestone>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryMilestoneRepository {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryMilestoneRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MilestoneRepository for InMemoryMilestoneRepository {
    async fn create(&self, draft: &NewMilestone) -> Result<Milestone, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let milestone = Milestone::from_draft(id, draft);
        self.rows.write().unwrap().insert(id, milestone.clone());
        Ok(milestone)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Milestone>, RepositoryError> {
        Ok(self.rows.read().unwrap().get(&id).cloned())
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Milestone>, RepositoryError> {
        Ok(page(&self.rows.read().unwrap(), skip, limit))
    }

    async fn update(
        &self,
        id: i64,
        draft: &NewMilestone,
    ) -> Result<Option<Milestone>, RepositoryError> {
        let mut rows = self.rows.write().unwrap();
        if !rows.contains_key(&id) {
            return Ok(None);
        }
        let milestone = Milestone::from_draft(id, draft);
        rows.insert(id, milestone.clone());
        Ok(Some(milestone))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.rows.write().unwrap().remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change::ChangeCategory;

    fn change_draft(app: &str, version: &str) -> NewChange {
        NewChange {
            app: app.to_string(),
            version: version.to_string(),
            dtt_change: Utc::now(),
            change_title: "t".to_string(),
            change_desc: "d".to_string(),
            category: ChangeCategory::Bug,
            dev: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn archive_unarchived_is_idempotent_per_pair() {
        let repo = InMemoryChangeRepository::new();
        repo.create(&change_draft("a", "1.0")).await.unwrap();
        repo.create(&change_draft("a", "1.0")).await.unwrap();
        repo.create(&change_draft("a", "2.0")).await.unwrap();

        let t = Utc::now();
        assert_eq!(repo.archive_unarchived("a", "1.0", t).await.unwrap(), 2);
        assert_eq!(repo.archive_unarchived("a", "1.0", t).await.unwrap(), 0);

        // The other pair stays live.
        let live = repo
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
        assert_eq!(live[0].version, "2.0");
    }

    #[tokio::test]
    async fn change_update_preserves_archival_state() {
        let repo = InMemoryChangeRepository::new();
        let created = repo.create(&change_draft("a", "1.0")).await.unwrap();
        let t = Utc::now();
        repo.archive_unarchived("a", "1.0", t).await.unwrap();

        let mut draft = change_draft("a", "1.0");
        draft.change_title = "edited".to_string();
        let updated = repo.update(created.id, &draft).await.unwrap().unwrap();
        assert_eq!(updated.change_title, "edited");
        assert!(updated.archived);
        assert_eq!(updated.archived_at, Some(t));
    }

    #[tokio::test]
    async fn clear_current_targets_only_the_matching_pair() {
        let repo = InMemoryVersionRepository::new();
        let draft = |app: &str, version: &str, current: bool| NewVersion {
            app: app.to_string(),
            version: version.to_string(),
            current,
            major: 0,
            minor: 0,
            patch: 0,
            dt_started: None,
            description: None,
        };
        repo.create(&draft("a", "1.0", true)).await.unwrap();
        repo.create(&draft("a", "2.0", false)).await.unwrap();

        // Unknown pair and already-false pair are both no-ops.
        repo.clear_current("a", "9.9").await.unwrap();
        repo.clear_current("a", "2.0").await.unwrap();
        assert!(repo.find_current("a").await.unwrap().is_some());

        repo.clear_current("a", "1.0").await.unwrap();
        assert!(repo.find_current("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn distinct_pairs_deduplicate_deployments() {
        let repo = InMemoryDeploymentRepository::new();
        let draft = |app: &str, version: &str, milestone: &str| NewDeployment {
            app: app.to_string(),
            version: version.to_string(),
            milestone: milestone.to_string(),
            dtt_deploy: Utc::now(),
            git_tag: None,
            docker_tag: None,
            change_log: None,
        };
        repo.create(&draft("a", "1.0", "m1")).await.unwrap();
        repo.create(&draft("a", "1.0", "m1")).await.unwrap();
        repo.create(&draft("b", "1.0", "m1")).await.unwrap();
        repo.create(&draft("a", "1.0", "m2")).await.unwrap();

        let pairs = repo.distinct_app_version_pairs("m1").await.unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(repo
            .distinct_app_version_pairs("missing")
            .await
            .unwrap()
            .is_empty());
        assert!(repo.distinct_app_version_pairs("").await.unwrap().is_empty());
    }
}
