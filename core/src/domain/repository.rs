// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Persistence Gateway Contracts
//!
//! One repository trait per aggregate, defined in the domain layer and
//! implemented in `crate::infrastructure::repositories`:
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `AppRepository` | `App` | `InMemoryAppRepository`, `PostgresAppRepository` |
//! | `VersionRepository` | `Version` | `InMemoryVersionRepository`, `PostgresVersionRepository` |
//! | `DeploymentRepository` | `Deployment` | `InMemoryDeploymentRepository`, `PostgresDeploymentRepository` |
//! | `ChangeRepository` | `Change` | `InMemoryChangeRepository`, `PostgresChangeRepository` |
//! | `MilestoneRepository` | `Milestone` | `InMemoryMilestoneRepository`, `PostgresMilestoneRepository` |
//!
//! Beyond plain CRUD, three operations carry the archival workflow:
//! `DeploymentRepository::distinct_app_version_pairs`,
//! `ChangeRepository::archive_unarchived`, and
//! `VersionRepository::clear_current`. The bulk mutations are direct
//! `UPDATE ... WHERE` statements returning row counts; no row objects are
//! materialized or refreshed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::app::{App, NewApp};
use crate::domain::change::{Change, NewChange};
use crate::domain::deployment::{Deployment, NewDeployment};
use crate::domain::milestone::{Milestone, NewMilestone};
use crate::domain::version::{NewVersion, Version};

/// Repository interface for App aggregates
#[async_trait]
pub trait AppRepository: Send + Sync {
    async fn create(&self, draft: &NewApp) -> Result<App, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<App>, RepositoryError>;

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<App>, RepositoryError>;

    /// Full-field replace. Returns `None` when the id does not exist.
    async fn update(&self, id: i64, draft: &NewApp) -> Result<Option<App>, RepositoryError>;

    /// Returns whether a row was deleted.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

/// Repository interface for Version aggregates
#[async_trait]
pub trait VersionRepository: Send + Sync {
    async fn create(&self, draft: &NewVersion) -> Result<Version, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Version>, RepositoryError>;

    /// The version of `app` currently flagged `current = true`, if any.
    async fn find_current(&self, app: &str) -> Result<Option<Version>, RepositoryError>;

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Version>, RepositoryError>;

    async fn update(&self, id: i64, draft: &NewVersion)
        -> Result<Option<Version>, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;

    /// Clear `current` on the version matching (app, version) where it is
    /// currently set. No-op when no such row exists or the flag is already
    /// false. Must not touch other versions of the same app.
    async fn clear_current(&self, app: &str, version: &str) -> Result<(), RepositoryError>;
}

/// Repository interface for Deployment aggregates
#[async_trait]
pub trait DeploymentRepository: Send + Sync {
    async fn create(&self, draft: &NewDeployment) -> Result<Deployment, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Deployment>, RepositoryError>;

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Deployment>, RepositoryError>;

    async fn update(
        &self,
        id: i64,
        draft: &NewDeployment,
    ) -> Result<Option<Deployment>, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;

    /// Every distinct (app, version) pair across deployments whose `milestone`
    /// field equals the given name. Empty when nothing matches.
    async fn distinct_app_version_pairs(
        &self,
        milestone: &str,
    ) -> Result<Vec<(String, String)>, RepositoryError>;
}

/// Optional filters for listing changes.
#[derive(Debug, Clone, Default)]
pub struct ChangeFilter {
    pub app: Option<String>,
    pub version: Option<String>,
    pub archived: Option<bool>,
}

/// Repository interface for Change aggregates
#[async_trait]
pub trait ChangeRepository: Send + Sync {
    async fn create(&self, draft: &NewChange) -> Result<Change, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Change>, RepositoryError>;

    async fn list(
        &self,
        filter: &ChangeFilter,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Change>, RepositoryError>;

    /// Full-field replace of the mutable payload; archival state is preserved.
    async fn update(&self, id: i64, draft: &NewChange)
        -> Result<Option<Change>, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;

    /// Bulk-archive every un-archived change of the (app, version) pair,
    /// stamping `archived_at`. Returns the number of rows flipped; rows
    /// already archived are never touched, so a second call returns 0.
    async fn archive_unarchived(
        &self,
        app: &str,
        version: &str,
        archived_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;
}

/// Repository interface for Milestone aggregates
#[async_trait]
pub trait MilestoneRepository: Send + Sync {
    async fn create(&self, draft: &NewMilestone) -> Result<Milestone, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Milestone>, RepositoryError>;

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Milestone>, RepositoryError>;

    async fn update(
        &self,
        id: i64,
        draft: &NewMilestone,
    ) -> Result<Option<Milestone>, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
