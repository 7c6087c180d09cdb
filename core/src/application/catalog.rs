// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Catalog-side rules that sit above plain CRUD. Today that is a single rule:
//! an app may have at most one version flagged `current` at creation time.

use std::sync::Arc;

use crate::domain::repository::{RepositoryError, VersionRepository};
use crate::domain::version::{NewVersion, Version};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("app '{app}' already has a current version; clear it before marking another")]
    CurrentVersionExists { app: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Clone)]
pub struct VersionService {
    versions: Arc<dyn VersionRepository>,
}

impl VersionService {
    pub fn new(versions: Arc<dyn VersionRepository>) -> Self {
        Self { versions }
    }

    /// Create a version, rejecting a second `current = true` for the same app.
    /// The check runs only here; updates and the archival workflow manage the
    /// flag on their own terms.
    pub async fn create(&self, draft: &NewVersion) -> Result<Version, CatalogError> {
        if draft.current {
            if let Some(existing) = self.versions.find_current(&draft.app).await? {
                tracing::warn!(
                    app = %draft.app,
                    current = %existing.version,
                    "rejected version create: current version already set"
                );
                return Err(CatalogError::CurrentVersionExists {
                    app: draft.app.clone(),
                });
            }
        }
        Ok(self.versions.create(draft).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemoryVersionRepository;

    fn draft(app: &str, version: &str, current: bool) -> NewVersion {
        NewVersion {
            app: app.to_string(),
            version: version.to_string(),
            current,
            major: 1,
            minor: 0,
            patch: 0,
            dt_started: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn rejects_second_current_version_for_same_app() {
        let repo = Arc::new(InMemoryVersionRepository::new());
        let service = VersionService::new(repo.clone());

        service.create(&draft("checkout", "1.0", true)).await.unwrap();
        let err = service
            .create(&draft("checkout", "1.1", true))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::CurrentVersionExists { .. }));
    }

    #[tokio::test]
    async fn allows_current_versions_across_different_apps() {
        let repo = Arc::new(InMemoryVersionRepository::new());
        let service = VersionService::new(repo.clone());

        service.create(&draft("checkout", "1.0", true)).await.unwrap();
        service.create(&draft("billing", "3.2", true)).await.unwrap();
        service.create(&draft("checkout", "1.1", false)).await.unwrap();
    }

    #[tokio::test]
    async fn allows_new_current_after_flag_cleared() {
        let repo = Arc::new(InMemoryVersionRepository::new());
        let service = VersionService::new(repo.clone());

        service.create(&draft("checkout", "1.0", true)).await.unwrap();
        repo.clear_current("checkout", "1.0").await.unwrap();
        service.create(&draft("checkout", "1.1", true)).await.unwrap();
    }
}
