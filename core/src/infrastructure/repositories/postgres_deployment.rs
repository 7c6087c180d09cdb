// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Production `DeploymentRepository` backed by the `deployments` table in
//! PostgreSQL via `sqlx`. `distinct_app_version_pairs` is the entry query of
//! the archival workflow.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::deployment::{Deployment, NewDeployment};
use crate::domain::repository::{DeploymentRepository, RepositoryError};

pub struct PostgresDeploymentRepository {
    pool: PgPool,
}

impl PostgresDeploymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const DEPLOYMENT_COLUMNS: &str =
    "id, app, version, milestone, dtt_deploy, git_tag, docker_tag, change_log";

fn row_to_deployment(row: &PgRow) -> Deployment {
    Deployment {
        id: row.get("id"),
        app: row.get("app"),
        version: row.get("version"),
        milestone: row.get("milestone"),
        dtt_deploy: row.get("dtt_deploy"),
        git_tag: row.get("git_tag"),
        docker_tag: row.get("docker_tag"),
        change_log: row.get("change_log"),
    }
}

#[async_trait]
impl DeploymentRepository for PostgresDeploymentRepository {
    async fn create(&self, draft: &NewDeployment) -> Result<Deployment, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO deployments (app, version, milestone, dtt_deploy, git_tag, docker_tag, change_log)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {DEPLOYMENT_COLUMNS}
            "#,
        ))
        .bind(&draft.app)
        .bind(&draft.version)
        .bind(&draft.milestone)
        .bind(draft.dtt_deploy)
        .bind(&draft.git_tag)
        .bind(&draft.docker_tag)
        .bind(&draft.change_log)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create deployment: {}", e)))?;

        Ok(row_to_deployment(&row))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Deployment>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {DEPLOYMENT_COLUMNS} FROM deployments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|r| row_to_deployment(&r)))
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Deployment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {DEPLOYMENT_COLUMNS}
            FROM deployments
            ORDER BY id ASC
            OFFSET $1 LIMIT $2
            "#,
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows.iter().map(row_to_deployment).collect())
    }

    async fn update(
        &self,
        id: i64,
        draft: &NewDeployment,
    ) -> Result<Option<Deployment>, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE deployments
            SET app = $2, version = $3, milestone = $4, dtt_deploy = $5,
                git_tag = $6, docker_tag = $7, change_log = $8
            WHERE id = $1
            RETURNING {DEPLOYMENT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(&draft.app)
        .bind(&draft.version)
        .bind(&draft.milestone)
        .bind(draft.dtt_deploy)
        .bind(&draft.git_tag)
        .bind(&draft.docker_tag)
        .bind(&draft.change_log)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update deployment: {}", e)))?;

        Ok(row.map(|r| row_to_deployment(&r)))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM deployments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn distinct_app_version_pairs(
        &self,
        milestone: &str,
    ) -> Result<Vec<(String, String)>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT app, version
            FROM deployments
            WHERE milestone = $1
            "#,
        )
        .bind(milestone)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| (row.get("app"), row.get("version")))
            .collect())
    }
}
