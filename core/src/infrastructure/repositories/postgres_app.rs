// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Production `AppRepository` backed by the `apps` table in PostgreSQL via
//! `sqlx`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::app::{App, NewApp};
use crate::domain::repository::{AppRepository, RepositoryError};

pub struct PostgresAppRepository {
    pool: PgPool,
}

impl PostgresAppRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_app(row: &PgRow) -> App {
    App {
        id: row.get("id"),
        app: row.get("app"),
        description: row.get("description"),
        tech_stack: row.get("tech_stack"),
        github_repo: row.get("github_repo"),
        docker_repo: row.get("docker_repo"),
    }
}

#[async_trait]
impl AppRepository for PostgresAppRepository {
    async fn create(&self, draft: &NewApp) -> Result<App, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO apps (app, description, tech_stack, github_repo, docker_repo)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, app, description, tech_stack, github_repo, docker_repo
            "#,
        )
        .bind(&draft.app)
        .bind(&draft.description)
        .bind(&draft.tech_stack)
        .bind(&draft.github_repo)
        .bind(&draft.docker_repo)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create app: {}", e)))?;

        Ok(row_to_app(&row))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<App>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, app, description, tech_stack, github_repo, docker_repo
            FROM apps
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|r| row_to_app(&r)))
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<App>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, app, description, tech_stack, github_repo, docker_repo
            FROM apps
            ORDER BY id ASC
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows.iter().map(row_to_app).collect())
    }

    async fn update(&self, id: i64, draft: &NewApp) -> Result<Option<App>, RepositoryError> {
        let row = sqlx::query(
            r#"
            UPDATE apps
            SET app = $2, description = $3, tech_stack = $4, github_repo = $5,
                docker_repo = $6
            WHERE id = $1
            RETURNING id, app, description, tech_stack, github_repo, docker_repo
            "#,
        )
        .bind(id)
        .bind(&draft.app)
        .bind(&draft.description)
        .bind(&draft.tech_stack)
        .bind(&draft.github_repo)
        .bind(&draft.docker_repo)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update app: {}", e)))?;

        Ok(row.map(|r| row_to_app(&r)))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM apps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}
