// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Production `VersionRepository` backed by the `versions` table in PostgreSQL
//! via `sqlx`. `clear_current` is the bulk statement the archival workflow
//! calls after archiving a milestone's changes.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{RepositoryError, VersionRepository};
use crate::domain::version::{NewVersion, Version};

pub struct PostgresVersionRepository {
    pool: PgPool,
}

impl PostgresVersionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const VERSION_COLUMNS: &str =
    "id, app, version, current, major, minor, patch, dt_started, description";

fn row_to_version(row: &PgRow) -> Version {
    Version {
        id: row.get("id"),
        app: row.get("app"),
        version: row.get("version"),
        current: row.get("current"),
        major: row.get("major"),
        minor: row.get("minor"),
        patch: row.get("patch"),
        dt_started: row.get("dt_started"),
        description: row.get("description"),
    }
}

#[async_trait]
impl VersionRepository for PostgresVersionRepository {
    async fn create(&self, draft: &NewVersion) -> Result<Version, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO versions (app, version, current, major, minor, patch, dt_started, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {VERSION_COLUMNS}
            "#,
        ))
        .bind(&draft.app)
        .bind(&draft.version)
        .bind(draft.current)
        .bind(draft.major)
        .bind(draft.minor)
        .bind(draft.patch)
        .bind(draft.dt_started)
        .bind(&draft.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create version: {}", e)))?;

        Ok(row_to_version(&row))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Version>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {VERSION_COLUMNS} FROM versions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|r| row_to_version(&r)))
    }

    async fn find_current(&self, app: &str) -> Result<Option<Version>, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {VERSION_COLUMNS}
            FROM versions
            WHERE app = $1 AND current = TRUE
            LIMIT 1
            "#,
        ))
        .bind(app)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|r| row_to_version(&r)))
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Version>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {VERSION_COLUMNS}
            FROM versions
            ORDER BY id ASC
            OFFSET $1 LIMIT $2
            "#,
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows.iter().map(row_to_version).collect())
    }

    async fn update(
        &self,
        id: i64,
        draft: &NewVersion,
    ) -> Result<Option<Version>, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE versions
            SET app = $2, version = $3, current = $4, major = $5, minor = $6,
                patch = $7, dt_started = $8, description = $9
            WHERE id = $1
            RETURNING {VERSION_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(&draft.app)
        .bind(&draft.version)
        .bind(draft.current)
        .bind(draft.major)
        .bind(draft.minor)
        .bind(draft.patch)
        .bind(draft.dt_started)
        .bind(&draft.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update version: {}", e)))?;

        Ok(row.map(|r| row_to_version(&r)))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM versions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_current(&self, app: &str, version: &str) -> Result<(), RepositoryError> {
        // Targeted bulk update: only the matching pair, only while the flag is
        // set. Rows are not read back.
        sqlx::query(
            r#"
            UPDATE versions
            SET current = FALSE
            WHERE app = $1 AND version = $2 AND current = TRUE
            "#,
        )
        .bind(app)
        .bind(version)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to clear current flag: {}", e)))?;
        Ok(())
    }
}
