// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Production `ChangeRepository` backed by the `changes` table in PostgreSQL
//! via `sqlx`. `archive_unarchived` is the bulk statement behind the
//! milestone-completion archival workflow: one `UPDATE ... WHERE archived =
//! FALSE` per (app, version) pair, row count back, no rows materialized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::change::{Change, ChangeCategory, NewChange};
use crate::domain::repository::{ChangeFilter, ChangeRepository, RepositoryError};

pub struct PostgresChangeRepository {
    pool: PgPool,
}

impl PostgresChangeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CHANGE_COLUMNS: &str = "id, app, version, dtt_change, change_title, change_desc, \
                              category, dev, image_url, archived, archived_at";

fn row_to_change(row: &PgRow) -> Result<Change, RepositoryError> {
    let category_str: String = row.get("category");
    let category: ChangeCategory = category_str
        .parse()
        .map_err(RepositoryError::Serialization)?;

    Ok(Change {
        id: row.get("id"),
        app: row.get("app"),
        version: row.get("version"),
        dtt_change: row.get("dtt_change"),
        change_title: row.get("change_title"),
        change_desc: row.get("change_desc"),
        category,
        dev: row.get("dev"),
        image_url: row.get("image_url"),
        archived: row.get("archived"),
        archived_at: row.get("archived_at"),
    })
}

#[async_trait]
impl ChangeRepository for PostgresChangeRepository {
    async fn create(&self, draft: &NewChange) -> Result<Change, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO changes (app, version, dtt_change, change_title, change_desc, category, dev, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CHANGE_COLUMNS}
            "#,
        ))
        .bind(&draft.app)
        .bind(&draft.version)
        .bind(draft.dtt_change)
        .bind(&draft.change_title)
        .bind(&draft.change_desc)
        .bind(draft.category.as_str())
        .bind(&draft.dev)
        .bind(&draft.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create change: {}", e)))?;

        row_to_change(&row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Change>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CHANGE_COLUMNS} FROM changes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.map(|r| row_to_change(&r)).transpose()
    }

    async fn list(
        &self,
        filter: &ChangeFilter,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Change>, RepositoryError> {
        // NULL-tolerant filters keep this a single prepared statement.
        let rows = sqlx::query(&format!(
            r#"
            SELECT {CHANGE_COLUMNS}
            FROM changes
            WHERE ($1::TEXT IS NULL OR app = $1)
              AND ($2::TEXT IS NULL OR version = $2)
              AND ($3::BOOLEAN IS NULL OR archived = $3)
            ORDER BY id ASC
            OFFSET $4 LIMIT $5
            "#,
        ))
        .bind(&filter.app)
        .bind(&filter.version)
        .bind(filter.archived)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_change).collect()
    }

    async fn update(
        &self,
        id: i64,
        draft: &NewChange,
    ) -> Result<Option<Change>, RepositoryError> {
        // archived / archived_at are deliberately left out of the SET list;
        // only the workflow mutates them.
        let row = sqlx::query(&format!(
            r#"
            UPDATE changes
            SET app = $2, version = $3, dtt_change = $4, change_title = $5,
                change_desc = $6, category = $7, dev = $8, image_url = $9
            WHERE id = $1
            RETURNING {CHANGE_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(&draft.app)
        .bind(&draft.version)
        .bind(draft.dtt_change)
        .bind(&draft.change_title)
        .bind(&draft.change_desc)
        .bind(draft.category.as_str())
        .bind(&draft.dev)
        .bind(&draft.image_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update change: {}", e)))?;

        row.map(|r| row_to_change(&r)).transpose()
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM changes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn archive_unarchived(
        &self,
        app: &str,
        version: &str,
        archived_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE changes
            SET archived = TRUE, archived_at = $3
            WHERE app = $1 AND version = $2 AND archived = FALSE
            "#,
        )
        .bind(app)
        .bind(version)
        .bind(archived_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to archive changes: {}", e)))?;

        Ok(result.rows_affected())
    }
}
