// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Production `MilestoneRepository` backed by the `milestones` table in
//! PostgreSQL via `sqlx`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::milestone::{Milestone, NewMilestone};
use crate::domain::repository::{MilestoneRepository, RepositoryError};

pub struct PostgresMilestoneRepository {
    pool: PgPool,
}

impl PostgresMilestoneRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MILESTONE_COLUMNS: &str = "id, milestone, goal, target_date, target_version, complete";

fn row_to_milestone(row: &PgRow) -> Milestone {
    Milestone {
        id: row.get("id"),
        milestone: row.get("milestone"),
        goal: row.get("goal"),
        target_date: row.get("target_date"),
        target_version: row.get("target_version"),
        complete: row.get("complete"),
    }
}

#[async_trait]
impl MilestoneRepository for PostgresMilestoneRepository {
    async fn create(&self, draft: &NewMilestone) -> Result<Milestone, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO milestones (milestone, goal, target_date, target_version, complete)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MILESTONE_COLUMNS}
            "#,
        ))
        .bind(&draft.milestone)
        .bind(&draft.goal)
        .bind(draft.target_date)
        .bind(&draft.target_version)
        .bind(draft.complete)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create milestone: {}", e)))?;

        Ok(row_to_milestone(&row))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Milestone>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|r| row_to_milestone(&r)))
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Milestone>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MILESTONE_COLUMNS}
            FROM milestones
            ORDER BY id ASC
            OFFSET $1 LIMIT $2
            "#,
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows.iter().map(row_to_milestone).collect())
    }

    async fn update(
        &self,
        id: i64,
        draft: &NewMilestone,
    ) -> Result<Option<Milestone>, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE milestones
            SET milestone = $2, goal = $3, target_date = $4, target_version = $5,
                complete = $6
            WHERE id = $1
            RETURNING {MILESTONE_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(&draft.milestone)
        .bind(&draft.goal)
        .bind(draft.target_date)
        .bind(&draft.target_version)
        .bind(draft.complete)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update milestone: {}", e)))?;

        Ok(row.map(|r| row_to_milestone(&r)))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM milestones WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}
