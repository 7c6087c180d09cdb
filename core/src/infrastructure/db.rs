// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype that is
//! injected into all PostgreSQL repository implementations. `ensure_schema`
//! creates the five tables on startup so a fresh database is usable without a
//! separate migration step.

use anyhow::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS apps (
                id          BIGSERIAL PRIMARY KEY,
                app         TEXT NOT NULL UNIQUE,
                description TEXT,
                tech_stack  TEXT,
                github_repo TEXT,
                docker_repo TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS versions (
                id          BIGSERIAL PRIMARY KEY,
                app         TEXT NOT NULL,
                version     TEXT NOT NULL,
                current     BOOLEAN NOT NULL DEFAULT FALSE,
                major       INTEGER NOT NULL DEFAULT 0,
                minor       INTEGER NOT NULL DEFAULT 0,
                patch       INTEGER NOT NULL DEFAULT 0,
                dt_started  DATE,
                description TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS deployments (
                id         BIGSERIAL PRIMARY KEY,
                app        TEXT NOT NULL,
                version    TEXT NOT NULL,
                milestone  TEXT NOT NULL,
                dtt_deploy TIMESTAMPTZ NOT NULL,
                git_tag    TEXT,
                docker_tag TEXT,
                change_log TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS changes (
                id           BIGSERIAL PRIMARY KEY,
                app          TEXT NOT NULL,
                version      TEXT NOT NULL,
                dtt_change   TIMESTAMPTZ NOT NULL,
                change_title TEXT NOT NULL,
                change_desc  TEXT NOT NULL,
                category     TEXT NOT NULL,
                dev          TEXT,
                image_url    TEXT,
                archived     BOOLEAN NOT NULL DEFAULT FALSE,
                archived_at  TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS milestones (
                id             BIGSERIAL PRIMARY KEY,
                milestone      TEXT NOT NULL UNIQUE,
                goal           TEXT,
                target_date    DATE,
                target_version TEXT,
                complete       BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_deployments_milestone ON deployments (milestone)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_changes_app_version ON changes (app, version)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_versions_app_version ON versions (app, version)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
