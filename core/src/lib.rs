// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Dev-Optics Core
//!
//! Release-metadata tracking: apps, versions, deployments, changes, and the
//! milestones that group them.
//!
//! # Architecture
//!
//! - **domain** — entities, the `ChangeCategory` enum, repository contracts
//! - **application** — the milestone-completion archival workflow and the
//!   single-current-version rule
//! - **infrastructure** — PostgreSQL and in-memory repository implementations,
//!   connection pool, image upload store
//! - **presentation** — the HTTP API surface

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
