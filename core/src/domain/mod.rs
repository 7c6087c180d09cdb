// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod app;
pub mod version;
pub mod deployment;
pub mod change;
pub mod milestone;
pub mod repository;

pub use app::{App, NewApp};
pub use version::{NewVersion, Version};
pub use deployment::{Deployment, NewDeployment};
pub use change::{Change, ChangeCategory, NewChange};
pub use milestone::{Milestone, NewMilestone};
pub use repository::{
    AppRepository, ChangeFilter, ChangeRepository, DeploymentRepository, MilestoneRepository,
    RepositoryError, VersionRepository,
};
