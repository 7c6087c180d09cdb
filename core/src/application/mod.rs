// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod catalog;
pub mod milestone;

pub use catalog::{CatalogError, VersionService};
pub use milestone::MilestoneService;
