// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tenant-scoped authorization core for Tenet.
//!
//! Answers "may principal P perform action A, optionally within tenant T?"
//! through a principal → roles → permissions indirection, and keeps persisted
//! grants converged with a static permission catalog.
//!
//! - [`catalog`]: the static, validated permission/role catalog
//! - [`resolution`]: the decision rule, pure and store-backed
//! - [`reconcile`]: idempotent catalog → Grant Store reconciliation
//! - [`assignment`]: role assignment
//! - [`store`]: capability traits implemented by storage adapters

pub mod assignment;
pub mod catalog;
pub mod error;
pub mod reconcile;
pub mod resolution;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

pub use assignment::RoleAssigner;
pub use catalog::{Catalog, CatalogRole, GrantSet, PermissionDef, RoleDef};
pub use error::{AuthzError, CatalogError, Result, StoreError};
pub use reconcile::{ReconcileReport, Reconciler};
pub use resolution::{resolve_permission, GrantMap, ResolutionEngine};
pub use store::{CatalogStore, GrantChecker, RoleAssignmentStore, RoleFetcher};
pub use types::{
	Permission, PermissionId, PermissionKey, PrincipalId, Role, RoleAssignment, RoleGrant, RoleId,
	RoleKey, TenantId, MAX_KEY_LEN, SUPER_ADMIN,
};
