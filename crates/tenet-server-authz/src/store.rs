// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant Store capabilities consumed by the engines.
//!
//! The decision core depends only on these narrow interfaces. A concrete
//! adapter (see `tenet-server-db`) implements them over a relational store;
//! tests substitute in-memory doubles.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{
	Permission, PermissionId, PermissionKey, PrincipalId, Role, RoleAssignment, RoleId, RoleKey,
	TenantId,
};

/// Fetches the roles a principal holds within a tenant.
#[async_trait]
pub trait RoleFetcher: Send + Sync {
	async fn fetch_role_keys(
		&self,
		principal_id: &PrincipalId,
		tenant_id: &TenantId,
	) -> Result<BTreeSet<RoleKey>, StoreError>;
}

/// Tests whether any role in a set grants a capability.
#[async_trait]
pub trait GrantChecker: Send + Sync {
	async fn role_set_grants(
		&self,
		role_keys: &BTreeSet<RoleKey>,
		action_key: &str,
	) -> Result<bool, StoreError>;
}

/// Persistence primitives used by catalog reconciliation.
///
/// Every method must be individually atomic and treat conflicts as no-ops so
/// overlapping reconciliations converge without engine-level locking.
#[async_trait]
pub trait CatalogStore: Send + Sync {
	/// Insert each permission by key, or update its description if present.
	async fn upsert_permissions(&self, permissions: &[Permission]) -> Result<(), StoreError>;

	/// Resolve persisted identifiers for the given keys. Unknown keys are omitted.
	async fn permission_ids(
		&self,
		keys: &[PermissionKey],
	) -> Result<HashMap<PermissionKey, PermissionId>, StoreError>;

	/// Insert the role by key, or update its description if present.
	///
	/// Returns the persisted identifier when the store reports one.
	async fn upsert_role(&self, role: &Role) -> Result<Option<RoleId>, StoreError>;

	async fn find_role_id(&self, key: &RoleKey) -> Result<Option<RoleId>, StoreError>;

	/// Permission identifiers currently linked to the role.
	async fn role_grant_ids(&self, role_id: &RoleId) -> Result<BTreeSet<PermissionId>, StoreError>;

	/// Insert a link if absent. Returns true when a row was written.
	async fn insert_role_grant(
		&self,
		role_id: &RoleId,
		permission_id: &PermissionId,
	) -> Result<bool, StoreError>;

	/// Delete a link. Returns true when a row was removed.
	async fn delete_role_grant(
		&self,
		role_id: &RoleId,
		permission_id: &PermissionId,
	) -> Result<bool, StoreError>;
}

/// The only writer of role assignments.
#[async_trait]
pub trait RoleAssignmentStore: Send + Sync {
	/// Insert-or-ignore. Returns true when a row was written.
	async fn insert_role_assignment(&self, assignment: &RoleAssignment) -> Result<bool, StoreError>;
}
