// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role assignment: the only writer of principal → role links.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::catalog::Catalog;
use crate::error::{AuthzError, Result};
use crate::store::RoleAssignmentStore;
use crate::types::{PrincipalId, RoleAssignment, TenantId};

#[derive(Clone)]
pub struct RoleAssigner {
	catalog: Arc<Catalog>,
	store: Arc<dyn RoleAssignmentStore>,
}

impl RoleAssigner {
	pub fn new(catalog: Arc<Catalog>, store: Arc<dyn RoleAssignmentStore>) -> Self {
		Self { catalog, store }
	}

	/// Assign `role_key` to the principal in the tenant. Idempotent.
	///
	/// # Errors
	/// Returns [`AuthzError::Validation`] if the role is unknown or not assignable
	/// through this workflow.
	#[instrument(skip(self), fields(principal_id = %principal_id, tenant_id = %tenant_id, role = %role_key))]
	pub async fn assign_role(
		&self,
		principal_id: &PrincipalId,
		tenant_id: &TenantId,
		role_key: &str,
	) -> Result<()> {
		let role = self
			.catalog
			.role(role_key)
			.filter(|r| r.assignable)
			.ok_or_else(|| AuthzError::Validation(format!("role '{role_key}' is not assignable")))?;

		let assignment = RoleAssignment {
			principal_id: *principal_id,
			tenant_id: *tenant_id,
			role_key: role.role.key.clone(),
		};
		let inserted = self.store.insert_role_assignment(&assignment).await?;
		debug!(inserted, "role assignment applied");
		Ok(())
	}
}
