// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission resolution.
//!
//! [`resolve_permission`] is the decision rule as a pure function over an
//! in-memory role → permissions map. [`ResolutionEngine`] applies the same
//! rule against the Grant Store:
//!
//! 1. **No tenant**: allowed iff the action is on the global allow-list. The
//!    store is never consulted.
//! 2. **No roles** in the tenant: denied, whatever the action.
//! 3. **`super_admin`**: allowed without consulting grant links.
//! 4. Otherwise allowed iff any held role grants the action.
//!
//! Store failures are returned to the caller, never folded into a deny.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::store::{GrantChecker, RoleFetcher};
use crate::types::{PermissionKey, PrincipalId, RoleKey, TenantId};

/// Role key → granted permission keys.
pub type GrantMap = HashMap<RoleKey, HashSet<PermissionKey>>;

/// Decide whether any of `role_keys` grants `action_key`.
pub fn resolve_permission<'a>(
	role_keys: impl IntoIterator<Item = &'a RoleKey>,
	grant_map: &GrantMap,
	action_key: &str,
) -> bool {
	let role_keys: Vec<&RoleKey> = role_keys.into_iter().collect();

	if role_keys.iter().any(|r| r.is_super_admin()) {
		return true;
	}

	role_keys.iter().any(|role| {
		grant_map
			.get(*role)
			.is_some_and(|granted| granted.contains(action_key))
	})
}

/// Store-backed decision function for the request path.
#[derive(Clone)]
pub struct ResolutionEngine {
	roles: Arc<dyn RoleFetcher>,
	grants: Arc<dyn GrantChecker>,
	global_actions: Arc<BTreeSet<PermissionKey>>,
}

impl ResolutionEngine {
	pub fn new(
		roles: Arc<dyn RoleFetcher>,
		grants: Arc<dyn GrantChecker>,
		global_actions: BTreeSet<PermissionKey>,
	) -> Self {
		Self {
			roles,
			grants,
			global_actions: Arc::new(global_actions),
		}
	}

	/// Build an engine whose allow-list comes from the catalog.
	pub fn from_catalog(
		catalog: &Catalog,
		roles: Arc<dyn RoleFetcher>,
		grants: Arc<dyn GrantChecker>,
	) -> Self {
		Self::new(roles, grants, catalog.global_actions().clone())
	}

	/// May `principal_id` perform `action_key`, optionally within `tenant_id`?
	///
	/// # Errors
	/// Returns [`crate::AuthzError::StoreUnavailable`] if the Grant Store cannot be
	/// queried. Callers choose the policy; fail-closed is recommended.
	#[instrument(
		level = "debug",
		skip(self),
		fields(principal_id = %principal_id, tenant_id = ?tenant_id, action = %action_key)
	)]
	pub async fn check_permission(
		&self,
		principal_id: &PrincipalId,
		tenant_id: Option<&TenantId>,
		action_key: &str,
	) -> Result<bool> {
		let Some(tenant_id) = tenant_id else {
			let allowed = self.global_actions.contains(action_key);
			debug!(allowed, "global action decision");
			return Ok(allowed);
		};

		let role_keys = self.roles.fetch_role_keys(principal_id, tenant_id).await?;
		if role_keys.is_empty() {
			debug!("no roles in tenant, denying");
			return Ok(false);
		}

		if role_keys.iter().any(RoleKey::is_super_admin) {
			debug!("super_admin bypass");
			return Ok(true);
		}

		let allowed = self.grants.role_set_grants(&role_keys, action_key).await?;
		debug!(allowed, roles = ?role_keys, "role grant decision");
		Ok(allowed)
	}
}
