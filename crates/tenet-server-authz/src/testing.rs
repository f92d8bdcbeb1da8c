// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::{CatalogStore, GrantChecker, RoleAssignmentStore, RoleFetcher};
use crate::types::{
	Permission, PermissionId, PermissionKey, PrincipalId, Role, RoleAssignment, RoleId, RoleKey,
	TenantId,
};

#[derive(Default)]
struct State {
	permissions: HashMap<PermissionKey, PermissionId>,
	roles: HashMap<RoleKey, RoleId>,
	links: BTreeSet<(RoleId, PermissionId)>,
	assignments: HashSet<RoleAssignment>,
}

/// In-memory Grant Store double.
#[derive(Default)]
pub struct MemoryGrantStore {
	state: Mutex<State>,
	pub unavailable: AtomicBool,
	/// Mimic stores whose upsert does not report the row id.
	pub upsert_returns_no_id: AtomicBool,
	/// Role keys that vanish between upsert and lookup.
	pub unresolvable_roles: Mutex<HashSet<String>>,
	/// Permission keys whose ids `permission_ids` leaves out.
	pub unmapped_permissions: Mutex<HashSet<String>>,
	pub fetch_calls: AtomicUsize,
	pub grant_checks: AtomicUsize,
}

impl MemoryGrantStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn check_available(&self) -> Result<(), StoreError> {
		if self.unavailable.load(Ordering::SeqCst) {
			return Err(StoreError::Unavailable("connection refused".to_string()));
		}
		Ok(())
	}

	pub fn assign(&self, principal_id: PrincipalId, tenant_id: TenantId, role: &str) {
		self.state.lock().unwrap().assignments.insert(RoleAssignment {
			principal_id,
			tenant_id,
			role_key: RoleKey::parse(role).unwrap(),
		});
	}

	/// Insert a link out of band, bypassing reconciliation.
	pub fn link(&self, role: &str, permission: &str) {
		let mut state = self.state.lock().unwrap();
		let role_id = *state
			.roles
			.entry(RoleKey::parse(role).unwrap())
			.or_insert_with(RoleId::generate);
		let permission_id = *state
			.permissions
			.entry(PermissionKey::parse(permission).unwrap())
			.or_insert_with(PermissionId::generate);
		state.links.insert((role_id, permission_id));
	}

	/// Current links as `(role, permission)` key pairs.
	pub fn grants(&self) -> BTreeSet<(String, String)> {
		let state = self.state.lock().unwrap();
		let role_keys: HashMap<_, _> = state.roles.iter().map(|(k, v)| (*v, k.to_string())).collect();
		let perm_keys: HashMap<_, _> = state
			.permissions
			.iter()
			.map(|(k, v)| (*v, k.to_string()))
			.collect();
		state
			.links
			.iter()
			.map(|(r, p)| (role_keys[r].clone(), perm_keys[p].clone()))
			.collect()
	}

	pub fn assignment_count(&self) -> usize {
		self.state.lock().unwrap().assignments.len()
	}
}

#[async_trait]
impl RoleFetcher for MemoryGrantStore {
	async fn fetch_role_keys(
		&self,
		principal_id: &PrincipalId,
		tenant_id: &TenantId,
	) -> Result<BTreeSet<RoleKey>, StoreError> {
		self.check_available()?;
		self.fetch_calls.fetch_add(1, Ordering::SeqCst);
		let state = self.state.lock().unwrap();
		Ok(state
			.assignments
			.iter()
			.filter(|a| a.principal_id == *principal_id && a.tenant_id == *tenant_id)
			.map(|a| a.role_key.clone())
			.collect())
	}
}

#[async_trait]
impl GrantChecker for MemoryGrantStore {
	async fn role_set_grants(
		&self,
		role_keys: &BTreeSet<RoleKey>,
		action_key: &str,
	) -> Result<bool, StoreError> {
		self.check_available()?;
		self.grant_checks.fetch_add(1, Ordering::SeqCst);
		let state = self.state.lock().unwrap();
		let Some(permission_id) = state.permissions.get(action_key) else {
			return Ok(false);
		};
		Ok(role_keys.iter().any(|key| {
			state
				.roles
				.get(key)
				.is_some_and(|role_id| state.links.contains(&(*role_id, *permission_id)))
		}))
	}
}

#[async_trait]
impl CatalogStore for MemoryGrantStore {
	async fn upsert_permissions(&self, permissions: &[Permission]) -> Result<(), StoreError> {
		self.check_available()?;
		let mut state = self.state.lock().unwrap();
		for permission in permissions {
			state
				.permissions
				.entry(permission.key.clone())
				.or_insert_with(PermissionId::generate);
		}
		Ok(())
	}

	async fn permission_ids(
		&self,
		keys: &[PermissionKey],
	) -> Result<HashMap<PermissionKey, PermissionId>, StoreError> {
		self.check_available()?;
		let unmapped = self.unmapped_permissions.lock().unwrap();
		let state = self.state.lock().unwrap();
		Ok(keys
			.iter()
			.filter(|k| !unmapped.contains(k.as_str()))
			.filter_map(|k| state.permissions.get(k).map(|id| (k.clone(), *id)))
			.collect())
	}

	async fn upsert_role(&self, role: &Role) -> Result<Option<RoleId>, StoreError> {
		self.check_available()?;
		if self.unresolvable_roles.lock().unwrap().contains(role.key.as_str()) {
			return Ok(None);
		}
		let mut state = self.state.lock().unwrap();
		let id = *state.roles.entry(role.key.clone()).or_insert_with(RoleId::generate);
		if self.upsert_returns_no_id.load(Ordering::SeqCst) {
			return Ok(None);
		}
		Ok(Some(id))
	}

	async fn find_role_id(&self, key: &RoleKey) -> Result<Option<RoleId>, StoreError> {
		self.check_available()?;
		if self.unresolvable_roles.lock().unwrap().contains(key.as_str()) {
			return Ok(None);
		}
		Ok(self.state.lock().unwrap().roles.get(key).copied())
	}

	async fn role_grant_ids(&self, role_id: &RoleId) -> Result<BTreeSet<PermissionId>, StoreError> {
		self.check_available()?;
		let state = self.state.lock().unwrap();
		Ok(state
			.links
			.iter()
			.filter(|(r, _)| r == role_id)
			.map(|(_, p)| *p)
			.collect())
	}

	async fn insert_role_grant(
		&self,
		role_id: &RoleId,
		permission_id: &PermissionId,
	) -> Result<bool, StoreError> {
		self.check_available()?;
		Ok(self.state.lock().unwrap().links.insert((*role_id, *permission_id)))
	}

	async fn delete_role_grant(
		&self,
		role_id: &RoleId,
		permission_id: &PermissionId,
	) -> Result<bool, StoreError> {
		self.check_available()?;
		Ok(self.state.lock().unwrap().links.remove(&(*role_id, *permission_id)))
	}
}

#[async_trait]
impl RoleAssignmentStore for MemoryGrantStore {
	async fn insert_role_assignment(&self, assignment: &RoleAssignment) -> Result<bool, StoreError> {
		self.check_available()?;
		Ok(self.state.lock().unwrap().assignments.insert(assignment.clone()))
	}
}
