// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Catalog reconciliation.
//!
//! Converges the Grant Store's role → permission links to the catalog:
//!
//! 1. Upsert every catalog permission (description only changes in place).
//! 2. Map every catalog permission key to its persisted id.
//! 3. Upsert each role and resolve its id, re-querying when the upsert
//!    reports none.
//! 4. Insert missing links for the role's desired grant set.
//! 5. Remove links to catalog-known permissions outside that set (drift).
//!
//! Every store call is atomic and conflict-tolerant, so a run may overlap
//! with decision requests and with other runs. Links to permissions the
//! catalog does not track are never touched.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::catalog::{Catalog, CatalogRole};
use crate::error::{AuthzError, Result};
use crate::store::CatalogStore;
use crate::types::{PermissionId, PermissionKey, RoleId};

/// Counts of what a reconciliation run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
	pub permissions_upserted: usize,
	pub roles_reconciled: usize,
	pub grants_inserted: usize,
	pub grants_removed: usize,
}

#[derive(Clone)]
pub struct Reconciler {
	store: Arc<dyn CatalogStore>,
}

impl Reconciler {
	pub fn new(store: Arc<dyn CatalogStore>) -> Self {
		Self { store }
	}

	/// Make persisted grants match `catalog`. Safe to re-run.
	///
	/// # Errors
	/// - [`AuthzError::StoreUnavailable`] if any store call fails
	/// - [`AuthzError::ReconciliationFatal`] if a role id cannot be resolved after
	///   upsert; no links for that role are touched
	#[instrument(skip(self, catalog), fields(permissions = catalog.permissions().len(), roles = catalog.roles().len()))]
	pub async fn reconcile(&self, catalog: &Catalog) -> Result<ReconcileReport> {
		let mut report = ReconcileReport::default();

		self.store.upsert_permissions(catalog.permissions()).await?;
		report.permissions_upserted = catalog.permissions().len();

		let permission_ids = self.store.permission_ids(&catalog.permission_keys()).await?;
		let known_ids: BTreeSet<PermissionId> = permission_ids.values().copied().collect();

		for entry in catalog.roles() {
			let role_id = self.resolve_role_id(entry).await?;
			let desired = desired_ids(entry, &permission_ids)?;

			let existing = self.store.role_grant_ids(&role_id).await?;

			for permission_id in desired.difference(&existing) {
				if self.store.insert_role_grant(&role_id, permission_id).await? {
					report.grants_inserted += 1;
				}
			}

			// Only catalog-known permissions count as drift.
			let drift: Vec<PermissionId> = existing
				.iter()
				.filter(|id| known_ids.contains(*id) && !desired.contains(*id))
				.copied()
				.collect();
			for permission_id in &drift {
				if self.store.delete_role_grant(&role_id, permission_id).await? {
					report.grants_removed += 1;
				}
			}
			if !drift.is_empty() {
				warn!(role = %entry.role.key, removed = drift.len(), "removed drifted role grants");
			}

			report.roles_reconciled += 1;
		}

		info!(
			permissions = report.permissions_upserted,
			roles = report.roles_reconciled,
			inserted = report.grants_inserted,
			removed = report.grants_removed,
			"catalog reconciled"
		);
		Ok(report)
	}

	async fn resolve_role_id(&self, entry: &CatalogRole) -> Result<RoleId> {
		if let Some(id) = self.store.upsert_role(&entry.role).await? {
			return Ok(id);
		}

		self.store
			.find_role_id(&entry.role.key)
			.await?
			.ok_or_else(|| AuthzError::ReconciliationFatal {
				role: entry.role.key.clone(),
				reason: "role id not found after upsert".to_string(),
			})
	}
}

fn desired_ids(
	entry: &CatalogRole,
	permission_ids: &HashMap<PermissionKey, PermissionId>,
) -> Result<BTreeSet<PermissionId>> {
	entry
		.grants
		.iter()
		.map(|key| {
			permission_ids
				.get(key)
				.copied()
				.ok_or_else(|| AuthzError::ReconciliationFatal {
					role: entry.role.key.clone(),
					reason: format!("permission '{key}' has no persisted id"),
				})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::{GrantSet, PermissionDef, RoleDef};
	use crate::testing::MemoryGrantStore;
	use std::sync::atomic::Ordering;

	const PERMS: &[PermissionDef] = &[
		PermissionDef {
			key: "docs.document.read",
			description: "Read documents",
		},
		PermissionDef {
			key: "docs.document.create",
			description: "Create documents",
		},
		PermissionDef {
			key: "docs.document.update",
			description: "Update documents",
		},
	];

	fn catalog(viewer: &'static [&'static str]) -> Catalog {
		let roles = [
			RoleDef {
				key: "viewer",
				description: "Viewer",
				grants: GrantSet::Only(viewer),
				assignable: false,
			},
			RoleDef {
				key: "owner",
				description: "Owner",
				grants: GrantSet::All,
				assignable: true,
			},
		];
		Catalog::load(PERMS, &roles, &[]).unwrap()
	}

	fn pairs(raw: &[(&str, &str)]) -> BTreeSet<(String, String)> {
		raw.iter().map(|(r, p)| (r.to_string(), p.to_string())).collect()
	}

	#[tokio::test]
	async fn inserts_declared_grants() {
		let store = Arc::new(MemoryGrantStore::new());
		let report = Reconciler::new(store.clone())
			.reconcile(&catalog(&["docs.document.read"]))
			.await
			.unwrap();

		assert_eq!(report.permissions_upserted, 3);
		assert_eq!(report.roles_reconciled, 2);
		assert_eq!(report.grants_inserted, 4);
		assert_eq!(report.grants_removed, 0);
		assert_eq!(
			store.grants(),
			pairs(&[
				("owner", "docs.document.create"),
				("owner", "docs.document.read"),
				("owner", "docs.document.update"),
				("viewer", "docs.document.read"),
			])
		);
	}

	#[tokio::test]
	async fn second_run_is_a_no_op() {
		let store = Arc::new(MemoryGrantStore::new());
		let reconciler = Reconciler::new(store.clone());
		let catalog = catalog(&["docs.document.read"]);

		reconciler.reconcile(&catalog).await.unwrap();
		let before = store.grants();
		let report = reconciler.reconcile(&catalog).await.unwrap();

		assert_eq!(store.grants(), before);
		assert_eq!(report.grants_inserted, 0);
		assert_eq!(report.grants_removed, 0);
	}

	#[tokio::test]
	async fn removes_drifted_grant() {
		let store = Arc::new(MemoryGrantStore::new());
		let reconciler = Reconciler::new(store.clone());
		let catalog = catalog(&["docs.document.read"]);
		reconciler.reconcile(&catalog).await.unwrap();

		store.link("viewer", "docs.document.update");
		let report = reconciler.reconcile(&catalog).await.unwrap();

		assert_eq!(report.grants_removed, 1);
		assert!(!store
			.grants()
			.contains(&("viewer".to_string(), "docs.document.update".to_string())));
	}

	#[tokio::test]
	async fn narrowing_a_role_removes_grants() {
		let store = Arc::new(MemoryGrantStore::new());
		let reconciler = Reconciler::new(store.clone());
		reconciler
			.reconcile(&catalog(&["docs.document.read", "docs.document.create"]))
			.await
			.unwrap();

		let report = reconciler
			.reconcile(&catalog(&["docs.document.read"]))
			.await
			.unwrap();

		assert_eq!(report.grants_removed, 1);
		let viewer: BTreeSet<_> = store
			.grants()
			.into_iter()
			.filter(|(r, _)| r == "viewer")
			.collect();
		assert_eq!(viewer, pairs(&[("viewer", "docs.document.read")]));
	}

	#[tokio::test]
	async fn leaves_links_to_untracked_permissions() {
		let store = Arc::new(MemoryGrantStore::new());
		store.link("viewer", "legacy.thing.do");

		Reconciler::new(store.clone())
			.reconcile(&catalog(&["docs.document.read"]))
			.await
			.unwrap();

		assert!(store
			.grants()
			.contains(&("viewer".to_string(), "legacy.thing.do".to_string())));
	}

	#[tokio::test]
	async fn requeries_role_id_when_upsert_reports_none() {
		let store = Arc::new(MemoryGrantStore::new());
		store.upsert_returns_no_id.store(true, Ordering::SeqCst);

		let report = Reconciler::new(store.clone())
			.reconcile(&catalog(&["docs.document.read"]))
			.await
			.unwrap();

		assert_eq!(report.grants_inserted, 4);
	}

	#[tokio::test]
	async fn unresolvable_role_is_fatal_and_touches_no_links() {
		let store = Arc::new(MemoryGrantStore::new());
		store
			.unresolvable_roles
			.lock()
			.unwrap()
			.insert("viewer".to_string());

		let err = Reconciler::new(store.clone())
			.reconcile(&catalog(&["docs.document.read"]))
			.await
			.unwrap_err();

		match err {
			AuthzError::ReconciliationFatal { role, .. } => assert_eq!(role.as_str(), "viewer"),
			other => panic!("unexpected error: {other}"),
		}
		assert!(store.grants().is_empty());
	}

	#[tokio::test]
	async fn unmapped_permission_is_fatal_for_its_role() {
		let store = Arc::new(MemoryGrantStore::new());
		store
			.unmapped_permissions
			.lock()
			.unwrap()
			.insert("docs.document.create".to_string());

		let err = Reconciler::new(store.clone())
			.reconcile(&catalog(&["docs.document.read"]))
			.await
			.unwrap_err();

		match err {
			AuthzError::ReconciliationFatal { role, reason } => {
				assert_eq!(role.as_str(), "owner");
				assert!(reason.contains("docs.document.create"));
			}
			other => panic!("unexpected error: {other}"),
		}
		assert_eq!(store.grants(), pairs(&[("viewer", "docs.document.read")]));
	}

	#[tokio::test]
	async fn store_outage_propagates() {
		let store = Arc::new(MemoryGrantStore::new());
		store.unavailable.store(true, Ordering::SeqCst);

		let result = Reconciler::new(store)
			.reconcile(&catalog(&["docs.document.read"]))
			.await;
		assert!(matches!(result, Err(AuthzError::StoreUnavailable(_))));
	}

	#[tokio::test]
	async fn concurrent_runs_converge() {
		let store = Arc::new(MemoryGrantStore::new());
		let catalog = Catalog::builtin().unwrap();
		let a = Reconciler::new(store.clone());
		let b = Reconciler::new(store.clone());

		let (left, right) = tokio::join!(a.reconcile(&catalog), b.reconcile(&catalog));
		left.unwrap();
		right.unwrap();

		let expected: BTreeSet<_> = catalog
			.desired_grants()
			.into_iter()
			.map(|g| (g.role_key.to_string(), g.permission_key.to_string()))
			.collect();
		assert_eq!(store.grants(), expected);
	}
}
