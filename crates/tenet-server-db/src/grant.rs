// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant Store repository.
//!
//! This module provides database access for the authorization relations:
//! - Permissions and roles (upserted by key from the catalog)
//! - Role → permission links (`role_permissions`)
//! - Principal → role assignments per workspace (`user_roles`)
//!
//! Every write is a single conflict-tolerant statement, so concurrent
//! reconciliations and decision reads never observe a half-written link.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, QueryBuilder, Row, Sqlite};
use tenet_server_authz::{
	CatalogStore, GrantChecker, Permission, PermissionId, PermissionKey, PrincipalId, Role,
	RoleAssignment, RoleAssignmentStore, RoleFetcher, RoleGrant, RoleId, RoleKey, StoreError,
	TenantId,
};
use uuid::Uuid;

use crate::error::DbError;

/// Repository for the Grant Store relations.
///
/// All IDs are UUIDs stored as strings in SQLite.
#[derive(Clone)]
pub struct GrantRepository {
	pool: SqlitePool,
}

impl GrantRepository {
	/// Create a new repository with the given pool.
	///
	/// # Arguments
	/// * `pool` - SQLite connection pool
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	// =========================================================================
	// Decision reads
	// =========================================================================

	/// Role keys held by a principal within a workspace.
	///
	/// Assignments whose role row does not exist are ignored.
	#[tracing::instrument(skip(self), fields(principal_id = %principal_id, tenant_id = %tenant_id))]
	pub async fn fetch_role_keys(
		&self,
		principal_id: &PrincipalId,
		tenant_id: &TenantId,
	) -> Result<BTreeSet<RoleKey>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT r.key
			FROM user_roles ur
			INNER JOIN roles r ON ur.role_key = r.key
			WHERE ur.user_id = ? AND ur.workspace_id = ?
			"#,
		)
		.bind(principal_id.to_string())
		.bind(tenant_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let keys = rows
			.iter()
			.map(|r| parse_role_key(r.get("key")))
			.collect::<Result<BTreeSet<_>, _>>()?;
		tracing::debug!(count = keys.len(), "fetched role keys");
		Ok(keys)
	}

	/// Returns true if any of `role_keys` is linked to the permission `action_key`.
	#[tracing::instrument(skip(self, role_keys), fields(roles = role_keys.len(), action = %action_key))]
	pub async fn role_set_grants(
		&self,
		role_keys: &BTreeSet<RoleKey>,
		action_key: &str,
	) -> Result<bool, DbError> {
		if role_keys.is_empty() {
			return Ok(false);
		}

		let mut builder = QueryBuilder::<Sqlite>::new(
			r#"
			SELECT 1
			FROM role_permissions rp
			INNER JOIN roles r ON rp.role_id = r.id
			INNER JOIN permissions p ON rp.permission_id = p.id
			WHERE p.key = "#,
		);
		builder.push_bind(action_key.to_string());
		builder.push(" AND r.key IN (");
		let mut separated = builder.separated(", ");
		for key in role_keys {
			separated.push_bind(key.to_string());
		}
		separated.push_unseparated(") LIMIT 1");

		let row = builder.build().fetch_optional(&self.pool).await?;
		Ok(row.is_some())
	}

	// =========================================================================
	// Catalog persistence
	// =========================================================================

	/// Insert permissions by key, updating descriptions of existing rows.
	#[tracing::instrument(skip(self, permissions), fields(count = permissions.len()))]
	pub async fn upsert_permissions(&self, permissions: &[Permission]) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let mut tx = self.pool.begin().await?;

		for permission in permissions {
			sqlx::query(
				r#"
				INSERT INTO permissions (id, key, description, created_at)
				VALUES (?, ?, ?, ?)
				ON CONFLICT(key) DO UPDATE SET description = excluded.description
				"#,
			)
			.bind(PermissionId::generate().to_string())
			.bind(permission.key.as_str())
			.bind(&permission.description)
			.bind(&now)
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;
		tracing::debug!(count = permissions.len(), "permissions upserted");
		Ok(())
	}

	/// Persisted ids for the given permission keys. Unknown keys are omitted.
	#[tracing::instrument(skip(self, keys), fields(count = keys.len()))]
	pub async fn permission_ids(
		&self,
		keys: &[PermissionKey],
	) -> Result<HashMap<PermissionKey, PermissionId>, DbError> {
		if keys.is_empty() {
			return Ok(HashMap::new());
		}

		let mut builder = QueryBuilder::<Sqlite>::new("SELECT id, key FROM permissions WHERE key IN (");
		let mut separated = builder.separated(", ");
		for key in keys {
			separated.push_bind(key.to_string());
		}
		separated.push_unseparated(")");

		let rows = builder.build().fetch_all(&self.pool).await?;
		rows
			.iter()
			.map(|r| {
				let key = parse_permission_key(r.get("key"))?;
				let id = PermissionId::new(parse_uuid(r.get("id"), "permission")?);
				Ok((key, id))
			})
			.collect()
	}

	/// Insert a role by key, updating the description of an existing row.
	///
	/// # Returns
	/// The role's id as reported by `RETURNING`, if any.
	#[tracing::instrument(skip(self, role), fields(role = %role.key))]
	pub async fn upsert_role(&self, role: &Role) -> Result<Option<RoleId>, DbError> {
		let row = sqlx::query(
			r#"
			INSERT INTO roles (id, key, description, created_at)
			VALUES (?, ?, ?, ?)
			ON CONFLICT(key) DO UPDATE SET description = excluded.description
			RETURNING id
			"#,
		)
		.bind(RoleId::generate().to_string())
		.bind(role.key.as_str())
		.bind(&role.description)
		.bind(Utc::now().to_rfc3339())
		.fetch_optional(&self.pool)
		.await?;

		row
			.map(|r| parse_uuid(r.get("id"), "role").map(RoleId::new))
			.transpose()
	}

	#[tracing::instrument(skip(self), fields(role = %key))]
	pub async fn find_role_id(&self, key: &RoleKey) -> Result<Option<RoleId>, DbError> {
		let row = sqlx::query("SELECT id FROM roles WHERE key = ?")
			.bind(key.as_str())
			.fetch_optional(&self.pool)
			.await?;

		row
			.map(|r| parse_uuid(r.get("id"), "role").map(RoleId::new))
			.transpose()
	}

	/// Permission ids currently linked to a role.
	#[tracing::instrument(skip(self), fields(role_id = %role_id))]
	pub async fn role_grant_ids(&self, role_id: &RoleId) -> Result<BTreeSet<PermissionId>, DbError> {
		let rows = sqlx::query("SELECT permission_id FROM role_permissions WHERE role_id = ?")
			.bind(role_id.to_string())
			.fetch_all(&self.pool)
			.await?;

		rows
			.iter()
			.map(|r| parse_uuid(r.get("permission_id"), "permission").map(PermissionId::new))
			.collect()
	}

	/// Link a permission to a role if not already linked.
	///
	/// # Returns
	/// `true` if a new link was written.
	#[tracing::instrument(skip(self), fields(role_id = %role_id, permission_id = %permission_id))]
	pub async fn insert_role_grant(
		&self,
		role_id: &RoleId,
		permission_id: &PermissionId,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			INSERT INTO role_permissions (role_id, permission_id)
			VALUES (?, ?)
			ON CONFLICT (role_id, permission_id) DO NOTHING
			"#,
		)
		.bind(role_id.to_string())
		.bind(permission_id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	/// Remove a role → permission link.
	///
	/// # Returns
	/// `true` if a link was removed.
	#[tracing::instrument(skip(self), fields(role_id = %role_id, permission_id = %permission_id))]
	pub async fn delete_role_grant(
		&self,
		role_id: &RoleId,
		permission_id: &PermissionId,
	) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM role_permissions WHERE role_id = ? AND permission_id = ?")
			.bind(role_id.to_string())
			.bind(permission_id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	/// Every role → permission link, by key.
	#[tracing::instrument(skip(self))]
	pub async fn list_role_grants(&self) -> Result<BTreeSet<RoleGrant>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT r.key AS role_key, p.key AS permission_key
			FROM role_permissions rp
			INNER JOIN roles r ON rp.role_id = r.id
			INNER JOIN permissions p ON rp.permission_id = p.id
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows
			.iter()
			.map(|r| {
				Ok(RoleGrant {
					role_key: parse_role_key(r.get("role_key"))?,
					permission_key: parse_permission_key(r.get("permission_key"))?,
				})
			})
			.collect()
	}

	// =========================================================================
	// Role assignment
	// =========================================================================

	/// Assign a role to a principal in a workspace. Insert-or-ignore.
	///
	/// # Errors
	/// Returns `DbError::Sqlx` if the role key has no row in `roles`.
	#[tracing::instrument(
		skip(self, assignment),
		fields(principal_id = %assignment.principal_id, tenant_id = %assignment.tenant_id, role = %assignment.role_key)
	)]
	pub async fn insert_role_assignment(&self, assignment: &RoleAssignment) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			INSERT INTO user_roles (user_id, workspace_id, role_key)
			VALUES (?, ?, ?)
			ON CONFLICT (user_id, workspace_id, role_key) DO NOTHING
			"#,
		)
		.bind(assignment.principal_id.to_string())
		.bind(assignment.tenant_id.to_string())
		.bind(assignment.role_key.as_str())
		.execute(&self.pool)
		.await?;

		let inserted = result.rows_affected() > 0;
		tracing::debug!(inserted, "role assignment written");
		Ok(inserted)
	}
}

fn parse_uuid(raw: String, what: &str) -> Result<Uuid, DbError> {
	Uuid::parse_str(&raw).map_err(|e| DbError::Internal(format!("Invalid {what} ID: {e}")))
}

fn parse_role_key(raw: String) -> Result<RoleKey, DbError> {
	RoleKey::parse(raw).map_err(|e| DbError::Internal(format!("Invalid role key: {e}")))
}

fn parse_permission_key(raw: String) -> Result<PermissionKey, DbError> {
	PermissionKey::parse(raw).map_err(|e| DbError::Internal(format!("Invalid permission key: {e}")))
}

#[async_trait]
impl RoleFetcher for GrantRepository {
	async fn fetch_role_keys(
		&self,
		principal_id: &PrincipalId,
		tenant_id: &TenantId,
	) -> Result<BTreeSet<RoleKey>, StoreError> {
		Ok(self.fetch_role_keys(principal_id, tenant_id).await?)
	}
}

#[async_trait]
impl GrantChecker for GrantRepository {
	async fn role_set_grants(
		&self,
		role_keys: &BTreeSet<RoleKey>,
		action_key: &str,
	) -> Result<bool, StoreError> {
		Ok(self.role_set_grants(role_keys, action_key).await?)
	}
}

#[async_trait]
impl CatalogStore for GrantRepository {
	async fn upsert_permissions(&self, permissions: &[Permission]) -> Result<(), StoreError> {
		Ok(self.upsert_permissions(permissions).await?)
	}

	async fn permission_ids(
		&self,
		keys: &[PermissionKey],
	) -> Result<HashMap<PermissionKey, PermissionId>, StoreError> {
		Ok(self.permission_ids(keys).await?)
	}

	async fn upsert_role(&self, role: &Role) -> Result<Option<RoleId>, StoreError> {
		Ok(self.upsert_role(role).await?)
	}

	async fn find_role_id(&self, key: &RoleKey) -> Result<Option<RoleId>, StoreError> {
		Ok(self.find_role_id(key).await?)
	}

	async fn role_grant_ids(&self, role_id: &RoleId) -> Result<BTreeSet<PermissionId>, StoreError> {
		Ok(self.role_grant_ids(role_id).await?)
	}

	async fn insert_role_grant(
		&self,
		role_id: &RoleId,
		permission_id: &PermissionId,
	) -> Result<bool, StoreError> {
		Ok(self.insert_role_grant(role_id, permission_id).await?)
	}

	async fn delete_role_grant(
		&self,
		role_id: &RoleId,
		permission_id: &PermissionId,
	) -> Result<bool, StoreError> {
		Ok(self.delete_role_grant(role_id, permission_id).await?)
	}
}

#[async_trait]
impl RoleAssignmentStore for GrantRepository {
	async fn insert_role_assignment(&self, assignment: &RoleAssignment) -> Result<bool, StoreError> {
		Ok(self.insert_role_assignment(assignment).await?)
	}
}
