// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission catalog: the single authority for what can exist.
//!
//! The static tables in this module ([`AUTHZ_PERMISSIONS`], [`AUTHZ_ROLES`],
//! [`GLOBAL_ACTIONS`]) declare every permission, every role with the
//! permissions it is entitled to, and the platform-level actions any
//! authenticated principal may perform without a tenant.
//!
//! [`Catalog::load`] validates referential integrity once, at process start.
//! A loaded [`Catalog`] is immutable and is shared between engines via `Arc`.
//!
//! Permission key format: `{service}.{resource}.{action}`.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::error::CatalogError;
use crate::resolution::GrantMap;
use crate::types::{Permission, PermissionKey, Role, RoleGrant, RoleKey};

// =============================================================================
// Static definitions
// =============================================================================

/// A permission as declared in source.
#[derive(Debug, Clone, Copy)]
pub struct PermissionDef {
	pub key: &'static str,
	pub description: &'static str,
}

/// The permissions a role is entitled to.
#[derive(Debug, Clone, Copy)]
pub enum GrantSet {
	/// Every permission in the catalog.
	All,
	/// An explicit list of permission keys.
	Only(&'static [&'static str]),
}

/// A role as declared in source.
#[derive(Debug, Clone, Copy)]
pub struct RoleDef {
	pub key: &'static str,
	pub description: &'static str,
	pub grants: GrantSet,
	/// Whether the role-assignment workflow may hand this role out.
	pub assignable: bool,
}

const fn perm(key: &'static str, description: &'static str) -> PermissionDef {
	PermissionDef { key, description }
}

pub static AUTHZ_PERMISSIONS: &[PermissionDef] = &[
	// Workspaces (global)
	perm("accounts.workspaces.create", "Create workspaces"),
	perm("accounts.workspaces.listForUser", "List workspaces for user"),
	// Workspace invites
	perm("accounts.invites.create", "Create workspace invites"),
	// Documents
	perm("docs.document.create", "Create documents"),
	perm("docs.document.read", "Read documents"),
	perm("docs.document.update", "Update documents"),
	perm("docs.document.listByWorkspace", "List documents by workspace"),
	// CMS blog entries (legacy)
	perm("cms.blog_entry.create", "Create blog entries"),
	perm("cms.blog_entry.read", "Read blog entries"),
	perm("cms.blog_entry.listPublished", "List published blog entries"),
	perm("cms.blog_entry.getPublishedBySlug", "Get published blog entry by slug"),
	perm("cms.blog_entry.listAdmin", "List blog entries (admin)"),
	perm("cms.blog_entry.updateMeta", "Update blog entry metadata"),
	// CMS content types
	perm("cms.content_type.manage", "Manage content types (create, update, delete)"),
	// CMS content entries
	perm("cms.content_entry.create", "Create content entries"),
	perm("cms.content_entry.update", "Update content entries"),
	perm("cms.content_entry.publish", "Publish content entries"),
	perm("cms.content_entry.listPublished", "List published content entries"),
	perm("cms.content_entry.getPublishedBySlug", "Get published content entry by slug"),
	// CMS generic content (legacy)
	perm("cms.content.create", "Create content"),
	perm("cms.content.listPublished", "List published content"),
	perm("cms.content.getPublishedBySlug", "Get published content by slug"),
	// CMS templates and content types (legacy)
	perm("cms.templates.listGlobal", "List global templates"),
	perm("cms.content_types.listForWorkspace", "List content types for workspace"),
	// CMS comments
	perm("cms.comments.create", "Create comments"),
	perm("cms.comments.listForEntry", "List comments for entry"),
	perm("cms.comments.moderate", "Moderate comments (approve, reject, delete)"),
	// Telemetry
	perm("telemetry.events.view", "View telemetry events and stats for workspace"),
];

pub static AUTHZ_ROLES: &[RoleDef] = &[
	RoleDef {
		key: "workspace_owner",
		description: "Workspace Owner with full access",
		grants: GrantSet::All,
		assignable: true,
	},
	RoleDef {
		key: "workspace_member",
		description: "Workspace Member",
		grants: GrantSet::Only(&[]),
		assignable: true,
	},
	RoleDef {
		key: "content_editor",
		description: "Content Editor",
		grants: GrantSet::Only(&[
			"docs.document.create",
			"docs.document.read",
			"docs.document.update",
			"docs.document.listByWorkspace",
			"cms.content_type.manage",
			"cms.content_entry.create",
			"cms.content_entry.update",
			"cms.content_entry.publish",
			"cms.content_entry.listPublished",
			"cms.content_entry.getPublishedBySlug",
			"cms.blog_entry.create",
			"cms.blog_entry.read",
			"cms.blog_entry.listPublished",
			"cms.blog_entry.getPublishedBySlug",
			"cms.blog_entry.listAdmin",
			"cms.blog_entry.updateMeta",
			"cms.content.create",
			"cms.content.listPublished",
			"cms.content.getPublishedBySlug",
			"cms.templates.listGlobal",
			"cms.content_types.listForWorkspace",
			"cms.comments.create",
			"cms.comments.listForEntry",
			"cms.comments.moderate",
			"accounts.workspaces.create",
			"accounts.workspaces.listForUser",
		]),
		assignable: false,
	},
	// Read and list published content only; no create, update, publish or moderate.
	RoleDef {
		key: "read_only",
		description: "Read Only User",
		grants: GrantSet::Only(&[
			"docs.document.read",
			"docs.document.listByWorkspace",
			"cms.content_entry.listPublished",
			"cms.content_entry.getPublishedBySlug",
			"cms.blog_entry.read",
			"cms.blog_entry.listPublished",
			"cms.blog_entry.getPublishedBySlug",
			"cms.comments.listForEntry",
			"cms.content.listPublished",
			"cms.content.getPublishedBySlug",
			"cms.templates.listGlobal",
			"cms.content_types.listForWorkspace",
			"accounts.workspaces.listForUser",
		]),
		assignable: false,
	},
	RoleDef {
		key: "super_admin",
		description: "Super Admin with all permissions",
		grants: GrantSet::All,
		assignable: false,
	},
];

/// Actions any authenticated principal may perform without a tenant.
pub static GLOBAL_ACTIONS: &[&str] = &["accounts.workspaces.create", "accounts.workspaces.listForUser"];

// =============================================================================
// Loaded catalog
// =============================================================================

/// A role together with its desired grant set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRole {
	pub role: Role,
	pub grants: BTreeSet<PermissionKey>,
	pub assignable: bool,
}

/// A validated, immutable permission catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
	permissions: Vec<Permission>,
	roles: Vec<CatalogRole>,
	global_actions: BTreeSet<PermissionKey>,
}

impl Catalog {
	/// Load the built-in catalog.
	pub fn builtin() -> Result<Self, CatalogError> {
		Self::load(AUTHZ_PERMISSIONS, AUTHZ_ROLES, GLOBAL_ACTIONS)
	}

	/// Validate and load a catalog from static definitions.
	///
	/// # Errors
	/// - [`CatalogError::InvalidKey`] for a malformed permission, role or global action key
	/// - [`CatalogError::DuplicatePermission`] / [`CatalogError::DuplicateRole`]
	/// - [`CatalogError::UnknownPermission`] when a role references a key not declared
	/// - [`CatalogError::UnknownGlobalAction`] when an allow-listed action is not declared
	pub fn load(
		permission_defs: &[PermissionDef],
		role_defs: &[RoleDef],
		global_action_defs: &[&str],
	) -> Result<Self, CatalogError> {
		let mut permissions = Vec::with_capacity(permission_defs.len());
		let mut known = BTreeSet::new();
		for def in permission_defs {
			let key = PermissionKey::parse(def.key).map_err(CatalogError::InvalidKey)?;
			if !known.insert(key.clone()) {
				return Err(CatalogError::DuplicatePermission(key));
			}
			permissions.push(Permission {
				key,
				description: def.description.to_string(),
			});
		}

		let mut roles = Vec::with_capacity(role_defs.len());
		let mut seen_roles = HashSet::new();
		for def in role_defs {
			let key = RoleKey::parse(def.key).map_err(CatalogError::InvalidKey)?;
			if !seen_roles.insert(key.clone()) {
				return Err(CatalogError::DuplicateRole(key));
			}

			let grants = match def.grants {
				GrantSet::All => known.clone(),
				GrantSet::Only(keys) => {
					let mut grants = BTreeSet::new();
					for raw in keys {
						let permission = PermissionKey::parse(*raw).map_err(CatalogError::InvalidKey)?;
						if !known.contains(&permission) {
							return Err(CatalogError::UnknownPermission {
								role: key,
								permission,
							});
						}
						grants.insert(permission);
					}
					grants
				}
			};

			roles.push(CatalogRole {
				role: Role {
					key,
					description: def.description.to_string(),
				},
				grants,
				assignable: def.assignable,
			});
		}

		let mut global_actions = BTreeSet::new();
		for raw in global_action_defs {
			let action = PermissionKey::parse(*raw).map_err(CatalogError::InvalidKey)?;
			if !known.contains(&action) {
				return Err(CatalogError::UnknownGlobalAction(action));
			}
			global_actions.insert(action);
		}

		debug!(
			permissions = permissions.len(),
			roles = roles.len(),
			global_actions = global_actions.len(),
			"permission catalog loaded"
		);

		Ok(Self {
			permissions,
			roles,
			global_actions,
		})
	}

	pub fn permissions(&self) -> &[Permission] {
		&self.permissions
	}

	pub fn roles(&self) -> &[CatalogRole] {
		&self.roles
	}

	pub fn global_actions(&self) -> &BTreeSet<PermissionKey> {
		&self.global_actions
	}

	/// Look up a role by key.
	pub fn role(&self, key: &str) -> Option<&CatalogRole> {
		self.roles.iter().find(|r| r.role.key.as_str() == key)
	}

	/// Returns true if the action is on the tenant-less allow-list.
	pub fn is_global_action(&self, action_key: &str) -> bool {
		self.global_actions.contains(action_key)
	}

	/// Every declared permission key, in declaration order.
	pub fn permission_keys(&self) -> Vec<PermissionKey> {
		self.permissions.iter().map(|p| p.key.clone()).collect()
	}

	/// The role → permissions map as declared, for in-memory resolution.
	pub fn grant_map(&self) -> GrantMap {
		self.roles
			.iter()
			.map(|r| (r.role.key.clone(), r.grants.iter().cloned().collect()))
			.collect::<HashMap<_, _>>()
	}

	/// Every role grant the catalog declares.
	pub fn desired_grants(&self) -> BTreeSet<RoleGrant> {
		self.roles
			.iter()
			.flat_map(|r| {
				r.grants.iter().map(move |p| RoleGrant {
					role_key: r.role.key.clone(),
					permission_key: p.clone(),
				})
			})
			.collect()
	}
}
