// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for the authorization model.
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs ([`PrincipalId`],
//!   [`TenantId`], [`PermissionId`], [`RoleId`]) preventing accidental mixing
//! - **Keys**: Validated catalog keys ([`PermissionKey`], [`RoleKey`])
//! - **Records**: The four persisted relations ([`Permission`], [`Role`],
//!   [`RoleGrant`], [`RoleAssignment`])
//!
//! Keys borrow as `str`, so maps and sets keyed by them can be queried with a
//! raw action string straight from a request.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::error::AuthzError;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(PrincipalId, "Unique identifier for a principal (user).");
define_id_type!(TenantId, "Unique identifier for a tenant (workspace).");
define_id_type!(PermissionId, "Persisted identifier of a permission row.");
define_id_type!(RoleId, "Persisted identifier of a role row.");

// =============================================================================
// Keys
// =============================================================================

/// Maximum accepted length of a permission or action key.
pub const MAX_KEY_LEN: usize = 256;

/// The reserved role key that satisfies every permission check.
pub const SUPER_ADMIN: &str = "super_admin";

static PERMISSION_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[a-z][a-z0-9_]*\.[a-z][a-z0-9_]*\.[A-Za-z][A-Za-z0-9_]*$").unwrap()
});

static ROLE_KEY_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

/// A capability key of the form `service.resource.action`.
///
/// The service and resource segments are lowercase; the action segment may be
/// mixed case (`accounts.workspaces.listForUser`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionKey(String);

impl PermissionKey {
	/// Parse and validate a permission key.
	pub fn parse(key: impl Into<String>) -> Result<Self, AuthzError> {
		let key = key.into();
		if key.len() > MAX_KEY_LEN || !PERMISSION_KEY_REGEX.is_match(&key) {
			return Err(AuthzError::Validation(format!(
				"invalid permission key '{key}': expected service.resource.action"
			)));
		}
		Ok(Self(key))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for PermissionKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Borrow<str> for PermissionKey {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl TryFrom<String> for PermissionKey {
	type Error = AuthzError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

impl From<PermissionKey> for String {
	fn from(key: PermissionKey) -> Self {
		key.0
	}
}

/// A role key such as `workspace_owner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleKey(String);

impl RoleKey {
	/// Parse and validate a role key (lowercase snake case).
	pub fn parse(key: impl Into<String>) -> Result<Self, AuthzError> {
		let key = key.into();
		if key.len() > MAX_KEY_LEN || !ROLE_KEY_REGEX.is_match(&key) {
			return Err(AuthzError::Validation(format!("invalid role key '{key}'")));
		}
		Ok(Self(key))
	}

	/// The reserved bypass role.
	pub fn super_admin() -> Self {
		Self(SUPER_ADMIN.to_string())
	}

	pub fn is_super_admin(&self) -> bool {
		self.0 == SUPER_ADMIN
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for RoleKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Borrow<str> for RoleKey {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl TryFrom<String> for RoleKey {
	type Error = AuthzError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

impl From<RoleKey> for String {
	fn from(key: RoleKey) -> Self {
		key.0
	}
}

// =============================================================================
// Records
// =============================================================================

/// A grantable capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
	pub key: PermissionKey,
	pub description: String,
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
	pub key: RoleKey,
	pub description: String,
}

/// A role-to-permission link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleGrant {
	pub role_key: RoleKey,
	pub permission_key: PermissionKey,
}

/// A tenant-scoped role held by a principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
	pub principal_id: PrincipalId,
	pub tenant_id: TenantId,
	pub role_key: RoleKey,
}
