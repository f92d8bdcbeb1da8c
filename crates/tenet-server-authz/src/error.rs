// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::types::{PermissionKey, RoleKey};

/// Failure reported by a Grant Store capability.
///
/// Adapters map their own error types into this one; the core never inspects
/// the cause beyond displaying it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("grant store unavailable: {0}")]
	Unavailable(String),

	#[error("grant store returned inconsistent data: {0}")]
	Inconsistent(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
	#[error("Validation error: {0}")]
	Validation(String),

	/// Propagated as-is; callers decide whether indeterminate means deny.
	#[error(transparent)]
	StoreUnavailable(#[from] StoreError),

	#[error("Reconciliation aborted at role '{role}': {reason}")]
	ReconciliationFatal { role: RoleKey, reason: String },
}

/// Catalog load failures. All of them are fatal at process start.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
	#[error("Invalid catalog key: {0}")]
	InvalidKey(#[source] AuthzError),

	#[error("Duplicate permission key: {0}")]
	DuplicatePermission(PermissionKey),

	#[error("Duplicate role key: {0}")]
	DuplicateRole(RoleKey),

	#[error("Role '{role}' references unknown permission '{permission}'")]
	UnknownPermission {
		role: RoleKey,
		permission: PermissionKey,
	},

	#[error("Global action '{0}' is not a catalog permission")]
	UnknownGlobalAction(PermissionKey),
}

pub type Result<T> = std::result::Result<T, AuthzError>;
