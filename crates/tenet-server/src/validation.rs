// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request validation for the authorization commands.
//!
//! Raw identifiers and keys are checked here and turned into typed values
//! before anything reaches the engines.

use serde::{Deserialize, Deserializer};
use tenet_server_authz::{PrincipalId, RoleKey, TenantId, MAX_KEY_LEN};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	#[error("invalid user id: {0}")]
	InvalidUserId(String),

	#[error("invalid workspace id: {0}")]
	InvalidWorkspaceId(String),

	#[error("action key must be 1 to 256 characters")]
	InvalidAction,

	#[error("invalid role key: {0}")]
	InvalidRole(String),
}

/// Parse a string as a PrincipalId.
pub fn parse_principal_id(id_str: &str) -> Result<PrincipalId, ValidationError> {
	Uuid::parse_str(id_str)
		.map(PrincipalId::new)
		.map_err(|_| ValidationError::InvalidUserId(id_str.to_string()))
}

/// Parse a string as a TenantId.
pub fn parse_tenant_id(id_str: &str) -> Result<TenantId, ValidationError> {
	Uuid::parse_str(id_str)
		.map(TenantId::new)
		.map_err(|_| ValidationError::InvalidWorkspaceId(id_str.to_string()))
}

/// Action keys are opaque here; only their length is bounded.
pub fn validate_action_key(action: &str) -> Result<(), ValidationError> {
	if action.is_empty() || action.chars().count() > MAX_KEY_LEN {
		return Err(ValidationError::InvalidAction);
	}
	Ok(())
}

/// Raw permission check request.
///
/// `workspaceId` must be present in the body; `null` selects the global
/// allow-list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckRequest {
	pub user_id: String,
	#[serde(deserialize_with = "required_nullable")]
	pub workspace_id: Option<String>,
	pub action_key: String,
}

fn required_nullable<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Option::<String>::deserialize(deserializer)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCheck {
	pub principal_id: PrincipalId,
	pub tenant_id: Option<TenantId>,
	pub action: String,
}

impl CheckRequest {
	pub fn validate(&self) -> Result<ValidCheck, ValidationError> {
		let principal_id = parse_principal_id(&self.user_id)?;
		let tenant_id = self.workspace_id.as_deref().map(parse_tenant_id).transpose()?;
		validate_action_key(&self.action_key)?;

		Ok(ValidCheck {
			principal_id,
			tenant_id,
			action: self.action_key.clone(),
		})
	}
}

/// Raw role assignment request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignRoleRequest {
	pub user_id: String,
	pub workspace_id: String,
	pub role_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidAssignment {
	pub principal_id: PrincipalId,
	pub tenant_id: TenantId,
	pub role: RoleKey,
}

impl AssignRoleRequest {
	/// Whether the role may be assigned is decided by the catalog, not here.
	pub fn validate(&self) -> Result<ValidAssignment, ValidationError> {
		Ok(ValidAssignment {
			principal_id: parse_principal_id(&self.user_id)?,
			tenant_id: parse_tenant_id(&self.workspace_id)?,
			role: RoleKey::parse(self.role_key.as_str())
				.map_err(|_| ValidationError::InvalidRole(self.role_key.clone()))?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const USER: &str = "6f1c2a7e-3b7d-4a58-9f0e-2d1a3c4b5e6f";
	const WORKSPACE: &str = "0b9e8d7c-6a5f-4e3d-8c2b-1a0f9e8d7c6b";

	fn check(workspace: Option<&str>, action: &str) -> CheckRequest {
		CheckRequest {
			user_id: USER.to_string(),
			workspace_id: workspace.map(str::to_string),
			action_key: action.to_string(),
		}
	}

	#[test]
	fn test_valid_check_with_workspace() {
		let valid = check(Some(WORKSPACE), "docs.document.read").validate().unwrap();
		assert_eq!(valid.principal_id.to_string(), USER);
		assert_eq!(valid.tenant_id.unwrap().to_string(), WORKSPACE);
	}

	#[test]
	fn test_valid_check_without_workspace() {
		let valid = check(None, "accounts.workspaces.create").validate().unwrap();
		assert!(valid.tenant_id.is_none());
	}

	#[test]
	fn test_rejects_bad_user_id() {
		let mut request = check(None, "docs.document.read");
		request.user_id = "not-a-uuid".to_string();
		assert!(matches!(request.validate(), Err(ValidationError::InvalidUserId(_))));
	}

	#[test]
	fn test_rejects_bad_workspace_id() {
		let err = check(Some("workspace-1"), "docs.document.read").validate().unwrap_err();
		assert_eq!(err, ValidationError::InvalidWorkspaceId("workspace-1".to_string()));
	}

	#[test]
	fn test_rejects_empty_action() {
		assert_eq!(
			check(None, "").validate().unwrap_err(),
			ValidationError::InvalidAction
		);
	}

	#[test]
	fn test_action_length_boundary() {
		assert!(check(None, &"a".repeat(MAX_KEY_LEN)).validate().is_ok());
		assert!(check(None, &"a".repeat(MAX_KEY_LEN + 1)).validate().is_err());
	}

	#[test]
	fn test_check_request_from_json() {
		let request: CheckRequest = serde_json::from_str(&format!(
			r#"{{"userId":"{USER}","workspaceId":null,"actionKey":"accounts.workspaces.create"}}"#
		))
		.unwrap();
		assert!(request.workspace_id.is_none());
		assert_eq!(request.validate().unwrap().action, "accounts.workspaces.create");

		let scoped: CheckRequest = serde_json::from_str(&format!(
			r#"{{"userId":"{USER}","workspaceId":"{WORKSPACE}","actionKey":"docs.document.read"}}"#
		))
		.unwrap();
		assert_eq!(scoped.workspace_id.as_deref(), Some(WORKSPACE));
	}

	#[test]
	fn test_check_request_requires_workspace_field() {
		let result = serde_json::from_str::<CheckRequest>(&format!(
			r#"{{"userId":"{USER}","actionKey":"docs.document.read"}}"#
		));
		assert!(result.is_err());
	}

	#[test]
	fn test_check_request_rejects_unknown_fields() {
		let result = serde_json::from_str::<CheckRequest>(&format!(
			r#"{{"userId":"{USER}","workspaceId":null,"actionKey":"docs.document.read","bogus":1}}"#
		));
		assert!(result.is_err());

		let legacy = serde_json::from_str::<CheckRequest>(&format!(
			r#"{{"userId":"{USER}","workspaceId":null,"action":"docs.document.read"}}"#
		));
		assert!(legacy.is_err());
	}

	#[test]
	fn test_assign_role_request_from_json() {
		let request: AssignRoleRequest = serde_json::from_str(&format!(
			r#"{{"userId":"{USER}","workspaceId":"{WORKSPACE}","roleKey":"workspace_owner"}}"#
		))
		.unwrap();
		assert_eq!(request.validate().unwrap().role.as_str(), "workspace_owner");

		let extra = serde_json::from_str::<AssignRoleRequest>(&format!(
			r#"{{"userId":"{USER}","workspaceId":"{WORKSPACE}","roleKey":"workspace_owner","admin":true}}"#
		));
		assert!(extra.is_err());
	}

	#[test]
	fn test_assign_role_request() {
		let request = AssignRoleRequest {
			user_id: USER.to_string(),
			workspace_id: WORKSPACE.to_string(),
			role_key: "workspace_member".to_string(),
		};
		assert_eq!(request.validate().unwrap().role.as_str(), "workspace_member");

		let bad = AssignRoleRequest {
			role_key: "Workspace Owner".to_string(),
			..request
		};
		assert!(matches!(bad.validate(), Err(ValidationError::InvalidRole(_))));
	}

	proptest! {
		#[test]
		fn arbitrary_action_keys_within_bounds_are_accepted(action in "[ -~]{1,256}") {
			prop_assert!(validate_action_key(&action).is_ok());
		}

		#[test]
		fn non_uuid_user_ids_are_rejected(raw in "[g-z]{1,40}") {
			prop_assert!(parse_principal_id(&raw).is_err());
		}
	}
}
