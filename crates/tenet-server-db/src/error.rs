// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tenet_server_authz::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Internal: {0}")]
	Internal(String),
}

impl From<DbError> for StoreError {
	fn from(err: DbError) -> Self {
		match err {
			DbError::Sqlx(e) => StoreError::Unavailable(e.to_string()),
			DbError::NotFound(msg) | DbError::Internal(msg) => StoreError::Inconsistent(msg),
		}
	}
}

pub type Result<T> = std::result::Result<T, DbError>;
