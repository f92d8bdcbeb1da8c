// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::pool::AUTHZ_TABLES;

/// Verify the database answers queries and the Grant Store schema exists.
///
/// # Errors
/// - `DbError::Sqlx` if the database cannot be reached
/// - `DbError::NotFound` naming the first missing table
#[tracing::instrument(skip(pool))]
pub async fn check_readiness(pool: &SqlitePool) -> Result<(), DbError> {
	sqlx::query("SELECT 1").execute(pool).await?;

	let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
		.fetch_all(pool)
		.await?;
	let present: Vec<String> = rows.iter().map(|r| r.get("name")).collect();

	if let Some(missing) = AUTHZ_TABLES
		.iter()
		.find(|table| !present.iter().any(|name| name == *table))
	{
		tracing::warn!(table = %missing, "authz table missing");
		return Err(DbError::NotFound(format!("table {missing}")));
	}

	tracing::debug!("grant store ready");
	Ok(())
}
