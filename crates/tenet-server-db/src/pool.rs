// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;

use crate::error::DbError;

/// Tables the Grant Store owns.
pub const AUTHZ_TABLES: [&str; 4] = ["permissions", "roles", "role_permissions", "user_roles"];

const SCHEMA: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS permissions (
		id TEXT PRIMARY KEY NOT NULL,
		key TEXT NOT NULL UNIQUE,
		description TEXT,
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS roles (
		id TEXT PRIMARY KEY NOT NULL,
		key TEXT NOT NULL UNIQUE,
		description TEXT,
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS role_permissions (
		role_id TEXT NOT NULL REFERENCES roles(id),
		permission_id TEXT NOT NULL REFERENCES permissions(id),
		PRIMARY KEY (role_id, permission_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS user_roles (
		user_id TEXT NOT NULL,
		workspace_id TEXT NOT NULL,
		role_key TEXT NOT NULL REFERENCES roles(key),
		PRIMARY KEY (user_id, workspace_id, role_key)
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_user_roles_lookup ON user_roles(user_id, workspace_id)",
];

fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, DbError> {
	Ok(SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.foreign_keys(true))
}

/// Open the Grant Store, creating the database file if it does not exist.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./tenet.db")
///
/// # Errors
/// Returns `DbError::Internal` for a malformed URL and `DbError::Sqlx` if the
/// database cannot be opened.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = connect_options(database_url)?.create_if_missing(true);
	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}

/// Open an existing Grant Store without touching the filesystem.
///
/// A missing database file is an error, so readiness checks against a wrong
/// path fail instead of leaving an empty file behind.
#[tracing::instrument(skip(database_url))]
pub async fn connect_existing(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = connect_options(database_url)?.create_if_missing(false);
	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("connected to existing database");
	Ok(pool)
}

/// Create the Grant Store schema. Idempotent.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	let mut tx = pool.begin().await?;
	for statement in SCHEMA {
		sqlx::query(*statement).execute(&mut *tx).await?;
	}
	tx.commit().await?;

	tracing::debug!(tables = AUTHZ_TABLES.len(), "authz schema ready");
	Ok(())
}
