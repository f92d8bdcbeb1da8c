// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::pool::run_migrations;

/// Single-connection in-memory pool. Each `:memory:` connection is its own
/// database, so the pool must never open a second one.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.foreign_keys(true);
	SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.unwrap()
}

pub async fn create_authz_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	run_migrations(&pool).await.unwrap();
	pool
}
