// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tenet authorization server.
//!
//! Wires the catalog, the resolution and reconciliation engines and role
//! assignment over a SQLite Grant Store.

pub mod validation;

use std::sync::Arc;

use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use tenet_server_authz::{
	AuthzError, Catalog, CatalogError, ReconcileReport, Reconciler, ResolutionEngine, RoleAssigner,
};
use tenet_server_config::{ConfigError, DatabaseConfig};
use tenet_server_db::{create_pool, run_migrations, DbError, GrantRepository};

pub use validation::{AssignRoleRequest, CheckRequest, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error(transparent)]
	Authz(#[from] AuthzError),

	#[error(transparent)]
	Catalog(#[from] CatalogError),

	#[error(transparent)]
	Db(#[from] DbError),

	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Decision returned by [`AuthzService::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckResponse {
	pub allowed: bool,
}

/// Authorization operations over one Grant Store.
#[derive(Clone)]
pub struct AuthzService {
	catalog: Arc<Catalog>,
	resolver: ResolutionEngine,
	reconciler: Reconciler,
	assigner: RoleAssigner,
}

impl AuthzService {
	pub fn new(catalog: Arc<Catalog>, repo: GrantRepository) -> Self {
		let store = Arc::new(repo);
		Self {
			resolver: ResolutionEngine::from_catalog(&catalog, store.clone(), store.clone()),
			reconciler: Reconciler::new(store.clone()),
			assigner: RoleAssigner::new(catalog.clone(), store),
			catalog,
		}
	}

	/// Service over the built-in catalog.
	pub fn builtin(repo: GrantRepository) -> Result<Self, ServerError> {
		Ok(Self::new(Arc::new(Catalog::builtin()?), repo))
	}

	pub fn catalog(&self) -> &Catalog {
		&self.catalog
	}

	pub async fn reconcile(&self) -> Result<ReconcileReport, ServerError> {
		Ok(self.reconciler.reconcile(&self.catalog).await?)
	}

	pub async fn check(&self, request: &CheckRequest) -> Result<CheckResponse, ServerError> {
		let valid = request.validate()?;
		let allowed = self
			.resolver
			.check_permission(&valid.principal_id, valid.tenant_id.as_ref(), &valid.action)
			.await?;
		Ok(CheckResponse { allowed })
	}

	pub async fn assign_role(&self, request: &AssignRoleRequest) -> Result<(), ServerError> {
		let valid = request.validate()?;
		self
			.assigner
			.assign_role(&valid.principal_id, &valid.tenant_id, valid.role.as_str())
			.await?;
		Ok(())
	}
}

/// Open the Grant Store and bring its schema up to date.
pub async fn open_grant_store(config: &DatabaseConfig) -> Result<SqlitePool, ServerError> {
	let pool = create_pool(&config.url).await?;
	run_migrations(&pool).await?;
	Ok(pool)
}
