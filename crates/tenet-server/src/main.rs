// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tenet authorization server binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tenet_server::{open_grant_store, AssignRoleRequest, AuthzService, CheckRequest};
use tenet_server_config::{LogFormat, ServerConfig};
use tenet_server_db::{check_readiness, connect_existing, GrantRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Tenet - tenant-scoped authorization.
#[derive(Parser, Debug)]
#[command(name = "tenet-server", about = "Tenant-scoped authorization server", version)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/tenet/server.toml)
	#[arg(long, global = true, env = "TENET_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Converge persisted grants with the permission catalog
	Reconcile,
	/// Decide whether a user may perform an action
	Check {
		#[arg(long)]
		user: String,
		/// Omit for global actions
		#[arg(long)]
		workspace: Option<String>,
		#[arg(long)]
		action: String,
	},
	/// Assign a role to a user within a workspace
	AssignRole {
		#[arg(long)]
		user: String,
		#[arg(long)]
		workspace: String,
		#[arg(long)]
		role: String,
	},
	/// Exit non-zero unless the grant store is reachable and migrated
	Ready,
}

fn init_tracing(config: &ServerConfig) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);

	// stdout carries command output
	match config.logging.format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
			.init(),
		LogFormat::Pretty => registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init(),
	}
}

async fn open_service(
	config: &ServerConfig,
	reconcile_first: bool,
) -> Result<AuthzService, tenet_server::ServerError> {
	let pool = open_grant_store(&config.database).await?;
	let service = AuthzService::builtin(GrantRepository::new(pool))?;
	if reconcile_first {
		service.reconcile().await?;
	}
	Ok(service)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => tenet_server_config::load_config_with_file(path)?,
		None => tenet_server_config::load_config()?,
	};

	init_tracing(&config);

	tracing::info!(
		database = %config.database.url,
		command = ?args.command,
		"starting tenet-server"
	);

	match args.command {
		Command::Ready => {
			let pool = connect_existing(&config.database.url).await?;
			check_readiness(&pool).await?;
			println!("ready");
		}
		Command::Reconcile => {
			let service = open_service(&config, false).await?;
			let report = service.reconcile().await?;
			println!("{}", serde_json::to_string(&report)?);
		}
		Command::Check {
			user,
			workspace,
			action,
		} => {
			let service = open_service(&config, config.reconcile.on_startup).await?;
			let response = service
				.check(&CheckRequest {
					user_id: user,
					workspace_id: workspace,
					action_key: action,
				})
				.await?;
			println!("{}", serde_json::to_string(&response)?);
		}
		Command::AssignRole {
			user,
			workspace,
			role,
		} => {
			let service = open_service(&config, config.reconcile.on_startup).await?;
			service
				.assign_role(&AssignRoleRequest {
					user_id: user,
					workspace_id: workspace,
					role_key: role,
				})
				.await?;
			println!("{}", serde_json::json!({ "assigned": true }));
		}
	}

	Ok(())
}
