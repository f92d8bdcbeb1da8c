// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the Tenet authorization server.
//!
//! Layered from built-in defaults, a TOML file, and `TENET_SERVER_*`
//! environment variables, in increasing order of precedence.
//!
//! # Usage
//!
//! ```ignore
//! use tenet_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Grant store at {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub reconcile: ReconcileConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`TENET_SERVER_*`)
/// 2. Config file (`/etc/tenet/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let reconcile = layer.reconcile.unwrap_or_default().finalize();

	validate_config(&database)?;

	info!(
		database = %database.url,
		log_level = %logging.level,
		log_format = %logging.format,
		reconcile_on_startup = reconcile.on_startup,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		database,
		logging,
		reconcile,
	})
}

fn validate_config(database: &DatabaseConfig) -> Result<(), ConfigError> {
	if !database.url.starts_with("sqlite:") {
		return Err(ConfigError::Validation(format!(
			"database.url must be a sqlite: URL, got '{}'",
			database.url
		)));
	}
	Ok(())
}
