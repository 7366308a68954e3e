// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for Vellum.
//!
//! This crate provides:
//! - XDG Base Directory compliant path resolution
//! - Layered configuration from multiple sources
//! - TOML configuration file parsing
//! - Environment variable overrides
//! - Configuration validation

pub mod error;
pub mod layer;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod sources;
pub mod validation;

pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use paths::PathsConfig;
pub use registry::ConfigRegistry;
pub use runtime::{
	AgentConfig, ContextConfig, LogFormat, LogLevel, LoggingConfig, PermissionsConfig, VellumConfig,
};
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Load configuration from all sources with default precedence.
pub fn load_config() -> Result<VellumConfig, ConfigError> {
	load_config_with_cli(sources::CliOverrides::default())
}

/// Load configuration with CLI overrides.
///
/// An explicit `config_file` sits above the workspace file and below the
/// environment.
pub fn load_config_with_cli(cli: sources::CliOverrides) -> Result<VellumConfig, ConfigError> {
	let paths = paths::resolve_xdg_paths()?;

	let mut registry = ConfigRegistry::new();

	registry.register(Box::new(sources::DefaultsSource));
	registry.register(Box::new(sources::FileSource::system(&paths)));
	registry.register(Box::new(sources::FileSource::user(&paths)));
	if let Ok(ws) = sources::FileSource::workspace() {
		registry.register(Box::new(ws));
	}
	if let Some(ref path) = cli.config_file {
		registry.register(Box::new(sources::FileSource::custom(
			path.clone(),
			Precedence::ExplicitFile,
			"explicit-config",
		)));
	}
	registry.register(Box::new(sources::EnvSource::new()));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load(paths)
}
