// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::path::PathBuf;

use tracing::{debug, trace, warn};

use crate::layer::*;
use crate::paths::PathsConfig;
use crate::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	SystemFile = 20,
	UserFile = 30,
	WorkspaceFile = 40,
	ExplicitFile = 45,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	fn precedence(&self) -> Precedence;

	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		// Defaults are applied when the runtime config is built
		Ok(ConfigLayer::default())
	}
}

/// File-based configuration source (TOML).
pub struct FileSource {
	path: PathBuf,
	precedence: Precedence,
	name: &'static str,
}

impl FileSource {
	pub fn system(paths: &PathsConfig) -> Self {
		Self {
			path: paths.system_config_file.clone(),
			precedence: Precedence::SystemFile,
			name: "system-config",
		}
	}

	pub fn user(paths: &PathsConfig) -> Self {
		Self {
			path: paths.user_config_file.clone(),
			precedence: Precedence::UserFile,
			name: "user-config",
		}
	}

	/// Workspace config: .vellum/config.toml
	pub fn workspace() -> Result<Self, ConfigError> {
		Ok(Self {
			path: crate::paths::workspace_config_path()?,
			precedence: Precedence::WorkspaceFile,
			name: "workspace-config",
		})
	}

	pub fn custom(path: PathBuf, precedence: Precedence, name: &'static str) -> Self {
		Self {
			path,
			precedence,
			name,
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}
	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path)?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Reads `VELLUM_*` variables from the process environment, or from a fixed
/// list when built with [`EnvSource::with_vars`].
#[derive(Default)]
pub struct EnvSource {
	vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_vars(vars: Vec<(String, String)>) -> Self {
		Self { vars: Some(vars) }
	}
}

fn parse_bool(key: &str, value: &str) -> Option<bool> {
	match value.to_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" => Some(false),
		_ => {
			warn!(key = %key, value = %value, "ignoring non-boolean env var");
			None
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		let mut layer = ConfigLayer::default();

		let vars = match &self.vars {
			Some(vars) => vars.clone(),
			None => std::env::vars().collect(),
		};

		for (key, value) in vars {
			if !key.starts_with("VELLUM_") {
				continue;
			}

			let value = value.trim().to_string();
			if value.is_empty() {
				continue;
			}

			trace!(key = %key, "processing env var");

			match key.as_str() {
				"VELLUM_ACTIVE_AGENT" => {
					layer
						.global
						.get_or_insert_with(GlobalLayer::default)
						.active_agent = Some(value);
				}
				"VELLUM_AUTO_ALLOW_PERMISSIONS" => {
					if let Some(flag) = parse_bool(&key, &value) {
						layer
							.permissions
							.get_or_insert_with(PermissionsLayer::default)
							.auto_allow = Some(flag);
					}
				}
				"VELLUM_AUTO_ATTACH_ACTIVE_NOTE" => {
					if let Some(flag) = parse_bool(&key, &value) {
						layer
							.context
							.get_or_insert_with(ContextLayer::default)
							.auto_attach_active_note = Some(flag);
					}
				}
				"VELLUM_MAX_NOTE_CHARS" => {
					if let Ok(v) = value.parse() {
						layer
							.context
							.get_or_insert_with(ContextLayer::default)
							.max_note_chars = Some(v);
					}
				}
				"VELLUM_LOG_LEVEL" => {
					layer
						.logging
						.get_or_insert_with(LoggingLayer::default)
						.level = Some(value);
				}
				"VELLUM_LOG_FORMAT" => {
					layer
						.logging
						.get_or_insert_with(LoggingLayer::default)
						.format = Some(value);
				}
				_ => {}
			}
		}

		Ok(layer)
	}
}

/// CLI override source.
pub struct CliSource {
	overrides: CliOverrides,
}

/// CLI argument overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub active_agent: Option<String>,
	pub auto_allow: Option<bool>,
	pub log_level: Option<String>,
	pub log_format: Option<String>,
	pub config_file: Option<PathBuf>,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let mut layer = ConfigLayer::default();

		if let Some(ref agent) = self.overrides.active_agent {
			layer
				.global
				.get_or_insert_with(GlobalLayer::default)
				.active_agent = Some(agent.clone());
		}

		if let Some(flag) = self.overrides.auto_allow {
			layer
				.permissions
				.get_or_insert_with(PermissionsLayer::default)
				.auto_allow = Some(flag);
		}

		if let Some(ref level) = self.overrides.log_level {
			layer
				.logging
				.get_or_insert_with(LoggingLayer::default)
				.level = Some(level.clone());
		}

		if let Some(ref format) = self.overrides.log_format {
			layer
				.logging
				.get_or_insert_with(LoggingLayer::default)
				.format = Some(format.clone());
		}

		Ok(layer)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Cli > Precedence::Environment);
		assert!(Precedence::Environment > Precedence::ExplicitFile);
		assert!(Precedence::ExplicitFile > Precedence::WorkspaceFile);
		assert!(Precedence::WorkspaceFile > Precedence::UserFile);
		assert!(Precedence::UserFile > Precedence::SystemFile);
		assert!(Precedence::SystemFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().expect("load");
		assert!(layer.global.is_none());
		assert!(layer.agents.is_none());
	}

	#[test]
	fn test_file_source_missing_file_returns_empty() {
		let source = FileSource::custom(
			PathBuf::from("/nonexistent/config.toml"),
			Precedence::UserFile,
			"test",
		);
		let layer = source.load().expect("load");
		assert!(layer.global.is_none());
	}

	#[test]
	fn test_file_source_parses_toml() {
		let mut file = tempfile::NamedTempFile::new().expect("temp file");
		writeln!(
			file,
			"[permissions]\nauto_allow = true\n\n[context]\nmax_note_chars = 2000"
		)
		.expect("write");

		let source = FileSource::custom(file.path().to_path_buf(), Precedence::UserFile, "test");
		let layer = source.load().expect("load");
		assert_eq!(layer.permissions.and_then(|p| p.auto_allow), Some(true));
		assert_eq!(layer.context.and_then(|c| c.max_note_chars), Some(2000));
	}

	#[test]
	fn test_file_source_reports_parse_error() {
		let mut file = tempfile::NamedTempFile::new().expect("temp file");
		writeln!(file, "[permissions\nauto_allow = ").expect("write");

		let source = FileSource::custom(file.path().to_path_buf(), Precedence::UserFile, "test");
		assert!(matches!(
			source.load(),
			Err(ConfigError::TomlParse { .. })
		));
	}

	#[test]
	fn test_env_source_reads_prefixed_vars() {
		let source = EnvSource::with_vars(vars(&[
			("VELLUM_ACTIVE_AGENT", "gemini-cli"),
			("VELLUM_AUTO_ALLOW_PERMISSIONS", "yes"),
			("VELLUM_MAX_NOTE_CHARS", "42"),
			("VELLUM_LOG_LEVEL", "debug"),
			("OTHER_VAR", "ignored"),
		]));

		let layer = source.load().expect("load");
		assert_eq!(
			layer.global.and_then(|g| g.active_agent).as_deref(),
			Some("gemini-cli")
		);
		assert_eq!(layer.permissions.and_then(|p| p.auto_allow), Some(true));
		assert_eq!(layer.context.and_then(|c| c.max_note_chars), Some(42));
		assert_eq!(layer.logging.and_then(|l| l.level).as_deref(), Some("debug"));
	}

	#[test]
	fn test_env_source_ignores_bad_bool_and_empty() {
		let source = EnvSource::with_vars(vars(&[
			("VELLUM_AUTO_ALLOW_PERMISSIONS", "maybe"),
			("VELLUM_ACTIVE_AGENT", "   "),
		]));
		let layer = source.load().expect("load");
		assert!(layer.permissions.is_none());
		assert!(layer.global.is_none());
	}

	#[test]
	fn test_cli_source_sets_overrides() {
		let source = CliSource::new(CliOverrides {
			active_agent: Some("codex".to_string()),
			auto_allow: Some(false),
			..Default::default()
		});
		let layer = source.load().expect("load");
		assert_eq!(
			layer.global.and_then(|g| g.active_agent).as_deref(),
			Some("codex")
		);
		assert_eq!(layer.permissions.and_then(|p| p.auto_allow), Some(false));
	}
}
