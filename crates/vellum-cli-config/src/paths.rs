// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XDG Base Directory compliant path resolution.

use std::path::PathBuf;

use crate::ConfigError;

/// Resolved config file locations.
#[derive(Debug, Clone)]
pub struct PathsConfig {
	/// User config file: ~/.config/vellum/config.toml
	pub user_config_file: PathBuf,
	/// System config file: /etc/vellum/config.toml
	pub system_config_file: PathBuf,
}

impl PathsConfig {
	pub fn config_dir(&self) -> PathBuf {
		self
			.user_config_file
			.parent()
			.map(|p| p.to_path_buf())
			.unwrap_or_else(|| self.user_config_file.clone())
	}
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			user_config_file: PathBuf::from("~/.config/vellum/config.toml"),
			system_config_file: PathBuf::from("/etc/vellum/config.toml"),
		}
	}
}

/// Resolve paths from XDG_CONFIG_HOME, falling back to ~/.config.
pub fn resolve_xdg_paths() -> Result<PathsConfig, ConfigError> {
	let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
		Some(dir) => PathBuf::from(dir),
		None => dirs::home_dir()
			.ok_or(ConfigError::HomeDirNotFound)?
			.join(".config"),
	};

	tracing::debug!(config_home = %config_home.display(), "resolved XDG paths");

	Ok(PathsConfig {
		user_config_file: config_home.join("vellum/config.toml"),
		system_config_file: PathBuf::from("/etc/vellum/config.toml"),
	})
}

/// Workspace config file path relative to the current directory.
pub fn workspace_config_path() -> Result<PathBuf, ConfigError> {
	let cwd = std::env::current_dir()?;
	Ok(cwd.join(".vellum/config.toml"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_resolve_xdg_paths_names_vellum() {
		if let Ok(paths) = resolve_xdg_paths() {
			assert!(paths.user_config_file.ends_with("vellum/config.toml"));
			assert_eq!(
				paths.system_config_file,
				PathBuf::from("/etc/vellum/config.toml")
			);
		}
	}

	#[test]
	fn test_config_dir_is_parent() {
		let paths = PathsConfig {
			user_config_file: PathBuf::from("/home/u/.config/vellum/config.toml"),
			system_config_file: PathBuf::from("/etc/vellum/config.toml"),
		};
		assert_eq!(paths.config_dir(), PathBuf::from("/home/u/.config/vellum"));
	}
}
