// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime configuration types with resolved defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::layer::*;
use crate::paths::PathsConfig;
use crate::ConfigError;

pub const DEFAULT_ACTIVE_AGENT: &str = "claude-code";
pub const DEFAULT_MAX_NOTE_CHARS: usize = 10_000;

/// The final, validated configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VellumConfig {
	pub global: GlobalConfig,
	pub agents: BTreeMap<String, AgentConfig>,
	pub permissions: PermissionsConfig,
	pub context: ContextConfig,
	pub logging: LoggingConfig,

	/// Resolved XDG paths (not serialized)
	#[serde(skip)]
	pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
	pub active_agent: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
	pub display_name: String,
	pub command: String,
	#[serde(default)]
	pub args: Vec<String>,
	#[serde(default)]
	pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PermissionsConfig {
	pub auto_allow: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContextConfig {
	pub auto_attach_active_note: bool,
	pub max_note_chars: usize,
}

impl Default for ContextConfig {
	fn default() -> Self {
		Self {
			auto_attach_active_note: true,
			max_note_chars: DEFAULT_MAX_NOTE_CHARS,
		}
	}
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

impl FromStr for LogLevel {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"error" => Ok(LogLevel::Error),
			"warn" | "warning" => Ok(LogLevel::Warn),
			"info" => Ok(LogLevel::Info),
			"debug" => Ok(LogLevel::Debug),
			"trace" => Ok(LogLevel::Trace),
			_ => Err(ConfigError::invalid_value(
				"logging.level",
				format!("unknown level '{s}'"),
			)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
	Compact,
}

impl FromStr for LogFormat {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"pretty" | "text" => Ok(LogFormat::Pretty),
			"json" => Ok(LogFormat::Json),
			"compact" => Ok(LogFormat::Compact),
			_ => Err(ConfigError::invalid_value(
				"logging.format",
				format!("unknown format '{s}'"),
			)),
		}
	}
}

/// Agents known without any configuration.
pub fn builtin_agents() -> BTreeMap<String, AgentConfig> {
	let mut agents = BTreeMap::new();
	agents.insert(
		"claude-code".to_string(),
		AgentConfig {
			display_name: "Claude Code".to_string(),
			command: "claude-code-acp".to_string(),
			args: Vec::new(),
			env: BTreeMap::new(),
		},
	);
	agents.insert(
		"gemini-cli".to_string(),
		AgentConfig {
			display_name: "Gemini CLI".to_string(),
			command: "gemini".to_string(),
			args: vec!["--experimental-acp".to_string()],
			env: BTreeMap::new(),
		},
	);
	agents.insert(
		"codex".to_string(),
		AgentConfig {
			display_name: "Codex".to_string(),
			command: "codex-acp".to_string(),
			args: Vec::new(),
			env: BTreeMap::new(),
		},
	);
	agents
}

impl VellumConfig {
	/// Build runtime config from a merged layer and paths.
	pub fn from_layer(layer: ConfigLayer, paths: PathsConfig) -> Result<Self, ConfigError> {
		let global = build_global_config(layer.global);
		let agents = build_agents_config(layer.agents);
		let permissions = PermissionsConfig {
			auto_allow: layer
				.permissions
				.and_then(|p| p.auto_allow)
				.unwrap_or(false),
		};
		let context = build_context_config(layer.context);
		let logging = build_logging_config(layer.logging)?;

		Ok(Self {
			global,
			agents,
			permissions,
			context,
			logging,
			paths,
		})
	}

	pub fn agent(&self, id: &str) -> Option<&AgentConfig> {
		self.agents.get(id)
	}

	pub fn active_agent(&self) -> Result<&AgentConfig, ConfigError> {
		self
			.agent(&self.global.active_agent)
			.ok_or_else(|| ConfigError::AgentNotFound(self.global.active_agent.clone()))
	}
}

fn build_global_config(layer: Option<GlobalLayer>) -> GlobalConfig {
	let layer = layer.unwrap_or_default();
	GlobalConfig {
		active_agent: layer
			.active_agent
			.unwrap_or_else(|| DEFAULT_ACTIVE_AGENT.to_string()),
	}
}

fn build_agents_config(layer: Option<AgentsLayer>) -> BTreeMap<String, AgentConfig> {
	let mut agents = builtin_agents();

	for (id, entry) in layer.map(|l| l.entries).unwrap_or_default() {
		let base = agents.remove(&id);
		let config = AgentConfig {
			display_name: entry
				.display_name
				.or_else(|| base.as_ref().map(|b| b.display_name.clone()))
				.unwrap_or_else(|| id.clone()),
			command: entry
				.command
				.or_else(|| base.as_ref().map(|b| b.command.clone()))
				.unwrap_or_default(),
			args: entry
				.args
				.or_else(|| base.as_ref().map(|b| b.args.clone()))
				.unwrap_or_default(),
			env: entry
				.env
				.map(|env| env.into_iter().collect())
				.or_else(|| base.as_ref().map(|b| b.env.clone()))
				.unwrap_or_default(),
		};
		agents.insert(id, config);
	}

	agents
}

fn build_context_config(layer: Option<ContextLayer>) -> ContextConfig {
	let layer = layer.unwrap_or_default();
	let defaults = ContextConfig::default();
	ContextConfig {
		auto_attach_active_note: layer
			.auto_attach_active_note
			.unwrap_or(defaults.auto_attach_active_note),
		max_note_chars: layer.max_note_chars.unwrap_or(defaults.max_note_chars),
	}
}

fn build_logging_config(layer: Option<LoggingLayer>) -> Result<LoggingConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	Ok(LoggingConfig {
		level: layer
			.level
			.as_deref()
			.map(LogLevel::from_str)
			.transpose()?
			.unwrap_or_default(),
		format: layer
			.format
			.as_deref()
			.map(LogFormat::from_str)
			.transpose()?
			.unwrap_or_default(),
	})
}
