// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use tracing::warn;

use crate::runtime::VellumConfig;
use crate::ConfigError;

/// Upper bound on per-note context, well past any useful prompt size.
const MAX_NOTE_CHARS_LIMIT: usize = 1_000_000;

pub fn validate_config(config: &VellumConfig) -> Result<(), ConfigError> {
	validate_agents(config)?;
	validate_context(config)?;

	Ok(())
}

fn validate_agents(config: &VellumConfig) -> Result<(), ConfigError> {
	let active = config.active_agent()?;
	if active.command.trim().is_empty() {
		return Err(ConfigError::invalid_value(
			format!("agents.{}.command", config.global.active_agent),
			"command cannot be empty for the active agent",
		));
	}

	for (id, agent) in &config.agents {
		if id != &config.global.active_agent && agent.command.trim().is_empty() {
			warn!(agent = %id, "agent has no command configured");
		}
	}

	Ok(())
}

fn validate_context(config: &VellumConfig) -> Result<(), ConfigError> {
	let max = config.context.max_note_chars;

	if max == 0 {
		return Err(ConfigError::invalid_value(
			"context.max_note_chars",
			"must be at least 1",
		));
	}

	if max > MAX_NOTE_CHARS_LIMIT {
		return Err(ConfigError::invalid_value(
			"context.max_note_chars",
			format!("must be at most {MAX_NOTE_CHARS_LIMIT}"),
		));
	}

	Ok(())
}
