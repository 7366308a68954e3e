// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use serde::Deserialize;
use std::collections::HashMap;

/// Partial configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
	#[serde(default)]
	pub global: Option<GlobalLayer>,
	#[serde(default)]
	pub agents: Option<AgentsLayer>,
	#[serde(default)]
	pub permissions: Option<PermissionsLayer>,
	#[serde(default)]
	pub context: Option<ContextLayer>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalLayer {
	#[serde(default)]
	pub active_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentsLayer {
	#[serde(flatten)]
	pub entries: HashMap<String, AgentLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentLayer {
	#[serde(default)]
	pub display_name: Option<String>,
	#[serde(default)]
	pub command: Option<String>,
	#[serde(default)]
	pub args: Option<Vec<String>>,
	#[serde(default)]
	pub env: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionsLayer {
	#[serde(default)]
	pub auto_allow: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextLayer {
	#[serde(default)]
	pub auto_attach_active_note: Option<bool>,
	#[serde(default)]
	pub max_note_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

impl ConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.global, other.global, GlobalLayer::merge);
		merge_option(&mut self.agents, other.agents, AgentsLayer::merge);
		merge_option(&mut self.permissions, other.permissions, |t, s| {
			if s.auto_allow.is_some() {
				t.auto_allow = s.auto_allow;
			}
		});
		merge_option(&mut self.context, other.context, ContextLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

impl GlobalLayer {
	fn merge(&mut self, other: GlobalLayer) {
		if other.active_agent.is_some() {
			self.active_agent = other.active_agent;
		}
	}
}

impl AgentsLayer {
	/// Agents merge field by field, so a workspace file can override just the
	/// command of an agent defined in the user file.
	fn merge(&mut self, other: AgentsLayer) {
		for (id, agent) in other.entries {
			match self.entries.get_mut(&id) {
				Some(existing) => existing.merge(agent),
				None => {
					self.entries.insert(id, agent);
				}
			}
		}
	}
}

impl AgentLayer {
	pub(crate) fn merge(&mut self, other: AgentLayer) {
		if other.display_name.is_some() {
			self.display_name = other.display_name;
		}
		if other.command.is_some() {
			self.command = other.command;
		}
		if other.args.is_some() {
			self.args = other.args;
		}
		if other.env.is_some() {
			self.env = other.env;
		}
	}
}

impl ContextLayer {
	fn merge(&mut self, other: ContextLayer) {
		if other.auto_attach_active_note.is_some() {
			self.auto_attach_active_note = other.auto_attach_active_note;
		}
		if other.max_note_chars.is_some() {
			self.max_note_chars = other.max_note_chars;
		}
	}
}

impl LoggingLayer {
	fn merge(&mut self, other: LoggingLayer) {
		if other.level.is_some() {
			self.level = other.level;
		}
		if other.format.is_some() {
			self.format = other.format;
		}
	}
}
