// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

use crate::model::{
	PermissionOption, PermissionRequestView, PlanEntry, ToolCall, ToolCallContentItem,
	ToolCallStatus, ToolKind,
};

/// Slash command advertised by the agent.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailableCommand {
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub input_hint: Option<String>,
}

/// Partial tool call carried by start and update events. Absent fields leave
/// the existing value untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolCallPatch {
	pub tool_call_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<ToolCallStatus>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub kind: Option<ToolKind>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub content: Vec<ToolCallContentItem>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub permission_request: Option<PermissionRequestView>,
}

impl ToolCallPatch {
	pub fn new(tool_call_id: impl Into<String>) -> Self {
		Self {
			tool_call_id: tool_call_id.into(),
			..Default::default()
		}
	}

	pub fn with_title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());
		self
	}

	pub fn with_status(mut self, status: ToolCallStatus) -> Self {
		self.status = Some(status);
		self
	}

	pub fn with_kind(mut self, kind: ToolKind) -> Self {
		self.kind = Some(kind);
		self
	}

	pub fn with_content(mut self, item: ToolCallContentItem) -> Self {
		self.content.push(item);
		self
	}

	pub fn with_permission(mut self, view: PermissionRequestView) -> Self {
		self.permission_request = Some(view);
		self
	}

	/// Builds a fresh tool call from this patch. Status falls back to pending.
	pub fn into_tool_call(self) -> ToolCall {
		let mut call = ToolCall::new(self.tool_call_id, self.title.unwrap_or_default());
		call.status = self.status.unwrap_or_default();
		call.kind = self.kind;
		for item in self.content {
			call.push_content(item);
		}
		call.permission_request = self.permission_request;
		call
	}

	/// Merges this patch into an existing tool call.
	pub fn merge_into(self, call: &mut ToolCall) {
		if let Some(title) = self.title {
			call.title = title;
		}
		if let Some(status) = self.status {
			call.status = status;
		}
		if let Some(kind) = self.kind {
			call.kind = Some(kind);
		}
		for item in self.content {
			call.push_content(item);
		}
		if let Some(view) = self.permission_request {
			call.attach_permission(view);
		}
	}
}

/// A single streaming update from the agent, already decoded from the wire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionUpdateEvent {
	UserMessageChunk { text: String },
	AgentTextChunk { text: String },
	AgentThoughtChunk { text: String },
	ToolCallStarted(ToolCallPatch),
	ToolCallUpdated(ToolCallPatch),
	PlanUpdated { entries: Vec<PlanEntry> },
	AvailableCommandsUpdated { commands: Vec<AvailableCommand> },
	CurrentModeUpdated { mode_id: String },
}

impl SessionUpdateEvent {
	pub fn kind_name(&self) -> &'static str {
		match self {
			Self::UserMessageChunk { .. } => "user_message_chunk",
			Self::AgentTextChunk { .. } => "agent_text_chunk",
			Self::AgentThoughtChunk { .. } => "agent_thought_chunk",
			Self::ToolCallStarted(_) => "tool_call_started",
			Self::ToolCallUpdated(_) => "tool_call_updated",
			Self::PlanUpdated { .. } => "plan_updated",
			Self::AvailableCommandsUpdated { .. } => "available_commands_updated",
			Self::CurrentModeUpdated { .. } => "current_mode_updated",
		}
	}
}

/// Inbound request from the agent asking the user to authorise a tool call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PermissionRequest {
	pub tool_call: ToolCallPatch,
	pub options: Vec<PermissionOption>,
}
