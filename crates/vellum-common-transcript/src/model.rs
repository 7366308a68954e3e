// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MessageIdError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
	pub fn new() -> Self {
		let uuid = uuid7::uuid7();
		Self(format!("M-{uuid}"))
	}

	pub fn parse(s: &str) -> Result<Self, MessageIdError> {
		if !s.starts_with("M-") {
			return Err(MessageIdError::InvalidPrefix(
				s.chars().take(2).collect::<String>(),
			));
		}

		uuid::Uuid::parse_str(&s[2..])?;

		Ok(Self(s.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Default for MessageId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for MessageId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for MessageId {
	type Err = MessageIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

/// Identifier the session assigns to an inbound permission request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
	pub fn generate() -> Self {
		Self(format!("P-{}", uuid::Uuid::new_v4()))
	}

	pub fn from_string(s: impl Into<String>) -> Self {
		Self(s.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	User,
	Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
	pub id: MessageId,
	pub role: Role,
	pub content: Vec<ContentBlock>,
	pub created_at: DateTime<Utc>,
}

impl Message {
	pub fn new(role: Role, content: Vec<ContentBlock>) -> Self {
		Self {
			id: MessageId::new(),
			role,
			content,
			created_at: Utc::now(),
		}
	}

	pub fn user(content: Vec<ContentBlock>) -> Self {
		Self::new(Role::User, content)
	}

	pub fn assistant(content: Vec<ContentBlock>) -> Self {
		Self::new(Role::Assistant, content)
	}

	/// Concatenated narrative text of the message, ignoring thoughts and tool
	/// calls.
	pub fn text(&self) -> String {
		self
			.content
			.iter()
			.filter_map(|block| match block {
				ContentBlock::Text { text } | ContentBlock::TextWithContext { text, .. } => {
					Some(text.as_str())
				}
				_ => None,
			})
			.collect()
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
	Text {
		text: String,
	},
	TextWithContext {
		text: String,
		context: AttachedContext,
	},
	Thought {
		text: String,
	},
	Image {
		mime_type: String,
		data: String,
	},
	ToolCall(ToolCall),
	Plan {
		entries: Vec<PlanEntry>,
	},
	Terminal {
		terminal_id: String,
	},
}

impl ContentBlock {
	pub fn text(text: impl Into<String>) -> Self {
		Self::Text { text: text.into() }
	}

	pub fn as_tool_call(&self) -> Option<&ToolCall> {
		match self {
			Self::ToolCall(call) => Some(call),
			_ => None,
		}
	}

	pub fn as_tool_call_mut(&mut self) -> Option<&mut ToolCall> {
		match self {
			Self::ToolCall(call) => Some(call),
			_ => None,
		}
	}
}

/// Badge recording which note a user message was sent with.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachedContext {
	pub note_name: String,
	pub note_path: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub selection: Option<LineRange>,
}

/// One-based inclusive line range.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineRange {
	pub from: u32,
	pub to: u32,
}

impl LineRange {
	pub fn new(from: u32, to: u32) -> Self {
		if from <= to {
			Self { from, to }
		} else {
			Self { from: to, to: from }
		}
	}
}

impl fmt::Display for LineRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}", self.from, self.to)
	}
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
	#[default]
	Pending,
	InProgress,
	Completed,
	Failed,
}

impl FromStr for ToolCallStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(Self::Pending),
			"in_progress" => Ok(Self::InProgress),
			"completed" => Ok(Self::Completed),
			"failed" => Ok(Self::Failed),
			_ => Err(format!("invalid tool call status: {s}")),
		}
	}
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
	Read,
	Edit,
	Delete,
	Move,
	Search,
	Execute,
	Think,
	Fetch,
	SwitchMode,
	Other,
}

impl ToolKind {
	/// Lenient parse: unrecognised kinds map to `Other`.
	pub fn parse_lenient(s: &str) -> Self {
		match s {
			"read" => Self::Read,
			"edit" => Self::Edit,
			"delete" => Self::Delete,
			"move" => Self::Move,
			"search" => Self::Search,
			"execute" => Self::Execute,
			"think" => Self::Think,
			"fetch" => Self::Fetch,
			"switch_mode" => Self::SwitchMode,
			_ => Self::Other,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolCallContentItem {
	Diff {
		path: String,
		#[serde(skip_serializing_if = "Option::is_none")]
		old_text: Option<String>,
		new_text: String,
	},
	Terminal {
		terminal_id: String,
	},
	Content {
		value: serde_json::Value,
	},
}

impl ToolCallContentItem {
	pub fn diff_path(&self) -> Option<&str> {
		match self {
			Self::Diff { path, .. } => Some(path),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
	pub tool_call_id: String,
	pub title: String,
	pub status: ToolCallStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub kind: Option<ToolKind>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub content: Vec<ToolCallContentItem>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub permission_request: Option<PermissionRequestView>,
}

impl ToolCall {
	pub fn new(tool_call_id: impl Into<String>, title: impl Into<String>) -> Self {
		Self {
			tool_call_id: tool_call_id.into(),
			title: title.into(),
			status: ToolCallStatus::Pending,
			kind: None,
			content: Vec::new(),
			permission_request: None,
		}
	}

	/// Appends a content item. A diff replaces any earlier diff for the same
	/// path, so only the latest edit to each file is kept.
	///
	/// Supersedence is keyed by path, not by variant: diffs for other paths
	/// stay, so a multi-file edit shows every file it touched. Non-diff items
	/// always accumulate.
	pub fn push_content(&mut self, item: ToolCallContentItem) {
		if let Some(path) = item.diff_path() {
			let path = path.to_string();
			self
				.content
				.retain(|existing| existing.diff_path() != Some(path.as_str()));
		}
		self.content.push(item);
	}

	/// Attaches a permission request. A resolved request with the same id is
	/// never overwritten.
	pub fn attach_permission(&mut self, view: PermissionRequestView) {
		if let Some(existing) = &self.permission_request {
			if existing.request_id == view.request_id && existing.is_resolved() {
				return;
			}
		}
		self.permission_request = Some(view);
	}
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOptionKind {
	AllowOnce,
	AllowAlways,
	RejectOnce,
	RejectAlways,
}

impl FromStr for PermissionOptionKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"allow_once" => Ok(Self::AllowOnce),
			"allow_always" => Ok(Self::AllowAlways),
			"reject_once" => Ok(Self::RejectOnce),
			"reject_always" => Ok(Self::RejectAlways),
			_ => Err(format!("invalid permission option kind: {s}")),
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionOption {
	pub option_id: String,
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub kind: Option<PermissionOptionKind>,
}

impl PermissionOption {
	pub fn new(
		option_id: impl Into<String>,
		name: impl Into<String>,
		kind: Option<PermissionOptionKind>,
	) -> Self {
		Self {
			option_id: option_id.into(),
			name: name.into(),
			kind,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionRequestView {
	pub request_id: RequestId,
	pub options: Vec<PermissionOption>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub selected_option_id: Option<String>,
	#[serde(default)]
	pub is_cancelled: bool,
}

impl PermissionRequestView {
	pub fn new(request_id: RequestId, options: Vec<PermissionOption>) -> Self {
		Self {
			request_id,
			options,
			selected_option_id: None,
			is_cancelled: false,
		}
	}

	pub fn is_resolved(&self) -> bool {
		self.selected_option_id.is_some() || self.is_cancelled
	}

	/// Options as offered to a user choosing by hand. "Always reject" is shown
	/// as a one-time rejection; the underlying option id is unchanged.
	pub fn manual_choices(&self) -> Vec<PermissionOption> {
		self
			.options
			.iter()
			.map(|option| match option.kind {
				Some(PermissionOptionKind::RejectAlways) => PermissionOption {
					option_id: option.option_id.clone(),
					name: "Reject".to_string(),
					kind: Some(PermissionOptionKind::RejectOnce),
				},
				_ => option.clone(),
			})
			.collect()
	}
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanEntryPriority {
	High,
	#[default]
	Medium,
	Low,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanEntryStatus {
	#[default]
	Pending,
	InProgress,
	Completed,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanEntry {
	pub content: String,
	#[serde(default)]
	pub priority: PlanEntryPriority,
	#[serde(default)]
	pub status: PlanEntryStatus,
}

impl PlanEntry {
	pub fn new(content: impl Into<String>) -> Self {
		Self {
			content: content.into(),
			priority: PlanEntryPriority::default(),
			status: PlanEntryStatus::default(),
		}
	}
}
