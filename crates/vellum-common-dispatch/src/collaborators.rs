// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Interfaces to the agent process, the note store and authentication.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{NoteError, TransportError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMethod {
	pub id: String,
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}

impl AuthMethod {
	pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			description: None,
		}
	}
}

/// Result of opening a session with the agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStarted {
	pub session_id: SessionId,
	#[serde(default)]
	pub auth_methods: Vec<AuthMethod>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub current_mode_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
	EndTurn,
	MaxTokens,
	MaxTurnRequests,
	Refusal,
	Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
	pub mime_type: String,
	/// Base64 encoded image bytes.
	pub data: String,
}

/// What actually goes over the wire for one turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingPrompt {
	pub text: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub images: Vec<ImageAttachment>,
}

/// A note located by name in the user's vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRef {
	pub name: String,
	pub path: String,
}

/// Connection to a running agent.
#[async_trait]
pub trait Transport: Send + Sync {
	/// Opens a fresh conversation with the agent.
	async fn new_session(&self) -> Result<SessionStarted, TransportError>;

	/// Sends one prompt turn and waits for the agent to finish it.
	async fn prompt(
		&self,
		session_id: &SessionId,
		prompt: &OutgoingPrompt,
	) -> Result<StopReason, TransportError>;

	/// Asks the agent to abandon the turn in progress.
	async fn cancel(&self, session_id: &SessionId) -> Result<(), TransportError>;
}

#[async_trait]
pub trait NoteResolver: Send + Sync {
	fn resolve_mention(&self, name: &str) -> Option<NoteRef>;

	async fn read_content(&self, path: &str) -> Result<String, NoteError>;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
	/// Runs the given authentication method. `Ok(false)` means the user
	/// declined or the method did not complete.
	async fn authenticate(&self, method_id: &str) -> Result<bool, TransportError>;
}
