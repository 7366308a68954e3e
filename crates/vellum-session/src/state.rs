// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use serde::Serialize;
use tracing::debug;
use vellum_common_dispatch::{AgentError, AuthMethod, SessionId};
use vellum_common_transcript::AvailableCommand;

use crate::lifecycle::{Coordinator, LifecycleEvent, SessionStatus};

/// Everything about the active session that is not part of the transcript.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionState {
	#[serde(flatten)]
	pub coordinator: Coordinator,
	pub agent_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_id: Option<SessionId>,
	pub auth_methods: Vec<AuthMethod>,
	pub available_commands: Vec<AvailableCommand>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub current_mode_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_error: Option<AgentError>,
	/// Turn whose completion may move the session out of `busy`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub active_turn: Option<u64>,
	#[serde(skip)]
	turns_started: u64,
}

impl SessionState {
	pub fn new(agent_id: impl Into<String>) -> Self {
		Self {
			agent_id: agent_id.into(),
			..Default::default()
		}
	}

	pub fn status(&self) -> SessionStatus {
		self.coordinator.status()
	}

	pub fn can_send(&self) -> bool {
		self.session_id.is_some() && self.coordinator.can_send()
	}

	/// Applies `event`, logging instead of failing when it no longer fits the
	/// current status (an operation raced with a disconnect).
	pub(crate) fn advance(&mut self, event: LifecycleEvent) {
		if let Err(err) = self.coordinator.apply(event) {
			debug!(error = %err, "ignoring stale lifecycle event");
		}
	}

	/// Allocates the id of a new turn and makes it the active one. Ids are
	/// never reused, even across sessions.
	pub(crate) fn begin_turn(&mut self) -> u64 {
		self.turns_started += 1;
		self.active_turn = Some(self.turns_started);
		self.turns_started
	}

	/// Ends `turn` if it is still the active one. Returns false for a turn
	/// that was cancelled or belongs to an earlier session.
	pub(crate) fn finish_turn(&mut self, turn: u64) -> bool {
		if self.active_turn != Some(turn) {
			return false;
		}
		self.active_turn = None;
		true
	}

	/// Drops everything tied to the previous agent session.
	pub(crate) fn reset_session(&mut self) {
		self.session_id = None;
		self.active_turn = None;
		self.auth_methods.clear();
		self.available_commands.clear();
		self.current_mode_id = None;
		self.last_error = None;
	}
}
