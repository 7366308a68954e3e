// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Session lifecycle state machine.
//!
//! ```text
//! disconnected --create--> initializing --init ok--> ready --send--> busy
//!                               |                      ^               |
//!                           init failed                +--completed----+
//!                               v                      +--cancel-------+
//!                             error --create--> initializing
//! any --disconnect--> disconnected
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SessionError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
	#[default]
	Disconnected,
	Initializing,
	Ready,
	Busy,
	Error,
}

impl SessionStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			SessionStatus::Disconnected => "disconnected",
			SessionStatus::Initializing => "initializing",
			SessionStatus::Ready => "ready",
			SessionStatus::Busy => "busy",
			SessionStatus::Error => "error",
		}
	}
}

impl fmt::Display for SessionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
	Create,
	InitSucceeded,
	InitFailed,
	Send,
	Completed,
	Cancel,
	Disconnect,
}

impl LifecycleEvent {
	pub fn as_str(&self) -> &'static str {
		match self {
			LifecycleEvent::Create => "create",
			LifecycleEvent::InitSucceeded => "init_succeeded",
			LifecycleEvent::InitFailed => "init_failed",
			LifecycleEvent::Send => "send",
			LifecycleEvent::Completed => "completed",
			LifecycleEvent::Cancel => "cancel",
			LifecycleEvent::Disconnect => "disconnect",
		}
	}
}

impl fmt::Display for LifecycleEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What switching to another agent requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentSwitch {
	/// Nothing has been said yet; the session can be reinitialized in place.
	ReinitializeInPlace,
	/// The transcript has content; cancel the current work and start over.
	RestartRequired,
}

/// Computes the next status for `event`.
///
/// `Cancel` is accepted in every state and only changes `busy`. A late
/// `Completed` after a cancel has already returned the session to `ready` is
/// accepted as a no-op.
pub fn next_status(from: SessionStatus, event: LifecycleEvent) -> Result<SessionStatus, SessionError> {
	use LifecycleEvent as E;
	use SessionStatus as S;

	let to = match (from, event) {
		(_, E::Disconnect) => S::Disconnected,
		(S::Busy, E::Cancel) => S::Ready,
		(status, E::Cancel) => status,
		(S::Disconnected | S::Error | S::Ready, E::Create) => S::Initializing,
		(S::Initializing, E::InitSucceeded) => S::Ready,
		(S::Initializing, E::InitFailed) => S::Error,
		(S::Ready, E::Send) => S::Busy,
		(S::Busy | S::Ready, E::Completed) => S::Ready,
		(from, event) => return Err(SessionError::InvalidTransition { from, event }),
	};
	Ok(to)
}

/// Tracks the status of one chat session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinator {
	status: SessionStatus,
}

impl Coordinator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn status(&self) -> SessionStatus {
		self.status
	}

	/// Applies a lifecycle event, leaving the status unchanged on error.
	pub fn apply(&mut self, event: LifecycleEvent) -> Result<SessionStatus, SessionError> {
		let from = self.status;
		let to = next_status(from, event)?;
		if from != to {
			info!(from = from.as_str(), to = to.as_str(), event = event.as_str(), "state transition");
		} else {
			debug!(status = from.as_str(), event = event.as_str(), "lifecycle event without transition");
		}
		self.status = to;
		Ok(to)
	}

	/// Whether a new message may be sent. A second send while `busy` is
	/// rejected, never queued.
	pub fn can_send(&self) -> bool {
		self.status == SessionStatus::Ready
	}

	pub fn plan_agent_switch(&self, transcript_is_empty: bool) -> AgentSwitch {
		if transcript_is_empty && self.status != SessionStatus::Busy {
			AgentSwitch::ReinitializeInPlace
		} else {
			AgentSwitch::RestartRequired
		}
	}
}
