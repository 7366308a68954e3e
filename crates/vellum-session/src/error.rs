// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;
use vellum_common_dispatch::AgentError;

use crate::lifecycle::{LifecycleEvent, SessionStatus};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
	#[error("cannot {event} while {from}")]
	InvalidTransition {
		from: SessionStatus,
		event: LifecycleEvent,
	},

	#[error("inbound event loop has stopped")]
	LoopClosed,
}

impl From<SessionError> for AgentError {
	fn from(err: SessionError) -> Self {
		match err {
			SessionError::InvalidTransition {
				from: SessionStatus::Busy | SessionStatus::Initializing,
				..
			} => AgentError::session_busy(),
			SessionError::InvalidTransition { .. } | SessionError::LoopClosed => {
				AgentError::session_not_ready()
			}
		}
	}
}
