// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::collaborators::{AuthMethod, AuthProvider, SessionId, StopReason, Transport};
use crate::error::{AgentError, TransportError, INTERNAL_ERROR_CODE, RATE_LIMIT_CODE};
use crate::prepare::PreparedMessage;

const EMPTY_RESPONSE_MARKER: &str = "empty response text";
const USER_ABORTED_MARKER: &str = "user aborted";

/// Agent-side failures that mean "nothing to show" rather than an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenignFailure {
	EmptyResponse,
	UserAborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
	Completed { stop_reason: StopReason },
	Suppressed { reason: BenignFailure },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
	Benign(BenignFailure),
	RateLimited,
	Other,
}

pub fn classify_failure(err: &TransportError) -> FailureClass {
	let details = err.details().unwrap_or_default().to_lowercase();

	if err.code == Some(INTERNAL_ERROR_CODE) && details.contains(EMPTY_RESPONSE_MARKER) {
		return FailureClass::Benign(BenignFailure::EmptyResponse);
	}
	if details.contains(USER_ABORTED_MARKER)
		|| err.message.to_lowercase().contains(USER_ABORTED_MARKER)
	{
		return FailureClass::Benign(BenignFailure::UserAborted);
	}
	if err.code == Some(RATE_LIMIT_CODE) {
		return FailureClass::RateLimited;
	}
	FailureClass::Other
}

/// Sends prepared messages and applies the failure policy.
pub struct SendPipeline {
	transport: Arc<dyn Transport>,
	auth: Arc<dyn AuthProvider>,
}

impl SendPipeline {
	pub fn new(transport: Arc<dyn Transport>, auth: Arc<dyn AuthProvider>) -> Self {
		Self { transport, auth }
	}

	/// Sends one turn.
	///
	/// On failure, in order: benign failures are swallowed, rate limits are
	/// returned as-is, and authentication is attempted only when the agent
	/// offers exactly one method. After a successful sign-in the message is
	/// resent once; that retry's failure is reported as a communication error
	/// with no further handling.
	#[instrument(skip(self, message, auth_methods), fields(session_id = %session_id))]
	pub async fn send(
		&self,
		session_id: &SessionId,
		message: &PreparedMessage,
		auth_methods: &[AuthMethod],
	) -> Result<SendOutcome, AgentError> {
		let prompt = message.prompt();

		let err = match self.transport.prompt(session_id, &prompt).await {
			Ok(stop_reason) => return Ok(SendOutcome::Completed { stop_reason }),
			Err(err) => err,
		};

		match classify_failure(&err) {
			FailureClass::Benign(reason) => {
				debug!(?reason, error = %err, "suppressing benign agent failure");
				return Ok(SendOutcome::Suppressed { reason });
			}
			FailureClass::RateLimited => {
				warn!(error = %err, "agent reported rate limit");
				return Err(AgentError::rate_limited(&err));
			}
			FailureClass::Other => {}
		}

		let method = match auth_methods {
			[] => {
				warn!(error = %err, "send failed and agent offers no authentication methods");
				return Err(AgentError::authentication_unavailable());
			}
			[method] => method,
			methods => {
				info!(methods = methods.len(), "send failed, user must choose an auth method");
				return Err(AgentError::authentication_choice_required(methods.len()));
			}
		};

		info!(method_id = %method.id, error = %err, "send failed, authenticating and retrying once");
		match self.auth.authenticate(&method.id).await {
			Ok(true) => {}
			Ok(false) => {
				return Err(AgentError::authentication_failed(format!(
					"Sign-in with {} did not complete.",
					method.name
				)))
			}
			Err(auth_err) => return Err(AgentError::authentication_failed(auth_err.message)),
		}

		match self.transport.prompt(session_id, &prompt).await {
			Ok(stop_reason) => Ok(SendOutcome::Completed { stop_reason }),
			Err(retry_err) => {
				warn!(error = %retry_err, "retry after authentication failed");
				Err(AgentError::communication(&retry_err))
			}
		}
	}
}
