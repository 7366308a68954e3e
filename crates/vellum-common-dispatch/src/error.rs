// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// JSON-RPC internal error code.
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// Code agents use to report provider rate limiting.
pub const RATE_LIMIT_CODE: i64 = 429;

/// Failure reported by the transport to the agent process.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct TransportError {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub code: Option<i64>,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

impl TransportError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			code: None,
			message: message.into(),
			data: None,
		}
	}

	pub fn with_code(mut self, code: i64) -> Self {
		self.code = Some(code);
		self
	}

	pub fn with_data(mut self, data: Value) -> Self {
		self.data = Some(data);
		self
	}

	/// The `details` string agents attach to internal errors, if any.
	pub fn details(&self) -> Option<&str> {
		match &self.data {
			Some(Value::String(s)) => Some(s),
			Some(Value::Object(map)) => map.get("details").and_then(Value::as_str),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
	Configuration,
	Connection,
	Authentication,
	RateLimit,
	Communication,
}

impl ErrorCategory {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorCategory::Configuration => "configuration",
			ErrorCategory::Connection => "connection",
			ErrorCategory::Authentication => "authentication",
			ErrorCategory::RateLimit => "rate_limit",
			ErrorCategory::Communication => "communication",
		}
	}
}

/// User-facing error surfaced by a session operation.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{title}: {message}")]
pub struct AgentError {
	pub category: ErrorCategory,
	pub title: String,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub suggestion: Option<String>,
	#[serde(default)]
	pub requires_auth: bool,
}

impl AgentError {
	fn build(category: ErrorCategory, title: &str, message: impl Into<String>) -> Self {
		Self {
			category,
			title: title.to_string(),
			message: message.into(),
			suggestion: None,
			requires_auth: false,
		}
	}

	pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
		self.suggestion = Some(suggestion.into());
		self
	}

	pub fn configuration(message: impl Into<String>) -> Self {
		Self::build(ErrorCategory::Configuration, "Agent not configured", message)
			.with_suggestion("Check the agent command and arguments in your settings.")
	}

	pub fn connection(err: &TransportError) -> Self {
		Self::build(
			ErrorCategory::Connection,
			"Could not start agent session",
			err.message.clone(),
		)
		.with_suggestion("Make sure the agent is installed and can be launched from a terminal.")
	}

	/// No sign-in method to offer, so `requires_auth` stays unset.
	pub fn authentication_unavailable() -> Self {
		Self::build(
			ErrorCategory::Authentication,
			"Authentication required",
			"The agent requires authentication but offered no way to sign in.",
		)
		.with_suggestion("Sign in using the agent's own command line tool, then try again.")
	}

	pub fn authentication_choice_required(methods: usize) -> Self {
		let mut err = Self::build(
			ErrorCategory::Authentication,
			"Authentication required",
			format!("The agent offers {methods} sign-in methods and one must be chosen."),
		)
		.with_suggestion("Sign in using the agent's own command line tool, then try again.");
		err.requires_auth = true;
		err
	}

	pub fn authentication_failed(message: impl Into<String>) -> Self {
		let mut err = Self::build(ErrorCategory::Authentication, "Authentication failed", message)
			.with_suggestion("Check your credentials and try again.");
		err.requires_auth = true;
		err
	}

	pub fn rate_limited(err: &TransportError) -> Self {
		Self::build(ErrorCategory::RateLimit, "Rate limit reached", err.message.clone())
			.with_suggestion("Wait a moment before sending another message.")
	}

	pub fn communication(err: &TransportError) -> Self {
		Self::build(
			ErrorCategory::Communication,
			"Error talking to the agent",
			err.message.clone(),
		)
	}

	pub fn session_busy() -> Self {
		Self::build(
			ErrorCategory::Communication,
			"Agent is busy",
			"Wait for the current response to finish or cancel it.",
		)
	}

	pub fn session_not_ready() -> Self {
		Self::build(
			ErrorCategory::Connection,
			"No active session",
			"Start a new session before sending messages.",
		)
	}
}

#[derive(Debug, Error)]
pub enum NoteError {
	#[error("note not found: {0}")]
	NotFound(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_details_from_object() {
		let err = TransportError::new("Internal error")
			.with_code(INTERNAL_ERROR_CODE)
			.with_data(json!({"details": "model returned empty response text"}));
		assert_eq!(err.details(), Some("model returned empty response text"));
	}

	#[test]
	fn test_details_from_string() {
		let err = TransportError::new("x").with_data(json!("user aborted"));
		assert_eq!(err.details(), Some("user aborted"));
		assert_eq!(TransportError::new("x").details(), None);
	}

	#[test]
	fn test_auth_errors_require_auth() {
		assert!(AgentError::authentication_choice_required(2).requires_auth);
		assert!(AgentError::authentication_failed("bad").requires_auth);
		assert!(!AgentError::communication(&TransportError::new("x")).requires_auth);
	}

	#[test]
	fn test_no_sign_in_method_leaves_requires_auth_unset() {
		let err = AgentError::authentication_unavailable();
		assert_eq!(err.category, ErrorCategory::Authentication);
		assert!(!err.requires_auth);
	}

	#[test]
	fn test_category_serializes_snake_case() {
		let json = serde_json::to_value(ErrorCategory::RateLimit).expect("serialize");
		assert_eq!(json, "rate_limit");
		assert_eq!(ErrorCategory::RateLimit.as_str(), "rate_limit");
	}
}
