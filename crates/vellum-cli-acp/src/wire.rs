// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! JSON-RPC envelope around the ACP messages the client receives. The
//! payloads themselves are `agent_client_protocol` types.

use serde::Deserialize;
use serde_json::Value;

pub const METHOD_SESSION_UPDATE: &str = "session/update";
pub const METHOD_REQUEST_PERMISSION: &str = "session/request_permission";

/// `sessionUpdate` tags the transcript folds. Anything else is skipped
/// before the payload is decoded.
pub const TRACKED_UPDATE_KINDS: &[&str] = &[
	"user_message_chunk",
	"agent_message_chunk",
	"agent_thought_chunk",
	"tool_call",
	"tool_call_update",
	"plan",
	"available_commands_update",
	"current_mode_update",
];

/// A JSON-RPC frame as read from the agent's stdout.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcFrame {
	#[serde(default)]
	pub id: Option<Value>,
	#[serde(default)]
	pub method: Option<String>,
	#[serde(default)]
	pub params: Option<Value>,
}

/// The `sessionUpdate` tag of a notification's params, if present.
pub fn update_kind(params: &Value) -> Option<&str> {
	params
		.get("update")
		.and_then(|update| update.get("sessionUpdate"))
		.and_then(Value::as_str)
}
