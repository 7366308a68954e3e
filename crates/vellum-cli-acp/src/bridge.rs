// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ACP ↔ Vellum type conversions.
//!
//! Pure conversion functions between:
//! - ACP protocol types (`agent_client_protocol`)
//! - Vellum transcript events (`vellum_common_transcript`)
//! - Vellum dispatch types (`vellum_common_dispatch`)
//!
//! Enums are matched across the boundary by their wire names, so a variant
//! added on either side degrades to the lenient default instead of failing.

use agent_client_protocol as acp;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use vellum_common_dispatch::{OutgoingPrompt, SessionId, StopReason};
use vellum_common_permission::PermissionOutcome;
use vellum_common_transcript::{
	AvailableCommand, PermissionOption, PermissionOptionKind, PermissionRequest, PlanEntry,
	SessionUpdateEvent, ToolCallContentItem, ToolCallPatch, ToolCallStatus, ToolKind,
};

use crate::error::AcpError;
use crate::wire::{
	update_kind, RpcFrame, METHOD_REQUEST_PERMISSION, METHOD_SESSION_UPDATE, TRACKED_UPDATE_KINDS,
};

/// A decoded message from the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
	/// A `session/update` notification. `event` is `None` for update kinds the
	/// client does not track.
	Update {
		session_id: SessionId,
		event: Option<SessionUpdateEvent>,
	},
	/// A `session/request_permission` call awaiting a response.
	PermissionRequest {
		rpc_id: Option<Value>,
		session_id: SessionId,
		request: PermissionRequest,
	},
}

// =============================================================================
// Inbound decoding
// =============================================================================

/// Decode one line of agent output.
///
/// Accepts a full JSON-RPC frame, or the bare params of a `session/update`.
pub fn decode_message(line: &str) -> Result<InboundMessage, AcpError> {
	let value: Value = serde_json::from_str(line)?;
	let frame: RpcFrame = serde_json::from_value(value.clone())?;

	match frame.method.as_deref() {
		Some(METHOD_SESSION_UPDATE) => {
			let params = frame
				.params
				.ok_or_else(|| AcpError::MissingParams(METHOD_SESSION_UPDATE.to_string()))?;
			decode_notification(params)
		}
		Some(METHOD_REQUEST_PERMISSION) => {
			let params = frame
				.params
				.ok_or_else(|| AcpError::MissingParams(METHOD_REQUEST_PERMISSION.to_string()))?;
			let request: acp::RequestPermissionRequest = serde_json::from_value(params)?;
			Ok(InboundMessage::PermissionRequest {
				rpc_id: frame.id,
				session_id: session_id_from_acp(&request.session_id),
				request: PermissionRequest {
					tool_call: tool_update_to_patch(request.tool_call),
					options: request.options.into_iter().map(permission_option).collect(),
				},
			})
		}
		Some(other) => Err(AcpError::UnsupportedMethod(other.to_string())),
		None => decode_notification(value),
	}
}

fn decode_notification(params: Value) -> Result<InboundMessage, AcpError> {
	if let Some(kind) = update_kind(&params).filter(|kind| !TRACKED_UPDATE_KINDS.contains(kind)) {
		debug!(kind, "skipping unsupported session update kind");
		let session_id = params
			.get("sessionId")
			.and_then(Value::as_str)
			.ok_or(AcpError::MissingField("sessionId"))?;
		return Ok(InboundMessage::Update {
			session_id: SessionId::new(session_id),
			event: None,
		});
	}

	let notification: acp::SessionNotification = serde_json::from_value(params)?;
	Ok(InboundMessage::Update {
		session_id: session_id_from_acp(&notification.session_id),
		event: update_to_event(notification.update),
	})
}

/// Convert an ACP session update into a transcript event.
pub fn update_to_event(update: acp::SessionUpdate) -> Option<SessionUpdateEvent> {
	match update {
		acp::SessionUpdate::UserMessageChunk(chunk) => Some(SessionUpdateEvent::UserMessageChunk {
			text: content_to_text(chunk.content),
		}),
		acp::SessionUpdate::AgentMessageChunk(chunk) => Some(SessionUpdateEvent::AgentTextChunk {
			text: content_to_text(chunk.content),
		}),
		acp::SessionUpdate::AgentThoughtChunk(chunk) => Some(SessionUpdateEvent::AgentThoughtChunk {
			text: content_to_text(chunk.content),
		}),
		acp::SessionUpdate::ToolCall(call) => Some(SessionUpdateEvent::ToolCallStarted(tool_call_to_patch(call))),
		acp::SessionUpdate::ToolCallUpdate(update) => {
			Some(SessionUpdateEvent::ToolCallUpdated(tool_update_to_patch(update)))
		}
		acp::SessionUpdate::Plan(plan) => {
			let entries = serde_json::to_value(&plan.entries)
				.and_then(serde_json::from_value::<Vec<PlanEntry>>)
				.map_err(|e| warn!(error = %e, "dropping malformed plan"))
				.ok()?;
			Some(SessionUpdateEvent::PlanUpdated { entries })
		}
		acp::SessionUpdate::AvailableCommandsUpdate(update) => Some(SessionUpdateEvent::AvailableCommandsUpdated {
			commands: update
				.available_commands
				.into_iter()
				.map(|command| AvailableCommand {
					input_hint: command.input.and_then(command_input_hint),
					name: command.name,
					description: command.description,
				})
				.collect(),
		}),
		acp::SessionUpdate::CurrentModeUpdate(update) => Some(SessionUpdateEvent::CurrentModeUpdated {
			mode_id: update.current_mode_id.to_string(),
		}),
		#[allow(unreachable_patterns)]
		other => {
			debug!(?other, "skipping unsupported session update kind");
			None
		}
	}
}

fn command_input_hint(input: acp::AvailableCommandInput) -> Option<String> {
	match input {
		acp::AvailableCommandInput::Unstructured(input) => Some(input.hint),
		#[allow(unreachable_patterns)]
		_ => None,
	}
}

/// Text for a message chunk. Non-text content is shown as a short
/// placeholder.
fn content_to_text(content: acp::ContentBlock) -> String {
	match content {
		acp::ContentBlock::Text(text) => text.text,
		acp::ContentBlock::Image(image) => format!("[image: {}]", image.mime_type),
		acp::ContentBlock::Audio(audio) => format!("[audio: {}]", audio.mime_type),
		acp::ContentBlock::ResourceLink(link) => format!("[{}]({})", link.name, link.uri),
		acp::ContentBlock::Resource(resource) => {
			let uri = match resource.resource {
				acp::EmbeddedResourceResource::TextResourceContents(text) => text.uri,
				acp::EmbeddedResourceResource::BlobResourceContents(blob) => blob.uri,
				#[allow(unreachable_patterns)]
				_ => "resource".to_string(),
			};
			format!("[resource: {uri}]")
		}
		#[allow(unreachable_patterns)]
		_ => "[unsupported content]".to_string(),
	}
}

/// The serde name of a protocol enum value, e.g. `"in_progress"`.
fn wire_name<T: Serialize>(value: &T) -> Option<String> {
	serde_json::to_value(value)
		.ok()?
		.as_str()
		.map(str::to_string)
}

fn tool_status(status: acp::ToolCallStatus) -> Option<ToolCallStatus> {
	let name = wire_name(&status)?;
	name.parse::<ToolCallStatus>()
		.map_err(|e| debug!(error = %e, "ignoring unknown tool call status"))
		.ok()
}

fn tool_kind(kind: acp::ToolKind) -> Option<ToolKind> {
	wire_name(&kind).map(|name| ToolKind::parse_lenient(&name))
}

fn tool_content(content: Vec<acp::ToolCallContent>) -> Vec<ToolCallContentItem> {
	content.into_iter().filter_map(tool_content_item).collect()
}

/// A full `tool_call` announcement. Every field is set on the patch.
fn tool_call_to_patch(call: acp::ToolCall) -> ToolCallPatch {
	ToolCallPatch {
		tool_call_id: call.tool_call_id.to_string(),
		title: Some(call.title),
		status: tool_status(call.status),
		kind: tool_kind(call.kind),
		content: tool_content(call.content),
		permission_request: None,
	}
}

/// A partial update. Fields the agent left out stay `None` on the patch.
fn tool_update_to_patch(update: acp::ToolCallUpdate) -> ToolCallPatch {
	let fields = update.fields;
	ToolCallPatch {
		tool_call_id: update.tool_call_id.to_string(),
		title: fields.title,
		status: fields.status.and_then(tool_status),
		kind: fields.kind.and_then(tool_kind),
		content: tool_content(fields.content.unwrap_or_default()),
		permission_request: None,
	}
}

fn tool_content_item(content: acp::ToolCallContent) -> Option<ToolCallContentItem> {
	match content {
		acp::ToolCallContent::Content(content) => serde_json::to_value(&content.content)
			.map(|value| ToolCallContentItem::Content { value })
			.map_err(|e| debug!(error = %e, "skipping unencodable tool call content"))
			.ok(),
		acp::ToolCallContent::Diff(diff) => Some(ToolCallContentItem::Diff {
			path: diff.path.display().to_string(),
			old_text: diff.old_text,
			new_text: diff.new_text,
		}),
		acp::ToolCallContent::Terminal(terminal) => Some(ToolCallContentItem::Terminal {
			terminal_id: terminal.terminal_id.to_string(),
		}),
		#[allow(unreachable_patterns)]
		_ => {
			debug!("skipping unsupported tool call content");
			None
		}
	}
}

fn permission_option(option: acp::PermissionOption) -> PermissionOption {
	let kind = wire_name(&option.kind).and_then(|name| {
		name.parse::<PermissionOptionKind>()
			.map_err(|e| debug!(error = %e, "ignoring unknown permission option kind"))
			.ok()
	});
	PermissionOption::new(option.option_id.to_string(), option.name, kind)
}

// =============================================================================
// Outbound encoding
// =============================================================================

/// Result body for a `session/request_permission` response.
pub fn permission_outcome_to_response(outcome: &PermissionOutcome) -> acp::RequestPermissionResponse {
	let outcome = match outcome {
		PermissionOutcome::Selected { option_id } => acp::RequestPermissionOutcome::Selected(
			acp::SelectedPermissionOutcome::new(acp::PermissionOptionId::new(option_id.clone())),
		),
		PermissionOutcome::Cancelled => acp::RequestPermissionOutcome::Cancelled,
	};
	acp::RequestPermissionResponse::new(outcome)
}

/// Convert an outgoing prompt into ACP content blocks: the wire text first,
/// then one block per image.
pub fn prompt_to_content_blocks(prompt: &OutgoingPrompt) -> Vec<acp::ContentBlock> {
	let mut blocks = vec![acp::ContentBlock::Text(acp::TextContent::new(prompt.text.clone()))];

	for image in &prompt.images {
		let value = json!({
			"type": "image",
			"data": image.data,
			"mimeType": image.mime_type,
		});
		match serde_json::from_value::<acp::ContentBlock>(value) {
			Ok(block) => blocks.push(block),
			Err(e) => warn!(mime_type = %image.mime_type, error = %e, "dropping image attachment"),
		}
	}

	blocks
}

// =============================================================================
// SessionId / StopReason
// =============================================================================

pub fn session_id_to_acp(session_id: &SessionId) -> acp::SessionId {
	acp::SessionId::new(session_id.to_string())
}

pub fn session_id_from_acp(session_id: &acp::SessionId) -> SessionId {
	SessionId::new(session_id.to_string())
}

/// Map an ACP stop reason onto the client's own enum by its wire name.
/// Unrecognised reasons are treated as the end of the turn.
pub fn stop_reason_from_acp(reason: acp::StopReason) -> StopReason {
	let name = wire_name(&reason).unwrap_or_default();

	match name.as_str() {
		"max_tokens" => StopReason::MaxTokens,
		"max_turn_requests" => StopReason::MaxTurnRequests,
		"refusal" => StopReason::Refusal,
		"cancelled" => StopReason::Cancelled,
		"end_turn" => StopReason::EndTurn,
		other => {
			debug!(reason = %other, "unrecognised stop reason, treating as end_turn");
			StopReason::EndTurn
		}
	}
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use vellum_common_dispatch::ImageAttachment;

	fn update_line(update: Value) -> String {
		json!({
			"jsonrpc": "2.0",
			"method": "session/update",
			"params": {"sessionId": "sess-1", "update": update}
		})
		.to_string()
	}

	#[test]
	fn test_decode_text_chunk_frame() {
		let msg = decode_message(&update_line(json!({
			"sessionUpdate": "agent_message_chunk",
			"content": {"type": "text", "text": "Hel"}
		})))
		.expect("decode");

		assert_eq!(
			msg,
			InboundMessage::Update {
				session_id: SessionId::new("sess-1"),
				event: Some(SessionUpdateEvent::AgentTextChunk {
					text: "Hel".to_string()
				}),
			}
		);
	}

	#[test]
	fn test_decode_bare_params() {
		let line = json!({
			"sessionId": "sess-1",
			"update": {"sessionUpdate": "current_mode_update", "currentModeId": "plan"}
		})
		.to_string();

		let msg = decode_message(&line).expect("decode");
		assert!(matches!(
			msg,
			InboundMessage::Update { event: Some(SessionUpdateEvent::CurrentModeUpdated { ref mode_id }), .. } if mode_id == "plan"
		));
	}

	#[test]
	fn test_unknown_kind_decodes_to_none() {
		let msg = decode_message(&update_line(json!({"sessionUpdate": "usage_update"})))
			.expect("decode");
		assert!(matches!(msg, InboundMessage::Update { event: None, .. }));
	}

	#[test]
	fn test_non_text_chunk_becomes_placeholder() {
		let msg = decode_message(&update_line(json!({
			"sessionUpdate": "agent_message_chunk",
			"content": {"type": "resource_link", "uri": "file:///a.md", "name": "a.md"}
		})))
		.expect("decode");
		assert!(matches!(
			msg,
			InboundMessage::Update { event: Some(SessionUpdateEvent::AgentTextChunk { ref text }), .. }
				if text == "[a.md](file:///a.md)"
		));
	}

	#[test]
	fn test_tool_call_update_maps_fields() {
		let msg = decode_message(&update_line(json!({
			"sessionUpdate": "tool_call_update",
			"toolCallId": "call_1",
			"status": "completed",
			"kind": "execute",
			"content": [{"type": "terminal", "terminalId": "term-7"}]
		})))
		.expect("decode");

		let InboundMessage::Update {
			event: Some(SessionUpdateEvent::ToolCallUpdated(patch)),
			..
		} = msg
		else {
			panic!("expected tool call update");
		};
		assert_eq!(patch.tool_call_id, "call_1");
		assert_eq!(patch.status, Some(ToolCallStatus::Completed));
		assert_eq!(patch.kind, Some(ToolKind::Execute));
		assert!(patch.title.is_none());
		assert_eq!(
			patch.content,
			vec![ToolCallContentItem::Terminal {
				terminal_id: "term-7".to_string()
			}]
		);
	}

	#[test]
	fn test_decode_permission_request() {
		let line = json!({
			"jsonrpc": "2.0",
			"id": 7,
			"method": "session/request_permission",
			"params": {
				"sessionId": "sess-1",
				"toolCall": {"toolCallId": "call_2", "title": "Write file"},
				"options": [
					{"optionId": "allow", "name": "Allow", "kind": "allow_once"},
					{"optionId": "never", "name": "Never", "kind": "reject_always"}
				]
			}
		})
		.to_string();

		let InboundMessage::PermissionRequest {
			rpc_id,
			session_id,
			request,
		} = decode_message(&line).expect("decode")
		else {
			panic!("expected permission request");
		};
		assert_eq!(rpc_id, Some(json!(7)));
		assert_eq!(session_id.as_str(), "sess-1");
		assert_eq!(request.tool_call.tool_call_id, "call_2");
		assert_eq!(request.tool_call.title.as_deref(), Some("Write file"));
		assert_eq!(request.tool_call.status, None);
		assert_eq!(request.options.len(), 2);
		assert_eq!(request.options[0].option_id, "allow");
		assert_eq!(request.options[1].kind, Some(PermissionOptionKind::RejectAlways));
	}

	#[test]
	fn test_tool_call_announcement_sets_every_field() {
		let msg = decode_message(&update_line(json!({
			"sessionUpdate": "tool_call",
			"toolCallId": "call_1",
			"title": "Edit notes/a.md",
			"kind": "edit",
			"status": "in_progress",
			"content": [
				{"type": "diff", "path": "notes/a.md", "oldText": "a", "newText": "b"},
				{"type": "content", "content": {"type": "text", "text": "ok"}}
			],
			"rawInput": {"path": "notes/a.md"}
		})))
		.expect("decode");

		let InboundMessage::Update {
			event: Some(SessionUpdateEvent::ToolCallStarted(patch)),
			..
		} = msg
		else {
			panic!("expected tool call");
		};
		assert_eq!(patch.title.as_deref(), Some("Edit notes/a.md"));
		assert_eq!(patch.kind, Some(ToolKind::Edit));
		assert_eq!(patch.status, Some(ToolCallStatus::InProgress));
		assert_eq!(
			patch.content[0],
			ToolCallContentItem::Diff {
				path: "notes/a.md".to_string(),
				old_text: Some("a".to_string()),
				new_text: "b".to_string(),
			}
		);
		match &patch.content[1] {
			ToolCallContentItem::Content { value } => assert_eq!(value["text"], "ok"),
			other => panic!("expected content item, got {other:?}"),
		}
	}

	#[test]
	fn test_plan_and_commands_decode() {
		let plan = decode_message(&update_line(json!({
			"sessionUpdate": "plan",
			"entries": [{"content": "Read notes", "priority": "high", "status": "in_progress"}]
		})))
		.expect("decode");
		let InboundMessage::Update {
			event: Some(SessionUpdateEvent::PlanUpdated { entries }),
			..
		} = plan
		else {
			panic!("expected plan");
		};
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].content, "Read notes");

		let commands = decode_message(&update_line(json!({
			"sessionUpdate": "available_commands_update",
			"availableCommands": [
				{"name": "web", "description": "Search the web", "input": {"hint": "query"}},
				{"name": "clear", "description": "Clear history"}
			]
		})))
		.expect("decode");
		let InboundMessage::Update {
			event: Some(SessionUpdateEvent::AvailableCommandsUpdated { commands }),
			..
		} = commands
		else {
			panic!("expected commands");
		};
		assert_eq!(commands[0].input_hint.as_deref(), Some("query"));
		assert_eq!(commands[1].input_hint, None);
	}

	#[test]
	fn test_malformed_tracked_update_is_error() {
		let result = decode_message(&update_line(json!({
			"sessionUpdate": "tool_call_update",
			"status": "completed"
		})));
		assert!(matches!(result, Err(AcpError::Json(_))));
	}

	#[test]
	fn test_untracked_update_without_session_is_error() {
		let line = json!({"update": {"sessionUpdate": "usage_update"}}).to_string();
		assert!(matches!(decode_message(&line), Err(AcpError::MissingField("sessionId"))));
	}

	#[test]
	fn test_unsupported_method_is_error() {
		let line = json!({"jsonrpc": "2.0", "id": 1, "method": "fs/read_text_file", "params": {}})
			.to_string();
		assert!(matches!(
			decode_message(&line),
			Err(AcpError::UnsupportedMethod(m)) if m == "fs/read_text_file"
		));
	}

	#[test]
	fn test_permission_response_wire_shape() {
		let selected = permission_outcome_to_response(&PermissionOutcome::Selected {
			option_id: "allow".to_string(),
		});
		assert_eq!(
			serde_json::to_value(&selected).expect("encode"),
			json!({"outcome": {"outcome": "selected", "optionId": "allow"}})
		);
		let cancelled = permission_outcome_to_response(&PermissionOutcome::Cancelled);
		assert_eq!(
			serde_json::to_value(&cancelled).expect("encode"),
			json!({"outcome": {"outcome": "cancelled"}})
		);
	}

	#[test]
	fn test_prompt_to_content_blocks_text_first() {
		let prompt = OutgoingPrompt {
			text: "hello".to_string(),
			images: vec![ImageAttachment {
				mime_type: "image/png".to_string(),
				data: "aGk=".to_string(),
			}],
		};
		let blocks = prompt_to_content_blocks(&prompt);
		assert_eq!(blocks.len(), 2);
		match &blocks[0] {
			acp::ContentBlock::Text(t) => assert_eq!(t.text, "hello"),
			_ => panic!("expected text block first"),
		}
	}

	#[test]
	fn test_stop_reason_mapping() {
		assert_eq!(stop_reason_from_acp(acp::StopReason::EndTurn), StopReason::EndTurn);
		assert_eq!(
			stop_reason_from_acp(acp::StopReason::Cancelled),
			StopReason::Cancelled
		);
	}

	#[test]
	fn test_session_id_roundtrip() {
		let id = SessionId::new("sess-42");
		assert_eq!(session_id_from_acp(&session_id_to_acp(&id)), id);
	}

	proptest! {
			/// **Property: Arbitrary text chunks survive decoding unchanged**
			#[test]
			fn test_text_chunk_preserved(text in "\\PC{0,64}") {
					let msg = decode_message(&update_line(json!({
							"sessionUpdate": "agent_thought_chunk",
							"content": {"type": "text", "text": text}
					}))).expect("decode");
					prop_assert_eq!(
							msg,
							InboundMessage::Update {
									session_id: SessionId::new("sess-1"),
									event: Some(SessionUpdateEvent::AgentThoughtChunk { text: text.clone() }),
							}
					);
			}
	}
}
