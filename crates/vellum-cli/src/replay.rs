// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Replays a recorded ACP session (one JSON message per line) through a chat
//! session and reports the resulting transcript.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use vellum_cli_acp::{decode_message, permission_outcome_to_response, InboundMessage};
use vellum_common_dispatch::{
	AuthProvider, NoteError, NoteRef, NoteResolver, OutgoingPrompt, SessionId, SessionStarted,
	StopReason, Transport, TransportError,
};
use vellum_common_transcript::ContentBlock;
use vellum_session::{spawn_inbound_loop, ChatSession, Collaborators, SessionSettings, Snapshot};

const DEFAULT_REPLAY_SESSION: &str = "replay";

/// Transport that only hands out a fixed session id. Prompts are refused.
struct ReplayTransport {
	session_id: SessionId,
}

#[async_trait]
impl Transport for ReplayTransport {
	async fn new_session(&self) -> Result<SessionStarted, TransportError> {
		Ok(SessionStarted {
			session_id: self.session_id.clone(),
			auth_methods: Vec::new(),
			current_mode_id: None,
		})
	}

	async fn prompt(&self, _: &SessionId, _: &OutgoingPrompt) -> Result<StopReason, TransportError> {
		Err(TransportError::new("replay sessions do not accept prompts"))
	}

	async fn cancel(&self, _: &SessionId) -> Result<(), TransportError> {
		Ok(())
	}
}

struct NoNotes;

#[async_trait]
impl NoteResolver for NoNotes {
	fn resolve_mention(&self, _: &str) -> Option<NoteRef> {
		None
	}

	async fn read_content(&self, path: &str) -> Result<String, NoteError> {
		Err(NoteError::NotFound(path.to_string()))
	}
}

struct NoAuth;

#[async_trait]
impl AuthProvider for NoAuth {
	async fn authenticate(&self, _: &str) -> Result<bool, TransportError> {
		Ok(false)
	}
}

#[derive(Debug)]
pub struct ReplayReport {
	pub snapshot: Arc<Snapshot>,
	/// JSON-RPC responses the client would have sent for answered permission
	/// requests.
	pub responses: Vec<Value>,
	pub unanswered_permissions: usize,
	pub skipped_lines: usize,
}

pub async fn replay_file(path: &Path, settings: SessionSettings) -> Result<ReplayReport> {
	let content = tokio::fs::read_to_string(path)
		.await
		.with_context(|| format!("failed to read {}", path.display()))?;

	let mut skipped_lines = 0;
	let mut messages = Vec::new();
	for (index, line) in content.lines().enumerate() {
		if line.trim().is_empty() {
			continue;
		}
		match decode_message(line) {
			Ok(message) => messages.push(message),
			Err(e) => {
				warn!(line = index + 1, error = %e, "skipping undecodable line");
				skipped_lines += 1;
			}
		}
	}

	let session_id = messages
		.iter()
		.map(|message| match message {
			InboundMessage::Update { session_id, .. }
			| InboundMessage::PermissionRequest { session_id, .. } => session_id.clone(),
		})
		.next()
		.unwrap_or_else(|| SessionId::new(DEFAULT_REPLAY_SESSION));
	info!(session_id = %session_id, messages = messages.len(), "replaying session");

	let session = Arc::new(ChatSession::new(
		settings,
		Collaborators {
			transport: Arc::new(ReplayTransport { session_id }),
			notes: Arc::new(NoNotes),
			auth: Arc::new(NoAuth),
		},
	));
	session.create_new_session().await?;

	let (inbound, task) = spawn_inbound_loop(session.clone());
	let mut waiting = Vec::new();
	for message in messages {
		match message {
			InboundMessage::Update {
				session_id,
				event: Some(event),
			} => inbound.push_update(session_id, event).await?,
			InboundMessage::Update { event: None, .. } => {
				debug!("update kind not tracked");
			}
			InboundMessage::PermissionRequest {
				rpc_id,
				session_id,
				request,
			} => {
				let rx = inbound.request_permission(session_id, request).await?;
				waiting.push((rpc_id, rx));
			}
		}
	}
	drop(inbound);
	task.await.context("inbound loop panicked")?;

	let mut responses = Vec::new();
	let mut unanswered_permissions = 0;
	for (rpc_id, mut rx) in waiting {
		match rx.try_recv() {
			Ok(outcome) => responses.push(json!({
				"jsonrpc": "2.0",
				"id": rpc_id,
				"result": permission_outcome_to_response(&outcome),
			})),
			Err(_) => unanswered_permissions += 1,
		}
	}

	Ok(ReplayReport {
		snapshot: session.snapshot(),
		responses,
		unanswered_permissions,
		skipped_lines,
	})
}

pub fn render_json(report: &ReplayReport) -> Result<String> {
	let value = json!({
		"transcript": report.snapshot.transcript,
		"state": report.snapshot.state,
		"permission_responses": report.responses,
		"unanswered_permissions": report.unanswered_permissions,
		"skipped_lines": report.skipped_lines,
	});
	Ok(serde_json::to_string_pretty(&value)?)
}

pub fn render_summary(report: &ReplayReport) -> String {
	let mut out = String::new();
	for message in report.snapshot.transcript.messages() {
		let _ = writeln!(out, "── {:?} ──", message.role);
		for block in &message.content {
			render_block(&mut out, block);
		}
	}

	let state = &report.snapshot.state;
	let _ = writeln!(out, "──");
	let _ = writeln!(out, "status: {}", state.status());
	if let Some(mode) = &state.current_mode_id {
		let _ = writeln!(out, "mode: {mode}");
	}
	if !state.available_commands.is_empty() {
		let names: Vec<_> = state.available_commands.iter().map(|c| c.name.as_str()).collect();
		let _ = writeln!(out, "commands: /{}", names.join(" /"));
	}
	let _ = writeln!(
		out,
		"permissions: {} answered, {} unanswered",
		report.responses.len(),
		report.unanswered_permissions
	);
	if report.skipped_lines > 0 {
		let _ = writeln!(out, "skipped lines: {}", report.skipped_lines);
	}
	out
}

fn render_block(out: &mut String, block: &ContentBlock) {
	match block {
		ContentBlock::Text { text } => {
			let _ = writeln!(out, "{text}");
		}
		ContentBlock::TextWithContext { text, context } => {
			let _ = writeln!(out, "{text}  [@ {}]", context.note_name);
		}
		ContentBlock::Thought { text } => {
			for line in text.lines() {
				let _ = writeln!(out, "  ~ {line}");
			}
		}
		ContentBlock::Image { mime_type, .. } => {
			let _ = writeln!(out, "[image {mime_type}]");
		}
		ContentBlock::ToolCall(call) => {
			let _ = writeln!(out, "[tool {}] {} ({:?})", call.tool_call_id, call.title, call.status);
			if let Some(view) = &call.permission_request {
				let answer = match (&view.selected_option_id, view.is_cancelled) {
					(Some(option), _) => format!("selected {option}"),
					(None, true) => "cancelled".to_string(),
					(None, false) => "waiting".to_string(),
				};
				let _ = writeln!(out, "  permission {}: {answer}", view.request_id);
			}
		}
		ContentBlock::Plan { entries } => {
			for entry in entries {
				let _ = writeln!(out, "  - [{:?}] {}", entry.status, entry.content);
			}
		}
		ContentBlock::Terminal { terminal_id } => {
			let _ = writeln!(out, "[terminal {terminal_id}]");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use vellum_common_dispatch::ContextOptions;
	use vellum_common_transcript::ToolCallStatus;

	fn settings(auto_allow: bool) -> SessionSettings {
		SessionSettings {
			agent_id: "replay".to_string(),
			auto_allow,
			context: ContextOptions::default(),
		}
	}

	fn recording(lines: &[Value]) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().expect("temp file");
		for line in lines {
			writeln!(file, "{line}").expect("write");
		}
		writeln!(file, "not json").expect("write");
		file
	}

	fn update(update: Value) -> Value {
		json!({
			"jsonrpc": "2.0",
			"method": "session/update",
			"params": {"sessionId": "rec-1", "update": update}
		})
	}

	fn sample() -> tempfile::NamedTempFile {
		recording(&[
			update(json!({"sessionUpdate": "agent_message_chunk", "content": {"type": "text", "text": "Editing"}})),
			update(json!({"sessionUpdate": "agent_message_chunk", "content": {"type": "text", "text": " now"}})),
			update(json!({"sessionUpdate": "tool_call", "toolCallId": "c1", "title": "Edit a.md", "status": "pending"})),
			json!({
				"jsonrpc": "2.0",
				"id": 3,
				"method": "session/request_permission",
				"params": {
					"sessionId": "rec-1",
					"toolCall": {"toolCallId": "c1"},
					"options": [
						{"optionId": "yes", "name": "Allow", "kind": "allow_once"},
						{"optionId": "no", "name": "Reject", "kind": "reject_once"}
					]
				}
			}),
			update(json!({"sessionUpdate": "tool_call_update", "toolCallId": "c1", "status": "completed"})),
		])
	}

	#[tokio::test]
	async fn test_replay_with_auto_allow() {
		let file = sample();
		let report = replay_file(file.path(), settings(true)).await.expect("replay");

		assert_eq!(report.skipped_lines, 1);
		assert_eq!(report.unanswered_permissions, 0);
		assert_eq!(
			report.responses,
			vec![json!({
				"jsonrpc": "2.0",
				"id": 3,
				"result": {"outcome": {"outcome": "selected", "optionId": "yes"}}
			})]
		);

		let transcript = &report.snapshot.transcript;
		assert_eq!(transcript.messages()[0].text(), "Editing now");
		let call = transcript.tool_call("c1").expect("tool call");
		assert_eq!(call.status, ToolCallStatus::Completed);
		assert_eq!(
			call.permission_request
				.as_ref()
				.and_then(|v| v.selected_option_id.as_deref()),
			Some("yes")
		);
	}

	#[tokio::test]
	async fn test_replay_without_auto_allow_leaves_request_waiting() {
		let file = sample();
		let report = replay_file(file.path(), settings(false)).await.expect("replay");

		assert!(report.responses.is_empty());
		assert_eq!(report.unanswered_permissions, 1);
		let summary = render_summary(&report);
		assert!(summary.contains("[tool c1] Edit a.md (Completed)"));
		assert!(summary.contains("waiting"));
		assert!(summary.contains("1 unanswered"));
	}

	#[tokio::test]
	async fn test_render_json_contains_transcript() {
		let file = sample();
		let report = replay_file(file.path(), settings(true)).await.expect("replay");
		let rendered: Value = serde_json::from_str(&render_json(&report).expect("render")).expect("json");
		assert_eq!(rendered["state"]["status"], "ready");
		assert_eq!(rendered["transcript"].as_array().map(Vec::len), Some(2));
	}

	#[tokio::test]
	async fn test_missing_file_is_an_error() {
		let result = replay_file(Path::new("/nonexistent/recording.jsonl"), settings(false)).await;
		assert!(result.is_err());
	}
}
