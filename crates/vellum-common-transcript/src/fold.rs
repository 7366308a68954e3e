// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Folding of streaming session updates into a [`Transcript`].
//!
//! Placement rules:
//! - Text and thought chunks extend the last block of the last message when
//!   roles and block kinds line up, otherwise they start a new block or a new
//!   message.
//! - Tool calls are upserted by id. A call not seen before opens a new
//!   assistant message, whether it arrives as a start or an update.
//! - A plan update replaces the last plan block of the last assistant message.

use tracing::{debug, trace};

use crate::event::{AvailableCommand, SessionUpdateEvent, ToolCallPatch};
use crate::model::{ContentBlock, Message, PlanEntry, Role};
use crate::transcript::Transcript;

/// State that lives next to the transcript rather than inside it.
#[derive(Clone, Debug, PartialEq)]
pub enum SideChannelUpdate {
	AvailableCommands(Vec<AvailableCommand>),
	CurrentMode(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FoldOutcome {
	TranscriptChanged,
	SideChannel(SideChannelUpdate),
}

pub fn apply_update(transcript: &mut Transcript, event: SessionUpdateEvent) -> FoldOutcome {
	trace!(kind = event.kind_name(), "folding session update");

	match event {
		SessionUpdateEvent::UserMessageChunk { text } => {
			push_text(transcript, Role::User, text, TextKind::Narrative);
		}
		SessionUpdateEvent::AgentTextChunk { text } => {
			push_text(transcript, Role::Assistant, text, TextKind::Narrative);
		}
		SessionUpdateEvent::AgentThoughtChunk { text } => {
			push_text(transcript, Role::Assistant, text, TextKind::Thought);
		}
		SessionUpdateEvent::ToolCallStarted(patch) | SessionUpdateEvent::ToolCallUpdated(patch) => {
			upsert_tool_call(transcript, patch);
		}
		SessionUpdateEvent::PlanUpdated { entries } => {
			replace_plan(transcript, entries);
		}
		SessionUpdateEvent::AvailableCommandsUpdated { commands } => {
			return FoldOutcome::SideChannel(SideChannelUpdate::AvailableCommands(commands));
		}
		SessionUpdateEvent::CurrentModeUpdated { mode_id } => {
			return FoldOutcome::SideChannel(SideChannelUpdate::CurrentMode(mode_id));
		}
	}

	FoldOutcome::TranscriptChanged
}

impl Transcript {
	pub fn apply(&mut self, event: SessionUpdateEvent) -> FoldOutcome {
		apply_update(self, event)
	}
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TextKind {
	Narrative,
	Thought,
}

fn last_role(transcript: &Transcript) -> Option<Role> {
	transcript.last_message().map(|message| message.role)
}

fn push_text(transcript: &mut Transcript, role: Role, text: String, kind: TextKind) {
	if last_role(transcript) != Some(role) {
		transcript.append_message(Message::new(role, vec![new_text_block(kind, text)]));
		return;
	}

	let extended = match (transcript.last_block_mut(), kind) {
		(Some(ContentBlock::Text { text: existing }), TextKind::Narrative) => {
			existing.push_str(&text);
			true
		}
		(Some(ContentBlock::Thought { text: existing }), TextKind::Thought) => {
			if !existing.is_empty() {
				existing.push('\n');
			}
			existing.push_str(&text);
			true
		}
		_ => false,
	};

	if !extended {
		transcript.push_block_to_last(new_text_block(kind, text));
	}
}

fn new_text_block(kind: TextKind, text: String) -> ContentBlock {
	match kind {
		TextKind::Narrative => ContentBlock::Text { text },
		TextKind::Thought => ContentBlock::Thought { text },
	}
}

fn upsert_tool_call(transcript: &mut Transcript, patch: ToolCallPatch) {
	if let Some(call) = transcript.tool_call_mut(&patch.tool_call_id) {
		debug!(tool_call_id = %patch.tool_call_id, "merging tool call update");
		patch.merge_into(call);
		return;
	}

	debug!(tool_call_id = %patch.tool_call_id, "creating tool call");
	transcript.append_message(Message::assistant(vec![ContentBlock::ToolCall(
		patch.into_tool_call(),
	)]));
}

fn replace_plan(transcript: &mut Transcript, entries: Vec<PlanEntry>) {
	let plan = ContentBlock::Plan { entries };

	if last_role(transcript) != Some(Role::Assistant) {
		transcript.append_message(Message::assistant(vec![plan]));
		return;
	}

	let message = transcript.len() - 1;
	let existing = transcript.messages()[message]
		.content
		.iter()
		.rposition(|block| matches!(block, ContentBlock::Plan { .. }));

	match existing {
		Some(block) => {
			// Indices come from the transcript itself, so this cannot fail.
			let _ = transcript.replace_content_at(message, block, plan);
		}
		None => {
			transcript.push_block_to_last(plan);
		}
	}
}
