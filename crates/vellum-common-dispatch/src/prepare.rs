// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use vellum_common_transcript::{AttachedContext, LineRange};

use crate::collaborators::{ImageAttachment, NoteRef, NoteResolver, OutgoingPrompt};

pub const DEFAULT_MAX_NOTE_CHARS: usize = 10_000;

static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"@\[\[(.+?)\]\]").expect("mention regex is valid")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextOptions {
	pub auto_attach_active_note: bool,
	pub max_note_chars: usize,
}

impl Default for ContextOptions {
	fn default() -> Self {
		Self {
			auto_attach_active_note: true,
			max_note_chars: DEFAULT_MAX_NOTE_CHARS,
		}
	}
}

/// The note open in the editor when the user hit send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveNote {
	pub name: String,
	pub path: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub selection: Option<LineRange>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareRequest {
	pub text: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub active_note: Option<ActiveNote>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub images: Vec<ImageAttachment>,
}

impl PrepareRequest {
	pub fn text(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			..Default::default()
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedMessage {
	/// The user's input exactly as typed.
	pub display_text: String,
	/// Context blocks followed by the user's input.
	pub wire_text: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub attached_context: Option<AttachedContext>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub images: Vec<ImageAttachment>,
}

impl PreparedMessage {
	pub fn prompt(&self) -> OutgoingPrompt {
		OutgoingPrompt {
			text: self.wire_text.clone(),
			images: self.images.clone(),
		}
	}
}

/// Unique mention targets in order of first appearance.
pub fn extract_mentions(text: &str) -> Vec<String> {
	let mut seen = HashSet::new();
	MENTION_RE
		.captures_iter(text)
		.filter_map(|caps| caps.get(1))
		.map(|m| m.as_str().trim().to_string())
		.filter(|name| !name.is_empty() && seen.insert(name.clone()))
		.collect()
}

pub struct MessagePreparer {
	notes: Arc<dyn NoteResolver>,
	options: ContextOptions,
}

impl MessagePreparer {
	pub fn new(notes: Arc<dyn NoteResolver>, options: ContextOptions) -> Self {
		Self { notes, options }
	}

	pub fn options(&self) -> ContextOptions {
		self.options
	}

	/// Expands mentions and the active note into context blocks. Notes that
	/// cannot be resolved or read are skipped; the literal text is always
	/// kept.
	#[instrument(skip(self, request), fields(chars = request.text.len()))]
	pub async fn prepare(&self, request: PrepareRequest) -> PreparedMessage {
		let mut blocks = Vec::new();
		let mut inlined = HashSet::new();

		for name in extract_mentions(&request.text) {
			let Some(note) = self.notes.resolve_mention(&name) else {
				debug!(mention = %name, "mention did not resolve to a note");
				continue;
			};
			if !inlined.insert(note.path.clone()) {
				continue;
			}
			match self.notes.read_content(&note.path).await {
				Ok(content) => blocks.push(self.mention_block(&note, &content)),
				Err(e) => warn!(path = %note.path, error = %e, "failed to read mentioned note"),
			}
		}

		let mut attached_context = None;
		if self.options.auto_attach_active_note {
			if let Some(active) = &request.active_note {
				attached_context = Some(AttachedContext {
					note_name: active.name.clone(),
					note_path: active.path.clone(),
					selection: active.selection,
				});

				if inlined.insert(active.path.clone()) {
					match self.notes.read_content(&active.path).await {
						Ok(content) => blocks.push(self.active_note_block(active, &content)),
						Err(e) => {
							warn!(path = %active.path, error = %e, "failed to read active note")
						}
					}
				}
			}
		}

		let wire_text = if blocks.is_empty() {
			request.text.clone()
		} else {
			format!("{}\n\n{}", blocks.join("\n\n"), request.text)
		};

		PreparedMessage {
			display_text: request.text,
			wire_text,
			attached_context,
			images: request.images,
		}
	}

	fn mention_block(&self, note: &NoteRef, content: &str) -> String {
		let body = truncate_note(content, self.options.max_note_chars);
		format!(
			"<note name=\"{}\" path=\"{}\">\n{}\n</note>",
			note.name, note.path, body
		)
	}

	fn active_note_block(&self, note: &ActiveNote, content: &str) -> String {
		match note.selection {
			Some(range) => {
				let selected = select_lines(content, range);
				let body = truncate_note(&selected, self.options.max_note_chars);
				format!(
					"<active_note name=\"{}\" path=\"{}\" lines=\"{}\">\n{}\n</active_note>",
					note.name, note.path, range, body
				)
			}
			None => {
				let body = truncate_note(content, self.options.max_note_chars);
				format!(
					"<active_note name=\"{}\" path=\"{}\">\n{}\n</active_note>",
					note.name, note.path, body
				)
			}
		}
	}
}

/// Keeps the first `budget` characters and appends a marker when anything
/// was cut.
fn truncate_note(content: &str, budget: usize) -> String {
	let total = content.chars().count();
	if total <= budget {
		return content.to_string();
	}

	let kept: String = content.chars().take(budget).collect();
	format!("{kept}\n[truncated: showing the first {budget} of {total} characters]")
}

fn select_lines(content: &str, range: LineRange) -> String {
	let first = range.from.max(1);
	let skip = (first - 1) as usize;
	let take = range.to.saturating_sub(first) as usize + 1;
	content
		.lines()
		.skip(skip)
		.take(take)
		.collect::<Vec<_>>()
		.join("\n")
}
