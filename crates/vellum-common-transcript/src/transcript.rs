// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TranscriptError;
use crate::model::{ContentBlock, Message, RequestId, ToolCall};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLocation {
	pub message: usize,
	pub block: usize,
}

/// Ordered chat transcript with a tool call index.
///
/// The index maps each tool call id to the block that holds it and is kept in
/// step with every mutation made through this type. Callers never get mutable
/// access to the message list itself, only to individual blocks.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Message>", into = "Vec<Message>")]
pub struct Transcript {
	messages: Vec<Message>,
	tool_calls: HashMap<String, BlockLocation>,
}

impl From<Vec<Message>> for Transcript {
	fn from(messages: Vec<Message>) -> Self {
		let mut transcript = Self {
			messages,
			tool_calls: HashMap::new(),
		};
		transcript.reindex();
		transcript
	}
}

impl From<Transcript> for Vec<Message> {
	fn from(transcript: Transcript) -> Self {
		transcript.messages
	}
}

impl PartialEq for Transcript {
	fn eq(&self, other: &Self) -> bool {
		self.messages == other.messages
	}
}

impl Transcript {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn messages(&self) -> &[Message] {
		&self.messages
	}

	pub fn len(&self) -> usize {
		self.messages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.messages.is_empty()
	}

	pub fn last_message(&self) -> Option<&Message> {
		self.messages.last()
	}

	/// Appends a message and returns its index.
	pub fn append_message(&mut self, message: Message) -> usize {
		let index = self.messages.len();
		for (block, content) in message.content.iter().enumerate() {
			if let ContentBlock::ToolCall(call) = content {
				self
					.tool_calls
					.insert(call.tool_call_id.clone(), BlockLocation { message: index, block });
			}
		}
		self.messages.push(message);
		index
	}

	/// Appends a block to the last message.
	///
	/// Returns `None` when the transcript is empty.
	pub fn push_block_to_last(&mut self, block: ContentBlock) -> Option<BlockLocation> {
		let message = self.messages.len().checked_sub(1)?;
		let content = &mut self.messages[message].content;
		let location = BlockLocation {
			message,
			block: content.len(),
		};
		if let ContentBlock::ToolCall(call) = &block {
			self.tool_calls.insert(call.tool_call_id.clone(), location);
		}
		content.push(block);
		Some(location)
	}

	/// Mutable access to the last block of the last message, for in-place
	/// text concatenation.
	pub(crate) fn last_block_mut(&mut self) -> Option<&mut ContentBlock> {
		self.messages.last_mut()?.content.last_mut()
	}

	pub fn find_tool_call(&self, tool_call_id: &str) -> Option<BlockLocation> {
		self.tool_calls.get(tool_call_id).copied()
	}

	pub fn tool_call(&self, tool_call_id: &str) -> Option<&ToolCall> {
		let location = self.find_tool_call(tool_call_id)?;
		self.messages[location.message].content[location.block].as_tool_call()
	}

	pub fn tool_call_mut(&mut self, tool_call_id: &str) -> Option<&mut ToolCall> {
		let location = self.find_tool_call(tool_call_id)?;
		self.messages[location.message].content[location.block].as_tool_call_mut()
	}

	/// Every tool call in transcript order.
	pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
		self
			.messages
			.iter()
			.flat_map(|message| message.content.iter())
			.filter_map(ContentBlock::as_tool_call)
	}

	/// Replaces a single block, keeping the tool call index consistent.
	pub fn replace_content_at(
		&mut self,
		message: usize,
		block: usize,
		replacement: ContentBlock,
	) -> Result<ContentBlock, TranscriptError> {
		let content = &mut self
			.messages
			.get_mut(message)
			.ok_or(TranscriptError::MessageOutOfRange(message))?
			.content;
		let slot = content
			.get_mut(block)
			.ok_or(TranscriptError::BlockOutOfRange { message, block })?;

		let previous = std::mem::replace(slot, replacement);
		let location = BlockLocation { message, block };

		if let ContentBlock::ToolCall(old) = &previous {
			if self.tool_calls.get(&old.tool_call_id) == Some(&location) {
				self.tool_calls.remove(&old.tool_call_id);
			}
		}
		if let ContentBlock::ToolCall(new) = &self.messages[message].content[block] {
			self.tool_calls.insert(new.tool_call_id.clone(), location);
		}

		Ok(previous)
	}

	/// Applies `f` to the tool call carrying the given permission request.
	pub fn update_permission<F>(&mut self, request_id: &RequestId, f: F) -> bool
	where
		F: FnOnce(&mut ToolCall),
	{
		let found = self.tool_calls.values().copied().find(|location| {
			self.messages[location.message].content[location.block]
				.as_tool_call()
				.and_then(|call| call.permission_request.as_ref())
				.is_some_and(|view| &view.request_id == request_id)
		});

		match found {
			Some(location) => {
				if let Some(call) =
					self.messages[location.message].content[location.block].as_tool_call_mut()
				{
					f(call);
				}
				true
			}
			None => false,
		}
	}

	/// Marks every unresolved permission request as cancelled. Returns the
	/// number of views changed.
	pub fn cancel_pending_permissions(&mut self) -> usize {
		let mut changed = 0;
		for message in &mut self.messages {
			for block in &mut message.content {
				if let Some(view) = block
					.as_tool_call_mut()
					.and_then(|call| call.permission_request.as_mut())
				{
					if !view.is_resolved() {
						view.is_cancelled = true;
						changed += 1;
					}
				}
			}
		}
		changed
	}

	pub fn clear(&mut self) {
		self.messages.clear();
		self.tool_calls.clear();
	}

	fn reindex(&mut self) {
		self.tool_calls.clear();
		for (message, entry) in self.messages.iter().enumerate() {
			for (block, content) in entry.content.iter().enumerate() {
				if let ContentBlock::ToolCall(call) = content {
					self
						.tool_calls
						.insert(call.tool_call_id.clone(), BlockLocation { message, block });
				}
			}
		}
	}

	#[cfg(test)]
	pub(crate) fn scan_tool_call(&self, tool_call_id: &str) -> Option<BlockLocation> {
		self.messages.iter().enumerate().find_map(|(message, entry)| {
			entry.content.iter().enumerate().find_map(|(block, content)| match content {
				ContentBlock::ToolCall(call) if call.tool_call_id == tool_call_id => {
					Some(BlockLocation { message, block })
				}
				_ => None,
			})
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::{PermissionRequestView, Role};

	fn tool_block(id: &str) -> ContentBlock {
		ContentBlock::ToolCall(ToolCall::new(id, "tool"))
	}

	#[test]
	fn test_append_indexes_tool_calls() {
		let mut transcript = Transcript::new();
		transcript.append_message(Message::user(vec![ContentBlock::text("hi")]));
		transcript.append_message(Message::assistant(vec![
			ContentBlock::text("working"),
			tool_block("t1"),
		]));

		assert_eq!(
			transcript.find_tool_call("t1"),
			Some(BlockLocation {
				message: 1,
				block: 1
			})
		);
		assert_eq!(transcript.find_tool_call("t1"), transcript.scan_tool_call("t1"));
		assert!(transcript.find_tool_call("missing").is_none());
	}

	#[test]
	fn test_replace_content_at_updates_index() {
		let mut transcript = Transcript::new();
		transcript.append_message(Message::assistant(vec![tool_block("t1")]));

		let previous = transcript
			.replace_content_at(0, 0, tool_block("t2"))
			.expect("replace");
		assert_eq!(previous.as_tool_call().map(|c| c.tool_call_id.as_str()), Some("t1"));
		assert!(transcript.find_tool_call("t1").is_none());
		assert_eq!(transcript.find_tool_call("t2"), transcript.scan_tool_call("t2"));

		transcript
			.replace_content_at(0, 0, ContentBlock::text("gone"))
			.expect("replace");
		assert!(transcript.find_tool_call("t2").is_none());
	}

	#[test]
	fn test_replace_content_at_out_of_range() {
		let mut transcript = Transcript::new();
		assert_eq!(
			transcript.replace_content_at(0, 0, ContentBlock::text("x")),
			Err(TranscriptError::MessageOutOfRange(0))
		);

		transcript.append_message(Message::assistant(Vec::new()));
		assert_eq!(
			transcript.replace_content_at(0, 3, ContentBlock::text("x")),
			Err(TranscriptError::BlockOutOfRange {
				message: 0,
				block: 3
			})
		);
	}

	#[test]
	fn test_push_block_to_last_requires_message() {
		let mut transcript = Transcript::new();
		assert!(transcript.push_block_to_last(ContentBlock::text("x")).is_none());

		transcript.append_message(Message::assistant(Vec::new()));
		let location = transcript
			.push_block_to_last(tool_block("t9"))
			.expect("pushed");
		assert_eq!(transcript.find_tool_call("t9"), Some(location));
	}

	#[test]
	fn test_cancel_pending_permissions_skips_resolved() {
		let mut resolved = ToolCall::new("t1", "write");
		let mut view = PermissionRequestView::new(RequestId::from_string("P-1"), Vec::new());
		view.selected_option_id = Some("allow".to_string());
		resolved.permission_request = Some(view);

		let mut pending = ToolCall::new("t2", "delete");
		pending.permission_request = Some(PermissionRequestView::new(
			RequestId::from_string("P-2"),
			Vec::new(),
		));

		let mut transcript = Transcript::new();
		transcript.append_message(Message::assistant(vec![
			ContentBlock::ToolCall(resolved),
			ContentBlock::ToolCall(pending),
		]));

		assert_eq!(transcript.cancel_pending_permissions(), 1);
		let t2 = transcript.tool_call("t2").expect("t2");
		assert!(t2.permission_request.as_ref().is_some_and(|v| v.is_cancelled));
		let t1 = transcript.tool_call("t1").expect("t1");
		assert!(t1.permission_request.as_ref().is_some_and(|v| !v.is_cancelled));
	}

	/// **Property: Transcript JSON roundtrip rebuilds the tool call index**
	#[test]
	fn test_json_roundtrip_reindexes() {
		let mut transcript = Transcript::new();
		transcript.append_message(Message::assistant(vec![
			ContentBlock::text("a"),
			tool_block("t1"),
		]));

		let json = serde_json::to_string(&transcript).expect("serialize");
		let restored: Transcript = serde_json::from_str(&json).expect("deserialize");

		assert_eq!(restored, transcript);
		assert_eq!(restored.messages()[0].role, Role::Assistant);
		assert_eq!(restored.find_tool_call("t1"), transcript.find_tool_call("t1"));
	}
}
