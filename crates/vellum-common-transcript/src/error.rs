// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageIdError {
	#[error("invalid message ID prefix: expected 'M-', got '{0}'")]
	InvalidPrefix(String),

	#[error("invalid UUID in message ID: {0}")]
	InvalidUuid(#[from] uuid::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
	#[error("message index {0} out of range")]
	MessageOutOfRange(usize),

	#[error("block index {block} out of range for message {message}")]
	BlockOutOfRange { message: usize, block: usize },
}
