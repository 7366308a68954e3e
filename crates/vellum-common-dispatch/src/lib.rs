// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Turning user input into agent prompts and sending them.
//!
//! [`MessagePreparer`] expands note mentions and the active note into context
//! blocks. [`SendPipeline`] sends the result over a [`Transport`], handling
//! authentication retries and mapping failures onto [`AgentError`].

pub mod collaborators;
pub mod error;
pub mod prepare;
pub mod send;

pub use collaborators::*;
pub use error::*;
pub use prepare::{
	extract_mentions, ActiveNote, ContextOptions, MessagePreparer, PrepareRequest, PreparedMessage,
	DEFAULT_MAX_NOTE_CHARS,
};
pub use send::{classify_failure, BenignFailure, FailureClass, SendOutcome, SendPipeline};
