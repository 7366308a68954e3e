// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Agent Client Protocol (ACP) integration for Vellum.
//!
//! Decodes the agent's `session/update` notifications and
//! `session/request_permission` requests into transcript events, and turns
//! outgoing prompts into ACP content blocks.

pub mod bridge;
pub mod error;
pub mod wire;

pub use bridge::{
	decode_message, permission_outcome_to_response, prompt_to_content_blocks, session_id_from_acp,
	session_id_to_acp, stop_reason_from_acp, update_to_event, InboundMessage,
};
pub use error::AcpError;
