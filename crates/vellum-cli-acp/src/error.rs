// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for ACP integration.

use thiserror::Error;

/// Errors that can occur while decoding ACP traffic.
#[derive(Debug, Error)]
pub enum AcpError {
	#[error("malformed message: {0}")]
	Json(#[from] serde_json::Error),

	#[error("unsupported method: {0}")]
	UnsupportedMethod(String),

	#[error("missing params for method: {0}")]
	MissingParams(String),

	#[error("missing field: {0}")]
	MissingField(&'static str),
}

impl From<AcpError> for agent_client_protocol::Error {
	fn from(err: AcpError) -> Self {
		match err {
			AcpError::Json(_) => agent_client_protocol::Error::invalid_params(),
			AcpError::MissingParams(_) | AcpError::MissingField(_) => {
				agent_client_protocol::Error::invalid_params()
			}
			AcpError::UnsupportedMethod(_) => agent_client_protocol::Error::method_not_found(),
		}
	}
}
