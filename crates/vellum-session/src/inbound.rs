// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Serialized handling of inbound agent events.
//!
//! Every update and permission request for a session goes through one mpsc
//! queue with a single consumer, so events are folded strictly in receipt
//! order. Permission tickets are awaited off the loop so a pending approval
//! never blocks later updates.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use vellum_common_dispatch::SessionId;
use vellum_common_permission::PermissionOutcome;
use vellum_common_transcript::{PermissionRequest, SessionUpdateEvent};

use crate::error::SessionError;
use crate::session::ChatSession;

pub const INBOUND_QUEUE_CAPACITY: usize = 256;

#[derive(Debug)]
enum Inbound {
	Update {
		session_id: SessionId,
		event: SessionUpdateEvent,
	},
	Permission {
		session_id: SessionId,
		request: PermissionRequest,
		respond: oneshot::Sender<PermissionOutcome>,
	},
}

/// Producer side of the inbound queue. Cheap to clone.
#[derive(Clone, Debug)]
pub struct InboundHandle {
	tx: mpsc::Sender<Inbound>,
}

impl InboundHandle {
	pub async fn push_update(&self, session_id: SessionId, event: SessionUpdateEvent) -> Result<(), SessionError> {
		self
			.tx
			.send(Inbound::Update { session_id, event })
			.await
			.map_err(|_| SessionError::LoopClosed)
	}

	/// Queues a permission request. The receiver yields the answer to send
	/// back to the agent.
	pub async fn request_permission(
		&self,
		session_id: SessionId,
		request: PermissionRequest,
	) -> Result<oneshot::Receiver<PermissionOutcome>, SessionError> {
		let (respond, rx) = oneshot::channel();
		self
			.tx
			.send(Inbound::Permission {
				session_id,
				request,
				respond,
			})
			.await
			.map_err(|_| SessionError::LoopClosed)?;
		Ok(rx)
	}
}

/// Starts the consumer task. It runs until every [`InboundHandle`] is
/// dropped.
pub fn spawn_inbound_loop(session: Arc<ChatSession>) -> (InboundHandle, JoinHandle<()>) {
	let (tx, rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);
	let task = tokio::spawn(run(session, rx));
	(InboundHandle { tx }, task)
}

async fn run(session: Arc<ChatSession>, mut rx: mpsc::Receiver<Inbound>) {
	debug!("inbound loop started");
	let mut handled: u64 = 0;

	while let Some(message) = rx.recv().await {
		handled += 1;
		match message {
			Inbound::Update { session_id, event } => {
				if !session.is_current(&session_id) {
					debug!(session_id = %session_id, kind = event.kind_name(), "dropping update for stale session");
					continue;
				}
				trace!(kind = event.kind_name(), "applying inbound update");
				session.apply_update(event);
			}
			Inbound::Permission {
				session_id,
				request,
				respond,
			} => {
				if !session.is_current(&session_id) {
					debug!(session_id = %session_id, "cancelling permission request for stale session");
					let _ = respond.send(PermissionOutcome::Cancelled);
					continue;
				}

				let ticket = session.request_permission(request);
				if let Some(outcome) = ticket.auto_outcome() {
					let _ = respond.send(outcome.clone());
					continue;
				}
				tokio::spawn(async move {
					let outcome = ticket.await;
					if respond.send(outcome).is_err() {
						debug!("permission response receiver dropped");
					}
				});
			}
		}
	}

	debug!(handled, "inbound loop stopped");
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session::{Collaborators, SessionSettings};
	use async_trait::async_trait;
	use vellum_common_dispatch::{
		AuthProvider, ContextOptions, NoteError, NoteRef, NoteResolver, OutgoingPrompt, SessionStarted,
		StopReason, Transport, TransportError,
	};
	use vellum_common_transcript::{PermissionOption, PermissionOptionKind, ToolCallPatch};

	struct FixedTransport;

	#[async_trait]
	impl Transport for FixedTransport {
		async fn new_session(&self) -> Result<SessionStarted, TransportError> {
			Ok(SessionStarted {
				session_id: SessionId::new("s1"),
				auth_methods: Vec::new(),
				current_mode_id: None,
			})
		}

		async fn prompt(&self, _: &SessionId, _: &OutgoingPrompt) -> Result<StopReason, TransportError> {
			Ok(StopReason::EndTurn)
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

	async fn ready_session(auto_allow: bool) -> Arc<ChatSession> {
		let session = Arc::new(ChatSession::new(
			SessionSettings {
				agent_id: "test".to_string(),
				auto_allow,
				context: ContextOptions::default(),
			},
			Collaborators {
				transport: Arc::new(FixedTransport),
				notes: Arc::new(NoNotes),
				auth: Arc::new(NoAuth),
			},
		));
		session.create_new_session().await.expect("session");
		session
	}

	fn permission_request() -> PermissionRequest {
		PermissionRequest {
			tool_call: ToolCallPatch::new("call_1").with_title("Write file"),
			options: vec![
				PermissionOption::new("allow", "Allow", Some(PermissionOptionKind::AllowOnce)),
				PermissionOption::new("reject", "Reject", Some(PermissionOptionKind::RejectOnce)),
			],
		}
	}

	#[tokio::test]
	async fn test_updates_applied_in_order() {
		let session = ready_session(false).await;
		let (handle, task) = spawn_inbound_loop(session.clone());

		for chunk in ["Hel", "lo", " world"] {
			handle
				.push_update(
					SessionId::new("s1"),
					SessionUpdateEvent::AgentTextChunk {
						text: chunk.to_string(),
					},
				)
				.await
				.expect("push");
		}
		drop(handle);
		task.await.expect("loop");

		let snapshot = session.snapshot();
		assert_eq!(snapshot.transcript.len(), 1);
		assert_eq!(snapshot.transcript.messages()[0].text(), "Hello world");
	}

	#[tokio::test]
	async fn test_stale_session_updates_dropped() {
		let session = ready_session(false).await;
		let (handle, task) = spawn_inbound_loop(session.clone());

		handle
			.push_update(
				SessionId::new("old"),
				SessionUpdateEvent::AgentTextChunk {
					text: "ghost".to_string(),
				},
			)
			.await
			.expect("push");
		drop(handle);
		task.await.expect("loop");

		assert!(session.snapshot().transcript.is_empty());
	}

	#[tokio::test]
	async fn test_auto_allow_answers_without_waiting() {
		let session = ready_session(true).await;
		let (handle, task) = spawn_inbound_loop(session.clone());

		let rx = handle
			.request_permission(SessionId::new("s1"), permission_request())
			.await
			.expect("queue");
		assert_eq!(
			rx.await.expect("answer"),
			PermissionOutcome::Selected {
				option_id: "allow".to_string()
			}
		);
		drop(handle);
		task.await.expect("loop");

		let snapshot = session.snapshot();
		let view = snapshot
			.transcript
			.tool_call("call_1")
			.and_then(|call| call.permission_request.clone())
			.expect("view");
		assert_eq!(view.selected_option_id.as_deref(), Some("allow"));
		assert_eq!(session.pending_permissions(), 0);
	}

	#[tokio::test]
	async fn test_manual_approval_flows_back_to_agent() {
		let session = ready_session(false).await;
		let (handle, _task) = spawn_inbound_loop(session.clone());

		let rx = handle
			.request_permission(SessionId::new("s1"), permission_request())
			.await
			.expect("queue");

		// wait until the loop has registered the request
		let request_id = loop {
			let snapshot = session.snapshot();
			if let Some(view) = snapshot
				.transcript
				.tool_call("call_1")
				.and_then(|call| call.permission_request.clone())
			{
				break view.request_id;
			}
			tokio::task::yield_now().await;
		};

		assert!(session.approve_permission(&request_id, "reject"));
		assert_eq!(
			rx.await.expect("answer"),
			PermissionOutcome::Selected {
				option_id: "reject".to_string()
			}
		);
		// a second click is a no-op
		assert!(!session.approve_permission(&request_id, "allow"));
	}

	#[tokio::test]
	async fn test_closed_loop_reports_error() {
		let session = ready_session(false).await;
		let (handle, task) = spawn_inbound_loop(session);
		task.abort();
		let _ = task.await;

		let result = handle
			.push_update(
				SessionId::new("s1"),
				SessionUpdateEvent::AgentTextChunk {
					text: "late".to_string(),
				},
			)
			.await;
		assert_eq!(result, Err(SessionError::LoopClosed));
	}
}
