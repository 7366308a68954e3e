// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The chat session facade used by the UI layer.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};
use vellum_cli_config::VellumConfig;
use vellum_common_dispatch::{
	AgentError, AuthProvider, ContextOptions, MessagePreparer, NoteResolver, PrepareRequest,
	PreparedMessage, SendOutcome, SendPipeline, SessionId, Transport,
};
use vellum_common_permission::{PermissionOutcome, PermissionRegistry, PermissionTicket};
use vellum_common_transcript::{
	ContentBlock, FoldOutcome, Message, PermissionRequest, PermissionRequestView, RequestId,
	SessionUpdateEvent, SideChannelUpdate,
};

use crate::lifecycle::{AgentSwitch, LifecycleEvent, SessionStatus};
use crate::state::SessionState;
use crate::store::{SessionStore, Snapshot, Subscription};

/// Settings a session is built with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
	pub agent_id: String,
	pub auto_allow: bool,
	pub context: ContextOptions,
}

impl SessionSettings {
	/// Reads the active agent and session options from resolved config.
	/// A missing agent or empty command is a `configuration` error.
	pub fn from_config(config: &VellumConfig) -> Result<Self, AgentError> {
		let agent = config
			.active_agent()
			.map_err(|e| AgentError::configuration(e.to_string()))?;
		if agent.command.trim().is_empty() {
			return Err(AgentError::configuration(format!(
				"No command configured for agent '{}'.",
				config.global.active_agent
			)));
		}

		Ok(Self {
			agent_id: config.global.active_agent.clone(),
			auto_allow: config.permissions.auto_allow,
			context: ContextOptions {
				auto_attach_active_note: config.context.auto_attach_active_note,
				max_note_chars: config.context.max_note_chars,
			},
		})
	}
}

/// External services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
	pub transport: Arc<dyn Transport>,
	pub notes: Arc<dyn NoteResolver>,
	pub auth: Arc<dyn AuthProvider>,
}

/// One chat with one agent.
///
/// All transcript mutation goes through the [`SessionStore`]; inbound
/// protocol events must be fed in receipt order, normally by the loop in
/// [`crate::inbound`].
pub struct ChatSession {
	store: SessionStore,
	transport: RwLock<Arc<dyn Transport>>,
	auth: Arc<dyn AuthProvider>,
	preparer: MessagePreparer,
	permissions: PermissionRegistry,
}

impl ChatSession {
	pub fn new(settings: SessionSettings, collaborators: Collaborators) -> Self {
		info!(
			agent_id = %settings.agent_id,
			auto_allow = settings.auto_allow,
			"creating chat session"
		);
		Self {
			store: SessionStore::new(SessionState::new(settings.agent_id)),
			transport: RwLock::new(collaborators.transport),
			auth: collaborators.auth,
			preparer: MessagePreparer::new(collaborators.notes, settings.context),
			permissions: PermissionRegistry::new(settings.auto_allow),
		}
	}

	pub fn store(&self) -> &SessionStore {
		&self.store
	}

	pub fn snapshot(&self) -> Arc<Snapshot> {
		self.store.snapshot()
	}

	pub fn subscribe(&self, listener: impl Fn(&Arc<Snapshot>) + Send + Sync + 'static) -> Subscription {
		self.store.subscribe(listener)
	}

	pub fn status(&self) -> SessionStatus {
		self.store.read(|s| s.state.status())
	}

	pub fn session_id(&self) -> Option<SessionId> {
		self.store.read(|s| s.state.session_id.clone())
	}

	pub fn is_current(&self, session_id: &SessionId) -> bool {
		self.store.read(|s| s.state.session_id.as_ref() == Some(session_id))
	}

	pub fn pending_permissions(&self) -> usize {
		self.permissions.pending_count()
	}

	fn transport(&self) -> Arc<dyn Transport> {
		self.transport.read().clone()
	}

	/// Starts a fresh agent session, cancelling any turn in progress first.
	/// The transcript is cleared.
	#[instrument(skip(self))]
	pub async fn create_new_session(&self) -> Result<SessionId, AgentError> {
		if self.status() == SessionStatus::Busy {
			info!("cancelling turn in progress before starting a new session");
			self.cancel_current_operation().await;
		}
		self.permissions.cancel_all();

		self.store.try_update(|snap| {
			snap.state.coordinator.apply(LifecycleEvent::Create)?;
			snap.transcript.clear();
			snap.state.reset_session();
			Ok::<_, AgentError>(())
		})?;

		match self.transport().new_session().await {
			Ok(started) => {
				info!(session_id = %started.session_id, auth_methods = started.auth_methods.len(), "session ready");
				let session_id = started.session_id.clone();
				self.store.update(|snap| {
					snap.state.advance(LifecycleEvent::InitSucceeded);
					snap.state.session_id = Some(started.session_id);
					snap.state.auth_methods = started.auth_methods;
					snap.state.current_mode_id = started.current_mode_id;
				});
				Ok(session_id)
			}
			Err(err) => {
				warn!(error = %err, "failed to start agent session");
				let agent_err = AgentError::connection(&err);
				self.store.update(|snap| {
					snap.state.advance(LifecycleEvent::InitFailed);
					snap.state.last_error = Some(agent_err.clone());
				});
				Err(agent_err)
			}
		}
	}

	/// Expands mentions and the active note. Does not touch session state.
	pub async fn prepare_message(&self, request: PrepareRequest) -> PreparedMessage {
		self.preparer.prepare(request).await
	}

	/// Shows the user's message immediately, then sends it.
	///
	/// Rejected with `session_busy` while another turn is in progress.
	#[instrument(skip(self, message), fields(chars = message.display_text.len()))]
	pub async fn send_prepared_message(&self, message: &PreparedMessage) -> Result<SendOutcome, AgentError> {
		let (session_id, auth_methods, turn) = self.store.try_update(|snap| {
			let Some(session_id) = snap.state.session_id.clone() else {
				return Err(AgentError::session_not_ready());
			};
			snap.state.coordinator.apply(LifecycleEvent::Send)?;
			snap.state.last_error = None;
			snap.transcript.append_message(user_message(message));
			let turn = snap.state.begin_turn();
			Ok((session_id, snap.state.auth_methods.clone(), turn))
		})?;

		let pipeline = SendPipeline::new(self.transport(), self.auth.clone());
		let result = pipeline.send(&session_id, message, &auth_methods).await;

		self.store.update(|snap| {
			if !snap.state.finish_turn(turn) {
				debug!(turn, active_turn = ?snap.state.active_turn, "dropping completion of a superseded turn");
				return;
			}
			snap.state.advance(LifecycleEvent::Completed);
			if let Err(err) = &result {
				snap.state.last_error = Some(err.clone());
			}
		});

		result
	}

	/// Aborts the turn in progress and cancels every pending permission
	/// request. Safe to call when nothing is running.
	#[instrument(skip(self))]
	pub async fn cancel_current_operation(&self) {
		let (session_id, busy) = self
			.store
			.read(|s| (s.state.session_id.clone(), s.state.status() == SessionStatus::Busy));

		if busy {
			if let Some(session_id) = &session_id {
				if let Err(err) = self.transport().cancel(session_id).await {
					warn!(error = %err, "agent did not acknowledge cancel");
				}
			}
		}

		let cancelled = self.permissions.cancel_all();
		if !busy && cancelled.is_empty() {
			debug!("nothing to cancel");
			return;
		}

		self.store.update(|snap| {
			let views = snap.transcript.cancel_pending_permissions();
			debug!(views, "marked permission requests cancelled");
			if snap.state.status() == SessionStatus::Busy {
				snap.state.active_turn = None;
			}
			snap.state.advance(LifecycleEvent::Cancel);
		});
	}

	/// Records the user's answer to a permission request. Late answers for
	/// requests that are no longer pending are ignored.
	pub fn approve_permission(&self, request_id: &RequestId, option_id: &str) -> bool {
		if !self.permissions.resolve(request_id, option_id) {
			return false;
		}
		self.store.update(|snap| {
			snap.transcript.update_permission(request_id, |call| {
				if let Some(view) = call.permission_request.as_mut() {
					if !view.is_resolved() {
						view.selected_option_id = Some(option_id.to_string());
					}
				}
			});
		});
		true
	}

	/// Cancels outstanding work and forgets the agent session. The transcript
	/// is kept.
	#[instrument(skip(self))]
	pub async fn disconnect(&self) {
		self.cancel_current_operation().await;
		self.store.update(|snap| {
			snap.state.advance(LifecycleEvent::Disconnect);
			snap.state.reset_session();
		});
	}

	/// Folds one inbound update into the transcript or the side-channel
	/// state.
	pub fn apply_update(&self, event: SessionUpdateEvent) {
		self.store.update(|snap| match snap.transcript.apply(event) {
			FoldOutcome::TranscriptChanged => {}
			FoldOutcome::SideChannel(SideChannelUpdate::AvailableCommands(commands)) => {
				debug!(count = commands.len(), "available commands updated");
				snap.state.available_commands = commands;
			}
			FoldOutcome::SideChannel(SideChannelUpdate::CurrentMode(mode_id)) => {
				debug!(mode_id = %mode_id, "current mode updated");
				snap.state.current_mode_id = Some(mode_id);
			}
		});
	}

	/// Attaches a permission request to its tool call and registers it.
	///
	/// The returned ticket resolves when the user answers, the request is
	/// cancelled, or immediately when auto-approval is on.
	pub fn request_permission(&self, request: PermissionRequest) -> PermissionTicket {
		let request_id = RequestId::generate();
		let ticket = self.permissions.register(request_id.clone(), &request.options);

		let mut view = PermissionRequestView::new(request_id, request.options);
		match ticket.auto_outcome() {
			Some(PermissionOutcome::Selected { option_id }) => {
				view.selected_option_id = Some(option_id.clone());
			}
			Some(PermissionOutcome::Cancelled) => view.is_cancelled = true,
			None => {}
		}

		info!(
			request_id = %view.request_id,
			tool_call_id = %request.tool_call.tool_call_id,
			"permission requested"
		);
		self.apply_update(SessionUpdateEvent::ToolCallUpdated(
			request.tool_call.with_permission(view),
		));
		ticket
	}

	/// Switches to another agent.
	///
	/// With an empty transcript the session is reinitialized in place;
	/// otherwise the current work is cancelled and a new session started.
	#[instrument(skip(self, transport))]
	pub async fn switch_agent(
		&self,
		agent_id: &str,
		transport: Arc<dyn Transport>,
	) -> Result<AgentSwitch, AgentError> {
		let plan = self
			.store
			.read(|s| s.state.coordinator.plan_agent_switch(s.transcript.is_empty()));
		info!(?plan, "switching agent");

		if plan == AgentSwitch::RestartRequired {
			self.cancel_current_operation().await;
		}

		*self.transport.write() = transport;
		self.store.update(|snap| snap.state.agent_id = agent_id.to_string());
		self.create_new_session().await?;
		Ok(plan)
	}
}

fn user_message(message: &PreparedMessage) -> Message {
	let mut content = vec![match &message.attached_context {
		Some(context) => ContentBlock::TextWithContext {
			text: message.display_text.clone(),
			context: context.clone(),
		},
		None => ContentBlock::text(message.display_text.clone()),
	}];
	content.extend(message.images.iter().map(|image| ContentBlock::Image {
		mime_type: image.mime_type.clone(),
		data: image.data.clone(),
	}));
	Message::user(content)
}
