// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use vellum_common_transcript::{PermissionOption, RequestId};

use crate::select::auto_select;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PermissionOutcome {
	Selected { option_id: String },
	Cancelled,
}

/// Awaitable answer to a single permission request.
///
/// Resolves once the user picks an option, the request is cancelled, or the
/// registry is dropped. A dropped registry resolves as `Cancelled`.
#[derive(Debug)]
pub struct PermissionTicket {
	request_id: RequestId,
	state: TicketState,
}

#[derive(Debug)]
enum TicketState {
	Ready(Option<PermissionOutcome>),
	Waiting(oneshot::Receiver<PermissionOutcome>),
}

impl PermissionTicket {
	pub fn request_id(&self) -> &RequestId {
		&self.request_id
	}

	/// The outcome if it was decided at registration time.
	pub fn auto_outcome(&self) -> Option<&PermissionOutcome> {
		match &self.state {
			TicketState::Ready(outcome) => outcome.as_ref(),
			TicketState::Waiting(_) => None,
		}
	}
}

impl Future for PermissionTicket {
	type Output = PermissionOutcome;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match &mut self.state {
			TicketState::Ready(outcome) => {
				Poll::Ready(outcome.take().unwrap_or(PermissionOutcome::Cancelled))
			}
			TicketState::Waiting(rx) => match Pin::new(rx).poll(cx) {
				Poll::Ready(result) => Poll::Ready(result.unwrap_or(PermissionOutcome::Cancelled)),
				Poll::Pending => Poll::Pending,
			},
		}
	}
}

/// Pending permission requests keyed by request id.
///
/// Every registered request is resolved exactly once: by [`resolve`],
/// by [`cancel_all`], or immediately when auto-approval is on.
///
/// [`resolve`]: PermissionRegistry::resolve
/// [`cancel_all`]: PermissionRegistry::cancel_all
#[derive(Debug)]
pub struct PermissionRegistry {
	auto_allow: bool,
	pending: Mutex<HashMap<RequestId, oneshot::Sender<PermissionOutcome>>>,
}

impl PermissionRegistry {
	pub fn new(auto_allow: bool) -> Self {
		Self {
			auto_allow,
			pending: Mutex::new(HashMap::new()),
		}
	}

	pub fn auto_allow(&self) -> bool {
		self.auto_allow
	}

	pub fn register(&self, request_id: RequestId, options: &[PermissionOption]) -> PermissionTicket {
		if self.auto_allow {
			let outcome = match auto_select(options) {
				Some(option) => PermissionOutcome::Selected {
					option_id: option.option_id.clone(),
				},
				None => PermissionOutcome::Cancelled,
			};
			info!(request_id = %request_id, ?outcome, "permission auto-resolved");
			return PermissionTicket {
				request_id,
				state: TicketState::Ready(Some(outcome)),
			};
		}

		let (tx, rx) = oneshot::channel();
		if self.pending.lock().insert(request_id.clone(), tx).is_some() {
			warn!(request_id = %request_id, "replaced pending permission request with the same id");
		}
		debug!(request_id = %request_id, options = options.len(), "permission request pending");

		PermissionTicket {
			request_id,
			state: TicketState::Waiting(rx),
		}
	}

	/// Resolves a pending request with the chosen option. Unknown ids are a
	/// no-op and return `false`.
	pub fn resolve(&self, request_id: &RequestId, option_id: impl Into<String>) -> bool {
		let Some(tx) = self.pending.lock().remove(request_id) else {
			debug!(request_id = %request_id, "resolve for unknown permission request ignored");
			return false;
		};

		let option_id = option_id.into();
		info!(request_id = %request_id, option_id = %option_id, "permission resolved");
		if tx.send(PermissionOutcome::Selected { option_id }).is_err() {
			debug!(request_id = %request_id, "permission waiter already gone");
		}
		true
	}

	/// Cancels every pending request and returns their ids.
	pub fn cancel_all(&self) -> Vec<RequestId> {
		let drained: Vec<_> = self.pending.lock().drain().collect();
		let mut ids = Vec::with_capacity(drained.len());
		for (request_id, tx) in drained {
			let _ = tx.send(PermissionOutcome::Cancelled);
			ids.push(request_id);
		}
		if !ids.is_empty() {
			info!(count = ids.len(), "cancelled pending permission requests");
		}
		ids
	}

	pub fn is_pending(&self, request_id: &RequestId) -> bool {
		self.pending.lock().contains_key(request_id)
	}

	pub fn pending_count(&self) -> usize {
		self.pending.lock().len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use vellum_common_transcript::PermissionOptionKind;

	fn options() -> Vec<PermissionOption> {
		vec![
			PermissionOption::new("allow", "Allow", Some(PermissionOptionKind::AllowOnce)),
			PermissionOption::new("reject", "Reject", Some(PermissionOptionKind::RejectOnce)),
		]
	}

	/// **Property: Manual resolution delivers the chosen option**
	#[tokio::test]
	async fn test_resolve_delivers_selection() {
		let registry = PermissionRegistry::new(false);
		let id = RequestId::generate();
		let ticket = registry.register(id.clone(), &options());

		assert!(ticket.auto_outcome().is_none());
		assert!(registry.is_pending(&id));
		assert!(registry.resolve(&id, "reject"));
		assert!(!registry.is_pending(&id));

		assert_eq!(
			ticket.await,
			PermissionOutcome::Selected {
				option_id: "reject".to_string()
			}
		);
	}

	#[test]
	fn test_resolve_unknown_is_noop() {
		let registry = PermissionRegistry::new(false);
		assert!(!registry.resolve(&RequestId::from_string("nope"), "allow"));
	}

	#[test]
	fn test_second_resolve_is_noop() {
		let registry = PermissionRegistry::new(false);
		let id = RequestId::generate();
		let _ticket = registry.register(id.clone(), &options());

		assert!(registry.resolve(&id, "allow"));
		assert!(!registry.resolve(&id, "reject"));
	}

	/// **Property: Cancellation resolves every waiter with Cancelled**
	///
	/// Invariant: after cancel_all, no request is pending and every ticket
	/// yields Cancelled
	#[tokio::test]
	async fn test_cancel_all() {
		let registry = PermissionRegistry::new(false);
		let first = registry.register(RequestId::generate(), &options());
		let second = registry.register(RequestId::generate(), &options());

		let cancelled = registry.cancel_all();
		assert_eq!(cancelled.len(), 2);
		assert_eq!(registry.pending_count(), 0);
		assert_eq!(first.await, PermissionOutcome::Cancelled);
		assert_eq!(second.await, PermissionOutcome::Cancelled);
		assert!(registry.cancel_all().is_empty());
	}

	#[test]
	fn test_auto_allow_resolves_immediately() {
		let registry = PermissionRegistry::new(true);
		let ticket = registry.register(RequestId::generate(), &options());

		assert_eq!(registry.pending_count(), 0);
		assert_eq!(
			ticket.auto_outcome(),
			Some(&PermissionOutcome::Selected {
				option_id: "allow".to_string()
			})
		);
		let outcome = tokio_test::block_on(ticket);
		assert_eq!(
			outcome,
			PermissionOutcome::Selected {
				option_id: "allow".to_string()
			}
		);
	}

	#[test]
	fn test_auto_allow_without_options_cancels() {
		let registry = PermissionRegistry::new(true);
		let ticket = registry.register(RequestId::generate(), &[]);
		assert_eq!(tokio_test::block_on(ticket), PermissionOutcome::Cancelled);
	}

	#[tokio::test]
	async fn test_dropped_registry_cancels_waiters() {
		let registry = PermissionRegistry::new(false);
		let ticket = registry.register(RequestId::generate(), &options());
		drop(registry);
		assert_eq!(ticket.await, PermissionOutcome::Cancelled);
	}

	#[tokio::test]
	async fn test_duplicate_id_cancels_previous_waiter() {
		let registry = PermissionRegistry::new(false);
		let id = RequestId::from_string("P-dup");
		let first = registry.register(id.clone(), &options());
		let second = registry.register(id.clone(), &options());

		assert_eq!(first.await, PermissionOutcome::Cancelled);
		assert!(registry.resolve(&id, "allow"));
		assert_eq!(
			second.await,
			PermissionOutcome::Selected {
				option_id: "allow".to_string()
			}
		);
	}
}
