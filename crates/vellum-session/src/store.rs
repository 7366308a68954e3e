// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Observable session store.
//!
//! Readers take cheap `Arc<Snapshot>` clones; writers go through
//! [`SessionStore::update`], which notifies listeners after the lock is
//! released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::trace;
use vellum_common_transcript::Transcript;

use crate::state::SessionState;

#[derive(Clone, Debug, Default, Serialize)]
pub struct Snapshot {
	pub transcript: Transcript,
	pub state: SessionState,
}

type Listener = Arc<dyn Fn(&Arc<Snapshot>) + Send + Sync>;

#[derive(Clone)]
pub struct SessionStore {
	inner: Arc<StoreInner>,
}

struct StoreInner {
	snapshot: RwLock<Arc<Snapshot>>,
	listeners: Mutex<Vec<(u64, Listener)>>,
	next_listener_id: AtomicU64,
}

impl SessionStore {
	pub fn new(state: SessionState) -> Self {
		Self {
			inner: Arc::new(StoreInner {
				snapshot: RwLock::new(Arc::new(Snapshot {
					transcript: Transcript::new(),
					state,
				})),
				listeners: Mutex::new(Vec::new()),
				next_listener_id: AtomicU64::new(1),
			}),
		}
	}

	pub fn snapshot(&self) -> Arc<Snapshot> {
		self.inner.snapshot.read().clone()
	}

	pub fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
		f(&self.inner.snapshot.read())
	}

	/// Mutates the snapshot and notifies every listener.
	pub fn update<R>(&self, f: impl FnOnce(&mut Snapshot) -> R) -> R {
		let (result, snapshot) = {
			let mut guard = self.inner.snapshot.write();
			let result = f(Arc::make_mut(&mut guard));
			(result, guard.clone())
		};
		self.notify(&snapshot);
		result
	}

	/// Like [`update`](Self::update), but listeners are only notified on
	/// `Ok`. `f` must check its preconditions before mutating anything.
	pub fn try_update<T, E>(&self, f: impl FnOnce(&mut Snapshot) -> Result<T, E>) -> Result<T, E> {
		let (result, snapshot) = {
			let mut guard = self.inner.snapshot.write();
			let result = f(Arc::make_mut(&mut guard));
			(result, guard.clone())
		};
		if result.is_ok() {
			self.notify(&snapshot);
		}
		result
	}

	/// Registers a change listener. The listener stays registered until the
	/// returned [`Subscription`] is dropped or unsubscribed.
	pub fn subscribe(&self, listener: impl Fn(&Arc<Snapshot>) + Send + Sync + 'static) -> Subscription {
		let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
		self.inner.listeners.lock().push((id, Arc::new(listener)));
		trace!(listener_id = id, "listener subscribed");
		Subscription {
			id,
			store: Arc::downgrade(&self.inner),
		}
	}

	pub fn listener_count(&self) -> usize {
		self.inner.listeners.lock().len()
	}

	fn notify(&self, snapshot: &Arc<Snapshot>) {
		let listeners: Vec<Listener> = self
			.inner
			.listeners
			.lock()
			.iter()
			.map(|(_, listener)| listener.clone())
			.collect();
		for listener in listeners {
			listener(snapshot);
		}
	}
}

impl std::fmt::Debug for SessionStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionStore")
			.field("status", &self.read(|s| s.state.status()))
			.field("listeners", &self.listener_count())
			.finish()
	}
}

/// Handle returned by [`SessionStore::subscribe`].
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
	id: u64,
	store: Weak<StoreInner>,
}

impl Subscription {
	pub fn unsubscribe(self) {
		// Drop does the work.
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(inner) = self.store.upgrade() {
			inner.listeners.lock().retain(|(id, _)| *id != self.id);
			trace!(listener_id = self.id, "listener unsubscribed");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lifecycle::{LifecycleEvent, SessionStatus};
	use std::sync::atomic::AtomicUsize;
	use vellum_common_transcript::SessionUpdateEvent;

	fn counting_listener(store: &SessionStore) -> (Arc<AtomicUsize>, Subscription) {
		let count = Arc::new(AtomicUsize::new(0));
		let seen = count.clone();
		let sub = store.subscribe(move |_| {
			seen.fetch_add(1, Ordering::SeqCst);
		});
		(count, sub)
	}

	#[test]
	fn test_update_notifies_listeners() {
		let store = SessionStore::new(SessionState::new("claude-code"));
		let (count, _sub) = counting_listener(&store);

		store.update(|snap| {
			snap.transcript.apply(SessionUpdateEvent::AgentTextChunk {
				text: "hi".to_string(),
			});
		});

		assert_eq!(count.load(Ordering::SeqCst), 1);
		assert_eq!(store.snapshot().transcript.len(), 1);
	}

	#[test]
	fn test_old_snapshot_is_unchanged_after_update() {
		let store = SessionStore::new(SessionState::new("claude-code"));
		let before = store.snapshot();

		store.update(|snap| snap.state.advance(LifecycleEvent::Create));

		assert_eq!(before.state.status(), SessionStatus::Disconnected);
		assert_eq!(store.snapshot().state.status(), SessionStatus::Initializing);
	}

	#[test]
	fn test_dropping_subscription_unsubscribes() {
		let store = SessionStore::new(SessionState::default());
		let (count, sub) = counting_listener(&store);
		assert_eq!(store.listener_count(), 1);

		drop(sub);
		store.update(|_| ());

		assert_eq!(store.listener_count(), 0);
		assert_eq!(count.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn test_explicit_unsubscribe() {
		let store = SessionStore::new(SessionState::default());
		let (count, sub) = counting_listener(&store);
		let (other, _keep) = counting_listener(&store);

		sub.unsubscribe();
		store.update(|_| ());

		assert_eq!(count.load(Ordering::SeqCst), 0);
		assert_eq!(other.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_try_update_error_does_not_notify() {
		let store = SessionStore::new(SessionState::default());
		let (count, _sub) = counting_listener(&store);

		let result: Result<(), &str> = store.try_update(|_| Err("nope"));

		assert!(result.is_err());
		assert_eq!(count.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn test_listener_can_read_store_during_notify() {
		let store = SessionStore::new(SessionState::default());
		let reader = store.clone();
		let observed = Arc::new(AtomicUsize::new(0));
		let observed_in = observed.clone();
		let _sub = store.subscribe(move |snap| {
			// the lock is released before listeners run
			let len = reader.read(|s| s.transcript.len());
			assert_eq!(len, snap.transcript.len());
			observed_in.store(len, Ordering::SeqCst);
		});

		store.update(|snap| {
			snap.transcript.apply(SessionUpdateEvent::UserMessageChunk {
				text: "q".to_string(),
			});
		});

		assert_eq!(observed.load(Ordering::SeqCst), 1);
	}
}
