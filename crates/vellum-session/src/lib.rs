// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Chat session coordination for Vellum.
//!
//! [`ChatSession`] ties the transcript, permission registry and send pipeline
//! together behind the operations a UI needs. State is published through an
//! observable [`SessionStore`]; inbound agent events are serialized through
//! [`spawn_inbound_loop`].

pub mod error;
pub mod inbound;
pub mod lifecycle;
pub mod session;
pub mod state;
pub mod store;

pub use error::SessionError;
pub use inbound::{spawn_inbound_loop, InboundHandle, INBOUND_QUEUE_CAPACITY};
pub use lifecycle::{next_status, AgentSwitch, Coordinator, LifecycleEvent, SessionStatus};
pub use session::{ChatSession, Collaborators, SessionSettings};
pub use state::SessionState;
pub use store::{SessionStore, Snapshot, Subscription};
