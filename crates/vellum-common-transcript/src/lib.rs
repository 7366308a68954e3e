// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Transcript model for agent chat sessions.
//!
//! A [`Transcript`] is the ordered list of user and assistant messages shown
//! to the user. Streaming protocol events ([`SessionUpdateEvent`]) are folded
//! into it with [`apply_update`], which extends open text runs in place and
//! maintains a single block per tool call no matter how many updates arrive
//! for it.

pub mod error;
pub mod event;
pub mod fold;
pub mod model;
pub mod transcript;

pub use error::*;
pub use event::*;
pub use fold::{apply_update, FoldOutcome, SideChannelUpdate};
pub use model::*;
pub use transcript::{BlockLocation, Transcript};
