// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Correlation of agent permission requests with user decisions.

pub mod registry;
pub mod select;

pub use registry::{PermissionOutcome, PermissionRegistry, PermissionTicket};
pub use select::auto_select;
