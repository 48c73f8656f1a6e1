// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Local disk backend.
//!
//! The root locator of a `file://` root is a host directory. Item ids are
//! paths relative to that directory, written with `/` separators and a
//! leading `/`; the root directory itself is `/`. Ids that would leave the
//! root (`..`, `.`, empty segments) never resolve and surface as not found.
//!
//! The backend is synchronous. Wrap it in [`crate::Blocking`] to hold it as
//! an [`crate::AsyncGateway`].

mod gateway;
mod paths;


pub use gateway::LocalGateway;

/// Registry scheme for the local backend
pub const SCHEME: &str = "file";
