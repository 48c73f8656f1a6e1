// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The `gate` command line: drive a mounted root by hand, or check it.

pub mod commands;
pub mod common;

pub use common::{DEFAULT_CONFIG, GateContext};
