// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Capability-driven conformance checks for gateways.
//!
//! Each configured root is opened through a [`gateway::GatewayRegistry`],
//! which refuses declarations the backend cannot honor. The harness then runs
//! one scenario per declared capability. Scenarios that need a setup
//! capability the root does not declare are skipped, never invoked.

pub mod config;
pub mod harness;
pub mod scenario;
pub mod scratch;
pub mod suite;

pub use config::{HarnessConfig, HarnessError, Result};
pub use harness::Harness;
pub use scenario::{
    Context, Report, Scenario, ScenarioError, ScenarioFn, ScenarioOutcome, ScenarioResult,
};
pub use scratch::{with_scratch, SCRATCH_PREFIX};
pub use suite::standard_suite;
